use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Meal slot a catalog record belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealCategory {
    /// Categories the recommendation engine fills, in response order
    pub const RECOMMENDED: [MealCategory; 3] = [
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealCategory::Breakfast => "breakfast",
            MealCategory::Lunch => "lunch",
            MealCategory::Dinner => "dinner",
            MealCategory::Snack => "snack",
        }
    }
}

impl Display for MealCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Macronutrient values per serving. `None` means the source did not report it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Macros {
    #[serde(default)]
    pub protein_g: Option<f64>,
    #[serde(default)]
    pub carbs_g: Option<f64>,
    #[serde(default)]
    pub fat_g: Option<f64>,
    #[serde(default)]
    pub fiber_g: Option<f64>,
    #[serde(default)]
    pub sugar_g: Option<f64>,
    #[serde(default)]
    pub sodium_mg: Option<f64>,
}

impl Macros {
    pub fn protein(&self) -> f64 {
        known_or_zero(self.protein_g)
    }

    pub fn fiber(&self) -> f64 {
        known_or_zero(self.fiber_g)
    }

    pub fn sugar(&self) -> f64 {
        known_or_zero(self.sugar_g)
    }

    /// True when protein, carbohydrate, fat and fiber are all reported
    pub fn is_complete(&self) -> bool {
        self.protein_g.is_some()
            && self.carbs_g.is_some()
            && self.fat_g.is_some()
            && self.fiber_g.is_some()
    }
}

// Negative or non-finite values from upstream count as unknown
fn known_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
}

/// A catalog meal as handed to the recommendation core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealRecord {
    pub id: u64,
    pub name: String,
    pub category: MealCategory,
    pub calories: u32,
    #[serde(flatten)]
    pub macros: Macros,
    /// Ingredient tokens in recipe order
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Declared allergen tokens; empty means "not known", not "allergen free"
    #[serde(default)]
    pub allergens: Vec<String>,
}

impl MealRecord {
    /// Creates a meal with no macros, ingredients or allergen data
    pub fn new(id: u64, name: impl Into<String>, category: MealCategory, calories: u32) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            calories,
            macros: Macros::default(),
            ingredients: Vec::new(),
            allergens: Vec::new(),
        }
    }

    pub fn with_macros(mut self, macros: Macros) -> Self {
        self.macros = macros;
        self
    }

    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allergens<I, S>(mut self, allergens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allergens = allergens.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the record carries any non-blank allergen declaration
    pub fn has_declared_allergens(&self) -> bool {
        self.allergens.iter().any(|a| !a.trim().is_empty())
    }

    /// Lowercased ingredient tokens joined by spaces, used for substring matching
    pub fn ingredient_text(&self) -> String {
        self.ingredients
            .iter()
            .map(|i| i.trim().to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
