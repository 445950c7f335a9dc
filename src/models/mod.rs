use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt::Display};

pub mod history;
pub mod meal;
pub mod user_profile;

pub use history::{ConsumptionEntry, ConsumptionHistory};
pub use meal::{Macros, MealCategory, MealRecord};
pub use user_profile::{compute_bmi, UserProfile};

/// Rounds to a fixed number of decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ============================================================================
// Eligibility
// ============================================================================

/// BMI category, lower bounds inclusive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    ClassIObesity,
    ClassIiObesity,
    ClassIiiObesity,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else if bmi < 35.0 {
            BmiCategory::ClassIObesity
        } else if bmi < 40.0 {
            BmiCategory::ClassIiObesity
        } else {
            BmiCategory::ClassIiiObesity
        }
    }

    pub fn is_obese(&self) -> bool {
        matches!(
            self,
            BmiCategory::ClassIObesity | BmiCategory::ClassIiObesity | BmiCategory::ClassIiiObesity
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal weight",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::ClassIObesity => "Class I Obesity",
            BmiCategory::ClassIiObesity => "Class II Obesity",
            BmiCategory::ClassIiiObesity => "Class III Obesity",
        }
    }
}

/// Result of classifying a user's height and weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EligibilityReport {
    pub bmi: f64,
    pub category: BmiCategory,
    pub program_eligible: bool,
}

/// Per-criterion outcome of the BMI-tier meal check
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CriteriaReport {
    /// False when the user is below the program threshold; nothing else is evaluated then
    pub applicable: bool,
    pub calories_ok: bool,
    pub protein_ok: bool,
    pub fiber_ok: bool,
    pub sugar_ok: bool,
    pub met: usize,
    pub required: usize,
    pub meets_criteria: bool,
}

// ============================================================================
// Allergens
// ============================================================================

/// Severity of an allergen overlap
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of comparing a meal's allergens with a user's
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConflictReport {
    pub has_conflict: bool,
    /// Canonical ids present on both sides
    pub overlapping: BTreeSet<String>,
    pub severity: Severity,
}

impl ConflictReport {
    pub fn none() -> Self {
        Self {
            has_conflict: false,
            overlapping: BTreeSet::new(),
            severity: Severity::None,
        }
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Qualitative label for a composite score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl RecommendationTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RecommendationTier::Excellent
        } else if score >= 60.0 {
            RecommendationTier::Good
        } else if score >= 40.0 {
            RecommendationTier::Fair
        } else {
            RecommendationTier::Poor
        }
    }
}

/// One weighted factor of the composite score
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ScoreComponent {
    /// Raw points, 0-100
    pub points: f64,
    pub weight: f64,
    /// `points * weight`, rounded to two decimals
    pub contribution: f64,
}

impl ScoreComponent {
    pub fn new(points: f64, weight: f64) -> Self {
        let points = points.clamp(0.0, 100.0);
        Self {
            points,
            weight,
            contribution: round_to(points * weight, 2),
        }
    }
}

/// Allergy part of the score explanation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AllergySafety {
    pub has_conflict: bool,
    pub overlapping: Vec<String>,
    pub severity: Severity,
    /// The user has allergies but the meal declares none, so safety is unverified
    pub uncertain_allergens: bool,
    pub note: String,
}

/// Explained composite score for one (meal, user) pair
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreBreakdown {
    pub meal_id: u64,
    pub calorie: ScoreComponent,
    pub allergy: ScoreComponent,
    pub diversity: ScoreComponent,
    pub preference: ScoreComponent,
    pub total_score: f64,
    pub tier: RecommendationTier,
    pub allergy_safety: AllergySafety,
    pub matched_preferences: Vec<String>,
}

// ============================================================================
// Recommendations
// ============================================================================

/// Whether a candidate's allergen status could be verified
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafetyBucket {
    /// Allergens declared and none conflict
    Safe,
    /// No allergen data, conflict status unknown
    Unconfirmed,
}

/// A selected meal with its explanation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendedMeal {
    pub meal: MealRecord,
    pub score: ScoreBreakdown,
    pub bucket: SafetyBucket,
    pub uncertain_allergens: bool,
    pub meets_eligibility_criteria: bool,
}

/// Selection for one meal category
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategorySelection {
    pub category: MealCategory,
    pub meals: Vec<RecommendedMeal>,
    pub safe_candidates: usize,
    pub unconfirmed_candidates: usize,
    /// Fewer candidates than requested were available
    pub insufficient: bool,
}

impl CategorySelection {
    pub fn candidate_count(&self) -> usize {
        self.safe_candidates + self.unconfirmed_candidates
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationsByCategory {
    pub breakfast: CategorySelection,
    pub lunch: CategorySelection,
    pub dinner: CategorySelection,
}

impl RecommendationsByCategory {
    pub fn iter(&self) -> impl Iterator<Item = &CategorySelection> {
        [&self.breakfast, &self.lunch, &self.dinner].into_iter()
    }
}

/// Counters describing how the catalog was narrowed down
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RecommendationStatistics {
    pub catalog_size: usize,
    pub excluded_recent: usize,
    pub excluded_uncategorized: usize,
    pub excluded_calorie_cap: usize,
    pub excluded_allergen_conflict: usize,
    pub safe_candidates: usize,
    pub unconfirmed_candidates: usize,
    pub selected: usize,
    pub max_calories_applied: u32,
    pub average_selected_score: f64,
}

/// Response of the recommendation engine
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationResult {
    pub user_id: u64,
    pub eligibility: EligibilityReport,
    pub by_category: RecommendationsByCategory,
    pub insufficient_data: bool,
    pub advisory: Option<String>,
    pub allergy_note: Option<String>,
    pub statistics: RecommendationStatistics,
}

// ============================================================================
// Catalog
// ============================================================================

/// Filters for browsing the catalog
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealSearch {
    pub search: Option<String>,
    pub meal_type: Option<MealCategory>,
    pub max_calories: Option<u32>,
    pub min_protein: Option<f64>,
}

/// Catalog listing row
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub meal: MealRecord,
    /// Meets the meal criteria for a user at the program threshold
    pub eligible_for_target: bool,
}

/// Aggregate figures over the whole catalog
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CatalogStatistics {
    pub total_meals: usize,
    pub breakfast_meals: usize,
    pub lunch_meals: usize,
    pub dinner_meals: usize,
    pub snack_meals: usize,
    pub high_protein_meals: usize,
    pub high_fiber_meals: usize,
    pub low_calorie_meals: usize,
    pub medium_calorie_meals: usize,
    pub high_calorie_meals: usize,
    pub eligible_meals: usize,
    pub allergen_undeclared_meals: usize,
    pub avg_calories: f64,
    pub avg_protein: f64,
    pub avg_fiber: f64,
    pub data_completeness: f64,
}
