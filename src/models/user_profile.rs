use serde::{Deserialize, Serialize};

use super::round_to;

/// Body-mass index from height in centimetres and weight in kilograms,
/// rounded to two decimals
pub fn compute_bmi(height_cm: f64, weight_kg: f64) -> f64 {
    let height_m = height_cm / 100.0;
    round_to(weight_kg / (height_m * height_m), 2)
}

/// Profile of the user a recommendation is computed for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: u64,
    pub height_cm: f64,
    pub weight_kg: f64,
    /// Free-text allergy tokens, normalized at lookup time
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Ingredients the user favors
    #[serde(default)]
    pub preferences: Vec<String>,
}

impl UserProfile {
    /// Creates a profile with no allergies or preferences
    pub fn new(id: u64, height_cm: f64, weight_kg: f64) -> Self {
        Self {
            id,
            height_cm,
            weight_kg,
            allergies: Vec::new(),
            preferences: Vec::new(),
        }
    }

    pub fn with_allergies<I, S>(mut self, allergies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for allergy in allergies {
            self.add_allergy(allergy);
        }
        self
    }

    pub fn with_preferences<I, S>(mut self, preferences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for preference in preferences {
            let preference = preference.into();
            if !self.preferences.contains(&preference) {
                self.preferences.push(preference);
            }
        }
        self
    }

    /// Adds an allergy token, ignoring blanks and exact duplicates
    pub fn add_allergy(&mut self, allergy: impl Into<String>) {
        let allergy = allergy.into();
        if allergy.trim().is_empty() {
            return;
        }
        if !self.allergies.contains(&allergy) {
            self.allergies.push(allergy);
        }
    }

    /// BMI recomputed from the current height and weight
    pub fn bmi(&self) -> f64 {
        compute_bmi(self.height_cm, self.weight_kg)
    }
}
