use thiserror::Error;

use crate::config::EligibilityPolicy;
use crate::models::{compute_bmi, BmiCategory, CriteriaReport, EligibilityReport, MealRecord};

/// Tallest accepted height in centimetres
pub const MAX_HEIGHT_CM: f64 = 300.0;
/// Heaviest accepted weight in kilograms
pub const MAX_WEIGHT_KG: f64 = 500.0;

const CRITERIA_COUNT: usize = 4;

/// Rejected body measurements
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("height must be greater than 0 and at most {max} cm, got {value}")]
    HeightOutOfRange { value: f64, max: f64 },

    #[error("weight must be greater than 0 and at most {max} kg, got {value}")]
    WeightOutOfRange { value: f64, max: f64 },
}

/// BMI classification and the BMI-tier meal criteria
#[derive(Debug, Clone, Default)]
pub struct EligibilityClassifier {
    policy: EligibilityPolicy,
}

impl EligibilityClassifier {
    pub fn new(policy: EligibilityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    /// Validates the measurements and classifies the resulting BMI.
    ///
    /// NaN and infinite values fail the range checks.
    pub fn classify_user(
        &self,
        height_cm: f64,
        weight_kg: f64,
    ) -> Result<EligibilityReport, ValidationError> {
        if !(height_cm > 0.0 && height_cm <= MAX_HEIGHT_CM) {
            return Err(ValidationError::HeightOutOfRange {
                value: height_cm,
                max: MAX_HEIGHT_CM,
            });
        }
        if !(weight_kg > 0.0 && weight_kg <= MAX_WEIGHT_KG) {
            return Err(ValidationError::WeightOutOfRange {
                value: weight_kg,
                max: MAX_WEIGHT_KG,
            });
        }

        Ok(self.report_for_bmi(compute_bmi(height_cm, weight_kg)))
    }

    /// Report for an already computed BMI
    pub fn report_for_bmi(&self, bmi: f64) -> EligibilityReport {
        EligibilityReport {
            bmi,
            category: BmiCategory::from_bmi(bmi),
            program_eligible: self.is_program_eligible(bmi),
        }
    }

    pub fn is_program_eligible(&self, bmi: f64) -> bool {
        bmi >= self.policy.program_bmi_threshold
    }

    /// Evaluates the four meal criteria for a user at `user_bmi`.
    ///
    /// Below the program threshold nothing is evaluated and the meal never qualifies.
    pub fn criteria_report(&self, meal: &MealRecord, user_bmi: f64) -> CriteriaReport {
        let required = (self.policy.required_ratio * CRITERIA_COUNT as f64).ceil() as usize;

        if !self.is_program_eligible(user_bmi) {
            return CriteriaReport {
                applicable: false,
                calories_ok: false,
                protein_ok: false,
                fiber_ok: false,
                sugar_ok: false,
                met: 0,
                required,
                meets_criteria: false,
            };
        }

        let calories_ok = meal.calories <= self.policy.max_calories;
        let protein_ok = meal.macros.protein() >= self.policy.min_protein_g;
        let fiber_ok = meal.macros.fiber() >= self.policy.min_fiber_g;
        let sugar_ok = meal.macros.sugar() <= self.policy.max_sugar_g;

        let met = [calories_ok, protein_ok, fiber_ok, sugar_ok]
            .iter()
            .filter(|ok| **ok)
            .count();

        CriteriaReport {
            applicable: true,
            calories_ok,
            protein_ok,
            fiber_ok,
            sugar_ok,
            met,
            required,
            meets_criteria: met >= required,
        }
    }

    pub fn meal_fits_criteria(&self, meal: &MealRecord, user_bmi: f64) -> bool {
        self.criteria_report(meal, user_bmi).meets_criteria
    }
}
