use std::collections::BTreeSet;

use crate::models::{
    round_to, AllergySafety, BmiCategory, MealRecord, RecommendationTier, ScoreBreakdown,
    ScoreComponent, Severity, UserProfile,
};
use crate::services::allergens::AllergenConflictChecker;

pub const CALORIE_WEIGHT: f64 = 0.40;
pub const ALLERGY_WEIGHT: f64 = 0.30;
pub const DIVERSITY_WEIGHT: f64 = 0.15;
pub const PREFERENCE_WEIGHT: f64 = 0.15;

const POINTS_PER_PREFERENCE: f64 = 25.0;

/// Weighted 0-100 desirability score for a (meal, user) pair.
///
/// Pure and deterministic: the same inputs always produce the same breakdown.
#[derive(Debug, Clone, Copy)]
pub struct NutritionScorer<'a> {
    checker: AllergenConflictChecker<'a>,
}

impl Default for NutritionScorer<'static> {
    fn default() -> Self {
        Self::new(AllergenConflictChecker::default())
    }
}

impl<'a> NutritionScorer<'a> {
    pub fn new(checker: AllergenConflictChecker<'a>) -> Self {
        Self { checker }
    }

    pub fn score<S: AsRef<str>>(
        &self,
        meal: &MealRecord,
        user: &UserProfile,
        user_allergens: &[S],
    ) -> ScoreBreakdown {
        let category = BmiCategory::from_bmi(user.bmi());

        let calorie = ScoreComponent::new(calorie_points(category, meal.calories), CALORIE_WEIGHT);

        let (allergy_points, allergy_safety) = self.allergy_safety(meal, user_allergens);
        let allergy = ScoreComponent::new(allergy_points, ALLERGY_WEIGHT);

        let diversity = ScoreComponent::new(diversity_points(meal), DIVERSITY_WEIGHT);

        let matched_preferences = matched_preferences(meal, &user.preferences);
        let preference = ScoreComponent::new(
            (POINTS_PER_PREFERENCE * matched_preferences.len() as f64).min(100.0),
            PREFERENCE_WEIGHT,
        );

        let total = calorie.contribution
            + allergy.contribution
            + diversity.contribution
            + preference.contribution;
        let total_score = round_to(total, 2).clamp(0.0, 100.0);

        ScoreBreakdown {
            meal_id: meal.id,
            calorie,
            allergy,
            diversity,
            preference,
            total_score,
            tier: RecommendationTier::from_score(total_score),
            allergy_safety,
            matched_preferences,
        }
    }

    fn allergy_safety<S: AsRef<str>>(
        &self,
        meal: &MealRecord,
        user_allergens: &[S],
    ) -> (f64, AllergySafety) {
        let user_has_allergies = !self
            .checker
            .normalizer()
            .normalize_all(user_allergens)
            .is_empty();

        if !user_has_allergies {
            return (
                100.0,
                AllergySafety {
                    has_conflict: false,
                    overlapping: Vec::new(),
                    severity: Severity::None,
                    uncertain_allergens: false,
                    note: "No allergies on file".to_string(),
                },
            );
        }

        let report = self.checker.check(&meal.allergens, user_allergens);
        let uncertain_allergens = !meal.has_declared_allergens();

        let points = match report.severity {
            Severity::High => 0.0,
            Severity::Medium => 30.0,
            Severity::Low => 60.0,
            Severity::None => 100.0,
        };

        let note = if report.has_conflict {
            format!(
                "Contains {} ({} risk)",
                report
                    .overlapping
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
                report.severity
            )
        } else if uncertain_allergens {
            "Meal declares no allergens, safety could not be verified".to_string()
        } else {
            "No conflict with declared allergens".to_string()
        };

        (
            points,
            AllergySafety {
                has_conflict: report.has_conflict,
                overlapping: report.overlapping.into_iter().collect(),
                severity: report.severity,
                uncertain_allergens,
                note,
            },
        )
    }
}

/// Calorie-fit points for the user's BMI band
fn calorie_points(category: BmiCategory, calories: u32) -> f64 {
    let within = |low: u32, high: u32| (low..=high).contains(&calories);

    if category.is_obese() {
        if within(400, 600) {
            100.0
        } else if within(300, 700) {
            80.0
        } else if calories <= 800 {
            60.0
        } else {
            20.0
        }
    } else if category == BmiCategory::Underweight {
        if within(500, 700) {
            100.0
        } else if within(400, 800) {
            80.0
        } else {
            60.0
        }
    } else if within(400, 800) {
        100.0
    } else if within(300, 900) {
        80.0
    } else {
        60.0
    }
}

fn diversity_points(meal: &MealRecord) -> f64 {
    let distinct: BTreeSet<String> = meal
        .ingredients
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
        .collect();

    match distinct.len() {
        0 => 0.0,
        n if n >= 5 => 100.0,
        n if n >= 3 => 80.0,
        _ => 60.0,
    }
}

/// Preferences found as substrings of the ingredient text, lowercased, in profile order
fn matched_preferences(meal: &MealRecord, preferences: &[String]) -> Vec<String> {
    let text = meal.ingredient_text();
    let mut matched: Vec<String> = Vec::new();

    for preference in preferences {
        let preference = preference.trim().to_lowercase();
        if preference.is_empty() || matched.contains(&preference) {
            continue;
        }
        if text.contains(&preference) {
            matched.push(preference);
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Macros, MealCategory};
    use proptest::prelude::*;

    fn obese_user() -> UserProfile {
        // BMI 31.02
        UserProfile::new(1, 175.0, 95.0)
    }

    fn grilled_chicken() -> MealRecord {
        MealRecord::new(10, "Grilled Chicken Bowl", MealCategory::Lunch, 450)
            .with_macros(Macros {
                protein_g: Some(35.0),
                fiber_g: Some(6.0),
                sugar_g: Some(4.0),
                ..Default::default()
            })
            .with_ingredients(["Chicken Breast", "brown rice", "broccoli", "olive oil", "garlic"])
            .with_allergens(["eggs"])
    }

    #[test]
    fn test_full_breakdown() {
        let scorer = NutritionScorer::default();
        let user = obese_user()
            .with_allergies(["nuts"])
            .with_preferences(["chicken"]);

        let score = scorer.score(&grilled_chicken(), &user, &user.allergies);

        assert_eq!(score.calorie.points, 100.0);
        assert_eq!(score.calorie.contribution, 40.0);
        assert_eq!(score.allergy.contribution, 30.0);
        assert_eq!(score.diversity.contribution, 15.0);
        assert_eq!(score.preference.contribution, 3.75);
        assert_eq!(score.total_score, 88.75);
        assert_eq!(score.tier, RecommendationTier::Excellent);
        assert_eq!(score.matched_preferences, vec!["chicken"]);
        assert!(!score.allergy_safety.has_conflict);
        assert!(!score.allergy_safety.uncertain_allergens);
    }

    #[test]
    fn test_calorie_bands_by_bmi() {
        use BmiCategory::*;

        assert_eq!(calorie_points(ClassIObesity, 400), 100.0);
        assert_eq!(calorie_points(ClassIObesity, 650), 80.0);
        assert_eq!(calorie_points(ClassIiObesity, 800), 60.0);
        assert_eq!(calorie_points(ClassIiiObesity, 801), 20.0);

        assert_eq!(calorie_points(Underweight, 600), 100.0);
        assert_eq!(calorie_points(Underweight, 450), 80.0);
        assert_eq!(calorie_points(Underweight, 200), 60.0);

        assert_eq!(calorie_points(Normal, 800), 100.0);
        assert_eq!(calorie_points(Overweight, 350), 80.0);
        assert_eq!(calorie_points(Normal, 1200), 60.0);
    }

    #[test]
    fn test_high_severity_conflict_scores_zero_allergy() {
        let scorer = NutritionScorer::default();
        let user = obese_user().with_allergies(["Eier"]);

        let score = scorer.score(&grilled_chicken(), &user, &user.allergies);

        assert_eq!(score.allergy.points, 0.0);
        assert!(score.allergy_safety.has_conflict);
        assert_eq!(score.allergy_safety.severity, Severity::High);
        assert_eq!(score.allergy_safety.overlapping, vec!["eggs"]);
        assert_eq!(score.allergy_safety.note, "Contains eggs (high risk)");
    }

    #[test]
    fn test_medium_and_low_conflicts() {
        let scorer = NutritionScorer::default();
        let user = obese_user();

        let bread = MealRecord::new(2, "Toast", MealCategory::Breakfast, 300)
            .with_allergens(["wheat", "kiwi"]);
        assert_eq!(scorer.score(&bread, &user, &["gluten"]).allergy.points, 30.0);
        assert_eq!(scorer.score(&bread, &user, &["kiwi"]).allergy.points, 60.0);
    }

    #[test]
    fn test_undeclared_allergens_are_uncertain() {
        let scorer = NutritionScorer::default();
        let user = obese_user().with_allergies(["peanuts"]);
        let meal = MealRecord::new(3, "Oatmeal", MealCategory::Breakfast, 320);

        let score = scorer.score(&meal, &user, &user.allergies);

        assert_eq!(score.allergy.points, 100.0);
        assert!(score.allergy_safety.uncertain_allergens);
        assert!(!score.allergy_safety.has_conflict);
    }

    #[test]
    fn test_no_user_allergies_is_full_allergy_score() {
        let scorer = NutritionScorer::default();
        let meal = MealRecord::new(3, "Oatmeal", MealCategory::Breakfast, 320);
        let none: [&str; 0] = [];

        let score = scorer.score(&meal, &obese_user(), &none);

        assert_eq!(score.allergy.points, 100.0);
        assert!(!score.allergy_safety.uncertain_allergens);
    }

    #[test]
    fn test_diversity_counts_distinct_ingredients() {
        let few = MealRecord::new(1, "a", MealCategory::Lunch, 400)
            .with_ingredients(["Rice", "rice ", "beans"]);
        assert_eq!(diversity_points(&few), 60.0);

        let three = few.clone().with_ingredients(["rice", "beans", "corn"]);
        assert_eq!(diversity_points(&three), 80.0);

        let none = MealRecord::new(1, "a", MealCategory::Lunch, 400);
        assert_eq!(diversity_points(&none), 0.0);
    }

    #[test]
    fn test_preference_points_capped() {
        let scorer = NutritionScorer::default();
        let meal = MealRecord::new(4, "Stir Fry", MealCategory::Dinner, 500).with_ingredients([
            "chicken", "rice", "broccoli", "garlic", "ginger", "onion",
        ]);
        let user = obese_user().with_preferences([
            "Chicken", "rice", "garlic", "ginger", "onion", "chicken ",
        ]);
        let none: [&str; 0] = [];

        let score = scorer.score(&meal, &user, &none);

        assert_eq!(score.matched_preferences.len(), 5);
        assert_eq!(score.preference.points, 100.0);
        assert_eq!(score.preference.contribution, 15.0);
    }

    fn arb_meal() -> impl Strategy<Value = MealRecord> {
        (
            0u32..3000,
            prop::collection::vec("[a-z]{1,8}", 0..8),
            prop::collection::vec(
                prop::sample::select(vec!["milk", "wheat", "soja", "kiwi", "salmon", " "]),
                0..4,
            ),
        )
            .prop_map(|(calories, ingredients, allergens)| {
                MealRecord::new(1, "generated", MealCategory::Dinner, calories)
                    .with_ingredients(ingredients)
                    .with_allergens(allergens)
            })
    }

    fn arb_user() -> impl Strategy<Value = UserProfile> {
        (
            120.0f64..220.0,
            35.0f64..200.0,
            prop::collection::vec(
                prop::sample::select(vec!["dairy", "gluten", "soy", "kiwi", "fish"]),
                0..3,
            ),
            prop::collection::vec("[a-z]{1,4}", 0..6),
        )
            .prop_map(|(height, weight, allergies, preferences)| {
                UserProfile::new(1, height, weight)
                    .with_allergies(allergies)
                    .with_preferences(preferences)
            })
    }

    proptest! {
        #[test]
        fn prop_score_is_deterministic(meal in arb_meal(), user in arb_user()) {
            let scorer = NutritionScorer::default();
            let first = scorer.score(&meal, &user, &user.allergies);
            let second = scorer.score(&meal, &user, &user.allergies);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_score_within_bounds(meal in arb_meal(), user in arb_user()) {
            let scorer = NutritionScorer::default();
            let score = scorer.score(&meal, &user, &user.allergies);

            prop_assert!((0.0..=100.0).contains(&score.total_score));
            prop_assert!(score.calorie.contribution <= 40.0);
            prop_assert!(score.allergy.contribution <= 30.0);
            prop_assert!(score.diversity.contribution <= 15.0);
            prop_assert!(score.preference.contribution <= 15.0);
            prop_assert_eq!(score.tier, RecommendationTier::from_score(score.total_score));
        }
    }
}
