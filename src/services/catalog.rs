use crate::models::{round_to, CatalogEntry, CatalogStatistics, MealCategory, MealRecord, MealSearch};
use crate::services::eligibility::EligibilityClassifier;

const HIGH_PROTEIN_G: f64 = 15.0;
const HIGH_FIBER_G: f64 = 3.0;
const LOW_CALORIE_MAX: u32 = 200;
const MEDIUM_CALORIE_MAX: u32 = 400;

/// Applies the browse filters. Numeric filters that are zero or negative are ignored.
pub fn search<'m>(meals: &'m [MealRecord], query: &MealSearch) -> Vec<&'m MealRecord> {
    let text = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let max_calories = query.max_calories.filter(|c| *c > 0);
    let min_protein = query.min_protein.filter(|p| *p > 0.0);

    meals
        .iter()
        .filter(|meal| match &text {
            Some(text) => {
                meal.name.to_lowercase().contains(text.as_str())
                    || meal.ingredient_text().contains(text.as_str())
            }
            None => true,
        })
        .filter(|meal| query.meal_type.map_or(true, |t| meal.category == t))
        .filter(|meal| max_calories.map_or(true, |c| meal.calories <= c))
        .filter(|meal| min_protein.map_or(true, |p| meal.macros.protein() >= p))
        .collect()
}

/// Wraps meals with their eligibility flag at the program threshold
pub fn entries<'m, I>(meals: I, classifier: &EligibilityClassifier) -> Vec<CatalogEntry>
where
    I: IntoIterator<Item = &'m MealRecord>,
{
    let threshold = classifier.policy().program_bmi_threshold;
    meals
        .into_iter()
        .map(|meal| CatalogEntry {
            eligible_for_target: classifier.meal_fits_criteria(meal, threshold),
            meal: meal.clone(),
        })
        .collect()
}

pub fn summarize(meals: &[MealRecord], classifier: &EligibilityClassifier) -> CatalogStatistics {
    if meals.is_empty() {
        return CatalogStatistics::default();
    }

    let threshold = classifier.policy().program_bmi_threshold;
    let total = meals.len();
    let in_category = |category: MealCategory| count(meals, |m| m.category == category);

    let calories: f64 = meals.iter().map(|m| f64::from(m.calories)).sum();
    let protein: f64 = meals.iter().map(|m| m.macros.protein()).sum();
    let fiber: f64 = meals.iter().map(|m| m.macros.fiber()).sum();
    let complete = count(meals, |m| m.macros.is_complete());

    CatalogStatistics {
        total_meals: total,
        breakfast_meals: in_category(MealCategory::Breakfast),
        lunch_meals: in_category(MealCategory::Lunch),
        dinner_meals: in_category(MealCategory::Dinner),
        snack_meals: in_category(MealCategory::Snack),
        high_protein_meals: count(meals, |m| m.macros.protein() >= HIGH_PROTEIN_G),
        high_fiber_meals: count(meals, |m| m.macros.fiber() >= HIGH_FIBER_G),
        low_calorie_meals: count(meals, |m| m.calories <= LOW_CALORIE_MAX),
        medium_calorie_meals: count(meals, |m| {
            m.calories > LOW_CALORIE_MAX && m.calories <= MEDIUM_CALORIE_MAX
        }),
        high_calorie_meals: count(meals, |m| m.calories > MEDIUM_CALORIE_MAX),
        eligible_meals: count(meals, |m| classifier.meal_fits_criteria(m, threshold)),
        allergen_undeclared_meals: count(meals, |m| !m.has_declared_allergens()),
        avg_calories: round_to(calories / total as f64, 0),
        avg_protein: round_to(protein / total as f64, 1),
        avg_fiber: round_to(fiber / total as f64, 1),
        data_completeness: round_to(complete as f64 * 100.0 / total as f64, 1),
    }
}

fn count(meals: &[MealRecord], pred: impl Fn(&MealRecord) -> bool) -> usize {
    meals.iter().filter(|&m| pred(m)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Macros;

    fn catalog() -> Vec<MealRecord> {
        vec![
            MealRecord::new(1, "Greek Yogurt Parfait", MealCategory::Breakfast, 180)
                .with_macros(Macros {
                    protein_g: Some(18.0),
                    carbs_g: Some(20.0),
                    fat_g: Some(2.0),
                    fiber_g: Some(3.0),
                    sugar_g: Some(12.0),
                    sodium_mg: None,
                })
                .with_ingredients(["greek yogurt", "berries", "granola"])
                .with_allergens(["milk"]),
            MealRecord::new(2, "Chicken Salad", MealCategory::Lunch, 350)
                .with_macros(Macros {
                    protein_g: Some(30.0),
                    fiber_g: Some(4.0),
                    ..Default::default()
                })
                .with_ingredients(["Chicken breast", "lettuce", "tomato"]),
            MealRecord::new(3, "Beef Lasagna", MealCategory::Dinner, 720)
                .with_ingredients(["pasta", "beef", "cheese"])
                .with_allergens(["gluten", "milk"]),
            MealRecord::new(4, "Apple", MealCategory::Snack, 95),
        ]
    }

    #[test]
    fn test_search_by_text_matches_name_and_ingredients() {
        let meals = catalog();
        let by_name = search(
            &meals,
            &MealSearch {
                search: Some("SALAD".into()),
                ..Default::default()
            },
        );
        assert_eq!(by_name.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2]);

        let by_ingredient = search(
            &meals,
            &MealSearch {
                search: Some("cheese".into()),
                ..Default::default()
            },
        );
        assert_eq!(by_ingredient.iter().map(|m| m.id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_search_numeric_filters() {
        let meals = catalog();
        let found = search(
            &meals,
            &MealSearch {
                max_calories: Some(400),
                min_protein: Some(20.0),
                ..Default::default()
            },
        );
        assert_eq!(found.iter().map(|m| m.id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_non_positive_filters_ignored() {
        let meals = catalog();
        let found = search(
            &meals,
            &MealSearch {
                search: Some("   ".into()),
                max_calories: Some(0),
                min_protein: Some(-5.0),
                ..Default::default()
            },
        );
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn test_search_by_meal_type() {
        let meals = catalog();
        let found = search(
            &meals,
            &MealSearch {
                meal_type: Some(MealCategory::Snack),
                ..Default::default()
            },
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Apple");
    }

    #[test]
    fn test_entries_flag_eligibility() {
        let meals = catalog();
        let rows = entries(&meals, &EligibilityClassifier::default());

        assert!(rows[0].eligible_for_target);
        // protein and fiber pass, sugar missing counts as 0
        assert!(rows[1].eligible_for_target);
        assert!(!rows[2].eligible_for_target);
    }

    #[test]
    fn test_summarize() {
        let stats = summarize(&catalog(), &EligibilityClassifier::default());

        assert_eq!(stats.total_meals, 4);
        assert_eq!(stats.breakfast_meals, 1);
        assert_eq!(stats.snack_meals, 1);
        assert_eq!(stats.high_protein_meals, 2);
        assert_eq!(stats.high_fiber_meals, 2);
        assert_eq!(stats.low_calorie_meals, 2);
        assert_eq!(stats.medium_calorie_meals, 1);
        assert_eq!(stats.high_calorie_meals, 1);
        assert_eq!(stats.eligible_meals, 2);
        assert_eq!(stats.allergen_undeclared_meals, 2);
        assert_eq!(stats.avg_calories, 336.0);
        assert_eq!(stats.avg_protein, 12.0);
        assert_eq!(stats.avg_fiber, 1.8);
        assert_eq!(stats.data_completeness, 25.0);
    }

    #[test]
    fn test_summarize_empty_catalog() {
        let stats = summarize(&[], &EligibilityClassifier::default());
        assert_eq!(stats, CatalogStatistics::default());
    }
}
