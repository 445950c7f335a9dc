pub mod allergens;
pub mod catalog;
pub mod eligibility;
pub mod recommendation;
pub mod scoring;
pub mod sources;

pub use allergens::{AllergenConflictChecker, AllergenNormalizer, AllergenTable};
pub use eligibility::{EligibilityClassifier, ValidationError};
pub use recommendation::{RecommendationEngine, RecommendationError, RecommendationRequest};
pub use scoring::NutritionScorer;
pub use sources::{CatalogSource, ProfileSource};
