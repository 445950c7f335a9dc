//! Allergen synonym resolution and conflict detection.
//!
//! Tokens from meals and from user profiles are folded onto canonical allergen
//! ids through one shared [`AllergenTable`] before they are ever compared.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::models::{ConflictReport, Severity};

/// Canonical ids whose overlap is a high severity conflict
pub const HIGH_RISK_ALLERGENS: &[&str] = &["milk", "eggs", "nuts", "fish", "shellfish"];

/// Canonical ids whose overlap is a medium severity conflict
pub const MEDIUM_RISK_ALLERGENS: &[&str] = &["gluten", "soy", "sesame"];

/// Built-in synonyms: English, Arabic, French, Spanish, German
const BUILTIN_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "milk",
        &[
            "milk", "dairy", "lactose", "casein", "whey", "cheese", "butter", "cream", "yogurt",
            "yoghurt", "حليب", "ألبان", "الحليب", "لبن", "lait", "produits laitiers", "lactosa",
            "leche", "lácteos", "lacteos", "milch", "milchprodukte", "laktose",
        ],
    ),
    (
        "eggs",
        &[
            "egg", "eggs", "albumin", "بيض", "البيض", "oeuf", "oeufs", "œuf", "œufs", "huevo",
            "huevos", "ei", "eier",
        ],
    ),
    (
        "nuts",
        &[
            "nuts", "nut", "tree nut", "tree nuts", "peanut", "peanuts", "groundnut", "almond",
            "almonds", "walnut", "walnuts", "cashew", "cashews", "pecan", "pecans", "hazelnut",
            "hazelnuts", "pistachio", "pistachios", "مكسرات", "المكسرات", "فول سوداني", "لوز",
            "جوز", "fruits à coque", "noix", "arachide", "arachides", "cacahuète", "cacahuètes",
            "amande", "amandes", "frutos secos", "nueces", "maní", "cacahuate", "almendra",
            "almendras", "nüsse", "nuss", "erdnuss", "erdnüsse", "mandel", "mandeln",
        ],
    ),
    (
        "fish",
        &[
            "fish", "seafood", "salmon", "tuna", "cod", "anchovy", "anchovies", "sardine",
            "sardines", "سمك", "أسماك", "الأسماك", "poisson", "poissons", "pescado", "fisch",
        ],
    ),
    (
        "shellfish",
        &[
            "shellfish", "crustacean", "crustaceans", "mollusc", "molluscs", "shrimp", "prawn",
            "prawns", "crab", "lobster", "قشريات", "محار", "روبيان", "جمبري", "fruits de mer",
            "crustacés", "mariscos", "camarón", "gambas", "meeresfrüchte", "schalentiere",
            "garnelen",
        ],
    ),
    (
        "gluten",
        &[
            "gluten", "wheat", "barley", "rye", "spelt", "flour", "غلوتين", "جلوتين", "قمح",
            "القمح", "blé", "trigo", "weizen", "gerste", "roggen",
        ],
    ),
    (
        "soy",
        &[
            "soy", "soya", "soybean", "soybeans", "tofu", "tempeh", "edamame", "صويا", "الصويا",
            "soja",
        ],
    ),
    (
        "sesame",
        &[
            "sesame", "tahini", "سمسم", "السمسم", "طحينة", "sésame", "sésamo", "sesam",
        ],
    ),
];

static BUILTIN_TABLE: LazyLock<AllergenTable> = LazyLock::new(|| {
    AllergenTable::from_entries(BUILTIN_SYNONYMS.iter().map(|(id, synonyms)| (*id, *synonyms)))
});

/// Lowercases, trims and collapses inner whitespace
fn fold(token: &str) -> String {
    token
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Immutable synonym → canonical id index
#[derive(Debug, Clone, Default)]
pub struct AllergenTable {
    index: HashMap<String, String>,
}

impl AllergenTable {
    /// Builds a table from `(canonical id, synonyms)` pairs. Each canonical id
    /// also resolves to itself. When a synonym is listed twice the first
    /// entry wins.
    pub fn from_entries<'e, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'e str, &'e [&'e str])>,
    {
        let mut index = HashMap::new();
        for (canonical, synonyms) in entries {
            let canonical = fold(canonical);
            index
                .entry(canonical.clone())
                .or_insert_with(|| canonical.clone());
            for synonym in synonyms {
                index
                    .entry(fold(synonym))
                    .or_insert_with(|| canonical.clone());
            }
        }
        Self { index }
    }

    /// The process-wide table, built on first use
    pub fn builtin() -> &'static AllergenTable {
        &BUILTIN_TABLE
    }

    pub fn canonical_for(&self, folded: &str) -> Option<&str> {
        self.index.get(folded).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Maps free-text allergen tokens to canonical ids
#[derive(Debug, Clone, Copy)]
pub struct AllergenNormalizer<'a> {
    table: &'a AllergenTable,
}

impl AllergenNormalizer<'static> {
    /// Normalizer over the built-in table
    pub fn global() -> Self {
        Self::new(AllergenTable::builtin())
    }
}

impl Default for AllergenNormalizer<'static> {
    fn default() -> Self {
        Self::global()
    }
}

impl<'a> AllergenNormalizer<'a> {
    pub fn new(table: &'a AllergenTable) -> Self {
        Self { table }
    }

    /// Canonical id for a token. Unknown tokens come back folded so they still
    /// match each other exactly.
    pub fn normalize(&self, token: &str) -> String {
        let folded = fold(token);
        match self.table.canonical_for(&folded) {
            Some(canonical) => canonical.to_string(),
            None => folded,
        }
    }

    /// Canonical id set for a token list, blank tokens skipped
    pub fn normalize_all<S: AsRef<str>>(&self, tokens: &[S]) -> BTreeSet<String> {
        tokens
            .iter()
            .map(|t| self.normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Severity for a set of overlapping canonical ids
pub fn severity_for(overlap: &BTreeSet<String>) -> Severity {
    if overlap.is_empty() {
        Severity::None
    } else if overlap
        .iter()
        .any(|a| HIGH_RISK_ALLERGENS.contains(&a.as_str()))
    {
        Severity::High
    } else if overlap
        .iter()
        .any(|a| MEDIUM_RISK_ALLERGENS.contains(&a.as_str()))
    {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Compares meal and user allergens after normalization
#[derive(Debug, Clone, Copy)]
pub struct AllergenConflictChecker<'a> {
    normalizer: AllergenNormalizer<'a>,
}

impl Default for AllergenConflictChecker<'static> {
    fn default() -> Self {
        Self::new(AllergenNormalizer::global())
    }
}

impl<'a> AllergenConflictChecker<'a> {
    pub fn new(normalizer: AllergenNormalizer<'a>) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> AllergenNormalizer<'a> {
        self.normalizer
    }

    /// Reports the canonical allergens shared by both sides.
    ///
    /// An empty side never conflicts. Callers must not read that as "safe".
    pub fn check<M, U>(&self, meal_allergens: &[M], user_allergens: &[U]) -> ConflictReport
    where
        M: AsRef<str>,
        U: AsRef<str>,
    {
        let meal = self.normalizer.normalize_all(meal_allergens);
        let user = self.normalizer.normalize_all(user_allergens);
        if meal.is_empty() || user.is_empty() {
            return ConflictReport::none();
        }

        let overlapping: BTreeSet<String> = meal.intersection(&user).cloned().collect();
        let severity = severity_for(&overlapping);

        ConflictReport {
            has_conflict: !overlapping.is_empty(),
            overlapping,
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_synonyms_map_to_canonical_id() {
        let normalizer = AllergenNormalizer::global();
        assert_eq!(normalizer.normalize("Dairy"), "milk");
        assert_eq!(normalizer.normalize("  LACTOSE "), "milk");
        assert_eq!(normalizer.normalize("حليب"), "milk");
        assert_eq!(normalizer.normalize("Leche"), "milk");
        assert_eq!(normalizer.normalize("peanuts"), "nuts");
        assert_eq!(normalizer.normalize("tree   nuts"), "nuts");
        assert_eq!(normalizer.normalize("Wheat"), "gluten");
        assert_eq!(normalizer.normalize("tofu"), "soy");
    }

    #[test]
    fn test_unknown_token_is_its_own_id() {
        let normalizer = AllergenNormalizer::global();
        assert_eq!(normalizer.normalize(" Kiwi "), "kiwi");
        assert_eq!(normalizer.normalize(""), "");
    }

    #[test]
    fn test_normalize_all_skips_blanks() {
        let normalizer = AllergenNormalizer::global();
        let ids = normalizer.normalize_all(&["milk", " ", "cheese", "eggs"]);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["eggs", "milk"]);
    }

    #[test]
    fn test_custom_table() {
        let synonyms: &[&str] = &["kiwifruit", "actinidia"];
        let table = AllergenTable::from_entries([("kiwi", synonyms)]);
        let normalizer = AllergenNormalizer::new(&table);

        assert_eq!(table.len(), 3);
        assert_eq!(normalizer.normalize("Actinidia"), "kiwi");
        assert_eq!(normalizer.normalize("milk"), "milk");
    }

    #[test]
    fn test_milk_vs_dairy_is_high_conflict() {
        let checker = AllergenConflictChecker::default();
        let report = checker.check(&["milk"], &["dairy"]);

        assert!(report.has_conflict);
        assert_eq!(report.severity, Severity::High);
        assert!(report.overlapping.contains("milk"));
    }

    #[test]
    fn test_empty_meal_allergens_never_conflict() {
        let checker = AllergenConflictChecker::default();
        let report = checker.check(&NONE, &["peanuts"]);

        assert!(!report.has_conflict);
        assert_eq!(report.severity, Severity::None);
        assert!(report.overlapping.is_empty());
    }

    #[test]
    fn test_empty_user_allergens_never_conflict() {
        let checker = AllergenConflictChecker::default();
        let report = checker.check(&["milk"], &NONE);
        assert_eq!(report, ConflictReport::none());
    }

    #[test]
    fn test_medium_and_low_severity() {
        let checker = AllergenConflictChecker::default();

        let medium = checker.check(&["flour", "sugar"], &["gluten"]);
        assert_eq!(medium.severity, Severity::Medium);

        let low = checker.check(&["kiwi"], &["Kiwi"]);
        assert!(low.has_conflict);
        assert_eq!(low.severity, Severity::Low);
    }

    #[test]
    fn test_high_risk_dominates_mixed_overlap() {
        let checker = AllergenConflictChecker::default();
        let report = checker.check(&["soy", "shrimp"], &["soja", "prawns"]);

        assert_eq!(report.severity, Severity::High);
        assert_eq!(report.overlapping.len(), 2);
    }

    #[test]
    fn test_no_overlap() {
        let checker = AllergenConflictChecker::default();
        let report = checker.check(&["fish"], &["milk"]);

        assert!(!report.has_conflict);
        assert_eq!(report.severity, Severity::None);
    }

    #[test]
    fn test_severity_depends_only_on_overlap() {
        let checker = AllergenConflictChecker::default();
        let a = checker.check(&["sesame", "kiwi"], &["sesame"]);
        let b = checker.check(&["tahini"], &["sesame", "milk", "fish"]);
        assert_eq!(a.severity, b.severity);
    }
}
