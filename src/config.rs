use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

/// Cut points for program eligibility and the BMI-tier meal criteria.
///
/// Read from `ELIGIBILITY_*` variables, e.g. `ELIGIBILITY_MAX_CALORIES=450`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EligibilityPolicy {
    /// Minimum BMI for program eligibility
    pub program_bmi_threshold: f64,
    /// Calorie ceiling per meal
    pub max_calories: u32,
    /// Protein floor in grams
    pub min_protein_g: f64,
    /// Fiber floor in grams
    pub min_fiber_g: f64,
    /// Sugar ceiling in grams
    pub max_sugar_g: f64,
    /// Share of the four criteria a meal has to meet
    pub required_ratio: f64,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            program_bmi_threshold: 30.0,
            max_calories: 400,
            min_protein_g: 15.0,
            min_fiber_g: 3.0,
            max_sugar_g: 15.0,
            required_ratio: 0.75,
        }
    }
}

impl EligibilityPolicy {
    pub fn from_env() -> anyhow::Result<Self> {
        let policy = envy::prefixed("ELIGIBILITY_")
            .from_env::<EligibilityPolicy>()
            .map_err(|e| anyhow::anyhow!("Failed to load eligibility policy: {}", e))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.required_ratio > 0.0 && self.required_ratio <= 1.0) {
            anyhow::bail!(
                "required_ratio must be in (0, 1], got {}",
                self.required_ratio
            );
        }
        if !(self.program_bmi_threshold > 0.0) {
            anyhow::bail!(
                "program_bmi_threshold must be positive, got {}",
                self.program_bmi_threshold
            );
        }
        for (name, value) in [
            ("min_protein_g", self.min_protein_g),
            ("min_fiber_g", self.min_fiber_g),
            ("max_sugar_g", self.max_sugar_g),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                anyhow::bail!("{} must be a non-negative number, got {}", name, value);
            }
        }
        Ok(())
    }
}

/// Selection limits for the recommendation engine.
///
/// Read from `RECOMMENDATION_*` variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RecommendationPolicy {
    /// Meals returned per category when the caller does not ask otherwise
    pub top_n_per_category: usize,
    /// History entries that block a meal from being recommended again
    pub recent_history_limit: usize,
    /// Hard calorie cap for program-eligible users
    pub obese_calorie_cap: u32,
    /// Calorie cap for everyone else when none is requested
    pub default_calorie_cap: u32,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            top_n_per_category: 3,
            recent_history_limit: 10,
            obese_calorie_cap: 700,
            default_calorie_cap: 800,
        }
    }
}

impl RecommendationPolicy {
    pub fn from_env() -> anyhow::Result<Self> {
        let policy = envy::prefixed("RECOMMENDATION_")
            .from_env::<RecommendationPolicy>()
            .map_err(|e| anyhow::anyhow!("Failed to load recommendation policy: {}", e))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.top_n_per_category == 0 {
            anyhow::bail!("top_n_per_category must be at least 1");
        }
        if self.obese_calorie_cap == 0 || self.default_calorie_cap == 0 {
            anyhow::bail!("calorie caps must be positive");
        }
        Ok(())
    }
}
