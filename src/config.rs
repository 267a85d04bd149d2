//! Runtime settings from the environment (and `.env`).
//!
//! | Variable         | Meaning                            | Default |
//! |------------------|------------------------------------|---------|
//! | `UNISPEC_LOG`    | `env_logger` filter                | `warn`  |
//! | `UNISPEC_LEVEL`  | default interval coverage, `(0,1)` | `0.95`  |
//! | `UNISPEC_DIGITS` | decimals in printed reports        | `4`     |
//!
//! CLI flags override these.

use crate::error::AppError;

pub const LOG_VAR: &str = "UNISPEC_LOG";
pub const LEVEL_VAR: &str = "UNISPEC_LEVEL";
pub const DIGITS_VAR: &str = "UNISPEC_DIGITS";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_filter: String,
    pub level: f64,
    pub digits: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            level: 0.95,
            digits: 4,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Settings::default();

        if let Some(filter) = lookup(LOG_VAR).filter(|v| !v.trim().is_empty()) {
            settings.log_filter = filter.trim().to_string();
        }
        if let Some(raw) = lookup(LEVEL_VAR) {
            settings.level = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| *v > 0.0 && *v < 1.0)
                .ok_or_else(|| AppError::new(2, format!("{LEVEL_VAR} must be a number in (0, 1), got '{raw}'.")))?;
        }
        if let Some(raw) = lookup(DIGITS_VAR) {
            settings.digits = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|v| *v <= 12)
                .ok_or_else(|| AppError::new(2, format!("{DIGITS_VAR} must be an integer in 0..=12, got '{raw}'.")))?;
        }
        Ok(settings)
    }
}
