//! Reporting: a serializable summary of a fit, and terminal formatting.
//!
//! We keep formatting code in one place so:
//! - the registry and fitting code stay free of presentation concerns
//! - output changes are localized

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{ArgValue, GlanceRecord, Mode, TidyRecord};
use crate::fit::FitResult;

pub mod format;

pub use format::*;

/// Everything worth keeping from a fit once the model object is gone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub family: String,
    pub engine: String,
    pub mode: Mode,
    pub call: String,
    pub args: Vec<(String, ArgValue)>,
    pub fitted_at: DateTime<Utc>,
    pub elapsed_ms: f64,
    /// `None` when the engine has no coefficient table.
    pub tidy: Option<Vec<TidyRecord>>,
    pub glance: GlanceRecord,
}

impl FitReport {
    pub fn from_fit(fit: &FitResult) -> Self {
        Self {
            family: fit.spec().family().to_string(),
            engine: fit.engine_id().to_string(),
            mode: fit.mode(),
            call: fit.call().to_string(),
            args: fit.args().to_vec(),
            fitted_at: fit.fitted_at(),
            elapsed_ms: fit.elapsed().as_secs_f64() * 1e3,
            tidy: fit.tidy().ok(),
            glance: fit.glance(),
        }
    }
}
