//! `unispec` library crate: one model specification, many fitting engines.
//!
//! A `ModelSpecification` names a model family, an optional engine, a mode and
//! a set of arguments in a vocabulary shared by every engine. The `Registry`
//! validates and translates it to each engine's native arguments; `fit`/`fit_xy`
//! dispatch to the engine and `FitResult` predicts with one row per input row.
//!
//! The binary (`unispec`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - engines can be registered from outside the crate

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod engines;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod registry;
pub mod report;

pub use domain::{ArgValue, Mode, ModelSpecification, PredictionFrame, PredictionType};
pub use error::{EngineError, SpecError};
pub use fit::{fit, fit_xy, FitResult, PredictOptions};
pub use registry::Registry;
