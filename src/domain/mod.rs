//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - selectors (`Mode`, `PredictionType`)
//! - argument values and their validity predicates (`ArgValue`, `Constraint`)
//! - the immutable `ModelSpecification`
//! - introspection and prediction outputs (`TidyRecord`, `GlanceRecord`, `PredictionFrame`)

pub mod types;

pub use types::*;
