//! Fitting and prediction.
//!
//! Responsibilities:
//!
//! - resolve a specification (engine, mode, native arguments) against a registry
//! - prepare data for the formula path or the pre-separated `x`/`y` path
//! - call the engine and keep everything needed to predict on new data
//! - realign engine predictions into one row per input row

pub mod dispatch;
pub mod predict;

pub use dispatch::*;
pub use predict::*;
