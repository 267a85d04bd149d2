//! Input/output helpers.
//!
//! - CSV ingest into a `Table` (`ingest`)
//! - prediction CSV and report JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
