//! Tabular input: columns and tables, formulas, and the demo dataset.

pub mod demo;
pub mod formula;
pub mod frame;

pub use demo::*;
pub use formula::*;
pub use frame::*;
