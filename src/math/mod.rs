//! Numerical utilities: least squares and distribution helpers.

pub mod inference;
pub mod ols;

pub use inference::*;
pub use ols::*;
