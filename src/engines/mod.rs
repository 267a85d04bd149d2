//! Engine interface and the reference engines.
//!
//! An engine is an opaque entry point: it receives native arguments (already
//! translated), a predictor table and a response column, and returns a fitted
//! model object. Everything the unifier knows about an engine beyond that
//! lives in its `EngineDef` registration.
//!
//! The reference engines here stand in for third-party libraries:
//!
//! - `LinearModel` (`lm`): ordinary least squares with inference
//! - `ElasticNet` (`glmnet`): penalized least squares by coordinate descent
//! - `LogisticModel` (`glm`): binary logistic regression by IRLS
//! - `NearestNeighbors` (`kknn`): k-nearest-neighbour regression/classification
//!
//! All of them drop rows with missing values, at fit time and at predict time;
//! predictions are returned tagged with the input row index.

use std::fmt;

use crate::data::{Column, Table};
use crate::domain::{ArgValue, GlanceRecord, Mode, PredictionType, TidyRecord};
use crate::error::EngineError;

pub mod common;
pub mod glm;
pub mod glmnet;
pub mod kknn;
pub mod lm;

pub use glm::LogisticModel;
pub use glmnet::ElasticNet;
pub use kknn::NearestNeighbors;
pub use lm::LinearModel;

/// Everything an engine receives for a fit.
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    pub mode: Mode,
    /// Native argument names and values, in translation order.
    pub args: &'a [(String, ArgValue)],
    pub predictors: &'a Table,
    pub response: &'a Column,
    /// Whether the engine should estimate an intercept.
    pub intercept: bool,
}

/// Prediction settings passed through to the fitted model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictRequest {
    pub kind: PredictionType,
    /// Coverage of interval predictions, in `(0, 1)`.
    pub level: f64,
}

/// One row's prediction as produced by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Value(f64),
    Class(String),
    /// One probability per class level, in level order.
    Probabilities(Vec<f64>),
    Interval { lower: f64, upper: f64 },
}

/// External fitting entry point.
pub trait ModelEngine: Send + Sync + fmt::Debug {
    fn fit(&self, request: &EngineRequest<'_>) -> Result<Box<dyn FittedModel>, EngineError>;
}

/// External fitted model object.
pub trait FittedModel: Send + Sync + fmt::Debug {
    /// Predict for the rows of `data` the model can handle. Rows it cannot
    /// (e.g. missing predictors) may be left out.
    fn predict(&self, data: &Table, request: &PredictRequest) -> Result<Vec<(usize, Prediction)>, EngineError>;

    /// Coefficient table, when the model has one.
    fn tidy(&self) -> Option<Vec<TidyRecord>>;

    fn glance(&self) -> GlanceRecord;

    /// Class levels for classification models; empty otherwise.
    fn levels(&self) -> &[String];
}
