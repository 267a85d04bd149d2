//! Error types.
//!
//! - `SpecError`: everything the library can report, one variant per failure
//!   kind, each carrying the family / engine / argument that caused it.
//! - `EngineError`: what an engine implementation returns; the dispatch layer
//!   wraps it into `SpecError::Engine` with context.
//! - `AppError`: what the binary prints (message + process exit code).

use thiserror::Error;

use crate::domain::{Mode, PredictionType};

pub type Result<T, E = SpecError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    #[error("model family `{0}` is already registered")]
    DuplicateFamily(String),

    #[error("unknown model family `{0}`")]
    UnknownFamily(String),

    #[error("engine `{engine}` is not registered for family `{family}`")]
    UnknownEngine { family: String, engine: String },

    #[error("engine `{engine}` is already registered for family `{family}`")]
    DuplicateEngine { family: String, engine: String },

    #[error("engine `{engine}` maps `{argument}`, which family `{family}` does not recognize")]
    InvalidMapping {
        family: String,
        engine: String,
        argument: String,
    },

    #[error("family `{family}` does not support mode `{mode}`")]
    UnsupportedMode { family: String, mode: Mode },

    #[error("engine `{engine}` of family `{family}` does not support mode `{mode}`")]
    ModeMismatch {
        family: String,
        engine: String,
        mode: Mode,
    },

    #[error("invalid value `{value}` for argument `{argument}` of family `{family}`: expected {expected}")]
    InvalidArgumentValue {
        family: String,
        argument: String,
        value: String,
        expected: String,
    },

    #[error("argument `{argument}` is not exposed by engine `{engine}` of family `{family}`")]
    UnsupportedArgument {
        family: String,
        engine: String,
        argument: String,
    },

    #[error("incomplete specification for family `{family}`: {missing}")]
    IncompleteSpecification { family: String, missing: String },

    #[error("engine `{engine}` of family `{family}` cannot produce `{kind}` predictions in mode `{mode}`")]
    UnsupportedPredictionType {
        family: String,
        engine: String,
        mode: Mode,
        kind: PredictionType,
    },

    #[error("engine `{engine}` of family `{family}` has no coefficient table")]
    TidyUnavailable { family: String, engine: String },

    #[error("formula error: {0}")]
    Formula(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("engine `{engine}` of family `{family}` failed in mode `{mode}` running `{call}`: {source}")]
    Engine {
        family: String,
        engine: String,
        mode: Mode,
        /// Rendered engine call with the translated native arguments.
        call: String,
        #[source]
        source: EngineError,
    },
}

/// Failure raised inside an engine implementation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<SpecError> for AppError {
    fn from(err: SpecError) -> Self {
        // 2: specification / usage, 3: data, 4: engine failure.
        let exit_code = match &err {
            SpecError::Formula(_) | SpecError::Data(_) => 3,
            SpecError::Engine { .. } => 4,
            _ => 2,
        };
        AppError::new(exit_code, err.to_string())
    }
}
