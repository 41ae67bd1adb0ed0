//! Error types.

use thiserror::Error;

/// Failure to read or parse a commit trace.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed trace line {line_no}: {reason} ({line:?})")]
    Parse {
        /// 1-based line number in the trace
        line_no: usize,
        /// The offending line
        line: String,
        reason: String,
    },
}

/// A predictor configuration which cannot be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{what} must be a non-zero power of two (got {value})")]
    NotPowerOfTwo { what: &'static str, value: usize },

    #[error("{what} is too large (got {value}, at most {max} supported)")]
    TooLarge { what: &'static str, value: usize, max: usize },

    #[error("the return address stack needs at least one entry")]
    EmptyRas,

    #[error("the {predictor} predictor only supports a fetch width of 1 (got {width})")]
    UnsupportedWidth { predictor: &'static str, width: usize },

    #[error("global history length {0} is larger than the supported maximum")]
    HistoryTooLong(usize),

    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Misuse of a [`ReturnAddressStack`](crate::predictor::ReturnAddressStack).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasError {
    #[error("pop from an empty return address stack")]
    Empty,
}

/// Top-level error for an evaluation run.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("total branch/jump count is zero: the trace contains no control flow")]
    NoControlFlow,
}
