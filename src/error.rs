//! Error type of the crate
//!
//! Only structural misuse is an error. Numerical conditions such as a
//! purged soft threshold or an exhausted iteration budget are reported
//! through the returned values and the `log` facade instead.

use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// Result type alias using the crate's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A Nesterov function was built without a linear operator
    #[error("Missing linear operator: {0} requires at least one operator block")]
    MissingOperator(&'static str),

    /// A parameter is outside of its admissible range
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The objective can not be minimised by the requested algorithm
    #[error("Incompatible function for {algorithm}: {reason}")]
    Incompatible {
        /// The algorithm name
        algorithm: &'static str,
        /// The violated precondition
        reason: String,
    },

    /// Operand shapes do not agree
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// A dense factorisation failed
    #[error("Linear algebra failure: {0}")]
    Linalg(#[from] LinalgError),
}
