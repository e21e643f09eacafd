//! Numerical constants shared by the functions and algorithms

/// Default convergence tolerance, and the threshold below which a
/// regularisation constant is treated as zero.
pub const TOLERANCE: f64 = 5e-8;

/// Default iteration cap of the iterative algorithms.
pub const MAX_ITER: usize = 10_000;

/// Machine epsilon of `f64`.
pub const FLOAT_EPSILON: f64 = f64::EPSILON;
