//! What the algorithms return

use ndarray::prelude::*;

/// Values recorded by an algorithm while it iterates
///
/// Which series are filled depends on the algorithm. FISTA records the
/// function value per iteration, CONESTA the function value, smoothing
/// constant and gap per continuation step, and the excessive gap method the
/// function value, smoothing constant and upper bound per iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub f: Vec<f64>,
    pub mu: Vec<f64>,
    pub gap: Vec<f64>,
    pub upper_bound: Vec<f64>,
}

/// The result of a run
///
/// An exhausted iteration budget is not an error. The last iterate is
/// returned with `converged` set to false.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub beta: Array1<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Only recorded when the algorithm's `output` parameter is set
    pub trace: Option<Trace>,
}

impl Solution {
    /// The recorded function values, empty without a trace
    pub fn f_values(&self) -> &[f64] {
        self.trace.as_ref().map_or(&[], |t| &t.f[..])
    }
}
