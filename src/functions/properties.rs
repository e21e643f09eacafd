//! Capabilities an objective may have
//!
//! The algorithms state what they need from a function as bounds on these
//! traits, so pairing an objective with an algorithm that can not minimise
//! it is a compile error.

use ndarray::prelude::*;

use crate::error::Result;

/// A function with a value
pub trait Function {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64;

    /// Drops every cached quantity derived from the function's parameters.
    fn reset(&mut self) {}
}

pub trait Gradient: Function {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64>;
}

/// A gradient that is Lipschitz continuous
pub trait LipschitzContinuousGradient: Gradient {
    /// Lipschitz constant of the gradient
    fn lipschitz(&self) -> f64;
}

/// Knows the step size to take in a descent method
pub trait StepSize: Gradient {
    fn step(&self, beta: ArrayView1<'_, f64>) -> f64;
}

pub trait ProximalOperator: Function {
    /// $`\mathrm{arg\,min}_x \frac12\|x - \beta\|^2 + \mathrm{factor}\cdot f(x)`$
    fn prox(&self, beta: ArrayView1<'_, f64>, factor: f64) -> Array1<f64>;
}

pub trait ProjectionOperator {
    /// Euclidean projection onto the feasible set
    fn proj(&self, beta: ArrayView1<'_, f64>) -> Array1<f64>;
}

pub trait Constraint {
    fn feasible(&self, beta: ArrayView1<'_, f64>) -> bool;
}

pub trait StronglyConvex {
    /// The strong convexity parameter
    fn parameter(&self) -> f64;
}

/// Closed form helpers for continuation on the smoothing constant
///
/// The three maps must agree, `eps_opt(mu_opt(eps)) == eps`.
pub trait Continuation {
    /// The smoothing constant that reaches precision `eps` fastest
    fn mu_opt(&self, eps: f64) -> f64;

    /// The precision to aim for at smoothing constant `mu`
    fn eps_opt(&self, mu: f64) -> f64;

    /// Upper bound of the smoothing error at `mu`
    fn eps_max(&self, mu: f64) -> f64;
}

pub trait DualFunction {
    /// Minimiser of the objective linearised at the dual point `alpha`
    fn betahat(&self, alpha: &[Array1<f64>], beta: ArrayView1<'_, f64>) -> Result<Array1<f64>>;

    /// Duality gap at `beta`
    fn gap(&self, beta: ArrayView1<'_, f64>) -> Result<f64>;
}

pub trait GradientMap {
    /// Dual gradient step from `u` at `beta` with step `1/l`, projected
    fn v(&self, u: &[Array1<f64>], beta: ArrayView1<'_, f64>, l: f64) -> Vec<Array1<f64>>;
}
