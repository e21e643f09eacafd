//! Sum of smooth terms and one proximal term
//!
//! ```math
//! f(\beta) = \sum_i g_i(\beta) + h(\beta)
//! ```
//! with differentiable $`g_i`$ and a non-smooth $`h`$ that only enters
//! through its proximal operator, the forward-backward splitting form that
//! FISTA minimises.

use ndarray::prelude::*;

use super::penalties::ZeroFunction;
use super::properties::{Function, Gradient, LipschitzContinuousGradient, ProximalOperator, StepSize};
use crate::consts::TOLERANCE;
use crate::smooth::BacktrackingLineSearch;

enum Term {
    Smooth(Box<dyn Gradient>),
    Lipschitz(Box<dyn LipschitzContinuousGradient>),
}

impl Term {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        match self {
            Term::Smooth(g) => g.f(beta),
            Term::Lipschitz(g) => g.f(beta),
        }
    }

    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        match self {
            Term::Smooth(g) => g.grad(beta),
            Term::Lipschitz(g) => g.grad(beta),
        }
    }

    fn reset(&mut self) {
        match self {
            Term::Smooth(g) => g.reset(),
            Term::Lipschitz(g) => g.reset(),
        }
    }
}

/// Builder style container of the terms of an objective
///
/// ```ignore
/// let lasso = CombinedFunction::new()
///     .add_lipschitz_function(RidgeRegression::new(x, y, 0.0)?)
///     .set_prox(L1::new(0.1));
/// ```
pub struct CombinedFunction {
    terms: Vec<Term>,
    prox: Box<dyn ProximalOperator>,
    line_search: BacktrackingLineSearch,
}

impl Default for CombinedFunction {
    fn default() -> Self {
        CombinedFunction {
            terms: Vec::new(),
            prox: Box::new(ZeroFunction),
            line_search: BacktrackingLineSearch::new(),
        }
    }
}

impl CombinedFunction {
    pub fn new() -> Self {
        CombinedFunction::default()
    }

    /// Adds a differentiable term without a known Lipschitz constant. The
    /// step size then comes from a line search.
    pub fn add_function<G: Gradient + 'static>(mut self, g: G) -> Self {
        self.terms.push(Term::Smooth(Box::new(g)));
        self
    }

    pub fn add_lipschitz_function<G: LipschitzContinuousGradient + 'static>(mut self, g: G) -> Self {
        self.terms.push(Term::Lipschitz(Box::new(g)));
        self
    }

    /// Replaces the proximal term, [`ZeroFunction`] by default.
    pub fn set_prox<P: ProximalOperator + 'static>(mut self, h: P) -> Self {
        self.prox = Box::new(h);
        self
    }

    pub fn with_line_search(mut self, line_search: BacktrackingLineSearch) -> Self {
        self.line_search = line_search;
        self
    }

    /// Value of the differentiable part
    pub fn smooth_f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.terms.iter().map(|t| t.f(beta)).sum()
    }

    /// Sum of the Lipschitz constants, `None` if a term has none
    pub fn lipschitz(&self) -> Option<f64> {
        self.terms
            .iter()
            .map(|t| match t {
                Term::Lipschitz(g) => Some(g.lipschitz()),
                Term::Smooth(_) => None,
            })
            .sum()
    }
}

impl Function for CombinedFunction {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.smooth_f(beta) + self.prox.f(beta)
    }

    fn reset(&mut self) {
        for t in self.terms.iter_mut() {
            t.reset();
        }
        self.prox.reset();
    }
}

impl Gradient for CombinedFunction {
    /// Gradient of the differentiable part
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut grad = Array1::zeros(beta.len());
        for t in &self.terms {
            grad += &t.grad(beta);
        }
        grad
    }
}

impl ProximalOperator for CombinedFunction {
    fn prox(&self, beta: ArrayView1<'_, f64>, factor: f64) -> Array1<f64> {
        self.prox.prox(beta, factor)
    }
}

impl StepSize for CombinedFunction {
    fn step(&self, beta: ArrayView1<'_, f64>) -> f64 {
        if let Some(l) = self.lipschitz() {
            if l > TOLERANCE {
                return 1.0 / l;
            }
        }
        let grad = self.grad(beta);
        let p = -&grad;
        self.line_search.run(|x| self.smooth_f(x), beta, p.view(), grad.view())
    }
}
