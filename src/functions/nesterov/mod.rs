//! Nesterov Smoothing of Non-smooth Penalties
//!
//! A penalty $`l\,\Omega(\beta) = l \max_{\alpha \in K} \langle A\beta, \alpha \rangle`$
//! with a compact dual set $`K`$ is replaced by the smooth surrogate
//! ```math
//! f_\mu(\beta) = l \left( \max_{\alpha \in K} \langle A\beta, \alpha \rangle - \frac{\mu}{2}\|\alpha\|_2^2 \right)
//! ```
//! whose maximiser is $`\alpha^*(\beta) = \Pi_K(A\beta / \mu)`$. The gradient
//! $`l A^T\alpha^*`$ is Lipschitz continuous with constant
//! $`l \lambda_{\max}(A^TA) / \mu`$.
//!
//! The penalties only differ in the shape of $`K`$ and the blocks of $`A`$.
//! The first `penalty_start` coefficients are never seen by $`A`$.

use std::cell::OnceCell;

use ndarray::prelude::*;

use crate::consts::{FLOAT_EPSILON, TOLERANCE};
use crate::error::{Error, Result};
use crate::linop::{LinearOperator, Operators};

pub mod gl;
pub mod l1;
pub mod l1tv;
pub mod tv;

pub use gl::GroupLassoOverlap;
pub use l1::SmoothedL1;
pub use l1tv::L1TV;
pub use tv::TotalVariation;

/// A penalty smoothed by Nesterov's technique
///
/// The smoothing constant is the only mutable state of a smoothed function.
/// [`set_mu`](NesterovFunction::set_mu) returns the previous value so that
/// callers can restore it after a temporary change.
pub trait NesterovFunction {
    /// The regularisation constant $`l`$
    fn l(&self) -> f64;

    fn get_mu(&self) -> f64;

    /// Sets the smoothing constant and returns the old one.
    fn set_mu(&mut self, mu: f64) -> f64;

    /// The operator blocks $`A_1, \ldots, A_k`$
    fn linear_operator(&self) -> &[Box<dyn LinearOperator>];

    fn penalty_start(&self) -> usize;

    /// Projection of the dual blocks onto $`K`$
    fn project(&self, a: Vec<Array1<f64>>) -> Vec<Array1<f64>>;

    /// $`M = \max_{\alpha \in K} \frac12 \|\alpha\|_2^2`$
    fn m(&self) -> f64;

    /// Largest eigenvalue of $`A^TA`$
    fn lambda_max(&self) -> f64;

    /// A smoothing constant on the scale of the dual response at `beta`
    fn estimate_mu(&self, beta: ArrayView1<'_, f64>) -> f64;

    /// The dual point $`\alpha^*(\beta)`$ at the current $`\mu`$
    fn alpha(&self, beta: ArrayView1<'_, f64>) -> Vec<Array1<f64>> {
        let mu = self.get_mu().max(FLOAT_EPSILON);
        let b = penalised(beta, self.penalty_start());
        let a = self
            .linear_operator()
            .iter()
            .map(|op| op.apply(b) / mu)
            .collect();
        self.project(a)
    }

    /// $`A^T\alpha`$, zero padded over the unpenalised prefix
    fn aa(&self, alpha: &[Array1<f64>]) -> Array1<f64> {
        let ops = self.linear_operator();
        let p = ops.first().map_or(0, |op| op.shape().1);
        let mut aa = Array1::zeros(self.penalty_start() + p);
        {
            let mut tail = aa.slice_mut(s![self.penalty_start()..]);
            for (op, a) in ops.iter().zip(alpha) {
                tail += &op.apply_adjoint(a.view());
            }
        }
        aa
    }

    /// Smoothed value at a known dual point
    fn phi(&self, alpha: &[Array1<f64>], beta: ArrayView1<'_, f64>) -> f64 {
        if self.l() < TOLERANCE {
            return 0.0;
        }
        let sqsum: f64 = alpha.iter().map(|a| a.dot(a)).sum();
        self.l() * (beta.dot(&self.aa(alpha)) - 0.5 * self.get_mu() * sqsum)
    }

    /// $`f_\mu(\beta)`$
    fn fmu(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.phi(&self.alpha(beta), beta)
    }

    /// $`l A^T \alpha^*(\beta)`$
    fn smoothed_grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        if self.l() < TOLERANCE {
            return Array1::zeros(beta.len());
        }
        self.aa(&self.alpha(beta)) * self.l()
    }

    /// $`l \lambda_{\max}(A^TA) / \mu`$
    fn smoothed_lipschitz(&self) -> f64 {
        if self.l() < TOLERANCE {
            return 0.0;
        }
        self.l() * self.lambda_max() / self.get_mu()
    }
}

/// The suffix of `beta` that the operator blocks act on
pub(crate) fn penalised(beta: ArrayView1<'_, f64>, penalty_start: usize) -> ArrayView1<'_, f64> {
    let start = penalty_start.min(beta.len());
    beta.slice_move(s![start..])
}

/// Projects every block onto the unit L2 ball
pub(crate) fn project_blocks(a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
    a.into_iter()
        .map(|mut ai| {
            let norm = ai.dot(&ai).sqrt();
            if norm > 1.0 {
                ai /= norm;
            }
            ai
        })
        .collect()
}

/// Projects the rows shared by the blocks jointly onto the unit L2 ball,
/// i.e. $`(a_{1,i}, \ldots, a_{k,i})`$ for every row $`i`$
pub(crate) fn project_rows(mut a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
    let rows = a.first().map_or(0, |ai| ai.len());
    for i in 0..rows {
        let norm = a.iter().map(|ai| ai[i] * ai[i]).sum::<f64>().sqrt();
        if norm > 1.0 {
            for ai in a.iter_mut() {
                ai[i] /= norm;
            }
        }
    }
    a
}

/// Largest row norm across the blocks, $`\max_i \|(A_1\beta)_i, \ldots, (A_k\beta)_i\|_2`$
pub(crate) fn max_row_norm(ops: &[Box<dyn LinearOperator>], beta: ArrayView1<'_, f64>) -> f64 {
    let ab: Vec<Array1<f64>> = ops.iter().map(|op| op.apply(beta)).collect();
    let rows = ab.first().map_or(0, |a| a.len());
    (0..rows)
        .map(|i| ab.iter().map(|a| a[i] * a[i]).sum::<f64>().sqrt())
        .fold(0.0, f64::max)
}

/// State shared by every smoothed penalty
pub(crate) struct Smoothing {
    pub l: f64,
    pub mu: f64,
    pub ops: Operators,
    pub penalty_start: usize,
    pub lambda_max: OnceCell<f64>,
}

impl Smoothing {
    pub fn new(name: &'static str, l: f64, ops: Operators, mu: f64, penalty_start: usize) -> Result<Self> {
        let p = match ops.first() {
            Some(op) => op.shape().1,
            None => return Err(Error::MissingOperator(name)),
        };
        if let Some(op) = ops.iter().find(|op| op.shape().1 != p) {
            return Err(Error::ShapeMismatch {
                expected: vec![op.shape().0, p],
                got: vec![op.shape().0, op.shape().1],
            });
        }
        if !(l >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "l",
                reason: format!("must be non-negative, got {}", l),
            });
        }
        Ok(Smoothing {
            l,
            mu,
            ops,
            penalty_start,
            lambda_max: OnceCell::new(),
        })
    }

    pub fn set_mu(&mut self, mu: f64) -> f64 {
        std::mem::replace(&mut self.mu, mu)
    }

    pub fn reset(&mut self) {
        self.lambda_max = OnceCell::new();
    }
}

impl std::fmt::Debug for Smoothing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Smoothing")
            .field("l", &self.l)
            .field("mu", &self.mu)
            .field("blocks", &self.ops.len())
            .field("penalty_start", &self.penalty_start)
            .finish()
    }
}

/// Forwards the bookkeeping part of [`NesterovFunction`] to a [`Smoothing`] field
macro_rules! delegate_smoothing {
    ($field:ident) => {
        fn l(&self) -> f64 {
            self.$field.l
        }

        fn get_mu(&self) -> f64 {
            self.$field.mu
        }

        fn set_mu(&mut self, mu: f64) -> f64 {
            self.$field.set_mu(mu)
        }

        fn linear_operator(&self) -> &[Box<dyn crate::linop::LinearOperator>] {
            &self.$field.ops
        }

        fn penalty_start(&self) -> usize {
            self.$field.penalty_start
        }
    };
}
pub(crate) use delegate_smoothing;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::functions::properties::Gradient;

    /// Central differences of the smoothed value
    pub fn approx_grad<N: NesterovFunction>(n: &N, beta: &Array1<f64>) -> Array1<f64> {
        let h = 1e-6;
        Array1::from_shape_fn(beta.len(), |i| {
            let mut up = beta.clone();
            let mut down = beta.clone();
            up[i] += h;
            down[i] -= h;
            (n.fmu(up.view()) - n.fmu(down.view())) / (2.0 * h)
        })
    }

    #[test]
    fn row_projection() {
        let a = vec![array![3., 0.1], array![4., 0.2]];
        let p = project_rows(a);
        assert_eq!(p[0], array![0.6, 0.1]);
        assert_eq!(p[1], array![0.8, 0.2]);

        let b = project_blocks(vec![array![3., 4.], array![0.1, 0.2]]);
        assert_eq!(b[0], array![0.6, 0.8]);
        assert_eq!(b[1], array![0.1, 0.2]);
    }

    #[test]
    fn smoothed_gradient_matches_value() {
        use approx::assert_abs_diff_eq;
        let tv = TotalVariation::from_shape(0.7, &[2, 3], 0.05, 1).unwrap();
        let beta = array![2.0, 0.3, -0.1, 0.8, 0.9, -1.2, 0.05];
        assert_abs_diff_eq!(tv.grad(beta.view()), approx_grad(&tv, &beta), epsilon = 1e-5);
        assert_eq!(tv.grad(beta.view())[0], 0.);
    }
}
