//! The L1 norm smoothed with $`A = I`$ and $`K = [-1, 1]^p`$
use ndarray::prelude::*;

use super::{delegate_smoothing, penalised, NesterovFunction, Smoothing};
use crate::error::Result;
use crate::functions::properties::{Function, Gradient, LipschitzContinuousGradient};
use crate::linop::{Identity, Operators};
use crate::maths::{norm1, norm_inf};

/// Clips every entry of every block to $`[-1, 1]`$
pub(crate) fn project_box(a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
    a.into_iter()
        .map(|ai| ai.mapv_into(|x| x.max(-1.0).min(1.0)))
        .collect()
}

/// $`l\|\beta\|_1`$ smoothed
#[derive(Debug)]
pub struct SmoothedL1 {
    smoothing: Smoothing,
}

impl SmoothedL1 {
    /// `p` is the number of penalised coefficients.
    pub fn new(l: f64, p: usize, mu: f64, penalty_start: usize) -> Result<Self> {
        let ops: Operators = vec![Box::new(Identity::new(p))];
        let smoothing = Smoothing::new("SmoothedL1", l, ops, mu, penalty_start)?;
        Ok(SmoothedL1 { smoothing })
    }
}

impl NesterovFunction for SmoothedL1 {
    delegate_smoothing!(smoothing);

    fn project(&self, a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
        project_box(a)
    }

    fn m(&self) -> f64 {
        self.smoothing.ops[0].shape().0 as f64 / 2.0
    }

    fn lambda_max(&self) -> f64 {
        1.0
    }

    fn estimate_mu(&self, beta: ArrayView1<'_, f64>) -> f64 {
        norm_inf(&penalised(beta, self.smoothing.penalty_start))
    }
}

impl Function for SmoothedL1 {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.smoothing.l * norm1(&penalised(beta, self.smoothing.penalty_start))
    }

    fn reset(&mut self) {
        self.smoothing.reset();
    }
}

impl Gradient for SmoothedL1 {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        self.smoothed_grad(beta)
    }
}

impl LipschitzContinuousGradient for SmoothedL1 {
    fn lipschitz(&self) -> f64 {
        self.smoothed_lipschitz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::nesterov::tests::approx_grad;
    use approx::assert_abs_diff_eq;

    #[test]
    fn huber_like() {
        let l1 = SmoothedL1::new(2.0, 3, 0.5, 0).unwrap();
        let beta = array![1.0, -0.2, 0.0];
        // |b| - mu/2 outside [-mu, mu], b^2 / (2 mu) inside
        let expected = 2.0 * ((1.0 - 0.25) + 0.04 / 1.0 + 0.0);
        assert_abs_diff_eq!(l1.fmu(beta.view()), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(l1.grad(beta.view()), array![2.0, -0.8, 0.0], epsilon = 1e-12);
        assert_abs_diff_eq!(l1.grad(beta.view()), approx_grad(&l1, &beta), epsilon = 1e-5);
        assert_abs_diff_eq!(l1.lipschitz(), 4.0);
        assert_abs_diff_eq!(l1.m(), 1.5);
        assert_abs_diff_eq!(l1.f(beta.view()), 2.4);
    }

    #[test]
    fn set_mu_returns_previous() {
        let mut l1 = SmoothedL1::new(1.0, 2, 0.5, 0).unwrap();
        assert_eq!(l1.set_mu(0.1), 0.5);
        assert_eq!(l1.get_mu(), 0.1);
        assert_abs_diff_eq!(l1.estimate_mu(array![0.3, -2.0].view()), 2.0);
    }
}
