//! L1 and total variation smoothed as one function
//!
//! Stacking $`A = [l I; g A_x; g A_y; g A_z]`$ gives
//! $`l\|\beta\|_1 + g\,\mathrm{TV}(\beta) = \max_{\alpha \in K} \langle A\beta, \alpha \rangle`$
//! where $`K`$ is a box for the first block and a product of unit balls over
//! the rows of the remaining three. The weights live in $`A`$, so the
//! regularisation constant of the smoothed function is 1.

use ndarray::prelude::*;

use super::l1::project_box;
use super::{delegate_smoothing, max_row_norm, penalised, project_rows, NesterovFunction, Smoothing};
use crate::error::{Error, Result};
use crate::functions::properties::{Function, Gradient, LipschitzContinuousGradient};
use crate::linop::{self, Identity, Operators, Scaled};
use crate::maths::norm_inf;

const POWER_ITER: usize = 1000;

/// $`l\|\beta\|_1 + g\,\mathrm{TV}(\beta)`$ smoothed
#[derive(Debug)]
pub struct L1TV {
    l1: f64,
    tv: f64,
    smoothing: Smoothing,
}

impl L1TV {
    /// `a_tv` holds the three difference blocks of the total variation.
    pub fn new(l: f64, g: f64, a_tv: Operators, mu: f64, penalty_start: usize) -> Result<Self> {
        let p = match a_tv.first() {
            Some(op) => op.shape().1,
            None => return Err(Error::MissingOperator("L1TV")),
        };
        if !(l >= 0.0 && g >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "l, g",
                reason: format!("must be non-negative, got {} and {}", l, g),
            });
        }
        let mut ops: Operators = Vec::with_capacity(a_tv.len() + 1);
        ops.push(Box::new(Identity::scaled(p, l)));
        for a in a_tv {
            ops.push(Box::new(Scaled::new(a, g)));
        }
        let smoothing = Smoothing::new("L1TV", 1.0, ops, mu, penalty_start)?;
        Ok(L1TV {
            l1: l,
            tv: g,
            smoothing,
        })
    }

    pub fn from_shape(l: f64, g: f64, shape: &[usize], mu: f64, penalty_start: usize) -> Result<Self> {
        L1TV::new(l, g, super::tv::linear_operator_from_shape(shape)?, mu, penalty_start)
    }

    /// Weight of the L1 part
    pub fn l1(&self) -> f64 {
        self.l1
    }

    /// Weight of the total variation part
    pub fn tv(&self) -> f64 {
        self.tv
    }
}

impl NesterovFunction for L1TV {
    delegate_smoothing!(smoothing);

    fn project(&self, mut a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
        let tv = a.split_off(1);
        let mut projected = project_box(a);
        projected.extend(project_rows(tv));
        projected
    }

    fn m(&self) -> f64 {
        let ops = &self.smoothing.ops;
        let tv_rows = ops.get(1).map_or(0, |op| op.shape().0);
        (ops[0].shape().0 + tv_rows) as f64 / 2.0
    }

    fn lambda_max(&self) -> f64 {
        *self
            .smoothing
            .lambda_max
            .get_or_init(|| linop::lambda_max(&self.smoothing.ops, POWER_ITER))
    }

    fn estimate_mu(&self, beta: ArrayView1<'_, f64>) -> f64 {
        let b = penalised(beta, self.smoothing.penalty_start);
        let ops = &self.smoothing.ops;
        let l1 = norm_inf(&ops[0].apply(b));
        l1.max(max_row_norm(&ops[1..], b))
    }
}

impl Function for L1TV {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        let b = penalised(beta, self.smoothing.penalty_start);
        let ops = &self.smoothing.ops;
        let l1 = ops[0].apply(b).mapv(f64::abs).sum();

        let ab: Vec<Array1<f64>> = ops[1..].iter().map(|op| op.apply(b)).collect();
        let mut sq = Array1::<f64>::zeros(ab.first().map_or(0, |a| a.len()));
        for a in &ab {
            sq += &a.mapv(|x| x * x);
        }
        l1 + sq.mapv(f64::sqrt).sum()
    }

    fn reset(&mut self) {
        self.smoothing.reset();
    }
}

impl Gradient for L1TV {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        self.smoothed_grad(beta)
    }
}

impl LipschitzContinuousGradient for L1TV {
    fn lipschitz(&self) -> f64 {
        self.smoothed_lipschitz()
    }
}
