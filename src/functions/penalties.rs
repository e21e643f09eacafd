//! Penalties and constraints on the coefficient vector
//!
//! All of them leave the first `penalty_start` coefficients unpenalised.

use ndarray::prelude::*;

use super::properties::{
    Constraint, Function, Gradient, LipschitzContinuousGradient, ProjectionOperator, ProximalOperator,
};
use crate::maths::norm1;
use crate::prox_ops::{L1BinarySearch, ProxOp, SoftThreshold};

fn penalised(beta: ArrayView1<'_, f64>, penalty_start: usize) -> ArrayView1<'_, f64> {
    let start = penalty_start.min(beta.len());
    beta.slice_move(s![start..])
}

/// The zero function, whose proximal operator is the identity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZeroFunction;

impl Function for ZeroFunction {
    fn f(&self, _beta: ArrayView1<'_, f64>) -> f64 {
        0.0
    }
}

impl Gradient for ZeroFunction {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        Array1::zeros(beta.len())
    }
}

impl ProximalOperator for ZeroFunction {
    fn prox(&self, beta: ArrayView1<'_, f64>, _factor: f64) -> Array1<f64> {
        beta.to_owned()
    }
}

impl ProjectionOperator for ZeroFunction {
    fn proj(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        beta.to_owned()
    }
}

/// $`f(\beta) = l(\|\beta\|_1 - c)`$, or the constraint $`\|\beta\|_1 \leq c`$
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct L1 {
    pub l: f64,
    pub c: f64,
    pub penalty_start: usize,
}

impl L1 {
    pub fn new(l: f64) -> Self {
        L1 { l, c: 0.0, penalty_start: 0 }
    }
}

impl Function for L1 {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.l * (norm1(&penalised(beta, self.penalty_start)) - self.c)
    }
}

impl ProximalOperator for L1 {
    fn prox(&self, beta: ArrayView1<'_, f64>, factor: f64) -> Array1<f64> {
        SoftThreshold {
            threshold: self.l * factor,
            allow_empty: true,
            penalty_start: self.penalty_start,
        }
        .prox(beta)
    }
}

impl ProjectionOperator for L1 {
    fn proj(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        L1BinarySearch {
            s: self.c,
            penalty_start: self.penalty_start,
        }
        .prox(beta)
    }
}

impl Constraint for L1 {
    fn feasible(&self, beta: ArrayView1<'_, f64>) -> bool {
        norm1(&penalised(beta, self.penalty_start)) <= self.c
    }
}

/// $`f(\beta) = l(\|\beta\|_2^2 - c)`$, or the constraint $`\|\beta\|_2^2 \leq c`$
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct L2 {
    pub l: f64,
    pub c: f64,
    pub penalty_start: usize,
}

impl L2 {
    pub fn new(l: f64) -> Self {
        L2 { l, c: 0.0, penalty_start: 0 }
    }

    fn sqnorm(&self, beta: ArrayView1<'_, f64>) -> f64 {
        let b = penalised(beta, self.penalty_start);
        b.dot(&b)
    }
}

impl Function for L2 {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.l * (self.sqnorm(beta) - self.c)
    }
}

impl Gradient for L2 {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        let start = self.penalty_start.min(beta.len());
        let mut grad = Array1::zeros(beta.len());
        grad.slice_mut(s![start..])
            .assign(&(&beta.slice(s![start..]) * (2.0 * self.l)));
        grad
    }
}

impl LipschitzContinuousGradient for L2 {
    fn lipschitz(&self) -> f64 {
        2.0 * self.l
    }
}

impl ProximalOperator for L2 {
    fn prox(&self, beta: ArrayView1<'_, f64>, factor: f64) -> Array1<f64> {
        let start = self.penalty_start.min(beta.len());
        let mut prox = beta.to_owned();
        prox.slice_mut(s![start..])
            .mapv_inplace(|b| b / (1.0 + 2.0 * self.l * factor));
        prox
    }
}

impl ProjectionOperator for L2 {
    fn proj(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        let sqnorm = self.sqnorm(beta);
        let mut proj = beta.to_owned();
        if sqnorm > self.c {
            let start = self.penalty_start.min(beta.len());
            let scale = (self.c.max(0.0) / sqnorm).sqrt();
            proj.slice_mut(s![start..]).mapv_inplace(|b| b * scale);
        }
        proj
    }
}

impl Constraint for L2 {
    fn feasible(&self, beta: ArrayView1<'_, f64>) -> bool {
        self.sqnorm(beta) <= self.c
    }
}
