//! Loss functions
use std::cell::OnceCell;

use ndarray::prelude::*;
use ndarray_linalg::{EigValsh, UPLO};

use super::properties::{Function, Gradient, LipschitzContinuousGradient, StronglyConvex};
use crate::error::{Error, Result};
use crate::linop::lambda_max_gram;

const POWER_ITER: usize = 1000;

fn check_rows(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![x.nrows()],
            got: vec![y.len()],
        });
    }
    Ok(())
}

/// Linear regression with a ridge penalty
/// ```math
/// f(\beta) = \frac12 \|X\beta - y\|_2^2 + \frac{k}{2} \|\beta\|_2^2
/// ```
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    x: Array2<f64>,
    y: Array1<f64>,
    k: f64,
    lambda_max: OnceCell<f64>,
    lambda_min: OnceCell<f64>,
}

impl RidgeRegression {
    pub fn new(x: Array2<f64>, y: Array1<f64>, k: f64) -> Result<Self> {
        check_rows(&x, &y)?;
        if !(k >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "k",
                reason: format!("must be non-negative, got {}", k),
            });
        }
        Ok(RidgeRegression {
            x,
            y,
            k,
            lambda_max: OnceCell::new(),
            lambda_min: OnceCell::new(),
        })
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn set_k(&mut self, k: f64) {
        self.k = k;
        self.reset();
    }

    /// Largest eigenvalue of $`X^TX`$
    pub fn lambda_max(&self) -> f64 {
        *self.lambda_max.get_or_init(|| lambda_max_gram(&self.x, POWER_ITER))
    }

    /// Smallest eigenvalue of $`X^TX`$, zero when $`p > n`$
    pub fn lambda_min(&self) -> f64 {
        *self.lambda_min.get_or_init(|| {
            let (n, p) = self.x.dim();
            if p > n {
                return 0.0;
            }
            let xtx = self.x.t().dot(&self.x);
            match xtx.eigvalsh(UPLO::Lower) {
                Ok(eig) => eig.fold(f64::INFINITY, |acc, &e| acc.min(e)).max(0.0),
                Err(err) => {
                    log::warn!("RidgeRegression: eigenvalues of X'X failed ({}), using 0", err);
                    0.0
                }
            }
        })
    }
}

impl Function for RidgeRegression {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        let r = self.x.dot(&beta) - &self.y;
        0.5 * r.dot(&r) + 0.5 * self.k * beta.dot(&beta)
    }

    fn reset(&mut self) {
        self.lambda_max = OnceCell::new();
        self.lambda_min = OnceCell::new();
    }
}

impl Gradient for RidgeRegression {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        let r = self.x.dot(&beta) - &self.y;
        self.x.t().dot(&r) + &beta * self.k
    }
}

impl LipschitzContinuousGradient for RidgeRegression {
    fn lipschitz(&self) -> f64 {
        self.lambda_max() + self.k
    }
}

impl StronglyConvex for RidgeRegression {
    fn parameter(&self) -> f64 {
        self.lambda_min() + self.k
    }
}

/// $`\log(1 + e^t)`$
fn softplus(t: f64) -> f64 {
    if t > 0.0 {
        t + (-t).exp().ln_1p()
    } else {
        t.exp().ln_1p()
    }
}

fn sigmoid(t: f64) -> f64 {
    if t >= 0.0 {
        1.0 / (1.0 + (-t).exp())
    } else {
        let e = t.exp();
        e / (1.0 + e)
    }
}

/// Weighted logistic regression with a ridge penalty
///
/// With $`\eta = X\beta`$ and labels $`y_i \in \{0, 1\}`$,
/// ```math
/// f(\beta) = \sum_i w_i \left(\log(1 + e^{\eta_i}) - y_i \eta_i\right) + \frac{k}{2}\|\beta\|_2^2
/// ```
#[derive(Debug, Clone)]
pub struct RidgeLogisticRegression {
    x: Array2<f64>,
    y: Array1<f64>,
    k: f64,
    weights: Array1<f64>,
    lambda_max: OnceCell<f64>,
}

impl RidgeLogisticRegression {
    /// Unit sample weights are used when `weights` is `None`.
    pub fn new(x: Array2<f64>, y: Array1<f64>, k: f64, weights: Option<Array1<f64>>) -> Result<Self> {
        check_rows(&x, &y)?;
        let weights = weights.unwrap_or_else(|| Array1::ones(y.len()));
        if weights.len() != y.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![y.len()],
                got: vec![weights.len()],
            });
        }
        Ok(RidgeLogisticRegression {
            x,
            y,
            k,
            weights,
            lambda_max: OnceCell::new(),
        })
    }

    pub fn set_k(&mut self, k: f64) {
        self.k = k;
        self.reset();
    }
}

impl Function for RidgeLogisticRegression {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        let eta = self.x.dot(&beta);
        let loss: f64 = eta
            .iter()
            .zip(self.y.iter())
            .zip(self.weights.iter())
            .map(|((&t, &y), &w)| w * (softplus(t) - y * t))
            .sum();
        loss + 0.5 * self.k * beta.dot(&beta)
    }

    fn reset(&mut self) {
        self.lambda_max = OnceCell::new();
    }
}

impl Gradient for RidgeLogisticRegression {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut r = self.x.dot(&beta).mapv_into(sigmoid);
        r -= &self.y;
        r *= &self.weights;
        self.x.t().dot(&r) + &beta * self.k
    }
}

impl LipschitzContinuousGradient for RidgeLogisticRegression {
    fn lipschitz(&self) -> f64 {
        let lmax = *self.lambda_max.get_or_init(|| lambda_max_gram(&self.x, POWER_ITER));
        let wmax = self.weights.fold(0.0f64, |acc, &w| acc.max(w));
        wmax * lmax / 4.0 + self.k
    }
}
