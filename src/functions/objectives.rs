//! Ridge regression with structured penalties
//!
//! [`RidgeL1Nesterov`] is the objective of CONESTA,
//! ```math
//! f(\beta) = \frac12\|X\beta - y\|_2^2 + \frac{k}{2}\|\beta\|_2^2 + l\|\beta\|_1 + \Omega_\mu(\beta)
//! ```
//! with the L1 norm entering through its proximal operator and a Nesterov
//! smoothed $`\Omega`$. [`RidgeSmoothedL1TV`] smooths the L1 norm as well
//! and is the objective of the excessive gap method.
//!
//! Both solve ridge systems $`(X^TX + kI)\beta = v`$ for their dual
//! computations. The factorisation is cached until the next
//! [`reset`](Function::reset).

use std::cell::OnceCell;
use std::fmt;

use ndarray::prelude::*;
use ndarray::OwnedRepr;
use ndarray_linalg::{CholeskyFactorized, FactorizeCInto, SolveC, UPLO};

use super::losses::RidgeRegression;
use super::nesterov::{GroupLassoOverlap, NesterovFunction, TotalVariation, L1TV};
use super::penalties::L1;
use super::properties::{
    Continuation, DualFunction, Function, Gradient, GradientMap, LipschitzContinuousGradient,
    ProximalOperator, StepSize, StronglyConvex,
};
use crate::consts::TOLERANCE;
use crate::error::{Error, Result};
use crate::linop::LinearOperator;

/// Cached solver of $`(X^TX + kI)\beta = v`$
///
/// Factorises $`X^TX + kI`$ when $`n > p`$, and otherwise $`XX^T + kI`$
/// together with the Woodbury identity
/// ```math
/// (X^TX + kI)^{-1} v = \frac1k \left(v - X^T(XX^T + kI)^{-1}Xv\right)
/// ```
#[derive(Default)]
pub(crate) struct RidgeSystem {
    factor: OnceCell<CholeskyFactorized<OwnedRepr<f64>>>,
}

impl RidgeSystem {
    pub fn solve(&self, x: &Array2<f64>, k: f64, v: &Array1<f64>) -> Result<Array1<f64>> {
        let (n, p) = x.dim();
        if n > p {
            let factor = self.factor(|| x.t().dot(x), k)?;
            return Ok(factor.solvec(v)?);
        }
        if k <= TOLERANCE {
            return Err(Error::InvalidParameter {
                name: "k",
                reason: format!("the ridge system of {} samples and {} variables needs k > 0", n, p),
            });
        }
        let factor = self.factor(|| x.dot(&x.t()), k)?;
        let w = factor.solvec(&x.dot(v))?;
        Ok((v - &x.t().dot(&w)) / k)
    }

    fn factor(
        &self,
        gram: impl FnOnce() -> Array2<f64>,
        k: f64,
    ) -> Result<&CholeskyFactorized<OwnedRepr<f64>>> {
        if let Some(factor) = self.factor.get() {
            return Ok(factor);
        }
        let mut a = gram();
        a.diag_mut().mapv_inplace(|d| d + k);
        let fresh = a.factorizec_into(UPLO::Lower)?;
        Ok(self.factor.get_or_init(|| fresh))
    }

    pub fn reset(&mut self) {
        self.factor = OnceCell::new();
    }
}

impl fmt::Debug for RidgeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RidgeSystem")
            .field("factorised", &self.factor.get().is_some())
            .finish()
    }
}

/// Clipped sign of the penalised coefficients, zero padded over the prefix
fn l1_subgradient(beta: ArrayView1<'_, f64>, penalty_start: usize) -> Array1<f64> {
    let start = penalty_start.min(beta.len());
    let mut sg = Array1::zeros(beta.len());
    sg.slice_mut(s![start..]).assign(
        &beta
            .slice(s![start..])
            .mapv(|b| (b / TOLERANCE).max(-1.0).min(1.0)),
    );
    sg
}

/// Ridge regression, L1 and a Nesterov smoothed penalty `N`
#[derive(Debug)]
pub struct RidgeL1Nesterov<N> {
    rr: RidgeRegression,
    l1: L1,
    pen: N,
    ridge: RidgeSystem,
}

/// Ridge regression with L1 and total variation penalties
pub type RidgeL1TV = RidgeL1Nesterov<TotalVariation>;

/// Ridge regression with L1 and overlapping group lasso penalties
pub type RidgeL1GL = RidgeL1Nesterov<GroupLassoOverlap>;

impl<N> RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    /// The L1 term shares the penalty start of `pen`.
    pub fn new(x: Array2<f64>, y: Array1<f64>, k: f64, l: f64, pen: N) -> Result<Self> {
        if !(l >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "l",
                reason: format!("must be non-negative, got {}", l),
            });
        }
        if let Some(op) = pen.linear_operator().first() {
            let p = pen.penalty_start() + op.shape().1;
            if p != x.ncols() {
                return Err(Error::ShapeMismatch {
                    expected: vec![x.ncols()],
                    got: vec![p],
                });
            }
        }
        let l1 = L1 {
            l,
            c: 0.0,
            penalty_start: pen.penalty_start(),
        };
        Ok(RidgeL1Nesterov {
            rr: RidgeRegression::new(x, y, k)?,
            l1,
            pen,
            ridge: RidgeSystem::default(),
        })
    }

    pub fn ridge(&self) -> &RidgeRegression {
        &self.rr
    }

    pub fn l1(&self) -> &L1 {
        &self.l1
    }

    pub fn penalty(&self) -> &N {
        &self.pen
    }

    pub fn set_k(&mut self, k: f64) {
        self.rr.set_k(k);
        self.ridge.reset();
    }

    /// $`\gamma M`$ and $`\gamma \lambda_{\max}(A^TA)`$ of the smoothed penalty
    fn nesterov_constants(&self) -> (f64, f64) {
        let l = self.pen.l();
        (l * self.pen.m(), l * self.pen.lambda_max())
    }
}

impl<N> Function for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    /// The objective with the penalty not smoothed
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.rr.f(beta) + self.l1.f(beta) + self.pen.f(beta)
    }

    fn reset(&mut self) {
        self.rr.reset();
        self.pen.reset();
        self.ridge.reset();
    }
}

impl<N> Gradient for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    /// Gradient of the smooth part, the L1 norm is left to the proximal operator
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        self.rr.grad(beta) + self.pen.grad(beta)
    }
}

impl<N> LipschitzContinuousGradient for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    fn lipschitz(&self) -> f64 {
        self.rr.lipschitz() + self.pen.lipschitz()
    }
}

impl<N> StepSize for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    fn step(&self, _beta: ArrayView1<'_, f64>) -> f64 {
        1.0 / self.lipschitz()
    }
}

impl<N> ProximalOperator for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    fn prox(&self, beta: ArrayView1<'_, f64>, factor: f64) -> Array1<f64> {
        self.l1.prox(beta, factor)
    }
}

impl<N> StronglyConvex for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    fn parameter(&self) -> f64 {
        self.rr.parameter()
    }
}

impl<N> NesterovFunction for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    fn l(&self) -> f64 {
        self.pen.l()
    }

    fn get_mu(&self) -> f64 {
        self.pen.get_mu()
    }

    fn set_mu(&mut self, mu: f64) -> f64 {
        self.pen.set_mu(mu)
    }

    fn linear_operator(&self) -> &[Box<dyn LinearOperator>] {
        self.pen.linear_operator()
    }

    fn penalty_start(&self) -> usize {
        self.pen.penalty_start()
    }

    fn project(&self, a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
        self.pen.project(a)
    }

    fn m(&self) -> f64 {
        self.pen.m()
    }

    fn lambda_max(&self) -> f64 {
        self.pen.lambda_max()
    }

    fn estimate_mu(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.pen.estimate_mu(beta)
    }
}

impl<N> Continuation for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    fn mu_opt(&self, eps: f64) -> f64 {
        let (g_m, g_a2) = self.nesterov_constants();
        if g_m * g_a2 <= TOLERANCE {
            return f64::INFINITY;
        }
        let lg = self.rr.lipschitz();
        let a = g_m * g_a2;
        g_a2 * eps / (a + (a * a + g_m * lg * g_a2 * eps).sqrt())
    }

    fn eps_opt(&self, mu: f64) -> f64 {
        let (g_m, g_a2) = self.nesterov_constants();
        if g_a2 <= TOLERANCE {
            return 0.0;
        }
        let lg = self.rr.lipschitz();
        (2.0 * g_m * g_a2 * mu + g_m * lg * mu * mu) / g_a2
    }

    fn eps_max(&self, mu: f64) -> f64 {
        let (g_m, _) = self.nesterov_constants();
        mu * g_m
    }
}

impl<N> DualFunction for RidgeL1Nesterov<N>
where
    N: NesterovFunction + LipschitzContinuousGradient,
{
    fn betahat(&self, alpha: &[Array1<f64>], beta: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        let x = self.rr.x();
        let mut v = x.t().dot(self.rr.y());
        v.scaled_add(-self.pen.l(), &self.pen.aa(alpha));
        v.scaled_add(-self.l1.l, &l1_subgradient(beta, self.l1.penalty_start));
        self.ridge.solve(x, self.rr.k(), &v)
    }

    fn gap(&self, beta: ArrayView1<'_, f64>) -> Result<f64> {
        let alpha = self.pen.alpha(beta);
        let primal = self.rr.f(beta) + self.l1.f(beta) + self.pen.phi(&alpha, beta);

        let beta_hat = self.betahat(&alpha, beta)?;
        let dual = self.rr.f(beta_hat.view())
            + self.l1.f(beta_hat.view())
            + self.pen.phi(&alpha, beta_hat.view());
        Ok(primal - dual)
    }
}

/// Ridge regression with L1 and total variation both smoothed
#[derive(Debug)]
pub struct RidgeSmoothedL1TV {
    rr: RidgeRegression,
    h: L1TV,
    ridge: RidgeSystem,
}

impl RidgeSmoothedL1TV {
    /// `k` must be positive, the ridge term is the strongly convex part.
    pub fn new(x: Array2<f64>, y: Array1<f64>, k: f64, h: L1TV) -> Result<Self> {
        if k <= TOLERANCE {
            return Err(Error::InvalidParameter {
                name: "k",
                reason: format!("must be positive, got {}", k),
            });
        }
        if let Some(op) = h.linear_operator().first() {
            let p = h.penalty_start() + op.shape().1;
            if p != x.ncols() {
                return Err(Error::ShapeMismatch {
                    expected: vec![x.ncols()],
                    got: vec![p],
                });
            }
        }
        Ok(RidgeSmoothedL1TV {
            rr: RidgeRegression::new(x, y, k)?,
            h,
            ridge: RidgeSystem::default(),
        })
    }

    pub fn ridge(&self) -> &RidgeRegression {
        &self.rr
    }

    pub fn penalty(&self) -> &L1TV {
        &self.h
    }
}

impl Function for RidgeSmoothedL1TV {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.rr.f(beta) + self.h.f(beta)
    }

    fn reset(&mut self) {
        self.rr.reset();
        self.h.reset();
        self.ridge.reset();
    }
}

impl StronglyConvex for RidgeSmoothedL1TV {
    fn parameter(&self) -> f64 {
        self.rr.parameter()
    }
}

impl NesterovFunction for RidgeSmoothedL1TV {
    fn l(&self) -> f64 {
        self.h.l()
    }

    fn get_mu(&self) -> f64 {
        self.h.get_mu()
    }

    fn set_mu(&mut self, mu: f64) -> f64 {
        self.h.set_mu(mu)
    }

    fn linear_operator(&self) -> &[Box<dyn LinearOperator>] {
        self.h.linear_operator()
    }

    fn penalty_start(&self) -> usize {
        self.h.penalty_start()
    }

    fn project(&self, a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
        self.h.project(a)
    }

    fn m(&self) -> f64 {
        self.h.m()
    }

    fn lambda_max(&self) -> f64 {
        self.h.lambda_max()
    }

    fn estimate_mu(&self, beta: ArrayView1<'_, f64>) -> f64 {
        self.h.estimate_mu(beta)
    }
}

impl GradientMap for RidgeSmoothedL1TV {
    fn v(&self, u: &[Array1<f64>], beta: ArrayView1<'_, f64>, l: f64) -> Vec<Array1<f64>> {
        let start = self.h.penalty_start().min(beta.len());
        let b = beta.slice(s![start..]);
        let step = 1.0 / l.max(TOLERANCE);
        let a = self
            .h
            .linear_operator()
            .iter()
            .zip(u)
            .map(|(op, ui)| {
                let mut ai = op.apply(b);
                ai *= step;
                ai += ui;
                ai
            })
            .collect();
        self.h.project(a)
    }
}

impl DualFunction for RidgeSmoothedL1TV {
    fn betahat(&self, alpha: &[Array1<f64>], _beta: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        let x = self.rr.x();
        let mut v = x.t().dot(self.rr.y());
        v.scaled_add(-self.h.l(), &self.h.aa(alpha));
        self.ridge.solve(x, self.rr.k(), &v)
    }

    fn gap(&self, beta: ArrayView1<'_, f64>) -> Result<f64> {
        let alpha = self.h.alpha(beta);
        let primal = self.rr.f(beta) + self.h.phi(&alpha, beta);

        let beta_hat = self.betahat(&alpha, beta)?;
        let dual = self.rr.f(beta_hat.view()) + self.h.phi(&alpha, beta_hat.view());
        Ok(primal - dual)
    }
}
