//! Continuation with Nesterov smoothing in a shrinking algorithm

use ndarray::prelude::*;

use super::Fista;
use crate::consts::{MAX_ITER, TOLERANCE};
use crate::error::{Error, Result};
use crate::functions::nesterov::NesterovFunction;
use crate::functions::properties::{
    Continuation, DualFunction, Function, Gradient, LipschitzContinuousGradient, ProximalOperator,
    StepSize,
};
use crate::maths::norm;
use crate::smooth::nop;
use crate::solution::{Solution, Trace};

/// Parameters of [`Conesta`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConestaParam {
    /// First smoothing constant, estimated from the start vector when `None`
    pub mu_start: Option<f64>,
    /// Smallest smoothing constant
    pub mu_min: f64,
    /// Decrease factor of the gap bound, in $`(0, 1)`$
    pub tau: f64,
    /// Computes the duality gap after every continuation step
    pub dynamic: bool,
    /// Maximum number of continuation steps
    pub continuations: usize,
    pub eps: f64,
    /// Total budget of inner FISTA iterations
    pub max_iter: usize,
    pub min_iter: usize,
    /// Records the function value, smoothing constant and gap bound of
    /// every continuation step
    pub output: bool,
}

impl Default for ConestaParam {
    fn default() -> Self {
        ConestaParam {
            mu_start: None,
            mu_min: TOLERANCE,
            tau: 0.5,
            dynamic: true,
            continuations: 30,
            eps: TOLERANCE,
            max_iter: MAX_ITER,
            min_iter: 1,
            output: false,
        }
    }
}

/// COntinuation with NEsterov smoothing in a Shrinkage-Thresholding Algorithm
///
/// Minimises an objective with a Nesterov smoothed penalty by solving a
/// sequence of smoothed problems with FISTA, each one to the precision its
/// smoothing constant allows, and decreasing the smoothing constant with the
/// bound on the gap.
///
/// Algorithm
/// ---------
/// With $`G_0 = \min(\varepsilon_{\max}(\mu_0), \varepsilon_{\mathrm{opt}}(\mu_0))`$,
/// every continuation step
/// 1. runs FISTA at $`\mu_k`$ to precision $`\varepsilon_{\mathrm{opt}}(\mu_k)`$,
/// 2. stops when one ISTA step at the smallest $`\mu`$ seen moves less than
///    $`\varepsilon`$ (relative to the step size),
/// 3. sets $`G_{k+1}`$ to the duality gap if that is smaller than
///    $`\tau G_k`$ (dynamic), or to $`\tau G_k`$ (static),
/// 4. sets $`\mu_{k+1} = \mu_{\mathrm{opt}}(G_{k+1})`$, clamped to
///    $`[\mu_{\min}, \mu_k]`$.
///
/// The smoothing constant of the function is restored before returning.
#[derive(Debug, Clone, Default)]
pub struct Conesta {
    par: ConestaParam,
}

impl Conesta {
    /// The dynamic variant
    pub fn new() -> Self {
        Conesta::default()
    }

    pub fn dynamic() -> Self {
        Conesta::new()
    }

    pub fn static_() -> Self {
        Conesta::new().par(|p| p.dynamic = false)
    }

    /// Changes the parameters.
    pub fn par<P>(mut self, f: P) -> Self
    where
        P: FnOnce(&mut ConestaParam),
    {
        f(&mut self.par);
        self
    }

    pub fn param(&self) -> &ConestaParam {
        &self.par
    }

    fn check_param(&self) -> Result<()> {
        let par = &self.par;
        if !(par.tau > 0.0 && par.tau < 1.0) {
            return Err(Error::InvalidParameter {
                name: "tau",
                reason: format!("must be in (0, 1), got {}", par.tau),
            });
        }
        if !(par.mu_min > 0.0) {
            return Err(Error::InvalidParameter {
                name: "mu_min",
                reason: format!("must be positive, got {}", par.mu_min),
            });
        }
        if let Some(mu) = par.mu_start {
            if !(mu > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "mu_start",
                    reason: format!("must be positive, got {}", mu),
                });
            }
        }
        Ok(())
    }

    /// Minimises `function` starting from `beta`.
    pub fn run<F>(&self, function: &mut F, beta: ArrayView1<'_, f64>) -> Result<Solution>
    where
        F: NesterovFunction
            + Continuation
            + DualFunction
            + LipschitzContinuousGradient
            + ProximalOperator
            + StepSize,
    {
        self.run_with(function, beta, nop)
    }

    /// [`Conesta::run`] with a user callback evaluated on `(beta, i)`, first
    /// with the start vector and then after continuation `i`. Returning
    /// `true` stops the run early.
    pub fn run_with<F>(
        &self,
        function: &mut F,
        beta: ArrayView1<'_, f64>,
        callback: impl FnMut(ArrayView1<'_, f64>, usize) -> bool,
    ) -> Result<Solution>
    where
        F: NesterovFunction
            + Continuation
            + DualFunction
            + LipschitzContinuousGradient
            + ProximalOperator
            + StepSize,
    {
        self.check_param()?;

        let old_mu = function.get_mu();
        let result = self.continuation(function, beta, callback);
        function.set_mu(old_mu);
        result
    }

    fn continuation<F>(
        &self,
        function: &mut F,
        beta: ArrayView1<'_, f64>,
        mut callback: impl FnMut(ArrayView1<'_, f64>, usize) -> bool,
    ) -> Result<Solution>
    where
        F: NesterovFunction
            + Continuation
            + DualFunction
            + LipschitzContinuousGradient
            + ProximalOperator
            + StepSize,
    {
        let par = &self.par;
        let mut beta = beta.to_owned();

        let mut mu = match par.mu_start {
            Some(mu) => mu,
            None => {
                let mu = 0.9 * function.estimate_mu(beta.view());
                if mu < TOLERANCE {
                    1.0
                } else {
                    mu
                }
            }
        };
        let mut mu_min = par.mu_min.min(mu);

        function.set_mu(mu_min);
        let mut tmin = 1.0 / function.lipschitz();
        function.set_mu(mu);
        if !(tmin.is_finite() && tmin > 0.0) {
            return Err(Error::Incompatible {
                algorithm: "CONESTA",
                reason: format!("the smooth part needs a positive Lipschitz constant, got {}", 1.0 / tmin),
            });
        }

        let max_eps = function.eps_max(mu);
        let mut gap = max_eps.min(function.eps_opt(mu));
        log::info!(
            "CONESTA: {} continuation from mu = {:.3e}, gap bound {:.3e}",
            if par.dynamic { "dynamic" } else { "static" },
            mu,
            gap
        );

        let mut trace = if par.output { Some(Trace::default()) } else { None };
        let mut iterations = 0;
        let mut converged = false;

        if callback(beta.view(), 0) {
            return Ok(Solution {
                beta,
                iterations,
                converged,
                trace,
            });
        }

        for i in 1..=par.continuations {
            let remaining = par.max_iter.saturating_sub(iterations);
            if remaining == 0 {
                break;
            }

            let tnew = 1.0 / function.lipschitz();
            let eps_mu = max_eps.min(function.eps_opt(mu)).max(par.eps);
            let inner = Fista::new()
                .par(|p| {
                    p.step = Some(tnew);
                    p.eps = eps_mu;
                    p.max_iter = remaining;
                    p.min_iter = par.min_iter.min(remaining);
                })
                .run(&*function, beta.view());
            iterations += inner.iterations;
            beta = inner.beta;

            mu_min = mu_min.min(mu);
            tmin = tmin.min(tnew);

            // one ISTA step at the smallest smoothing constant
            let prev = function.set_mu(mu_min);
            let mut y = beta.clone();
            y.scaled_add(-tmin, &function.grad(beta.view()));
            let beta_tilde = function.prox(y.view(), tmin);
            function.set_mu(prev);

            let crit = norm(&(&beta - &beta_tilde)) / tmin;
            let stop = crit < par.eps;

            if par.dynamic {
                let mut gap_mu = function.gap(beta.view())?;
                if gap_mu < 0.0 {
                    log::warn!("CONESTA: negative duality gap {:.3e}, using its magnitude", gap_mu);
                    gap_mu = gap_mu.abs();
                }
                gap = if gap_mu < gap { gap_mu } else { par.tau * gap };
            } else {
                gap *= par.tau;
            }

            if let Some(t) = trace.as_mut() {
                t.f.push(function.f(beta.view()));
                t.mu.push(mu);
                t.gap.push(gap);
            }
            log::debug!(
                "CONESTA: continuation {}, {} iterations, mu {:.3e}, gap bound {:.3e}, criterion {:.3e}",
                i,
                inner.iterations,
                mu,
                gap,
                crit
            );

            if stop || (gap <= TOLERANCE && mu <= TOLERANCE) {
                converged = true;
                break;
            }
            if callback(beta.view(), i) {
                break;
            }

            mu = function.mu_opt(gap).min(mu).max(mu_min);
            function.set_mu(mu);
        }

        if converged {
            log::info!("CONESTA: converged after {} iterations", iterations);
        } else {
            log::info!("CONESTA: stopped after {} iterations without converging", iterations);
        }
        Ok(Solution {
            beta,
            iterations,
            converged,
            trace,
        })
    }
}
