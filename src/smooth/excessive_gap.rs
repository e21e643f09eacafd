use ndarray::prelude::*;

use crate::consts::{MAX_ITER, TOLERANCE};
use crate::error::{Error, Result};
use crate::functions::nesterov::NesterovFunction;
use crate::functions::properties::{DualFunction, Function, GradientMap, StronglyConvex};
use crate::smooth::nop;
use crate::solution::{Solution, Trace};

/// Parameters of [`ExcessiveGap`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExcessiveGapParam {
    /// Target of the upper bound $`\mu_k M`$
    pub eps: f64,
    pub max_iter: usize,
    /// Records the function value, smoothing constant and upper bound of
    /// every iteration
    pub output: bool,
}

impl Default for ExcessiveGapParam {
    fn default() -> Self {
        ExcessiveGapParam {
            eps: TOLERANCE,
            max_iter: MAX_ITER,
            output: false,
        }
    }
}

/// Nesterov's Excessive Gap Method
///
/// For $`g(\beta) + h(\beta)`$ with a strongly convex $`g`$ and a Nesterov
/// smoothed $`h`$, both the primal point and the dual point are updated so
/// that the excessive gap condition holds at every iteration. There is no
/// proximal step and no start vector, the first primal point is the
/// minimiser for the zero dual point.
///
/// Algorithm
/// ---------
/// With $`L = \gamma\lambda_{\max}(A^TA) / \sigma`$, $`\mu_0 = 2L`$,
/// $`u = 0`$, $`\beta_0 = \hat\beta(u)`$ and $`\alpha_0 = V(u, \beta_0, L)`$,
/// ```math
/// \begin{aligned}
/// \tau_k &= \frac{2}{k + 3} \\
/// u &= (1 - \tau_k)\alpha_k + \tau_k \alpha^*_{\mu_k}(\beta_k) \\
/// \mu_{k+1} &= (1 - \tau_k)\mu_k \\
/// \beta_{k+1} &= (1 - \tau_k)\beta_k + \tau_k \hat\beta(u) \\
/// \alpha_{k+1} &= V(u, \hat\beta(u), L)
/// \end{aligned}
/// ```
/// until $`f(\beta_{k+1}) - f^* \leq \mu_{k+1} M < \varepsilon`$.
#[derive(Debug, Clone, Default)]
pub struct ExcessiveGap {
    par: ExcessiveGapParam,
}

impl ExcessiveGap {
    pub fn new() -> Self {
        ExcessiveGap::default()
    }

    /// Changes the parameters.
    pub fn par<P>(mut self, f: P) -> Self
    where
        P: FnOnce(&mut ExcessiveGapParam),
    {
        f(&mut self.par);
        self
    }

    pub fn param(&self) -> &ExcessiveGapParam {
        &self.par
    }

    /// Minimises `function`.
    ///
    /// The smoothing constant of `function` is restored before returning.
    pub fn run<F>(&self, function: &mut F) -> Result<Solution>
    where
        F: NesterovFunction + GradientMap + DualFunction + StronglyConvex + Function,
    {
        self.run_with(function, nop)
    }

    /// [`ExcessiveGap::run`] with a user callback evaluated on
    /// `(beta, iter)`, first with the starting point and then after every
    /// iteration. Returning `true` stops the run early.
    pub fn run_with<F>(
        &self,
        function: &mut F,
        callback: impl FnMut(ArrayView1<'_, f64>, usize) -> bool,
    ) -> Result<Solution>
    where
        F: NesterovFunction + GradientMap + DualFunction + StronglyConvex + Function,
    {
        let old_mu = function.get_mu();
        let result = self.iterate(function, callback);
        function.set_mu(old_mu);
        result
    }

    fn iterate<F>(
        &self,
        function: &mut F,
        mut callback: impl FnMut(ArrayView1<'_, f64>, usize) -> bool,
    ) -> Result<Solution>
    where
        F: NesterovFunction + GradientMap + DualFunction + StronglyConvex + Function,
    {
        let sigma = function.parameter();
        if sigma <= TOLERANCE {
            return Err(Error::Incompatible {
                algorithm: "ExcessiveGap",
                reason: format!("the smooth part must be strongly convex, parameter {}", sigma),
            });
        }
        let p = match function.linear_operator().first() {
            Some(op) => function.penalty_start() + op.shape().1,
            None => return Err(Error::MissingOperator("ExcessiveGap")),
        };

        let l = function.l() * function.lambda_max() / sigma;
        let mut mu = 2.0 * l;
        function.set_mu(mu);
        log::info!("ExcessiveGap: L = {:.3e}, mu0 = {:.3e}", l, mu);

        let mut u: Vec<Array1<f64>> = function
            .linear_operator()
            .iter()
            .map(|op| Array1::zeros(op.shape().0))
            .collect();
        let mut beta = function.betahat(&u, Array1::zeros(p).view())?;
        let mut alpha = function.v(&u, beta.view(), l);

        let mut trace = if self.par.output { Some(Trace::default()) } else { None };
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

        for k in 0..self.par.max_iter {
            let tau = 2.0 / (k as f64 + 3.0);
            function.set_mu(mu);

            let alpha_hat = function.alpha(beta.view());
            for ((ui, ai), ahi) in u.iter_mut().zip(&alpha).zip(&alpha_hat) {
                *ui = ai * (1.0 - tau) + ahi * tau;
            }
            mu *= 1.0 - tau;

            let beta_hat = function.betahat(&u, beta.view())?;
            beta *= 1.0 - tau;
            beta.scaled_add(tau, &beta_hat);
            alpha = function.v(&u, beta_hat.view(), l);

            iterations = k + 1;
            let upper_bound = mu * function.m();
            if let Some(t) = trace.as_mut() {
                t.f.push(function.f(beta.view()));
                t.mu.push(mu);
                t.upper_bound.push(upper_bound);
            }
            log::trace!("ExcessiveGap: iteration {}, mu {:.3e}, upper bound {:.3e}", iterations, mu, upper_bound);

            if upper_bound < self.par.eps {
                converged = true;
                break;
            }
            if callback(beta.view(), iterations) {
                break;
            }
        }

        if converged {
            log::info!("ExcessiveGap: converged after {} iterations", iterations);
        } else {
            log::info!("ExcessiveGap: stopped after {} iterations without converging", iterations);
        }
        Ok(Solution {
            beta,
            iterations,
            converged,
            trace,
        })
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{RidgeSmoothedL1TV, L1TV};
    use crate::linop::LinearOperator;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand_distr::StandardNormal;
    use ndarray_rand::RandomExt;

    fn problem() -> RidgeSmoothedL1TV {
        let mut rng = StdRng::seed_from_u64(42);
        let X = Array2::random_using((15, 6), StandardNormal, &mut rng);
        let y = Array1::random_using(15, StandardNormal, &mut rng);
        let h = L1TV::from_shape(0.3, 0.4, &[6], 0.7, 0).unwrap();
        RidgeSmoothedL1TV::new(X, y, 1.0, h).unwrap()
    }

    #[test]
    fn upper_bound_decreases() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut func = problem();
        let sol = ExcessiveGap::new()
            .par(|p| {
                p.eps = 1e-4;
                p.output = true;
            })
            .run(&mut func)
            .unwrap();

        assert!(sol.converged);
        assert_eq!(func.get_mu(), 0.7);
        let trace = sol.trace.unwrap();
        assert_eq!(trace.f.len(), sol.iterations);
        assert!(trace.upper_bound.windows(2).all(|w| w[1] < w[0]));
        assert!(*trace.upper_bound.last().unwrap() < 1e-4);
        assert!(trace.f.iter().all(|f| f.is_finite()));
    }

    #[test]
    fn budget() {
        let mut func = problem();
        let sol = ExcessiveGap::new().par(|p| p.max_iter = 5).run(&mut func).unwrap();
        assert!(!sol.converged);
        assert_eq!(sol.iterations, 5);
        assert_eq!(sol.beta.len(), 6);
    }

    #[test]
    fn callback_stops_early() {
        let mut func = problem();
        let mut last = 0;
        let sol = ExcessiveGap::new()
            .run_with(&mut func, |beta, iter| {
                assert_eq!(beta.len(), 6);
                last = iter;
                iter == 3
            })
            .unwrap();
        assert_eq!(last, 3);
        assert_eq!(sol.iterations, 3);
        assert!(!sol.converged);
        assert_eq!(func.get_mu(), 0.7);
    }

    /// Hides the ridge term's strong convexity
    struct Flat(RidgeSmoothedL1TV);

    impl Function for Flat {
        fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
            self.0.f(beta)
        }
    }

    impl StronglyConvex for Flat {
        fn parameter(&self) -> f64 {
            0.0
        }
    }

    impl GradientMap for Flat {
        fn v(&self, u: &[Array1<f64>], beta: ArrayView1<'_, f64>, l: f64) -> Vec<Array1<f64>> {
            self.0.v(u, beta, l)
        }
    }

    impl DualFunction for Flat {
        fn betahat(&self, alpha: &[Array1<f64>], beta: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
            self.0.betahat(alpha, beta)
        }

        fn gap(&self, beta: ArrayView1<'_, f64>) -> Result<f64> {
            self.0.gap(beta)
        }
    }

    impl NesterovFunction for Flat {
        fn l(&self) -> f64 {
            self.0.l()
        }

        fn get_mu(&self) -> f64 {
            self.0.get_mu()
        }

        fn set_mu(&mut self, mu: f64) -> f64 {
            self.0.set_mu(mu)
        }

        fn linear_operator(&self) -> &[Box<dyn LinearOperator>] {
            self.0.linear_operator()
        }

        fn penalty_start(&self) -> usize {
            self.0.penalty_start()
        }

        fn project(&self, a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
            self.0.project(a)
        }

        fn m(&self) -> f64 {
            self.0.m()
        }

        fn lambda_max(&self) -> f64 {
            self.0.lambda_max()
        }

        fn estimate_mu(&self, beta: ArrayView1<'_, f64>) -> f64 {
            self.0.estimate_mu(beta)
        }
    }

    #[test]
    fn needs_strong_convexity() {
        let mut func = Flat(problem());
        assert!(matches!(
            ExcessiveGap::new().run(&mut func),
            Err(Error::Incompatible { algorithm: "ExcessiveGap", .. })
        ));
        assert_eq!(func.get_mu(), 0.7);
    }
}
