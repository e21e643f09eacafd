//! Fast Iterative Shrinking/Thresholding Algorithm

use ndarray::prelude::*;

use crate::consts::{MAX_ITER, TOLERANCE};
use crate::functions::properties::{Gradient, ProximalOperator, StepSize};
use crate::maths::norm;
use crate::smooth::nop;
use crate::solution::{Solution, Trace};

/// Parameters of [`Fista`]
#[derive(Debug, Clone, PartialEq)]
pub struct FistaParam {
    /// Fixed step size, asked from the function every iteration when `None`
    pub step: Option<f64>,
    pub eps: f64,
    pub max_iter: usize,
    /// Iterations to run before the stopping criterion is tested
    pub min_iter: usize,
    /// Records the function value of every iterate
    pub output: bool,
    /// Nesterov momentum, off for plain ISTA
    pub momentum: bool,
}

impl Default for FistaParam {
    fn default() -> Self {
        FistaParam {
            step: None,
            eps: TOLERANCE,
            max_iter: MAX_ITER,
            min_iter: 1,
            output: false,
            momentum: true,
        }
    }
}

/// Fast Iterative Shrinking/Thresholding Algorithm
///
/// Minimises $`g(\beta) + h(\beta)`$ for a differentiable $`g`$ and an
/// $`h`$ with a cheap proximal operator.
///
/// Algorithm
/// ---------
/// ```math
/// \begin{aligned}
/// z &= \beta_i + \frac{i - 2}{i + 1} (\beta_i - \beta_{i-1}) \\
/// \beta_{i+1} &= \mathrm{prox}_{t h}\left(z - t \nabla g(z)\right)
/// \end{aligned}
/// ```
/// until $`\frac1t \|\beta_{i+1} - z\|_2 < \varepsilon`$. Without momentum
/// $`z = \beta_i`$ and this is ISTA.
///
/// The algorithm only holds its parameters, so one value may run any number
/// of problems.
#[derive(Debug, Clone, Default)]
pub struct Fista {
    par: FistaParam,
}

impl Fista {
    pub fn new() -> Self {
        Fista::default()
    }

    /// Plain proximal gradient descent
    pub fn ista() -> Self {
        Fista::new().par(|p| p.momentum = false)
    }

    /// Changes the parameters.
    pub fn par<P>(mut self, f: P) -> Self
    where
        P: FnOnce(&mut FistaParam),
    {
        f(&mut self.par);
        self
    }

    pub fn param(&self) -> &FistaParam {
        &self.par
    }

    fn name(&self) -> &'static str {
        if self.par.momentum {
            "FISTA"
        } else {
            "ISTA"
        }
    }

    /// Minimises `function` starting from `beta`.
    pub fn run<F>(&self, function: &F, beta: ArrayView1<'_, f64>) -> Solution
    where
        F: Gradient + ProximalOperator + StepSize + ?Sized,
    {
        self.run_with(function, beta, nop)
    }

    /// [`Fista::run`] with a user callback evaluated on `(beta, iter)`,
    /// first with the start vector and then after every iteration.
    /// Returning `true` stops the run early.
    pub fn run_with<F>(
        &self,
        function: &F,
        beta: ArrayView1<'_, f64>,
        mut callback: impl FnMut(ArrayView1<'_, f64>, usize) -> bool,
    ) -> Solution
    where
        F: Gradient + ProximalOperator + StepSize + ?Sized,
    {
        let mut beta = beta.to_owned();
        let mut beta_old = beta.clone();
        let mut trace = if self.par.output { Some(Trace::default()) } else { None };
        let mut iterations = 0;
        let mut converged = false;

        if callback(beta.view(), 0) {
            return Solution {
                beta,
                iterations,
                converged,
                trace,
            };
        }

        for i in 1..=self.par.max_iter {
            iterations = i;
            let z = if self.par.momentum {
                let w = (i as f64 - 2.0) / (i as f64 + 1.0);
                let mut z = beta.clone();
                z.scaled_add(w, &(&beta - &beta_old));
                z
            } else {
                beta.clone()
            };

            let step = self.par.step.unwrap_or_else(|| function.step(z.view()));
            let mut y = z.clone();
            y.scaled_add(-step, &function.grad(z.view()));
            let beta_new = function.prox(y.view(), step);

            let crit = norm(&(&beta_new - &z)) / step;
            beta_old = std::mem::replace(&mut beta, beta_new);

            if let Some(t) = trace.as_mut() {
                t.f.push(function.f(beta.view()));
            }
            log::trace!("{}: iteration {}, step {:.3e}, criterion {:.3e}", self.name(), i, step, crit);

            if crit < self.par.eps && i >= self.par.min_iter {
                converged = true;
                break;
            }
            if callback(beta.view(), i) {
                break;
            }
        }

        if converged {
            log::debug!("{}: converged after {} iterations", self.name(), iterations);
        } else {
            log::debug!("{}: stopped after {} iterations without converging", self.name(), iterations);
        }
        Solution {
            beta,
            iterations,
            converged,
            trace,
        }
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{CombinedFunction, Function, RidgeRegression, L1};
    use approx::assert_abs_diff_eq;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand_distr::StandardNormal;
    use ndarray_rand::RandomExt;

    fn lasso(l: f64) -> (CombinedFunction, Array2<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(42);
        let X = Array2::random_using((20, 10), StandardNormal, &mut rng);
        let y = Array1::random_using(20, StandardNormal, &mut rng);
        let func = CombinedFunction::new()
            .add_lipschitz_function(RidgeRegression::new(X.clone(), y.clone(), 0.).unwrap())
            .set_prox(L1::new(l));
        (func, X, y)
    }

    /// Optimality conditions of the lasso
    fn assert_kkt(X: &Array2<f64>, y: &Array1<f64>, l: f64, beta: &Array1<f64>) {
        let g = X.t().dot(&(X.dot(beta) - y));
        for (&gi, &bi) in g.iter().zip(beta) {
            if bi == 0. {
                assert!(gi.abs() <= l + 1e-6);
            } else {
                assert_abs_diff_eq!(gi, -l * bi.signum(), epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn fista_lasso() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (func, X, y) = lasso(2.);
        let fista = Fista::new().par(|p| p.output = true);
        let sol = fista.run(&func, Array1::zeros(10).view());

        assert!(sol.converged);
        assert!(sol.iterations < MAX_ITER);
        assert_eq!(sol.f_values().len(), sol.iterations);
        assert_kkt(&X, &y, 2., &sol.beta);

        // the same algorithm value solves again from scratch
        let again = fista.run(&func, Array1::zeros(10).view());
        assert_eq!(sol, again);
    }

    #[test]
    fn ista_descends() {
        let (func, X, y) = lasso(2.);
        let sol = Fista::ista()
            .par(|p| p.output = true)
            .run(&func, Array1::ones(10).view());

        assert!(sol.converged);
        assert_kkt(&X, &y, 2., &sol.beta);
        let f = sol.f_values();
        assert!(f[0] <= func.f(Array1::ones(10).view()));
        for w in f.windows(2) {
            assert!(w[1] <= w[0] + 1e-12);
        }
    }

    #[test]
    fn fista_settles() {
        let (func, _, _) = lasso(0.5);
        let sol = Fista::new().par(|p| p.output = true).run(&func, Array1::zeros(10).view());
        let f = sol.f_values();
        let fmin = *f.last().unwrap();
        // no iterate is better than the final one
        assert!(f.iter().all(|&fi| fi >= fmin - 1e-9));
        assert!(f[0] > fmin);
    }

    #[test]
    fn budget() {
        let (func, _, _) = lasso(2.);
        let sol = Fista::new()
            .par(|p| p.max_iter = 3)
            .run(&func, Array1::zeros(10).view());
        assert!(!sol.converged);
        assert_eq!(sol.iterations, 3);
        assert!(sol.trace.is_none());

        let sol = Fista::new()
            .par(|p| p.max_iter = 0)
            .run(&func, Array1::ones(10).view());
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.beta, Array1::ones(10));
    }

    #[test]
    fn callback_stops_early() {
        let (func, _, _) = lasso(2.);
        let mut seen = Vec::new();
        let sol = Fista::new().run_with(&func, Array1::zeros(10).view(), |beta, iter| {
            seen.push((iter, beta.len()));
            iter == 4
        });
        assert!(!sol.converged);
        assert_eq!(sol.iterations, 4);
        assert_eq!(seen, vec![(0, 10), (1, 10), (2, 10), (3, 10), (4, 10)]);

        let sol = Fista::new().run_with(&func, Array1::ones(10).view(), |_, _| true);
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.beta, Array1::ones(10));
    }

    #[test]
    fn min_iter() {
        // l above |X'y|_inf puts the minimum at zero
        let (func, _, _) = lasso(100.);
        let sol = Fista::new()
            .par(|p| p.min_iter = 5)
            .run(&func, Array1::zeros(10).view());
        assert!(sol.converged);
        assert_eq!(sol.iterations, 5);
        assert_eq!(sol.beta, Array1::zeros(10));
    }

    #[test]
    fn fixed_step() {
        let (func, X, y) = lasso(2.);
        let lmax = X.t().dot(&X).diag().sum();
        let sol = Fista::new()
            .par(|p| p.step = Some(1. / lmax))
            .run(&func, Array1::zeros(10).view());
        assert!(sol.converged);
        assert_kkt(&X, &y, 2., &sol.beta);
    }

    #[cfg(rustc_nightly)]
    #[bench]
    fn bench_fista_lasso(b: &mut test::Bencher) {
        let (func, _, _) = lasso(2.);
        b.iter(|| Fista::new().run(&func, Array1::zeros(10).view()));
    }
}
