//! Standalone Proximal Operators
//!
//! Every operator maps a vector to the minimiser of
//! ```math
//! \frac12 \|x' - x\|_2^2 + t\,\Omega(x')
//! ```
//! for its own penalty $`\Omega`$, where the threshold $`t`$ is either given
//! directly or searched for so that $`x'`$ meets a norm or cardinality
//! budget. The first `penalty_start` entries are never penalised and pass
//! through untouched.

use ndarray::prelude::*;
use ndarray::{Data, NdFloat};

use crate::consts::{MAX_ITER, TOLERANCE};
use crate::direct::Bisection;
use crate::maths::{norm, norm0, norm1, norm_inf, sign};

/// Soft thresholding, $`x'_i = \mathrm{sign}(x_i)\max(|x_i| - t, 0)`$
pub fn soft_threshold<S, D>(x: &ArrayBase<D, Ix1>, t: S) -> Array1<S>
where
    S: NdFloat,
    D: Data<Elem = S>,
{
    x.mapv(|xi| sign(xi) * (xi.abs() - t).max(S::zero()))
}

/// Hard thresholding, keeps the entries with $`|x_i| > t`$
pub fn hard_threshold<S, D>(x: &ArrayBase<D, Ix1>, t: S) -> Array1<S>
where
    S: NdFloat,
    D: Data<Elem = S>,
{
    x.mapv(|xi| if xi.abs() > t { xi } else { S::zero() })
}

/// Copies `x` and replaces its penalised suffix by `f(suffix)`
fn on_penalised<S, F>(x: ArrayView1<'_, S>, penalty_start: usize, f: F) -> Array1<S>
where
    S: NdFloat,
    F: FnOnce(ArrayView1<'_, S>) -> Array1<S>,
{
    let start = penalty_start.min(x.len());
    let mut out = x.to_owned();
    let tail = f(x.slice(s![start..]));
    out.slice_mut(s![start..]).assign(&tail);
    out
}

/// A proximal operator with its parameters bound
pub trait ProxOp<S> {
    fn prox(&self, x: ArrayView1<'_, S>) -> Array1<S>;
}

/// The identity, i.e. the proximal operator of $`\Omega = 0`$
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Identity;

impl<S: NdFloat> ProxOp<S> for Identity {
    fn prox(&self, x: ArrayView1<'_, S>) -> Array1<S> {
        x.to_owned()
    }
}

/// Result of [`SoftThreshold::apply`]
#[derive(Debug, Clone, PartialEq)]
pub struct Shrinkage<S> {
    pub x: Array1<S>,
    /// The threshold that was finally used
    pub threshold: S,
    /// Whether the threshold had to be relaxed
    pub relaxed: bool,
}

/// Proximal operator of the L1 norm
///
/// When `allow_empty` is false and the threshold would purge every penalised
/// coefficient, the threshold is reduced by 5% and reapplied until at least
/// one significant coefficient survives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftThreshold<S> {
    pub threshold: S,
    pub allow_empty: bool,
    pub penalty_start: usize,
}

impl<S: NdFloat> SoftThreshold<S> {
    pub fn new(threshold: S) -> Self {
        SoftThreshold {
            threshold,
            allow_empty: true,
            penalty_start: 0,
        }
    }

    pub fn apply(&self, x: ArrayView1<'_, S>) -> Shrinkage<S> {
        let start = self.penalty_start.min(x.len());
        let tail = x.slice(s![start..]);
        let tol = S::from(TOLERANCE).unwrap();
        let shrink = S::from(0.95).unwrap();

        let mut threshold = self.threshold;
        let mut relaxed = false;
        let mut y = soft_threshold(&tail, threshold);
        let mut iter = 0;
        while !self.allow_empty && norm(&y) <= tol && norm(&tail) > tol && iter < MAX_ITER {
            relaxed = true;
            threshold = threshold * shrink;
            y = soft_threshold(&tail, threshold);
            iter += 1;
        }
        if relaxed {
            log::warn!(
                "Soft threshold was too large (all variables purged). Threshold reset to {:?} (was {:?})",
                threshold,
                self.threshold
            );
        }

        let mut out = x.to_owned();
        out.slice_mut(s![start..]).assign(&y);
        Shrinkage { x: out, threshold, relaxed }
    }
}

impl<S: NdFloat> ProxOp<S> for SoftThreshold<S> {
    fn prox(&self, x: ArrayView1<'_, S>) -> Array1<S> {
        self.apply(x).x
    }
}

/// Projection onto the L1 ball of radius `s`
///
/// The soft threshold is zero if $`\|x\|_1 \leq s`$, and otherwise found by
/// bisection on $`[0, \|x\|_\infty]`$ so that $`\|x'\|_1 = s`$.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct L1BinarySearch<S> {
    pub s: S,
    pub penalty_start: usize,
}

impl<S: NdFloat> ProxOp<S> for L1BinarySearch<S> {
    fn prox(&self, x: ArrayView1<'_, S>) -> Array1<S> {
        let s = self.s.max(S::zero());
        on_penalised(x, self.penalty_start, |x| {
            if norm1(&x) <= s {
                return x.to_owned();
            }
            let max_l = norm_inf(&x);
            let root = Bisection::<S>::new()
                .par(|p| {
                    p.eps = S::from(TOLERANCE).unwrap();
                    p.x_tol = S::epsilon() * max_l;
                    p.max_iter = MAX_ITER;
                })
                .run(|l| norm1(&soft_threshold(&x, l)) - s, S::zero(), max_l);
            soft_threshold(&x, root.x)
        })
    }
}

/// Hard thresholding to at most `n` non-zero entries
///
/// The threshold is found by bisection on $`[0, \|x\|_\infty]`$ for the
/// count of surviving entries. When magnitudes tie at the cutoff the whole
/// tied group is dropped, so fewer than `n` entries may survive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct L0BinarySearch {
    pub n: usize,
    pub penalty_start: usize,
}

impl<S: NdFloat> ProxOp<S> for L0BinarySearch {
    fn prox(&self, x: ArrayView1<'_, S>) -> Array1<S> {
        on_penalised(x, self.penalty_start, |x| {
            let n = self.n.min(x.len());
            if n == 0 {
                return Array1::zeros(x.len());
            }
            if norm0(&x) <= n {
                return x.to_owned();
            }
            let target = S::from(n).unwrap();
            let max_l = norm_inf(&x);
            let root = Bisection::<S>::new()
                .par(|p| {
                    p.eps = S::from(0.5).unwrap();
                    p.x_tol = S::epsilon() * max_l;
                    p.max_iter = MAX_ITER;
                })
                .run(
                    |l| S::from(norm0(&hard_threshold(&x, l))).unwrap() - target,
                    S::zero(),
                    max_l,
                );
            let mut y = hard_threshold(&x, root.x);
            if norm0(&y) > n {
                let cutoff = y
                    .iter()
                    .filter(|yi| **yi != S::zero())
                    .fold(max_l, |acc, yi| acc.min(yi.abs()));
                y = hard_threshold(&x, cutoff);
            }
            y
        })
    }
}

/// Keeps the `k` entries of largest magnitude
///
/// Entries are picked by repeated argmax, so among equal magnitudes the
/// first index wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct L0ByCount {
    pub k: usize,
    pub penalty_start: usize,
}

impl<S: NdFloat> ProxOp<S> for L0ByCount {
    fn prox(&self, x: ArrayView1<'_, S>) -> Array1<S> {
        on_penalised(x, self.penalty_start, |x| {
            let k = self.k.min(x.len());
            let mut magnitude = x.mapv(|xi| xi.abs());
            let mut out = Array1::zeros(x.len());
            for _ in 0..k {
                let mut idx = 0;
                for (i, &m) in magnitude.iter().enumerate() {
                    if m > magnitude[idx] {
                        idx = i;
                    }
                }
                out[idx] = x[idx];
                magnitude[idx] = S::neg_infinity();
            }
            out
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn soft_threshold_exact() {
        let x: Array1<f64> = array![3.5, -0.25, 0.75, -2., 0.];
        let y = SoftThreshold::new(0.5).prox(x.view());
        assert_eq!(y, array![3., 0., 0.25, -1.5, 0.]);
        for (&xi, &yi) in x.iter().zip(y.iter()) {
            assert_eq!(yi, sign(xi) * (xi.abs() - 0.5f64).max(0.));
        }
    }

    #[test]
    fn soft_threshold_relaxed() {
        let _ = env_logger::builder().is_test(true).try_init();
        let x = array![0.1, -0.2, 0.05];
        let op = SoftThreshold { threshold: 1.0, allow_empty: false, penalty_start: 0 };
        let res = op.apply(x.view());
        assert!(res.relaxed);
        assert!(res.threshold < 0.2);
        assert!(res.threshold > 0.2 * 0.95 * 0.95);
        assert!(norm(&res.x) > TOLERANCE);

        let res = SoftThreshold::new(1.0).apply(x.view());
        assert!(!res.relaxed);
        assert_eq!(res.x, Array1::zeros(3));
    }

    #[test]
    fn penalty_start_untouched() {
        let x = array![5., -5., 2., -0.5];
        let op = SoftThreshold { threshold: 1.0, allow_empty: true, penalty_start: 2 };
        assert_eq!(op.prox(x.view()), array![5., -5., 1., 0.]);

        let op = L0ByCount { k: 1, penalty_start: 1 };
        assert_eq!(op.prox(x.view()), array![5., -5., 0., 0.]);
    }

    #[test]
    fn l1_norm_target() {
        let x = array![1.2, -3.4, 0.5, 2.2, -0.1, 0.9];
        for &s in &[0.0_f64, 0.3, 1.0, 2.5, 7.0, 8.3, 20.0] {
            let y = L1BinarySearch { s, penalty_start: 0 }.prox(x.view());
            assert_abs_diff_eq!(norm1(&y), s.min(norm1(&x)), epsilon = TOLERANCE);
        }
    }

    #[test]
    fn l0_cardinality() {
        let x = array![0.3, -4., 1., 2.5, -0.7, 3.];
        let y = L0ByCount { k: 3, penalty_start: 0 }.prox(x.view());
        assert_eq!(y, array![0., -4., 0., 2.5, 0., 3.]);
        assert_eq!(norm0(&y), 3);

        let y = L0ByCount { k: 10, penalty_start: 0 }.prox(x.view());
        assert_eq!(y, x);

        let ties = array![1., -1., 1., 0.5];
        let y = L0ByCount { k: 2, penalty_start: 0 }.prox(ties.view());
        assert_eq!(y, array![1., -1., 0., 0.]);

        let y = L0BinarySearch { n: 2, penalty_start: 0 }.prox(x.view());
        assert_eq!(y, array![0., -4., 0., 0., 0., 3.]);
        assert_eq!(L0BinarySearch { n: 0, penalty_start: 0 }.prox(x.view()), Array1::zeros(6));
    }

    #[test]
    fn l0_ties_stay_within_budget() {
        let x = array![1., 1., 1., 0.2];
        let y = L0BinarySearch { n: 2, penalty_start: 0 }.prox(x.view());
        assert!(norm0(&y) <= 2);
        assert_eq!(y, Array1::zeros(4));

        let x = array![3., -1., 1., 0.2, 1.];
        let y = L0BinarySearch { n: 3, penalty_start: 0 }.prox(x.view());
        assert_eq!(y, array![3., 0., 0., 0., 0.]);

        let y = L0BinarySearch { n: 4, penalty_start: 0 }.prox(x.view());
        assert_eq!(y, array![3., -1., 1., 0., 1.]);
    }

    #[test]
    fn identity_idempotent() {
        let x = array![0.1f32, -7.3, 1e-30, 0.];
        let once = Identity.prox(x.view());
        let twice = Identity.prox(once.view());
        assert_eq!(twice, x);
    }
}
