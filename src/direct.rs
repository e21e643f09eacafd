//! Root Finding via Direct Function Comparison, i.e. derivativeless
use ndarray::NdFloat; // includes LinalgScalar and ScalarOperand

use crate::consts::TOLERANCE;
use crate::maths::sign;

/// Parameters of [`Bisection`]
#[derive(Debug, Clone, PartialEq)]
pub struct BisectionParam<S> {
    /// Accept `x` as a root once $`|f(x)| \leq`$ `eps`.
    pub eps: S,
    /// Accept the midpoint once the bracket is narrower than `x_tol`.
    pub x_tol: S,
    /// Cap on both the bracket expansions and the halvings.
    pub max_iter: usize,
}

impl<S: NdFloat> Default for BisectionParam<S> {
    fn default() -> Self {
        BisectionParam {
            eps: S::from(TOLERANCE).unwrap(),
            x_tol: S::from(TOLERANCE).unwrap(),
            max_iter: 50,
        }
    }
}

/// Outcome of a [`Bisection`] run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root<S> {
    /// The root estimate
    pub x: S,
    /// $`f(x)`$
    pub fx: S,
    /// Number of halvings performed
    pub iterations: usize,
    /// Whether a sign change was ever bracketed
    pub bracketed: bool,
}

/// The Bisection Method
///
/// Finds a root of a monotone scalar function _f_ that changes sign. If the
/// initial bracket `[low, high]` does not contain a sign change it is grown
/// geometrically on both sides, $`\mathrm{low} \leftarrow \mathrm{low} -
/// |\mathrm{low}| 2^i`$ and likewise for `high`, at most `max_iter` times.
/// The bracket may be given in either order and _f_ may be increasing or
/// decreasing. See [Wikipedia](https://en.wikipedia.org/wiki/Bisection_method)
/// for more info.
#[derive(Debug, Clone, PartialEq)]
pub struct Bisection<S> {
    par: BisectionParam<S>,
}

impl<S: NdFloat> Default for Bisection<S> {
    fn default() -> Self {
        Bisection::new()
    }
}

impl<S: NdFloat> Bisection<S> {
    pub fn new() -> Self {
        Bisection {
            par: BisectionParam::default(),
        }
    }

    /// Changes the parameters by a closure
    pub fn par<P>(mut self, f: P) -> Self
    where
        P: FnOnce(&mut BisectionParam<S>),
    {
        f(&mut self.par);
        self
    }

    pub fn param(&self) -> &BisectionParam<S> {
        &self.par
    }

    pub fn run(&self, func: impl Fn(S) -> S, low: S, high: S) -> Root<S> {
        let two = S::from(2.).unwrap();
        let (mut low, mut high) = if low <= high { (low, high) } else { (high, low) };
        let mut f_low = func(low);
        let mut f_high = func(high);

        let mut grow = S::one();
        for _expansion in 0..self.par.max_iter {
            if sign(f_low) * sign(f_high) <= S::zero() {
                break;
            }
            low = low - low.abs().max(S::one()) * grow;
            high = high + high.abs().max(S::one()) * grow;
            f_low = func(low);
            f_high = func(high);
            grow = grow * two;
        }

        if f_low == S::zero() {
            return Root { x: low, fx: f_low, iterations: 0, bracketed: true };
        }
        if f_high == S::zero() {
            return Root { x: high, fx: f_high, iterations: 0, bracketed: true };
        }
        if sign(f_low) * sign(f_high) > S::zero() {
            log::warn!(
                "Bisection: no sign change in [{:?}, {:?}], f = ({:?}, {:?})",
                low, high, f_low, f_high
            );
            let (x, fx) = if f_low.abs() <= f_high.abs() { (low, f_low) } else { (high, f_high) };
            return Root { x, fx, iterations: 0, bracketed: false };
        }

        let mut mid = (low + high) / two;
        let mut f_mid = func(mid);
        let mut iterations = 1;
        while iterations < self.par.max_iter {
            if f_mid.abs() <= self.par.eps || (high - low) / two <= self.par.x_tol {
                break;
            }
            if sign(f_mid) == sign(f_low) {
                low = mid;
                f_low = f_mid;
            } else {
                high = mid;
            }
            mid = (low + high) / two;
            f_mid = func(mid);
            iterations += 1;
        }
        log::trace!("Bisection: x = {:?}, f(x) = {:?} after {} halvings", mid, f_mid, iterations);

        Root { x: mid, fx: f_mid, iterations, bracketed: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn bisection_increasing() {
        let root = Bisection::new().run(|x: f64| x.powi(3) - 8., 0., 5.);
        assert!(root.bracketed);
        assert_abs_diff_eq!(root.x, 2., epsilon = 1e-6);
        assert!(root.fx.abs() <= 1e-6);
    }

    #[test]
    fn bisection_either_orientation() {
        let func = |x: f64| 1.5 - x;
        let a = Bisection::new().run(func, 0., 4.);
        let b = Bisection::new().run(func, 4., 0.);
        assert_abs_diff_eq!(a.x, 1.5, epsilon = 1e-7);
        assert_abs_diff_eq!(b.x, 1.5, epsilon = 1e-7);

        let root = Bisection::new()
            .par(|p| p.max_iter = 200)
            .run(|x: f32| (x - 0.25).atan(), 3., -3.);
        assert_abs_diff_eq!(root.x, 0.25, epsilon = 1e-5);
    }

    #[test]
    fn bisection_expands_bracket() {
        let root = Bisection::new().par(|p| p.max_iter = 100).run(|x: f64| x - 37., 0., 1.);
        assert!(root.bracketed);
        assert_abs_diff_eq!(root.x, 37., epsilon = 1e-6);
    }

    #[test]
    fn bisection_without_sign_change() {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = Bisection::new().par(|p| p.max_iter = 5).run(|x: f64| x * x + 1., -1., 2.);
        assert!(!root.bracketed);
        assert!(root.fx >= 1.);
    }
}
