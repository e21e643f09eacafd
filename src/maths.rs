//! Vector norms and the sign function
use ndarray::prelude::*;
use ndarray::{Data, NdFloat};

/// Euclidean norm $`\|x\|_2`$
pub fn norm<S, D>(x: &ArrayBase<D, Ix1>) -> S
where
    S: NdFloat,
    D: Data<Elem = S>,
{
    x.dot(x).sqrt()
}

/// $`\|x\|_1 = \sum_i |x_i|`$
pub fn norm1<S, D>(x: &ArrayBase<D, Ix1>) -> S
where
    S: NdFloat,
    D: Data<Elem = S>,
{
    x.fold(S::zero(), |acc, &xi| acc + xi.abs())
}

/// Number of non-zero entries
pub fn norm0<S, D>(x: &ArrayBase<D, Ix1>) -> usize
where
    S: NdFloat,
    D: Data<Elem = S>,
{
    x.iter().filter(|&&xi| xi != S::zero()).count()
}

/// $`\|x\|_\infty = \max_i |x_i|`$, zero for an empty vector
pub fn norm_inf<S, D>(x: &ArrayBase<D, Ix1>) -> S
where
    S: NdFloat,
    D: Data<Elem = S>,
{
    x.fold(S::zero(), |acc, &xi| acc.max(xi.abs()))
}

/// Sign of `x` with `sign(0) = 0`
///
/// Unlike [`f64::signum`], zero maps to zero.
#[inline]
pub fn sign<S: NdFloat>(x: S) -> S {
    if x > S::zero() {
        S::one()
    } else if x < S::zero() {
        -S::one()
    } else {
        S::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn norms() {
        let x = array![3., -4., 0.];
        assert_abs_diff_eq!(norm(&x), 5.);
        assert_abs_diff_eq!(norm1(&x), 7.);
        assert_eq!(norm0(&x), 2);
        assert_abs_diff_eq!(norm_inf(&x), 4.);
        assert_abs_diff_eq!(norm_inf(&Array1::<f32>::zeros(0)), 0.);
    }

    #[test]
    fn sign_of_zero() {
        assert_eq!(sign(0.0f64), 0.);
        assert_eq!(sign(-0.0f64), 0.);
        assert_eq!(sign(-2.5f32), -1.);
        assert_eq!(sign(1e-300f64), 1.);
    }
}
