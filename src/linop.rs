//! Abstract Linear Operators and Adjoints
//!
//! The Nesterov functions only ever need $`Ax`$ and $`A^Ty`$ of their
//! operator blocks, so dense `ndarray` matrices, `sprs` sparse matrices and
//! the implicit identity are all interchangeable here.

use ndarray::prelude::*;
use ndarray::Data;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use sprs::CsMat;

use crate::consts::TOLERANCE;
use crate::maths::norm;

/// A linear map $`A : \mathbb{R}^p \to \mathbb{R}^m`$ with its adjoint
pub trait LinearOperator {
    /// `(m, p)`
    fn shape(&self) -> (usize, usize);

    /// $`Ax`$
    fn apply(&self, x: ArrayView1<'_, f64>) -> Array1<f64>;

    /// $`A^T y`$
    fn apply_adjoint(&self, y: ArrayView1<'_, f64>) -> Array1<f64>;

    /// Squared Euclidean norm of every column, i.e. the diagonal of $`A^TA`$
    fn column_norms_sq(&self) -> Array1<f64>;
}

impl<S> LinearOperator for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn shape(&self) -> (usize, usize) {
        self.dim()
    }

    fn apply(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.dot(&x)
    }

    fn apply_adjoint(&self, y: ArrayView1<'_, f64>) -> Array1<f64> {
        self.t().dot(&y)
    }

    fn column_norms_sq(&self) -> Array1<f64> {
        self.map(|a| a * a).sum_axis(Axis(0))
    }
}

impl LinearOperator for CsMat<f64> {
    fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    fn apply(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self * &x
    }

    fn apply_adjoint(&self, y: ArrayView1<'_, f64>) -> Array1<f64> {
        &self.transpose_view() * &y
    }

    fn column_norms_sq(&self) -> Array1<f64> {
        let mut sq = Array1::zeros(self.cols());
        for (&a, (_, col)) in self.iter() {
            sq[col] += a * a;
        }
        sq
    }
}

/// The identity scaled by a constant, $`wI_p`$
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Identity {
    dim: usize,
    weight: f64,
}

impl Identity {
    #[must_use]
    pub fn new(dim: usize) -> Identity {
        Identity::scaled(dim, 1.0)
    }

    #[must_use]
    pub fn scaled(dim: usize, weight: f64) -> Identity {
        Identity { dim, weight }
    }
}

impl LinearOperator for Identity {
    fn shape(&self) -> (usize, usize) {
        (self.dim, self.dim)
    }

    #[inline]
    fn apply(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        &x * self.weight
    }

    #[inline]
    fn apply_adjoint(&self, y: ArrayView1<'_, f64>) -> Array1<f64> {
        &y * self.weight
    }

    fn column_norms_sq(&self) -> Array1<f64> {
        Array1::from_elem(self.dim, self.weight * self.weight)
    }
}

/// Another operator multiplied by a constant, $`wA`$
pub struct Scaled {
    inner: Box<dyn LinearOperator>,
    weight: f64,
}

impl Scaled {
    pub fn new(inner: Box<dyn LinearOperator>, weight: f64) -> Scaled {
        Scaled { inner, weight }
    }
}

impl LinearOperator for Scaled {
    fn shape(&self) -> (usize, usize) {
        self.inner.shape()
    }

    fn apply(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.inner.apply(x) * self.weight
    }

    fn apply_adjoint(&self, y: ArrayView1<'_, f64>) -> Array1<f64> {
        self.inner.apply_adjoint(y) * self.weight
    }

    fn column_norms_sq(&self) -> Array1<f64> {
        self.inner.column_norms_sq() * (self.weight * self.weight)
    }
}

/// Boxed operator blocks $`A_1, \ldots, A_k`$ sharing the input dimension
pub type Operators = Vec<Box<dyn LinearOperator>>;

/// $`\sum_i A_i^T A_i x`$
fn normal_apply(ops: &[Box<dyn LinearOperator>], x: ArrayView1<'_, f64>) -> Array1<f64> {
    let mut acc = Array1::zeros(x.len());
    for a in ops {
        acc += &a.apply_adjoint(a.apply(x).view());
    }
    acc
}

/// Largest eigenvalue of $`\sum_i A_i^TA_i`$ by power iteration
///
/// The start vector is drawn from a fixed seed, so the estimate is
/// reproducible. Iteration stops when the normalised iterate moves less
/// than [`TOLERANCE`] or after `max_iter` products.
pub fn lambda_max(ops: &[Box<dyn LinearOperator>], max_iter: usize) -> f64 {
    let p = match ops.first() {
        Some(a) => a.shape().1,
        None => return 0.0,
    };
    if p == 0 {
        return 0.0;
    }

    let mut rng = StdRng::seed_from_u64(42);
    let mut v = Array1::random_using(p, Uniform::new(0.0, 1.0), &mut rng);
    let v_norm = norm(&v);
    v /= v_norm;

    for _iter in 0..max_iter {
        let mut w = normal_apply(ops, v.view());
        let w_norm = norm(&w);
        if w_norm <= 0.0 {
            return 0.0;
        }
        w /= w_norm;
        let delta = norm(&(&w - &v));
        v = w;
        if delta < TOLERANCE {
            break;
        }
    }

    ops.iter().map(|a| a.apply(v.view()).mapv(|x| x * x).sum()).sum()
}

/// Largest eigenvalue of $`X^TX`$ for a dense data matrix
pub fn lambda_max_gram<S: Data<Elem = f64>>(x: &ArrayBase<S, Ix2>, max_iter: usize) -> f64 {
    let ops: Operators = vec![Box::new(x.to_owned())];
    lambda_max(&ops, max_iter)
}
