//! Total variation on a regular grid
//!
//! With forward differences $`A_x, A_y, A_z`$ on a `[z, y, x]` grid,
//! ```math
//! \mathrm{TV}(\beta) = \sum_i \left\| \left( (A_x\beta)_i, (A_y\beta)_i, (A_z\beta)_i \right) \right\|_2
//! ```
//! and the dual set $`K`$ is the product of the unit balls of these triples.

use ndarray::prelude::*;
use sprs::{CsMat, TriMat};

use super::{delegate_smoothing, max_row_norm, penalised, project_rows, NesterovFunction, Smoothing};
use crate::error::{Error, Result};
use crate::functions::properties::{Function, Gradient, LipschitzContinuousGradient};
use crate::linop::{self, Operators};

const POWER_ITER: usize = 1000;

/// The forward difference operators $`[A_x, A_y, A_z]`$ of a grid
///
/// `shape` lists the grid dimensions slowest first, `[z, y, x]`, `[y, x]` or
/// `[x]`. Voxels on the far boundary of a direction have an empty row in
/// that direction's block.
pub fn linear_operator_from_shape(shape: &[usize]) -> Result<Operators> {
    if shape.is_empty() || shape.len() > 3 || shape.contains(&0) {
        return Err(Error::InvalidParameter {
            name: "shape",
            reason: format!("expected 1 to 3 positive dimensions, got {:?}", shape),
        });
    }
    let mut dims = [1usize; 3];
    dims[3 - shape.len()..].copy_from_slice(shape);
    let [nz, ny, nx] = dims;
    let p = nz * ny * nx;

    let mut ax = TriMat::new((p, p));
    let mut ay = TriMat::new((p, p));
    let mut az = TriMat::new((p, p));
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let i = (z * ny + y) * nx + x;
                if x + 1 < nx {
                    ax.add_triplet(i, i, -1.0);
                    ax.add_triplet(i, i + 1, 1.0);
                }
                if y + 1 < ny {
                    ay.add_triplet(i, i, -1.0);
                    ay.add_triplet(i, i + nx, 1.0);
                }
                if z + 1 < nz {
                    az.add_triplet(i, i, -1.0);
                    az.add_triplet(i, i + nx * ny, 1.0);
                }
            }
        }
    }

    let ax: CsMat<f64> = ax.to_csr();
    let ay: CsMat<f64> = ay.to_csr();
    let az: CsMat<f64> = az.to_csr();
    let ops: Operators = vec![Box::new(ax), Box::new(ay), Box::new(az)];
    Ok(ops)
}

/// $`l \cdot \mathrm{TV}(\beta)`$ smoothed
#[derive(Debug)]
pub struct TotalVariation {
    smoothing: Smoothing,
}

impl TotalVariation {
    /// `a` holds the difference blocks, typically from [`linear_operator_from_shape`].
    pub fn new(l: f64, a: Operators, mu: f64, penalty_start: usize) -> Result<Self> {
        let smoothing = Smoothing::new("TotalVariation", l, a, mu, penalty_start)?;
        Ok(TotalVariation { smoothing })
    }

    pub fn from_shape(l: f64, shape: &[usize], mu: f64, penalty_start: usize) -> Result<Self> {
        TotalVariation::new(l, linear_operator_from_shape(shape)?, mu, penalty_start)
    }
}

impl NesterovFunction for TotalVariation {
    delegate_smoothing!(smoothing);

    fn project(&self, a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
        project_rows(a)
    }

    fn m(&self) -> f64 {
        self.smoothing.ops[0].shape().0 as f64 / 2.0
    }

    fn lambda_max(&self) -> f64 {
        *self
            .smoothing
            .lambda_max
            .get_or_init(|| linop::lambda_max(&self.smoothing.ops, POWER_ITER))
    }

    fn estimate_mu(&self, beta: ArrayView1<'_, f64>) -> f64 {
        max_row_norm(&self.smoothing.ops, penalised(beta, self.smoothing.penalty_start))
    }
}

impl Function for TotalVariation {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        if self.smoothing.l < crate::consts::TOLERANCE {
            return 0.0;
        }
        let b = penalised(beta, self.smoothing.penalty_start);
        let ab: Vec<Array1<f64>> = self.smoothing.ops.iter().map(|op| op.apply(b)).collect();
        let mut sq = Array1::<f64>::zeros(ab[0].len());
        for a in &ab {
            sq += &a.mapv(|x| x * x);
        }
        self.smoothing.l * sq.mapv(f64::sqrt).sum()
    }

    fn reset(&mut self) {
        self.smoothing.reset();
    }
}

impl Gradient for TotalVariation {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        self.smoothed_grad(beta)
    }
}

impl LipschitzContinuousGradient for TotalVariation {
    fn lipschitz(&self) -> f64 {
        self.smoothed_lipschitz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn forward_differences() {
        let a = linear_operator_from_shape(&[2, 3]).unwrap();
        let beta = array![1., 2., 4., 0., 0., 1.];
        assert_eq!(a[0].apply(beta.view()), array![1., 2., 0., 0., 1., 0.]);
        assert_eq!(a[1].apply(beta.view()), array![-1., -2., -3., 0., 0., 0.]);
        assert_eq!(a[2].apply(beta.view()), Array1::zeros(6));
        assert!(linear_operator_from_shape(&[2, 0]).is_err());
    }

    #[test]
    fn tv_value_and_bounds() {
        let tv = TotalVariation::from_shape(0.5, &[4], 1.0, 0).unwrap();
        let beta = array![1., 3., 2., 2.];
        assert_abs_diff_eq!(tv.f(beta.view()), 0.5 * 3.);
        assert_abs_diff_eq!(tv.m(), 2.);
        assert_abs_diff_eq!(tv.estimate_mu(beta.view()), 2.);
        // Laplacian of the path graph
        assert_abs_diff_eq!(tv.lambda_max(), 2. + 2f64.sqrt(), epsilon = 1e-4);
        // the smoothed value never exceeds the exact one
        assert!(tv.fmu(beta.view()) <= tv.f(beta.view()));
        assert!(tv.fmu(beta.view()) >= tv.f(beta.view()) - tv.l() * tv.get_mu() * tv.m());
    }

    #[test]
    fn missing_operator() {
        assert!(matches!(
            TotalVariation::new(1.0, Vec::new(), 1.0, 0),
            Err(Error::MissingOperator(_))
        ));
    }
}
