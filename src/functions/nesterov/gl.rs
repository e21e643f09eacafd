//! Group lasso with overlapping groups
//!
//! ```math
//! \mathrm{GL}(\beta) = \sum_{g=1}^G \|A_g \beta\|_2
//! ```
//! where $`A_g`$ picks (and weights) the variables of group $`g`$. The dual
//! set is the product of the unit balls of the groups.

use ndarray::prelude::*;
use sprs::{CsMat, TriMat};

use super::{delegate_smoothing, penalised, project_blocks, NesterovFunction, Smoothing};
use crate::consts::TOLERANCE;
use crate::error::{Error, Result};
use crate::functions::properties::{Function, Gradient, LipschitzContinuousGradient};
use crate::maths::norm;
use crate::linop::Operators;

/// One selection block per group
///
/// `groups[g]` lists the variables of group `g`, and every group gets the
/// weight `weights[g]`, or 1 when no weights are given.
pub fn linear_operator_from_groups(
    num_variables: usize,
    groups: &[Vec<usize>],
    weights: Option<&[f64]>,
) -> Result<Operators> {
    if let Some(w) = weights {
        if w.len() != groups.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![groups.len()],
                got: vec![w.len()],
            });
        }
    }
    let mut ops: Operators = Vec::with_capacity(groups.len());
    for (g, group) in groups.iter().enumerate() {
        let w = weights.map_or(1.0, |w| w[g]);
        let mut ag = TriMat::new((group.len(), num_variables));
        for (i, &var) in group.iter().enumerate() {
            if var >= num_variables {
                return Err(Error::InvalidParameter {
                    name: "groups",
                    reason: format!("variable {} of group {} is out of range 0..{}", var, g, num_variables),
                });
            }
            ag.add_triplet(i, var, w);
        }
        let ag: CsMat<f64> = ag.to_csr();
        ops.push(Box::new(ag));
    }
    Ok(ops)
}

/// $`l \cdot \mathrm{GL}(\beta)`$ smoothed
#[derive(Debug)]
pub struct GroupLassoOverlap {
    smoothing: Smoothing,
}

impl GroupLassoOverlap {
    pub fn new(l: f64, a: Operators, mu: f64, penalty_start: usize) -> Result<Self> {
        let smoothing = Smoothing::new("GroupLassoOverlap", l, a, mu, penalty_start)?;
        Ok(GroupLassoOverlap { smoothing })
    }
}

impl NesterovFunction for GroupLassoOverlap {
    delegate_smoothing!(smoothing);

    fn project(&self, a: Vec<Array1<f64>>) -> Vec<Array1<f64>> {
        project_blocks(a)
    }

    /// Every group contributes at most 1/2
    fn m(&self) -> f64 {
        self.smoothing.ops.len() as f64 / 2.0
    }

    /// The largest column sum of squares
    ///
    /// `AᵀA` of selection blocks is diagonal even when groups overlap, so this
    /// is exact as long as no group lists a variable twice.
    fn lambda_max(&self) -> f64 {
        *self.smoothing.lambda_max.get_or_init(|| {
            let ops = &self.smoothing.ops;
            let mut colsum = Array1::<f64>::zeros(ops[0].shape().1);
            for ag in ops {
                colsum += &ag.column_norms_sq();
            }
            colsum.fold(0.0, |acc, &c| acc.max(c))
        })
    }

    fn estimate_mu(&self, beta: ArrayView1<'_, f64>) -> f64 {
        let b = penalised(beta, self.smoothing.penalty_start);
        self.smoothing
            .ops
            .iter()
            .map(|ag| norm(&ag.apply(b)))
            .fold(0.0, f64::max)
    }
}

impl Function for GroupLassoOverlap {
    fn f(&self, beta: ArrayView1<'_, f64>) -> f64 {
        if self.smoothing.l < TOLERANCE {
            return 0.0;
        }
        let b = penalised(beta, self.smoothing.penalty_start);
        let normsum: f64 = self.smoothing.ops.iter().map(|ag| norm(&ag.apply(b))).sum();
        self.smoothing.l * normsum
    }

    fn reset(&mut self) {
        self.smoothing.reset();
    }
}

impl Gradient for GroupLassoOverlap {
    fn grad(&self, beta: ArrayView1<'_, f64>) -> Array1<f64> {
        self.smoothed_grad(beta)
    }
}

impl LipschitzContinuousGradient for GroupLassoOverlap {
    fn lipschitz(&self) -> f64 {
        self.smoothed_lipschitz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::nesterov::tests::approx_grad;
    use approx::assert_abs_diff_eq;

    #[test]
    fn overlapping_groups() {
        let groups = vec![vec![0, 1, 2], vec![2, 3], vec![4]];
        let a = linear_operator_from_groups(5, &groups, Some(&[1.0, 2.0, 1.0][..])).unwrap();
        let gl = GroupLassoOverlap::new(0.5, a, 0.1, 1).unwrap();
        let beta = array![100., 3., 0., 4., -1., 0.5];

        // groups act on beta[1..] = [3, 0, 4, -1, 0.5]
        let expected = 0.5 * (5. + 2. * 17f64.sqrt() + 0.5);
        assert_abs_diff_eq!(gl.f(beta.view()), expected, epsilon = 1e-12);
        assert_abs_diff_eq!(gl.m(), 1.5);
        // variable 2 is in both groups, 1 + 4
        assert_abs_diff_eq!(gl.lambda_max(), 5.);
        assert_abs_diff_eq!(gl.estimate_mu(beta.view()), 2. * 17f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(gl.grad(beta.view()), approx_grad(&gl, &beta), epsilon = 1e-5);
        assert_eq!(gl.grad(beta.view())[0], 0.);
    }

    #[test]
    fn lambda_max_with_overlap() {
        // variable 2 sits in all three groups, A'A stays diagonal
        let groups = vec![vec![0, 1, 2], vec![1, 2, 3], vec![2]];
        let a = linear_operator_from_groups(4, &groups, None).unwrap();
        let gl = GroupLassoOverlap::new(1.0, a, 0.1, 0).unwrap();
        assert_abs_diff_eq!(gl.lambda_max(), 3.);
        let power = crate::linop::lambda_max(gl.linear_operator(), 1000);
        assert_abs_diff_eq!(power, gl.lambda_max(), epsilon = 1e-6);
    }

    #[test]
    fn group_out_of_range() {
        let groups = vec![vec![0, 7]];
        assert!(linear_operator_from_groups(5, &groups, None).is_err());
        assert!(linear_operator_from_groups(5, &groups, Some(&[1., 2.][..])).is_err());
    }
}
