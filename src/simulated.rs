//! Simulated data with a known solution

/// Data for linear regression with L1, L2 and total variation penalties
///
/// The data are built so that a chosen $`\beta^*`$ minimises
/// ```math
/// f(\beta) = \frac12\|X\beta - y\|_2^2 + l\|\beta\|_1 + \frac{k}{2}\|\beta\|_2^2 + g\,\mathrm{TV}(\beta)
/// ```
/// exactly. Every column of a template matrix $`M`$ is scaled so that
/// $`X^Te`$ cancels a subgradient of the penalties at $`\beta^*`$, and
/// $`y = X\beta^* - e`$.
pub mod l1_l2_tv {
    use ndarray::prelude::*;

    use crate::consts::TOLERANCE;
    use crate::direct::Bisection;
    use crate::error::{Error, Result};
    use crate::functions::nesterov::tv::linear_operator_from_shape;
    use crate::linop::Operators;
    use crate::maths::{norm, sign};

    /// Halvings of the signal to noise calibration
    const SNR_ITER: usize = 30;

    /// Generates `(X, y, beta)`.
    ///
    /// - `m` is the $`n \times p`$ template whose column distribution `X` inherits.
    /// - `e` is the residual $`X\beta - y`$.
    /// - With `snr`, `beta` is rescaled so that $`\|X\beta\|_2 / \|e\|_2 = `$ `snr`.
    /// - `shape` is the grid of the total variation, `[p]` by default.
    #[allow(clippy::too_many_arguments)]
    pub fn load(
        l: f64,
        k: f64,
        g: f64,
        beta: &Array1<f64>,
        m: &Array2<f64>,
        e: &Array1<f64>,
        snr: Option<f64>,
        shape: Option<&[usize]>,
    ) -> Result<(Array2<f64>, Array1<f64>, Array1<f64>)> {
        let p = beta.len();
        let shape = shape.map_or_else(|| vec![p], <[usize]>::to_vec);
        if shape.iter().product::<usize>() != p || m.dim() != (e.len(), p) {
            return Err(Error::ShapeMismatch {
                expected: vec![e.len(), p],
                got: m.shape().to_vec(),
            });
        }
        let a = linear_operator_from_shape(&shape)?;
        let mte = m.t().dot(e);
        if let Some(i) = mte.iter().position(|v| v.abs() <= TOLERANCE) {
            return Err(Error::InvalidParameter {
                name: "M",
                reason: format!("column {} is orthogonal to e", i),
            });
        }

        let beta = match snr {
            Some(snr) => {
                let e_norm = norm(e);
                let ratio = |x: f64| {
                    let b = beta * x;
                    let xb = generate(l, k, g, &b, m, &mte, &a).dot(&b);
                    norm(&xb) / e_norm - snr
                };
                let root = Bisection::<f64>::new()
                    .par(|p| p.max_iter = SNR_ITER)
                    .run(ratio, 0.0, snr);
                log::debug!("l1_l2_tv: beta scaled by {:.5} for snr {} ({:+.3e})", root.x, snr, root.fx);
                beta * root.x
            }
            None => beta.clone(),
        };

        let x = generate(l, k, g, &beta, m, &mte, &a);
        let y = x.dot(&beta) - e;
        Ok((x, y, beta))
    }

    fn generate(
        l: f64,
        k: f64,
        g: f64,
        beta: &Array1<f64>,
        m: &Array2<f64>,
        mte: &Array1<f64>,
        a: &Operators,
    ) -> Array2<f64> {
        let alpha = -(beta.mapv(sign) * l + beta * k + tv_subgradient(beta, a) * g);
        let mut x = m.clone();
        for (mut col, (&ai, &mi)) in x.axis_iter_mut(Axis(1)).zip(alpha.iter().zip(mte)) {
            col *= ai / mi;
        }
        x
    }

    /// $`A^Tu`$ with $`u_i`$ the normalised gradient of voxel $`i`$, zero where
    /// the gradient vanishes
    fn tv_subgradient(beta: &Array1<f64>, a: &Operators) -> Array1<f64> {
        let mut ab: Vec<Array1<f64>> = a.iter().map(|op| op.apply(beta.view())).collect();
        for i in 0..beta.len() {
            let n = ab.iter().map(|v| v[i] * v[i]).sum::<f64>().sqrt();
            for v in ab.iter_mut() {
                v[i] = if n > 0.0 { v[i] / n } else { 0.0 };
            }
        }
        let mut grad = Array1::zeros(beta.len());
        for (op, u) in a.iter().zip(&ab) {
            grad += &op.apply_adjoint(u.view());
        }
        grad
    }

}
