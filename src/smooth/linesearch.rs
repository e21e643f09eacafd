use ndarray::prelude::*;

/// Parameters of [`BacktrackingLineSearch`]
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchParam {
    /// Shrink factor of the step, in $`(0, 1)`$
    pub rho: f64,
    /// Sufficient descent constant, in $`(0, 1)`$
    pub c: f64,
    /// First step tried
    pub a0: f64,
    pub max_iter: usize,
}

impl Default for LineSearchParam {
    fn default() -> Self {
        LineSearchParam {
            rho: 0.5,
            c: 1e-4,
            a0: 0.1,
            max_iter: 30,
        }
    }
}

/// Backtracking Line Search
///
/// Algorithm
/// ---------
/// Starting from $`a = a_0`$, shrink $`a \leftarrow \rho a`$ until the
/// Armijo condition
/// ```math
/// f(x + a p) \leq f(x) + c\, a \langle \nabla f(x), p \rangle
/// ```
/// holds. The last step tried is returned when the condition never holds
/// within `max_iter` shrinks.
#[derive(Debug, Clone, Default)]
pub struct BacktrackingLineSearch {
    par: LineSearchParam,
}

impl BacktrackingLineSearch {
    pub fn new() -> Self {
        BacktrackingLineSearch::default()
    }

    pub fn par<P>(mut self, f: P) -> Self
    where
        P: FnOnce(&mut LineSearchParam),
    {
        f(&mut self.par);
        self
    }

    pub fn param(&self) -> &LineSearchParam {
        &self.par
    }

    /// Step along the descent direction `p` from `x`, where `grad` is the
    /// gradient of `f` at `x`
    pub fn run(
        &self,
        f: impl Fn(ArrayView1<'_, f64>) -> f64,
        x: ArrayView1<'_, f64>,
        p: ArrayView1<'_, f64>,
        grad: ArrayView1<'_, f64>,
    ) -> f64 {
        let fx = f(x);
        let slope = grad.dot(&p);
        let mut a = self.par.a0;

        for iter in 0..self.par.max_iter {
            if iter > 0 {
                a *= self.par.rho;
            }
            let mut xa = x.to_owned();
            xa.scaled_add(a, &p);
            if f(xa.view()) <= fx + self.par.c * a * slope {
                return a;
            }
        }
        log::debug!("BacktrackingLineSearch: no sufficient descent after {} steps", self.par.max_iter);
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quadratic() {
        // f(x) = 2|x|^2, the full step 1 overshoots to -3x
        let f = |x: ArrayView1<'_, f64>| 2.0 * x.dot(&x);
        let x = array![1.0, -2.0];
        let g = &x * 4.0;
        let p = -&g;

        let ls = BacktrackingLineSearch::new().par(|p| p.a0 = 1.0);
        let a = ls.run(f, x.view(), p.view(), g.view());
        // 1 and 0.5 fail, 0.25 lands on the minimiser
        assert_abs_diff_eq!(a, 0.25);

        let a = BacktrackingLineSearch::new().run(f, x.view(), p.view(), g.view());
        assert_abs_diff_eq!(a, 0.1);
    }

    #[test]
    fn gives_up() {
        // an ascent direction never satisfies the condition
        let f = |x: ArrayView1<'_, f64>| x.dot(&x);
        let x = array![1.0];
        let g = array![2.0];
        let tried = std::cell::RefCell::new(Vec::new());
        let record = |y: ArrayView1<'_, f64>| {
            tried.borrow_mut().push(y[0]);
            f(y)
        };
        let ls = BacktrackingLineSearch::new().par(|p| {
            p.a0 = 1.0;
            p.max_iter = 3;
        });
        // 1, 0.5 and 0.25 are tried, the last of them comes back
        assert_abs_diff_eq!(ls.run(record, x.view(), g.view(), g.view()), 0.25);
        assert_eq!(*tried.borrow(), vec![1.0, 3.0, 2.0, 1.5]);
    }
}
