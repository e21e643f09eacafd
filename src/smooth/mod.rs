//! First Order Methods for Smooth and Smoothed Minimization
//!
//! For minimizing a "smooth" objective function, $`f`$, with an
//! $`L`$-Lipschitz continuos gradient, i.e.
//! ```math
//! \| \nabla f(x) - \nabla f(z) \|_2 \leq L \| x - z \|_2
//! ```
//! the step $`1/L`$ is safe. When $`L`$ is unknown a backtracking line
//! search finds a step with sufficient descent instead.
//!
//! Non-smooth penalties enter through Nesterov smoothing. The excessive gap
//! method works on the smoothed dual directly and needs no proximal step.
//!
//! For more info, see [Lipschitz Continuity on Wikipedia](https://en.wikipedia.org/wiki/Lipschitz_continuity)

mod excessive_gap;
pub use excessive_gap::*;
mod linesearch;
pub use linesearch::*;

use ndarray::ArrayView1;

/// Do nothing function for optional user callback (returns false)
#[allow(clippy::needless_pass_by_value)]
pub fn nop(_beta: ArrayView1<'_, f64>, _iter: usize) -> bool {
    false
}
