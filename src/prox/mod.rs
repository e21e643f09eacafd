//! Minimization for Composite Functions consisting of
//! L-smooth _f_ and non-smooth prox-friendly _g_
//!
//! This includes common objective functions such as the LASSO
//! as well as smooth constrained methods, as a projection is
//! the proximal operator of a constraint set. CONESTA extends this
//! to penalties that are neither smooth nor prox-friendly by smoothing
//! them, and tightening the smoothing as the solution converges.

mod conesta;
pub use conesta::*;

mod fista;
pub use fista::*;
