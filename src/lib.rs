//! The `ndarray-parsimony` crate provides structured sparse regression
//! on top of `ndarray`, minimizing objectives of the form
//! ```math
//! \mathrm{loss}(\beta) + \sum_j \mathrm{penalty}_j(\beta)
//! ```
//! where the penalties may be non-smooth.
//!
//! It includes:
//! - Losses and penalties (ridge and logistic regression, L1, L2)
//! - Nesterov smoothed penalties (L1, total variation, overlapping group lasso)
//! - Proximal operators, including norm and cardinality targets
//! - ISTA and FISTA
//! - CONESTA, continuation on the Nesterov smoothing constant
//! - The Excessive Gap Method
//! - Bisection, and simulated data with known solutions
//!
//! Algorithms only hold their parameters and state the capabilities they
//! need from an objective as trait bounds, see [`functions::properties`].
//! Expected numerical conditions, such as an exhausted iteration budget, are
//! reported in the returned [`Solution`] and through the `log` facade.
//! Structural misuse is an [`Error`].

#![cfg_attr(all(rustc_nightly, test), feature(test))]
#[cfg(all(rustc_nightly, test))]
extern crate test;

pub mod consts;
pub mod direct;
pub mod error;
pub mod functions;
pub mod linop;
pub mod maths;
pub mod prox;
pub mod prox_ops;
pub mod simulated;
pub mod smooth;
pub mod solution;

pub use error::{Error, Result};
pub use solution::{Solution, Trace};
