//! Objective Functions and their Building Blocks
//!
//! Losses, penalties and Nesterov smoothed penalties are combined into
//! objectives, either generically with [`CombinedFunction`] or through the
//! specialised ridge objectives of [`objectives`] that also know their
//! duality gap. What an objective can do is described by the traits of
//! [`properties`].

pub mod combined;
pub mod losses;
pub mod nesterov;
pub mod objectives;
pub mod penalties;
pub mod properties;

pub use combined::CombinedFunction;
pub use losses::{RidgeLogisticRegression, RidgeRegression};
pub use nesterov::{GroupLassoOverlap, NesterovFunction, SmoothedL1, TotalVariation, L1TV};
pub use objectives::{RidgeL1GL, RidgeL1Nesterov, RidgeL1TV, RidgeSmoothedL1TV};
pub use penalties::{ZeroFunction, L1, L2};
pub use properties::*;
