//! Asset classes and glob matching.
//!
//! Every asset class owns one glob set, evaluated relative to the base
//! directory of the step that consumes it.

mod class;
mod glob;

pub use class::AssetClass;
pub use glob::{Globs, collect};
