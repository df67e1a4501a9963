//! Path utilities.
//!
//! Pure functions for path manipulation.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `relative_to`)

pub mod fs;

pub use fs::{normalize_path, relative_to};
