//! Core types shared across the codebase.

mod mode;
mod shutdown;

pub use mode::BuildMode;
pub use shutdown::{Shutdown, setup_shutdown_handler};
