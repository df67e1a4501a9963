//! Small shared helpers.

pub mod exec;
pub mod git;
pub mod mime;
pub mod path;
pub mod plural;
pub mod size;

pub use plural::plural_count;
pub use size::format_bytes;
