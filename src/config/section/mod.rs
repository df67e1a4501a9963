//! Configuration section definitions.
//!
//! Each module corresponds to a section in `pages.toml`:
//!
//! | Module   | TOML Section | Purpose                                 |
//! |----------|--------------|-----------------------------------------|
//! | `build`  | `[build]`    | Source/output paths, per-class globs    |
//! | `serve`  | `[serve]`    | Development server                      |
//! | `deploy` | `[deploy]`   | Upload target                           |
//! | `lint`   | `[lint]`     | External lint tools                     |
//!
//! Template data lives in the free-form `[data]` table.

mod build;
mod deploy;
mod lint;
mod serve;

pub use build::BuildConfig;
pub use deploy::DeployConfig;
pub use lint::LintConfig;
pub use serve::ServeConfig;
