//! Resolved configuration for a detection run.

pub mod options;

pub use options::{default_arch, parse_library_spec, DetectOptions, DownloadMode, Flavor, PointerWidth};
