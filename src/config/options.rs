//! Detection options resolved from CLI arguments and environment.
//!
//! The CLI surface lives in [`crate::cli`]; this module holds the
//! plain-data value the search pipeline consumes, so library users and
//! tests can construct options without touching clap.

use crate::candidates::spec::LibraryRef;
use clap::ValueEnum;
use std::path::PathBuf;

/// Whether and when to download the reference implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DownloadMode {
    /// Never download; system search only.
    #[default]
    Off,
    /// Download and build unconditionally; the result is committed.
    Always,
    /// Download only when no system candidate validates.
    IfNeeded,
}

/// Which reference flavor to provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Flavor {
    /// Mechanically translated C sources using the suffixed calling
    /// convention. Compiles in the outer build phase, not here.
    Translated,
    /// Native Fortran sources; requires a Fortran compiler.
    #[default]
    Fortran,
}

impl Flavor {
    /// Directory and archive-name prefix for this flavor.
    pub fn prefix(&self) -> &'static str {
        match self {
            Flavor::Translated => "f2c",
            Flavor::Fortran => "f",
        }
    }
}

/// Pointer width selecting vendor 32-/64-bit subdirectory layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PointerWidth {
    #[value(name = "32")]
    #[default]
    ThirtyTwo,
    #[value(name = "64")]
    SixtyFour,
}

impl PointerWidth {
    /// Subdirectory under a vendor `lib/` tree ("32" or "64").
    pub fn lib_subdir(&self) -> &'static str {
        match self {
            PointerWidth::ThirtyTwo => "32",
            PointerWidth::SixtyFour => "64",
        }
    }

    /// Vendor platform directory ("ia32" or "ia64").
    pub fn platform_dir(&self) -> &'static str {
        match self {
            PointerWidth::ThirtyTwo => "ia32",
            PointerWidth::SixtyFour => "ia64",
        }
    }
}

/// Everything a detection run needs to know, resolved and validated
/// upstream of the pipeline.
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Install root searched for conventional and vendor library names.
    pub install_dir: Option<PathBuf>,

    /// Pinned combined BLAS+LAPACK spec.
    pub combined_lib: Option<Vec<LibraryRef>>,

    /// Pinned BLAS spec; requires `lapack_lib`.
    pub blas_lib: Option<Vec<LibraryRef>>,

    /// Pinned LAPACK spec; requires `blas_lib`.
    pub lapack_lib: Option<Vec<LibraryRef>>,

    /// Fallback provisioning mode.
    pub download: DownloadMode,

    /// Which reference flavor to provision.
    pub flavor: Flavor,

    /// Collect every functional candidate instead of stopping at the
    /// first. The first found stays canonical.
    pub probe_all: bool,

    /// Vendor subdirectory selection.
    pub pointer_width: PointerWidth,

    /// Where downloaded packages live.
    pub packages_dir: PathBuf,

    /// Architecture tag scoping the provision cache.
    pub arch: String,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            install_dir: None,
            combined_lib: None,
            blas_lib: None,
            lapack_lib: None,
            download: DownloadMode::Off,
            flavor: Flavor::Fortran,
            probe_all: false,
            pointer_width: PointerWidth::ThirtyTwo,
            packages_dir: PathBuf::from("packages"),
            arch: default_arch(),
        }
    }
}

/// Architecture tag when none is configured: `<os>-<cpu>`.
pub fn default_arch() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Parse a user-supplied library spec: whitespace- or comma-separated
/// tokens, each classified as a path or bare name.
pub fn parse_library_spec(value: &str) -> Vec<LibraryRef> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(LibraryRef::parse)
        .collect()
}
