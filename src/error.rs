//! Error types for blaslink operations.
//!
//! This module defines [`BlaslinkError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `BlaslinkError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `BlaslinkError::Other`) for unexpected errors
//! - Every fatal error names the concrete remediation option(s) available
//!   to the caller

use thiserror::Error;

/// The provisioning stage that failed.
///
/// Acquisition failures are never collapsed into a generic error; the
/// stage is always carried so the user knows whether the network, the
/// archive, the compiler, or the filesystem is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionStage {
    Download,
    Extract,
    Build,
    Move,
}

impl std::fmt::Display for AcquisitionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AcquisitionStage::Download => "download",
            AcquisitionStage::Extract => "extract",
            AcquisitionStage::Build => "build",
            AcquisitionStage::Move => "move",
        };
        f.write_str(s)
    }
}

/// Core error type for blaslink operations.
#[derive(Debug, Error)]
pub enum BlaslinkError {
    /// Mutually exclusive options were supplied together. Detected
    /// before any probing runs.
    #[error("Conflicting options: {message}")]
    OptionConflict { message: String },

    /// The requested download mode is incompatible with the configured
    /// compilers.
    #[error("Cannot satisfy request: {message}")]
    Unsatisfiable { message: String },

    /// A user-pinned location failed to validate. Pinned locations are
    /// never silently skipped.
    #[error(
        "No functional BLAS/LAPACK found at the location pinned by {origin}.\n\
         Check the path, or drop the option to search standard locations instead"
    )]
    CommittedCandidateFailed { origin: String },

    /// A download/extract/build/move stage of fallback provisioning failed.
    #[error("BLAS/LAPACK provisioning failed during {stage}: {message}")]
    Acquisition {
        stage: AcquisitionStage,
        message: String,
    },

    /// Exhaustive search found no functional BLAS.
    #[error(
        "Could not find a functional BLAS.\n\
         Use --blas-lib=<lib> to name the library containing BLAS,\n\
         or --download-blaslapack=always to build the reference implementation"
    )]
    BlasNotFound,

    /// Exhaustive search found no functional LAPACK.
    #[error(
        "Could not find a functional LAPACK.\n\
         Use --lapack-lib=<lib> to name the library containing LAPACK,\n\
         or --download-blaslapack=always to build the reference implementation"
    )]
    LapackNotFound,

    /// Shell command failed to start or was killed.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// Shell command exceeded its wall-clock budget.
    #[error("Command timed out after {limit_secs}s: {command}")]
    CommandTimedOut { command: String, limit_secs: u64 },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for blaslink operations.
pub type Result<T> = std::result::Result<T, BlaslinkError>;
