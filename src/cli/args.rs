//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct; [`Cli::detect_options`]
//! resolves it into the plain-data options the pipeline consumes.

use crate::config::{
    default_arch, parse_library_spec, DetectOptions, DownloadMode, Flavor, PointerWidth,
};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// blaslink - BLAS/LAPACK detection and provisioning for native builds.
#[derive(Debug, Parser)]
#[command(name = "blaslink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory containing BLAS and LAPACK libraries (pinned)
    #[arg(long, value_name = "DIR", global = true)]
    pub blaslapack_dir: Option<PathBuf>,

    /// Single library containing both BLAS and LAPACK (pinned)
    #[arg(long, value_name = "LIB", global = true)]
    pub blaslapack_lib: Option<String>,

    /// Library(s) containing BLAS; requires --lapack-lib
    #[arg(long, value_name = "LIB", global = true)]
    pub blas_lib: Option<String>,

    /// Library(s) containing LAPACK; requires --blas-lib
    #[arg(long, value_name = "LIB", global = true)]
    pub lapack_lib: Option<String>,

    /// Download and build the reference implementation
    #[arg(long, value_enum, default_value_t = DownloadMode::Off, global = true)]
    pub download_blaslapack: DownloadMode,

    /// Which reference flavor to download
    #[arg(long, value_enum, default_value_t = Flavor::Fortran, global = true)]
    pub flavor: Flavor,

    /// Keep probing after the first functional candidate
    #[arg(long, global = true)]
    pub probe_all: bool,

    /// Pointer width selecting vendor 32-/64-bit layouts
    #[arg(long, value_enum, default_value_t = PointerWidth::ThirtyTwo, global = true)]
    pub pointer_width: PointerWidth,

    /// Where downloaded packages live
    #[arg(long, value_name = "DIR", env = "BLASLINK_PACKAGES", default_value = "packages", global = true)]
    pub packages_dir: PathBuf,

    /// Architecture tag scoping the provision cache
    #[arg(long, value_name = "ARCH", env = "BLASLINK_ARCH", global = true)]
    pub arch: Option<String>,

    /// Fortran compiler
    #[arg(long, value_name = "PATH", env = "FC", global = true)]
    pub fc: Option<String>,

    /// Machine-readable report on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands. Running with none performs detection.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl Cli {
    /// Resolve the CLI surface into pipeline options.
    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            install_dir: self.blaslapack_dir.clone(),
            combined_lib: self.blaslapack_lib.as_deref().map(parse_library_spec),
            blas_lib: self.blas_lib.as_deref().map(parse_library_spec),
            lapack_lib: self.lapack_lib.as_deref().map(parse_library_spec),
            download: self.download_blaslapack,
            flavor: self.flavor,
            probe_all: self.probe_all,
            pointer_width: self.pointer_width,
            packages_dir: self.packages_dir.clone(),
            arch: self.arch.clone().unwrap_or_else(default_arch),
        }
    }
}
