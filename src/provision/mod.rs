//! Fallback provisioning of the reference BLAS/LAPACK.
//!
//! When no system library qualifies (or the user demands a source
//! build), the reference implementation is downloaded, extracted, and
//! built. The whole pipeline is idempotent: the fetch is skipped when
//! the package directory already exists, and the build is skipped when
//! the derived recipe's checksum matches the one cached in the
//! architecture directory from a previous run.
//!
//! The translated-C flavor is recorded as available without compiling:
//! its compilation belongs to the outer build phase, and the deferred
//! state is carried explicitly on [`ProvisionedPair::deferred`].

pub mod download;
pub mod recipe;

use crate::config::{DetectOptions, Flavor};
use crate::error::{AcquisitionStage, BlaslinkError, Result};
use crate::shell::{CommandExecutor, CommandOptions, CommandResult};
use crate::toolchain::{resolve_build_fc, Toolchain};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use recipe::{derive_recipe, file_checksum, recipe_checksum, RecipeOverrides};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the derived recipe, both in the source tree and in the
/// per-arch cache.
const RECIPE_FILE: &str = "build.mk";

/// Metadata sidecar recorded next to the built archives.
const METADATA_FILE: &str = "provision.json";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);
const BUILD_TIMEOUT: Duration = Duration::from_secs(800);
const MOVE_TIMEOUT: Duration = Duration::from_secs(30);

/// A provisioned BLAS/LAPACK pair ready for probing or reporting.
#[derive(Debug, Clone)]
pub struct ProvisionedPair {
    pub label: String,
    pub blas: PathBuf,
    pub lapack: PathBuf,
    /// Uses the suffixed translated calling convention.
    pub translated: bool,
    /// Archives are not built yet; the outer build phase compiles them.
    pub deferred: bool,
}

/// Sidecar describing what a cached arch directory contains.
#[derive(Debug, Serialize, Deserialize)]
struct ProvisionMetadata {
    checksum: String,
    flavor: String,
    built_at: DateTime<Utc>,
}

/// Downloads, extracts, and builds the reference implementation.
pub struct FallbackProvisioner<'a> {
    packages_dir: PathBuf,
    arch: String,
    toolchain: &'a Toolchain,
    executor: &'a dyn CommandExecutor,
    base_url: String,
}

impl<'a> FallbackProvisioner<'a> {
    pub fn new(
        options: &DetectOptions,
        toolchain: &'a Toolchain,
        executor: &'a dyn CommandExecutor,
    ) -> Self {
        Self {
            packages_dir: options.packages_dir.clone(),
            arch: options.arch.clone(),
            toolchain,
            executor,
            base_url: download::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the archive host (tests point this at a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Ensure the requested flavor is present under
    /// `<packages-dir>/<flavor>blaslapack/<arch>/`.
    pub fn provision(&self, flavor: Flavor) -> Result<ProvisionedPair> {
        let prefix = flavor.prefix();
        let package_dir = self.packages_dir.join(format!("{prefix}blaslapack"));
        let arch_dir = package_dir.join(&self.arch);

        std::fs::create_dir_all(&self.packages_dir)?;
        if !package_dir.is_dir() {
            self.acquire(prefix)?;
        } else {
            tracing::debug!("{}blaslapack already present, skipping download", prefix);
        }
        std::fs::create_dir_all(&arch_dir)?;

        match flavor {
            Flavor::Translated => Ok(ProvisionedPair {
                label: "Downloaded translated BLAS/LAPACK".to_string(),
                blas: arch_dir.join(format!("lib{prefix}blas.a")),
                lapack: arch_dir.join(format!("lib{prefix}lapack.a")),
                translated: true,
                deferred: true,
            }),
            Flavor::Fortran => self.build_native(prefix, &package_dir, &arch_dir),
        }
    }

    /// Download and unpack the source archive.
    fn acquire(&self, prefix: &str) -> Result<()> {
        let archive = format!("{prefix}blaslapack.tar.gz");
        let url = format!("{}/{archive}", self.base_url);
        let tarball = self.packages_dir.join(&archive);

        let spinner = spinner(format!("downloading {archive}"));
        let fetched = download::fetch_archive(&url, &tarball, DOWNLOAD_TIMEOUT);
        spinner.finish_and_clear();
        fetched.map_err(|e| stage_error(AcquisitionStage::Download, e.to_string()))?;

        self.run_stage(
            AcquisitionStage::Extract,
            &format!("gunzip -f {archive}"),
            &self.packages_dir,
            EXTRACT_TIMEOUT,
        )?;
        let tar = format!("{prefix}blaslapack.tar");
        self.run_stage(
            AcquisitionStage::Extract,
            &format!("tar -xf {tar}"),
            &self.packages_dir,
            EXTRACT_TIMEOUT,
        )?;
        let _ = std::fs::remove_file(self.packages_dir.join(tar));
        Ok(())
    }

    /// Derive the recipe, and build unless the cached checksum says
    /// the previous build is still valid.
    fn build_native(
        &self,
        prefix: &str,
        package_dir: &Path,
        arch_dir: &Path,
    ) -> Result<ProvisionedPair> {
        let pair = ProvisionedPair {
            label: "Downloaded BLAS/LAPACK library".to_string(),
            blas: arch_dir.join(format!("lib{prefix}blas.a")),
            lapack: arch_dir.join(format!("lib{prefix}lapack.a")),
            translated: false,
            deferred: false,
        };

        let template =
            std::fs::read_to_string(package_dir.join("makefile")).map_err(|e| {
                stage_error(
                    AcquisitionStage::Build,
                    format!("cannot read recipe template: {e}"),
                )
            })?;

        let fc = self
            .toolchain
            .fc
            .as_deref()
            .ok_or_else(|| BlaslinkError::Unsatisfiable {
                message: "building the Fortran flavor requires a Fortran compiler".to_string(),
            })?;
        let build_fc = resolve_build_fc(fc, self.executor);
        let overrides = RecipeOverrides::from_toolchain(self.toolchain, build_fc);
        let derived = derive_recipe(&template, &overrides);
        let checksum = recipe_checksum(&derived);

        let cached = arch_dir.join(RECIPE_FILE);
        if cached.is_file() && file_checksum(&cached).ok().as_deref() == Some(&checksum) {
            tracing::debug!("recipe unchanged, skipping reference build");
            return Ok(pair);
        }

        std::fs::write(package_dir.join(RECIPE_FILE), &derived)?;

        let spinner = spinner("building reference BLAS/LAPACK (this may take several minutes)");
        let built = self.run_stage(
            AcquisitionStage::Build,
            &format!("make -f {RECIPE_FILE}"),
            package_dir,
            BUILD_TIMEOUT,
        );
        spinner.finish_and_clear();
        built?;

        self.run_stage(
            AcquisitionStage::Move,
            &format!(
                "mv -f lib{prefix}blas.a lib{prefix}lapack.a {}/",
                self.arch
            ),
            package_dir,
            MOVE_TIMEOUT,
        )?;

        // The cached recipe only serves future checksum comparisons;
        // failing to copy it costs one rebuild, not the run.
        if let Err(e) = std::fs::copy(package_dir.join(RECIPE_FILE), &cached) {
            tracing::warn!("could not cache recipe in {}: {}", arch_dir.display(), e);
        }
        self.write_metadata(arch_dir, &checksum, prefix);

        Ok(pair)
    }

    fn run_stage(
        &self,
        stage: AcquisitionStage,
        command: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandResult> {
        let options = CommandOptions::in_dir(cwd, timeout);
        let result = self
            .executor
            .execute(command, &options)
            .map_err(|e| stage_error(stage, e.to_string()))?;
        if !result.success {
            return Err(stage_error(
                stage,
                format!(
                    "`{command}` exited with {:?}: {}",
                    result.exit_code,
                    result.stderr.trim()
                ),
            ));
        }
        Ok(result)
    }

    fn write_metadata(&self, arch_dir: &Path, checksum: &str, flavor: &str) {
        let metadata = ProvisionMetadata {
            checksum: checksum.to_string(),
            flavor: flavor.to_string(),
            built_at: Utc::now(),
        };
        let path = arch_dir.join(METADATA_FILE);
        match serde_json::to_string_pretty(&metadata) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!("could not write {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("could not serialize provision metadata: {}", e),
        }
    }
}

fn stage_error(stage: AcquisitionStage, message: String) -> BlaslinkError {
    BlaslinkError::Acquisition { stage, message }
}

fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    const TEMPLATE: &str = "FC = f77\nFOPTFLAGS = -O\ninclude conf/base\nall:\n";

    /// Executor that records commands and reports success.
    struct RecordingExecutor {
        commands: RefCell<Vec<String>>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                commands: RefCell::new(Vec::new()),
            }
        }

        fn ran_matching(&self, needle: &str) -> usize {
            self.commands
                .borrow()
                .iter()
                .filter(|c| c.contains(needle))
                .count()
        }
    }

    impl CommandExecutor for RecordingExecutor {
        fn execute(&self, command: &str, _options: &CommandOptions) -> Result<CommandResult> {
            self.commands.borrow_mut().push(command.to_string());
            Ok(CommandResult::success(
                String::new(),
                String::new(),
                Duration::from_millis(1),
            ))
        }
    }

    /// Executor that fails any command containing the given needle.
    struct FailingExecutor {
        fail_on: &'static str,
    }

    impl CommandExecutor for FailingExecutor {
        fn execute(&self, command: &str, _options: &CommandOptions) -> Result<CommandResult> {
            if command.contains(self.fail_on) {
                Ok(CommandResult::failure(
                    Some(2),
                    String::new(),
                    "boom".to_string(),
                    Duration::from_millis(1),
                ))
            } else {
                Ok(CommandResult::success(
                    String::new(),
                    String::new(),
                    Duration::from_millis(1),
                ))
            }
        }
    }

    fn fortran_toolchain() -> Toolchain {
        let mut tc = Toolchain::from_env_with(None, |_| Err(std::env::VarError::NotPresent));
        tc.fc = Some("gfortran".to_string());
        tc
    }

    fn options_in(temp: &TempDir) -> DetectOptions {
        DetectOptions {
            packages_dir: temp.path().to_path_buf(),
            arch: "testarch".to_string(),
            ..Default::default()
        }
    }

    /// Pre-create the package dir so provisioning skips the download.
    fn seed_package(temp: &TempDir, prefix: &str) {
        let dir = temp.path().join(format!("{prefix}blaslapack"));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("makefile"), TEMPLATE).unwrap();
    }

    #[test]
    fn translated_flavor_is_deferred_without_building() {
        let temp = TempDir::new().unwrap();
        seed_package(&temp, "f2c");
        let toolchain = fortran_toolchain();
        let executor = RecordingExecutor::new();
        let options = options_in(&temp);
        let provisioner = FallbackProvisioner::new(&options, &toolchain, &executor);

        let pair = provisioner.provision(Flavor::Translated).unwrap();

        assert!(pair.deferred);
        assert!(pair.translated);
        assert!(pair.blas.ends_with("testarch/libf2cblas.a"));
        assert_eq!(executor.ran_matching("make"), 0);
    }

    #[test]
    fn native_build_runs_make_and_moves_archives() {
        let temp = TempDir::new().unwrap();
        seed_package(&temp, "f");
        let toolchain = fortran_toolchain();
        let executor = RecordingExecutor::new();
        let options = options_in(&temp);
        let provisioner = FallbackProvisioner::new(&options, &toolchain, &executor);

        let pair = provisioner.provision(Flavor::Fortran).unwrap();

        assert!(!pair.deferred);
        assert!(!pair.translated);
        assert_eq!(executor.ran_matching("make -f build.mk"), 1);
        assert_eq!(executor.ran_matching("mv -f libfblas.a libflapack.a"), 1);
        // Derived recipe cached for the next run.
        let cached = temp.path().join("fblaslapack/testarch/build.mk");
        assert!(cached.is_file());
        let content = std::fs::read_to_string(cached).unwrap();
        assert!(content.contains("FC = gfortran"));
        assert!(!content.contains("include"));
    }

    #[test]
    fn unchanged_recipe_builds_exactly_once() {
        let temp = TempDir::new().unwrap();
        seed_package(&temp, "f");
        let toolchain = fortran_toolchain();
        let executor = RecordingExecutor::new();
        let options = options_in(&temp);
        let provisioner = FallbackProvisioner::new(&options, &toolchain, &executor);

        provisioner.provision(Flavor::Fortran).unwrap();
        provisioner.provision(Flavor::Fortran).unwrap();

        assert_eq!(executor.ran_matching("make -f build.mk"), 1);
    }

    #[test]
    fn changed_toolchain_invalidates_cache() {
        let temp = TempDir::new().unwrap();
        seed_package(&temp, "f");
        let executor = RecordingExecutor::new();
        let options = options_in(&temp);

        let toolchain = fortran_toolchain();
        FallbackProvisioner::new(&options, &toolchain, &executor)
            .provision(Flavor::Fortran)
            .unwrap();

        let mut changed = fortran_toolchain();
        changed.fortran_flags = "-O3 -march=native".to_string();
        FallbackProvisioner::new(&options, &changed, &executor)
            .provision(Flavor::Fortran)
            .unwrap();

        assert_eq!(executor.ran_matching("make -f build.mk"), 2);
    }

    #[test]
    fn build_failure_names_build_stage() {
        let temp = TempDir::new().unwrap();
        seed_package(&temp, "f");
        let toolchain = fortran_toolchain();
        let executor = FailingExecutor { fail_on: "make" };
        let options = options_in(&temp);
        let provisioner = FallbackProvisioner::new(&options, &toolchain, &executor);

        let err = provisioner.provision(Flavor::Fortran).unwrap_err();
        match err {
            BlaslinkError::Acquisition { stage, message } => {
                assert_eq!(stage, AcquisitionStage::Build);
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn move_failure_names_move_stage() {
        let temp = TempDir::new().unwrap();
        seed_package(&temp, "f");
        let toolchain = fortran_toolchain();
        let executor = FailingExecutor { fail_on: "mv -f" };
        let options = options_in(&temp);
        let provisioner = FallbackProvisioner::new(&options, &toolchain, &executor);

        let err = provisioner.provision(Flavor::Fortran).unwrap_err();
        assert!(matches!(
            err,
            BlaslinkError::Acquisition {
                stage: AcquisitionStage::Move,
                ..
            }
        ));
    }

    #[test]
    fn metadata_sidecar_is_written() {
        let temp = TempDir::new().unwrap();
        seed_package(&temp, "f");
        let toolchain = fortran_toolchain();
        let executor = RecordingExecutor::new();
        let options = options_in(&temp);
        let provisioner = FallbackProvisioner::new(&options, &toolchain, &executor);

        provisioner.provision(Flavor::Fortran).unwrap();

        let metadata = temp.path().join("fblaslapack/testarch/provision.json");
        let json = std::fs::read_to_string(metadata).unwrap();
        assert!(json.contains("checksum"));
        assert!(json.contains("\"f\""));
    }
}
