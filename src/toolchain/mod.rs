//! Compiler toolchain description.
//!
//! The detection pipeline needs to know which compilers, archiver, and
//! runtime libraries the build environment provides. Everything is
//! resolved from environment variables up front (with an injectable
//! lookup for tests) and carried as plain data; the pipeline itself
//! never consults the environment.

use crate::candidates::spec::LibraryRef;
use crate::shell::{CommandExecutor, CommandOptions};
use regex::Regex;
use std::path::Path;
use std::time::Duration;

/// Fortran external-name mangling convention of the build's compilers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mangling {
    /// Lowercase with a trailing underscore (g77/gfortran and most
    /// Unix compilers).
    #[default]
    Underscore,
    /// Lowercase, no decoration.
    Plain,
    /// Uppercase, no decoration.
    Caps,
}

impl Mangling {
    /// Transform a routine base name into the symbol the linker sees.
    pub fn apply(&self, symbol: &str) -> String {
        match self {
            Mangling::Underscore => format!("{symbol}_"),
            Mangling::Plain => symbol.to_string(),
            Mangling::Caps => symbol.to_uppercase(),
        }
    }
}

/// The compilers and archive tools available to this configure run.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// C compiler driver used for link probes.
    pub cc: String,

    /// Fortran compiler, when one is configured. Its presence decides
    /// whether native mangling is attempted first and whether Fortran
    /// runtime libraries join the final link line.
    pub fc: Option<String>,

    /// Fortran optimization flags for the reference build.
    pub fortran_flags: String,

    /// Archiver and its flags.
    pub ar: String,
    pub ar_flags: String,

    /// Ranlib invocation.
    pub ranlib: String,

    /// Remove command for the reference build's clean steps.
    pub rm: String,

    /// Static archive suffix without the dot.
    pub lib_suffix: String,

    /// Already-resolved Fortran runtime libraries (e.g. libgfortran),
    /// appended to probes and to the final link line when `fc` is set.
    pub fortran_runtime: Vec<LibraryRef>,

    /// External-name convention of `fc`.
    pub mangling: Mangling,
}

impl Toolchain {
    /// Resolve the toolchain from the process environment.
    ///
    /// `fc_override` (from `--fc`) wins over `$FC`.
    pub fn from_env(fc_override: Option<String>) -> Self {
        Self::from_env_with(fc_override, |key| std::env::var(key))
    }

    /// Resolve with a custom env lookup, so tests need not mutate the
    /// process environment.
    pub fn from_env_with<F>(fc_override: Option<String>, env_fn: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let fc = fc_override
            .or_else(|| env_fn("FC").ok())
            .filter(|v| !v.is_empty());
        let fortran_runtime = env_fn("FLIBS")
            .map(|v| {
                v.split_whitespace()
                    .map(LibraryRef::parse)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Self {
            cc: env_fn("CC").unwrap_or_else(|_| "cc".to_string()),
            fc,
            fortran_flags: env_fn("FOPTFLAGS").unwrap_or_else(|_| "-O".to_string()),
            ar: env_fn("AR").unwrap_or_else(|_| "ar".to_string()),
            ar_flags: env_fn("AR_FLAGS").unwrap_or_else(|_| "cr".to_string()),
            ranlib: env_fn("RANLIB").unwrap_or_else(|_| "ranlib".to_string()),
            rm: env_fn("RM").unwrap_or_else(|_| "rm -f".to_string()),
            lib_suffix: "a".to_string(),
            fortran_runtime,
            mangling: Mangling::Underscore,
        }
    }

    /// Whether a Fortran compiler is configured.
    pub fn has_fortran(&self) -> bool {
        self.fc.is_some()
    }
}

/// Pick the Fortran compiler the reference build recipe should use.
///
/// IBM's `f90` driver miscompiles the reference sources; when the
/// configured compiler is an f90 whose `-v` banner identifies IBM,
/// substitute the sibling `xlf` driver.
pub fn resolve_build_fc(fc: &str, executor: &dyn CommandExecutor) -> String {
    if !fc.contains("f90") {
        return fc.to_string();
    }
    let options = CommandOptions {
        timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let banner = match executor.execute(&format!("{fc} -v"), &options) {
        Ok(result) => format!("{}{}", result.stdout, result.stderr),
        Err(_) => return fc.to_string(),
    };
    let ibm = Regex::new(r"(?i)\bIBM\b").expect("static regex");
    if ibm.is_match(&banner) {
        let xlf = Path::new(fc).with_file_name("xlf");
        tracing::debug!("IBM f90 detected; using {} for the reference build", xlf.display());
        return xlf.display().to_string();
    }
    fc.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::CommandResult;
    use std::time::Duration as StdDuration;

    fn no_env(_: &str) -> Result<String, std::env::VarError> {
        Err(std::env::VarError::NotPresent)
    }

    struct FixedExecutor {
        stdout: String,
    }

    impl CommandExecutor for FixedExecutor {
        fn execute(
            &self,
            _command: &str,
            _options: &CommandOptions,
        ) -> crate::error::Result<CommandResult> {
            Ok(CommandResult::success(
                self.stdout.clone(),
                String::new(),
                StdDuration::from_millis(1),
            ))
        }
    }

    #[test]
    fn mangling_underscore_appends_suffix() {
        assert_eq!(Mangling::Underscore.apply("ddot"), "ddot_");
    }

    #[test]
    fn mangling_plain_keeps_symbol() {
        assert_eq!(Mangling::Plain.apply("ddot"), "ddot");
    }

    #[test]
    fn mangling_caps_uppercases() {
        assert_eq!(Mangling::Caps.apply("ddot"), "DDOT");
    }

    #[test]
    fn from_env_uses_defaults_without_vars() {
        let tc = Toolchain::from_env_with(None, no_env);
        assert_eq!(tc.cc, "cc");
        assert!(tc.fc.is_none());
        assert_eq!(tc.ar, "ar");
        assert_eq!(tc.ar_flags, "cr");
        assert_eq!(tc.lib_suffix, "a");
        assert!(tc.fortran_runtime.is_empty());
        assert!(!tc.has_fortran());
    }

    #[test]
    fn fc_override_wins_over_env() {
        let tc = Toolchain::from_env_with(Some("gfortran".into()), |key| {
            if key == "FC" {
                Ok("f77".to_string())
            } else {
                Err(std::env::VarError::NotPresent)
            }
        });
        assert_eq!(tc.fc.as_deref(), Some("gfortran"));
    }

    #[test]
    fn empty_fc_env_counts_as_unset() {
        let tc = Toolchain::from_env_with(None, |key| {
            if key == "FC" {
                Ok(String::new())
            } else {
                Err(std::env::VarError::NotPresent)
            }
        });
        assert!(tc.fc.is_none());
    }

    #[test]
    fn flibs_parsed_into_runtime_libs() {
        let tc = Toolchain::from_env_with(None, |key| {
            if key == "FLIBS" {
                Ok("-lgfortran -lm".to_string())
            } else {
                Err(std::env::VarError::NotPresent)
            }
        });
        assert_eq!(tc.fortran_runtime.len(), 2);
    }

    #[test]
    fn resolve_build_fc_keeps_non_f90() {
        let executor = FixedExecutor {
            stdout: String::new(),
        };
        assert_eq!(resolve_build_fc("gfortran", &executor), "gfortran");
    }

    #[test]
    fn resolve_build_fc_switches_ibm_f90_to_xlf() {
        let executor = FixedExecutor {
            stdout: "IBM XL Fortran driver".to_string(),
        };
        assert_eq!(resolve_build_fc("/opt/ibm/f90", &executor), "/opt/ibm/xlf");
    }

    #[test]
    fn resolve_build_fc_keeps_non_ibm_f90() {
        let executor = FixedExecutor {
            stdout: "some other vendor f90".to_string(),
        };
        assert_eq!(resolve_build_fc("f90", &executor), "f90");
    }
}
