//! Capability reporting.
//!
//! The reporter turns the canonical functional pair into the outputs
//! downstream consumers read: the ordered link-argument list, the
//! translated/deferred markers, and a one-line summary naming the
//! chosen candidate.

use crate::candidates::spec::LibraryRef;
use crate::error::BlaslinkError;
use crate::linker::format::link_argument;
use crate::toolchain::Toolchain;
use serde::Serialize;
use std::path::PathBuf;

/// A candidate pair that validated, in search order.
#[derive(Debug, Clone)]
pub struct FunctionalPair {
    pub label: String,
    pub blas: Vec<LibraryRef>,
    pub lapack: Vec<LibraryRef>,
    /// BLAS must be emitted as its own link arguments.
    pub separate_blas: bool,
    /// The pair answers the suffixed translated calling convention.
    pub translated: bool,
    /// Archives exist on paper only; the outer build phase compiles them.
    pub deferred: bool,
}

/// Final detection outcome, serializable for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityReport {
    /// Label of the winning candidate.
    pub label: String,
    /// Link arguments: LAPACK, then BLAS when separate, then the
    /// Fortran runtime when a Fortran compiler is configured.
    pub link_args: Vec<String>,
    pub translated: bool,
    pub deferred: bool,
    /// Optional LAPACK routines the chosen library lacks.
    pub missing_routines: Vec<String>,
    /// One-line human-readable summary.
    pub summary: String,
}

/// Assemble the report from the canonical functional pair.
pub fn build_report(
    pair: &FunctionalPair,
    toolchain: &Toolchain,
    missing_routines: Vec<String>,
) -> CapabilityReport {
    let mut link_args: Vec<String> = pair.lapack.iter().map(link_argument).collect();
    if pair.separate_blas {
        link_args.extend(pair.blas.iter().map(link_argument));
    }
    if toolchain.has_fortran() {
        link_args.extend(toolchain.fortran_runtime.iter().map(link_argument));
    }

    CapabilityReport {
        label: pair.label.clone(),
        link_args,
        translated: pair.translated,
        deferred: pair.deferred,
        missing_routines,
        summary: summarize(pair),
    }
}

/// One-line summary naming the chosen candidate.
///
/// Libraries sharing an already-printed directory are shortened to
/// their `-l` form so the line stays readable for long vendor specs.
pub fn summarize(pair: &FunctionalPair) -> String {
    let mut seen_dirs: Vec<PathBuf> = Vec::new();
    let mut parts: Vec<String> = Vec::new();

    let blas: &[LibraryRef] = if pair.separate_blas { &pair.blas } else { &[] };
    for lib in pair.lapack.iter().chain(blas.iter()) {
        let arg = match lib {
            LibraryRef::Archive(path) => {
                let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
                match (dir, path.file_name()) {
                    (Some(dir), Some(file)) if seen_dirs.iter().any(|d| d == dir) => {
                        link_argument(&LibraryRef::Archive(PathBuf::from(file)))
                    }
                    (Some(dir), _) => {
                        seen_dirs.push(dir.to_path_buf());
                        link_argument(lib)
                    }
                    _ => link_argument(lib),
                }
            }
            name => link_argument(name),
        };
        parts.push(arg);
    }

    format!("BLAS/LAPACK ({}): {}", pair.label, parts.join(" "))
}

/// Terminal error when the exhaustive search produced nothing.
///
/// Names exactly which of the two interfaces is missing; a BLAS gap is
/// reported first since LAPACK cannot function without it.
pub fn not_found_error(blas_was_found: bool) -> BlaslinkError {
    if blas_was_found {
        BlaslinkError::LapackNotFound
    } else {
        BlaslinkError::BlasNotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c_toolchain() -> Toolchain {
        Toolchain::from_env_with(None, |_| Err(std::env::VarError::NotPresent))
    }

    fn pair() -> FunctionalPair {
        FunctionalPair {
            label: "Conventional /usr/local/lib install".to_string(),
            blas: vec![LibraryRef::archive("/usr/local/lib/libblas.a")],
            lapack: vec![LibraryRef::archive("/usr/local/lib/liblapack.a")],
            separate_blas: true,
            translated: false,
            deferred: false,
        }
    }

    #[test]
    fn link_args_order_lapack_then_blas() {
        let report = build_report(&pair(), &c_toolchain(), vec![]);
        assert_eq!(
            report.link_args,
            vec![
                "/usr/local/lib/liblapack.a".to_string(),
                "/usr/local/lib/libblas.a".to_string(),
            ]
        );
    }

    #[test]
    fn combined_spec_is_emitted_once() {
        let mut p = pair();
        p.separate_blas = false;
        p.blas = p.lapack.clone();
        let report = build_report(&p, &c_toolchain(), vec![]);
        assert_eq!(report.link_args.len(), 1);
    }

    #[test]
    fn fortran_runtime_appended_when_fc_configured() {
        let mut tc = c_toolchain();
        tc.fc = Some("gfortran".to_string());
        tc.fortran_runtime = vec![LibraryRef::name("gfortran"), LibraryRef::name("m")];
        let report = build_report(&pair(), &tc, vec![]);
        assert_eq!(
            report.link_args.last().map(String::as_str),
            Some("-lm")
        );
        assert!(report.link_args.contains(&"-lgfortran".to_string()));
    }

    #[test]
    fn summary_names_candidate_label() {
        let report = build_report(&pair(), &c_toolchain(), vec![]);
        assert!(report.summary.contains("Conventional /usr/local/lib install"));
    }

    #[test]
    fn summary_shortens_repeated_directories() {
        let summary = summarize(&pair());
        // LAPACK prints its full path; BLAS shares the directory and
        // shortens to -lblas.
        assert!(summary.contains("/usr/local/lib/liblapack.a"));
        assert!(summary.contains("-lblas"));
        assert!(!summary.contains("/usr/local/lib/libblas.a"));
    }

    #[test]
    fn missing_routines_carried_through() {
        let report = build_report(&pair(), &c_toolchain(), vec!["getrs".into()]);
        assert_eq!(report.missing_routines, vec!["getrs".to_string()]);
    }

    #[test]
    fn not_found_blames_blas_first() {
        assert!(matches!(not_found_error(false), BlaslinkError::BlasNotFound));
        assert!(matches!(not_found_error(true), BlaslinkError::LapackNotFound));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = build_report(&pair(), &c_toolchain(), vec![]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("link_args"));
        assert!(json.contains("liblapack.a"));
    }
}
