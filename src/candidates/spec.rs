//! Library references, candidates, and candidate batches.

use crate::config::Flavor;
use std::path::{Path, PathBuf};

/// A single linkable library: either a filesystem path to an
/// archive/object, or a bare linker name resolved on the search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryRef {
    /// Full path to an archive, shared object, or framework binary.
    Archive(PathBuf),
    /// Bare name passed to the linker as `-l<name>` (or verbatim when
    /// it already looks like a linker flag).
    Name(String),
}

impl LibraryRef {
    pub fn archive(path: impl Into<PathBuf>) -> Self {
        LibraryRef::Archive(path.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        LibraryRef::Name(name.into())
    }

    /// Classify a user-supplied token as a path or a bare name.
    ///
    /// Anything containing a path separator, an archive suffix, or a
    /// framework segment is a path; leading-dash tokens are kept as
    /// names so explicit `-l`/`-L` flags pass through untouched.
    pub fn parse(token: &str) -> Self {
        if token.starts_with('-') {
            return LibraryRef::Name(token.to_string());
        }
        let pathish = token.contains('/')
            || token.contains(".framework")
            || Path::new(token)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e, "a" | "so" | "dylib" | "lib" | "o"));
        if pathish {
            LibraryRef::Archive(PathBuf::from(token))
        } else {
            LibraryRef::Name(token.to_string())
        }
    }
}

impl std::fmt::Display for LibraryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryRef::Archive(p) => write!(f, "{}", p.display()),
            LibraryRef::Name(n) => f.write_str(n),
        }
    }
}

/// One hypothesis about where a working BLAS/LAPACK pair lives.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Human-readable location label, e.g. "Compiler default locations".
    pub label: String,
    /// BLAS spec; `None` means the LAPACK spec is a combined library
    /// carrying both interfaces.
    pub blas: Option<Vec<LibraryRef>>,
    /// LAPACK spec. Never empty.
    pub lapack: Vec<LibraryRef>,
}

impl Candidate {
    /// Combined-library candidate: one spec provides both interfaces.
    pub fn combined(label: impl Into<String>, lapack: Vec<LibraryRef>) -> Self {
        Self {
            label: label.into(),
            blas: None,
            lapack,
        }
    }

    /// Separate BLAS and LAPACK specs.
    pub fn separate(
        label: impl Into<String>,
        blas: Vec<LibraryRef>,
        lapack: Vec<LibraryRef>,
    ) -> Self {
        Self {
            label: label.into(),
            blas: Some(blas),
            lapack,
        }
    }

    /// Whether BLAS must be emitted as its own link arguments.
    ///
    /// False when the specs are one and the same combined library, so
    /// the reporter emits it once.
    pub fn separate_blas(&self) -> bool {
        match &self.blas {
            None => false,
            Some(blas) => *blas != self.lapack,
        }
    }
}

/// An ordered group of candidates sharing one failure policy.
#[derive(Debug, Clone)]
pub struct CandidateBatch {
    /// What produced this batch; used in errors when a committed batch
    /// fails ("--blaslapack-dir /opt/math").
    pub origin: String,
    /// True: no candidate validating is fatal. False: move on.
    pub committed: bool,
    pub candidates: Vec<Candidate>,
}

impl CandidateBatch {
    pub fn committed(origin: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            origin: origin.into(),
            committed: true,
            candidates,
        }
    }

    pub fn exploratory(origin: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            origin: origin.into(),
            committed: false,
            candidates,
        }
    }
}

/// One step of the generated search plan.
///
/// Download plans are materialized through the provisioner only when
/// the search actually reaches them.
#[derive(Debug, Clone)]
pub enum CandidatePlan {
    Probe(CandidateBatch),
    Download { flavor: Flavor, committed: bool },
}
