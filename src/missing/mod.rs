//! Optional-routine gap scanning.
//!
//! LAPACK builds in the wild ship with different subsets of the
//! decomposition and solver routines. Once a functional pair is
//! chosen, each optional routine is probed independently; absences
//! degrade capability flags but never abort the run.

use crate::candidates::spec::LibraryRef;
use crate::flags::FlagSink;
use crate::linker::SymbolChecker;
use crate::probe::{ProbeContext, TRANSLATION_SUFFIX};
use crate::toolchain::Toolchain;

/// Optional LAPACK routines, probed in this order.
pub const OPTIONAL_ROUTINES: [&str; 6] = ["gesvd", "geev", "getrf", "potrf", "getrs", "potrs"];

/// Probes the chosen LAPACK for optional routines and records the gap.
pub struct MissingRoutineScanner<'a> {
    checker: &'a dyn SymbolChecker,
    toolchain: &'a Toolchain,
}

impl<'a> MissingRoutineScanner<'a> {
    pub fn new(checker: &'a dyn SymbolChecker, toolchain: &'a Toolchain) -> Self {
        Self { checker, toolchain }
    }

    /// Probe every optional routine against the chosen LAPACK.
    ///
    /// Returns the missing base names and emits one
    /// `MISSING_LAPACK_<NAME>` flag per absence. `blas` is the
    /// separate BLAS spec when the pair is not combined; `translated`
    /// selects the suffixed calling convention.
    pub fn scan(
        &self,
        lapack: &[LibraryRef],
        blas: Option<&[LibraryRef]>,
        translated: bool,
        sink: &mut dyn FlagSink,
    ) -> Vec<String> {
        let ctx = ProbeContext::for_lapack(self.toolchain, blas);
        let mangle = self.toolchain.has_fortran() && !translated;
        let mut missing = Vec::new();

        for base in OPTIONAL_ROUTINES {
            // Double-precision entry point for the base name.
            let routine = if translated {
                format!("d{base}{TRANSLATION_SUFFIX}")
            } else {
                format!("d{base}")
            };
            if !self
                .checker
                .check(lapack, &routine, ctx.extra_libs(), mangle)
            {
                tracing::debug!(routine = base, "optional LAPACK routine missing");
                sink.define(&format!("MISSING_LAPACK_{}", base.to_uppercase()), "1");
                missing.push(base.to_string());
            }
        }

        missing
    }

    /// Probe for the ESSL extended interface; emits `HAVE_ESSL` when
    /// the vendor entry point is present.
    pub fn detect_vendor_extensions(&self, lapack: &[LibraryRef], sink: &mut dyn FlagSink) {
        if self.checker.check(lapack, "iessl", &[], false) {
            sink.define("HAVE_ESSL", "1");
        }
    }
}
