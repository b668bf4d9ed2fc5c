//! Functional probing of candidate BLAS/LAPACK pairs.
//!
//! A candidate validates when its BLAS answers for the canonical dot
//! product and its LAPACK answers for at least one representative
//! solver. Probing tries the build's native Fortran mangling first and
//! falls back to the suffixed convention used by mechanical
//! Fortran-to-C translation; a pair that only answers suffixed is
//! marked *translated*.
//!
//! Every link attempt receives an explicit [`ProbeContext`] carrying
//! its extra runtime libraries. There is no shared link state to
//! restore, so probes cannot leak into one another.

use crate::candidates::spec::{Candidate, LibraryRef};
use crate::linker::SymbolChecker;
use crate::toolchain::Toolchain;

/// Canonical BLAS routine probed first.
const BLAS_ROUTINE: &str = "ddot";

/// Representative LAPACK routines; either one counts.
const LAPACK_ROUTINES: [&str; 2] = ["dgetrs", "dgeev"];

/// Suffix the translated calling convention appends to every routine.
pub const TRANSLATION_SUFFIX: char = '_';

/// Outcome of probing one candidate. Immutable, scoped to one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub blas_found: bool,
    pub lapack_found: bool,
    /// The successful attempts used the native Fortran mangling.
    pub mangled: bool,
    /// The successful attempts used the suffixed translated convention.
    pub translated: bool,
}

impl ProbeResult {
    pub fn functional(&self) -> bool {
        self.blas_found && self.lapack_found
    }
}

/// Extra libraries one link attempt may draw symbols from.
#[derive(Debug, Clone, Default)]
pub struct ProbeContext {
    extra: Vec<LibraryRef>,
}

impl ProbeContext {
    /// Context for probing a BLAS spec: Fortran runtime only.
    pub fn for_blas(toolchain: &Toolchain) -> Self {
        let extra = if toolchain.has_fortran() {
            toolchain.fortran_runtime.clone()
        } else {
            Vec::new()
        };
        Self { extra }
    }

    /// Context for probing a LAPACK spec: the already-validated BLAS
    /// (when it is a separate spec) plus the Fortran runtime.
    pub fn for_lapack(toolchain: &Toolchain, blas: Option<&[LibraryRef]>) -> Self {
        let mut extra = Vec::new();
        if let Some(blas) = blas {
            extra.extend_from_slice(blas);
        }
        if toolchain.has_fortran() {
            extra.extend_from_slice(&toolchain.fortran_runtime);
        }
        Self { extra }
    }

    pub fn extra_libs(&self) -> &[LibraryRef] {
        &self.extra
    }
}

/// Probes candidate pairs through a [`SymbolChecker`].
pub struct LibraryProbe<'a> {
    checker: &'a dyn SymbolChecker,
    toolchain: &'a Toolchain,
}

impl<'a> LibraryProbe<'a> {
    pub fn new(checker: &'a dyn SymbolChecker, toolchain: &'a Toolchain) -> Self {
        Self { checker, toolchain }
    }

    /// Probe a candidate, normalizing a combined spec to both roles.
    pub fn check_candidate(&self, candidate: &Candidate) -> ProbeResult {
        self.check_lib(&candidate.lapack, candidate.blas.as_deref())
    }

    /// Check a (LAPACK, BLAS) pair; `None` BLAS means the LAPACK spec
    /// is a combined library providing both interfaces.
    pub fn check_lib(&self, lapack: &[LibraryRef], blas: Option<&[LibraryRef]>) -> ProbeResult {
        let blas_spec: &[LibraryRef] = blas.unwrap_or(lapack);
        // Extra libs for the LAPACK probe include BLAS only when it is
        // genuinely a different spec.
        let separate = blas.is_some_and(|b| b != lapack);

        let blas_ctx = ProbeContext::for_blas(self.toolchain);
        let lapack_ctx =
            ProbeContext::for_lapack(self.toolchain, separate.then_some(blas_spec));

        let native_mangle = self.toolchain.has_fortran();

        // Native convention first.
        if self
            .checker
            .check(blas_spec, BLAS_ROUTINE, blas_ctx.extra_libs(), native_mangle)
        {
            let lapack_found =
                self.check_lapack(lapack, &lapack_ctx, native_mangle, &LAPACK_ROUTINES);
            return ProbeResult {
                blas_found: true,
                lapack_found,
                mangled: native_mangle,
                translated: false,
            };
        }

        // Suffixed fallback: the spec may be a translated build.
        let suffixed = format!("{BLAS_ROUTINE}{TRANSLATION_SUFFIX}");
        if self
            .checker
            .check(blas_spec, &suffixed, blas_ctx.extra_libs(), false)
        {
            let routines: Vec<String> = LAPACK_ROUTINES
                .iter()
                .map(|r| format!("{r}{TRANSLATION_SUFFIX}"))
                .collect();
            let routine_refs: Vec<&str> = routines.iter().map(String::as_str).collect();
            let lapack_found = self.check_lapack(lapack, &lapack_ctx, false, &routine_refs);
            return ProbeResult {
                blas_found: true,
                lapack_found,
                mangled: false,
                translated: lapack_found,
            };
        }

        ProbeResult {
            blas_found: false,
            lapack_found: false,
            mangled: false,
            translated: false,
        }
    }

    fn check_lapack(
        &self,
        lapack: &[LibraryRef],
        ctx: &ProbeContext,
        fortran_mangle: bool,
        routines: &[&str],
    ) -> bool {
        routines
            .iter()
            .any(|routine| self.checker.check(lapack, routine, ctx.extra_libs(), fortran_mangle))
    }
}
