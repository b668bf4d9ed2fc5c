//! The detection driver.
//!
//! Walks the generated search plan in strict order: candidates within
//! a batch are probed one at a time, a committed batch that exhausts
//! without a success is fatal, an exploratory one advances. Download
//! plans are materialized through the provisioner only when reached
//! and only while nothing has validated yet. The first functional pair
//! is canonical; `--probe-all` keeps collecting without changing that.

use crate::candidates::spec::{Candidate, CandidatePlan, LibraryRef};
use crate::candidates::CandidateGenerator;
use crate::config::DetectOptions;
use crate::error::{BlaslinkError, Result};
use crate::flags::FlagSink;
use crate::linker::SymbolChecker;
use crate::missing::MissingRoutineScanner;
use crate::probe::LibraryProbe;
use crate::provision::{FallbackProvisioner, ProvisionedPair};
use crate::report::{self, CapabilityReport, FunctionalPair};
use crate::shell::CommandExecutor;
use crate::toolchain::Toolchain;

/// Run the full detection pipeline: generate, probe, fall back,
/// scan for gaps, report.
pub fn run_detection(
    options: &DetectOptions,
    toolchain: &Toolchain,
    checker: &dyn SymbolChecker,
    executor: &dyn CommandExecutor,
    sink: &mut dyn FlagSink,
) -> Result<CapabilityReport> {
    let plans = CandidateGenerator::new(options, toolchain).plans()?;
    let search = Search {
        options,
        toolchain,
        checker,
        executor,
    };
    let outcome = search.walk(plans)?;

    let Some(winner) = outcome.functional.first() else {
        return Err(report::not_found_error(outcome.any_blas));
    };

    let missing = if winner.deferred {
        // Probing an uncompiled archive would mis-flag every routine;
        // the outer build phase owns this gap.
        tracing::debug!("skipping routine scan for deferred translated build");
        Vec::new()
    } else {
        let scanner = MissingRoutineScanner::new(search.checker, toolchain);
        let blas = winner.separate_blas.then(|| winner.blas.as_slice());
        let missing = scanner.scan(&winner.lapack, blas, winner.translated, sink);
        scanner.detect_vendor_extensions(&winner.lapack, sink);
        missing
    };

    if winner.translated {
        sink.define("BLASLAPACK_TRANSLATED", "1");
    }

    let report = report::build_report(winner, toolchain, missing);
    tracing::debug!("{}", report.summary);
    Ok(report)
}

struct Search<'a> {
    options: &'a DetectOptions,
    toolchain: &'a Toolchain,
    checker: &'a dyn SymbolChecker,
    executor: &'a dyn CommandExecutor,
}

#[derive(Default)]
struct SearchOutcome {
    functional: Vec<FunctionalPair>,
    /// Some probe found BLAS, even if its LAPACK side failed. Decides
    /// which interface the terminal error blames.
    any_blas: bool,
}

impl Search<'_> {
    fn walk(&self, plans: Vec<CandidatePlan>) -> Result<SearchOutcome> {
        let probe = LibraryProbe::new(self.checker, self.toolchain);
        let mut outcome = SearchOutcome::default();
        let mut stop = false;

        for plan in plans {
            if stop {
                break;
            }
            match plan {
                CandidatePlan::Probe(batch) => {
                    let mut batch_success = false;
                    for candidate in batch.candidates {
                        tracing::debug!(
                            "checking for a functional BLAS and LAPACK in {}",
                            candidate.label
                        );
                        let result = probe.check_candidate(&candidate);
                        outcome.any_blas |= result.blas_found;
                        if result.functional() {
                            batch_success = true;
                            outcome.functional.push(functional_pair(
                                candidate,
                                result.translated,
                                false,
                            ));
                            if !self.options.probe_all {
                                stop = true;
                                break;
                            }
                        }
                    }
                    if !batch_success && batch.committed {
                        return Err(BlaslinkError::CommittedCandidateFailed {
                            origin: batch.origin,
                        });
                    }
                }
                CandidatePlan::Download { flavor, committed } => {
                    // The fallback fires only while nothing validated.
                    if !outcome.functional.is_empty() {
                        continue;
                    }
                    let provisioner =
                        FallbackProvisioner::new(self.options, self.toolchain, self.executor);
                    let pair = provisioner.provision(flavor)?;
                    if pair.deferred {
                        outcome.any_blas = true;
                        outcome.functional.push(deferred_pair(pair));
                        if !self.options.probe_all {
                            stop = true;
                        }
                        continue;
                    }
                    let candidate = Candidate::separate(
                        pair.label,
                        vec![LibraryRef::Archive(pair.blas)],
                        vec![LibraryRef::Archive(pair.lapack)],
                    );
                    let result = probe.check_candidate(&candidate);
                    outcome.any_blas |= result.blas_found;
                    if result.functional() {
                        outcome
                            .functional
                            .push(functional_pair(candidate, result.translated, false));
                        if !self.options.probe_all {
                            stop = true;
                        }
                    } else if committed {
                        return Err(BlaslinkError::CommittedCandidateFailed {
                            origin: "--download-blaslapack".to_string(),
                        });
                    }
                }
            }
        }

        Ok(outcome)
    }
}

fn functional_pair(candidate: Candidate, translated: bool, deferred: bool) -> FunctionalPair {
    let separate_blas = candidate.separate_blas();
    let blas = candidate.blas.unwrap_or_else(|| candidate.lapack.clone());
    FunctionalPair {
        label: candidate.label,
        blas,
        lapack: candidate.lapack,
        separate_blas,
        translated,
        deferred,
    }
}

fn deferred_pair(pair: ProvisionedPair) -> FunctionalPair {
    FunctionalPair {
        label: pair.label,
        blas: vec![LibraryRef::Archive(pair.blas)],
        lapack: vec![LibraryRef::Archive(pair.lapack)],
        separate_blas: true,
        translated: pair.translated,
        deferred: pair.deferred,
    }
}
