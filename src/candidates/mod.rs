//! Candidate library specifications and the search-plan generator.
//!
//! A candidate is one hypothesis about where a working BLAS/LAPACK
//! pair might live. Candidates are grouped into batches: a *committed*
//! batch (user-pinned location) must validate or the run fails; an
//! *exploratory* batch advances to the next on failure.

pub mod generate;
pub mod spec;

pub use generate::CandidateGenerator;
pub use spec::{Candidate, CandidateBatch, CandidatePlan, LibraryRef};
