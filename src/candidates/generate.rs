//! Candidate search-plan generation.
//!
//! The generator validates mutually exclusive inputs before yielding
//! anything, then produces the ordered plan the search driver walks:
//! user-pinned locations become committed batches (silent fallback is
//! disallowed once the user names a location), the open search becomes
//! exploratory batches in a fixed priority order, and downloads appear
//! as plans materialized only when actually reached.

use crate::candidates::spec::{Candidate, CandidateBatch, CandidatePlan, LibraryRef};
use crate::config::{DetectOptions, DownloadMode, Flavor};
use crate::error::{BlaslinkError, Result};
use crate::toolchain::Toolchain;
use std::path::{Path, PathBuf};

pub struct CandidateGenerator<'a> {
    options: &'a DetectOptions,
    toolchain: &'a Toolchain,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(options: &'a DetectOptions, toolchain: &'a Toolchain) -> Self {
        Self { options, toolchain }
    }

    /// Produce the full search plan, reading vendor roots from the
    /// process environment.
    pub fn plans(&self) -> Result<Vec<CandidatePlan>> {
        self.plans_with_env(|key| std::env::var(key))
    }

    /// Produce the search plan with a custom env lookup (tests).
    pub fn plans_with_env<F>(&self, env_fn: F) -> Result<Vec<CandidatePlan>>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        self.validate()?;

        // A forced download is the only candidate: downloaded results
        // are never silently skipped.
        if self.options.download == DownloadMode::Always {
            return Ok(vec![CandidatePlan::Download {
                flavor: self.options.flavor,
                committed: true,
            }]);
        }

        if let Some(spec) = &self.options.combined_lib {
            return Ok(vec![CandidatePlan::Probe(CandidateBatch::committed(
                "--blaslapack-lib",
                vec![Candidate::combined(
                    "User-specified BLAS/LAPACK library",
                    spec.clone(),
                )],
            ))]);
        }

        if let (Some(blas), Some(lapack)) = (&self.options.blas_lib, &self.options.lapack_lib) {
            return Ok(vec![CandidatePlan::Probe(CandidateBatch::committed(
                "--blas-lib/--lapack-lib",
                vec![Candidate::separate(
                    "User-specified BLAS and LAPACK libraries",
                    blas.clone(),
                    lapack.clone(),
                )],
            ))]);
        }

        if let Some(dir) = &self.options.install_dir {
            return Ok(vec![CandidatePlan::Probe(self.install_root_batch(dir))]);
        }

        Ok(self.exploratory_plans(env_fn))
    }

    /// Reject conflicting or unsatisfiable option combinations before
    /// any probing runs.
    fn validate(&self) -> Result<()> {
        let opts = self.options;

        if opts.blas_lib.is_some() && opts.lapack_lib.is_none() {
            return Err(conflict(
                "--blas-lib requires --lapack-lib to name the matching LAPACK",
            ));
        }
        if opts.lapack_lib.is_some() && opts.blas_lib.is_none() {
            return Err(conflict(
                "--lapack-lib requires --blas-lib to name the matching BLAS",
            ));
        }
        if opts.combined_lib.is_some() && (opts.blas_lib.is_some() || opts.lapack_lib.is_some()) {
            return Err(conflict(
                "--blaslapack-lib already names both libraries; drop --blas-lib/--lapack-lib",
            ));
        }
        if opts.blas_lib.is_some() && opts.install_dir.is_some() {
            return Err(conflict(
                "--blas-lib/--lapack-lib name the libraries directly; drop --blaslapack-dir",
            ));
        }
        if opts.combined_lib.is_some() && opts.install_dir.is_some() {
            return Err(conflict(
                "--blaslapack-lib names the library directly; drop --blaslapack-dir",
            ));
        }

        if opts.download != DownloadMode::Off {
            match opts.flavor {
                Flavor::Fortran if !self.toolchain.has_fortran() => {
                    return Err(BlaslinkError::Unsatisfiable {
                        message: "downloading the Fortran flavor requires a Fortran compiler; \
                                  maybe you want --flavor=translated"
                            .to_string(),
                    });
                }
                Flavor::Translated if self.toolchain.has_fortran() => {
                    return Err(BlaslinkError::Unsatisfiable {
                        message: "a Fortran compiler is configured; request --flavor=fortran \
                                  instead of the translated flavor"
                            .to_string(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Vendor sweep under a user-pinned install root. One committed
    /// batch: the run fails only after every layout under the root has
    /// been tried.
    fn install_root_batch(&self, dir: &Path) -> CandidateBatch {
        let dir = absolute(dir);
        let mut candidates = Vec::new();

        candidates.push(Candidate::separate(
            "User-specified installation root (HP-UX)",
            vec![LibraryRef::archive(dir.join("libveclib.a"))],
            vec![LibraryRef::archive(dir.join("liblapack.a"))],
        ));
        candidates.push(Candidate::separate(
            "User-specified installation root (translated)",
            vec![LibraryRef::archive(dir.join("libf2cblas.a"))],
            vec![LibraryRef::archive(dir.join("libf2clapack.a"))],
        ));
        candidates.push(Candidate::separate(
            "User-specified installation root (reference)",
            vec![LibraryRef::archive(dir.join("libfblas.a"))],
            vec![LibraryRef::archive(dir.join("libflapack.a"))],
        ));
        candidates.push(Candidate::separate(
            "User-specified ATLAS installation root",
            vec![
                LibraryRef::archive(dir.join("libcblas.a")),
                LibraryRef::archive(dir.join("libf77blas.a")),
                LibraryRef::archive(dir.join("libatlas.a")),
            ],
            vec![LibraryRef::archive(dir.join("liblapack.a"))],
        ));
        candidates.push(Candidate::separate(
            "User-specified ATLAS installation root",
            vec![
                LibraryRef::archive(dir.join("libf77blas.a")),
                LibraryRef::archive(dir.join("libatlas.a")),
            ],
            vec![LibraryRef::archive(dir.join("liblapack.a"))],
        ));

        for kernel in ["libmkl_def.a", "libmkl_ipf.a"] {
            candidates.push(Candidate::combined(
                "User-specified MKL lib directory",
                mkl_spec(&dir, kernel),
            ));
        }
        let mkl_root = dir
            .join("lib")
            .join(self.options.pointer_width.lib_subdir());
        for kernel in ["libmkl_def.a", "libmkl_ipf.a"] {
            candidates.push(Candidate::combined(
                "User-specified MKL installation root",
                mkl_spec(&mkl_root, kernel),
            ));
        }
        let mkl_windows = dir
            .join(self.options.pointer_width.platform_dir())
            .join("lib");
        candidates.push(Candidate::combined(
            "User-specified MKL installation root (Windows)",
            vec![LibraryRef::archive(mkl_windows.join("mkl_c_dll.lib"))],
        ));
        candidates.push(Candidate::combined(
            "User-specified MKL lib directory (Windows)",
            vec![LibraryRef::archive(dir.join("mkl_c_dll.lib"))],
        ));

        // The generic names come last so they are not found in
        // /usr/lib while a vendor layout inside the pinned root was
        // the actual intent.
        candidates.push(Candidate::separate(
            "User-specified installation root",
            vec![LibraryRef::archive(dir.join("libblas.a"))],
            vec![LibraryRef::archive(dir.join("liblapack.a"))],
        ));

        CandidateBatch::committed(format!("--blaslapack-dir {}", dir.display()), candidates)
    }

    /// The open search: exploratory batches in fixed priority order,
    /// then the conditional download fallback.
    fn exploratory_plans<F>(&self, env_fn: F) -> Vec<CandidatePlan>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        let mut plans = Vec::new();

        plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
            "platform math libraries",
            vec![
                Candidate::combined(
                    "SGI math library",
                    vec![LibraryRef::archive("libcomplib.sgimath.a")],
                ),
                Candidate::combined("IBM ESSL library", vec![LibraryRef::archive("libessl.a")]),
            ],
        )));

        if let Ok(pgi) = env_fn("PGI") {
            let pgi = PathBuf::from(pgi);
            let candidates = ["linux86/5.1/lib", "linux86/5.0/lib", "linux86/lib"]
                .iter()
                .map(|sub| {
                    let lib = pgi.join(sub);
                    Candidate::separate(
                        "Portland Group compiler libraries",
                        vec![LibraryRef::archive(lib.join("libblas.a"))],
                        vec![LibraryRef::archive(lib.join("liblapack.a"))],
                    )
                })
                .collect();
            plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
                "Portland Group compiler",
                candidates,
            )));
        }

        plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
            "compiler default locations",
            vec![
                Candidate::separate(
                    "Compiler default locations",
                    vec![LibraryRef::archive("libblas.a")],
                    vec![LibraryRef::archive("liblapack.a")],
                ),
                Candidate::separate(
                    "HP-UX vector library",
                    vec![LibraryRef::archive("libveclib.a")],
                    vec![LibraryRef::archive("liblapack.a")],
                ),
            ],
        )));

        let usr_local = PathBuf::from("/usr/local/lib");
        plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
            "conventional local install",
            vec![Candidate::separate(
                "Conventional /usr/local/lib install",
                vec![LibraryRef::archive(usr_local.join("libblas.a"))],
                vec![LibraryRef::archive(usr_local.join("liblapack.a"))],
            )],
        )));

        plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
            "g77 runtime",
            vec![Candidate::combined(
                "Compiler default locations with g77 runtime",
                vec![
                    LibraryRef::archive("liblapack.a"),
                    LibraryRef::archive("libblas.a"),
                    LibraryRef::archive("libg2c.a"),
                ],
            )],
        )));

        plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
            "OS-vendor math framework",
            vec![Candidate::combined(
                "macOS vecLib framework",
                vec![LibraryRef::archive(
                    "/System/Library/Frameworks/vecLib.framework/vecLib",
                )],
            )],
        )));

        let sunperf_sets: [&[&str]; 3] = [
            &["libsunperf.a", "libsunmath.a", "libm.a"],
            &["libsunperf.a", "libF77.a", "libM77.a", "libsunmath.a", "libm.a"],
            &["libsunperf.a", "libfui.a", "libfsu.a", "libsunmath.a", "libm.a"],
        ];
        plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
            "Sun performance library",
            sunperf_sets
                .iter()
                .map(|set| {
                    Candidate::combined(
                        "Sun performance library",
                        set.iter().map(|lib| LibraryRef::archive(*lib)).collect(),
                    )
                })
                .collect(),
        )));

        let platform_dir = self.options.pointer_width.platform_dir();
        plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
            "Windows Intel MKL",
            ["MKL", "MKL61"]
                .iter()
                .map(|version| {
                    let lib = PathBuf::from("/cygdrive/c/Program Files/Intel")
                        .join(version)
                        .join(platform_dir)
                        .join("lib");
                    Candidate::combined(
                        format!("Windows Intel {version} library"),
                        vec![LibraryRef::archive(lib.join("mkl_c_dll.lib"))],
                    )
                })
                .collect(),
        )));

        if let Ok(root) = env_fn("BLASLINK_DIR") {
            let base = absolute(&PathBuf::from(root).join("..").join("blaslapack").join("lib"));
            let arch = &self.options.arch;
            let dirs = [
                base.clone(),
                base.join("libg_c++").join(arch),
                base.join("libO_c++").join(arch),
            ];
            let candidates = dirs
                .iter()
                .map(|d| {
                    Candidate::separate(
                        "Build-tree blaslapack",
                        vec![LibraryRef::archive(d.join("libblas.a"))],
                        vec![LibraryRef::archive(d.join("liblapack.a"))],
                    )
                })
                .collect();
            plans.push(CandidatePlan::Probe(CandidateBatch::exploratory(
                "build-tree blaslapack",
                candidates,
            )));
        }

        if self.options.download == DownloadMode::IfNeeded {
            plans.push(CandidatePlan::Download {
                flavor: self.options.flavor,
                committed: true,
            });
        }

        plans
    }
}

fn conflict(message: &str) -> BlaslinkError {
    BlaslinkError::OptionConflict {
        message: message.to_string(),
    }
}

/// MKL spec: LAPACK shim, a kernel archive, and the runtime names.
fn mkl_spec(dir: &Path, kernel: &str) -> Vec<LibraryRef> {
    vec![
        LibraryRef::archive(dir.join("libmkl_lapack.a")),
        LibraryRef::archive(dir.join(kernel)),
        LibraryRef::name("guide"),
        LibraryRef::name("pthread"),
    ]
}

/// Absolutize without requiring the path to exist.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}
