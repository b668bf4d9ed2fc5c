//! Symbol-link checking.
//!
//! A candidate library only counts when the linker can actually
//! resolve the routines we need from it. [`CcSymbolChecker`] writes a
//! one-line conftest referencing the symbol and asks the C compiler to
//! link it against the candidate spec; link success is the answer.

use crate::candidates::spec::LibraryRef;
use crate::linker::format::link_argument;
use crate::shell::{CommandExecutor, CommandOptions};
use crate::toolchain::Toolchain;
use std::time::Duration;

/// Per-attempt link budget. A single conftest link never legitimately
/// takes longer.
const LINK_TIMEOUT: Duration = Duration::from_secs(60);

/// Seam for "does this spec provide this symbol".
///
/// `extra_libs` are already-resolved runtime dependencies (Fortran
/// runtime, a separate BLAS under a LAPACK probe) appended after the
/// spec under test. `fortran_mangle` applies the toolchain's native
/// external-name convention to the symbol before probing.
pub trait SymbolChecker {
    fn check(
        &self,
        libraries: &[LibraryRef],
        symbol: &str,
        extra_libs: &[LibraryRef],
        fortran_mangle: bool,
    ) -> bool;
}

/// Production checker driving the C compiler through the shell.
pub struct CcSymbolChecker<'a> {
    toolchain: &'a Toolchain,
    executor: &'a dyn CommandExecutor,
}

impl<'a> CcSymbolChecker<'a> {
    pub fn new(toolchain: &'a Toolchain, executor: &'a dyn CommandExecutor) -> Self {
        Self {
            toolchain,
            executor,
        }
    }
}

impl SymbolChecker for CcSymbolChecker<'_> {
    fn check(
        &self,
        libraries: &[LibraryRef],
        symbol: &str,
        extra_libs: &[LibraryRef],
        fortran_mangle: bool,
    ) -> bool {
        // A spec naming an archive that is not on disk cannot link.
        for lib in libraries {
            if let LibraryRef::Archive(path) = lib {
                let has_dir = path.parent().is_some_and(|p| !p.as_os_str().is_empty());
                if has_dir && !path.exists() {
                    return false;
                }
            }
        }

        let mangled = if fortran_mangle {
            self.toolchain.mangling.apply(symbol)
        } else {
            symbol.to_string()
        };

        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(_) => return false,
        };
        let source = format!("char {mangled}();\nint main(void) {{ {mangled}(); return 0; }}\n");
        if std::fs::write(dir.path().join("conftest.c"), source).is_err() {
            return false;
        }

        let mut command = format!("{} -o conftest conftest.c", self.toolchain.cc);
        for lib in libraries.iter().chain(extra_libs.iter()) {
            command.push(' ');
            command.push_str(&shell_quote(&link_argument(lib)));
        }

        let options = CommandOptions::in_dir(dir.path(), LINK_TIMEOUT);
        match self.executor.execute(&command, &options) {
            Ok(result) => {
                tracing::debug!(
                    symbol = %mangled,
                    found = result.success,
                    "link probe"
                );
                result.success
            }
            Err(_) => false,
        }
    }
}

/// Quote an argument for the shell when it contains whitespace.
fn shell_quote(arg: &str) -> String {
    if arg.contains(char::is_whitespace) && !arg.starts_with("-framework") {
        format!("'{arg}'")
    } else {
        arg.to_string()
    }
}
