//! Library spec to linker-argument formatting.

use crate::candidates::spec::LibraryRef;
use std::path::Path;

/// Render one library reference as a linker argument.
///
/// - bare names become `-l<name>`; tokens already shaped like linker
///   flags pass through verbatim
/// - macOS framework binaries become `-framework <name>`
/// - a bare archive filename (`libblas.a`, no directory) is searched on
///   the default linker path as `-lblas`
/// - archive paths with a directory are linked by full path
pub fn link_argument(lib: &LibraryRef) -> String {
    match lib {
        LibraryRef::Name(name) => {
            if name.starts_with('-') {
                name.clone()
            } else {
                format!("-l{name}")
            }
        }
        LibraryRef::Archive(path) => {
            if let Some(framework) = framework_name(path) {
                return format!("-framework {framework}");
            }
            if let Some(name) = bare_archive_name(path) {
                return format!("-l{name}");
            }
            path.display().to_string()
        }
    }
}

/// Extract the framework name when the path points into a
/// `<name>.framework` bundle.
fn framework_name(path: &Path) -> Option<String> {
    for component in path.components() {
        let s = component.as_os_str().to_str()?;
        if let Some(stem) = s.strip_suffix(".framework") {
            return Some(stem.to_string());
        }
    }
    None
}

/// For a directory-less archive filename, the `-l` name the linker
/// should search its default paths for.
fn bare_archive_name(path: &Path) -> Option<String> {
    let has_dir = path.parent().is_some_and(|p| !p.as_os_str().is_empty());
    if has_dir {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    Some(stem.strip_prefix("lib").unwrap_or(stem).to_string())
}
