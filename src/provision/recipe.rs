//! Build-recipe derivation and checksumming.
//!
//! The reference source archive ships a makefile whose directive
//! header must be rewritten for the local toolchain. Rewriting is
//! modeled as a directive-name → value override map applied to the
//! template, not as line-by-line text surgery; `include` directives
//! are dropped because the derived recipe must be self-contained.
//!
//! The SHA-256 of the derived recipe keys the provision cache:
//! identical recipe content means the previous build is still valid.

use crate::toolchain::Toolchain;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Directive values substituted into the recipe template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeOverrides {
    pub fc: String,
    pub foptflags: String,
    pub ar: String,
    pub ar_flags: String,
    pub lib_suffix: String,
    pub ranlib: String,
    pub rm: String,
}

impl RecipeOverrides {
    /// Overrides for the local toolchain. `build_fc` is the compiler
    /// the recipe should invoke, which may differ from the configured
    /// one (IBM f90 is swapped for xlf upstream of this call).
    pub fn from_toolchain(toolchain: &Toolchain, build_fc: String) -> Self {
        Self {
            fc: build_fc,
            foptflags: toolchain.fortran_flags.clone(),
            ar: toolchain.ar.clone(),
            ar_flags: toolchain.ar_flags.clone(),
            lib_suffix: toolchain.lib_suffix.clone(),
            ranlib: toolchain.ranlib.clone(),
            rm: toolchain.rm.clone(),
        }
    }

    fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("FC", &self.fc),
            ("FOPTFLAGS", &self.foptflags),
            ("AR", &self.ar),
            ("AR_FLAGS", &self.ar_flags),
            ("LIB_SUFFIX", &self.lib_suffix),
            ("RANLIB", &self.ranlib),
            ("RM", &self.rm),
        ]
    }
}

/// Apply the override map to the template.
///
/// A line assigns a directive when its left-hand side (before `=`)
/// trims to exactly the directive name; matching lines are replaced
/// wholesale, `include` lines are dropped, everything else is kept.
pub fn derive_recipe(template: &str, overrides: &RecipeOverrides) -> String {
    let entries = overrides.entries();
    let mut out = String::with_capacity(template.len());

    for line in template.lines() {
        if line.trim_start().starts_with("include") {
            continue;
        }
        let replaced = line
            .split_once('=')
            .map(|(lhs, _)| lhs.trim())
            .and_then(|name| {
                entries
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(key, value)| format!("{key} = {value}"))
            });
        match replaced {
            Some(new_line) => out.push_str(&new_line),
            None => out.push_str(line),
        }
        out.push('\n');
    }

    out
}

/// SHA-256 of recipe content, hex-encoded.
pub fn recipe_checksum(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(digest)
}

/// Checksum of an on-disk recipe.
pub fn file_checksum(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\
# reference build
FC  = f77
FOPTFLAGS  = -O2
AR  = ar
AR_FLAGS  = cr
LIB_SUFFIX  = a
RANLIB  = ranlib
RM  = /bin/rm -f
include conf/rules
OBJS = ddot.o dgemm.o
all: $(OBJS)
";

    fn overrides() -> RecipeOverrides {
        RecipeOverrides {
            fc: "gfortran".into(),
            foptflags: "-O3".into(),
            ar: "/usr/bin/ar".into(),
            ar_flags: "crs".into(),
            lib_suffix: "a".into(),
            ranlib: "true".into(),
            rm: "rm -f".into(),
        }
    }

    #[test]
    fn all_directives_are_rewritten() {
        let derived = derive_recipe(TEMPLATE, &overrides());
        assert!(derived.contains("FC = gfortran"));
        assert!(derived.contains("FOPTFLAGS = -O3"));
        assert!(derived.contains("AR = /usr/bin/ar"));
        assert!(derived.contains("AR_FLAGS = crs"));
        assert!(derived.contains("RANLIB = true"));
        assert!(derived.contains("RM = rm -f"));
    }

    #[test]
    fn include_directives_are_dropped() {
        let derived = derive_recipe(TEMPLATE, &overrides());
        assert!(!derived.contains("include"));
    }

    #[test]
    fn non_directive_lines_survive() {
        let derived = derive_recipe(TEMPLATE, &overrides());
        assert!(derived.contains("OBJS = ddot.o dgemm.o"));
        assert!(derived.contains("all: $(OBJS)"));
        assert!(derived.contains("# reference build"));
    }

    #[test]
    fn ar_does_not_swallow_ar_flags() {
        let derived = derive_recipe("AR_FLAGS = x\nAR = y\n", &overrides());
        assert!(derived.contains("AR_FLAGS = crs"));
        assert!(derived.contains("AR = /usr/bin/ar"));
    }

    #[test]
    fn directive_order_does_not_matter() {
        let shuffled = "RM  = rm\nFC = f77\n";
        let derived = derive_recipe(shuffled, &overrides());
        assert!(derived.contains("RM = rm -f"));
        assert!(derived.contains("FC = gfortran"));
    }

    #[test]
    fn checksum_is_stable() {
        let derived = derive_recipe(TEMPLATE, &overrides());
        assert_eq!(recipe_checksum(&derived), recipe_checksum(&derived));
    }

    #[test]
    fn checksum_changes_with_content() {
        let a = derive_recipe(TEMPLATE, &overrides());
        let mut other = overrides();
        other.foptflags = "-O0".into();
        let b = derive_recipe(TEMPLATE, &other);
        assert_ne!(recipe_checksum(&a), recipe_checksum(&b));
    }

    #[test]
    fn file_checksum_matches_content_checksum() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("recipe");
        let derived = derive_recipe(TEMPLATE, &overrides());
        std::fs::write(&path, &derived).unwrap();
        assert_eq!(file_checksum(&path).unwrap(), recipe_checksum(&derived));
    }
}
