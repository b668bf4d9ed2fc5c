//! Feature-flag emission.
//!
//! Downstream build phases consume capability flags (`HAVE_*`,
//! `MISSING_LAPACK_*`) rather than re-probing. [`FlagSink`] is the
//! narrow seam the pipeline emits through; [`FlagRecorder`] is the
//! in-memory implementation used by the CLI and by tests.

/// A single emitted capability flag.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Flag {
    pub name: String,
    pub value: String,
}

/// Receives capability flags as the pipeline discovers them.
pub trait FlagSink {
    fn define(&mut self, name: &str, value: &str);
}

/// Collects flags in order of emission.
#[derive(Debug, Default)]
pub struct FlagRecorder {
    flags: Vec<Flag>,
}

impl FlagRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn into_flags(self) -> Vec<Flag> {
        self.flags
    }

    /// Whether a flag with this name was emitted.
    pub fn contains(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f.name == name)
    }
}

impl FlagSink for FlagRecorder {
    fn define(&mut self, name: &str, value: &str) {
        self.flags.push(Flag {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
}
