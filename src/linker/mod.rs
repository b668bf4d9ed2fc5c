//! Linker-argument formatting and symbol-link checking.

pub mod checker;
pub mod format;

pub use checker::{CcSymbolChecker, SymbolChecker};
pub use format::link_argument;
