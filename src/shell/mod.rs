//! Shell command execution.

pub mod command;

pub use command::{CommandExecutor, CommandOptions, CommandResult, ShellExecutor};
