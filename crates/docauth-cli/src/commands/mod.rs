//! Subcommands of the `docauth` binary.

pub mod extract;
pub mod validate;
