//! Payfinder CLI
//!
//! Command implementations behind the `payfinder` binary. Exposed as a
//! library so the parsing and formatting helpers can be tested directly.

pub mod commands;
pub mod ui;
