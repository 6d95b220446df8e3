//! Command line interface for dmg_repack.
//!
//! Argument parsing, command dispatch and colored user feedback.

mod args;
pub mod commands;
mod output;

pub use args::{Args, CiArgs, Command, PatchArgs, RuntimeConfig, SourceArgs};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = match Args::parse_args() {
        Ok(args) => args,
        Err(e) => return Ok(Args::report_parse_error(&e)),
    };
    execute_command(args).await
}
