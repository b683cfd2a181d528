//! Synchronous invocation of external command-line utilities.

use anyhow::Result;
use std::process::{Command, Output};

use crate::error::BotError;

/// Runs `cmd` to completion.
///
/// A missing binary or a non-zero exit becomes [`BotError::Tool`] carrying
/// the full command line.
pub fn run_checked(cmd: &mut Command) -> Result<Output> {
    let command_line = describe(cmd);
    let output = cmd.output().map_err(|e| BotError::Tool {
        command: command_line.clone(),
        detail: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(BotError::tool(command_line, &output).into());
    }
    Ok(output)
}

/// Renders a command as a shell-like line for logs.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().to_string()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().to_string()));
    parts.join(" ")
}
