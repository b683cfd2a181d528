use thiserror::Error;

/// Failures the control loop tells apart at its boundary.
///
/// Everything else travels as a plain `anyhow::Error` and is treated as
/// an unexpected failure.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Stopped by ESC")]
    Cancelled,
    #[error("`{command}` failed: {detail}")]
    Tool { command: String, detail: String },
    #[error("Home screen not reached after {0} recovery attempts")]
    RecoveryExhausted(u32),
}

impl BotError {
    /// Builds a tool failure from a finished process.
    pub fn tool(command: impl Into<String>, output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = if stderr.trim().is_empty() {
            output.status.to_string()
        } else {
            format!("{} ({})", output.status, stderr.trim())
        };
        Self::Tool {
            command: command.into(),
            detail,
        }
    }
}

/// Returns true if `err` is (or wraps) an operator stop.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<BotError>(), Some(BotError::Cancelled))
}
