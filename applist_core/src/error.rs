/*============================================================
  Synavera Project: AppList-Core
  Module: applist_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise AppList-Core error types so the inventory
    builder, bridge and CLI share one failure taxonomy.

  Security / Safety Notes:
    Error contexts expose package identifiers and high-level
    paths only; command output is trimmed before surfacing.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate recoverable failures and
    consolidate exit codes for the binary entry point.

  Revision History:
    2026-10-19 COD  Established shared error definitions.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - Only registry failures abort an inventory build
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for AppList-Core operations.
pub type Result<T> = std::result::Result<T, AppListError>;

/// Enumerates high-level error domains surfaced by AppList-Core.
#[derive(Debug, Error)]
pub enum AppListError {
    #[error("Package registry unavailable: {0}")]
    RegistryUnavailable(String),
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Icon: {0}")]
    Icon(String),
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AppListError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            AppListError::RegistryUnavailable(_) => 12,
            AppListError::CommandMissing { .. } => 10,
            AppListError::CommandFailure { .. } => 11,
            AppListError::InvalidArgument(_) => 21,
            AppListError::Icon(_) => 32,
            AppListError::Config(_) => 20,
            AppListError::Serialization(_) => 31,
            AppListError::Filesystem(_) => 40,
            AppListError::Runtime(_) => 50,
            AppListError::Io(_) => 41,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_failures_have_their_own_exit_code() {
        let registry = AppListError::RegistryUnavailable("dumpsys exited".into());
        let command = AppListError::CommandFailure {
            command: "dumpsys package packages".into(),
            status: 1,
            stderr: String::new(),
        };
        assert_ne!(registry.code(), command.code());
        assert!(registry.to_string().contains("dumpsys exited"));
    }
}
