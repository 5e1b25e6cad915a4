//! Error types for lading with contextual messages and exit codes
//!
//! Every component surfaces its own error kind from the taxonomy below; none
//! are swallowed. The CLI maps each kind to a one-line summary plus detail and
//! a non-zero exit code.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for lading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Success
  Success = 0,
  /// User error (config, invalid version, bad publish order)
  UserError = 1,
  /// System error (metadata, manifests, staging, I/O)
  SystemError = 2,
  /// Validation failure (dirty tree, pre-flight, publish step)
  ValidationError = 3,
}

impl ExitCode {
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for lading
#[derive(Debug)]
pub enum LadingError {
  /// Configuration errors (lading.toml)
  Config(ConfigError),

  /// Target version fails the semver grammar
  InvalidVersion { version: String, detail: String },

  /// `cargo metadata` invocation or parsing failure
  CargoMetadata(cargo_metadata::Error),

  /// A TOML document could not be parsed
  ManifestParse { path: PathBuf, detail: String },

  /// Duplicate crate names or out-of-root manifests
  WorkspaceInvariant { reason: String },

  /// Bad publish.order entries or a dependency cycle among non-dev edges
  PublishPlan { message: String },

  /// Staging copy or README projection failure
  Staging { message: String },

  /// Uncommitted changes with --forbid-dirty set
  DirtyWorkspace { status: String },

  /// An aux/check/test pre-flight command failed
  Preflight {
    command: String,
    exit_code: i32,
    detail: String,
  },

  /// cargo package / cargo publish failed for a crate
  PublishStep {
    crate_name: String,
    stage: PublishStage,
    exit_code: i32,
    detail: String,
  },

  /// Attempted execution of a program outside the allowlist
  UnknownProgram { program: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with context
  Other(anyhow::Error),
}

/// Stage of the publish pipeline a crate failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
  Package,
  Publish,
}

impl fmt::Display for PublishStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishStage::Package => write!(f, "cargo package"),
      PublishStage::Publish => write!(f, "cargo publish"),
    }
  }
}

impl LadingError {
  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      LadingError::Config(_) => ExitCode::UserError,
      LadingError::InvalidVersion { .. } => ExitCode::UserError,
      LadingError::PublishPlan { .. } => ExitCode::UserError,
      LadingError::UnknownProgram { .. } => ExitCode::UserError,
      LadingError::CargoMetadata(_) => ExitCode::SystemError,
      LadingError::ManifestParse { .. } => ExitCode::SystemError,
      LadingError::WorkspaceInvariant { .. } => ExitCode::SystemError,
      LadingError::Staging { .. } => ExitCode::SystemError,
      LadingError::Io(_) => ExitCode::SystemError,
      LadingError::DirtyWorkspace { .. } => ExitCode::ValidationError,
      LadingError::Preflight { .. } => ExitCode::ValidationError,
      LadingError::PublishStep { .. } => ExitCode::ValidationError,
      LadingError::Other(_) => ExitCode::UserError,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      LadingError::Config(e) => e.help_message(),
      LadingError::InvalidVersion { .. } => Some(
        "Expected a semantic version in the form <major>.<minor>.<patch> \
         with optional pre-release/build segments, e.g. 1.2.3 or 1.2.3-rc.1."
          .to_string(),
      ),
      LadingError::DirtyWorkspace { .. } => {
        Some("Commit or stash your changes, or re-run without --forbid-dirty.".to_string())
      }
      LadingError::PublishPlan { message } if message.contains("cycle") => {
        Some("Break the cycle or set an explicit publish.order in lading.toml.".to_string())
      }
      _ => None,
    }
  }

  /// Build a generic error from a message
  pub fn message(message: impl Into<String>) -> Self {
    LadingError::Other(anyhow::anyhow!(message.into()))
  }
}

impl fmt::Display for LadingError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LadingError::Config(e) => write!(f, "{}", e),
      LadingError::InvalidVersion { version, detail } => {
        write!(f, "Invalid version argument '{}': {}", version, detail)
      }
      LadingError::CargoMetadata(e) => write!(f, "cargo metadata failed: {}", e),
      LadingError::ManifestParse { path, detail } => {
        write!(f, "Failed to parse {}: {}", path.display(), detail)
      }
      LadingError::WorkspaceInvariant { reason } => {
        write!(f, "Workspace invariant violated: {}", reason)
      }
      LadingError::PublishPlan { message } => write!(f, "{}", message),
      LadingError::Staging { message } => write!(f, "{}", message),
      LadingError::DirtyWorkspace { status } => {
        write!(
          f,
          "Workspace has uncommitted changes; commit or stash them before publishing \
           or re-run without --forbid-dirty."
        )?;
        if !status.is_empty() {
          write!(f, "\n{}", status)?;
        }
        Ok(())
      }
      LadingError::Preflight {
        command,
        exit_code,
        detail,
      } => {
        write!(f, "Pre-flight command failed with exit code {}: {}", exit_code, command)?;
        if !detail.is_empty() {
          write!(f, "\n{}", detail)?;
        }
        Ok(())
      }
      LadingError::PublishStep {
        crate_name,
        stage,
        exit_code,
        detail,
      } => {
        write!(
          f,
          "{} failed for crate '{}' with exit code {}",
          stage, crate_name, exit_code
        )?;
        if !detail.is_empty() {
          write!(f, "\n{}", detail)?;
        }
        Ok(())
      }
      LadingError::UnknownProgram { program } => {
        write!(f, "Program '{}' is not in the command allowlist (cargo, git)", program)
      }
      LadingError::Io(e) => write!(f, "I/O error: {}", e),
      LadingError::Other(e) => write!(f, "{}", e),
    }
  }
}

impl std::error::Error for LadingError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      LadingError::Io(e) => Some(e),
      LadingError::CargoMetadata(e) => Some(e),
      LadingError::Other(e) => e.source(),
      _ => None,
    }
  }
}

impl From<io::Error> for LadingError {
  fn from(err: io::Error) -> Self {
    LadingError::Io(err)
  }
}

impl From<anyhow::Error> for LadingError {
  fn from(err: anyhow::Error) -> Self {
    LadingError::Other(err)
  }
}

impl From<cargo_metadata::Error> for LadingError {
  fn from(err: cargo_metadata::Error) -> Self {
    LadingError::CargoMetadata(err)
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Invalid TOML syntax or unknown keys
  Invalid { path: PathBuf, detail: String },

  /// A field holds an out-of-range or malformed value
  InvalidValue { field: String, detail: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::Invalid { .. } => {
        Some("Check the lading.toml syntax; only [bump], [publish] and [preflight] tables are recognised.".to_string())
      }
      ConfigError::InvalidValue { field, .. } if field == "publish.strip_patches" => {
        Some("publish.strip_patches may be 'all', 'per-crate', or 'none'.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::Invalid { path, detail } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), detail)
      }
      ConfigError::InvalidValue { field, detail } => {
        write!(f, "Invalid configuration value for {}: {}", field, detail)
      }
    }
  }
}

/// Print an error with its help message to stderr
pub fn print_error(err: &LadingError) {
  eprintln!("Error: {}", err);
  if let Some(help) = err.help_message() {
    eprintln!();
    eprintln!("Help: {}", help);
  }
}

/// Extension trait mirroring anyhow's context for LadingResult chains
pub trait ResultExt<T> {
  fn with_context<F>(self, f: F) -> LadingResult<T>
  where
    F: FnOnce() -> String;

  fn context(self, message: &'static str) -> LadingResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn with_context<F>(self, f: F) -> LadingResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| LadingError::Other(anyhow::Error::new(e).context(f())))
  }

  fn context(self, message: &'static str) -> LadingResult<T> {
    self.map_err(|e| LadingError::Other(anyhow::Error::new(e).context(message)))
  }
}

/// Result type alias for lading
pub type LadingResult<T> = Result<T, LadingError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes_by_kind() {
    let config = LadingError::Config(ConfigError::InvalidValue {
      field: "publish.strip_patches".to_string(),
      detail: "bogus".to_string(),
    });
    assert_eq!(config.exit_code(), ExitCode::UserError);

    let dirty = LadingError::DirtyWorkspace {
      status: " M src/lib.rs".to_string(),
    };
    assert_eq!(dirty.exit_code(), ExitCode::ValidationError);
    assert_eq!(dirty.exit_code().as_i32(), 3);

    let staging = LadingError::Staging {
      message: "copy failed".to_string(),
    };
    assert_eq!(staging.exit_code(), ExitCode::SystemError);
  }

  #[test]
  fn test_dirty_workspace_message() {
    let err = LadingError::DirtyWorkspace {
      status: " M Cargo.toml".to_string(),
    };
    let rendered = err.to_string();
    assert!(rendered.starts_with("Workspace has uncommitted changes"));
    assert!(rendered.contains(" M Cargo.toml"));
  }

  #[test]
  fn test_publish_step_message_names_crate_and_stage() {
    let err = LadingError::PublishStep {
      crate_name: "alpha".to_string(),
      stage: PublishStage::Publish,
      exit_code: 101,
      detail: String::new(),
    };
    assert_eq!(
      err.to_string(),
      "cargo publish failed for crate 'alpha' with exit code 101"
    );
  }

  #[test]
  fn test_unknown_program_is_user_error() {
    let err = LadingError::UnknownProgram {
      program: "rm".to_string(),
    };
    assert_eq!(err.exit_code(), ExitCode::UserError);
    assert!(err.to_string().contains("allowlist"));
  }
}
