//! Configuration for lading (lading.toml)
//!
//! The configuration file lives at `<workspace-root>/lading.toml`. An absent
//! file is equivalent to an empty document; unknown keys are rejected.

use crate::core::error::{ConfigError, LadingError, LadingResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "lading.toml";

/// Strongly-typed representation of lading.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LadingConfig {
  pub bump: BumpConfig,
  pub publish: PublishConfig,
  pub preflight: PreflightConfig,
}

/// Settings for the `bump` command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BumpConfig {
  /// Crate names whose own package.version is left untouched
  pub exclude: Vec<String>,
  pub documentation: DocumentationConfig,
}

/// Documentation updates triggered by `bump`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentationConfig {
  /// Glob patterns resolved relative to the workspace root
  pub globs: Vec<String>,
}

/// Settings for the `publish` command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
  /// Crate names to skip when planning publication
  pub exclude: Vec<String>,

  /// Explicit publish ordering; must be a permutation of the publishable set
  pub order: Vec<String>,

  /// How [patch.crates-io] entries are removed from the staged manifest
  pub strip_patches: StripPatches,
}

/// Patch-strip strategy applied to the staged root manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StripPatches {
  /// Remove the entire [patch.crates-io] table before anything is packaged
  All,
  /// Remove each crate's entry just before that crate is published
  #[default]
  #[serde(alias = "per_crate")]
  PerCrate,
  /// Leave the patch table untouched
  None,
}

impl std::fmt::Display for StripPatches {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      StripPatches::All => write!(f, "all"),
      StripPatches::PerCrate => write!(f, "per-crate"),
      StripPatches::None => write!(f, "none"),
    }
  }
}

/// Settings for publish pre-flight checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreflightConfig {
  /// Crate names passed as `--exclude` to the cargo test pre-flight
  pub test_exclude: Vec<String>,

  /// Restrict the test pre-flight to `--lib --bins`
  pub unit_tests_only: bool,

  /// Commands executed in the workspace root before the cargo pre-flight
  pub aux_build: Vec<Vec<String>>,

  /// crate-name -> artifact path appended to RUSTFLAGS as `--extern` entries
  pub compiletest_extern: BTreeMap<String, String>,

  /// Environment overrides applied to every pre-flight command
  pub env: BTreeMap<String, String>,

  /// Lines tailed from each compiletest .stderr artifact on failure
  pub stderr_tail_lines: usize,
}

impl Default for PreflightConfig {
  fn default() -> Self {
    Self {
      test_exclude: Vec::new(),
      unit_tests_only: false,
      aux_build: Vec::new(),
      compiletest_extern: BTreeMap::new(),
      env: BTreeMap::new(),
      stderr_tail_lines: 40,
    }
  }
}

impl PreflightConfig {
  /// Sorted, deduplicated, trimmed crate names for `--exclude` flags
  pub fn normalised_test_excludes(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .test_exclude
      .iter()
      .map(|entry| entry.trim().to_string())
      .filter(|entry| !entry.is_empty())
      .collect();
    names.sort();
    names.dedup();
    names
  }
}

impl LadingConfig {
  /// Load configuration for `workspace_root`; an absent file yields defaults
  pub fn load(workspace_root: &Path) -> LadingResult<Self> {
    let config_path = workspace_root.join(CONFIG_FILENAME);
    if !config_path.exists() {
      return Ok(Self::default());
    }
    let content = fs::read_to_string(&config_path).map_err(|e| {
      LadingError::Config(ConfigError::Invalid {
        path: config_path.clone(),
        detail: e.to_string(),
      })
    })?;
    Self::parse(&content, &config_path)
  }

  /// Parse a configuration document, rejecting unknown keys
  pub fn parse(content: &str, config_path: &Path) -> LadingResult<Self> {
    let config: LadingConfig = toml_edit::de::from_str(content).map_err(|e| {
      LadingError::Config(ConfigError::Invalid {
        path: config_path.to_path_buf(),
        detail: e.to_string(),
      })
    })?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> LadingResult<()> {
    for (index, command) in self.preflight.aux_build.iter().enumerate() {
      if command.is_empty() {
        return Err(LadingError::Config(ConfigError::InvalidValue {
          field: format!("preflight.aux_build[{}]", index),
          detail: "command must contain at least one entry".to_string(),
        }));
      }
    }
    for name in &self.publish.order {
      if name.trim().is_empty() {
        return Err(LadingError::Config(ConfigError::InvalidValue {
          field: "publish.order".to_string(),
          detail: "entries must be non-empty crate names".to_string(),
        }));
      }
    }
    Ok(())
  }
}

/// Resolve and canonicalise a workspace root path
pub fn normalise_workspace_root(workspace_root: Option<&Path>) -> LadingResult<PathBuf> {
  let candidate = match workspace_root {
    Some(path) => path.to_path_buf(),
    None => std::env::current_dir()?,
  };
  candidate.canonicalize().map_err(|e| {
    LadingError::message(format!(
      "Workspace root not found: {} ({})",
      candidate.display(),
      e
    ))
  })
}
