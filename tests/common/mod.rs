//! Test helpers for integration tests

use lading::core::error::LadingResult;
use lading::graph::{DepSection, InternalDep, WorkspaceCrate};
use lading::process::{CommandOutput, CommandRunner};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// A scratch workspace on disk
pub struct ScratchWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl ScratchWorkspace {
  /// Create a workspace with the given root manifest
  pub fn new(root_manifest: &str) -> Self {
    let root = TempDir::new().unwrap();
    let path = root.path().canonicalize().unwrap();
    std::fs::write(path.join("Cargo.toml"), root_manifest).unwrap();
    Self { _root: root, path }
  }

  /// Add a crate directory with the given manifest and a stub lib.rs
  pub fn add_crate(&self, name: &str, manifest: &str) -> PathBuf {
    let crate_path = self.path.join("crates").join(name);
    std::fs::create_dir_all(crate_path.join("src")).unwrap();
    std::fs::write(crate_path.join("Cargo.toml"), manifest).unwrap();
    std::fs::write(
      crate_path.join("src/lib.rs"),
      format!("//! {} crate\n\npub fn name() -> &'static str {{\n  \"{}\"\n}}\n", name, name),
    )
    .unwrap();
    crate_path
  }

  /// Build a graph node for a crate previously added with `add_crate`
  pub fn member(&self, name: &str, deps: Vec<InternalDep>) -> WorkspaceCrate {
    let crate_root = self.path.join("crates").join(name);
    WorkspaceCrate {
      name: name.to_string(),
      version: "0.1.0".to_string(),
      manifest_path: crate_root.join("Cargo.toml"),
      root_path: crate_root,
      publishable: true,
      readme_inherits_workspace: false,
      internal_dependencies: deps,
    }
  }

  pub fn write_file(&self, relative: &str, content: &str) {
    let path = self.path.join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
  }

  pub fn read_file(&self, relative: &str) -> String {
    std::fs::read_to_string(self.path.join(relative)).unwrap()
  }
}

/// Build an internal dependency edge
pub fn internal_dep(target: &str, section: DepSection) -> InternalDep {
  InternalDep {
    target_name: target.to_string(),
    manifest_key: target.to_string(),
    section,
    requirement: Some("^0.1.0".to_string()),
    dev_only: false,
  }
}

/// One recorded command invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  pub env: BTreeMap<String, String>,
}

/// Command runner that replays scripted outputs and records every call
pub struct ScriptedRunner {
  outputs: Mutex<Vec<CommandOutput>>,
  calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
  /// Runner that answers every call with exit code 0 and empty output
  pub fn succeeding() -> Self {
    Self::new(Vec::new())
  }

  pub fn new(outputs: Vec<CommandOutput>) -> Self {
    Self {
      outputs: Mutex::new(outputs),
      calls: Mutex::new(Vec::new()),
    }
  }

  pub fn calls(&self) -> Vec<RecordedCall> {
    self.calls.lock().unwrap().clone()
  }
}

impl CommandRunner for ScriptedRunner {
  fn run(
    &self,
    program: &str,
    args: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
  ) -> LadingResult<CommandOutput> {
    self.calls.lock().unwrap().push(RecordedCall {
      program: program.to_string(),
      args: args.to_vec(),
      cwd: cwd.to_path_buf(),
      env: env.clone(),
    });
    let mut outputs = self.outputs.lock().unwrap();
    if outputs.is_empty() {
      return Ok(CommandOutput {
        exit_code: 0,
        stdout: String::new(),
        stderr: String::new(),
      });
    }
    Ok(outputs.remove(0))
  }
}

/// Output with the given exit code and stderr
pub fn command_output(exit_code: i32, stderr: &str) -> CommandOutput {
  CommandOutput {
    exit_code,
    stdout: String::new(),
    stderr: stderr.to_string(),
  }
}
