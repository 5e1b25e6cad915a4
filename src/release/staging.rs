//! Workspace staging for publication
//!
//! Publication never edits the live tree: the workspace is copied into a
//! unique temporary directory, the staged root manifest has its
//! `[patch.crates-io]` entries stripped per strategy, and the workspace README
//! is projected into every crate that inherits it. The staging root is removed
//! when the handle drops unless the caller opts to keep it for inspection.

use crate::cargo::manifest::ManifestDocument;
use crate::core::config::StripPatches;
use crate::core::error::{LadingError, LadingResult};
use crate::graph::WorkspaceGraph;
use crate::release::plan::PublishPlan;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use toml_edit::DocumentMut;

pub const README_REQUIRED_MESSAGE: &str =
  "Workspace README.md is required by crates that set readme.workspace = true";

/// How a staging area is prepared and torn down
#[derive(Debug, Clone)]
pub struct StagingOptions {
  pub strip_patches: StripPatches,
  /// Keep symbolic links as links instead of dereferencing them during copy
  pub preserve_symlinks: bool,
  /// Remove the staging root when the handle drops
  pub cleanup: bool,
}

impl Default for StagingOptions {
  fn default() -> Self {
    Self {
      strip_patches: StripPatches::PerCrate,
      preserve_symlinks: true,
      cleanup: false,
    }
  }
}

/// A staged copy of the workspace
#[derive(Debug)]
pub struct StagingArea {
  staging_root: PathBuf,
  /// README copies, relative to the staging root, sorted
  copied_readmes: Vec<PathBuf>,
  /// Present only when cleanup-on-drop was requested
  temp: Option<TempDir>,
}

impl StagingArea {
  pub fn root(&self) -> &Path {
    &self.staging_root
  }

  pub fn copied_readmes(&self) -> &[PathBuf] {
    &self.copied_readmes
  }

  pub fn staged_manifest_path(&self) -> PathBuf {
    self.staging_root.join("Cargo.toml")
  }

  /// Whether the staging root outlives this handle
  pub fn is_kept(&self) -> bool {
    self.temp.is_none()
  }

  /// Summary lines for CLI output
  pub fn render(&self) -> String {
    let mut lines = vec![format!("Staged workspace at: {}", self.staging_root.display())];
    if self.copied_readmes.is_empty() {
      lines.push("Copied workspace README to: none required".to_string());
    } else {
      lines.push("Copied workspace README to:".to_string());
      for path in &self.copied_readmes {
        lines.push(format!("- {}", path.display()));
      }
    }
    lines.join("\n")
  }
}

/// Stage the workspace for `plan` according to `options`
pub fn prepare(graph: &WorkspaceGraph, plan: &PublishPlan, options: &StagingOptions) -> LadingResult<StagingArea> {
  let workspace_root = graph.root();
  let temp = tempfile::Builder::new()
    .prefix("lading-publish-")
    .tempdir()
    .map_err(|e| staging_error(format!("Failed to create staging directory: {}", e)))?;

  let workspace_name = workspace_root
    .file_name()
    .map(|name| name.to_os_string())
    .unwrap_or_else(|| "workspace".into());
  let staging_root = temp.path().join(workspace_name);
  if staging_root.starts_with(workspace_root) {
    return Err(staging_error(
      "Publish staging directory cannot be nested inside the workspace root".to_string(),
    ));
  }

  copy_tree(workspace_root, &staging_root, options.preserve_symlinks)
    .map_err(|e| staging_error(format!("Failed to stage workspace copy: {}", e)))?;

  apply_strip_patches(&staging_root.join("Cargo.toml"), options.strip_patches, &plan.publishable)?;
  let copied_readmes = project_readmes(graph, &staging_root)?;

  let temp = if options.cleanup {
    Some(temp)
  } else {
    // Detach: the directory survives for inspection and its path is reported.
    let _ = temp.keep();
    None
  };

  Ok(StagingArea {
    staging_root,
    copied_readmes,
    temp,
  })
}

/// Recursive copy honouring the symlink policy
fn copy_tree(source: &Path, destination: &Path, preserve_symlinks: bool) -> io::Result<()> {
  fs::create_dir_all(destination)?;
  for entry in fs::read_dir(source)? {
    let entry = entry?;
    let entry_path = entry.path();
    let target_path = destination.join(entry.file_name());
    let file_type = entry.file_type()?;

    if file_type.is_symlink() && preserve_symlinks {
      let link_target = fs::read_link(&entry_path)?;
      recreate_symlink(&link_target, &target_path)?;
    } else if entry_path.is_dir() {
      copy_tree(&entry_path, &target_path, preserve_symlinks)?;
    } else {
      fs::copy(&entry_path, &target_path)?;
    }
  }
  Ok(())
}

#[cfg(unix)]
fn recreate_symlink(link_target: &Path, destination: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(link_target, destination)
}

#[cfg(not(unix))]
fn recreate_symlink(link_target: &Path, destination: &Path) -> io::Result<()> {
  // Dereference on platforms without plain symlinks.
  fs::copy(link_target, destination).map(|_| ())
}

/// Strip `[patch.crates-io]` entries from the staged root manifest
fn apply_strip_patches(manifest_path: &Path, strategy: StripPatches, publishable: &[String]) -> LadingResult<()> {
  if strategy == StripPatches::None || !manifest_path.exists() {
    return Ok(());
  }
  let mut document = ManifestDocument::load(manifest_path)?;
  let modified = match strategy {
    StripPatches::All => strip_patch_table(document.document_mut()),
    StripPatches::PerCrate => {
      let mut removed = false;
      for name in publishable {
        removed |= remove_patch_entry(document.document_mut(), name);
      }
      removed
    }
    StripPatches::None => false,
  };
  if modified {
    document.save()?;
  }
  Ok(())
}

/// Remove the whole `[patch.crates-io]` table; returns whether it existed
pub fn strip_patch_table(document: &mut DocumentMut) -> bool {
  let Some(patch) = document.get_mut("patch").and_then(|item| item.as_table_like_mut()) else {
    return false;
  };
  let removed = patch.remove("crates-io").is_some();
  prune_empty_patch_tables(document);
  removed
}

/// Remove one crate's entry from `[patch.crates-io]`; returns whether it existed
pub fn remove_patch_entry(document: &mut DocumentMut, crate_name: &str) -> bool {
  let removed = document
    .get_mut("patch")
    .and_then(|item| item.as_table_like_mut())
    .and_then(|patch| patch.get_mut("crates-io"))
    .and_then(|item| item.as_table_like_mut())
    .map(|crates_io| crates_io.remove(crate_name).is_some())
    .unwrap_or(false);
  if removed {
    prune_empty_patch_tables(document);
  }
  removed
}

/// Drop `[patch.crates-io]` and `[patch]` once they hold nothing
fn prune_empty_patch_tables(document: &mut DocumentMut) {
  if let Some(patch) = document.get_mut("patch").and_then(|item| item.as_table_like_mut()) {
    let crates_io_empty = patch
      .get("crates-io")
      .and_then(|item| item.as_table_like())
      .is_some_and(|table| table.is_empty());
    if crates_io_empty {
      patch.remove("crates-io");
    }
  }
  let patch_empty = document
    .get("patch")
    .and_then(|item| item.as_table_like())
    .is_some_and(|table| table.is_empty());
  if patch_empty {
    document.as_table_mut().remove("patch");
  }
}

/// Copy the workspace README into each staged crate that inherits it
fn project_readmes(graph: &WorkspaceGraph, staging_root: &Path) -> LadingResult<Vec<PathBuf>> {
  let inheritors: Vec<_> = graph
    .crates()
    .iter()
    .filter(|member| member.readme_inherits_workspace)
    .collect();
  if inheritors.is_empty() {
    return Ok(Vec::new());
  }

  let workspace_readme = graph.root().join("README.md");
  if !workspace_readme.exists() {
    return Err(staging_error(README_REQUIRED_MESSAGE.to_string()));
  }

  let mut copied = Vec::new();
  for member in inheritors {
    let relative_root = member.root_path.strip_prefix(graph.root()).map_err(|_| {
      staging_error(format!(
        "Crate '{}' is outside the workspace root; cannot stage README",
        member.name
      ))
    })?;
    let staged_crate_root = staging_root.join(relative_root);
    fs::create_dir_all(&staged_crate_root)
      .map_err(|e| staging_error(format!("Failed to create staged crate directory: {}", e)))?;
    let staged_readme = staged_crate_root.join("README.md");
    fs::copy(&workspace_readme, &staged_readme)
      .map_err(|e| staging_error(format!("Failed to copy workspace README for '{}': {}", member.name, e)))?;
    copied.push(relative_root.join("README.md"));
  }
  copied.sort();
  Ok(copied)
}

fn staging_error(message: String) -> LadingError {
  LadingError::Staging { message }
}
