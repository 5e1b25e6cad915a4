//! Workspace introspection using cargo_metadata

use crate::core::error::LadingResult;
use cargo_metadata::{MetadataCommand, Package};
use std::path::Path;

/// Typed view over a `cargo metadata` invocation for one workspace
#[derive(Clone)]
pub struct WorkspaceMetadata {
  metadata: cargo_metadata::Metadata,
}

impl WorkspaceMetadata {
  /// Run `cargo metadata` for the workspace rooted at `workspace_root`.
  ///
  /// Dependency resolution is skipped; member manifests still carry their
  /// dependency entries, which is all the graph builder needs.
  pub fn load(workspace_root: &Path) -> LadingResult<Self> {
    let metadata = MetadataCommand::new()
      .manifest_path(workspace_root.join("Cargo.toml"))
      .no_deps()
      .exec()?;
    Ok(Self { metadata })
  }

  /// Build directly from a parsed metadata payload (tests, callers with caches)
  pub fn from_metadata(metadata: cargo_metadata::Metadata) -> Self {
    Self { metadata }
  }

  pub fn list_crates(&self) -> Vec<&Package> {
    self.metadata.workspace_packages()
  }

  pub fn workspace_root(&self) -> &Path {
    self.metadata.workspace_root.as_std_path()
  }
}
