//! Bump command implementation

use crate::core::config::LadingConfig;
use crate::core::error::LadingResult;
use crate::graph::WorkspaceGraph;
use crate::release;
use std::path::Path;

/// Run the bump command: propagate `version` across the workspace
pub fn run_bump(workspace_root: &Path, version: &str, dry_run: bool) -> LadingResult<String> {
  // Version grammar is checked before metadata or manifests are touched.
  release::bump::validate_version(version)?;

  let config = LadingConfig::load(workspace_root)?;
  let graph = WorkspaceGraph::load(workspace_root)?;
  let outcome = release::bump::run(&graph, &config, version, dry_run)?;
  Ok(outcome.render(version, workspace_root))
}
