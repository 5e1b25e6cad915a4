//! Publish command implementation
//!
//! Pipeline: pre-flight checks in the live workspace, then plan, stage,
//! package and publish in the staged copy. The staging directory is left on
//! disk and its path reported, so a failed run can be inspected.

use crate::core::config::LadingConfig;
use crate::core::error::LadingResult;
use crate::graph::WorkspaceGraph;
use crate::process::SystemRunner;
use crate::release::publish::PublishMode;
use crate::release::staging::StagingOptions;
use crate::release::{plan, preflight, publish, staging};
use std::path::Path;

/// Run the publish command end to end
pub fn run_publish(workspace_root: &Path, live: bool, forbid_dirty: bool) -> LadingResult<String> {
  let config = LadingConfig::load(workspace_root)?;
  let graph = WorkspaceGraph::load(workspace_root)?;
  let runner = SystemRunner::new(workspace_root.to_path_buf());

  preflight::run(workspace_root, &config.preflight, forbid_dirty, &runner)?;

  let publish_plan = plan::plan_publication(&graph, &config.publish)?;
  let options = StagingOptions {
    strip_patches: config.publish.strip_patches,
    preserve_symlinks: true,
    cleanup: false,
  };
  let staged = staging::prepare(&graph, &publish_plan, &options)?;

  let mode = if live { PublishMode::Live } else { PublishMode::DryRun };
  let outcomes = publish::execute(
    &publish_plan,
    &graph,
    &staged,
    config.publish.strip_patches,
    mode,
    &runner,
  )?;

  let mut sections = vec![plan::format_plan(&publish_plan, &graph, config.publish.strip_patches)];
  sections.push(staged.render());
  sections.push(publish::render_outcomes(&outcomes));
  Ok(sections.join("\n\n"))
}
