//! Ordered crate packaging and publication
//!
//! Walks the publish plan in order, applying per-crate patch stripping to the
//! staged root manifest when configured, then runs `cargo package` and
//! `cargo publish` in each crate's staged directory. A publish rejection that
//! says the version already exists becomes a warning and the run continues;
//! any other failure aborts. No rollback is attempted.

use crate::cargo::manifest::ManifestDocument;
use crate::core::config::StripPatches;
use crate::core::error::{LadingError, LadingResult, PublishStage};
use crate::graph::WorkspaceGraph;
use crate::process::{CommandOutput, CommandRunner};
use crate::release::plan::PublishPlan;
use crate::release::staging::{self, StagingArea};
use std::collections::BTreeMap;
use std::path::Path;

/// Whether cargo publish runs with --dry-run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
  DryRun,
  Live,
}

/// Per-crate result of the publish loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrateOutcome {
  pub name: String,
  pub status: CrateStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrateStatus {
  Published,
  DryRun,
  AlreadyPublished,
}

/// Phrases cargo emits when the crate version is already on the registry
const ALREADY_PUBLISHED_MARKERS: &[&str] = &[
  "already exists on crates.io index",
  "already exists on crates.io",
  "already uploaded",
  "already exists",
];

/// Package and publish every crate in `plan`, in order
pub fn execute(
  plan: &PublishPlan,
  graph: &WorkspaceGraph,
  staging: &StagingArea,
  strategy: StripPatches,
  mode: PublishMode,
  runner: &dyn CommandRunner,
) -> LadingResult<Vec<CrateOutcome>> {
  let env = BTreeMap::new();
  let mut outcomes = Vec::with_capacity(plan.publishable.len());

  for name in &plan.publishable {
    if strategy == StripPatches::PerCrate {
      strip_staged_patch_entry(staging, name)?;
    }

    let member = graph
      .get(name)
      .ok_or_else(|| LadingError::message(format!("Planned crate '{}' is missing from the workspace graph", name)))?;
    let relative_root = member.root_path.strip_prefix(graph.root()).map_err(|_| {
      LadingError::Staging {
        message: format!("Crate '{}' is outside the workspace root; cannot locate its staged copy", name),
      }
    })?;
    let staged_crate_dir = staging.root().join(relative_root);

    run_stage(
      runner,
      name,
      PublishStage::Package,
      &["package".to_string()],
      &staged_crate_dir,
      &env,
    )?;

    let mut publish_args = vec!["publish".to_string()];
    if mode == PublishMode::DryRun {
      publish_args.push("--dry-run".to_string());
    }
    let output = runner.run("cargo", &publish_args, &staged_crate_dir, &env)?;
    if !output.success() {
      if contains_already_published_marker(&output) {
        tracing::warn!("crate {} already published on the registry; continuing", name);
        outcomes.push(CrateOutcome {
          name: name.clone(),
          status: CrateStatus::AlreadyPublished,
        });
        continue;
      }
      return Err(LadingError::PublishStep {
        crate_name: name.clone(),
        stage: PublishStage::Publish,
        exit_code: output.exit_code,
        detail: output.detail(),
      });
    }

    outcomes.push(CrateOutcome {
      name: name.clone(),
      status: match mode {
        PublishMode::DryRun => CrateStatus::DryRun,
        PublishMode::Live => CrateStatus::Published,
      },
    });
  }

  Ok(outcomes)
}

/// Render outcome lines for CLI output
pub fn render_outcomes(outcomes: &[CrateOutcome]) -> String {
  if outcomes.is_empty() {
    return "Published crates: none".to_string();
  }
  let mut lines = vec!["Publish results:".to_string()];
  for outcome in outcomes {
    let status = match outcome.status {
      CrateStatus::Published => "published",
      CrateStatus::DryRun => "dry-run ok",
      CrateStatus::AlreadyPublished => "already published",
    };
    lines.push(format!("- {}: {}", outcome.name, status));
  }
  lines.join("\n")
}

/// Remove this crate's `[patch.crates-io]` entry from the staged manifest
fn strip_staged_patch_entry(staging: &StagingArea, crate_name: &str) -> LadingResult<()> {
  let manifest_path = staging.staged_manifest_path();
  if !manifest_path.exists() {
    return Ok(());
  }
  let mut document = ManifestDocument::load(&manifest_path)?;
  if staging::remove_patch_entry(document.document_mut(), crate_name) {
    document.save()?;
  }
  Ok(())
}

fn run_stage(
  runner: &dyn CommandRunner,
  crate_name: &str,
  stage: PublishStage,
  args: &[String],
  cwd: &Path,
  env: &BTreeMap<String, String>,
) -> LadingResult<CommandOutput> {
  let output = runner.run("cargo", args, cwd, env)?;
  if !output.success() {
    return Err(LadingError::PublishStep {
      crate_name: crate_name.to_string(),
      stage,
      exit_code: output.exit_code,
      detail: output.detail(),
    });
  }
  Ok(output)
}

fn contains_already_published_marker(output: &CommandOutput) -> bool {
  let stdout = output.stdout.to_lowercase();
  let stderr = output.stderr.to_lowercase();
  ALREADY_PUBLISHED_MARKERS
    .iter()
    .any(|marker| stdout.contains(marker) || stderr.contains(marker))
}
