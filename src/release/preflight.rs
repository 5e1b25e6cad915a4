//! Publish pre-flight checks
//!
//! Ordered validation executed in the live workspace before anything is
//! staged or packaged: optional working-tree cleanliness, auxiliary build
//! commands, then `cargo check` and `cargo test` against a throwaway
//! `CARGO_TARGET_DIR`. The sequence stops at the first failure.

use crate::core::config::PreflightConfig;
use crate::core::error::{LadingError, LadingResult};
use crate::process::{CommandRunner, format_command};
use crate::release::diagnostics;
use std::collections::BTreeMap;
use std::path::Path;

/// Run the full pre-flight sequence for `workspace_root`
pub fn run(
  workspace_root: &Path,
  config: &PreflightConfig,
  forbid_dirty: bool,
  runner: &dyn CommandRunner,
) -> LadingResult<()> {
  let base_env = config.env.clone();

  if forbid_dirty {
    verify_clean_working_tree(workspace_root, runner, &base_env)?;
  }

  for command in &config.aux_build {
    run_aux_build_command(workspace_root, command, runner, &base_env)?;
  }

  // Pre-flight builds must not dirty the workspace target directory.
  let target_dir = tempfile::Builder::new()
    .prefix("lading-preflight-target-")
    .tempdir()?;
  let mut cargo_env = base_env;
  cargo_env.insert(
    "CARGO_TARGET_DIR".to_string(),
    target_dir.path().display().to_string(),
  );

  let check_args = vec![
    "check".to_string(),
    "--workspace".to_string(),
    "--all-targets".to_string(),
  ];
  run_cargo_step(workspace_root, &check_args, runner, &cargo_env, None)?;

  let test_args = build_test_arguments(config);
  let test_env = apply_compiletest_externs(cargo_env, config, workspace_root);
  run_cargo_step(
    workspace_root,
    &test_args,
    runner,
    &test_env,
    Some(config.stderr_tail_lines),
  )?;

  Ok(())
}

/// Fail with DirtyWorkspaceError when `git status --porcelain` reports output
fn verify_clean_working_tree(
  workspace_root: &Path,
  runner: &dyn CommandRunner,
  env: &BTreeMap<String, String>,
) -> LadingResult<()> {
  let args = vec!["status".to_string(), "--porcelain".to_string()];
  let output = runner.run("git", &args, workspace_root, env)?;
  if !output.success() {
    let detail = output.detail();
    let summary = if detail.to_lowercase().contains("not a git repository") {
      "Failed to verify workspace state; is this a git repository?"
    } else {
      "Failed to verify workspace state with git status"
    };
    return Err(LadingError::Preflight {
      command: format_command("git", &args),
      exit_code: output.exit_code,
      detail: format!("{}: {}", summary, detail),
    });
  }
  if !output.stdout.trim().is_empty() {
    return Err(LadingError::DirtyWorkspace {
      status: output.stdout.trim_end().to_string(),
    });
  }
  Ok(())
}

fn run_aux_build_command(
  workspace_root: &Path,
  command: &[String],
  runner: &dyn CommandRunner,
  env: &BTreeMap<String, String>,
) -> LadingResult<()> {
  let (program, args) = command
    .split_first()
    .ok_or_else(|| LadingError::message("Auxiliary build command must contain at least one entry"))?;
  let output = runner.run(program, args, workspace_root, env)?;
  if !output.success() {
    return Err(LadingError::Preflight {
      command: format_command(program, args),
      exit_code: output.exit_code,
      detail: output.detail(),
    });
  }
  Ok(())
}

fn run_cargo_step(
  workspace_root: &Path,
  args: &[String],
  runner: &dyn CommandRunner,
  env: &BTreeMap<String, String>,
  diagnostics_tail_lines: Option<usize>,
) -> LadingResult<()> {
  let output = runner.run("cargo", args, workspace_root, env)?;
  if output.success() {
    return Ok(());
  }
  let mut detail = output.detail();
  if let Some(tail_lines) = diagnostics_tail_lines {
    detail = diagnostics::append_compiletest_diagnostics(detail, &output.stdout, &output.stderr, tail_lines);
  }
  Err(LadingError::Preflight {
    command: format_command("cargo", args),
    exit_code: output.exit_code,
    detail,
  })
}

/// Argument list for the cargo test pre-flight
fn build_test_arguments(config: &PreflightConfig) -> Vec<String> {
  let mut args = vec!["test".to_string(), "--workspace".to_string()];
  if config.unit_tests_only {
    args.push("--lib".to_string());
    args.push("--bins".to_string());
  } else {
    args.push("--all-targets".to_string());
  }
  for name in config.normalised_test_excludes() {
    args.push("--exclude".to_string());
    args.push(name);
  }
  args
}

/// Merge compiletest externs into RUSTFLAGS without clobbering existing flags
fn apply_compiletest_externs(
  mut env: BTreeMap<String, String>,
  config: &PreflightConfig,
  workspace_root: &Path,
) -> BTreeMap<String, String> {
  if config.compiletest_extern.is_empty() {
    return env;
  }
  let flags: Vec<String> = config
    .compiletest_extern
    .iter()
    .map(|(name, path)| {
      let artifact = workspace_root.join(path);
      format!("--extern {}={}", name, artifact.display())
    })
    .collect();
  let existing = env
    .get("RUSTFLAGS")
    .cloned()
    .or_else(|| std::env::var("RUSTFLAGS").ok())
    .unwrap_or_default();
  let joined_flags = flags.join(" ");
  let mut parts: Vec<&str> = Vec::new();
  let trimmed = existing.trim();
  if !trimmed.is_empty() {
    parts.push(trimmed);
  }
  if !joined_flags.is_empty() {
    parts.push(&joined_flags);
  }
  env.insert("RUSTFLAGS".to_string(), parts.join(" "));
  env
}
