//! Version bumping across workspace and crate manifests
//!
//! Propagates a target version to `workspace.package.version`, root-level
//! `package.version`, every non-excluded member's `package.version`, every
//! internal dependency requirement whose target was bumped, and TOML fences in
//! configured documentation files. Requirement operators are preserved and the
//! whole operation is idempotent: bumping to the current version writes
//! nothing and reports "no changes required".

use crate::cargo::manifest::{self, ManifestDocument};
use crate::core::config::LadingConfig;
use crate::core::error::{LadingError, LadingResult};
use crate::graph::{WorkspaceCrate, WorkspaceGraph};
use crate::release::docs;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "dev-dependencies", "build-dependencies"];

/// Files altered (or that would be altered) by a bump run
#[derive(Debug, Clone)]
pub struct BumpOutcome {
  /// Changed manifests, workspace manifest first, then sorted
  pub manifests: Vec<PathBuf>,
  /// Changed documentation files, sorted
  pub documents: Vec<PathBuf>,
  pub dry_run: bool,
}

impl BumpOutcome {
  pub fn is_noop(&self) -> bool {
    self.manifests.is_empty() && self.documents.is_empty()
  }

  /// Summarise the outcome for CLI presentation
  pub fn render(&self, target_version: &str, workspace_root: &Path) -> String {
    if self.is_noop() {
      return if self.dry_run {
        format!(
          "Dry run; no manifest changes required; all versions already {}.",
          target_version
        )
      } else {
        format!("No manifest changes required; all versions already {}.", target_version)
      };
    }

    let mut parts = Vec::new();
    if !self.manifests.is_empty() {
      parts.push(format!("{} manifest(s)", self.manifests.len()));
    }
    if !self.documents.is_empty() {
      parts.push(format!("{} documentation file(s)", self.documents.len()));
    }
    let description = parts.join(" and ");

    let header = if self.dry_run {
      format!("Dry run; would update version to {} in {}:", target_version, description)
    } else {
      format!("Updated version to {} in {}:", target_version, description)
    };

    let mut lines = vec![header];
    for path in &self.manifests {
      lines.push(format!("- {}", display_relative(path, workspace_root)));
    }
    for path in &self.documents {
      lines.push(format!("- {} (documentation)", display_relative(path, workspace_root)));
    }
    lines.join("\n")
  }
}

fn display_relative(path: &Path, workspace_root: &Path) -> String {
  path
    .strip_prefix(workspace_root)
    .unwrap_or(path)
    .display()
    .to_string()
}

/// Validate `version` against the semver grammar before any I/O
pub fn validate_version(version: &str) -> LadingResult<semver::Version> {
  semver::Version::parse(version).map_err(|e| LadingError::InvalidVersion {
    version: version.to_string(),
    detail: e.to_string(),
  })
}

/// Apply `target_version` across the workspace described by `graph`
pub fn run(
  graph: &WorkspaceGraph,
  config: &LadingConfig,
  target_version: &str,
  dry_run: bool,
) -> LadingResult<BumpOutcome> {
  validate_version(target_version)?;

  let excluded: BTreeSet<String> = config.bump.exclude.iter().cloned().collect();
  let updated_crates: BTreeSet<String> = graph
    .crates()
    .iter()
    .filter(|member| !excluded.contains(&member.name))
    .map(|member| member.name.clone())
    .collect();

  let workspace_manifest = graph.root().join("Cargo.toml");
  let mut changed_manifests = BTreeSet::new();

  if update_workspace_manifest(&workspace_manifest, target_version, &updated_crates, dry_run)? {
    changed_manifests.insert(workspace_manifest.clone());
  }
  for member in graph.crates() {
    if update_crate_manifest(member, target_version, &excluded, &updated_crates, dry_run)? {
      changed_manifests.insert(member.manifest_path.clone());
    }
  }

  let documents = docs::update_documentation(
    graph.root(),
    &config.bump.documentation.globs,
    target_version,
    &updated_crates,
    dry_run,
  )?;

  // Workspace manifest leads; member manifests follow in path order.
  let mut manifests = Vec::with_capacity(changed_manifests.len());
  if changed_manifests.remove(&workspace_manifest) {
    manifests.push(workspace_manifest);
  }
  manifests.extend(changed_manifests);

  Ok(BumpOutcome {
    manifests,
    documents,
    dry_run,
  })
}

/// Update the root manifest: workspace/package versions plus dependency
/// tables at both the top level and under `[workspace]`
fn update_workspace_manifest(
  manifest_path: &Path,
  target_version: &str,
  updated_crates: &BTreeSet<String>,
  dry_run: bool,
) -> LadingResult<bool> {
  let mut document = ManifestDocument::load(manifest_path)?;
  let mut changed = false;

  if let Some(package) = manifest::table_at_mut(document.document_mut().as_table_mut(), &["package"]) {
    changed |= manifest::set_version(package, target_version);
  }
  if let Some(package) = manifest::table_at_mut(document.document_mut().as_table_mut(), &["workspace", "package"]) {
    changed |= manifest::set_version(package, target_version);
  }

  for &section in DEPENDENCY_SECTIONS {
    for prefix in [&[][..], &["workspace"][..]] {
      let mut keys: Vec<&str> = prefix.to_vec();
      keys.push(section);
      if let Some(table) = manifest::table_at_mut(document.document_mut().as_table_mut(), &keys) {
        for name in updated_crates {
          changed |= manifest::update_requirement(table, name, target_version);
        }
      }
    }
  }

  if changed && !dry_run {
    document.save()?;
  }
  Ok(changed)
}

/// Update one member manifest: its own version unless excluded, plus
/// requirements on bumped members (rename-aware)
fn update_crate_manifest(
  member: &WorkspaceCrate,
  target_version: &str,
  excluded: &BTreeSet<String>,
  updated_crates: &BTreeSet<String>,
  dry_run: bool,
) -> LadingResult<bool> {
  let mut keys_by_section: BTreeMap<&'static str, BTreeSet<&str>> = BTreeMap::new();
  for dependency in &member.internal_dependencies {
    if updated_crates.contains(&dependency.target_name) {
      keys_by_section
        .entry(dependency.section.manifest_table())
        .or_default()
        .insert(dependency.manifest_key.as_str());
    }
  }

  let bump_own_version = !excluded.contains(&member.name);
  if !bump_own_version && keys_by_section.is_empty() {
    return Ok(false);
  }

  let mut document = ManifestDocument::load(&member.manifest_path)?;
  let mut changed = false;

  if bump_own_version
    && let Some(package) = manifest::table_at_mut(document.document_mut().as_table_mut(), &["package"])
  {
    changed |= manifest::set_version(package, target_version);
  }

  for (&section, keys) in &keys_by_section {
    if let Some(table) = manifest::table_at_mut(document.document_mut().as_table_mut(), &[section]) {
      for key in keys {
        changed |= manifest::update_requirement(table, key, target_version);
      }
    }
  }

  if changed && !dry_run {
    document.save()?;
  }
  Ok(changed)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::{DepSection, InternalDep};
  use std::fs;

  struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
  }

  impl Workspace {
    fn new(root_manifest: &str) -> Self {
      let dir = tempfile::tempdir().unwrap();
      let root = dir.path().canonicalize().unwrap();
      fs::write(root.join("Cargo.toml"), root_manifest).unwrap();
      Self { _dir: dir, root }
    }

    fn add_crate(&self, name: &str, manifest: &str) -> WorkspaceCrate {
      let crate_root = self.root.join("crates").join(name);
      fs::create_dir_all(&crate_root).unwrap();
      let manifest_path = crate_root.join("Cargo.toml");
      fs::write(&manifest_path, manifest).unwrap();
      WorkspaceCrate {
        name: name.to_string(),
        version: "0.1.0".to_string(),
        manifest_path,
        root_path: crate_root,
        publishable: true,
        readme_inherits_workspace: false,
        internal_dependencies: Vec::new(),
      }
    }

    fn read(&self, relative: &str) -> String {
      fs::read_to_string(self.root.join(relative)).unwrap()
    }
  }

  fn internal_dep(target: &str, key: &str, section: DepSection) -> InternalDep {
    InternalDep {
      target_name: target.to_string(),
      manifest_key: key.to_string(),
      section,
      requirement: Some("^0.1.0".to_string()),
      dev_only: false,
    }
  }

  #[test]
  fn test_invalid_versions_rejected_before_io() {
    for bad in ["1.2", "v1.2.3", "1.2.3.4", ""] {
      let err = validate_version(bad).unwrap_err();
      assert!(matches!(err, LadingError::InvalidVersion { .. }), "{}", bad);
    }
    for good in ["1.2.3", "1.2.3-rc.1", "1.2.3+build.5", "1.2.3-rc.1+build.5"] {
      assert!(validate_version(good).is_ok(), "{}", good);
    }
  }

  #[test]
  fn test_sample_bump_updates_workspace_and_crate() {
    let workspace = Workspace::new("[workspace]\nmembers = [\"crates/*\"]\n\n[workspace.package]\nversion = \"0.1.0\"\n");
    let alpha = workspace.add_crate("alpha", "[package]\nname = \"alpha\"\nversion = \"0.1.0\"\n");
    let graph = WorkspaceGraph::from_crates(workspace.root.clone(), vec![alpha]).unwrap();

    let outcome = run(&graph, &LadingConfig::default(), "1.2.3", false).unwrap();

    assert_eq!(outcome.manifests.len(), 2);
    assert_eq!(outcome.manifests[0], workspace.root.join("Cargo.toml"));
    assert!(workspace.read("Cargo.toml").contains("version = \"1.2.3\""));
    assert!(workspace.read("crates/alpha/Cargo.toml").contains("version = \"1.2.3\""));

    let rendered = outcome.render("1.2.3", &workspace.root);
    assert!(rendered.starts_with("Updated version to 1.2.3 in 2 manifest(s):"));
    assert!(rendered.contains("- Cargo.toml"));
    assert!(rendered.contains("- crates/alpha/Cargo.toml"));
  }

  #[test]
  fn test_excluded_crate_keeps_version_but_requirements_follow_targets() {
    let workspace = Workspace::new("[workspace]\nmembers = [\"crates/*\"]\n");
    let mut alpha = workspace.add_crate(
      "alpha",
      "[package]\nname = \"alpha\"\nversion = \"0.1.0\"\n\n[dependencies]\nbeta = { path = \"../beta\", version = \"^0.1.0\" }\n",
    );
    alpha.internal_dependencies = vec![internal_dep("beta", "beta", DepSection::Normal)];
    let mut beta = workspace.add_crate(
      "beta",
      "[package]\nname = \"beta\"\nversion = \"0.1.0\"\n\n[dependencies]\nalpha = { path = \"../alpha\", version = \"^0.1.0\" }\n",
    );
    beta.internal_dependencies = vec![internal_dep("alpha", "alpha", DepSection::Normal)];
    let graph = WorkspaceGraph::from_crates(workspace.root.clone(), vec![alpha, beta]).unwrap();

    let mut config = LadingConfig::default();
    config.bump.exclude = vec!["alpha".to_string()];
    run(&graph, &config, "1.2.3", false).unwrap();

    let alpha_manifest = workspace.read("crates/alpha/Cargo.toml");
    // alpha keeps its own version but its requirement on bumped beta moves.
    assert!(alpha_manifest.contains("version = \"0.1.0\""));
    assert!(alpha_manifest.contains("beta = { path = \"../beta\", version = \"^1.2.3\" }"));

    let beta_manifest = workspace.read("crates/beta/Cargo.toml");
    // beta is bumped, but its requirement on excluded alpha stays put.
    assert!(beta_manifest.contains("version = \"1.2.3\""));
    assert!(beta_manifest.contains("alpha = { path = \"../alpha\", version = \"^0.1.0\" }"));
  }

  #[test]
  fn test_renamed_dependency_key_updated() {
    let workspace = Workspace::new("[workspace]\nmembers = [\"crates/*\"]\n");
    let alpha = workspace.add_crate("alpha", "[package]\nname = \"alpha\"\nversion = \"0.1.0\"\n");
    let mut beta = workspace.add_crate(
      "beta",
      "[package]\nname = \"beta\"\nversion = \"0.1.0\"\n\n[dependencies]\nalpha-core = { package = \"alpha\", path = \"../alpha\", version = \"^0.1.0\" }\n",
    );
    beta.internal_dependencies = vec![internal_dep("alpha", "alpha-core", DepSection::Normal)];
    let graph = WorkspaceGraph::from_crates(workspace.root.clone(), vec![alpha, beta]).unwrap();

    run(&graph, &LadingConfig::default(), "1.2.3", false).unwrap();

    let beta_manifest = workspace.read("crates/beta/Cargo.toml");
    assert!(beta_manifest.contains("alpha-core = { package = \"alpha\", path = \"../alpha\", version = \"^1.2.3\" }"));
  }

  #[test]
  fn test_bump_is_idempotent_and_noop_reported() {
    let workspace = Workspace::new("[workspace.package]\nversion = \"0.1.0\"\n");
    let alpha = workspace.add_crate("alpha", "[package]\nname = \"alpha\"\nversion = \"0.1.0\"\n");
    let graph = WorkspaceGraph::from_crates(workspace.root.clone(), vec![alpha]).unwrap();
    let config = LadingConfig::default();

    run(&graph, &config, "1.2.3", false).unwrap();
    let before = workspace.read("crates/alpha/Cargo.toml");
    let again = run(&graph, &config, "1.2.3", false).unwrap();

    assert!(again.is_noop());
    assert_eq!(workspace.read("crates/alpha/Cargo.toml"), before);
    assert_eq!(
      again.render("1.2.3", &workspace.root),
      "No manifest changes required; all versions already 1.2.3."
    );
  }

  #[test]
  fn test_dry_run_reports_without_writing() {
    let workspace = Workspace::new("[workspace.package]\nversion = \"0.1.0\"\n");
    let alpha = workspace.add_crate("alpha", "[package]\nname = \"alpha\"\nversion = \"0.1.0\"\n");
    let graph = WorkspaceGraph::from_crates(workspace.root.clone(), vec![alpha]).unwrap();

    let outcome = run(&graph, &LadingConfig::default(), "2.0.0", true).unwrap();

    assert_eq!(outcome.manifests.len(), 2);
    assert!(workspace.read("Cargo.toml").contains("0.1.0"));
    assert!(workspace.read("crates/alpha/Cargo.toml").contains("0.1.0"));
    assert!(outcome.render("2.0.0", &workspace.root).starts_with("Dry run; would update"));
  }

  #[test]
  fn test_workspace_dependency_table_updated() {
    let workspace = Workspace::new(
      "[workspace]\nmembers = [\"crates/*\"]\n\n[workspace.dependencies]\nalpha = { path = \"crates/alpha\", version = \"0.1.0\" }\nserde = \"1\"\n",
    );
    let alpha = workspace.add_crate("alpha", "[package]\nname = \"alpha\"\nversion = \"0.1.0\"\n");
    let graph = WorkspaceGraph::from_crates(workspace.root.clone(), vec![alpha]).unwrap();

    run(&graph, &LadingConfig::default(), "1.2.3", false).unwrap();

    let root_manifest = workspace.read("Cargo.toml");
    assert!(root_manifest.contains("alpha = { path = \"crates/alpha\", version = \"1.2.3\" }"));
    assert!(root_manifest.contains("serde = \"1\""));
  }

  #[test]
  fn test_documentation_fences_updated() {
    let workspace = Workspace::new("[workspace.package]\nversion = \"0.1.0\"\n");
    let alpha = workspace.add_crate("alpha", "[package]\nname = \"alpha\"\nversion = \"0.1.0\"\n");
    fs::write(
      workspace.root.join("README.md"),
      "# Usage\n\n```toml\n[dependencies]\nalpha = \"0.1.0\"\n```\n",
    )
    .unwrap();
    let graph = WorkspaceGraph::from_crates(workspace.root.clone(), vec![alpha]).unwrap();

    let mut config = LadingConfig::default();
    config.bump.documentation.globs = vec!["README.md".to_string()];
    let outcome = run(&graph, &config, "1.2.3", false).unwrap();

    assert_eq!(outcome.documents.len(), 1);
    assert!(workspace.read("README.md").contains("alpha = \"1.2.3\""));
    assert!(
      outcome
        .render("1.2.3", &workspace.root)
        .contains("- README.md (documentation)")
    );
  }
}
