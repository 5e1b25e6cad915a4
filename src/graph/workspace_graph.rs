//! Workspace dependency graph built from cargo_metadata
//!
//! The graph is immutable after construction and consumed read-only by the
//! version engine, publish planner, staging director and publish executor.
//!
//! - **Nodes**: workspace member crates
//! - **Edges**: internal dependencies (a `path` entry resolving to another
//!   member), classified as normal, dev or build and rename-aware
//! - **Flags**: `publishable` from `package.publish`, README inheritance from
//!   `package.readme.workspace`

use crate::cargo::manifest::{self, ManifestDocument};
use crate::cargo::metadata::WorkspaceMetadata;
use crate::core::error::{LadingError, LadingResult};
use cargo_metadata::DependencyKind;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Which manifest section a dependency entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepSection {
  Normal,
  Dev,
  Build,
}

impl DepSection {
  /// The manifest table this section is written to
  pub fn manifest_table(self) -> &'static str {
    match self {
      DepSection::Normal => "dependencies",
      DepSection::Dev => "dev-dependencies",
      DepSection::Build => "build-dependencies",
    }
  }
}

/// A dependency edge between two workspace members
#[derive(Debug, Clone)]
pub struct InternalDep {
  /// Canonical name of the crate being depended on
  pub target_name: String,

  /// Key the dependency appears under; differs from `target_name` when the
  /// entry is renamed via `package = "..."`
  pub manifest_key: String,

  pub section: DepSection,

  /// Requirement expression as written, absent when the entry only has a path
  pub requirement: Option<String>,

  /// True when this edge is dev and no normal/build edge exists for the pair
  pub dev_only: bool,
}

/// A single crate discovered in the workspace
#[derive(Debug, Clone)]
pub struct WorkspaceCrate {
  pub name: String,
  pub version: String,
  pub manifest_path: PathBuf,
  pub root_path: PathBuf,
  pub publishable: bool,
  pub readme_inherits_workspace: bool,
  pub internal_dependencies: Vec<InternalDep>,
}

/// The crates and relationships of one workspace
#[derive(Debug)]
pub struct WorkspaceGraph {
  root: PathBuf,
  crates: Vec<WorkspaceCrate>,
}

impl WorkspaceGraph {
  /// Load the graph for the workspace rooted at `workspace_root`
  pub fn load(workspace_root: &Path) -> LadingResult<Self> {
    let metadata = WorkspaceMetadata::load(workspace_root)?;
    Self::build(&metadata)
  }

  /// Build the graph from an already-loaded metadata payload
  pub fn build(metadata: &WorkspaceMetadata) -> LadingResult<Self> {
    let root = metadata.workspace_root().to_path_buf();
    let packages = metadata.list_crates();

    let member_names: HashSet<String> = packages.iter().map(|pkg| pkg.name.to_string()).collect();
    let crate_roots: HashMap<String, PathBuf> = packages
      .iter()
      .filter_map(|pkg| {
        pkg
          .manifest_path
          .parent()
          .map(|dir| (pkg.name.to_string(), dir.as_std_path().to_path_buf()))
      })
      .collect();

    let mut crates = Vec::with_capacity(packages.len());
    for package in &packages {
      let name = package.name.to_string();
      let manifest_path = package.manifest_path.clone().into_std_path_buf();
      let root_path = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.clone());

      let publishable = package.publish.as_ref().is_none_or(|registries| !registries.is_empty());
      let readme_inherits_workspace = manifest_uses_workspace_readme(&manifest_path)?;

      let mut internal_dependencies = Vec::new();
      for dependency in &package.dependencies {
        let Some(dep_path) = dependency.path.as_ref() else {
          continue;
        };
        if !member_names.contains(&dependency.name) {
          continue;
        }
        // A same-named crate vendored outside the workspace is not an edge.
        if let Some(member_root) = crate_roots.get(&dependency.name)
          && dep_path.as_std_path() != member_root.as_path()
        {
          continue;
        }
        let Some(section) = classify_section(dependency.kind) else {
          tracing::warn!(
            "skipping dependency '{}' of '{}' with unsupported kind",
            dependency.name,
            name
          );
          continue;
        };
        let requirement = requirement_string(&dependency.req);
        let manifest_key = dependency.rename.clone().unwrap_or_else(|| dependency.name.clone());
        internal_dependencies.push(InternalDep {
          target_name: dependency.name.clone(),
          manifest_key,
          section,
          requirement,
          dev_only: false,
        });
      }
      mark_dev_only(&mut internal_dependencies);

      crates.push(WorkspaceCrate {
        name,
        version: package.version.to_string(),
        manifest_path,
        root_path,
        publishable,
        readme_inherits_workspace,
        internal_dependencies,
      });
    }

    Self::from_crates(root, crates)
  }

  /// Assemble a graph from pre-built crate records, enforcing the workspace
  /// invariants (unique names, manifests inside the root, known dep targets)
  pub fn from_crates(root: PathBuf, crates: Vec<WorkspaceCrate>) -> LadingResult<Self> {
    let mut seen: HashSet<&str> = HashSet::new();
    for member in &crates {
      if member.name.is_empty() {
        return Err(LadingError::WorkspaceInvariant {
          reason: format!("crate at {} has an empty name", member.manifest_path.display()),
        });
      }
      if !seen.insert(member.name.as_str()) {
        return Err(LadingError::WorkspaceInvariant {
          reason: format!("duplicate crate name '{}'", member.name),
        });
      }
      if !member.manifest_path.starts_with(&root) {
        return Err(LadingError::WorkspaceInvariant {
          reason: format!(
            "manifest {} lies outside the workspace root {}",
            member.manifest_path.display(),
            root.display()
          ),
        });
      }
    }
    for member in &crates {
      for dependency in &member.internal_dependencies {
        if !seen.contains(dependency.target_name.as_str()) {
          return Err(LadingError::WorkspaceInvariant {
            reason: format!(
              "crate '{}' depends on '{}', which is not a workspace member",
              member.name, dependency.target_name
            ),
          });
        }
      }
    }
    Ok(Self { root, crates })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn crates(&self) -> &[WorkspaceCrate] {
    &self.crates
  }

  pub fn get(&self, name: &str) -> Option<&WorkspaceCrate> {
    self.crates.iter().find(|member| member.name == name)
  }

  /// Member names in workspace order
  pub fn member_names(&self) -> Vec<&str> {
    self.crates.iter().map(|member| member.name.as_str()).collect()
  }
}

fn classify_section(kind: DependencyKind) -> Option<DepSection> {
  match kind {
    DependencyKind::Normal => Some(DepSection::Normal),
    DependencyKind::Development => Some(DepSection::Dev),
    DependencyKind::Build => Some(DepSection::Build),
    _ => None,
  }
}

fn requirement_string(req: &semver::VersionReq) -> Option<String> {
  let rendered = req.to_string();
  if rendered == "*" { None } else { Some(rendered) }
}

/// Flag dev edges whose crate pair has no normal or build edge
fn mark_dev_only(dependencies: &mut [InternalDep]) {
  let hard_targets: HashSet<String> = dependencies
    .iter()
    .filter(|dep| dep.section != DepSection::Dev)
    .map(|dep| dep.target_name.clone())
    .collect();
  for dependency in dependencies {
    dependency.dev_only = dependency.section == DepSection::Dev && !hard_targets.contains(&dependency.target_name);
  }
}

/// True when `package.readme.workspace = true` in the manifest at `manifest_path`
fn manifest_uses_workspace_readme(manifest_path: &Path) -> LadingResult<bool> {
  let document = ManifestDocument::load(manifest_path)?;
  let Some(readme) = manifest::table_at(document.document().as_table(), &["package", "readme"]) else {
    return Ok(false);
  };
  Ok(readme.get("workspace").and_then(|item| item.as_bool()) == Some(true))
}
