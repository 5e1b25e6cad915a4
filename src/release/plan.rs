//! Publish planning: candidate selection and ordering
//!
//! Crates with `publish = false` or listed in `publish.exclude` are skipped.
//! An explicit `publish.order` must be a permutation of the remaining set;
//! otherwise the planner topologically sorts the candidates over their
//! non-dev internal edges with Kahn's algorithm. The ready queue is kept in
//! lexicographic order so the output is identical across runs and platforms.

use crate::core::config::{PublishConfig, StripPatches};
use crate::core::error::{LadingError, LadingResult};
use crate::graph::{DepSection, WorkspaceGraph};
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::path::PathBuf;

/// Which crates to publish, in order, plus everything that was skipped
#[derive(Debug, Clone)]
pub struct PublishPlan {
  pub workspace_root: PathBuf,

  /// Crate names scheduled for publication, in publish order
  pub publishable: Vec<String>,

  /// Members skipped because their manifest sets publish = false (sorted)
  pub skipped_by_manifest: Vec<String>,

  /// Members skipped via publish.exclude (sorted)
  pub skipped_by_config: Vec<String>,

  /// publish.exclude entries matching no workspace member (sorted)
  pub unknown_exclusions: Vec<String>,
}

/// Build the publish plan for `graph` under `config`
pub fn plan_publication(graph: &WorkspaceGraph, config: &PublishConfig) -> LadingResult<PublishPlan> {
  let exclusions: BTreeSet<&str> = config.exclude.iter().map(String::as_str).collect();

  let mut publishable = BTreeSet::new();
  let mut skipped_by_manifest = Vec::new();
  let mut skipped_by_config = Vec::new();
  for member in graph.crates() {
    if !member.publishable {
      skipped_by_manifest.push(member.name.clone());
    } else if exclusions.contains(member.name.as_str()) {
      skipped_by_config.push(member.name.clone());
    } else {
      publishable.insert(member.name.clone());
    }
  }
  skipped_by_manifest.sort();
  skipped_by_config.sort();

  let member_names: BTreeSet<&str> = graph.crates().iter().map(|member| member.name.as_str()).collect();
  let unknown_exclusions: Vec<String> = exclusions
    .iter()
    .filter(|name| !member_names.contains(*name))
    .map(|name| name.to_string())
    .collect();

  let ordered = if config.order.is_empty() {
    resolve_topological_order(graph, &publishable)?
  } else {
    resolve_configured_order(&publishable, &config.order)?
  };

  Ok(PublishPlan {
    workspace_root: graph.root().to_path_buf(),
    publishable: ordered,
    skipped_by_manifest,
    skipped_by_config,
    unknown_exclusions,
  })
}

/// Validate an explicit publish.order against the candidate set
fn resolve_configured_order(candidates: &BTreeSet<String>, configured: &[String]) -> LadingResult<Vec<String>> {
  let mut ordered = Vec::new();
  let mut seen = BTreeSet::new();
  let mut duplicates = BTreeSet::new();
  let mut unknown = Vec::new();

  for name in configured {
    if !candidates.contains(name) {
      unknown.push(name.clone());
      continue;
    }
    if !seen.insert(name.clone()) {
      duplicates.insert(name.clone());
      continue;
    }
    ordered.push(name.clone());
  }
  let missing: Vec<&String> = candidates.iter().filter(|name| !seen.contains(*name)).collect();

  let mut messages = Vec::new();
  if !duplicates.is_empty() {
    let listed: Vec<&str> = duplicates.iter().map(String::as_str).collect();
    messages.push(format!("Duplicate publish.order entries: {}", listed.join(", ")));
  }
  if !unknown.is_empty() {
    unknown.sort();
    messages.push(format!(
      "publish.order references crates outside the publishable set: {}",
      unknown.join(", ")
    ));
  }
  if !missing.is_empty() {
    let listed: Vec<&str> = missing.iter().map(|name| name.as_str()).collect();
    messages.push(format!("publish.order omits publishable crate(s): {}", listed.join(", ")));
  }
  if !messages.is_empty() {
    return Err(LadingError::PublishPlan {
      message: messages.join("; "),
    });
  }
  Ok(ordered)
}

/// Kahn's algorithm over non-dev edges with a lexicographic ready queue
fn resolve_topological_order(graph: &WorkspaceGraph, candidates: &BTreeSet<String>) -> LadingResult<Vec<String>> {
  // dependency targets per candidate, deduplicated; dev edges ignored
  let mut targets_of: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
  for name in candidates {
    targets_of.insert(name.as_str(), BTreeSet::new());
  }
  for member in graph.crates() {
    if !candidates.contains(&member.name) {
      continue;
    }
    for dependency in &member.internal_dependencies {
      if dependency.section == DepSection::Dev {
        continue;
      }
      if candidates.contains(&dependency.target_name) && dependency.target_name != member.name {
        targets_of
          .get_mut(member.name.as_str())
          .expect("candidate entry")
          .insert(dependency.target_name.as_str());
      }
    }
  }

  let mut incoming: BTreeMap<&str, usize> = BTreeMap::new();
  let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
  for (&name, targets) in &targets_of {
    incoming.insert(name, targets.len());
    for &target in targets {
      dependents.entry(target).or_default().push(name);
    }
  }

  let mut ready: BinaryHeap<Reverse<&str>> = incoming
    .iter()
    .filter(|&(_, &count)| count == 0)
    .map(|(&name, _)| Reverse(name))
    .collect();
  let mut ordered = Vec::with_capacity(candidates.len());

  while let Some(Reverse(current)) = ready.pop() {
    ordered.push(current.to_string());
    for &dependent in dependents.get(current).map(Vec::as_slice).unwrap_or_default() {
      let count = incoming.get_mut(dependent).expect("dependent entry");
      *count -= 1;
      if *count == 0 {
        ready.push(Reverse(dependent));
      }
    }
  }

  if ordered.len() != candidates.len() {
    let cycle = cycle_members(&targets_of);
    let mut message = "Cannot determine publish order due to dependency cycle".to_string();
    if !cycle.is_empty() {
      message = format!("{} involving: {}", message, cycle.join(", "));
    }
    return Err(LadingError::PublishPlan { message });
  }
  Ok(ordered)
}

/// Names participating in a cycle, via strongly connected components
fn cycle_members(targets_of: &BTreeMap<&str, BTreeSet<&str>>) -> Vec<String> {
  let mut dependency_graph = DiGraph::<&str, ()>::new();
  let mut indices = BTreeMap::new();
  for &name in targets_of.keys() {
    indices.insert(name, dependency_graph.add_node(name));
  }
  for (&name, targets) in targets_of {
    for &target in targets {
      dependency_graph.add_edge(indices[target], indices[name], ());
    }
  }

  let mut members = BTreeSet::new();
  for component in tarjan_scc(&dependency_graph) {
    if component.len() > 1 {
      for index in component {
        members.insert(dependency_graph[index].to_string());
      }
    }
  }
  members.into_iter().collect()
}

/// Render `plan` to a human-readable summary for CLI output
pub fn format_plan(plan: &PublishPlan, graph: &WorkspaceGraph, strip_patches: StripPatches) -> String {
  let mut lines = vec![
    format!("Publish plan for {}", plan.workspace_root.display()),
    format!("Strip patch strategy: {}", strip_patches),
  ];

  if plan.publishable.is_empty() {
    lines.push("Crates to publish: none".to_string());
  } else {
    lines.push(format!("Crates to publish ({}):", plan.publishable.len()));
    for name in &plan.publishable {
      let version = graph.get(name).map(|member| member.version.as_str()).unwrap_or("?");
      lines.push(format!("- {} @ {}", name, version));
    }
  }
  append_section(&mut lines, &plan.skipped_by_manifest, "Skipped (publish = false):");
  append_section(&mut lines, &plan.skipped_by_config, "Skipped via publish.exclude:");
  append_section(
    &mut lines,
    &plan.unknown_exclusions,
    "Configured exclusions not found in workspace:",
  );

  lines.join("\n")
}

fn append_section(lines: &mut Vec<String>, items: &[String], header: &str) {
  if items.is_empty() {
    return;
  }
  lines.push(header.to_string());
  lines.extend(items.iter().map(|item| format!("- {}", item)));
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::{InternalDep, WorkspaceCrate};
  use std::path::PathBuf;

  fn member(name: &str, publishable: bool, deps: Vec<InternalDep>) -> WorkspaceCrate {
    WorkspaceCrate {
      name: name.to_string(),
      version: "0.1.0".to_string(),
      manifest_path: PathBuf::from(format!("/ws/crates/{}/Cargo.toml", name)),
      root_path: PathBuf::from(format!("/ws/crates/{}", name)),
      publishable,
      readme_inherits_workspace: false,
      internal_dependencies: deps,
    }
  }

  fn dep(target: &str, section: DepSection, dev_only: bool) -> InternalDep {
    InternalDep {
      target_name: target.to_string(),
      manifest_key: target.to_string(),
      section,
      requirement: Some("^0.1.0".to_string()),
      dev_only,
    }
  }

  fn graph(crates: Vec<WorkspaceCrate>) -> WorkspaceGraph {
    WorkspaceGraph::from_crates(PathBuf::from("/ws"), crates).unwrap()
  }

  #[test]
  fn test_topological_order_respects_dependencies() {
    let graph = graph(vec![
      member("cli", true, vec![dep("core", DepSection::Normal, false)]),
      member("core", true, vec![dep("util", DepSection::Normal, false)]),
      member("util", true, vec![]),
    ]);
    let plan = plan_publication(&graph, &PublishConfig::default()).unwrap();
    assert_eq!(plan.publishable, vec!["util", "core", "cli"]);
  }

  #[test]
  fn test_independent_crates_ordered_lexicographically() {
    let graph = graph(vec![
      member("zeta", true, vec![]),
      member("alpha", true, vec![]),
      member("mid", true, vec![]),
    ]);
    let plan = plan_publication(&graph, &PublishConfig::default()).unwrap();
    assert_eq!(plan.publishable, vec!["alpha", "mid", "zeta"]);
  }

  #[test]
  fn test_dev_only_cycle_ignored() {
    // beta depends on alpha normally; alpha depends on beta only in tests.
    let graph = graph(vec![
      member("alpha", true, vec![dep("beta", DepSection::Dev, true)]),
      member("beta", true, vec![dep("alpha", DepSection::Normal, false)]),
    ]);
    let plan = plan_publication(&graph, &PublishConfig::default()).unwrap();
    assert_eq!(plan.publishable, vec!["alpha", "beta"]);
  }

  #[test]
  fn test_cycle_reported_with_sorted_members() {
    let graph = graph(vec![
      member("alpha", true, vec![dep("beta", DepSection::Normal, false)]),
      member("beta", true, vec![dep("alpha", DepSection::Normal, false)]),
      member("gamma", true, vec![dep("alpha", DepSection::Normal, false)]),
    ]);
    let err = plan_publication(&graph, &PublishConfig::default()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("dependency cycle"));
    assert!(message.contains("alpha, beta"));
    assert!(!message.contains("gamma"));
  }

  #[test]
  fn test_publish_false_and_exclusions_partition_members() {
    let graph = graph(vec![
      member("alpha", true, vec![]),
      member("beta", false, vec![]),
      member("gamma", true, vec![]),
    ]);
    let config = PublishConfig {
      exclude: vec!["gamma".to_string(), "ghost".to_string()],
      ..Default::default()
    };
    let plan = plan_publication(&graph, &config).unwrap();
    assert_eq!(plan.publishable, vec!["alpha"]);
    assert_eq!(plan.skipped_by_manifest, vec!["beta"]);
    assert_eq!(plan.skipped_by_config, vec!["gamma"]);
    assert_eq!(plan.unknown_exclusions, vec!["ghost"]);
  }

  #[test]
  fn test_duplicate_order_entries_rejected() {
    let graph = graph(vec![
      member("alpha", true, vec![]),
      member("beta", true, vec![]),
      member("gamma", true, vec![]),
    ]);
    let config = PublishConfig {
      order: vec!["alpha".to_string(), "alpha".to_string()],
      ..Default::default()
    };
    let err = plan_publication(&graph, &config).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Duplicate publish.order entries: alpha"));
    assert!(message.contains("publish.order omits publishable crate(s): beta, gamma"));
  }

  #[test]
  fn test_unknown_order_entries_rejected() {
    let graph = graph(vec![member("alpha", true, vec![])]);
    let config = PublishConfig {
      order: vec!["alpha".to_string(), "ghost".to_string()],
      ..Default::default()
    };
    let err = plan_publication(&graph, &config).unwrap_err();
    assert!(
      err
        .to_string()
        .contains("publish.order references crates outside the publishable set: ghost")
    );
  }

  #[test]
  fn test_valid_explicit_order_used_verbatim() {
    let graph = graph(vec![member("alpha", true, vec![]), member("beta", true, vec![])]);
    let config = PublishConfig {
      order: vec!["beta".to_string(), "alpha".to_string()],
      ..Default::default()
    };
    let plan = plan_publication(&graph, &config).unwrap();
    assert_eq!(plan.publishable, vec!["beta", "alpha"]);
  }

  #[test]
  fn test_deterministic_across_runs() {
    let build = || {
      graph(vec![
        member("cli", true, vec![dep("core", DepSection::Normal, false)]),
        member("core", true, vec![]),
        member("docs", true, vec![]),
        member("util", true, vec![dep("core", DepSection::Build, false)]),
      ])
    };
    let first = plan_publication(&build(), &PublishConfig::default()).unwrap();
    let second = plan_publication(&build(), &PublishConfig::default()).unwrap();
    assert_eq!(first.publishable, second.publishable);
    assert_eq!(first.publishable, vec!["core", "cli", "docs", "util"]);
  }

  #[test]
  fn test_empty_candidate_set_renders_none() {
    let graph = graph(vec![member("alpha", false, vec![])]);
    let plan = plan_publication(&graph, &PublishConfig::default()).unwrap();
    assert!(plan.publishable.is_empty());
    let rendered = format_plan(&plan, &graph, StripPatches::PerCrate);
    assert!(rendered.contains("Crates to publish: none"));
    assert!(rendered.contains("Skipped (publish = false):"));
  }
}
