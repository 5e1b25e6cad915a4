//! Documentation rewriting for version bumps
//!
//! Markdown files selected by `bump.documentation.globs` are scanned for
//! fenced code blocks whose info string starts with `toml`. Each fence body is
//! parsed as a TOML document, given the same version rewrites as a manifest,
//! and written back with the original fence marker, info string and
//! indentation intact.

use crate::cargo::manifest::{self, write_atomic};
use crate::core::error::{LadingError, LadingResult, ResultExt};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::DocumentMut;

const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "dev-dependencies", "build-dependencies"];

/// Apply version rewrites to every documentation file matching `globs`.
///
/// Returns the sorted list of files that changed. Files are only written when
/// `dry_run` is false.
pub fn update_documentation(
  workspace_root: &Path,
  globs: &[String],
  target_version: &str,
  updated_crates: &BTreeSet<String>,
  dry_run: bool,
) -> LadingResult<Vec<PathBuf>> {
  let mut changed = Vec::new();
  for path in resolve_targets(workspace_root, globs)? {
    let original = fs::read_to_string(&path)
      .with_context(|| format!("Failed to read documentation file {}", path.display()))?;
    let (updated, fences_changed) = rewrite_toml_fences(&original, updated_crates, target_version);
    if !fences_changed {
      continue;
    }
    if !dry_run {
      write_atomic(&path, &updated)?;
    }
    changed.push(path);
  }
  changed.sort();
  Ok(changed)
}

/// Resolve glob patterns relative to the workspace root, files only
fn resolve_targets(workspace_root: &Path, globs: &[String]) -> LadingResult<BTreeSet<PathBuf>> {
  let mut resolved = BTreeSet::new();
  for pattern in globs {
    let full_pattern = workspace_root.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();
    let entries = glob::glob(&full_pattern)
      .map_err(|e| LadingError::message(format!("Invalid documentation glob '{}': {}", pattern, e)))?;
    for entry in entries {
      let candidate =
        entry.map_err(|e| LadingError::message(format!("Failed to resolve documentation glob '{}': {}", pattern, e)))?;
      if candidate.is_file() {
        resolved.insert(candidate);
      }
    }
  }
  Ok(resolved)
}

/// Rewrite every `toml` fence in `markdown`; returns the new text and whether
/// anything changed
pub fn rewrite_toml_fences(
  markdown: &str,
  updated_crates: &BTreeSet<String>,
  target_version: &str,
) -> (String, bool) {
  let lines: Vec<&str> = markdown.split_inclusive('\n').collect();
  let mut output = String::with_capacity(markdown.len());
  let mut changed = false;
  let mut index = 0;

  while index < lines.len() {
    let line = lines[index];
    let Some(fence) = parse_fence_open(line) else {
      output.push_str(line);
      index += 1;
      continue;
    };
    let Some(close_index) = (index + 1..lines.len()).find(|&i| fence.closes(lines[i])) else {
      // Unclosed fence; emit the remainder untouched.
      for rest in &lines[index..] {
        output.push_str(rest);
      }
      break;
    };

    if fence.is_toml() {
      let body: String = lines[index + 1..close_index]
        .iter()
        .map(|body_line| strip_indent(body_line, &fence.indent))
        .collect();
      if let Some(rewritten) = rewrite_snippet(&body, updated_crates, target_version) {
        changed = true;
        output.push_str(line);
        for body_line in rewritten.split_inclusive('\n') {
          output.push_str(&fence.indent);
          output.push_str(body_line);
        }
        output.push_str(lines[close_index]);
        index = close_index + 1;
        continue;
      }
    }

    for original in &lines[index..=close_index] {
      output.push_str(original);
    }
    index = close_index + 1;
  }

  (output, changed)
}

/// An opening code fence: indentation, marker run and info string
struct FenceOpen {
  indent: String,
  marker: char,
  marker_len: usize,
  info: String,
}

impl FenceOpen {
  fn is_toml(&self) -> bool {
    self
      .info
      .split_whitespace()
      .next()
      .is_some_and(|lang| lang.eq_ignore_ascii_case("toml"))
  }

  fn closes(&self, line: &str) -> bool {
    let trimmed = line.trim_start_matches(' ');
    let run = trimmed.chars().take_while(|&c| c == self.marker).count();
    run >= self.marker_len && trimmed[run..].trim().is_empty()
  }
}

fn parse_fence_open(line: &str) -> Option<FenceOpen> {
  let trimmed = line.trim_start_matches(' ');
  let indent_len = line.len() - trimmed.len();
  let marker = match trimmed.chars().next() {
    Some(c @ ('`' | '~')) => c,
    _ => return None,
  };
  let marker_len = trimmed.chars().take_while(|&c| c == marker).count();
  if marker_len < 3 {
    return None;
  }
  let info = trimmed[marker_len..].trim().to_string();
  // CommonMark forbids backticks in the info string of backtick fences.
  if marker == '`' && info.contains('`') {
    return None;
  }
  Some(FenceOpen {
    indent: line[..indent_len].to_string(),
    marker,
    marker_len,
    info,
  })
}

fn strip_indent<'a>(line: &'a str, indent: &str) -> &'a str {
  if indent.is_empty() {
    return line;
  }
  let mut stripped = line;
  for _ in 0..indent.len() {
    match stripped.strip_prefix(' ') {
      Some(rest) => stripped = rest,
      None => break,
    }
  }
  stripped
}

/// Apply manifest-style version rewrites to one fence body.
///
/// Returns the rewritten body when something changed; unparsable snippets are
/// left untouched.
fn rewrite_snippet(snippet: &str, updated_crates: &BTreeSet<String>, target_version: &str) -> Option<String> {
  let mut document: DocumentMut = snippet.parse().ok()?;
  let mut changed = false;

  if let Some(package) = manifest::table_at_mut(document.as_table_mut(), &["package"]) {
    changed |= manifest::set_version(package, target_version);
  }
  if let Some(package) = manifest::table_at_mut(document.as_table_mut(), &["workspace", "package"]) {
    changed |= manifest::set_version(package, target_version);
  }
  for &section in DEPENDENCY_SECTIONS {
    if let Some(table) = manifest::table_at_mut(document.as_table_mut(), &[section]) {
      for name in updated_crates {
        changed |= manifest::update_requirement(table, name, target_version);
      }
    }
  }

  changed.then(|| document.to_string())
}
