//! Manifest document store built on toml_edit
//!
//! Loads and saves TOML documents while preserving comments, key order and
//! whitespace. All version edits go through the helpers here so trivia
//! attached to the edited values survives the rewrite.

use crate::core::error::{LadingError, LadingResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, TableLike, Value};

/// A TOML document bound to its on-disk location
#[derive(Debug)]
pub struct ManifestDocument {
  path: PathBuf,
  document: DocumentMut,
}

impl ManifestDocument {
  /// Load and parse the document at `path`
  pub fn load(path: &Path) -> LadingResult<Self> {
    let content = fs::read_to_string(path).map_err(|e| LadingError::ManifestParse {
      path: path.to_path_buf(),
      detail: e.to_string(),
    })?;
    Self::parse(&content, path)
  }

  /// Parse `content` as a document that notionally lives at `path`
  pub fn parse(content: &str, path: &Path) -> LadingResult<Self> {
    let document = content
      .parse::<DocumentMut>()
      .map_err(|e| LadingError::ManifestParse {
        path: path.to_path_buf(),
        detail: e.to_string(),
      })?;
    Ok(Self {
      path: path.to_path_buf(),
      document,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn document(&self) -> &DocumentMut {
    &self.document
  }

  pub fn document_mut(&mut self) -> &mut DocumentMut {
    &mut self.document
  }

  /// Persist the document atomically (write-to-temp in the same directory,
  /// then rename over the original)
  pub fn save(&self) -> LadingResult<()> {
    write_atomic(&self.path, &self.document.to_string())
  }
}

/// Write `content` to `path` via a sibling temp file plus rename
pub fn write_atomic(path: &Path, content: &str) -> LadingResult<()> {
  let directory = path
    .parent()
    .ok_or_else(|| LadingError::message(format!("No parent directory for {}", path.display())))?;
  let mut staged = tempfile::NamedTempFile::new_in(directory)?;
  staged.write_all(content.as_bytes())?;
  staged.persist(path).map_err(|e| LadingError::Io(e.error))?;
  Ok(())
}

/// Walk `keys` through nested tables, treating dotted and inline tables alike
pub fn table_at<'a>(root: &'a dyn TableLike, keys: &[&str]) -> Option<&'a dyn TableLike> {
  let mut current = root;
  for key in keys {
    current = current.get(key)?.as_table_like()?;
  }
  Some(current)
}

/// Mutable variant of [`table_at`]
pub fn table_at_mut<'a>(root: &'a mut dyn TableLike, keys: &[&str]) -> Option<&'a mut dyn TableLike> {
  let mut current = root;
  for key in keys {
    current = current.get_mut(key)?.as_table_like_mut()?;
  }
  Some(current)
}

/// Set `table["version"]` to `target` when it is a literal string.
///
/// Entries that inherit from the workspace (`version.workspace = true`) or
/// are absent are left alone. Returns whether the document changed.
pub fn set_version(table: &mut dyn TableLike, target: &str) -> bool {
  let Some(item) = table.get_mut("version") else {
    return false;
  };
  let Some(value) = item.as_value_mut() else {
    return false;
  };
  if !value.is_str() || value.as_str() == Some(target) {
    return false;
  }
  replace_string_value(value, target.to_string());
  true
}

/// Rewrite the requirement recorded for dependency `key` within `table`.
///
/// Bare strings are rewritten in place; inline tables and full dependency
/// tables have their `version` field rewritten; entries carrying only a
/// `path` are untouched. The operator prefix of the existing requirement
/// (`^`, `~`, `=`, `>`, `>=`, `<`, `<=` or none) is preserved.
pub fn update_requirement(table: &mut dyn TableLike, key: &str, target: &str) -> bool {
  let Some(item) = table.get_mut(key) else {
    return false;
  };
  if let Some(value) = item.as_value_mut() {
    return match value {
      Value::String(_) => rewrite_requirement_value(value, target),
      Value::InlineTable(inline) => inline
        .get_mut("version")
        .map(|version| rewrite_requirement_value(version, target))
        .unwrap_or(false),
      _ => false,
    };
  }
  if let Some(dep_table) = item.as_table_like_mut() {
    let Some(version_item) = dep_table.get_mut("version") else {
      return false;
    };
    let Some(value) = version_item.as_value_mut() else {
      return false;
    };
    return rewrite_requirement_value(value, target);
  }
  false
}

/// Prefix `target` with the non-numeric operator of `existing`
pub fn compose_requirement(existing: &str, target: &str) -> String {
  match existing.find(|c: char| c.is_ascii_digit()) {
    Some(0) | None => target.to_string(),
    Some(index) => format!("{}{}", &existing[..index], target),
  }
}

fn rewrite_requirement_value(value: &mut Value, target: &str) -> bool {
  let Some(existing) = value.as_str() else {
    return false;
  };
  let replacement = compose_requirement(existing, target);
  if replacement == existing {
    return false;
  }
  replace_string_value(value, replacement);
  true
}

fn replace_string_value(value: &mut Value, replacement: String) {
  let decor = value.decor().clone();
  *value = Value::from(replacement);
  *value.decor_mut() = decor;
}
