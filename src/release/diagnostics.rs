//! Compiletest stderr artifact discovery and diagnostics formatting
//!
//! When the test pre-flight fails, its output often points at `.stderr`
//! snapshot files written by compiletest harnesses. Tailing those files into
//! the error message saves a round trip to the build machine.

use std::fs;
use std::path::{Path, PathBuf};

const LEADING_PUNCTUATION: &[char] = &['(', '[', '\'', '"', '`'];
const TRAILING_PUNCTUATION: &[char] = &[')', ']', ':', ',', '.', ';', '\'', '"', '`'];

/// Append tails of referenced `.stderr` artifacts to `message`
pub fn append_compiletest_diagnostics(message: String, stdout: &str, stderr: &str, tail_lines: usize) -> String {
  let mut artifacts = Vec::new();
  for candidate in discover_stderr_artifacts(stdout)
    .into_iter()
    .chain(discover_stderr_artifacts(stderr))
  {
    if !artifacts.contains(&candidate) {
      artifacts.push(candidate);
    }
  }
  if artifacts.is_empty() {
    return message;
  }

  let mut lines = vec![message, "Compiletest stderr artifacts:".to_string()];
  for artifact in &artifacts {
    lines.extend(format_artifact(artifact, tail_lines));
  }
  lines.join("\n")
}

/// Absolute `.stderr` paths referenced anywhere in `stream`, in order
fn discover_stderr_artifacts(stream: &str) -> Vec<PathBuf> {
  let mut artifacts = Vec::new();
  for token in stream.split_whitespace() {
    let trimmed = token
      .trim_start_matches(LEADING_PUNCTUATION)
      .trim_end_matches(TRAILING_PUNCTUATION);
    if trimmed.starts_with('/') && trimmed.ends_with(".stderr") {
      let path = PathBuf::from(trimmed);
      if !artifacts.contains(&path) {
        artifacts.push(path);
      }
    }
  }
  artifacts
}

fn format_artifact(artifact: &Path, tail_lines: usize) -> Vec<String> {
  let mut lines = vec![format!("- {}", artifact.display())];
  if !artifact.exists() {
    lines.push("  (file not found)".to_string());
    return lines;
  }
  let tail = read_tail_lines(artifact, tail_lines);
  if tail.is_empty() {
    return lines;
  }
  lines.push(format!("  Last {} line(s):", tail_lines));
  lines.extend(tail.into_iter().map(|entry| format!("    {}", entry)));
  lines
}

fn read_tail_lines(path: &Path, count: usize) -> Vec<String> {
  if count == 0 {
    return Vec::new();
  }
  let Ok(text) = fs::read_to_string(path) else {
    return Vec::new();
  };
  let lines: Vec<&str> = text.lines().collect();
  let start = lines.len().saturating_sub(count);
  lines[start..].iter().map(|line| line.to_string()).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_discovers_paths_with_surrounding_punctuation() {
    let stream = "error: diff at (/tmp/ui/tests/fail.stderr), see '/tmp/ui/tests/other.stderr'.";
    let artifacts = discover_stderr_artifacts(stream);
    assert_eq!(
      artifacts,
      vec![
        PathBuf::from("/tmp/ui/tests/fail.stderr"),
        PathBuf::from("/tmp/ui/tests/other.stderr"),
      ]
    );
  }

  #[test]
  fn test_ignores_relative_and_non_stderr_tokens() {
    let stream = "tests/ui/fail.stderr /tmp/log.txt /tmp/a.stderr /tmp/a.stderr";
    let artifacts = discover_stderr_artifacts(stream);
    assert_eq!(artifacts, vec![PathBuf::from("/tmp/a.stderr")]);
  }

  #[test]
  fn test_message_untouched_without_artifacts() {
    let message = append_compiletest_diagnostics("boom".to_string(), "no artifacts here", "", 5);
    assert_eq!(message, "boom");
  }

  #[test]
  fn test_appends_tail_and_missing_file_note() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("case.stderr");
    let mut file = fs::File::create(&artifact).unwrap();
    for index in 0..10 {
      writeln!(file, "line {}", index).unwrap();
    }

    let stdout = format!("failures recorded in {}", artifact.display());
    let stderr = "also see /nonexistent/case.stderr";
    let message = append_compiletest_diagnostics("tests failed".to_string(), &stdout, stderr, 3);

    assert!(message.starts_with("tests failed\nCompiletest stderr artifacts:"));
    assert!(message.contains(&format!("- {}", artifact.display())));
    assert!(message.contains("  Last 3 line(s):"));
    assert!(message.contains("    line 9"));
    assert!(!message.contains("line 6"));
    assert!(message.contains("- /nonexistent/case.stderr\n  (file not found)"));
  }

  #[test]
  fn test_zero_tail_lines_lists_artifact_only() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("case.stderr");
    fs::write(&artifact, "content\n").unwrap();
    let message = append_compiletest_diagnostics("failed".to_string(), &artifact.display().to_string(), "", 0);
    assert!(message.contains(&format!("- {}", artifact.display())));
    assert!(!message.contains("Last"));
  }
}
