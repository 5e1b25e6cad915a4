//! Allowlisted subprocess execution with streaming relay
//!
//! All external work goes through [`CommandRunner`], so commands can be faked
//! in tests. The system implementation spawns the child with piped streams and
//! mirrors output to the console line by line while capturing it for error
//! reporting. Only `cargo` and `git` may be executed; anything else fails
//! before spawn.

use crate::core::error::{LadingError, LadingResult};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Programs the runner is willing to spawn
pub const ALLOWED_PROGRAMS: &[&str] = &["cargo", "git"];

const ENV_REDACTION_TOKENS: &[&str] = &["TOKEN", "AUTH", "BEARER", "PASS", "CRED", "PASSPHRASE"];

/// Captured result of one command execution
#[derive(Debug, Clone)]
pub struct CommandOutput {
  pub exit_code: i32,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.exit_code == 0
  }

  /// Preferred diagnostic stream: stderr when present, stdout otherwise
  pub fn detail(&self) -> String {
    let stderr = self.stderr.trim();
    if !stderr.is_empty() {
      return stderr.to_string();
    }
    self.stdout.trim().to_string()
  }
}

/// Executes external commands on behalf of the release pipeline
pub trait CommandRunner {
  fn run(
    &self,
    program: &str,
    args: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
  ) -> LadingResult<CommandOutput>;
}

/// Fail with `UnknownProgramError` unless `program` is allowlisted
pub fn ensure_allowlisted(program: &str) -> LadingResult<()> {
  if ALLOWED_PROGRAMS.contains(&program) {
    return Ok(());
  }
  Err(LadingError::UnknownProgram {
    program: program.to_string(),
  })
}

/// Render a command line for logs and error messages
pub fn format_command(program: &str, args: &[String]) -> String {
  let mut rendered = program.to_string();
  for arg in args {
    rendered.push(' ');
    if arg.contains(char::is_whitespace) {
      rendered.push('\'');
      rendered.push_str(arg);
      rendered.push('\'');
    } else {
      rendered.push_str(arg);
    }
  }
  rendered
}

/// System-backed runner; exports LADING_WORKSPACE_ROOT to every child
pub struct SystemRunner {
  workspace_root: PathBuf,
}

impl SystemRunner {
  pub fn new(workspace_root: PathBuf) -> Self {
    Self { workspace_root }
  }
}

impl CommandRunner for SystemRunner {
  fn run(
    &self,
    program: &str,
    args: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
  ) -> LadingResult<CommandOutput> {
    ensure_allowlisted(program)?;
    tracing::info!("Spawning subprocess: {} (cwd={})", format_command(program, args), cwd.display());
    if env.is_empty() {
      tracing::debug!("Spawning subprocess with inherited environment");
    } else {
      tracing::debug!("Subprocess environment overrides: {:?}", redact_environment(env));
    }

    let mut command = Command::new(program);
    command
      .args(args)
      .current_dir(cwd)
      .env("LADING_WORKSPACE_ROOT", &self.workspace_root)
      .envs(env)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());

    let mut child = command
      .spawn()
      .map_err(|e| LadingError::message(format!("Failed to execute '{}': {}", program, e)))?;

    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_thread = thread::spawn(move || relay_stream(stdout_pipe, std::io::stdout()));
    let stderr_thread = thread::spawn(move || relay_stream(stderr_pipe, std::io::stderr()));

    let status = child.wait()?;
    let stdout = stdout_thread.join().unwrap_or_default();
    let stderr = stderr_thread.join().unwrap_or_default();

    Ok(CommandOutput {
      exit_code: status.code().unwrap_or(-1),
      stdout,
      stderr,
    })
  }
}

/// Mirror `source` into `sink` line by line while buffering the full text
fn relay_stream<R: Read, W: Write>(source: Option<R>, mut sink: W) -> String {
  let Some(source) = source else {
    return String::new();
  };
  let mut reader = BufReader::new(source);
  let mut captured = String::new();
  let mut line = Vec::new();
  let mut sink_open = true;
  loop {
    line.clear();
    match reader.read_until(b'\n', &mut line) {
      Ok(0) | Err(_) => break,
      Ok(_) => {
        let text = String::from_utf8_lossy(&line);
        captured.push_str(&text);
        if sink_open && (sink.write_all(text.as_bytes()).is_err() || sink.flush().is_err()) {
          sink_open = false;
        }
      }
    }
  }
  captured
}

/// Replace secret-looking values with placeholders for logging
fn redact_environment(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
  env
    .iter()
    .map(|(key, value)| {
      let upper = key.to_uppercase();
      let shown = if ENV_REDACTION_TOKENS.iter().any(|token| upper.contains(token)) {
        "<redacted>".to_string()
      } else {
        value.clone()
      };
      (key.clone(), shown)
    })
    .collect()
}
