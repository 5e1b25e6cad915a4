use clap::{Parser, Subcommand};
use lading::commands;
use lading::core::config::normalise_workspace_root;
use lading::core::error::{LadingError, print_error};
use std::path::PathBuf;

/// Manage Rust workspace releases: version bumps and ordered publication
#[derive(Parser)]
#[command(name = "lading")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct LadingCli {
  /// Path to the Rust workspace root (defaults to the current directory)
  #[arg(long, global = true, env = "LADING_WORKSPACE_ROOT", value_name = "PATH")]
  workspace_root: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Update workspace manifests and documentation to VERSION
  Bump {
    /// Target semantic version (e.g. 1.2.3) to set across workspace manifests
    version: String,
    /// Preview manifest changes without writing files
    #[arg(long)]
    dry_run: bool,
  },

  /// Plan, stage, validate and publish workspace crates
  Publish {
    /// Run cargo publish without --dry-run; default behaviour is dry-run
    #[arg(long)]
    live: bool,
    /// Require a clean working tree before running pre-flight checks
    #[arg(long)]
    forbid_dirty: bool,
  },
}

const LOG_LEVEL_ENV_VAR: &str = "LADING_LOG_LEVEL";

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Map LADING_LOG_LEVEL onto a tracing level; CRITICAL and FATAL fold into ERROR
fn resolve_log_level(value: Option<&str>) -> Result<tracing::Level, String> {
  let Some(raw) = value else {
    return Ok(tracing::Level::INFO);
  };
  let candidate = raw.trim();
  if candidate.is_empty() {
    return Ok(tracing::Level::INFO);
  }
  match candidate.to_uppercase().as_str() {
    "DEBUG" => Ok(tracing::Level::DEBUG),
    "INFO" => Ok(tracing::Level::INFO),
    "WARNING" | "WARN" => Ok(tracing::Level::WARN),
    "ERROR" | "CRITICAL" | "FATAL" => Ok(tracing::Level::ERROR),
    _ => Err(format!(
      "Invalid {} value '{}'; expected one of: CRITICAL, DEBUG, ERROR, FATAL, INFO, WARN, WARNING",
      LOG_LEVEL_ENV_VAR, raw
    )),
  }
}

fn init_logging() -> Result<(), String> {
  let level = resolve_log_level(std::env::var(LOG_LEVEL_ENV_VAR).ok().as_deref())?;
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
  Ok(())
}

fn main() {
  if let Err(message) = init_logging() {
    eprintln!("Error: {}", message);
    std::process::exit(1);
  }

  let cli = LadingCli::parse();

  let workspace_root = match normalise_workspace_root(cli.workspace_root.as_deref()) {
    Ok(root) => root,
    Err(err) => handle_error(err),
  };

  let result = match cli.command {
    Commands::Bump { version, dry_run } => commands::run_bump(&workspace_root, &version, dry_run),
    Commands::Publish { live, forbid_dirty } => commands::run_publish(&workspace_root, live, forbid_dirty),
  };

  match result {
    Ok(message) => println!("{}", message),
    Err(err) => handle_error(err),
  }
}

fn handle_error(err: LadingError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
