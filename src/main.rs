use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use asset_pipeline::{AssetConfig, AssetService, PrecompileService, SCRIPT, STYLE};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Resolve, bundle and precompile web assets.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
  /// Configuration file (JSON or YAML). Defaults to assets.config.* in the current directory.
  #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
  config: Option<PathBuf>,

  /// Force debug mode regardless of the configuration file.
  #[arg(long, global = true)]
  debug: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Write every known asset and the files it references into a directory.
  Precompile {
    /// Output directory.
    #[arg(value_hint = clap::ValueHint::DirPath)]
    output_dir: PathBuf,
  },
  /// Print the inclusion markup for an asset.
  Tag {
    /// Logical asset name.
    name: String,
    /// Kind of tag to render.
    #[arg(short, long, value_enum, default_value_t = TagKind::Script)]
    kind: TagKind,
  },
  /// Print the deliverable content of an asset.
  Content {
    /// Logical asset name.
    name: String,
  },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TagKind {
  Style,
  Script,
}

impl TagKind {
  fn as_kind(self) -> &'static str {
    match self {
      TagKind::Style => STYLE,
      TagKind::Script => SCRIPT,
    }
  }
}

fn load_config(cli: &Cli) -> Result<AssetConfig> {
  let mut config = match &cli.config {
    Some(path) => AssetConfig::from_path(path)
      .with_context(|| format!("failed to load configuration from {}", path.display()))?,
    None => {
      let cwd = std::env::current_dir().context("failed to read the current directory")?;
      AssetConfig::discover(&cwd).context("failed to discover asset configuration")?
    }
  };
  if cli.debug {
    config.debug = true;
  }
  Ok(config)
}

fn main() -> Result<()> {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let service = AssetService::from_config(load_config(&cli)?);

  match cli.command {
    Command::Precompile { output_dir } => {
      let report = PrecompileService::new(service)
        .run(&output_dir)
        .with_context(|| format!("failed to precompile into {}", output_dir.display()))?;
      info!(
        assets = report.assets.len(),
        dependencies = report.dependencies.len(),
        "precompile finished"
      );
    }
    Command::Tag { name, kind } => {
      let markup = service
        .render_tag(&name, kind.as_kind())
        .with_context(|| format!("failed to render tag for '{name}'"))?;
      println!("{markup}");
    }
    Command::Content { name } => {
      let content = service
        .content(&name)
        .with_context(|| format!("failed to build content for '{name}'"))?;
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(&content).context("failed to write content")?;
      stdout.flush().context("failed to flush stdout")?;
    }
  }

  Ok(())
}
