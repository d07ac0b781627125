use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use yote::{app, config, logging};

#[derive(Parser, Debug)]
#[command(name = "yote")]
#[command(about = "A caching shell for Yote REST resources")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/yote/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Resource to start with (singular or plural name)
  #[arg(short, long)]
  resource: Option<String>,

  /// Command to run once; starts an interactive shell when omitted
  #[arg(trailing_var_arg = true)]
  command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Keep the guard alive so buffered log lines are flushed on exit
  let _guard = logging::init()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let mut app = app::App::new(&config)?;
  if let Some(resource) = &args.resource {
    app.select_resource(resource)?;
  }

  if args.command.is_empty() {
    app.run().await?;
  } else {
    app.run_once(&args.command).await?;
  }

  Ok(())
}
