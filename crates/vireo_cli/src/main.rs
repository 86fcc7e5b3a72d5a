//! `vireo` command line tool

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vireo", about = "Render and check Vireo component templates")]
#[command(version)]
struct Cli {
    /// Runtime configuration file (defaults to ./vireo.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template to HTML
    Render(RenderArgs),

    /// Compile templates and report errors
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct RenderArgs {
    /// Template file of the root component
    template: PathBuf,

    /// JSON file holding the initial state
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Register a component from a template file
    #[arg(long = "component", value_name = "NAME=FILE")]
    components: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Render(args) => commands::render(config, &args.template, args.data.as_deref(), &args.components),
        Commands::Check { files } => commands::check(config, &files),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
