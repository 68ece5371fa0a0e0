//! # specwalk
//!
//! Discover component and spec tests in a workspace and run them.

use clap::{Parser, Subcommand};
use specwalk_core::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod reporter;

#[derive(Parser)]
#[command(name = "specwalk", version)]
#[command(about = "Discover and run component and spec tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./specwalk.toml, then the user config)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a dated release header to CHANGELOG.md and commit it
    Bump {
        /// One of major, minor or patch
        #[arg(num_args = 0.., value_name = "major|minor|patch")]
        args: Vec<String>,
    },
    /// Show the discovered test tree
    List {
        /// Workspace root
        #[arg(long, default_value = ".")]
        workspace: PathBuf,

        /// Print JSON instead of a tree
        #[arg(long)]
        json: bool,
    },
    /// Run tests
    Run {
        /// Workspace root
        #[arg(long, default_value = ".")]
        workspace: PathBuf,

        /// Only run tests whose name contains TEXT
        #[arg(long, value_name = "TEXT")]
        filter: Option<String>,

        /// Print the commands instead of running them
        #[arg(long)]
        print: bool,

        /// Files or directories to run (defaults to every service)
        paths: Vec<PathBuf>,
    },
    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Bump { args } => Ok(commands::bump::execute(&args)),
        Commands::List { workspace, json } => {
            let config = load_config(cli.config)?;
            commands::list::execute(config, &workspace, json)
        }
        Commands::Run {
            workspace,
            filter,
            print,
            paths,
        } => {
            let config = load_config(cli.config)?;
            let options = commands::run::RunOptions {
                filter,
                print,
                paths,
            };
            commands::run::execute(config, &workspace, options).await
        }
        Commands::Config => {
            print!("{}", Config::default_config_string());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<PathBuf>) -> color_eyre::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "specwalk=debug,specwalk_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
