use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{check_config, decide, lookup};

/// kgate - operator tools for the Kerberos authorization gate
#[derive(Parser)]
#[command(name = "kgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, env = "KGATE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and print a gate configuration file
    CheckConfig {
        /// Path to the YAML configuration
        file: PathBuf,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Evaluate the authorization policy for a described request
    Decide(decide::DecideArgs),

    /// Resolve a token through the Redis identity cache
    Lookup {
        /// Path to the YAML configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Redis connection URL
        #[arg(long, env = "KGATE_REDIS_URL")]
        redis_url: String,

        /// Token to resolve
        token: String,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let guard = match logging::init_logging(cli.verbose, cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let result = run(cli.command).await;
    // Flush the file writer before a possible early exit.
    drop(guard);

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::CheckConfig { file, format } => check_config::execute(&file, &format),
        Commands::Decide(args) => decide::execute(args),
        Commands::Lookup {
            config,
            redis_url,
            token,
            format,
        } => lookup::execute(&config, &redis_url, &token, &format).await,
    }
}
