use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wgagent_core::WireFormat;

mod commands;

/// Log file used when the agent runs in the background
const DEFAULT_LOG_FILE: &str = "/var/log/webagent.log";

#[derive(Parser)]
#[command(name = "wgagent")]
#[command(about = "Privileged configuration agent for WireGuard gateways", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the agent
    Serve {
        /// Stay in the foreground and log to stderr
        #[arg(short, long)]
        foreground: bool,

        /// Append logs to this file (default in background mode: /var/log/webagent.log)
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Listen address, e.g. 127.0.0.1:51821
        #[arg(long)]
        listen: Option<String>,

        /// Wire format: structured, text
        #[arg(long)]
        format: Option<WireFormat>,

        /// Log actions instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Send one subcommand to a running agent
    Send {
        /// Subcommand name, e.g. ADD_WIREGUARD_PEER
        #[arg(required_unless_present = "bye")]
        subcommand: Option<String>,

        /// Positional parameters of the subcommand
        params: Vec<String>,

        /// Agent address (default: [client] addr from the config)
        #[arg(long)]
        addr: Option<String>,

        /// Wire format: structured, text
        #[arg(long)]
        format: Option<WireFormat>,

        /// Send BYE instead of a subcommand
        #[arg(long, conflicts_with = "subcommand")]
        bye: bool,
    },

    /// List the supported subcommands
    Commands {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let config = match &cli.config {
        Some(path) => wgagent_core::Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => wgagent_core::Config::load(),
    };

    match cli.command {
        Commands::Serve { listen, format, dry_run, .. } => {
            commands::serve::run(config, listen, format, dry_run)?;
        }
        Commands::Send { subcommand, params, addr, format, bye } => {
            let ok = commands::send::run(&config, subcommand, params, addr, format, bye)?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Commands { json } => {
            commands::list::run(json)?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose || std::env::var("WGAGENT_DEBUG").is_ok() {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_env("WGAGENT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_file = match &cli.command {
        Commands::Serve { foreground: false, log_file, .. } => {
            Some(log_file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)))
        }
        Commands::Serve { log_file, .. } => log_file.clone(),
        _ => None,
    };

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
