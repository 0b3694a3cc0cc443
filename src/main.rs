use anyhow::Result;
use clap::{Parser, Subcommand};

use glucochat::{cli, config, logging};

#[derive(Debug, Parser)]
#[command(name = "glucochat")]
#[command(about = "Metabolic-health chat gateway and dashboard")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the chat page and proxy `/api/chat` to the backend
    Serve {
        /// Listen address (overrides `server.addr`)
        #[arg(long)]
        addr: Option<String>,
        /// Open the page in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Chat from the terminal through a running gateway
    Chat {
        /// Gateway root URL (default: derived from `server.addr`)
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Show proxied exchange statistics
    Stats {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        /// Only include the last N days of data
        #[arg(long)]
        days: Option<u32>,
    },
    /// Check configuration, backend reachability, and log files
    Health,
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective merged configuration
    Show,
    /// Write a default config to ~/.glucochat/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `backend.url http://localhost:8000`
    Set { key: String, value: String },
    /// Restore the default config file
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let cfg = config::load();
    logging::init(&cfg.logging);

    match app.command {
        Commands::Serve { addr, open } => cli::run_serve(&cfg, addr.as_deref(), open),
        Commands::Chat { proxy } => cli::run_chat(&cfg, proxy.as_deref()),
        Commands::Stats { format, days } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_stats(fmt, days)
        }
        Commands::Health => cli::run_health(&cfg),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
