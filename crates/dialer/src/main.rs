//! PowerDial CLI
//!
//! Runs a simulated dialing session over a lead file, or prints the
//! effective configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use powerdial::config::DialerConfig;
use powerdial::simulate::{load_leads, run_simulation, SimulationOptions};
use powerdial::{logging, paths};

#[derive(Parser)]
#[command(name = "powerdial")]
#[command(version, about = "Campaign dialing sequencer")]
struct Cli {
    /// Data directory for config and logs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (overrides POWERDIAL_CONFIG and <data-dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dial every lead in a JSON file against simulated telephony
    Simulate {
        /// JSON array of leads
        #[arg(long)]
        leads: PathBuf,

        /// How long each simulated call rings before it is answered
        #[arg(long, default_value = "50")]
        answer_after_ms: u64,

        /// Disposition label saved for every answered call
        #[arg(long, default_value = "connected")]
        disposition: String,

        /// Delete a lead from the live list once dialing has started (repeatable)
        #[arg(long = "delete", value_name = "LEAD_ID")]
        delete: Vec<String>,
    },
    /// Load, validate and print the effective config
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = paths::resolve_data_dir(cli.data_dir.as_deref());

    match cli.command {
        Commands::Simulate {
            leads,
            answer_after_ms,
            disposition,
            delete,
        } => {
            paths::ensure_dirs(&data_dir)
                .with_context(|| format!("create data dir {}", data_dir.display()))?;
            let config = load_config(cli.config.as_deref(), &data_dir)?;
            let _logging = logging::init_logging(&paths::log_dir(&data_dir), &config.logging)?;

            let targets = load_leads(&leads)?;
            info!(
                component = "cli",
                event = "cli.simulate.start",
                leads = targets.len(),
                settle_delay_ms = config.settle_delay_ms,
                "Starting simulated session"
            );

            let options = SimulationOptions {
                answer_after: Duration::from_millis(answer_after_ms),
                disposition,
                delete,
            };
            let summary = run_simulation(&config, targets, options).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::CheckConfig => {
            let config = load_config(cli.config.as_deref(), &data_dir)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>, data_dir: &Path) -> anyhow::Result<DialerConfig> {
    DialerConfig::load(explicit, data_dir).context("load dialer config")
}
