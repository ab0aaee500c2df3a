//! Manual testing CLI for the IONOS instance group provider.
//!
//! Drives the same lifecycle operations the autoscaling host would, against
//! a real account. Credentials come from the environment (`IONOS_TOKEN` or
//! `IONOS_USERNAME`/`IONOS_PASSWORD`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fleeting_ionos::{InstanceGroup, InstanceGroupConfig, IonosInstanceGroup, Settings};

/// Manage a pool of IONOS Cloud servers.
#[derive(Parser)]
#[command(name = "fleeting-ionos")]
#[command(about = "Scale and inspect an IONOS instance group")]
struct Cli {
    /// Path to the instance group configuration (JSON).
    #[arg(long, env = "FLEETING_IONOS_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep the pool and print one `id state` line per owned instance.
    List,

    /// Create new instances.
    Increase {
        /// Number of instances to add.
        #[arg(long, default_value = "1")]
        delta: usize,
    },

    /// Delete instances by id.
    Decrease {
        /// Server UUIDs (comma-separated).
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },

    /// Resolve connection details for a running instance.
    ConnectInfo {
        /// Server UUID.
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = InstanceGroupConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let group = IonosInstanceGroup::new(config, Settings::default())
        .context("Failed to create instance group")?;

    let info = group.init().await.context("Init failed")?;
    tracing::info!(id = %info.id, max_size = info.max_size, version = %info.version, "Provider ready");

    let token = CancellationToken::new();

    match cli.command {
        Commands::List => {
            let mut seen = 0usize;
            group
                .update(&mut |id, state| {
                    seen += 1;
                    println!("{id} {state}");
                })
                .await
                .context("Update failed")?;
            if seen == 0 {
                println!("(no instances)");
            }
        }

        Commands::Increase { delta } => {
            let (succeeded, err) = group.increase(&token, delta).await;
            println!("created {succeeded} of {delta}");
            if let Some(err) = err {
                anyhow::bail!("increase incomplete: {err}");
            }
        }

        Commands::Decrease { ids } => {
            let requested = ids.len();
            let (succeeded, err) = group.decrease(&token, ids).await;
            for id in &succeeded {
                println!("deleted {id}");
            }
            println!("deleted {} of {requested}", succeeded.len());
            if let Some(err) = err {
                anyhow::bail!("decrease incomplete: {err}");
            }
        }

        Commands::ConnectInfo { id } => {
            let info = group.connect_info(&id).await.context("ConnectInfo failed")?;
            println!("id:       {}", info.id);
            println!("external: {}", info.external_addr);
            println!("internal: {}", info.internal_addr);
        }
    }

    Ok(())
}
