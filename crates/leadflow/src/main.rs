// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadflow - lead ingestion, weighted distribution, and agent presence.
//!
//! This is the binary entry point for the Leadflow service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod distribute;
mod scheduler;
mod serve;
mod shutdown;
mod status;

use clap::{Parser, Subcommand};
use leadflow_core::LeadStatus;

/// Leadflow - lead ingestion, weighted distribution, and agent presence.
#[derive(Parser, Debug)]
#[command(name = "leadflow", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Leadflow service (gateway, ingest watcher, scheduler).
    Serve,
    /// Show whether a running instance is healthy.
    Status {
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Run one batch distribution pass and exit.
    Distribute {
        /// Which pool to sweep.
        #[arg(long, default_value = "available")]
        status: LeadStatus,
        /// Honor the dwell window instead of assigning everything now.
        #[arg(long)]
        honor_delay: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match leadflow_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            leadflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Distribute {
            status,
            honor_delay,
        }) => {
            serve::init_tracing(&config.service.log_level);
            match distribute::run_distribute(config, status, honor_delay).await {
                Ok(report) => {
                    println!(
                        "assigned: {}  queued: {}  errors: {}",
                        report.assigned, report.queued, report.errors
                    );
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Some(Commands::Config) => {
            match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    print!("{rendered}");
                    Ok(())
                }
                Err(e) => Err(leadflow_core::LeadflowError::Internal(format!(
                    "cannot render config: {e}"
                ))),
            }
        }
        None => {
            println!("leadflow: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Default config is valid without any config file present.
        let config = leadflow_config::load_and_validate()
            .expect("default config should be valid");
        assert_eq!(config.service.name, "leadflow");
    }
}
