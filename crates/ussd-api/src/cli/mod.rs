//! CLI command definitions for the `ussd` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod catalog;
pub mod customer;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// USSD session service.
#[derive(Parser)]
#[command(name = "ussd", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Service configuration file.
    #[arg(
        long,
        global = true,
        env = "USSD_CONFIG",
        default_value = "config/ussd.toml"
    )]
    pub config: PathBuf,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress all output except errors.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway HTTP server.
    Serve {
        /// Address to bind (overrides the config file).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file).
        #[arg(long, short)]
        port: Option<u16>,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Inspect the step catalog.
    Catalog {
        #[command(subcommand)]
        action: CatalogCommand,
    },

    /// Manage registered customers.
    Customer {
        #[command(subcommand)]
        action: CustomerCommand,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommand {
    /// Load and verify the catalog and locales without starting the server.
    Check,
}

#[derive(Subcommand)]
pub enum CustomerCommand {
    /// Register a customer so their sessions start on the home step.
    Add {
        /// Phone number (MSISDN).
        #[arg(long)]
        phone: String,

        /// Display name (stored encrypted).
        #[arg(long)]
        name: String,

        /// Mobile network operator.
        #[arg(long)]
        network: String,

        /// Preferred language code.
        #[arg(long)]
        locale: Option<String>,
    },
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,ussd_core=debug,ussd_api=debug",
            _ => "trace",
        }
    }
}
