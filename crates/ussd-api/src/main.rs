//! USSD service entry point.
//!
//! Binary name: `ussd`
//!
//! Parses CLI arguments, loads configuration, then starts the gateway server or
//! runs a maintenance command.

mod cli;
mod http;
mod state;

use clap::Parser;

use cli::{CatalogCommand, Cli, Commands, CustomerCommand};
use state::AppState;
use ussd_infra::config::load_config;
use ussd_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
use ussd_types::config::UssdConfig;
use ussd_types::customer::NewCustomer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    let options = TracingOptions::new(cli.log_filter())
        .with_json(cli.log_json)
        .with_otel(otel);
    init_tracing(&options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config = load_config(&cli.config).await;
    let result = run(cli, config).await;

    shutdown_tracing();
    result
}

async fn run(cli: Cli, mut config: UssdConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { host, port, .. } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await?;
        }

        Commands::Catalog { action } => match action {
            CatalogCommand::Check => cli::catalog::check(&config, cli.json).await?,
        },

        Commands::Customer { action } => match action {
            CustomerCommand::Add {
                phone,
                name,
                network,
                locale,
            } => {
                let pool = state::open_database(&config).await?;
                let repo = state::customer_repository(&config, pool)?;
                let customer = NewCustomer {
                    phone,
                    display_name: name,
                    network_operator: network,
                    locale,
                };
                cli::customer::add(&repo, customer, cli.json).await?;
            }
        },
    }

    Ok(())
}

async fn serve(config: UssdConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::init(config).await?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, "gateway endpoint listening");
    println!(
        "  {} USSD gateway endpoint listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}/ussd")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
