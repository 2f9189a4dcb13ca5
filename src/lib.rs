pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod forms;
pub mod i18n;
pub mod services;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, GdprCommands, UserCommands};
pub use config::Config;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config)?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Serve => run_server(config, prometheus_handle).await,

        Commands::User { command } => match command {
            UserCommands::Create {
                email,
                password,
                profile,
            } => cli::cmd_user_create(&config, email, password, profile).await,
            UserCommands::Update {
                id,
                email,
                password,
                profile,
            } => cli::cmd_user_update(&config, id, email, password, profile).await,
        },

        Commands::LoginAttempts { email, limit } => {
            cli::cmd_login_attempts(&config, &email, limit).await
        }

        Commands::PasswordReset { email } => cli::cmd_password_reset(&config, email).await,

        Commands::Gdpr { command } => match command {
            GdprCommands::Download { user_id, output } => {
                cli::cmd_gdpr_download(&config, user_id, output.as_deref()).await
            }
            GdprCommands::Delete { user_id, yes } => {
                cli::cmd_gdpr_delete(&config, user_id, yes).await
            }
        },

        Commands::Init => {
            let path = PathBuf::from("config.toml");
            if path.exists() {
                println!("config.toml already exists, leaving it untouched.");
            } else {
                Config::default().save_to_path(&path)?;
                println!("✓ Config file created. Edit config.toml and run again.");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder.build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("crm-users v{} starting...", env!("CARGO_PKG_VERSION"));

    if !config.server.enabled {
        info!("Web API disabled in config (server.enabled = false)");
        return Ok(());
    }

    let port = config.server.port;
    let shared = Arc::new(SharedState::new(config).await?);
    shared.store.ping().await?;

    let api_state = api::create_app_state(shared, prometheus_handle);
    let app = api::router(api_state).await;

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("Web API running at http://0.0.0.0:{}", port);
        if let Err(e) = axum::serve(listener, app).await {
            error!("Web server error: {}", e);
        }
    });

    info!("Server running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Server stopped");

    Ok(())
}
