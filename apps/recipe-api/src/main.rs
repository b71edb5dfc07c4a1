//! Recipe API Server binary.

use std::net::SocketAddr;

use api_protocol::CreateUserRequest;
use clap::{Parser, Subcommand};
use recipe_api::{config::Config, create_app, create_state, init_tracing, services::AccountService};
use recipe_store::{MemoryStore, PgStore, Store, wait_for_database};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait for the database, apply migrations and serve HTTP (default)
    Serve,
    /// Block until the database accepts connections
    WaitForDb,
    /// Create a user with the staff and superuser flags set
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RECIPE_SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::WaitForDb => {
            let url = require_database_url(&config)?;
            wait_for_database(url, config.db_wait_interval).await?;
            Ok(())
        }
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let store = connect(&config).await?;
            let state = create_state(config, store);
            let user = AccountService::new(&state.store, &state.jwt_manager)
                .create_superuser(CreateUserRequest {
                    email: Some(email),
                    password: Some(password),
                    name,
                })
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create superuser: {e:?}"))?;

            info!(user_id = %user.id, email = %user.email, "Superuser created");
            Ok(())
        }
    }
}

fn require_database_url(config: &Config) -> anyhow::Result<&str> {
    config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for this command"))
}

/// Waits for the database, connects and applies pending migrations.
async fn connect(config: &Config) -> anyhow::Result<PgStore> {
    let url = require_database_url(config)?;
    wait_for_database(url, config.db_wait_interval).await?;

    let store = PgStore::connect(url, config.db_max_connections).await?;
    let applied = store.migrate().await?;
    info!(applied, "Database migrations complete");

    Ok(store)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Starting Recipe API Server");

    if config.uses_development_secret() {
        warn!("RECIPE_JWT_SECRET not set, using the development secret");
    }

    if config.database_url.is_some() {
        let store = connect(&config).await?;
        run(config, store).await
    } else {
        warn!("DATABASE_URL not set, using in-memory store; data will not persist");
        run(config, MemoryStore::new()).await
    }
}

async fn run<S: Store + 'static>(config: Config, store: S) -> anyhow::Result<()> {
    let addr: SocketAddr = config.server_addr().parse()?;

    let state = create_state(config, store);
    let app = create_app(state);

    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
