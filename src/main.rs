use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passgate::accounts::{self, RegisterRequest};
use passgate::cli::{self, Commands, UserCommands};
use passgate::config::{self, Config};
use passgate::store::{self, PgStore};
use passgate::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    dotenvy::dotenv().ok();
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing(json_logs);

    let cfg = config::load()?;
    tracing::debug!(config = ?cfg, "configuration loaded");

    let result = match args.command {
        Some(Commands::Serve { port }) => run_server(cfg, port).await,
        Some(Commands::Migrate) => run_migrations(&cfg).await,
        Some(Commands::User { command }) => handle_user_command(cfg, command).await,
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "passgate=debug,tower_http=debug".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_server(cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    tracing::info!("Connecting to user store...");
    let store = store::connect(&cfg.database_url, true)
        .await
        .context("failed to open user store")?;

    if !cfg.enforce_ownership {
        tracing::warn!("ENFORCE_OWNERSHIP is off: any authenticated user may modify any record");
    }

    let port = port.unwrap_or(cfg.port);
    let state = Arc::new(AppState::new(cfg, store));
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("passgate listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn run_migrations(cfg: &Config) -> anyhow::Result<()> {
    if cfg.database_url.starts_with("memory:") {
        anyhow::bail!("the in-memory store has no migrations");
    }
    let db = PgStore::connect(&cfg.database_url).await?;
    db.migrate().await?;
    println!("Migrations applied.");
    Ok(())
}

async fn handle_user_command(cfg: Config, cmd: UserCommands) -> anyhow::Result<()> {
    let store = store::connect(&cfg.database_url, false).await?;
    let state = AppState::new(cfg, store);

    match cmd {
        UserCommands::Add {
            client_id,
            email,
            full_name,
            access_key,
        } => {
            let user = accounts::register_user(
                &state,
                RegisterRequest {
                    client_id,
                    email,
                    full_name,
                    access_key,
                },
            )
            .await
            .context("failed to register user")?;
            println!(
                "User created:\n  ID:        {}\n  Client ID: {}\n  Email:     {}",
                user.id, user.client_id, user.email
            );
        }
        UserCommands::List { limit, offset } => {
            let users = state.store.list_users(limit, offset).await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<8} {:<20} {:<30} {:<10}", "ID", "CLIENT_ID", "EMAIL", "DISABLED");
                for u in users {
                    println!("{:<8} {:<20} {:<30} {:<10}", u.id, u.client_id, u.email, u.disabled);
                }
            }
        }
    }
    Ok(())
}
