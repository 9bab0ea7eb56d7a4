use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use nanosession_core::config::{self, Config, StoreBackend};
use nanosession_core::session::store::build_store;
use nanosession_core::session::SessionManager;

#[derive(Parser)]
#[command(
    name = "nanosession",
    about = "nanosession - server-side sessions with opaque cookies",
    version = nanosession_core::VERSION,
)]
struct Cli {
    /// Config file (JSON). Defaults to environment variables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the demo web app (/, /login, /logout)
    Serve {
        /// Address to bind, overrides config
        #[arg(short, long)]
        bind: Option<String>,
        /// Store backend, overrides config (memory, file, dynamodb)
        #[arg(long)]
        store: Option<StoreBackend>,
        /// Allow the session cookie over plain HTTP (local testing)
        #[arg(long)]
        insecure: bool,
    },
    /// Delete expired session records once
    Purge,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nanosession=info".parse()?)
                .add_directive("nanosession_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => config::try_load_config(path)?,
        None => config::load_config_from_env(),
    };

    match cli.command {
        Commands::Serve {
            bind,
            store,
            insecure,
        } => cmd_serve(cfg, bind, store, insecure).await?,
        Commands::Purge => cmd_purge(cfg).await?,
        Commands::Config => cmd_config(&cfg)?,
    }

    Ok(())
}

async fn cmd_serve(
    mut cfg: Config,
    bind: Option<String>,
    store: Option<StoreBackend>,
    insecure: bool,
) -> Result<()> {
    if let Some(bind) = bind {
        cfg.http.bind = bind;
    }
    if let Some(store) = store {
        cfg.store.backend = store;
    }
    if insecure {
        cfg.session.secure = false;
    }

    let store = build_store(&cfg.store).await?;
    let manager = SessionManager::new(store, cfg.session.clone());

    let sweeper = (cfg.store.sweep_interval_secs > 0).then(|| {
        nanosession_core::service::sweeper::spawn_sweeper(
            manager.clone(),
            Duration::from_secs(cfg.store.sweep_interval_secs),
        )
    });

    #[cfg(feature = "http-api")]
    {
        use nanosession_core::service::http::{serve, AppState};

        info!(
            "Starting nanosession on {} (store: {}, fail policy: {:?})",
            cfg.http.bind,
            manager.store().name(),
            cfg.session.fail_policy
        );
        let state = std::sync::Arc::new(AppState::new(manager));
        let result = serve(&cfg.http.bind, state).await;
        if let Some(handle) = sweeper {
            handle.abort();
        }
        return result;
    }

    #[cfg(not(feature = "http-api"))]
    {
        drop((manager, sweeper));
        eprintln!("HTTP app not available. Rebuild with: cargo build --features http-api");
        std::process::exit(1);
    }
}

async fn cmd_purge(cfg: Config) -> Result<()> {
    let store = build_store(&cfg.store).await?;
    let manager = SessionManager::new(store, cfg.session);
    let removed = manager.purge_expired().await?;
    info!("Removed {} expired sessions ({})", removed, manager.store().name());
    Ok(())
}

fn cmd_config(cfg: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(cfg)?);
    Ok(())
}
