use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use shmoo_persistence::{
    KeyValueStore, KvStatsRepository, MemoryStore, SqliteStore, connection::connect_and_migrate,
};
use shmoo_core::StatsRepository;
use shmoo_server::{
    config::Config, create_routes, network::build_chain_client, session_manager::SessionManager,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Shmoo Clicker server...");

    let config = match Config::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to read configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn KeyValueStore> = if config.in_memory_store {
        info!("Using in-memory store, stats are lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        match connect_and_migrate(&config.database_url).await {
            Ok(db) => Arc::new(SqliteStore::new(db)),
            Err(e) => {
                error!("Failed to connect to database and run migrations: {}", e);
                std::process::exit(1);
            }
        }
    };
    let repository: Arc<dyn StatsRepository> = Arc::new(KvStatsRepository::new(store));

    let chain = match build_chain_client(&config, repository.clone()) {
        Ok(chain) => chain,
        Err(e) => {
            error!("Failed to set up chain client: {}", e);
            std::process::exit(1);
        }
    };

    let session_manager = Arc::new(SessionManager::new(
        chain,
        repository,
        config.generator_config(),
    ));
    let routes = create_routes(session_manager.clone());

    // Start cleanup task
    let cleanup_session_manager = session_manager.clone();
    let session_timeout = config.session_timeout();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = cleanup_session_manager
                .cleanup_idle_sessions(session_timeout)
                .await;
            if removed > 0 {
                info!("Cleaned up {} idle sessions", removed);
            }
        }
    });

    let ip = match config.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid HOST {:?}: {}", config.host, e);
            std::process::exit(1);
        }
    };
    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown((ip, config.port), shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let (mut sigint, mut sigterm) = match (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            _ => {
                error!("Failed to install signal handlers");
                std::process::exit(1);
            }
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
