use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use shmoo_core::{
    ChainClient, Clock, GeneratorConfig, PointEventBus, PointGenerator, StatsRepository,
    SystemClock, TracingEventHandler, WalletSession,
};
use shmoo_types::{EpochMillis, NetworkInfo};

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern is valid")
});

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),
    #[error("Failed to load session: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Validate a wallet address and return its lowercase form
pub fn normalize_address(address: &str) -> Result<String, SessionError> {
    if ADDRESS_PATTERN.is_match(address) {
        Ok(address.to_ascii_lowercase())
    } else {
        Err(SessionError::InvalidAddress(address.to_string()))
    }
}

/// One point generator per wallet address, created on first use
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<PointGenerator>>>,
    chain: Arc<dyn ChainClient>,
    repository: Arc<dyn StatsRepository>,
    events: Arc<PointEventBus>,
    clock: Arc<dyn Clock>,
    config: GeneratorConfig,
}

impl SessionManager {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        repository: Arc<dyn StatsRepository>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            chain,
            repository,
            events: Arc::new(PointEventBus::new().with_handler(Arc::new(TracingEventHandler))),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Session for an address, loading its stats from the repository the
    /// first time the address is seen. Every lookup counts as activity.
    pub async fn session(&self, address: &str) -> Result<Arc<PointGenerator>, SessionError> {
        let address = normalize_address(address)?;

        if let Some(session) = self.sessions.read().await.get(&address) {
            session.touch();
            return Ok(session.clone());
        }

        let generator = PointGenerator::new(
            WalletSession::connected(address.clone()),
            self.chain.clone(),
            self.repository.clone(),
        )
        .with_config(self.config.clone())
        .with_clock(self.clock.clone())
        .with_event_bus(self.events.clone());
        generator.load_session().await?;

        let mut sessions = self.sessions.write().await;
        // Another request may have loaded the same address meanwhile
        let session = sessions
            .entry(address.clone())
            .or_insert_with(|| {
                info!("Opened session for {}", address);
                Arc::new(generator)
            })
            .clone();
        session.touch();
        Ok(session)
    }

    pub async fn existing_session(&self, address: &str) -> Option<Arc<PointGenerator>> {
        let address = normalize_address(address).ok()?;
        self.sessions.read().await.get(&address).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than `timeout`. Sessions with an
    /// attempt in flight or still held by a caller are kept, so an address
    /// never ends up with two generators. Returns how many were removed.
    pub async fn cleanup_idle_sessions(&self, timeout: Duration) -> usize {
        let now = self.clock.now_millis();
        let timeout_millis = timeout.as_millis() as i64;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|address, session| {
            let idle = now - session.last_activity() > timeout_millis;
            let in_use = Arc::strong_count(session) > 1;
            let keep = session.is_generating() || in_use || !idle;
            if !keep {
                info!("Closed idle session for {}", address);
            }
            keep
        });
        before - sessions.len()
    }

    pub fn network_info(&self) -> NetworkInfo {
        self.chain.network_info()
    }

    pub fn now_millis(&self) -> EpochMillis {
        self.clock.now_millis()
    }
}
