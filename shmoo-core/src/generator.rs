use shmoo_types::{
    EpochMillis, FailureKind, NetworkInfo, OnChainPoint, ShmooPoint, TransactionSnapshot,
    TransactionStatus, UserStats,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, warn};

use crate::{
    ChainClient, ChainError, PointEvent, PointEventBus, RetentionPolicy, StatsCalculator,
    StatsRepository, WalletSession, recent_points,
};

pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate Shmoo point. Please try again.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Submission(String),
    #[error("Transaction confirmation timed out")]
    ConfirmationTimeout,
    #[error("{0}")]
    ConfirmationFailure(String),
    #[error("A point generation is already pending")]
    AlreadyGenerating,
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("Cannot retry while {current}")]
    InvalidState { current: TransactionStatus },
}

impl GenerationError {
    /// The failed-state classification, for errors that end an attempt
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            GenerationError::Submission(_) => Some(FailureKind::Submission),
            GenerationError::ConfirmationTimeout => Some(FailureKind::ConfirmationTimeout),
            GenerationError::ConfirmationFailure(_) => Some(FailureKind::ConfirmationFailure),
            _ => None,
        }
    }
}

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> EpochMillis;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> EpochMillis {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub confirmation_timeout: Duration,
    pub confirmed_display: Duration, // how long `confirmed` shows before going back to idle
    pub retention: RetentionPolicy,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(60),
            confirmed_display: Duration::from_secs(3),
            retention: RetentionPolicy::default(),
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    stats: UserStats,
    points: Vec<ShmooPoint>, // newest first
}

/// Drives point generation for one wallet session through
/// `idle -> pending -> confirmed | failed`.
pub struct PointGenerator {
    wallet: WalletSession,
    chain: Arc<dyn ChainClient>,
    repository: Arc<dyn StatsRepository>,
    clock: Arc<dyn Clock>,
    events: Arc<PointEventBus>,
    config: GeneratorConfig,
    session: RwLock<Session>,
    status: Arc<watch::Sender<TransactionSnapshot>>,
    attempts: Arc<AtomicU64>,
    is_generating: AtomicBool,
    last_activity: AtomicI64,
}

impl PointGenerator {
    pub fn new(
        wallet: WalletSession,
        chain: Arc<dyn ChainClient>,
        repository: Arc<dyn StatsRepository>,
    ) -> Self {
        let (status, _) = watch::channel(TransactionSnapshot::idle());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let now = clock.now_millis();

        Self {
            wallet,
            chain,
            repository,
            clock,
            events: Arc::new(PointEventBus::new()),
            config: GeneratorConfig::default(),
            session: RwLock::new(Session::default()),
            status: Arc::new(status),
            attempts: Arc::new(AtomicU64::new(0)),
            is_generating: AtomicBool::new(false),
            last_activity: AtomicI64::new(now),
        }
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.last_activity = AtomicI64::new(clock.now_millis());
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<PointEventBus>) -> Self {
        self.events = events;
        self
    }

    /// Replace the in-memory session with what the repository holds for
    /// the connected address. Without a connected wallet there is nothing
    /// to key by and the session stays empty.
    pub async fn load_session(&self) -> anyhow::Result<()> {
        let Some(address) = self.wallet.connected_address() else {
            return Ok(());
        };

        let (stats, points) = self.repository.load(address).await?;
        let mut session = self.session.write().await;
        session.stats = stats;
        session.points = points;
        Ok(())
    }

    /// Run one full attempt. The status is `pending` before the first
    /// external call is awaited. A click while an attempt is pending is
    /// dropped with [`GenerationError::AlreadyGenerating`].
    ///
    /// The attempt runs on its own task, so it completes and records its
    /// point even if the caller stops waiting.
    pub async fn generate(self: &Arc<Self>) -> Result<ShmooPoint, GenerationError> {
        let address = self
            .wallet
            .connected_address()
            .ok_or(GenerationError::WalletNotConnected)?
            .to_string();

        if self
            .is_generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.events.publish(PointEvent::ClickDropped { address });
            return Err(GenerationError::AlreadyGenerating);
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_replace(TransactionSnapshot::pending(None));
        self.touch();
        self.events.publish(PointEvent::AttemptStarted {
            address: address.clone(),
            attempt,
        });

        let generator = Arc::clone(self);
        let task_address = address.clone();
        let task = tokio::spawn(async move {
            let result = generator.run_attempt(&task_address).await;
            generator.finish_attempt(attempt, task_address, result.is_ok());
            result
        });

        match task.await {
            Ok(result) => result,
            Err(err) => {
                error!("Point generation for {} aborted: {}", address, err);
                let failure = self.fail(
                    &address,
                    GenerationError::ConfirmationFailure(GENERIC_FAILURE_MESSAGE.to_string()),
                    None,
                );
                self.is_generating.store(false, Ordering::Release);
                Err(failure)
            }
        }
    }

    /// Start a fresh attempt after a failure. Nothing from the failed
    /// attempt is reused.
    pub async fn retry(self: &Arc<Self>) -> Result<ShmooPoint, GenerationError> {
        let current = self.status.borrow().status;
        if current != TransactionStatus::Failed {
            return Err(GenerationError::InvalidState { current });
        }
        self.generate().await
    }

    async fn run_attempt(&self, address: &str) -> Result<ShmooPoint, GenerationError> {
        let tx_hash = match self.chain.submit_point_generation(address).await {
            Ok(hash) => hash,
            Err(err) => {
                return Err(self.fail(address, GenerationError::Submission(err.to_string()), None));
            }
        };

        self.status
            .send_replace(TransactionSnapshot::pending(Some(tx_hash.clone())));
        self.events.publish(PointEvent::Submitted {
            address: address.to_string(),
            tx_hash: tx_hash.clone(),
        });

        let timeout = self.config.confirmation_timeout;
        let confirmation =
            tokio::time::timeout(timeout, self.chain.wait_for_confirmation(&tx_hash, timeout))
                .await;

        match confirmation {
            Ok(Ok(true)) => Ok(self.commit(address, tx_hash).await),
            Ok(Ok(false)) => Err(self.fail(
                address,
                GenerationError::ConfirmationFailure(GENERIC_FAILURE_MESSAGE.to_string()),
                Some(tx_hash),
            )),
            Ok(Err(ChainError::Timeout(_))) | Err(_) => Err(self.fail(
                address,
                GenerationError::ConfirmationTimeout,
                Some(tx_hash),
            )),
            Ok(Err(err)) => {
                warn!("Error waiting for transaction {}: {}", tx_hash, err);
                Err(self.fail(
                    address,
                    GenerationError::ConfirmationFailure(GENERIC_FAILURE_MESSAGE.to_string()),
                    Some(tx_hash),
                ))
            }
        }
    }

    /// Apply a confirmed point: new stats, prepend the point, trim, persist
    async fn commit(&self, address: &str, tx_hash: String) -> ShmooPoint {
        let now = self.clock.now_millis();
        let point = ShmooPoint::confirmed(address.to_string(), tx_hash.clone(), now);

        let (stats, mut points) = {
            let session = self.session.read().await;
            let stats = StatsCalculator::next_stats(&session.stats, now);
            let mut points = Vec::with_capacity(session.points.len() + 1);
            points.push(point.clone());
            points.extend(session.points.iter().cloned());
            (stats, points)
        };

        let dropped = self.config.retention.apply(&mut points);
        if dropped > 0 {
            debug!("Dropped {} old points for {}", dropped, address);
        }

        // The chain already has the point, so a store failure must not undo it
        if let Err(err) = self.repository.save(address, &stats, &points).await {
            error!("Failed to persist stats for {}: {:#}", address, err);
        }

        {
            let mut session = self.session.write().await;
            session.stats = stats;
            session.points = points;
        }

        self.status
            .send_replace(TransactionSnapshot::confirmed(tx_hash));
        self.events.publish(PointEvent::Confirmed {
            address: address.to_string(),
            point: point.clone(),
            stats,
        });
        point
    }

    fn fail(
        &self,
        address: &str,
        err: GenerationError,
        tx_hash: Option<String>,
    ) -> GenerationError {
        let kind = err
            .failure_kind()
            .unwrap_or(FailureKind::ConfirmationFailure);
        let message = err.to_string();

        self.status.send_replace(TransactionSnapshot::failed(
            kind,
            message.clone(),
            tx_hash.clone(),
        ));
        self.events.publish(PointEvent::Failed {
            address: address.to_string(),
            kind,
            message,
            tx_hash,
        });
        err
    }

    fn schedule_reset(&self, attempt: u64, address: String) {
        let status = Arc::clone(&self.status);
        let attempts = Arc::clone(&self.attempts);
        let events = Arc::clone(&self.events);
        let delay = self.config.confirmed_display;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // A newer attempt owns the status now
            if attempts.load(Ordering::SeqCst) != attempt {
                return;
            }

            let reset = status.send_if_modified(|snapshot| {
                if snapshot.status == TransactionStatus::Confirmed {
                    *snapshot = TransactionSnapshot::idle();
                    true
                } else {
                    false
                }
            });
            if reset {
                events.publish(PointEvent::Reset { address });
            }
        });
    }

    fn finish_attempt(&self, attempt: u64, address: String, confirmed: bool) {
        self.is_generating.store(false, Ordering::Release);
        self.touch();
        if confirmed {
            self.schedule_reset(attempt, address);
        }
    }

    /// Record activity without changing any state
    pub fn touch(&self) {
        self.last_activity
            .store(self.clock.now_millis(), Ordering::Relaxed);
    }

    pub fn wallet(&self) -> &WalletSession {
        &self.wallet
    }

    pub fn snapshot(&self) -> TransactionSnapshot {
        self.status.borrow().clone()
    }

    pub fn status(&self) -> TransactionStatus {
        self.status.borrow().status
    }

    /// Receiver that sees every status change, for re-rendering
    pub fn subscribe(&self) -> watch::Receiver<TransactionSnapshot> {
        self.status.subscribe()
    }

    pub fn is_generating(&self) -> bool {
        self.is_generating.load(Ordering::Acquire)
    }

    pub fn last_activity(&self) -> EpochMillis {
        self.last_activity.load(Ordering::Relaxed)
    }

    pub async fn stats(&self) -> UserStats {
        self.session.read().await.stats
    }

    pub async fn points(&self) -> Vec<ShmooPoint> {
        self.session.read().await.points.clone()
    }

    pub async fn recent_points(&self, limit: usize) -> Vec<ShmooPoint> {
        let session = self.session.read().await;
        recent_points(&session.points, limit).to_vec()
    }

    pub async fn point_count(&self) -> usize {
        self.session.read().await.points.len()
    }

    pub fn network_info(&self) -> NetworkInfo {
        self.chain.network_info()
    }

    /// Point count according to the contract, when the chain client can read it
    pub async fn on_chain_point_count(&self) -> Option<u64> {
        let address = self.wallet.connected_address()?;
        match self.chain.user_point_count(address).await {
            Ok(count) => count,
            Err(err) => {
                warn!("Error fetching on-chain point count for {}: {}", address, err);
                None
            }
        }
    }

    /// Point history according to the contract. Read failures are logged
    /// and come back as an empty list.
    pub async fn on_chain_points(&self) -> Vec<OnChainPoint> {
        let Some(address) = self.wallet.connected_address() else {
            return Vec::new();
        };
        match self.chain.user_points(address).await {
            Ok(points) => points.unwrap_or_default(),
            Err(err) => {
                warn!("Error fetching on-chain points for {}: {}", address, err);
                Vec::new()
            }
        }
    }
}
