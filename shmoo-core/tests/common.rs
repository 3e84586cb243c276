#![allow(dead_code)]

use async_trait::async_trait;
use shmoo_core::{
    ChainClient, ChainError, Clock, GeneratorConfig, PointEvent, PointEventBus, PointEventHandler,
    PointGenerator, SimulatedChain, StatsRepository, WalletSession, mock_transaction_hash,
};
use shmoo_types::{NetworkInfo, ShmooPoint, UserStats};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const TEST_ADDRESS: &str = "0x1111111111111111111111111111111111111111";

// 2024-03-10T09:00:00Z
pub const MORNING: i64 = 1_710_061_200_000;

/// Chain fake whose answers are queued up front. Empty queues fall back to a
/// fresh hash and a successful confirmation.
#[derive(Default)]
pub struct ScriptedChain {
    submissions: Mutex<VecDeque<Result<String, ChainError>>>,
    confirmations: Mutex<VecDeque<Result<bool, ChainError>>>,
    submit_gate: Option<Arc<Notify>>,
    confirmation_delay: Duration,
    pub submit_calls: AtomicUsize,
    pub confirm_calls: AtomicUsize,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_submission(self, message: &str) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .push_back(Err(ChainError::Rejected(message.to_string())));
        self
    }

    pub fn confirm_with(self, result: Result<bool, ChainError>) -> Self {
        self.confirmations.lock().unwrap().push_back(result);
        self
    }

    /// Submissions block until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.submit_gate = Some(gate);
        self
    }

    pub fn slow_confirmation(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn confirms(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn submit_point_generation(&self, _address: &str) -> Result<String, ChainError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.submit_gate {
            gate.notified().await;
        }
        let scripted = self.submissions.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(mock_transaction_hash()))
    }

    async fn wait_for_confirmation(
        &self,
        _tx_hash: &str,
        _timeout: Duration,
    ) -> Result<bool, ChainError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }
        let scripted = self.confirmations.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(true))
    }

    fn network_info(&self) -> NetworkInfo {
        SimulatedChain::sepolia(Duration::ZERO).network_info()
    }
}

/// In-memory repository that counts writes
#[derive(Default)]
pub struct MemoryRepository {
    records: Mutex<HashMap<String, (UserStats, Vec<ShmooPoint>)>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, address: &str, stats: UserStats, points: Vec<ShmooPoint>) {
        self.records
            .lock()
            .unwrap()
            .insert(address.to_string(), (stats, points));
    }

    pub fn stored(&self, address: &str) -> Option<(UserStats, Vec<ShmooPoint>)> {
        self.records.lock().unwrap().get(address).cloned()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatsRepository for MemoryRepository {
    async fn load(&self, address: &str) -> anyhow::Result<(UserStats, Vec<ShmooPoint>)> {
        Ok(self.stored(address).unwrap_or_default())
    }

    async fn save(
        &self,
        address: &str,
        stats: &UserStats,
        points: &[ShmooPoint],
    ) -> anyhow::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("store unavailable");
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.seed(address, *stats, points.to_vec());
        Ok(())
    }
}

pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn at(millis: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(millis)))
    }

    pub fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Event collector for testing event emissions
#[derive(Default)]
pub struct EventCollector {
    events: Mutex<Vec<PointEvent>>,
}

impl EventCollector {
    pub fn get_events(&self) -> Vec<PointEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn has_event_type(&self, check_fn: impl Fn(&PointEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(check_fn)
    }
}

impl PointEventHandler for EventCollector {
    fn handle_event(&self, event: &PointEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub struct Harness {
    pub generator: Arc<PointGenerator>,
    pub chain: Arc<ScriptedChain>,
    pub repository: Arc<MemoryRepository>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<EventCollector>,
}

pub fn harness(chain: ScriptedChain) -> Harness {
    harness_with(chain, MemoryRepository::new(), GeneratorConfig::default())
}

pub fn harness_with(
    chain: ScriptedChain,
    repository: MemoryRepository,
    config: GeneratorConfig,
) -> Harness {
    let chain = Arc::new(chain);
    let repository = Arc::new(repository);
    let clock = FixedClock::at(MORNING);
    let events = Arc::new(EventCollector::default());
    let bus = PointEventBus::new().with_handler(events.clone());

    let generator = PointGenerator::new(
        WalletSession::connected(TEST_ADDRESS),
        chain.clone(),
        repository.clone(),
    )
    .with_config(config)
    .with_clock(clock.clone())
    .with_event_bus(Arc::new(bus));

    Harness {
        generator: Arc::new(generator),
        chain,
        repository,
        clock,
        events,
    }
}
