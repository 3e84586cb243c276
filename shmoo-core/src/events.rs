use shmoo_types::{FailureKind, ShmooPoint, UserStats, WalletAddress};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum PointEvent {
    AttemptStarted {
        address: WalletAddress,
        attempt: u64,
    },
    Submitted {
        address: WalletAddress,
        tx_hash: String,
    },
    Confirmed {
        address: WalletAddress,
        point: ShmooPoint,
        stats: UserStats,
    },
    Failed {
        address: WalletAddress,
        kind: FailureKind,
        message: String,
        tx_hash: Option<String>,
    },
    ClickDropped {
        address: WalletAddress,
    },
    Reset {
        address: WalletAddress,
    },
}

impl PointEvent {
    pub fn address(&self) -> &str {
        match self {
            PointEvent::AttemptStarted { address, .. } => address,
            PointEvent::Submitted { address, .. } => address,
            PointEvent::Confirmed { address, .. } => address,
            PointEvent::Failed { address, .. } => address,
            PointEvent::ClickDropped { address } => address,
            PointEvent::Reset { address } => address,
        }
    }
}

/// Event handler trait for observing point generation
pub trait PointEventHandler: Send + Sync {
    fn handle_event(&self, event: &PointEvent);
}

/// Fans point events out to every registered handler
#[derive(Default)]
pub struct PointEventBus {
    handlers: Vec<Arc<dyn PointEventHandler>>,
}

impl PointEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&mut self, handler: Arc<dyn PointEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn PointEventHandler>) -> Self {
        self.add_handler(handler);
        self
    }

    pub fn publish(&self, event: PointEvent) {
        for handler in &self.handlers {
            handler.handle_event(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Writes every lifecycle event to the log
pub struct TracingEventHandler;

impl PointEventHandler for TracingEventHandler {
    fn handle_event(&self, event: &PointEvent) {
        match event {
            PointEvent::AttemptStarted { address, attempt } => {
                debug!("Attempt {} started for {}", attempt, address)
            }
            PointEvent::Submitted { address, tx_hash } => {
                info!("Point generation submitted for {}: {}", address, tx_hash)
            }
            PointEvent::Confirmed {
                address,
                point,
                stats,
            } => info!(
                "Point {} confirmed for {} (total {}, streak {})",
                point.point_id, address, stats.total_clicks, stats.streak_count
            ),
            PointEvent::Failed {
                address,
                kind,
                message,
                ..
            } => warn!("Point generation failed for {} ({:?}): {}", address, kind, message),
            PointEvent::ClickDropped { address } => {
                debug!("Dropped click for {}, attempt already pending", address)
            }
            PointEvent::Reset { address } => debug!("Transaction status reset for {}", address),
        }
    }
}
