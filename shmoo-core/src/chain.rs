use async_trait::async_trait;
use shmoo_types::{NetworkInfo, OnChainPoint, WalletAddress, ZERO_ADDRESS};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::StatsRepository;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("{0}")]
    Rejected(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The facts the core reads from the wallet connector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSession {
    pub address: Option<WalletAddress>,
    pub is_connected: bool,
}

impl WalletSession {
    pub fn connected(address: impl Into<WalletAddress>) -> Self {
        Self {
            address: Some(address.into()),
            is_connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// The address to act for, only while the wallet is connected
    pub fn connected_address(&self) -> Option<&str> {
        if !self.is_connected {
            return None;
        }
        self.address.as_deref().filter(|a| !a.is_empty())
    }
}

/// Remote side of a point generation: a contract write plus a receipt wait
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Send the `generateShmooPoint` write for `address`, returning the hex tx hash
    async fn submit_point_generation(&self, address: &str) -> Result<String, ChainError>;

    /// Resolve `true` once the transaction is mined successfully, `false` if
    /// it was mined with a failure status
    async fn wait_for_confirmation(
        &self,
        tx_hash: &str,
        timeout: Duration,
    ) -> Result<bool, ChainError>;

    fn network_info(&self) -> NetworkInfo;

    /// Points the contract has recorded for `address`, if the backend can tell
    async fn user_point_count(&self, _address: &str) -> Result<Option<u64>, ChainError> {
        Ok(None)
    }

    /// The contract's point history for `address`, if the backend can tell
    async fn user_points(&self, _address: &str) -> Result<Option<Vec<OnChainPoint>>, ChainError> {
        Ok(None)
    }
}

/// Random 32 byte hex hash, shaped like a real transaction hash
pub fn mock_transaction_hash() -> String {
    format!(
        "0x{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Stands in for the contract when none is deployed
pub struct SimulatedChain {
    delay: Duration,
    network: NetworkInfo,
    ledger: Option<Arc<dyn StatsRepository>>,
}

impl SimulatedChain {
    pub fn new(delay: Duration, network: NetworkInfo) -> Self {
        Self {
            delay,
            network,
            ledger: None,
        }
    }

    /// Answer contract reads from the stored records, since nothing is on-chain
    pub fn with_ledger(mut self, ledger: Arc<dyn StatsRepository>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn sepolia(delay: Duration) -> Self {
        Self::new(
            delay,
            NetworkInfo {
                name: "Sepolia".to_string(),
                chain_id: 11_155_111,
                contract_address: ZERO_ADDRESS.to_string(),
                explorer_url: Some("https://sepolia.etherscan.io".to_string()),
            },
        )
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn submit_point_generation(&self, address: &str) -> Result<String, ChainError> {
        if address.is_empty() {
            return Err(ChainError::WalletNotConnected);
        }

        tokio::time::sleep(self.delay).await;
        let hash = mock_transaction_hash();
        debug!("Simulated point generation for {}: {}", address, hash);
        Ok(hash)
    }

    async fn wait_for_confirmation(
        &self,
        _tx_hash: &str,
        _timeout: Duration,
    ) -> Result<bool, ChainError> {
        Ok(true)
    }

    fn network_info(&self) -> NetworkInfo {
        self.network.clone()
    }

    async fn user_point_count(&self, address: &str) -> Result<Option<u64>, ChainError> {
        let Some(ledger) = &self.ledger else {
            return Ok(None);
        };
        let (stats, _) = ledger
            .load(address)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Some(stats.total_clicks))
    }

    async fn user_points(&self, address: &str) -> Result<Option<Vec<OnChainPoint>>, ChainError> {
        let Some(ledger) = &self.ledger else {
            return Ok(None);
        };
        let (_, points) = ledger
            .load(address)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(Some(points.iter().map(OnChainPoint::from_recorded).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_hash_shape() {
        let hash = mock_transaction_hash();

        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 66);
        assert!(hash[2..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash, mock_transaction_hash());
    }

    #[test]
    fn test_wallet_session_address() {
        assert_eq!(
            WalletSession::connected("0xabc").connected_address(),
            Some("0xabc")
        );
        assert_eq!(WalletSession::disconnected().connected_address(), None);

        let stale = WalletSession {
            address: Some("0xabc".to_string()),
            is_connected: false,
        };
        assert_eq!(stale.connected_address(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_chain_waits_then_confirms() {
        let chain = SimulatedChain::sepolia(Duration::from_millis(1500));
        let started = tokio::time::Instant::now();

        let hash = chain.submit_point_generation("0xabc").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(
            chain
                .wait_for_confirmation(&hash, Duration::from_secs(60))
                .await
                .unwrap()
        );
        assert!(chain.network_info().is_simulated());
        assert_eq!(chain.user_point_count("0xabc").await.unwrap(), None);
    }

    struct OneRecord;

    #[async_trait]
    impl StatsRepository for OneRecord {
        async fn load(
            &self,
            address: &str,
        ) -> anyhow::Result<(shmoo_types::UserStats, Vec<shmoo_types::ShmooPoint>)> {
            let stats = shmoo_types::UserStats {
                total_clicks: 7,
                ..Default::default()
            };
            let point =
                shmoo_types::ShmooPoint::confirmed(address.to_string(), "0xbeef".to_string(), 42);
            Ok((stats, vec![point]))
        }

        async fn save(
            &self,
            _address: &str,
            _stats: &shmoo_types::UserStats,
            _points: &[shmoo_types::ShmooPoint],
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_simulated_reads_mirror_ledger() {
        let chain = SimulatedChain::sepolia(Duration::ZERO).with_ledger(Arc::new(OneRecord));

        assert_eq!(chain.user_point_count("0xabc").await.unwrap(), Some(7));
        let points = chain.user_points("0xabc").await.unwrap().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].user, "0xabc");
        assert_eq!(points[0].point_id, "0xbeef");
    }

    #[tokio::test]
    async fn test_simulated_chain_requires_address() {
        let chain = SimulatedChain::sepolia(Duration::ZERO);
        let result = chain.submit_point_generation("").await;
        assert!(matches!(result, Err(ChainError::WalletNotConnected)));
    }
}
