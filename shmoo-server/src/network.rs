use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::rpc_client::RpcChainClient;
use shmoo_core::{ChainClient, ChainError, SimulatedChain, StatsRepository};
use shmoo_types::NetworkInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPreset {
    Mainnet,
    Sepolia,
}

impl ChainPreset {
    /// Unknown names fall back to Sepolia
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "ethereum" => ChainPreset::Mainnet,
            _ => ChainPreset::Sepolia,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChainPreset::Mainnet => "Ethereum",
            ChainPreset::Sepolia => "Sepolia",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            ChainPreset::Mainnet => 1,
            ChainPreset::Sepolia => 11_155_111,
        }
    }

    pub fn explorer_url(&self) -> &'static str {
        match self {
            ChainPreset::Mainnet => "https://etherscan.io",
            ChainPreset::Sepolia => "https://sepolia.etherscan.io",
        }
    }

    pub fn alchemy_url(&self, api_key: &str) -> String {
        match self {
            ChainPreset::Mainnet => format!("https://eth-mainnet.g.alchemy.com/v2/{}", api_key),
            ChainPreset::Sepolia => format!("https://eth-sepolia.g.alchemy.com/v2/{}", api_key),
        }
    }

    pub fn network_info(&self, contract_address: &str) -> NetworkInfo {
        NetworkInfo {
            name: self.display_name().to_string(),
            chain_id: self.chain_id(),
            contract_address: contract_address.to_string(),
            explorer_url: Some(self.explorer_url().to_string()),
        }
    }
}

/// The simulated chain while no contract is deployed, JSON-RPC otherwise.
/// Simulated reads answer from `ledger`.
pub fn build_chain_client(
    config: &Config,
    ledger: Arc<dyn StatsRepository>,
) -> Result<Arc<dyn ChainClient>, ChainError> {
    let preset = ChainPreset::from_name(&config.network);
    let network = preset.network_info(&config.contract_address);

    if network.is_simulated() {
        info!(
            "No contract configured for {}, simulating transactions",
            network.name
        );
        return Ok(Arc::new(
            SimulatedChain::new(config.simulated_delay(), network).with_ledger(ledger),
        ));
    }

    let rpc_url = config
        .rpc_url
        .clone()
        .unwrap_or_else(|| preset.alchemy_url(&config.alchemy_api_key));
    info!(
        "Using contract {} on {} (chain {})",
        network.contract_address, network.name, network.chain_id
    );
    Ok(Arc::new(RpcChainClient::new(&rpc_url, network)?))
}
