use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Value, json};
use sha3::{Digest, Keccak256};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use shmoo_core::{ChainClient, ChainError};
use shmoo_types::{NetworkInfo, OnChainPoint};

pub const GENERATE_POINT_SIGNATURE: &str = "generateShmooPoint()";
pub const USER_POINT_COUNT_SIGNATURE: &str = "getUserPointCount(address)";
pub const USER_POINTS_SIGNATURE: &str = "getUserPoints(address)";

const WORD: usize = 32;

/// EIP-1193 code wallets return when the user rejects a request
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub request_timeout: Duration,
    pub connection_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            receipt_poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, serde::Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// First four bytes of the Keccak-256 of a function signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// ABI call data for a function taking only address arguments
pub fn encode_call(signature: &str, addresses: &[&str]) -> Result<String, ChainError> {
    let mut data = format!("0x{}", hex::encode(function_selector(signature)));
    for address in addresses {
        let raw = address.trim_start_matches("0x");
        if raw.len() != 40 || hex::decode(raw).is_err() {
            return Err(ChainError::InvalidResponse(format!(
                "Not an address: {}",
                address
            )));
        }
        data.push_str(&"0".repeat(24));
        data.push_str(&raw.to_ascii_lowercase());
    }
    Ok(data)
}

/// Parse a hex quantity or 32 byte word into a u64
pub fn parse_hex_u64(value: &str) -> Result<u64, ChainError> {
    let digits = value.trim_start_matches("0x").trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|_| ChainError::InvalidResponse(format!("Not a u64 quantity: {}", value)))
}

fn word_u64(word: &[u8]) -> Option<u64> {
    let (high, low) = word.split_at(WORD - 8);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(low);
    Some(u64::from_be_bytes(bytes))
}

fn word_hex(word: &[u8]) -> String {
    let digits = hex::encode(word);
    let trimmed = digits.trim_start_matches('0');
    format!("0x{}", if trimmed.is_empty() { "0" } else { trimmed })
}

/// Decode the ABI return of `getUserPoints`: a dynamic array of
/// `(address user, uint256 timestamp, uint256 pointId)` tuples
pub fn decode_points(data: &str) -> Result<Vec<OnChainPoint>, ChainError> {
    let invalid = |what: &str| ChainError::InvalidResponse(format!("{} in points data", what));
    let bytes = hex::decode(data.trim_start_matches("0x")).map_err(|_| invalid("Bad hex"))?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    let word = |index: usize| {
        bytes
            .get(index..index.saturating_add(WORD))
            .ok_or_else(|| invalid("Truncated word"))
    };
    let offset = word_u64(word(0)?)
        .filter(|offset| *offset < bytes.len() as u64)
        .ok_or_else(|| invalid("Bad offset"))? as usize;
    let len = word_u64(word(offset)?)
        .filter(|len| *len <= (bytes.len() / (3 * WORD)) as u64)
        .ok_or_else(|| invalid("Bad length"))? as usize;

    let mut points = Vec::with_capacity(len);
    for i in 0..len {
        let base = offset + WORD + i * 3 * WORD;
        let user = word(base)?;
        points.push(OnChainPoint {
            user: format!("0x{}", hex::encode(&user[WORD - 20..])),
            timestamp: word_u64(word(base + WORD)?).ok_or_else(|| invalid("Bad timestamp"))?,
            point_id: word_hex(word(base + 2 * WORD)?),
        });
    }
    Ok(points)
}

/// Ethereum JSON-RPC access to the points contract
pub struct RpcChainClient {
    client: Client,
    rpc_url: Url,
    network: NetworkInfo,
    config: RpcClientConfig,
}

impl RpcChainClient {
    pub fn new(rpc_url: &str, network: NetworkInfo) -> Result<Self, ChainError> {
        Self::with_config(rpc_url, network, RpcClientConfig::default())
    }

    pub fn with_config(
        rpc_url: &str,
        network: NetworkInfo,
        config: RpcClientConfig,
    ) -> Result<Self, ChainError> {
        let rpc_url = Url::parse(rpc_url)
            .map_err(|e| ChainError::Transport(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connection_timeout)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            rpc_url,
            network,
            config,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        debug!("JSON-RPC {} -> {}", method, self.rpc_url);

        let response = self
            .client
            .post(self.rpc_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Timeout(self.config.request_timeout)
                } else {
                    ChainError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::Transport(format!(
                "HTTP error {}",
                response.status().as_u16()
            )));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            if error.code == USER_REJECTED_CODE {
                return Err(ChainError::Rejected(error.message));
            }
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        // A null result is meaningful, e.g. a receipt that does not exist yet
        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    async fn receipt_status(&self, tx_hash: &str) -> Result<Option<bool>, ChainError> {
        let receipt = self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if receipt.is_null() {
            return Ok(None);
        }

        let status = receipt
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::InvalidResponse("Receipt without status".to_string()))?;
        Ok(Some(parse_hex_u64(status)? == 1))
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn submit_point_generation(&self, address: &str) -> Result<String, ChainError> {
        if address.is_empty() {
            return Err(ChainError::WalletNotConnected);
        }

        let data = encode_call(GENERATE_POINT_SIGNATURE, &[])?;
        let result = self
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": address,
                    "to": self.network.contract_address,
                    "data": data,
                }]),
            )
            .await?;

        match result.as_str() {
            Some(hash) if hash.starts_with("0x") => Ok(hash.to_string()),
            _ => Err(ChainError::InvalidResponse(format!(
                "Expected a transaction hash, got {}",
                result
            ))),
        }
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: &str,
        timeout: Duration,
    ) -> Result<bool, ChainError> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.receipt_status(tx_hash).await {
                Ok(Some(success)) => return Ok(success),
                Ok(None) => {}
                Err(ChainError::Transport(message)) => {
                    warn!("Receipt poll for {} failed, retrying: {}", tx_hash, message);
                }
                Err(err) => return Err(err),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ChainError::Timeout(timeout));
            }
            sleep(self.config.receipt_poll_interval.min(deadline - now)).await;
        }
    }

    fn network_info(&self) -> NetworkInfo {
        self.network.clone()
    }

    async fn user_point_count(&self, address: &str) -> Result<Option<u64>, ChainError> {
        let data = encode_call(USER_POINT_COUNT_SIGNATURE, &[address])?;
        let result = self
            .call(
                "eth_call",
                json!([{ "to": self.network.contract_address, "data": data }, "latest"]),
            )
            .await?;

        let word = result
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse(format!("Expected hex, got {}", result)))?;
        Ok(Some(parse_hex_u64(word)?))
    }

    async fn user_points(&self, address: &str) -> Result<Option<Vec<OnChainPoint>>, ChainError> {
        let data = encode_call(USER_POINTS_SIGNATURE, &[address])?;
        let result = self
            .call(
                "eth_call",
                json!([{ "to": self.network.contract_address, "data": data }, "latest"]),
            )
            .await?;

        let encoded = result
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse(format!("Expected hex, got {}", result)))?;
        Ok(Some(decode_points(encoded)?))
    }
}
