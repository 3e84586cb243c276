pub mod errors;
pub mod messages;
pub mod network;
pub mod stats;
pub mod transaction;

// Re-export all types
pub use errors::*;
pub use messages::*;
pub use network::*;
pub use stats::*;
pub use transaction::*;

/// Wallet address as handed over by the wallet session, e.g. `0xabc...`.
pub type WalletAddress = String;

/// Milliseconds since the Unix epoch. `0` means "never".
pub type EpochMillis = i64;
