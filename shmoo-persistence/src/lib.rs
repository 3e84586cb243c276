pub mod connection;
pub mod entities;
pub mod repositories;
pub mod stores;

pub use repositories::KvStatsRepository;
pub use stores::{KeyValueStore, MemoryStore, SqliteStore};
