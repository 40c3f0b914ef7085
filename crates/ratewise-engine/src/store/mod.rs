//! Storage backends for pools, wallet positions, and rate history

pub mod history;
pub mod pool;
pub mod position;

pub use history::{HistoryStore, InMemoryHistoryStore};
pub use pool::{InMemoryPoolStore, PoolStore};
pub use position::{InMemoryPositionStore, PositionStore};
