//! Install state persistence and locking.

mod lock;
mod store;

pub use lock::StateLock;
pub use store::StateStore;
