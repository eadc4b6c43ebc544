pub mod jsonl;
pub mod store;

pub use jsonl::JsonlStore;
pub use store::{DedupStore, MemoryStore, StoreError};
