//! Stage store implementations.

pub mod fs_store;
pub mod memory_store;

pub use fs_store::FileStageStore;
pub use memory_store::InMemoryStageStore;
