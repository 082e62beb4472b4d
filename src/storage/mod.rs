// Storage module - row store interface and the in-memory reference store

pub mod adapter;
pub mod memory;

pub use adapter::{Catalog, Mutation, RowStore};
pub use memory::MemoryStore;
