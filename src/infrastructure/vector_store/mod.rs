mod factory;
mod in_memory;
mod persistent;

pub use factory::{InMemoryIndexFactory, PersistentIndexFactory};
pub use in_memory::InMemoryVectorStore;
pub use persistent::PersistentVectorStore;
