//! Document Store adapters: LanceDB on disk, and an in-memory map.

pub mod lance;
pub mod memory;
pub mod schema;

pub use lance::LanceDocumentStore;
pub use memory::MemoryDocumentStore;
