//! Storage trait definitions.

mod vector_store;

pub use vector_store::VectorStore;
