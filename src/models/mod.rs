pub mod chunk;
pub mod meta;

// Re-export core models for easy access
pub use chunk::{Chunk, ChunkMeta, ChunkRange, SourceType};
pub use meta::Meta;
