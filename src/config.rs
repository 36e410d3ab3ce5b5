//! Runtime tunables. `NLISTS` stays a compile-time constant
//! ([`crate::size_class::NLISTS`]) since the free-list array's shape feeds
//! directly into the size-class arithmetic; everything else that's safe to
//! change per instance lives here.

/// Size, in words, of a "chunk" — both the heap extension `init` performs
/// up front and the floor on every subsequent grow-the-heap request.
pub const DEFAULT_CHUNK_WORDS: u32 = 1 << 10;

#[derive(Debug, Clone, Copy)]
pub struct AllocatorConfig {
  /// Floor on how many words any single heap extension requests, even when
  /// the triggering allocation needs fewer.
  pub chunk_words: u32,
  /// Words requested by the very first heap extension, performed by
  /// `init`, before any allocation has been made.
  pub initial_words: u32,
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    AllocatorConfig { chunk_words: DEFAULT_CHUNK_WORDS, initial_words: DEFAULT_CHUNK_WORDS }
  }
}

impl AllocatorConfig {
  pub fn new(chunk_words: u32) -> Self {
    AllocatorConfig { chunk_words, initial_words: chunk_words }
  }
}
