//! Boundary tag encoding.
//!
//! A tag is one word: the `inuse` bit packed into the size's otherwise-unused
//! low bit. Every block size is even (in words), so the low bit of `size` is
//! always free for the flag — the same trick the classic explicit-list
//! allocator uses, just spelled out as a named type instead of a macro pair.

use std::fmt;

/// Total size, in words, of the smallest legal block: header + link words +
/// footer.
pub const MIN_BLOCK_WORDS: u32 = 4;

const INUSE_BIT: u32 = 0b1;
const SIZE_MASK: u32 = !INUSE_BIT;

/// A one-word `{inuse, size}` boundary tag.
///
/// Bit 0 holds `inuse`; the remaining bits hold the block's total size in
/// words (including both tags). A tag with `size == 0 && inuse` is a fence.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tag(u32);

impl Tag {
  /// Packs a size (in words) and an in-use flag into a tag.
  ///
  /// `size_words` must be even; the low bit is reserved for `inuse`.
  pub const fn pack(size_words: u32, inuse: bool) -> Self {
    debug_assert!(size_words & INUSE_BIT == 0, "block size must be even");
    Tag(size_words | (inuse as u32))
  }

  /// The sentinel tag used to bracket the live portion of the heap.
  pub const fn fence() -> Self {
    Tag::pack(0, true)
  }

  pub const fn from_raw(raw: u32) -> Self {
    Tag(raw)
  }

  pub const fn raw(self) -> u32 {
    self.0
  }

  pub const fn size_words(self) -> u32 {
    self.0 & SIZE_MASK
  }

  pub const fn is_inuse(self) -> bool {
    self.0 & INUSE_BIT != 0
  }

  pub const fn is_free(self) -> bool {
    !self.is_inuse()
  }

  /// A fence is a zero-size used tag; it disables coalescing past either end
  /// of the heap without special-casing the heap boundary in the engines.
  pub const fn is_fence(self) -> bool {
    self.is_inuse() && self.size_words() == 0
  }
}

impl fmt::Debug for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_fence() {
      write!(f, "Tag(fence)")
    } else {
      write!(
        f,
        "Tag(size={}, {})",
        self.size_words(),
        if self.is_inuse() { "inuse" } else { "free" }
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pack_roundtrips_size_and_flag() {
    for size in (0..64u32).step_by(2) {
      for inuse in [true, false] {
        let tag = Tag::pack(size, inuse);
        assert_eq!(tag.size_words(), size);
        assert_eq!(tag.is_inuse(), inuse);
      }
    }
  }

  #[test]
  fn fence_reads_as_inuse_with_zero_size() {
    let fence = Tag::fence();
    assert!(fence.is_fence());
    assert!(fence.is_inuse());
    assert_eq!(fence.size_words(), 0);
  }

  #[test]
  fn non_fence_used_block_is_not_a_fence() {
    let tag = Tag::pack(8, true);
    assert!(!tag.is_fence());
  }
}
