//! The heap adapter: the external, monotonically-growable source of raw
//! bytes this allocator builds blocks out of, plus the grow path that turns
//! a raw extension into a well-formed free block.

use std::ptr;

use libc::{c_void, intptr_t, sbrk};
use log::{debug, trace};

use crate::block::{WORD_SIZE, footer_of, mark_free, next_header, write_tag};
use crate::coalesce::coalesce;
use crate::error::AllocError;
use crate::freelist::FreeListArray;
use crate::tag::{MIN_BLOCK_WORDS, Tag};

/// The raw, address-monotone byte source the allocator grows its heap from.
/// This is the one seam in the design meant to be swapped: production code
/// talks to the real process break through [`SbrkHeap`]; tests talk to a
/// fixed in-memory buffer so many independent heaps can run side by side.
pub trait HeapAdapter {
  /// Extends the heap by `n_bytes` and returns the start of the new region,
  /// which must be contiguous with the end of the previous region.
  fn extend_heap_raw(&mut self, n_bytes: usize) -> Result<*mut u8, AllocError>;

  /// The lowest live address ever handed out. Used only by the consistency
  /// checker.
  fn heap_low(&self) -> *mut u8;

  /// The current high-water mark.
  fn heap_high(&self) -> *mut u8;
}

/// A [`HeapAdapter`] backed by the process break, grown with `sbrk(2)`.
pub struct SbrkHeap {
  low: Option<*mut u8>,
  high: *mut u8,
}

impl SbrkHeap {
  pub fn new() -> Self {
    SbrkHeap { low: None, high: ptr::null_mut() }
  }
}

impl Default for SbrkHeap {
  fn default() -> Self {
    Self::new()
  }
}

impl HeapAdapter for SbrkHeap {
  fn extend_heap_raw(&mut self, n_bytes: usize) -> Result<*mut u8, AllocError> {
    let raw = unsafe { sbrk(n_bytes as intptr_t) };
    if raw == usize::MAX as *mut c_void {
      return Err(AllocError::HeapExtendFailed { requested_bytes: n_bytes });
    }
    let base = raw as *mut u8;
    if self.low.is_none() {
      self.low = Some(base);
    }
    self.high = unsafe { base.add(n_bytes) };
    Ok(base)
  }

  fn heap_low(&self) -> *mut u8 {
    self.low.unwrap_or(ptr::null_mut())
  }

  fn heap_high(&self) -> *mut u8 {
    self.high
  }
}

/// Extends the heap by at least `req_words` (rounded up to an even number
/// of words, and at least [`MIN_BLOCK_WORDS`]), absorbs the displaced right
/// fence into a new free block, writes a fresh right fence past it, then
/// coalesces with whatever was previously the right-most block.
///
/// # Safety
/// `old_right_fence` must be the address of the current right fence, and
/// `heap_base` must be the offset-compression origin used throughout
/// `free_lists`.
pub unsafe fn extend_heap<H: HeapAdapter>(
  heap: &mut H,
  free_lists: &mut FreeListArray,
  heap_base: *mut u8,
  old_right_fence: *mut u8,
  req_words: u32,
) -> Result<*mut u8, AllocError> {
  let mut words = req_words;
  if words % 2 != 0 {
    words += 1;
  }
  if words < MIN_BLOCK_WORDS {
    words = MIN_BLOCK_WORDS;
  }

  let n_bytes = words as usize * WORD_SIZE;
  trace!("extend_heap: requesting {} bytes ({} words)", n_bytes, words);
  let base = heap.extend_heap_raw(n_bytes)?;
  debug_assert_eq!(base, unsafe { old_right_fence.add(WORD_SIZE) }, "heap adapter broke contiguity");

  unsafe {
    let new_block = old_right_fence;
    mark_free(new_block, words);

    let new_right_fence = next_header(new_block);
    write_tag(new_right_fence, Tag::fence());

    debug!("extend_heap: grew heap by {} words, new right fence at {:?}", words, new_right_fence);
    Ok(coalesce(free_lists, heap_base, new_block))
  }
}
