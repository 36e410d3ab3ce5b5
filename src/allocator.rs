//! The public allocator: ties the free-list array, placement, coalescing,
//! and grow-path engines together behind `init`/`allocate`/`free`/
//! `reallocate`.

use std::ptr;

use log::{trace, warn};

use crate::align_to;
use crate::block::{
  DWORD_SIZE, WORD_SIZE, block_of_payload, block_size, header, mark_free, mark_used, next_block, payload_of,
  read_tag,
};
use crate::checker;
use crate::coalesce::coalesce;
use crate::config::AllocatorConfig;
use crate::error::AllocError;
use crate::freelist::FreeListArray;
use crate::heap::{HeapAdapter, extend_heap};
use crate::place::place;
use crate::tag::{MIN_BLOCK_WORDS, Tag};

/// A segregated-fit allocator over a heap supplied by `H`.
///
/// Not `Sync`/`Send`: the allocator is serialized by construction, per
/// spec — callers needing concurrent access must add their own locking.
pub struct Allocator<H: HeapAdapter> {
  heap: H,
  free_lists: FreeListArray,
  config: AllocatorConfig,
  heap_base: *mut u8,
  initialized: bool,
}

impl<H: HeapAdapter> Allocator<H> {
  pub fn new(heap: H) -> Self {
    Self::with_config(heap, AllocatorConfig::default())
  }

  pub fn with_config(heap: H, config: AllocatorConfig) -> Self {
    Allocator { heap, free_lists: FreeListArray::new(), config, heap_base: ptr::null_mut(), initialized: false }
  }

  /// Initializes the allocator: an empty free-list array, a pair of fence
  /// words, and one initial heap extension. Idempotent — a second call on
  /// an already-initialized allocator is a no-op success.
  pub fn init(&mut self) -> i32 {
    match self.try_init() {
      Ok(()) => 0,
      Err(err) => {
        warn!("init failed: {err}");
        -1
      }
    }
  }

  fn try_init(&mut self) -> Result<(), AllocError> {
    if self.initialized {
      return Ok(());
    }
    self.free_lists = FreeListArray::new();

    let base = self.heap.extend_heap_raw(2 * WORD_SIZE)?;
    unsafe {
      crate::block::write_tag(base, Tag::fence());
      crate::block::write_tag(base.add(WORD_SIZE), Tag::fence());
    }
    self.heap_base = base;

    let initial_words = self.config.initial_words;
    let fence = self.right_fence();
    unsafe {
      extend_heap(&mut self.heap, &mut self.free_lists, self.heap_base, fence, initial_words)?;
    }
    self.initialized = true;
    Ok(())
  }

  /// The current right fence sits one word before the heap adapter's
  /// high-water mark — every grow appends a free block immediately
  /// followed by a fresh fence, so this is always in sync.
  fn right_fence(&self) -> *mut u8 {
    unsafe { self.heap.heap_high().sub(WORD_SIZE) }
  }

  /// `align_up(n_bytes + 2 * tag_size, DWORD) / WORD`, floored at
  /// `MIN_BLOCK_WORDS`.
  fn adjusted_request_words(n_bytes: usize) -> u32 {
    let total_bytes = align_to!(n_bytes + 2 * WORD_SIZE, DWORD_SIZE);
    let words = (total_bytes / WORD_SIZE) as u32;
    words.max(MIN_BLOCK_WORDS)
  }

  pub fn allocate(&mut self, n_bytes: usize) -> *mut u8 {
    if n_bytes == 0 {
      return ptr::null_mut();
    }
    if !self.initialized && self.init() != 0 {
      return ptr::null_mut();
    }

    let req = Self::adjusted_request_words(n_bytes);
    trace!("allocate: {} bytes -> {} words", n_bytes, req);

    if let Some(block) = self.free_lists.find_fit(self.heap_base, req) {
      let used = unsafe { place(&mut self.free_lists, self.heap_base, block, req) };
      return payload_of(used);
    }

    let grow_words = req.max(self.config.chunk_words);
    let fence = self.right_fence();
    let block = match unsafe {
      extend_heap(&mut self.heap, &mut self.free_lists, self.heap_base, fence, grow_words)
    } {
      Ok(block) => block,
      Err(err) => {
        warn!("allocate: heap growth failed: {err}");
        return ptr::null_mut();
      }
    };
    let used = unsafe { place(&mut self.free_lists, self.heap_base, block, req) };
    payload_of(used)
  }

  /// # Safety
  /// `p` must be null or a payload pointer returned by `allocate`/
  /// `reallocate` on this allocator, not already freed.
  pub unsafe fn free(&mut self, p: *mut u8) {
    if p.is_null() {
      return;
    }
    let block = block_of_payload(p);
    unsafe {
      debug_assert!(read_tag(header(block)).is_inuse(), "double free or invalid pointer");
      let size = block_size(block);
      mark_free(block, size);
      coalesce(&mut self.free_lists, self.heap_base, block);
    }
  }

  /// # Safety
  /// `p` must be null or a payload pointer returned by `allocate`/
  /// `reallocate` on this allocator, not already freed.
  pub unsafe fn reallocate(&mut self, p: *mut u8, n_bytes: usize) -> *mut u8 {
    if p.is_null() {
      return self.allocate(n_bytes);
    }
    if n_bytes == 0 {
      unsafe { self.free(p) };
      return ptr::null_mut();
    }

    let block = block_of_payload(p);
    let old_size = unsafe { block_size(block) };
    let req = Self::adjusted_request_words(n_bytes);

    if req <= old_size {
      return unsafe { self.shrink_in_place(p, block, old_size, req) };
    }

    let next = unsafe { next_block(block) };
    let next_tag = unsafe { read_tag(header(next)) };

    if next_tag.is_fence() {
      let grown = unsafe { self.grow_at_heap_edge(p, block, old_size, req) };
      return match grown {
        Some(q) => q,
        None => unsafe { self.fallback_reallocate(p, n_bytes, block, old_size) },
      };
    }

    if next_tag.is_free() {
      let mut next_size = next_tag.size_words();
      if old_size + next_size < req {
        // Case 4: next is free but too small. If nothing sits between it
        // and the fence, grow by the deficit and retry as case 3.
        let after_next = unsafe { next_block(next) };
        let after_next_is_fence = unsafe { read_tag(header(after_next)).is_fence() };
        if !after_next_is_fence {
          return unsafe { self.fallback_reallocate(p, n_bytes, block, old_size) };
        }
        let deficit = req - (old_size + next_size);
        let grow_words = deficit.max(self.config.chunk_words);
        let fence = self.right_fence();
        let grown = match unsafe {
          extend_heap(&mut self.heap, &mut self.free_lists, self.heap_base, fence, grow_words)
        } {
          Ok(grown) => grown,
          Err(_) => return unsafe { self.fallback_reallocate(p, n_bytes, block, old_size) },
        };
        debug_assert_eq!(grown, next, "grow-the-deficit must merge into the existing free neighbor");
        next_size = unsafe { block_size(next) };
      }
      return unsafe { self.grow_into_free_neighbor(p, block, old_size, next, next_size, req) };
    }

    unsafe { self.fallback_reallocate(p, n_bytes, block, old_size) }
  }

  /// Case 1: `req <= old_size`. Splits off a free tail when the leftover
  /// is a legal block on its own; otherwise leaves the block untouched.
  /// The freed tail is not coalesced with its own right neighbor — see
  /// DESIGN.md for why shrink is the one place this crate chooses not to.
  unsafe fn shrink_in_place(&mut self, p: *mut u8, block: *mut u8, old_size: u32, req: u32) -> *mut u8 {
    let leftover = old_size - req;
    if leftover >= MIN_BLOCK_WORDS {
      unsafe {
        mark_used(block, req);
        let tail = next_block(block);
        mark_free(tail, leftover);
        self.free_lists.insert(self.heap_base, tail);
      }
    }
    p
  }

  /// Case 2: the block being grown is the right-most block in the heap.
  /// Extends the heap and absorbs the new space directly; returns `None`
  /// if the heap adapter refuses, so the caller can fall back to case 5.
  unsafe fn grow_at_heap_edge(&mut self, p: *mut u8, block: *mut u8, old_size: u32, req: u32) -> Option<*mut u8> {
    let deficit = req - old_size;
    let grow_words = deficit.max(self.config.chunk_words);
    let fence = self.right_fence();
    let extension =
      unsafe { extend_heap(&mut self.heap, &mut self.free_lists, self.heap_base, fence, grow_words).ok()? };
    let extension_size = unsafe { block_size(extension) };
    unsafe {
      self.free_lists.remove(self.heap_base, extension, extension_size);
      mark_used(block, old_size + extension_size);
    }
    Some(p)
  }

  /// Case 3 (and the continuation of case 4): `next` is free and, combined
  /// with `block`, is large enough. Absorbs it whole or splits off a
  /// remainder the same way `place` would.
  unsafe fn grow_into_free_neighbor(
    &mut self,
    p: *mut u8,
    block: *mut u8,
    old_size: u32,
    next: *mut u8,
    next_size: u32,
    req: u32,
  ) -> *mut u8 {
    unsafe {
      self.free_lists.remove(self.heap_base, next, next_size);
      let combined = old_size + next_size;
      if combined - req >= MIN_BLOCK_WORDS {
        mark_used(block, req);
        let remainder = next_block(block);
        mark_free(remainder, combined - req);
        self.free_lists.insert(self.heap_base, remainder);
      } else {
        mark_used(block, combined);
      }
    }
    p
  }

  /// Case 5: allocate fresh, copy the old payload, free the original. On
  /// allocation failure the original block is left completely untouched.
  unsafe fn fallback_reallocate(&mut self, p: *mut u8, n_bytes: usize, block: *mut u8, old_size: u32) -> *mut u8 {
    let q = self.allocate(n_bytes);
    if q.is_null() {
      return ptr::null_mut();
    }
    let copy_bytes = (old_size as usize * WORD_SIZE).min(n_bytes);
    unsafe {
      ptr::copy_nonoverlapping(p, q, copy_bytes);
      self.free(p);
    }
    q
  }

  /// Runs the heap consistency checker. Not on the hot path — intended
  /// for debug assertions and tests.
  pub fn check(&self) -> bool {
    if !self.initialized {
      return true;
    }
    checker::check(&self.heap, &self.free_lists, self.heap_base)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct SimHeap {
    buf: Vec<u8>,
    used: usize,
  }

  impl SimHeap {
    fn with_capacity(n: usize) -> Self {
      SimHeap { buf: vec![0u8; n], used: 0 }
    }
  }

  impl HeapAdapter for SimHeap {
    fn extend_heap_raw(&mut self, n_bytes: usize) -> Result<*mut u8, AllocError> {
      if self.used + n_bytes > self.buf.len() {
        return Err(AllocError::HeapExtendFailed { requested_bytes: n_bytes });
      }
      let ptr = unsafe { self.buf.as_mut_ptr().add(self.used) };
      self.used += n_bytes;
      Ok(ptr)
    }
    fn heap_low(&self) -> *mut u8 {
      self.buf.as_ptr() as *mut u8
    }
    fn heap_high(&self) -> *mut u8 {
      unsafe { self.buf.as_ptr().add(self.used) as *mut u8 }
    }
  }

  fn is_dword_aligned(p: *mut u8) -> bool {
    (p as usize) % DWORD_SIZE == 0
  }

  #[test]
  fn init_then_single_allocate() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(1 << 16));
    assert_eq!(alloc.init(), 0);
    let p = alloc.allocate(100);
    assert!(!p.is_null());
    assert!(is_dword_aligned(p));
    assert!(alloc.check());
  }

  #[test]
  fn zero_byte_allocate_returns_null() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(1 << 16));
    assert_eq!(alloc.init(), 0);
    assert!(alloc.allocate(0).is_null());
  }

  #[test]
  fn coalesce_triplet() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(1 << 16));
    alloc.init();
    let a = alloc.allocate(32);
    let b = alloc.allocate(32);
    let c = alloc.allocate(32);
    unsafe {
      alloc.free(a);
      alloc.free(c);
      alloc.free(b);
    }
    assert!(alloc.check());
  }

  #[test]
  fn split_on_allocate() {
    let mut alloc = Allocator::with_config(SimHeap::with_capacity(1 << 16), AllocatorConfig::new(1024));
    alloc.init();
    let p = alloc.allocate(64);
    assert!(!p.is_null());
    assert!(alloc.check());
  }

  #[test]
  fn realloc_shrink_in_place_keeps_the_same_address() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(1 << 16));
    alloc.init();
    let p = alloc.allocate(200);
    unsafe {
      ptr::write_bytes(p, 0xAB, 200);
    }
    let q = unsafe { alloc.reallocate(p, 100) };
    assert_eq!(q, p);
    unsafe {
      for i in 0..100 {
        assert_eq!(*q.add(i), 0xAB);
      }
    }
    assert!(alloc.check());
  }

  #[test]
  fn realloc_grows_into_freed_right_neighbor() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(1 << 16));
    alloc.init();
    let a = alloc.allocate(64);
    let b = alloc.allocate(64);
    unsafe { alloc.free(b) };
    let q = unsafe { alloc.reallocate(a, 200) };
    assert_eq!(q, a);
    assert!(alloc.check());
  }

  #[test]
  fn realloc_grows_at_heap_edge() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(1 << 20));
    alloc.init();
    let p = alloc.allocate(64);
    let q = unsafe { alloc.reallocate(p, 8_000) };
    assert_eq!(q, p);
    assert!(alloc.check());
  }

  #[test]
  fn out_of_memory_returns_null_and_preserves_state() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(256));
    alloc.init();
    let before = alloc.check();
    let p = alloc.allocate(10_000_000);
    assert!(p.is_null());
    assert_eq!(alloc.check(), before);
  }

  #[test]
  fn reallocate_null_behaves_like_allocate() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(1 << 16));
    alloc.init();
    let p = unsafe { alloc.reallocate(ptr::null_mut(), 64) };
    assert!(!p.is_null());
  }

  #[test]
  fn reallocate_zero_behaves_like_free() {
    let mut alloc = Allocator::new(SimHeap::with_capacity(1 << 16));
    alloc.init();
    let p = alloc.allocate(64);
    let q = unsafe { alloc.reallocate(p, 0) };
    assert!(q.is_null());
    assert!(alloc.check());
  }
}
