//! The optional, debug-only heap consistency predicate from the external
//! interface: every list member is free, no two free blocks are adjacent,
//! every free block in the heap is reachable from the free-list array, and
//! the heap walks contiguously from the left fence to the right fence.

use std::collections::HashSet;

use crate::block::{WORD_SIZE, next_header, read_tag};
use crate::freelist::FreeListArray;
use crate::heap::HeapAdapter;

/// Runs every consistency check described above and returns whether they
/// all hold. Intended for debug assertions and tests, not the hot
/// allocate/free path.
pub fn check<H: HeapAdapter>(heap: &H, free_lists: &FreeListArray, heap_base: *mut u8) -> bool {
  let listed: HashSet<usize> = free_lists.iter_all(heap_base).map(|b| b as usize).collect();

  // Every list member must actually be free.
  for &addr in &listed {
    let block = addr as *mut u8;
    if unsafe { read_tag(block).is_inuse() } {
      return false;
    }
  }

  let mut walked: HashSet<usize> = HashSet::new();
  let mut prev_was_free = false;
  // The first real block's header sits one word past the left fence.
  let mut cursor = unsafe { heap_base.add(WORD_SIZE) };

  loop {
    let tag = unsafe { read_tag(cursor) };
    if tag.is_fence() {
      // Must be exactly the right fence: one word before the high-water mark.
      return cursor == unsafe { heap.heap_high().sub(WORD_SIZE) } && walked == listed;
    }

    let footer = unsafe { crate::block::footer_of(cursor, tag.size_words()) };
    let footer_tag = unsafe { read_tag(footer) };
    if footer_tag != tag {
      return false;
    }

    if tag.is_free() {
      if prev_was_free {
        return false;
      }
      walked.insert(cursor as usize);
      prev_was_free = true;
    } else {
      prev_was_free = false;
    }

    cursor = unsafe { next_header(cursor) };
  }
}
