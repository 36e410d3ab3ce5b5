//! Boundary-tag coalescing: merges a newly-freed block with whichever free
//! immediate neighbors it has, then reinserts the result.

use log::trace;

use crate::block::{mark_free, next_block, next_header, prev_block, prev_footer, read_tag};
use crate::freelist::FreeListArray;

/// Merges `block` — already marked free, not yet in any list — with its
/// free immediate neighbors and inserts the surviving block into the free
/// lists. Fences read as in-use, so a real heap end never looks like a
/// free neighbor and this needs no special-casing.
///
/// # Safety
/// `block` must carry free tags and must not be a member of any list yet.
pub unsafe fn coalesce(free_lists: &mut FreeListArray, heap_base: *mut u8, block: *mut u8) -> *mut u8 {
  unsafe {
    let size = crate::block::block_size(block);
    let prev_tag = read_tag(prev_footer(block));
    let next_tag = read_tag(next_header(block));

    match (prev_tag.is_inuse(), next_tag.is_inuse()) {
      (true, true) => {
        free_lists.insert(heap_base, block);
        block
      }
      (true, false) => {
        let next = next_block(block);
        let next_size = next_tag.size_words();
        free_lists.remove(heap_base, next, next_size);
        let merged = size + next_size;
        trace!("coalesce: {:?} + next({:?}) -> {} words", block, next, merged);
        mark_free(block, merged);
        free_lists.insert(heap_base, block);
        block
      }
      (false, true) => {
        let prev_size = prev_tag.size_words();
        let prev = prev_block(block);
        free_lists.remove(heap_base, prev, prev_size);
        let merged = prev_size + size;
        trace!("coalesce: prev({:?}) + {:?} -> {} words", prev, block, merged);
        mark_free(prev, merged);
        free_lists.insert(heap_base, prev);
        prev
      }
      (false, false) => {
        let prev_size = prev_tag.size_words();
        let next_size = next_tag.size_words();
        let prev = prev_block(block);
        let next = next_block(block);
        free_lists.remove(heap_base, prev, prev_size);
        free_lists.remove(heap_base, next, next_size);
        let merged = prev_size + size + next_size;
        trace!("coalesce: prev({:?}) + {:?} + next({:?}) -> {} words", prev, block, next, merged);
        mark_free(prev, merged);
        free_lists.insert(heap_base, prev);
        prev
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::{WORD_SIZE, block_size, header, mark_used};
  use crate::tag::Tag;

  /// Heap: left fence | A(free) | B(free) | C(free) | right fence.
  fn make_triplet_heap() -> (Vec<u32>, *mut u8, *mut u8, *mut u8, *mut u8) {
    let backing = vec![0u32; 1 + 8 + 8 + 8 + 1];
    let base = backing.as_ptr() as *mut u8;
    unsafe {
      crate::block::write_tag(base, Tag::fence());
      let a = base.add(WORD_SIZE);
      let b = a.add(8 * WORD_SIZE);
      let c = b.add(8 * WORD_SIZE);
      let right_fence = c.add(8 * WORD_SIZE);
      crate::block::write_tag(right_fence, Tag::fence());
      (backing, base, a, b, c)
    }
  }

  #[test]
  fn used_neighbors_on_both_sides_just_inserts() {
    let (_backing, heap, a, b, c) = make_triplet_heap();
    unsafe {
      mark_used(a, 8);
      mark_used(c, 8);
      crate::block::mark_free(b, 8);
      let mut fl = FreeListArray::new();
      let merged = coalesce(&mut fl, heap, b);
      assert_eq!(merged, b);
      assert_eq!(block_size(merged), 8);
      assert_eq!(fl.iter_all(heap).collect::<Vec<_>>(), vec![b]);
    }
  }

  #[test]
  fn free_neighbor_on_the_right_is_absorbed() {
    let (_backing, heap, a, b, c) = make_triplet_heap();
    unsafe {
      mark_used(a, 8);
      crate::block::mark_free(c, 8);
      let mut fl = FreeListArray::new();
      fl.insert(heap, c);

      crate::block::mark_free(b, 8);
      let merged = coalesce(&mut fl, heap, b);
      assert_eq!(merged, b);
      assert_eq!(block_size(merged), 16);
      assert_eq!(fl.iter_all(heap).collect::<Vec<_>>(), vec![b]);
    }
  }

  #[test]
  fn free_neighbors_on_both_sides_all_merge_into_one() {
    let (_backing, heap, a, b, c) = make_triplet_heap();
    unsafe {
      crate::block::mark_free(a, 8);
      crate::block::mark_free(c, 8);
      let mut fl = FreeListArray::new();
      fl.insert(heap, a);
      fl.insert(heap, c);

      crate::block::mark_free(b, 8);
      let merged = coalesce(&mut fl, heap, b);

      assert_eq!(merged, a);
      assert_eq!(block_size(merged), 24);
      assert!(read_tag(header(merged)).is_free());
      // exactly one free block should now be reachable
      let all: Vec<_> = fl.iter_all(heap).collect();
      assert_eq!(all, vec![a]);
    }
  }
}
