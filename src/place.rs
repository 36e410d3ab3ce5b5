//! Placement and splitting: turning a free block found by `find_fit` into
//! a used block of exactly the requested size, returning any leftover to
//! the free-list array.

use log::trace;

use crate::block::{block_size, mark_free, mark_used, next_block};
use crate::freelist::FreeListArray;
use crate::tag::MIN_BLOCK_WORDS;

/// Removes `block` from its list, carves off `req_words` as a used block,
/// and reinserts a free remainder when the leftover is large enough to be a
/// legal block on its own. The used block is placed at the low end of the
/// split and the free remainder at the high end; either placement is
/// invariant-preserving, this crate picks one and doesn't vary it.
///
/// # Safety
/// `block` must currently be a free member of `free_lists` with size
/// `>= req_words`.
pub unsafe fn place(free_lists: &mut FreeListArray, heap_base: *mut u8, block: *mut u8, req_words: u32) -> *mut u8 {
  unsafe {
    let total = block_size(block);
    debug_assert!(total >= req_words);
    free_lists.remove(heap_base, block, total);

    let remainder = total - req_words;
    if remainder >= MIN_BLOCK_WORDS {
      trace!("place: splitting block {:?} ({} words) into {} used + {} free", block, total, req_words, remainder);
      mark_used(block, req_words);
      let free_block = next_block(block);
      mark_free(free_block, remainder);
      free_lists.insert(heap_base, free_block);
    } else {
      trace!("place: using whole block {:?} ({} words), no split", block, total);
      mark_used(block, total);
    }
    block
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::{WORD_SIZE, mark_free as mark_free_block, read_tag, header};

  fn make_heap(words: usize) -> (Vec<u32>, *mut u8) {
    let backing = vec![0u32; words];
    let heap = backing.as_ptr() as *mut u8;
    (backing, heap)
  }

  #[test]
  fn split_leaves_a_correctly_tagged_remainder() {
    let (_backing, heap) = make_heap(64);
    let block = heap;
    unsafe {
      mark_free_block(block, 32);
      let mut fl = FreeListArray::new();
      fl.insert(heap, block);

      let used = place(&mut fl, heap, block, 8);
      assert_eq!(used, block);
      assert!(read_tag(header(used)).is_inuse());
      assert_eq!(block_size(used), 8);

      let remainder = next_block(used);
      assert!(read_tag(header(remainder)).is_free());
      assert_eq!(block_size(remainder), 32 - 8);
      assert_eq!(fl.find_fit(heap, 1), Some(remainder));
    }
  }

  #[test]
  fn tiny_leftover_is_not_split() {
    let (_backing, heap) = make_heap(64);
    let block = heap;
    unsafe {
      // Leftover of 2 words is below MIN_BLOCK_WORDS (4): must not split.
      mark_free_block(block, 10);
      let mut fl = FreeListArray::new();
      fl.insert(heap, block);

      let used = place(&mut fl, heap, block, 8);
      assert_eq!(block_size(used), 10);
      assert_eq!(fl.find_fit(heap, 1), None);
    }
  }

  #[test]
  fn exact_fit_consumes_whole_block() {
    let (_backing, heap) = make_heap(64);
    let block = heap;
    unsafe {
      let _ = WORD_SIZE;
      mark_free_block(block, 8);
      let mut fl = FreeListArray::new();
      fl.insert(heap, block);

      let used = place(&mut fl, heap, block, 8);
      assert_eq!(block_size(used), 8);
      assert_eq!(fl.find_fit(heap, 1), None);
    }
  }
}
