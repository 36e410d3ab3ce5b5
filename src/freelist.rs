//! The segregated free-list array: insertion and first-fit search.

use log::trace;

use crate::block::block_size;
use crate::list::List;
use crate::size_class::{NLISTS, class_index};

pub struct FreeListArray {
  lists: [List; NLISTS],
}

impl FreeListArray {
  pub const fn new() -> Self {
    FreeListArray { lists: [List::new(); NLISTS] }
  }

  /// Inserts `block` into the list matching its current size.
  ///
  /// # Safety
  /// The caller must already have written free tags on `block`, and `block`
  /// must not currently be a member of any list.
  pub unsafe fn insert(&mut self, heap_base: *mut u8, block: *mut u8) {
    unsafe {
      let k = class_index(block_size(block));
      trace!("freelist: insert block {:?} into class {}", block, k);
      self.lists[k].push_front(heap_base, block);
    }
  }

  /// Removes `block`, whose size is `size_words`, from its list.
  ///
  /// # Safety
  /// `block` must currently be a member of the list matching `size_words`.
  pub unsafe fn remove(&mut self, heap_base: *mut u8, block: *mut u8, size_words: u32) {
    unsafe {
      let k = class_index(size_words);
      self.lists[k].remove(heap_base, block);
    }
  }

  /// First fit: scans from the request's starting class upward, and within
  /// each class walks head-to-tail for the first block big enough. A class
  /// can hold blocks smaller than the request (it spans `[2^k, 2^(k+1))`),
  /// so the per-block size check cannot be skipped even in the starting
  /// class.
  pub fn find_fit(&self, heap_base: *mut u8, req_words: u32) -> Option<*mut u8> {
    let k0 = class_index(req_words);
    for k in k0..NLISTS {
      unsafe {
        for block in self.lists[k].iter(heap_base) {
          if block_size(block) >= req_words {
            return Some(block);
          }
        }
      }
    }
    None
  }

  /// Every free block reachable from any list, in no particular order —
  /// used by the consistency checker.
  pub fn iter_all(&self, heap_base: *mut u8) -> impl Iterator<Item = *mut u8> + '_ {
    self.lists.iter().flat_map(move |list| unsafe { list.iter(heap_base) })
  }
}
