//! A fixed-capacity, `Vec<u8>`-backed heap adapter for integration tests.
//! Keeps test traces off the real process break so many allocators can run
//! side by side without interfering with each other.

use segheap::{AllocError, HeapAdapter};

pub struct SimHeap {
  buf: Vec<u8>,
  used: usize,
}

impl SimHeap {
  pub fn with_capacity(capacity: usize) -> Self {
    SimHeap { buf: vec![0u8; capacity], used: 0 }
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
