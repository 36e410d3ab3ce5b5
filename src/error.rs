//! The one real failure mode this allocator can hit: the heap adapter
//! refusing to grow. Carried as a typed error internally; narrowed to the
//! spec's null-pointer / `-1` contract at the public API boundary.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
  #[error("heap extension of {requested_bytes} bytes failed")]
  HeapExtendFailed { requested_bytes: usize },
}
