//! # segheap — a segregated-fit dynamic storage allocator
//!
//! This crate provides a **segregated free-list allocator** over a
//! monotonically growable heap, in the style of an explicit free-list
//! allocator with boundary tags: blocks carry a header and footer tag so
//! either neighbor can be inspected in O(1), free blocks are threaded onto
//! one of several size-class lists instead of a single list, and the heap
//! only grows (there is no giving memory back to the OS).
//!
//! ## Overview
//!
//! ```text
//!   Heap layout:
//!
//!   ┌──────┬────────────┬────────────┬─────┬────────────┬──────┐
//!   │ left │  block 1   │  block 2   │ ... │  block N   │ right│
//!   │fence │ hdr|body|ftr│ hdr|body|ftr│     │ hdr|body|ftr│fence │
//!   └──────┴────────────┴────────────┴─────┴────────────┴──────┘
//!
//!   Each block: [header tag][payload words][footer tag]
//!   Each tag:   {inuse: 1 bit, size in words: 31 bits}
//! ```
//!
//! Free blocks are segregated by size class (`[2^k, 2^(k+1))` each) so a
//! request only has to search the classes at or above its own size. Within
//! a class the search is first-fit. Freed blocks are coalesced with both
//! immediate neighbors using the boundary tags, and a freed block threads
//! itself onto its list with a compressed (heap-relative, 4-byte) offset
//! pair instead of raw pointers, keeping the minimum block size at four
//! words on 64-bit targets.
//!
//! ## Crate structure
//!
//! ```text
//!   segheap
//!   ├── align       - alignment macros (align!, align_to!)
//!   ├── tag         - boundary tag packing
//!   ├── block       - block layout and neighbor navigation
//!   ├── list        - intrusive free list with compressed offsets
//!   ├── size_class  - size-class index arithmetic
//!   ├── freelist    - the array of per-class lists
//!   ├── place       - placement and splitting
//!   ├── coalesce    - boundary-tag coalescing
//!   ├── heap        - the heap adapter trait and grow path
//!   ├── error       - the allocator's one failure mode
//!   ├── config      - runtime tunables
//!   ├── checker     - the optional heap consistency predicate
//!   └── allocator   - the public Allocator type
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use segheap::{Allocator, SbrkHeap};
//!
//! let mut allocator = Allocator::new(SbrkHeap::new());
//! assert_eq!(allocator.init(), 0);
//!
//! unsafe {
//!     let p = allocator.allocate(64);
//!     assert!(!p.is_null());
//!     let p = allocator.reallocate(p, 128);
//!     allocator.free(p);
//! }
//! ```
//!
//! ## Safety
//!
//! `allocate` is safe to call (it only ever hands out fresh memory), but
//! `free` and `reallocate` are `unsafe`: passing a pointer that was not
//! returned by this same allocator, or that has already been freed, is
//! undefined behavior, exactly as with the system allocator.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives; an
//!   `Allocator` is neither `Send` nor `Sync`.
//! - **No shrink-to-OS**: the heap only grows.
//! - **Unix-only in production**: [`SbrkHeap`] requires `libc` and
//!   `sbrk` (POSIX systems). Tests and the demo can swap in any
//!   [`HeapAdapter`].

pub mod align;
mod allocator;
mod block;
mod checker;
mod coalesce;
mod config;
mod error;
mod freelist;
mod heap;
mod list;
mod place;
mod size_class;
mod tag;

pub use allocator::Allocator;
pub use config::{AllocatorConfig, DEFAULT_CHUNK_WORDS};
pub use error::AllocError;
pub use heap::{HeapAdapter, SbrkHeap};
