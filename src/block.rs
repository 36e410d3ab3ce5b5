//! Block layout and the address-computation primitives that navigate
//! between neighboring blocks and between a block and its boundary tags.
//!
//! A block is a contiguous run of words: a header tag, a body, and a footer
//! tag that is bit-identical to the header. Client pointers always point one
//! word past the header (the payload). All of these functions operate on
//! that header address — `*mut u8` pointing at the first byte of the tag.

use std::ptr;

use crate::tag::Tag;

/// Size, in bytes, of a word. All block sizes in this crate are word counts;
/// raw-heap calls are byte counts. Every helper here names its unit to keep
/// the two from being mixed up.
pub const WORD_SIZE: usize = 4;

/// Alignment, in bytes, guaranteed for client payloads.
pub const DWORD_SIZE: usize = 8;

#[inline]
pub fn words_to_bytes(words: u32) -> usize {
  words as usize * WORD_SIZE
}

/// Reads the tag stored at `addr`.
///
/// # Safety
/// `addr` must point at a live tag word (a header, footer, or fence).
#[inline]
pub unsafe fn read_tag(addr: *const u8) -> Tag {
  unsafe { Tag::from_raw(ptr::read(addr as *const u32)) }
}

/// Writes `tag` at `addr`.
///
/// # Safety
/// `addr` must be a valid, writable tag word.
#[inline]
pub unsafe fn write_tag(addr: *mut u8, tag: Tag) {
  unsafe { ptr::write(addr as *mut u32, tag.raw()) }
}

/// The header tag address of a block is the block's own address.
#[inline]
pub const fn header(block: *mut u8) -> *mut u8 {
  block
}

/// The footer tag address, given the block's current size in words.
///
/// # Safety
/// `size_words` must be the block's true size (`>= MIN_BLOCK_WORDS`).
#[inline]
pub unsafe fn footer_of(block: *mut u8, size_words: u32) -> *mut u8 {
  unsafe { block.add(words_to_bytes(size_words) - WORD_SIZE) }
}

/// The client payload address: one word past the header.
#[inline]
pub fn payload_of(block: *mut u8) -> *mut u8 {
  unsafe { block.add(WORD_SIZE) }
}

/// Recovers a block's header address from a payload pointer previously
/// handed to a client.
#[inline]
pub fn block_of_payload(payload: *mut u8) -> *mut u8 {
  unsafe { payload.sub(WORD_SIZE) }
}

/// Reads a block's size (in words) from its header.
///
/// # Safety
/// `block` must point at a live header.
#[inline]
pub unsafe fn block_size(block: *mut u8) -> u32 {
  unsafe { read_tag(header(block)).size_words() }
}

/// The word immediately before `block`'s header — always readable, since
/// the left fence plays the role of a synthetic previous footer at the
/// start of the heap.
#[inline]
pub unsafe fn prev_footer(block: *mut u8) -> *mut u8 {
  unsafe { block.sub(WORD_SIZE) }
}

/// The word at `block + size` — always readable, since the right fence
/// plays the role of a synthetic next header at the end of the heap.
///
/// # Safety
/// `block` must point at a live header.
#[inline]
pub unsafe fn next_header(block: *mut u8) -> *mut u8 {
  unsafe { block.add(words_to_bytes(block_size(block))) }
}

/// The physically preceding block.
///
/// # Safety
/// The predecessor must be a real block, i.e. `prev_footer(block)` must not
/// be the left fence.
#[inline]
pub unsafe fn prev_block(block: *mut u8) -> *mut u8 {
  unsafe {
    let prev_size = read_tag(prev_footer(block)).size_words();
    block.sub(words_to_bytes(prev_size))
  }
}

/// The physically following block.
///
/// # Safety
/// The successor must be a real block, i.e. `next_header(block)` must not
/// be the right fence.
#[inline]
pub unsafe fn next_block(block: *mut u8) -> *mut u8 {
  unsafe { next_header(block) }
}

/// Writes matching header and footer tags marking `block` as in-use.
///
/// # Safety
/// `block` must have room for `size_words` words and `footer_of` must be
/// within the live heap.
#[inline]
pub unsafe fn mark_used(block: *mut u8, size_words: u32) {
  unsafe { mark(block, size_words, true) }
}

/// Writes matching header and footer tags marking `block` as free.
///
/// # Safety
/// Same as [`mark_used`].
#[inline]
pub unsafe fn mark_free(block: *mut u8, size_words: u32) {
  unsafe { mark(block, size_words, false) }
}

#[inline]
unsafe fn mark(block: *mut u8, size_words: u32, inuse: bool) {
  let tag = Tag::pack(size_words, inuse);
  unsafe {
    write_tag(header(block), tag);
    write_tag(footer_of(block, size_words), tag);
  }
}
