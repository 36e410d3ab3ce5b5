use std::io::Read;

use libc::sbrk;
use segheap::{Allocator, SbrkHeap};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations change the
/// program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
unsafe fn print_program_break(label: &str) {
  println!("[{}] PID = {}, program break (sbrk(0)) = {:?}", label, std::process::id(), unsafe { sbrk(0) });
}

fn main() {
  env_logger::init();

  let mut allocator = Allocator::new(SbrkHeap::new());

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 1) Initialize. This reserves the fence pair and performs the first
    //    chunk-sized heap extension.
    // ------------------------------------------------------------------
    let status = allocator.init();
    println!("\n[1] init() -> {}", status);
    assert_eq!(status, 0);
    assert!(allocator.check());
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 2) Three same-sized allocations land in adjacent blocks.
    // ------------------------------------------------------------------
    let a = allocator.allocate(64);
    let b = allocator.allocate(64);
    let c = allocator.allocate(64);
    println!("\n[2] Allocated three 64-byte blocks: a={:?} b={:?} c={:?}", a, b, c);
    assert!(!a.is_null() && !b.is_null() && !c.is_null());
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 3) Free the outer two, then the middle one: this exercises both
    //    single-neighbor and both-neighbor coalescing.
    // ------------------------------------------------------------------
    allocator.free(a);
    allocator.free(c);
    println!("\n[3] Freed a and c (non-adjacent frees, no coalescing yet)");
    allocator.free(b);
    println!("[3] Freed b: a, b, c should now be one merged free block");
    assert!(allocator.check());
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 4) Allocate something smaller than the merged block to see a split.
    // ------------------------------------------------------------------
    let d = allocator.allocate(32);
    println!("\n[4] Allocated 32 bytes into the merged region: d={:?}", d);
    assert!(!d.is_null());
    assert!(allocator.check());
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 5) Grow d in place via realloc; then grow far enough to force a
    //    fresh heap extension at the right edge.
    // ------------------------------------------------------------------
    let d = allocator.reallocate(d, 48);
    println!("\n[5] Grew d to 48 bytes in place: d={:?}", d);

    print_program_break("before large realloc");
    let d = allocator.reallocate(d, 64 * 1024);
    println!("[5] Grew d to 64 KiB, forcing heap extension: d={:?}", d);
    print_program_break("after large realloc");
    assert!(allocator.check());
    block_until_enter_pressed();

    allocator.free(d);
    println!("\n[6] End of walkthrough. Process exits; the OS reclaims everything.");
  }
}
