//! Interactive walkthrough of [`fixedalloc::FreeListAllocator`].
//!
//! Run with `cargo run --example free_list`. Press ENTER between steps to
//! inspect state with `gdb`/`valgrind`/whatever you like.

use std::alloc::Layout;
use std::io::Read;

use fixedalloc::{FreeListAllocator, RegionAllocator};

fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() {
  let mut allocator = FreeListAllocator::new(4096).expect("construct free-list allocator");

  unsafe {
    println!("[start] used_memory = {}", allocator.used_memory());
    block_until_enter_pressed();

    let layout = Layout::new::<u64>();
    let a = allocator
      .allocate(layout.size(), layout.align())
      .expect("allocate first u64");
    let b = allocator
      .allocate(layout.size(), layout.align())
      .expect("allocate second u64");
    let c = allocator
      .allocate(layout.size(), layout.align())
      .expect("allocate third u64");
    println!(
      "[1] three u64s allocated at {:?}, {:?}, {:?}; used_memory = {}, num_allocations = {}",
      a,
      b,
      c,
      allocator.used_memory(),
      allocator.num_allocations()
    );
    block_until_enter_pressed();

    println!("[2] releasing the middle block first, opening a gap on both sides");
    allocator.deallocate(b);
    println!(
      "used_memory = {}, num_allocations = {}",
      allocator.used_memory(),
      allocator.num_allocations()
    );
    block_until_enter_pressed();

    println!("[3] releasing the first block — merges forward into the gap left by the second");
    allocator.deallocate(a);
    println!(
      "used_memory = {}, num_allocations = {}",
      allocator.used_memory(),
      allocator.num_allocations()
    );
    block_until_enter_pressed();

    println!("[4] releasing the third block — the free list fully coalesces back to one block");
    allocator.deallocate(c);
    println!(
      "used_memory = {}, num_allocations = {}",
      allocator.used_memory(),
      allocator.num_allocations()
    );

    let layout_arr = Layout::array::<u8>(64).unwrap();
    let big = allocator
      .allocate(layout_arr.size(), layout_arr.align())
      .expect("allocate from the fully-coalesced block");
    println!(
      "\n[5] a fresh 64-byte allocation at {:?} proves the whole region is contiguous again",
      big
    );
    allocator.deallocate(big);
  }
}
