//! Interactive walkthrough of [`fixedalloc::LinearAllocator`].
//!
//! Run with `cargo run --example linear`. Press ENTER between steps to
//! inspect state with `gdb`/`valgrind`/whatever you like.

use std::alloc::Layout;
use std::io::Read;

use fixedalloc::{LinearAllocator, RegionAllocator};

fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() {
  let mut allocator = LinearAllocator::new(4096).expect("construct linear allocator");

  unsafe {
    println!("[start] used_memory = {}", allocator.used_memory());
    block_until_enter_pressed();

    let layout_u32 = Layout::new::<u32>();
    let first = allocator
      .allocate(layout_u32.size(), layout_u32.align())
      .expect("allocate u32");
    (first.as_ptr() as *mut u32).write(0xDEADBEEF);
    println!(
      "[1] allocated u32 at {:?}, used_memory = {}",
      first,
      allocator.used_memory()
    );
    block_until_enter_pressed();

    let layout_arr = Layout::array::<u8>(12).unwrap();
    let second = allocator
      .allocate(layout_arr.size(), layout_arr.align())
      .expect("allocate [u8; 12]");
    std::ptr::write_bytes(second.as_ptr(), 0xAB, 12);
    println!(
      "[2] allocated [u8; 12] at {:?}, used_memory = {}",
      second,
      allocator.used_memory()
    );
    block_until_enter_pressed();

    println!(
      "[3] u32 untouched by later allocations: 0x{:X}",
      (first.as_ptr() as *mut u32).read()
    );

    println!("\n[4] clearing the allocator — both allocations drop at once");
    allocator.clear();
    println!(
      "used_memory = {}, num_allocations = {}",
      allocator.used_memory(),
      allocator.num_allocations()
    );
  }
}
