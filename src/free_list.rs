//! Free-list allocator.
//!
//! A first-fit free-list allocator. Free space is tracked as a singly
//! linked, address-ordered list of [`FreeBlock`]s threaded through the
//! gaps themselves — no side table. Every live allocation is preceded by a
//! [`Header`] recording its total footprint (including padding) and the
//! adjustment used, so that on release the allocator can reconstitute a
//! free block of exactly the right size without consulting anything else.
//!
//! ```text
//! region: [ FreeBlock{size,next} ... ][ Header | live alloc ][ FreeBlock ... ]
//! ```
//!
//! `allocate` walks the list for the first block big enough (first fit),
//! splitting off the remainder when it's large enough to host a
//! [`FreeBlock`] of its own, or consuming the whole block otherwise.
//! `deallocate` reinserts a free block in address order and merges it with
//! whichever neighbors are directly adjacent.

use std::mem::size_of;
use std::ptr::NonNull;

use crate::align::{adjustment, adjustment_with_header};
use crate::allocator::{Region, RegionAllocator};
use crate::error::ConstructionError;

#[repr(C)]
struct Header {
  size: usize,
  adjustment: usize,
}

#[repr(C)]
struct FreeBlock {
  size: usize,
  next: Option<NonNull<FreeBlock>>,
}

const _: () = assert!(
  size_of::<Header>() >= size_of::<FreeBlock>(),
  "Header must be at least as large as FreeBlock: every live allocation's \
   footprint must be re-expressible as a free block on release"
);

pub struct FreeListAllocator {
  region: Region,
  free_list: Option<NonNull<FreeBlock>>,
  used_memory: usize,
  num_allocations: usize,
}

impl FreeListAllocator {
  pub fn new(size: usize) -> Result<Self, ConstructionError> {
    if size == 0 {
      return Err(ConstructionError::ZeroCapacity);
    }
    let header_size = size_of::<Header>();
    if size <= header_size {
      return Err(ConstructionError::CapacityTooSmallForFreeList {
        capacity: size,
        header_size,
      });
    }

    let region = Region::new(size);
    let first_block = region.start().cast::<FreeBlock>();
    // SAFETY: the region is at least `size` bytes and freshly acquired.
    unsafe {
      first_block.write(FreeBlock { size, next: None });
    }

    Ok(Self {
      region,
      free_list: Some(first_block),
      used_memory: 0,
      num_allocations: 0,
    })
  }

  /// The free list, as `(address, size)` pairs in ascending address
  /// order. Exposed for tests of invariant 5 (ascending order, no two
  /// touching blocks).
  #[cfg(test)]
  fn free_blocks(&self) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut cur = self.free_list;
    while let Some(block) = cur {
      // SAFETY: every node in the list is a live FreeBlock.
      let b = unsafe { block.as_ref() };
      out.push((block.as_ptr() as usize, b.size));
      cur = b.next;
    }
    out
  }
}

unsafe impl RegionAllocator for FreeListAllocator {
  unsafe fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
    assert_ne!(size, 0, "allocation size must be non-zero");
    assert!(alignment.is_power_of_two(), "alignment must be a power of two");

    let header_size = size_of::<Header>();

    let mut prev: Option<NonNull<FreeBlock>> = None;
    let mut cur = self.free_list;

    while let Some(block) = cur {
      let block_addr = block.as_ptr() as usize;
      let d = adjustment_with_header(block_addr, alignment, header_size);
      let total = size + d;

      // SAFETY: `block` is a live node in the free list; read its
      // fields into locals before any writes touch this memory.
      let (block_size, block_next) = unsafe { (block.as_ref().size, block.as_ref().next) };

      if block_size < total {
        prev = cur;
        cur = block_next;
        continue;
      }

      let total = if block_size - total <= header_size {
        // Remainder too small to host its own FreeBlock: consume
        // the whole block and unlink it.
        match prev {
          Some(mut p) => unsafe { p.as_mut().next = block_next },
          None => self.free_list = block_next,
        }
        block_size
      } else {
        // Split: carve a new FreeBlock out of the remainder.
        let new_block_addr = block_addr + total;
        let mut new_block = unsafe {
          NonNull::new_unchecked(new_block_addr as *mut FreeBlock)
        };
        unsafe {
          new_block.as_mut().size = block_size - total;
          new_block.as_mut().next = block_next;
        }
        match prev {
          Some(mut p) => unsafe { p.as_mut().next = Some(new_block) },
          None => self.free_list = Some(new_block),
        }
        total
      };

      let aligned_addr = block_addr + d;
      let header_ptr = (aligned_addr - header_size) as *mut Header;
      // SAFETY: header_size bytes immediately before aligned_addr are
      // reserved padding within the block just consumed.
      unsafe { header_ptr.write(Header { size: total, adjustment: d }) };

      self.used_memory += total;
      self.num_allocations += 1;

      debug_assert_eq!(adjustment(aligned_addr, alignment), 0);
      // SAFETY: aligned_addr lies within the region.
      return Some(unsafe { NonNull::new_unchecked(aligned_addr as *mut u8) });
    }

    log::debug!("free-list allocator out of space for {size} bytes aligned to {alignment}");
    None
  }

  unsafe fn deallocate(&mut self, address: NonNull<u8>) {
    let header_size = size_of::<Header>();
    let addr = address.as_ptr() as usize;
    // SAFETY: `address` was returned by a prior `allocate`, so its
    // header immediately precedes it.
    let header = unsafe { &*((addr - header_size) as *const Header) };

    let total = header.size;
    let block_start = addr - header.adjustment;
    let block_end = block_start + total;

    let mut prev: Option<NonNull<FreeBlock>> = None;
    let mut cur = self.free_list;
    while let Some(block) = cur {
      if block.as_ptr() as usize >= block_end {
        break;
      }
      prev = cur;
      // SAFETY: `block` is a live free-list node.
      cur = unsafe { block.as_ref().next };
    }

    let mut new_block = match prev {
      None => {
        // Freed region precedes every existing free block: link at
        // the head.
        let mut nb = unsafe { NonNull::new_unchecked(block_start as *mut FreeBlock) };
        unsafe {
          nb.as_mut().size = total;
          nb.as_mut().next = self.free_list;
        }
        self.free_list = Some(nb);
        nb
      }
      Some(mut p) => {
        let p_addr = p.as_ptr() as usize;
        // SAFETY: `p` is a live free-list node.
        let p_size = unsafe { p.as_ref().size };
        if p_addr + p_size == block_start {
          // Backward-adjacent: full coalesce, extend size and
          // keep the existing `next` (see DESIGN.md open
          // question #1).
          unsafe { p.as_mut().size += total };
          p
        } else {
          let mut nb =
            unsafe { NonNull::new_unchecked(block_start as *mut FreeBlock) };
          unsafe {
            nb.as_mut().size = total;
            nb.as_mut().next = p.as_ref().next;
            p.as_mut().next = Some(nb);
          }
          nb
        }
      }
    };

    if let Some(next) = cur {
      if next.as_ptr() as usize == block_end {
        // Forward-adjacent: absorb `next` entirely.
        // SAFETY: `next` is a live free-list node.
        let (next_size, next_next) = unsafe { (next.as_ref().size, next.as_ref().next) };
        unsafe {
          new_block.as_mut().size += next_size;
          new_block.as_mut().next = next_next;
        }
      }
    }

    self.used_memory -= total;
    self.num_allocations -= 1;
  }

  fn used_memory(&self) -> usize {
    self.used_memory
  }

  fn num_allocations(&self) -> usize {
    self.num_allocations
  }

  fn size(&self) -> usize {
    self.region.size()
  }

  fn start(&self) -> NonNull<u8> {
    self.region.start()
  }
}

impl Drop for FreeListAllocator {
  fn drop(&mut self) {
    assert!(
      self.used_memory == 0 && self.num_allocations == 0,
      "FreeListAllocator dropped with {} live allocations ({} bytes)",
      self.num_allocations,
      self.used_memory
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn is_aligned(ptr: NonNull<u8>, alignment: usize) -> bool {
    (ptr.as_ptr() as usize) % alignment == 0
  }

  #[test]
  fn e3_release_in_different_order_fully_coalesces() {
    let mut a = FreeListAllocator::new(128).unwrap();
    unsafe {
      let a1 = a.allocate(1, 4).unwrap();
      let a2 = a.allocate(1, 4).unwrap();
      let a3 = a.allocate(1, 4).unwrap();
      a.deallocate(a2);
      a.deallocate(a1);
      a.deallocate(a3);
    }
    assert_eq!(a.num_allocations(), 0);
    assert_eq!(a.used_memory(), 0);

    let blocks = a.free_blocks();
    assert_eq!(blocks.len(), 1, "expected a single fully-coalesced free block");
    assert_eq!(blocks[0], (a.start().as_ptr() as usize, 128));
  }

  #[test]
  fn e6_array_like_sequence_with_assigned_values() {
    // Exercises the same allocate/write/read/deallocate shape as the
    // array helper scenario, directly against the raw allocator.
    let mut a = FreeListAllocator::new(128).unwrap();
    unsafe {
      let ptr = a.allocate(size_of::<i32>() * 3, std::mem::align_of::<i32>()).unwrap();
      let base = ptr.as_ptr() as *mut i32;
      base.write(2);
      base.add(1).write(4);
      base.add(2).write(6);

      assert_eq!(base.read(), 2);
      assert_eq!(base.add(1).read(), 4);
      assert_eq!(base.add(2).read(), 6);

      a.deallocate(ptr);
    }
    assert_eq!(a.num_allocations(), 0);
    assert_eq!(a.used_memory(), 0);
  }

  #[test]
  fn invariant_free_list_stays_ascending_and_non_touching() {
    let mut a = FreeListAllocator::new(256).unwrap();
    let mut live = Vec::new();
    unsafe {
      for _ in 0..8 {
        live.push(a.allocate(7, 4).unwrap());
      }
      // release every other one, then the rest, in a shuffled order
      a.deallocate(live[1]);
      a.deallocate(live[3]);
      a.deallocate(live[5]);
      a.deallocate(live[7]);
      a.deallocate(live[0]);
      a.deallocate(live[2]);
      a.deallocate(live[4]);
      a.deallocate(live[6]);
    }

    let blocks = a.free_blocks();
    let addrs: Vec<usize> = blocks.iter().map(|(addr, _)| *addr).collect();
    let sorted = {
      let mut s = addrs.clone();
      s.sort_unstable();
      s
    };
    assert_eq!(addrs, sorted, "free list must stay in ascending address order");
    for w in blocks.windows(2) {
      let (addr_a, size_a) = w[0];
      let (addr_b, _) = w[1];
      assert!(addr_a + size_a < addr_b, "adjacent free blocks must have been merged");
    }
    assert_eq!(a.num_allocations(), 0);
    assert_eq!(a.used_memory(), 0);
  }

  #[test]
  fn zero_capacity_is_rejected() {
    assert!(matches!(FreeListAllocator::new(0), Err(ConstructionError::ZeroCapacity)));
  }

  #[test]
  fn capacity_not_exceeding_header_is_rejected() {
    let header_size = size_of::<Header>();
    assert!(FreeListAllocator::new(header_size).is_err());
  }

  #[test]
  fn bolero_alignment_holds_under_mixed_alloc_dealloc() {
    bolero::check!()
      .with_type::<(Vec<(u8, u8, bool)>,)>()
      .for_each(|(ops,)| {
        let mut a = FreeListAllocator::new(16 * 1024).unwrap();
        let mut live: Vec<NonNull<u8>> = Vec::new();
        for (size, align_pow, release) in ops {
          if *release && !live.is_empty() {
            let idx = (*size as usize) % live.len();
            let ptr = live.swap_remove(idx);
            unsafe { a.deallocate(ptr) };
            continue;
          }
          let size = (*size as usize % 128) + 1;
          let alignment = 1usize << (*align_pow % 6);
          if let Some(ptr) = unsafe { a.allocate(size, alignment) } {
            assert!(is_aligned(ptr, alignment));
            live.push(ptr);
          }
        }
        for ptr in live {
          unsafe { a.deallocate(ptr) };
        }
      });
  }
}
