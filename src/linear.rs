//! Linear (bump) allocator.
//!
//! A single cursor walks forward through the region on every allocation.
//! There is no per-block metadata and no individual `deallocate` — the
//! whole region is released at once via [`LinearAllocator::clear`].
//!
//! ```text
//! start                              top                          start+size
//!   |--------------------------------|------------------------------|
//!   |####### handed out ##############|########## free ##############|
//! ```

use std::ptr::NonNull;

use crate::align::adjustment;
use crate::allocator::{Region, RegionAllocator};
use crate::error::ConstructionError;

pub struct LinearAllocator {
  region: Region,
  top: NonNull<u8>,
  used_memory: usize,
  num_allocations: usize,
}

impl LinearAllocator {
  /// Creates a new allocator over a freshly acquired `size`-byte region.
  pub fn new(size: usize) -> Result<Self, ConstructionError> {
    if size == 0 {
      return Err(ConstructionError::ZeroCapacity);
    }

    let region = Region::new(size);
    let top = region.start();

    Ok(Self {
      region,
      top,
      used_memory: 0,
      num_allocations: 0,
    })
  }

  /// Resets the cursor to the start of the region, discarding every live
  /// allocation at once. Unlike individual `deallocate` calls on the
  /// other strategies, this is always valid regardless of prior state.
  pub fn clear(&mut self) {
    self.top = self.region.start();
    self.used_memory = 0;
    self.num_allocations = 0;
  }
}

unsafe impl RegionAllocator for LinearAllocator {
  unsafe fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
    assert_ne!(size, 0, "allocation size must be non-zero");
    assert!(alignment.is_power_of_two(), "alignment must be a power of two");

    let top_addr = self.top.as_ptr() as usize;
    let d = adjustment(top_addr, alignment);

    if self.used_memory + d + size > self.region.size() {
      log::debug!(
        "linear allocator out of space: requested {size}+{d} of {} remaining",
        self.region.size() - self.used_memory
      );
      return None;
    }

    let aligned_addr = top_addr + d;
    // SAFETY: aligned_addr is within the region, checked above.
    let aligned = unsafe { NonNull::new_unchecked(aligned_addr as *mut u8) };

    self.top = unsafe { NonNull::new_unchecked((aligned_addr + size) as *mut u8) };
    self.used_memory += size + d;
    self.num_allocations += 1;

    Some(aligned)
  }

  unsafe fn deallocate(&mut self, _address: NonNull<u8>) {
    // Individual release isn't supported; use `clear` instead.
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

impl Drop for LinearAllocator {
  fn drop(&mut self) {
    assert!(
      self.used_memory == 0 && self.num_allocations == 0,
      "LinearAllocator dropped with {} live allocations ({} bytes); call clear() first",
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
  fn e1_allocate_thrice_then_clear() {
    let mut a = LinearAllocator::new(1024).unwrap();
    unsafe {
      let a1 = a.allocate(1, 4).unwrap();
      let a2 = a.allocate(1, 4).unwrap();
      let a3 = a.allocate(1, 4).unwrap();
      assert!(is_aligned(a1, 4));
      assert!(is_aligned(a2, 4));
      assert!(is_aligned(a3, 4));
    }
    a.clear();
    assert_eq!(a.num_allocations(), 0);
    assert_eq!(a.used_memory(), 0);
  }

  #[test]
  fn clear_resets_regardless_of_prior_allocations() {
    let mut a = LinearAllocator::new(64).unwrap();
    unsafe {
      a.allocate(8, 8).unwrap();
      a.allocate(16, 8).unwrap();
    }
    a.clear();
    assert_eq!(a.num_allocations(), 0);
    assert_eq!(a.used_memory(), 0);

    unsafe {
      a.allocate(4, 4).unwrap();
    }
    a.clear();
  }

  #[test]
  fn out_of_space_returns_none_without_touching_counters() {
    let mut a = LinearAllocator::new(8).unwrap();
    unsafe {
      assert!(a.allocate(16, 4).is_none());
    }
    assert_eq!(a.used_memory(), 0);
    assert_eq!(a.num_allocations(), 0);
    a.clear();
  }

  #[test]
  fn deallocate_is_a_noop() {
    let mut a = LinearAllocator::new(64).unwrap();
    unsafe {
      let ptr = a.allocate(8, 4).unwrap();
      a.deallocate(ptr);
    }
    assert_eq!(a.num_allocations(), 1);
    a.clear();
  }

  #[test]
  fn zero_capacity_is_rejected() {
    assert!(matches!(LinearAllocator::new(0), Err(ConstructionError::ZeroCapacity)));
  }

  #[test]
  fn bolero_alignment_holds_for_every_successful_allocation() {
    bolero::check!()
      .with_type::<(Vec<(u8, u8)>,)>()
      .for_each(|(ops,)| {
        let mut a = LinearAllocator::new(4096).unwrap();
        for (size, align_pow) in ops {
          let size = (*size as usize % 256) + 1;
          let alignment = 1usize << (*align_pow % 7);
          if let Some(ptr) = unsafe { a.allocate(size, alignment) } {
            assert!(is_aligned(ptr, alignment));
          }
        }
        a.clear();
      });
  }
}
