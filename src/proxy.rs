//! Proxy allocator.
//!
//! A thin, counting pass-through over a delegate allocator. The proxy
//! borrows the delegate and never owns a region of its own; its
//! `used_memory`/`num_allocations` track only the traffic that flowed
//! through this particular proxy, computed as the delegate's own counters'
//! delta across each call. This lets a host attribute the same shared
//! allocator's traffic to several independent subsystems.

use std::ptr::NonNull;

use crate::allocator::RegionAllocator;

pub struct ProxyAllocator<'a, A: RegionAllocator> {
  delegate: &'a mut A,
  used_memory: usize,
  num_allocations: usize,
}

impl<'a, A: RegionAllocator> ProxyAllocator<'a, A> {
  /// Wraps `delegate`, which must outlive this proxy.
  pub fn new(delegate: &'a mut A) -> Self {
    Self {
      delegate,
      used_memory: 0,
      num_allocations: 0,
    }
  }
}

unsafe impl<'a, A: RegionAllocator> RegionAllocator for ProxyAllocator<'a, A> {
  unsafe fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
    assert_ne!(size, 0, "allocation size must be non-zero");

    let before = self.delegate.used_memory();
    // SAFETY: forwarding the call to the delegate under the same
    // contract this method documents.
    let address = unsafe { self.delegate.allocate(size, alignment) };

    let Some(address) = address else {
      log::debug!(
        "proxy allocator observed delegate out of space for {size} bytes aligned to {alignment}"
      );
      return None;
    };

    let after = self.delegate.used_memory();
    self.used_memory += after - before;
    self.num_allocations += 1;

    Some(address)
  }

  unsafe fn deallocate(&mut self, address: NonNull<u8>) {
    let before = self.delegate.used_memory();
    // SAFETY: `address` was returned by a prior `allocate` on this
    // proxy, which forwarded it from the same delegate.
    unsafe { self.delegate.deallocate(address) };
    let after = self.delegate.used_memory();

    self.num_allocations -= 1;
    self.used_memory -= before - after;
  }

  fn used_memory(&self) -> usize {
    self.used_memory
  }

  fn num_allocations(&self) -> usize {
    self.num_allocations
  }

  fn size(&self) -> usize {
    self.delegate.size()
  }

  fn start(&self) -> NonNull<u8> {
    self.delegate.start()
  }
}

impl<'a, A: RegionAllocator> Drop for ProxyAllocator<'a, A> {
  fn drop(&mut self) {
    assert!(
      self.used_memory == 0 && self.num_allocations == 0,
      "ProxyAllocator dropped with {} live allocations ({} bytes) still attributed to it",
      self.num_allocations,
      self.used_memory
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::free_list::FreeListAllocator;

  #[test]
  fn e5_proxy_tracks_delegate_deltas_exactly() {
    let mut delegate = FreeListAllocator::new(128).unwrap();
    let mut proxy = ProxyAllocator::new(&mut delegate);

    let mut ptrs = Vec::new();
    unsafe {
      for _ in 0..3 {
        let before = proxy.used_memory();
        let ptr = proxy.allocate(1, 4).unwrap();
        let after = proxy.used_memory();
        assert!(after > before);
        ptrs.push(ptr);
      }

      for ptr in ptrs {
        proxy.deallocate(ptr);
      }
    }

    assert_eq!(proxy.num_allocations(), 0);
    assert_eq!(proxy.used_memory(), 0);
    drop(proxy);
    assert_eq!(delegate.num_allocations(), 0);
    assert_eq!(delegate.used_memory(), 0);
  }

  #[test]
  fn proxy_delta_matches_delegate_delta_per_call() {
    let mut delegate = FreeListAllocator::new(256).unwrap();
    let mut proxy = ProxyAllocator::new(&mut delegate);

    unsafe {
      let before_delegate = proxy.delegate.used_memory();
      let before_proxy = proxy.used_memory();
      let ptr = proxy.allocate(10, 8).unwrap();
      let proxy_delta = proxy.used_memory() - before_proxy;
      let delegate_delta = proxy.delegate.used_memory() - before_delegate;
      assert_eq!(proxy_delta, delegate_delta);

      proxy.deallocate(ptr);
    }
  }
}
