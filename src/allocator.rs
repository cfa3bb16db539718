//! The shared allocator contract.
//!
//! Every strategy in this crate owns a [`Region`] — one contiguous byte
//! range acquired once from the host heap — and tracks `used_memory` and
//! `num_allocations` over it. [`RegionAllocator`] is the capability set
//! common to all five strategies; callers that need strategy-specific
//! behavior (`clear` on [`crate::linear::LinearAllocator`]) go through the
//! concrete type or through [`AnyAllocator`]'s narrowing accessors.

use std::ptr::NonNull;

/// A single contiguous byte range, acquired from the host heap at
/// construction and released on [`Drop`].
///
/// `start` carries whatever alignment `libc::malloc` returns; each strategy
/// is responsible for aligning the blocks it carves out of it.
pub(crate) struct Region {
  start: NonNull<u8>,
  size: usize,
}

impl Region {
  /// Acquires a region of exactly `size` bytes from the host heap.
  ///
  /// # Panics
  ///
  /// Panics if `size == 0` or if the host heap cannot satisfy the
  /// request — there is no recoverable path for a construction-time
  /// allocation failure in this crate.
  pub(crate) fn new(size: usize) -> Self {
    assert!(size > 0, "region size must be non-zero");

    // SAFETY: libc::malloc is safe to call with any non-zero size; we
    // check the returned pointer for null below before using it.
    let raw = unsafe { libc::malloc(size) };
    let start = NonNull::new(raw as *mut u8).unwrap_or_else(|| {
      panic!("failed to acquire a {size}-byte region from the host heap")
    });

    log::trace!("acquired {size}-byte region at {:?}", start.as_ptr());

    Self { start, size }
  }

  #[inline]
  pub(crate) fn start(&self) -> NonNull<u8> {
    self.start
  }

  #[inline]
  pub(crate) fn size(&self) -> usize {
    self.size
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    // SAFETY: `start` was returned by a matching `libc::malloc` and is
    // freed exactly once, here.
    unsafe { libc::free(self.start.as_ptr() as *mut libc::c_void) };
  }
}

/// The contract shared by every allocation strategy in this crate.
///
/// # Safety
///
/// Implementors must uphold the accounting invariants documented on each
/// method: `used_memory` and `num_allocations` must exactly reflect the
/// live ranges handed out through `allocate` and not yet returned through
/// `deallocate`. Callers must not use an address after deallocating it, and
/// must not deallocate an address this allocator did not return.
pub unsafe trait RegionAllocator {
  /// Requests `size` bytes aligned to `alignment`.
  ///
  /// `alignment` must be a non-zero power of two and `size` must be
  /// non-zero; violating either is a programmer error (`assert!`/
  /// `debug_assert!`, per implementation). Returns `None` if the region
  /// cannot currently satisfy the request — this is the only expected
  /// runtime failure.
  ///
  /// # Safety
  ///
  /// The returned address is a borrowed view into this allocator's
  /// region. It must be released through [`RegionAllocator::deallocate`]
  /// on this same allocator (or, for [`crate::linear::LinearAllocator`],
  /// through `clear`) before it is reused.
  unsafe fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>>;

  /// Releases an address previously returned by [`RegionAllocator::allocate`]
  /// on this same allocator.
  ///
  /// # Safety
  ///
  /// `address` must have been returned by a prior `allocate` call on this
  /// allocator and must not already have been deallocated. The caller
  /// must not access the memory behind `address` afterwards.
  unsafe fn deallocate(&mut self, address: NonNull<u8>);

  /// Bytes currently handed out, including any padding or header the
  /// strategy inserted on the caller's behalf.
  fn used_memory(&self) -> usize;

  /// Count of currently-live allocations.
  fn num_allocations(&self) -> usize;

  /// Total capacity of the backing region, in bytes.
  fn size(&self) -> usize;

  /// The first address of the backing region.
  fn start(&self) -> NonNull<u8>;
}

/// Static-dispatch union of the four region-owning strategies, for callers
/// that want to select a strategy at runtime without paying for a trait
/// object.
///
/// [`crate::proxy::ProxyAllocator`] is left out: it borrows a delegate
/// rather than owning a region, which makes it generic over the delegate's
/// type and lifetime and a poor fit for a flat enum. Wrap whichever
/// variant you need directly instead.
///
/// Strategy-specific operations (e.g. `clear` on linear) aren't part of
/// [`RegionAllocator`]; match on the variant to reach them.
pub enum AnyAllocator {
  Linear(crate::linear::LinearAllocator),
  Stack(crate::stack::StackAllocator),
  FreeList(crate::free_list::FreeListAllocator),
  Pool(crate::pool::PoolAllocator),
}

unsafe impl RegionAllocator for AnyAllocator {
  unsafe fn allocate(&mut self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
    match self {
      Self::Linear(a) => unsafe { a.allocate(size, alignment) },
      Self::Stack(a) => unsafe { a.allocate(size, alignment) },
      Self::FreeList(a) => unsafe { a.allocate(size, alignment) },
      Self::Pool(a) => unsafe { a.allocate(size, alignment) },
    }
  }

  unsafe fn deallocate(&mut self, address: NonNull<u8>) {
    match self {
      Self::Linear(a) => unsafe { a.deallocate(address) },
      Self::Stack(a) => unsafe { a.deallocate(address) },
      Self::FreeList(a) => unsafe { a.deallocate(address) },
      Self::Pool(a) => unsafe { a.deallocate(address) },
    }
  }

  fn used_memory(&self) -> usize {
    match self {
      Self::Linear(a) => a.used_memory(),
      Self::Stack(a) => a.used_memory(),
      Self::FreeList(a) => a.used_memory(),
      Self::Pool(a) => a.used_memory(),
    }
  }

  fn num_allocations(&self) -> usize {
    match self {
      Self::Linear(a) => a.num_allocations(),
      Self::Stack(a) => a.num_allocations(),
      Self::FreeList(a) => a.num_allocations(),
      Self::Pool(a) => a.num_allocations(),
    }
  }

  fn size(&self) -> usize {
    match self {
      Self::Linear(a) => a.size(),
      Self::Stack(a) => a.size(),
      Self::FreeList(a) => a.size(),
      Self::Pool(a) => a.size(),
    }
  }

  fn start(&self) -> NonNull<u8> {
    match self {
      Self::Linear(a) => a.start(),
      Self::Stack(a) => a.start(),
      Self::FreeList(a) => a.start(),
      Self::Pool(a) => a.start(),
    }
  }
}
