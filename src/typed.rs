//! Typed helpers over the raw allocator contract.
//!
//! The allocator contract in [`crate::allocator`] hands out untyped byte
//! ranges. These helpers layer placement construction/destruction on top,
//! and pair each allocation with the allocator that must release it —
//! mirroring `alloc::make_unique`, `alloc::AllocateArray` and
//! `alloc::destroy` in the C++ source this crate's strategies are ported
//! from.

use std::mem::{align_of, size_of};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::align::adjustment;
use crate::allocator::RegionAllocator;

/// Returns `true` if `addr` is aligned to `alignment` (a plain modulus
/// check, for test assertions — distinct from [`is_adjusted`] below).
#[inline]
pub fn is_aligned(addr: usize, alignment: usize) -> bool {
  addr % alignment == 0
}

/// Returns `true` if no adjustment would be needed to align `addr` to
/// `alignment`. Equivalent to [`is_aligned`] for plain alignment checks,
/// but answers the question in terms of the adjustment arithmetic itself
/// rather than a raw modulus, which matters once a caller is reasoning
/// about headers rather than bare addresses.
#[inline]
pub fn is_adjusted(addr: usize, alignment: usize) -> bool {
  adjustment(addr, alignment) == 0
}

/// An owning handle over a single `T` allocated from `A`.
///
/// Dropping it runs `T`'s destructor and returns the range through the
/// allocator that produced it. The allocator is referenced through a raw
/// pointer rather than a borrow, mirroring the C++ `alloc::unique_ptr`
/// deleter, which also holds a raw `Allocator*`.
///
/// # Safety invariant
///
/// The allocator behind `allocator` must outlive this handle.
pub struct Owned<T, A: RegionAllocator> {
  ptr: NonNull<T>,
  allocator: *mut A,
}

impl<T, A: RegionAllocator> Owned<T, A> {
  /// Allocates room for a `T` in `allocator`, placement-constructs
  /// `value` into it, and returns an owning handle.
  ///
  /// Returns `None` if the allocator cannot satisfy the request; `value`
  /// is dropped in that case.
  ///
  /// # Safety
  ///
  /// `allocator` must outlive the returned handle.
  pub unsafe fn new_in(allocator: &mut A, value: T) -> Option<Self> {
    // SAFETY: forwarding to the allocator under its documented contract.
    let raw = unsafe { allocator.allocate(size_of::<T>(), align_of::<T>())? };
    let ptr = raw.cast::<T>();
    // SAFETY: `ptr` is a fresh, uninitialized, correctly aligned `T`-sized range.
    unsafe { ptr.as_ptr().write(value) };

    Some(Self {
      ptr,
      allocator: allocator as *mut A,
    })
  }
}

impl<T, A: RegionAllocator> Deref for Owned<T, A> {
  type Target = T;

  fn deref(&self) -> &T {
    // SAFETY: `ptr` was constructed in `new_in` and is valid until `Drop`.
    unsafe { self.ptr.as_ref() }
  }
}

impl<T, A: RegionAllocator> DerefMut for Owned<T, A> {
  fn deref_mut(&mut self) -> &mut T {
    // SAFETY: `ptr` was constructed in `new_in` and is valid until `Drop`.
    unsafe { self.ptr.as_mut() }
  }
}

impl<T, A: RegionAllocator> Drop for Owned<T, A> {
  fn drop(&mut self) {
    // SAFETY: `ptr` is live until this point, and `allocator` outlives
    // this handle per the type's safety invariant.
    unsafe {
      self.ptr.as_ptr().drop_in_place();
      (*self.allocator).deallocate(self.ptr.cast());
    }
  }
}

/// Bytes reserved ahead of the first array element to store the array's
/// length: the smallest power of two no less than `align_of::<T>()` that
/// can also hold a `usize`. Always a whole multiple of `align_of::<T>()`,
/// so the returned data pointer stays `T`-aligned. See `DESIGN.md` (open
/// question on the array helper's header size).
#[inline]
fn array_header_bytes<T>() -> usize {
  size_of::<usize>().max(align_of::<T>())
}

/// An owning handle over an array of `len` `T`s allocated from `A`.
///
/// The element count is stored in a length header immediately before the
/// first element, so `destruct` doesn't need to be told the length again.
pub struct OwnedArray<T, A: RegionAllocator> {
  data: NonNull<T>,
  len: usize,
  allocator: *mut A,
}

impl<T, A: RegionAllocator> OwnedArray<T, A> {
  /// Allocates room for `len` `T`s plus a length header in `allocator`,
  /// default-constructs every element via `Default::default()`, and
  /// returns an owning handle.
  ///
  /// # Safety
  ///
  /// `allocator` must outlive the returned handle.
  pub unsafe fn new_in(allocator: &mut A, len: usize) -> Option<Self>
  where
    T: Default,
  {
    assert_ne!(len, 0, "array length must be non-zero");

    let header_bytes = array_header_bytes::<T>();
    let total_bytes = header_bytes + len * size_of::<T>();

    // SAFETY: forwarding to the allocator under its documented contract.
    let base = unsafe { allocator.allocate(total_bytes, align_of::<T>())? };
    let base_addr = base.as_ptr() as usize;

    let length_addr = base_addr + header_bytes - size_of::<usize>();
    // SAFETY: length_addr..+size_of::<usize>() is reserved header space.
    unsafe { (length_addr as *mut usize).write(len) };

    let data = NonNull::new(base_addr.wrapping_add(header_bytes) as *mut T)
      .expect("non-null base yields a non-null data pointer");

    for i in 0..len {
      // SAFETY: each slot is within the allocation and not yet initialized.
      unsafe { data.as_ptr().add(i).write(T::default()) };
    }

    Some(Self {
      data,
      len,
      allocator: allocator as *mut A,
    })
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}

impl<T, A: RegionAllocator> Deref for OwnedArray<T, A> {
  type Target = [T];

  fn deref(&self) -> &[T] {
    // SAFETY: `data` points at `len` initialized, contiguous `T`s.
    unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len) }
  }
}

impl<T, A: RegionAllocator> DerefMut for OwnedArray<T, A> {
  fn deref_mut(&mut self) -> &mut [T] {
    // SAFETY: `data` points at `len` initialized, contiguous `T`s.
    unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
  }
}

impl<T, A: RegionAllocator> Drop for OwnedArray<T, A> {
  fn drop(&mut self) {
    let header_bytes = array_header_bytes::<T>();
    // SAFETY: every element is live until this point.
    for i in 0..self.len {
      unsafe { self.data.as_ptr().add(i).drop_in_place() };
    }

    let base_addr = self.data.as_ptr() as usize - header_bytes;
    // SAFETY: `base_addr` is the address this array was allocated at,
    // and `allocator` outlives this handle per the type's invariant.
    unsafe {
      let base = NonNull::new_unchecked(base_addr as *mut u8);
      (*self.allocator).deallocate(base);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::free_list::FreeListAllocator;

  #[test]
  fn owned_roundtrips_a_value() {
    let mut a = FreeListAllocator::new(128).unwrap();
    let owned = unsafe { Owned::new_in(&mut a, 42u64) }.unwrap();
    assert_eq!(*owned, 42);
    drop(owned);
    assert_eq!(a.num_allocations(), 0);
    assert_eq!(a.used_memory(), 0);
  }

  #[test]
  fn owned_mutation_is_visible() {
    let mut a = FreeListAllocator::new(128).unwrap();
    let mut owned = unsafe { Owned::new_in(&mut a, 1i32) }.unwrap();
    *owned += 41;
    assert_eq!(*owned, 42);
  }

  #[test]
  fn e6_array_write_read_destroy_round_trip() {
    let mut a = FreeListAllocator::new(256).unwrap();
    let mut array: OwnedArray<i32, _> = unsafe { OwnedArray::new_in(&mut a, 3) }.unwrap();

    array[0] = 2;
    array[1] = 4;
    array[2] = 6;

    assert_eq!(&*array, &[2, 4, 6]);

    drop(array);
    assert_eq!(a.num_allocations(), 0);
    assert_eq!(a.used_memory(), 0);
  }

  #[test]
  fn array_data_pointer_is_t_aligned() {
    let mut a = FreeListAllocator::new(512).unwrap();
    let array: OwnedArray<u128, _> = unsafe { OwnedArray::new_in(&mut a, 4) }.unwrap();
    assert!(is_aligned(array.data.as_ptr() as usize, align_of::<u128>()));
  }

  #[test]
  fn is_aligned_and_is_adjusted_agree_on_plain_alignment() {
    for alignment in [1usize, 2, 4, 8, 16] {
      for addr in 0..64usize {
        assert_eq!(is_aligned(addr, alignment), is_adjusted(addr, alignment));
      }
    }
  }
}
