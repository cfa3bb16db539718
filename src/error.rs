//! Construction-time errors.
//!
//! Runtime `allocate`/`deallocate` keep the library's two-tier model: out of
//! space returns `None`, contract violations panic via `assert!`. Bad
//! constructor parameters get a typed error instead, since they're always
//! known up front and there's no reason to make the caller find out by
//! crashing.

use thiserror::Error;

/// Why an allocator could not be constructed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstructionError {
  /// `size` passed to a constructor was `0`.
  #[error("capacity must be non-zero")]
  ZeroCapacity,

  /// The free-list allocator requires room for at least one free-block
  /// header on top of anything it will ever hand out.
  #[error("free-list capacity {capacity} must exceed the free-block header size {header_size}")]
  CapacityTooSmallForFreeList { capacity: usize, header_size: usize },

  /// Pool slots must be large enough to thread a free-list pointer
  /// through themselves while unused.
  #[error("pool object size {object_size} must be at least {pointer_size} (a pointer)")]
  ObjectSmallerThanPointer {
    object_size: usize,
    pointer_size: usize,
  },

  /// The pool's region, once the leading alignment padding is accounted
  /// for, isn't large enough to fit even one object.
  #[error("pool capacity {capacity} cannot fit a single {object_size}-byte object")]
  CapacityTooSmallForPool { capacity: usize, object_size: usize },

  /// An alignment argument was `0` or not a power of two.
  #[error("alignment {0} must be a non-zero power of two")]
  InvalidAlignment(usize),
}
