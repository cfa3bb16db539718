//! # fixedalloc — fixed-capacity, region-backed memory allocators
//!
//! Five allocation strategies over a single contiguous region acquired
//! once at construction, behind one accounting discipline:
//!
//! - [`linear::LinearAllocator`] — bump pointer, bulk reset only.
//! - [`stack::StackAllocator`] — LIFO bump pointer with per-block headers.
//! - [`free_list::FreeListAllocator`] — first-fit free list with split and merge.
//! - [`pool::PoolAllocator`] — fixed-size slots, O(1) alloc/dealloc.
//! - [`proxy::ProxyAllocator`] — counting pass-through over a delegate.
//!
//! Every strategy implements [`allocator::RegionAllocator`], the shared
//! contract: `allocate(size, alignment) -> Option<NonNull<u8>>`,
//! `deallocate(address)`, and read-only `used_memory`/`num_allocations`/
//! `size`/`start` accessors. None of these allocators are thread-safe —
//! each owns its region exclusively and expects strictly sequential,
//! single-owner use; share one across threads only behind external
//! synchronization.
//!
//! ```text
//!   Region (acquired once, fixed size)
//!   ┌──────────────────────────────────────────────────────────┐
//!   │  strategy-specific layout: headers, free lists, slots...  │
//!   └──────────────────────────────────────────────────────────┘
//!   start                                                start+size
//! ```
//!
//! ## Typed helpers
//!
//! [`typed::Owned`] and [`typed::OwnedArray`] ride on top of any
//! [`allocator::RegionAllocator`]: they placement-construct a value (or an
//! array with a length prefix) and release it through the same allocator
//! on `Drop`.
//!
//! ## Out of scope
//!
//! This crate is the allocator core only. A command-line test harness, a
//! micro-benchmark driver, or a high-resolution timer are treated as
//! external clients of the contract above and are not part of this crate.

pub mod align;
pub mod allocator;
pub mod error;
pub mod free_list;
pub mod linear;
pub mod pool;
pub mod proxy;
pub mod stack;
pub mod typed;

pub use allocator::{AnyAllocator, RegionAllocator};
pub use error::ConstructionError;
pub use free_list::FreeListAllocator;
pub use linear::LinearAllocator;
pub use pool::PoolAllocator;
pub use proxy::ProxyAllocator;
pub use stack::StackAllocator;
pub use typed::{Owned, OwnedArray, is_adjusted, is_aligned};
