/*
 * lib.rs
 *
 * Crate wiring and docs. The allocator lives in heap.rs; region.rs and
 * registry.rs are its two halves (boundary management and bookkeeping)
 * and stay private - the public surface is the Heap object.
 */

//! # brkheap
//!
//! A thread-safe first-fit heap allocator over a single growable region,
//! in the mold of the classic sbrk-backed malloc: one linked list of
//! block headers, one global lock, growth at the tail and shrink-on-free
//! at the tail only.
//!
//! Instead of raw pointers, allocations are addressed by opaque
//! byte-offset [`Handle`]s, so the backing store can relocate as it
//! grows without invalidating anything. Payload bytes are moved with
//! [`Heap::read`] and [`Heap::write`].
//!
//! ## Quick Start
//!
//! ```rust
//! use brkheap::Heap;
//!
//! let heap = Heap::new();
//!
//! let handle = heap.allocate(100)?;
//! heap.write(handle, 0, b"hello")?;
//!
//! let mut buf = [0u8; 5];
//! heap.read(handle, 0, &mut buf)?;
//! assert_eq!(&buf, b"hello");
//!
//! heap.release(Some(handle));
//! assert_eq!(heap.brk(), 0); // sole block: the break fell back to zero
//! # Ok::<(), brkheap::AllocError>(())
//! ```
//!
//! ## What it deliberately does not do
//!
//! - No splitting of oversized free blocks and no coalescing of adjacent
//!   ones - first-fit reuse trades fragmentation for simplicity.
//! - Shrink-on-free returns exactly one trailing block per call.
//! - No per-size-class pools, no lock-free paths: one mutex serializes
//!   everything.
//!
//! Each of these is a documented policy of the design this crate models,
//! covered by tests so a change shows up loudly.

pub mod error;
pub mod heap;
mod region;
mod registry;

pub use error::{AllocError, Result};
pub use heap::{BlockInfo, Handle, Heap, HeapConfig};
pub use registry::HEADER_SIZE;
