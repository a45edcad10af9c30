/*
 * error.rs
 *
 * Everything the allocator can report. Two real families: the caller
 * handed us bad arguments, or the region refused to grow. There is no
 * abort path anywhere in this crate - every failure comes back as Err
 * and the heap stays usable.
 */

use core::fmt;

/* everything that can go wrong */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Zero-byte request. Allocating nothing is defined to fail rather
    /// than hand out an ambiguous empty block.
    ZeroSize,
    /// `count * elem_size` does not fit in `usize`.
    SizeOverflow { count: usize, elem_size: usize },
    /// The region declined to move the break forward. The registry is
    /// unchanged; smaller requests may still succeed.
    HeapExhausted { requested: usize },
    /// Handle does not name a live in-use block (payload accessors only).
    BadHandle,
    /// Payload access past the block's recorded size.
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize => write!(f, "zero-sized request"),
            Self::SizeOverflow { count, elem_size } => {
                write!(f, "size overflow: {count} elements of {elem_size} bytes")
            }
            Self::HeapExhausted { requested } => {
                write!(f, "heap exhausted: cannot grow by {requested} bytes")
            }
            Self::BadHandle => write!(f, "handle does not name a live block"),
            Self::OutOfBounds { offset, len, size } => {
                write!(
                    f,
                    "access out of bounds: {len} bytes at offset {offset} in a {size}-byte block"
                )
            }
        }
    }
}

impl std::error::Error for AllocError {}

impl AllocError {
    /* argument errors never touched heap state; exhaustion didn't either,
     * but the distinction matters to callers deciding whether to retry */
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            Self::ZeroSize
            | Self::SizeOverflow { .. }
            | Self::BadHandle
            | Self::OutOfBounds { .. } => true,
            Self::HeapExhausted { .. } => false,
        }
    }
}

pub type Result<T> = core::result::Result<T, AllocError>;
