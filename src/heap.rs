/*
 * heap.rs
 *
 * The allocator itself. One lock around one state struct (region +
 * registry); every public operation takes the lock, does its registry
 * work, touches the break only on a growth miss or a pure-tail release,
 * and returns. No background work, no other suspension points.
 *
 * Release policy is deliberately simple and deliberately kept that way:
 * an interior block is marked free in place (no coalescing with its
 * neighbors), and only a block sitting exactly at the break is given
 * back - one block per call, never a cascade. Don't "improve" either
 * without a test run that measures what it buys.
 */

use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{AllocError, Result};
use crate::region::Region;
use crate::registry::{HEADER_SIZE, Registry};

/// Opaque token for an allocation: the byte offset of the payload inside
/// the heap region. Handles stay valid across backing-store relocation;
/// they die when the block is released (and may be handed out again for
/// a block reusing the same span).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub(crate) usize);

impl Handle {
    /// Payload offset inside the region. Stable for the block's lifetime.
    #[must_use]
    pub fn offset(self) -> usize {
        self.0
    }
}

/// Construction-time knobs. `..Default::default()` is the intended idiom.
#[derive(Debug, Clone, Default)]
pub struct HeapConfig {
    /// Hard cap on the break, in bytes. Growth past it fails with
    /// [`AllocError::HeapExhausted`] exactly as an OS refusal would -
    /// the moral equivalent of RLIMIT_DATA for this heap.
    pub limit: Option<usize>,
    /// Initial backing-capacity hint in bytes. Best effort only; the
    /// region allocates lazily either way and the break starts at zero.
    pub reserve: usize,
}

/// One entry of a registry snapshot, in list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block's header slot.
    pub offset: usize,
    /// Offset of the first payload byte (`offset + HEADER_SIZE`).
    pub payload: usize,
    /// Recorded payload size in bytes.
    pub size: usize,
    pub is_free: bool,
}

struct HeapState {
    region: Region,
    registry: Registry,
}

/// A thread-safe first-fit heap allocator over a single growable region.
///
/// Each `Heap` is fully self-contained - its own region, registry, and
/// lock - so unrelated tests or subsystems can each hold one without
/// sharing anything. Clone-free: share it behind `&` or an `Arc`.
///
/// # Caller obligations
///
/// Releasing a handle twice, or a handle from a different `Heap`, has no
/// specified effect (the call is ignored, matching the "undefined, not
/// detected" contract of the classic allocator this models). The payload
/// accessors do detect dead handles and report [`AllocError::BadHandle`].
pub struct Heap {
    state: Mutex<HeapState>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    #[must_use]
    pub fn with_config(config: HeapConfig) -> Self {
        Self {
            state: Mutex::new(HeapState {
                region: Region::new(config.limit, config.reserve),
                registry: Registry::new(),
            }),
        }
    }

    /// Allocate `size` bytes and return a handle to the payload.
    ///
    /// A free block is reused first-fit when one is large enough; its
    /// recorded size is left untouched, so [`usable_size`](Self::usable_size)
    /// may report more than was asked for. Otherwise the break grows by
    /// `HEADER_SIZE + size`. Zero-sized requests fail.
    pub fn allocate(&self, size: usize) -> Result<Handle> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        let mut state = self.lock();

        if let Some(index) = state.registry.find_free(size) {
            /* first fit: hand the block back whole, size field untouched */
            state.registry.get_mut(index).is_free = false;
            return Ok(Handle(state.registry.get(index).payload()));
        }

        let footprint = HEADER_SIZE
            .checked_add(size)
            .ok_or(AllocError::HeapExhausted { requested: size })?;
        /* surface the caller's size, not the header-inclusive footprint */
        let offset = state
            .region
            .grow(footprint)
            .map_err(|_| AllocError::HeapExhausted { requested: size })?;
        let index = state.registry.append(offset, size);
        Ok(Handle(state.registry.get(index).payload()))
    }

    /// Allocate room for `count` elements of `elem_size` bytes and
    /// zero-fill the whole payload.
    ///
    /// Fails on a zero count or element size, and detects multiplication
    /// overflow before allocating anything.
    pub fn zero_allocate(&self, count: usize, elem_size: usize) -> Result<Handle> {
        if count == 0 || elem_size == 0 {
            return Err(AllocError::ZeroSize);
        }
        let total = count
            .checked_mul(elem_size)
            .ok_or(AllocError::SizeOverflow { count, elem_size })?;

        let handle = self.allocate(total)?;
        self.zero_payload(handle, total)?;
        Ok(handle)
    }

    /// Resize an allocation.
    ///
    /// With no handle, or a `new_size` of zero, this degrades to a plain
    /// [`allocate`](Self::allocate) (where zero still fails). A request
    /// the recorded size already covers returns the same handle
    /// unchanged - no shrink-in-place, the larger footprint is retained.
    /// Otherwise a new block is allocated, the old payload copied over,
    /// and the old handle released; if that allocation fails the old
    /// handle remains valid and the error is returned.
    pub fn reallocate(&self, handle: Option<Handle>, new_size: usize) -> Result<Handle> {
        let Some(old) = handle else {
            return self.allocate(new_size);
        };
        if new_size == 0 {
            return self.allocate(new_size);
        }

        let old_size = {
            let state = self.lock();
            let index = state
                .registry
                .find_in_use(old.0)
                .ok_or(AllocError::BadHandle)?;
            state.registry.get(index).size
        };
        if old_size >= new_size {
            return Ok(old);
        }

        /* growth: new block first, so failure leaves the old one intact */
        let grown = self.allocate(new_size)?;
        {
            let mut state = self.lock();
            state.region.copy_within(old.0, grown.0, old_size);
        }
        self.release(Some(old));
        Ok(grown)
    }

    /// Return an allocation to the pool. `None` is a no-op.
    ///
    /// A block ending exactly at the break is removed from the registry
    /// and the break moves back by its full footprint (header + payload);
    /// any other block is marked free in place for future reuse. A handle
    /// that names no live in-use block is ignored.
    pub fn release(&self, handle: Option<Handle>) {
        let Some(handle) = handle else {
            return;
        };
        let mut state = self.lock();
        let Some(index) = state.registry.find_in_use(handle.0) else {
            /* foreign, stale, or repeated release: caller contract
             * violation, deliberately silent */
            return;
        };
        let end = state.registry.get(index).end();

        if end == state.region.brk() {
            /* shrink path: the physically last block goes back to the OS.
             * exactly one block per call, even if the new tail is also
             * free at the new break */
            debug_assert_eq!(
                Some(index),
                state.registry.tail(),
                "only the tail can end at the break"
            );
            if let Some(removed) = state.registry.remove_tail() {
                state.region.shrink(removed.footprint());
            }
            return;
        }

        /* retain path: keep the block linked, reusable by the next fit */
        state.registry.get_mut(index).is_free = true;
    }

    /// Copy bytes out of a live block's payload, starting at `offset`.
    pub fn read(&self, handle: Handle, offset: usize, buf: &mut [u8]) -> Result<()> {
        let state = self.lock();
        let index = state
            .registry
            .find_in_use(handle.0)
            .ok_or(AllocError::BadHandle)?;
        let block = state.registry.get(index);
        check_span(block.size, offset, buf.len())?;
        buf.copy_from_slice(state.region.bytes(block.payload() + offset, buf.len()));
        Ok(())
    }

    /// Copy bytes into a live block's payload, starting at `offset`.
    pub fn write(&self, handle: Handle, offset: usize, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        let index = state
            .registry
            .find_in_use(handle.0)
            .ok_or(AllocError::BadHandle)?;
        let (payload, size) = {
            let block = state.registry.get(index);
            (block.payload(), block.size)
        };
        check_span(size, offset, bytes.len())?;
        state
            .region
            .bytes_mut(payload + offset, bytes.len())
            .copy_from_slice(bytes);
        Ok(())
    }

    /// Fill a live block's entire recorded payload with `byte`.
    pub fn fill(&self, handle: Handle, byte: u8) -> Result<()> {
        let mut state = self.lock();
        let index = state
            .registry
            .find_in_use(handle.0)
            .ok_or(AllocError::BadHandle)?;
        let (payload, size) = {
            let block = state.registry.get(index);
            (block.payload(), block.size)
        };
        state.region.bytes_mut(payload, size).fill(byte);
        Ok(())
    }

    /// Recorded payload size of a live block, which may exceed what was
    /// requested when the block was handed out by reuse. `None` for a
    /// dead handle.
    #[must_use]
    pub fn usable_size(&self, handle: Handle) -> Option<usize> {
        let state = self.lock();
        let index = state.registry.find_in_use(handle.0)?;
        Some(state.registry.get(index).size)
    }

    /// Current break offset: total region bytes in use, headers included.
    #[must_use]
    pub fn brk(&self) -> usize {
        self.lock().region.brk()
    }

    /// Snapshot of the registry in list order, taken under the lock.
    #[must_use]
    pub fn blocks(&self) -> Vec<BlockInfo> {
        let state = self.lock();
        state
            .registry
            .iter()
            .map(|block| BlockInfo {
                offset: block.offset,
                payload: block.payload(),
                size: block.size,
                is_free: block.is_free,
            })
            .collect()
    }

    /* zero exactly `len` bytes of the payload (the reuse path hands back
     * recycled contents; the append path is already zeroed by the region) */
    fn zero_payload(&self, handle: Handle, len: usize) -> Result<()> {
        let mut state = self.lock();
        let index = state
            .registry
            .find_in_use(handle.0)
            .ok_or(AllocError::BadHandle)?;
        let payload = state.registry.get(index).payload();
        debug_assert!(len <= state.registry.get(index).size);
        state.region.bytes_mut(payload, len).fill(0);
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HeapState> {
        /* a panicking client thread poisons the lock; the critical
         * sections never leave the registry torn, so take the state as-is */
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Heap {
    /* the listing the classic allocator printed for debugging: endpoints
     * plus one line of geometry per block */
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Heap")
            .field("brk", &state.region.brk())
            .field("head", &state.registry.head())
            .field("tail", &state.registry.tail())
            .field("blocks", &state.registry.iter().collect::<Vec<_>>())
            .finish()
    }
}

fn check_span(size: usize, offset: usize, len: usize) -> Result<()> {
    let end = offset
        .checked_add(len)
        .ok_or(AllocError::OutOfBounds { offset, len, size })?;
    if end > size {
        return Err(AllocError::OutOfBounds { offset, len, size });
    }
    Ok(())
}


/* -------------------------------------------------------------------------- */
/*                              kani proofs                                   */
/* -------------------------------------------------------------------------- */

#[cfg(kani)]
mod kani_proofs {
    /*
     * the overflow guard in zero_allocate. the classic C check computes
     * `total = count * elem_size` and rejects when `total / count !=
     * elem_size`; checked_mul must accept exactly the same pairs.
     */
    #[kani::proof]
    fn verify_overflow_guard_matches_division_check() {
        let count: usize = kani::any();
        let elem_size: usize = kani::any();
        kani::assume(count != 0 && elem_size != 0);

        match count.checked_mul(elem_size) {
            Some(total) => kani::assert(
                total / count == elem_size,
                "an accepted product divides back exactly",
            ),
            None => kani::assert(
                elem_size > usize::MAX / count,
                "checked_mul only rejects genuine overflow",
            ),
        }
    }
}
