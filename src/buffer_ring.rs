//! Statically placed sample blocks the transfer engine fills in round-robin order.
//!
//! # Overview
//! - `N` blocks of `LEN` samples, laid out contiguously and never moved.
//! - The transfer engine writes block contents; the CPU only reads them.
//! - Consumers get blocks by reference. Nothing stops the engine from
//!   refilling a block a slow consumer still holds: the ring is `N` deep so a
//!   consumer has roughly `N - 1` block periods to finish with it.
//!
//! # Overwrite detection
//! Each slot carries a generation stamp. Handing a block off stamps the slot
//! with the block's sequence number; the engine starting to refill the slot
//! clears it. [`Block::read_into`] validates the stamp before and after
//! copying, so a copy that raced a refill is reported instead of returned.
//! The stamp is only updated at block boundaries, from the completion
//! handler, so a refill is noticed with at most one interrupt latency of delay.

use core::cell::UnsafeCell;
use core::ptr;

use crate::error::{Error, Result};
use crate::hal::Sample;
use crate::sync::{AtomicU32, Ordering, fence};

/// Sequence stamp of a slot that is being (re)filled.
const FILLING: u32 = 0;

pub struct BufferRing<S: Sample, const LEN: usize, const N: usize> {
    blocks: UnsafeCell<[[S; LEN]; N]>,
    generation: [AtomicU32; N],
}

// SAFETY: the CPU never writes block contents after construction. Readers go
// through raw pointers and either accept the documented overwrite hazard
// (`Block::as_slice`) or validate the generation stamp (`Block::read_into`).
unsafe impl<S: Sample, const LEN: usize, const N: usize> Sync for BufferRing<S, LEN, N> {}

impl<S: Sample, const LEN: usize, const N: usize> BufferRing<S, LEN, N> {
    pub const fn new() -> Self {
        const {
            assert!(N >= 2, "ping-pong transfers need at least two blocks");
            assert!(LEN > 0, "blocks must hold at least one sample");
            assert!(LEN <= u32::MAX as usize, "block length must fit a transfer count");
        };
        Self {
            blocks: UnsafeCell::new([[S::ZERO; LEN]; N]),
            generation: [const { AtomicU32::new(FILLING) }; N],
        }
    }

    /// Number of blocks in the ring.
    #[inline]
    pub const fn depth(&self) -> usize {
        N
    }

    /// Samples per block.
    #[inline]
    pub const fn block_len(&self) -> usize {
        LEN
    }

    /// Address of the first sample of `slot`, as handed to the transfer engine.
    ///
    /// # Panics
    /// If `slot >= N`.
    #[inline]
    pub fn block_ptr(&self, slot: usize) -> *mut S {
        assert!(slot < N, "slot {} out of range for a ring of {}", slot, N);
        self.blocks
            .get()
            .cast::<[S; LEN]>()
            .wrapping_add(slot)
            .cast::<S>()
    }

    /// Sequence number the slot was last handed off with, or 0 while it fills.
    #[inline]
    pub fn generation(&self, slot: usize) -> u32 {
        self.generation[slot].load(Ordering::Acquire)
    }

    pub(crate) fn publish(&self, slot: usize, sequence: u32) {
        self.generation[slot].store(sequence, Ordering::Release);
    }

    pub(crate) fn mark_filling(&self, slot: usize) {
        self.generation[slot].store(FILLING, Ordering::Release);
    }

    /// Handle to a handed-off block.
    #[inline]
    pub fn block(&self, handle: BlockRef) -> Block<'_, S, LEN, N> {
        Block { ring: self, handle }
    }
}

impl<S: Sample, const LEN: usize, const N: usize> Default for BufferRing<S, LEN, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// What a consumer queue carries: which slot was handed off, and when.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockRef {
    pub(crate) slot: usize,
    pub(crate) sequence: u32,
}

impl BlockRef {
    #[inline]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

/// A completed block, borrowed from its ring.
#[derive(Copy, Clone)]
pub struct Block<'a, S: Sample, const LEN: usize, const N: usize> {
    ring: &'a BufferRing<S, LEN, N>,
    handle: BlockRef,
}

impl<'a, S: Sample, const LEN: usize, const N: usize> Block<'a, S, LEN, N> {
    /// Handoff sequence number. Gaps between consecutive blocks seen by one
    /// consumer are blocks its queue evicted.
    #[inline]
    pub fn sequence(&self) -> u32 {
        self.handle.sequence
    }

    /// Ring slot the block lives in.
    #[inline]
    pub fn slot(&self) -> usize {
        self.handle.slot
    }

    #[inline]
    pub fn handle(&self) -> BlockRef {
        self.handle
    }

    /// Samples in the block; fixed at compile time.
    #[inline]
    pub const fn len(&self) -> usize {
        LEN
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        LEN == 0
    }

    /// Size of the block contents in bytes.
    #[inline]
    pub const fn byte_len(&self) -> usize {
        LEN * core::mem::size_of::<S>()
    }

    #[inline]
    pub fn as_ptr(&self) -> *const S {
        self.ring.block_ptr(self.handle.slot).cast_const()
    }

    /// Whether the transfer engine has not started refilling the block yet.
    #[inline]
    pub fn is_current(&self) -> bool {
        self.ring.generation(self.handle.slot) == self.handle.sequence
    }

    /// Borrow the samples in place.
    ///
    /// # Safety
    /// The transfer engine refills this slot `N - 1` block periods after it
    /// was handed off. The caller must be done with the slice before then;
    /// nothing checks this.
    #[inline]
    pub unsafe fn as_slice(&self) -> &'a [S] {
        // SAFETY: the slot is in bounds and stays allocated for the ring's
        // lifetime; freshness is the caller's obligation.
        unsafe { core::slice::from_raw_parts(self.ring.block_ptr(self.handle.slot), LEN) }
    }

    /// Raw bytes of the block, in memory order.
    ///
    /// # Safety
    /// Same contract as [`Block::as_slice`].
    #[inline]
    pub unsafe fn as_bytes(&self) -> &'a [u8] {
        // SAFETY: samples are plain integers with no padding.
        unsafe {
            core::slice::from_raw_parts(
                self.ring.block_ptr(self.handle.slot).cast::<u8>(),
                self.byte_len(),
            )
        }
    }

    /// Copy up to `out.len()` samples out of the block.
    ///
    /// Fails with [`Error::BlockOverwritten`] if the slot was (or started
    /// being) refilled around the copy, leaving `out` with unspecified
    /// contents. Returns the number of samples copied.
    pub fn read_into(&self, out: &mut [S]) -> Result<usize> {
        let stale = Error::BlockOverwritten {
            sequence: self.handle.sequence,
        };
        if !self.is_current() {
            return Err(stale);
        }

        let count = out.len().min(LEN);
        let src = self.ring.block_ptr(self.handle.slot);
        for (i, dst) in out[..count].iter_mut().enumerate() {
            // SAFETY: `i < LEN`, inside the slot. Volatile because the
            // transfer engine writes this memory behind the compiler's back.
            *dst = unsafe { ptr::read_volatile(src.add(i)) };
        }

        fence(Ordering::Acquire);
        if !self.is_current() {
            return Err(stale);
        }
        Ok(count)
    }
}

impl<S: Sample, const LEN: usize, const N: usize> core::fmt::Debug
    for Block<'_, S, LEN, N>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Block")
            .field("slot", &self.handle.slot)
            .field("sequence", &self.handle.sequence)
            .field("len", &LEN)
            .finish()
    }
}
