//! Continuous DMA sample acquisition for no-std embedded targets.
//!
//! # Highlights
//! - Ping-pong transfer channels fill a static ring of sample blocks with no
//!   CPU work per sample; only block boundaries interrupt.
//! - Each finished block is handed off by reference to a fixed set of
//!   consumer queues.
//! - Consumer queues are lossy: a consumer that falls behind loses its oldest
//!   blocks and never stalls the producer.
//! - No allocation, no dynamic dispatch.
//!
//! # Quick start
//! ```ignore
//! use ph_acquire::{AcquisitionConfig, DefaultAcquisition};
//!
//! static ACQ: DefaultAcquisition<Board> =
//!     DefaultAcquisition::new(Board::new(), AcquisitionConfig::DEFAULT);
//!
//! fn dma_irq() {
//!     ACQ.on_interrupt();
//! }
//!
//! ACQ.configure(0, dma_irq)?;
//! // bring up anything else that uses the DMA controller, then:
//! ACQ.start()?;
//!
//! loop {
//!     if let Some(block) = ACQ.get_buffer(0)? {
//!         send(unsafe { block.as_bytes() });
//!     }
//! }
//! ```
//!
//! # No-std
//! The crate is `#![no_std]`. A `critical-section` implementation must be
//! linked into the final binary. Tests run against its `std` implementation.
//!
//! # Safety and concurrency
//! The completion handler is the only producer. It may preempt consumers at
//! any point; queue and fill-index updates happen inside [`critical`]
//! sections. Block *contents* are not guarded: the transfer engine refills a
//! block `N - 1` block periods after handing it off, whether or not anyone is
//! still reading it. Size the ring for the slowest consumer, or copy out with
//! [`Block::read_into`], which detects a refill instead of returning torn data.
//!
//! # Semantics
//! - Handoff sequence numbers are monotonically increasing `u32` values
//!   starting at 1; `0` is never issued.
//! - Every consumer sees the same blocks in the same order. Gaps in the
//!   sequence are blocks its queue evicted.
//! - `get_buffer` never blocks: it returns `Ok(None)` when nothing is ready.
#![no_std]

#[macro_use]
mod fmt;

pub mod buffer_ring;
pub mod config;
pub mod critical;
pub mod engine;
pub mod error;
pub mod hal;
pub mod lossy_queue;
pub mod wav;

mod sync;

#[cfg(test)]
mod testing;

pub use buffer_ring::{Block, BlockRef, BufferRing};
pub use config::AcquisitionConfig;
pub use engine::{Acquisition, Consumer, DefaultAcquisition, State};
pub use error::{Error, Result};
pub use hal::{
    FrontEndConfig, InterruptController, Sample, SamplingFrontEnd, StagingPolicy,
    TransferEngine, TransferSize,
};
pub use lossy_queue::LossyQueue;
pub use wav::WavHeader;

#[cfg(test)]
extern crate std;
