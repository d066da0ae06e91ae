//! Continuous acquisition: ping-pong transfer setup and block handoff.
//!
//! # Overview
//! Two transfer channels, A and B, are chained to each other. While one fills
//! a block of the ring, the other is already pointed at the block after it,
//! so the front end is drained with no CPU work per sample. Each time a
//! channel finishes, the completion handler:
//! 1. hands the finished block off to every consumer queue,
//! 2. advances the fill index,
//! 3. points the finished channel two blocks ahead, which is the block after
//!    the one its sibling just started on.
//!
//! # Lifecycle
//! `Uninitialized` → [`configure`](Acquisition::configure) → `Configured` →
//! [`start`](Acquisition::start) → `Running`. There is no way back.
//! `configure` hands block addresses to the transfer engine, so it takes
//! `&'static self`: the engine lives in a `static` (or is leaked) and can
//! never move once the hardware points into it. Completions are only
//! handled while `Running`.
//!
//! # Consumers
//! `C` consumers are fixed at compile time, each with its own
//! [`LossyQueue`]. They poll without blocking and see blocks in handoff
//! order; a consumer that falls `Q` blocks behind loses the oldest ones.
//! Blocks are shared by reference, not copied: see [`Block`] for the
//! overwrite hazard this implies.

use core::cell::Cell;

use critical_section::Mutex;

use crate::buffer_ring::{Block, BlockRef, BufferRing};
use crate::config::AcquisitionConfig;
use crate::critical;
use crate::error::{Error, Result};
use crate::hal::{FrontEndConfig, InterruptController, Sample, SamplingFrontEnd, TransferEngine};
use crate::lossy_queue::LossyQueue;
use crate::sync::{AtomicU8, Ordering};
use crate::wav::WavHeader;

/// Samples per block in the stock geometry (0.1 s at 30 kHz).
pub const SAMPLES_PER_BLOCK: usize = 3000;
/// Blocks in the stock ring.
pub const BLOCK_COUNT: usize = 16;
/// Consumers in the stock geometry.
pub const MAX_CONSUMERS: usize = 1;

/// 8-bit samples, 16 blocks of 3000, one consumer queue as deep as the ring.
pub type DefaultAcquisition<H> =
    Acquisition<H, u8, SAMPLES_PER_BLOCK, BLOCK_COUNT, MAX_CONSUMERS, BLOCK_COUNT>;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Uninitialized = 0,
    /// `configure` has claimed the engine and is programming the hardware.
    Configuring = 1,
    Configured = 2,
    Running = 3,
}

impl State {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => State::Uninitialized,
            1 => State::Configuring,
            2 => State::Configured,
            _ => State::Running,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Cursor {
    /// Slot the active channel is filling.
    fill: usize,
    completions: u32,
    /// Last handoff sequence number; 0 before the first one.
    sequence: u32,
}

impl Cursor {
    const START: Self = Self {
        fill: 0,
        completions: 0,
        sequence: 0,
    };

    #[inline]
    fn next_sequence(&mut self) -> u32 {
        let mut seq = self.sequence.wrapping_add(1);
        if seq == 0 {
            seq = 1;
        }
        self.sequence = seq;
        seq
    }
}

/// Acquisition engine over hardware `H`.
///
/// - `S`: sample type (`u8` or `u16`)
/// - `LEN`: samples per block
/// - `N`: blocks in the ring, at least 2
/// - `C`: consumer queues, at least 1
/// - `Q`: depth of each consumer queue, a power of two
pub struct Acquisition<
    H,
    S: Sample,
    const LEN: usize,
    const N: usize,
    const C: usize,
    const Q: usize,
> {
    hw: H,
    config: AcquisitionConfig,
    state: AtomicU8,
    ring: BufferRing<S, LEN, N>,
    cursor: Mutex<Cell<Cursor>>,
    queues: [LossyQueue<BlockRef, Q>; C],
}

impl<H, S: Sample, const LEN: usize, const N: usize, const C: usize, const Q: usize>
    Acquisition<H, S, LEN, N, C, Q>
{
    pub const fn new(hw: H, config: AcquisitionConfig) -> Self {
        const { assert!(C >= 1, "at least one consumer queue is required") };
        Self {
            hw,
            config,
            state: AtomicU8::new(State::Uninitialized as u8),
            ring: BufferRing::new(),
            cursor: Mutex::new(Cell::new(Cursor::START)),
            queues: [const { LossyQueue::new() }; C],
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    #[inline]
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    #[inline]
    pub fn ring(&self) -> &BufferRing<S, LEN, N> {
        &self.ring
    }

    #[inline]
    pub const fn consumers(&self) -> usize {
        C
    }

    /// Slot the transfer engine is filling right now.
    pub fn current_index(&self) -> usize {
        critical::with(|cs| self.cursor.borrow(cs).get().fill)
    }

    /// Completion events handled so far (wrapping).
    pub fn completions(&self) -> u32 {
        critical::with(|cs| self.cursor.borrow(cs).get().completions)
    }

    /// Handle for consumer `id`.
    pub fn consumer(&self, id: usize) -> Result<Consumer<'_, S, LEN, N, Q>> {
        match self.queues.get(id) {
            Some(queue) => Ok(Consumer {
                id,
                queue,
                ring: &self.ring,
            }),
            None => {
                debug!("rejected consumer id {} of {}", id, C);
                Err(Error::InvalidConsumer {
                    consumer: id,
                    available: C,
                })
            }
        }
    }

    /// Take the oldest pending block for `consumer` without blocking.
    ///
    /// `Ok(None)` means nothing new has completed since the last call.
    pub fn get_buffer(&self, consumer: usize) -> Result<Option<Block<'_, S, LEN, N>>> {
        Ok(self.consumer(consumer)?.poll())
    }

    /// Header for streaming the blocks as a mono WAV file.
    pub fn wav_header(&self) -> Result<WavHeader> {
        let bits = (core::mem::size_of::<S>() * 8) as u16;
        Ok(WavHeader::streaming(self.config.actual_sample_rate()?, 1, bits))
    }
}

impl<H, S, const LEN: usize, const N: usize, const C: usize, const Q: usize>
    Acquisition<H, S, LEN, N, C, Q>
where
    H: SamplingFrontEnd + TransferEngine + InterruptController,
    S: Sample,
{
    /// Program the front end and the transfer pair, and install `handler` on
    /// the completion vector. `handler` should call [`on_interrupt`].
    ///
    /// Nothing touches the hardware unless every check passes. The engine
    /// is claimed atomically before programming starts, so of two racing
    /// callers exactly one succeeds.
    ///
    /// [`on_interrupt`]: Acquisition::on_interrupt
    pub fn configure(&'static self, input_channel: u8, handler: fn()) -> Result<()> {
        let state = self.state();
        if state != State::Uninitialized {
            warn!("configure rejected in state {:?}", state);
            return Err(Error::AlreadyConfigured);
        }
        if input_channel >= self.config.input_channels {
            warn!(
                "no such input channel {} (have {})",
                input_channel, self.config.input_channels
            );
            return Err(Error::InvalidChannel {
                channel: input_channel,
                available: self.config.input_channels,
            });
        }
        if let Err(err) = self.config.validate() {
            warn!("invalid acquisition config: {:?}", err);
            return Err(err);
        }

        let rate_divider = self.config.rate_divider()?;
        let actual_rate = self.config.actual_sample_rate()?;
        if actual_rate != self.config.sample_rate {
            warn!(
                "sample rate {} Hz does not divide the clock, running at {} Hz",
                self.config.sample_rate, actual_rate
            );
        }

        if let Err(raw) = self.state.compare_exchange(
            State::Uninitialized as u8,
            State::Configuring as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            warn!("configure lost the race in state {:?}", State::from_u8(raw));
            return Err(Error::AlreadyConfigured);
        }

        self.hw.configure(&FrontEndConfig {
            rate_divider,
            channel: input_channel,
            shift_to_byte: S::BITS == 8,
            staging: self.config.staging,
        });
        self.hw.flush_staging_queue();

        critical::with(|cs| self.cursor.borrow(cs).set(Cursor::START));

        let (a, b) = (self.config.channel_a, self.config.channel_b);
        self.program_channel(a, b, 0);
        self.program_channel(b, a, 1);
        self.hw.arm(a);

        self.hw.install_handler(self.config.irq, handler);
        self.hw.enable_vector(self.config.irq);

        self.state
            .store(State::Configured as u8, Ordering::Release);
        info!(
            "acquisition configured: input {} at {} Hz, {} blocks of {} samples",
            input_channel, actual_rate, N, LEN
        );
        Ok(())
    }

    fn program_channel(&self, channel: u8, sibling: u8, slot: usize) {
        self.hw.set_source(channel, self.hw.data_register());
        self.hw
            .set_destination(channel, self.ring.block_ptr(slot).cast());
        self.hw.set_transfer_count(channel, LEN as u32);
        self.hw.set_transfer_size(channel, S::TRANSFER_SIZE);
        self.hw
            .set_request_source(channel, self.config.request_source);
        self.hw.set_chain_target(channel, sibling);
        self.hw.enable_completion_interrupt(channel);
    }

    /// Let the front end free-run into the configured transfer pair.
    ///
    /// Call this only once anything else that may borrow the transfer
    /// engine during its own setup (a network stack, for example) is done.
    pub fn start(&self) -> Result<()> {
        let state = self.state();
        if state != State::Configured {
            warn!("start rejected in state {:?}", state);
            return Err(Error::NotConfigured);
        }
        self.hw.enable();
        self.state.store(State::Running as u8, Ordering::Release);
        info!("acquisition running");
        Ok(())
    }

    /// Completion interrupt entry point.
    ///
    /// Services channel A if it signalled, otherwise channel B. Returns the
    /// sequence number of the block handed off, or `None` for a spurious
    /// interrupt.
    pub fn on_interrupt(&self) -> Option<u32> {
        let (a, b) = (self.config.channel_a, self.config.channel_b);
        if self.hw.completion_pending(a) {
            self.on_completion(a)
        } else if self.hw.completion_pending(b) {
            self.on_completion(b)
        } else {
            None
        }
    }

    /// Hand off the block `channel` just finished and re-arm it.
    ///
    /// Returns the handoff sequence number, or `None` if the engine is not
    /// running or `channel` is not part of the pair.
    pub fn on_completion(&self, channel: u8) -> Option<u32> {
        if self.state() != State::Running {
            return None;
        }
        if channel != self.config.channel_a && channel != self.config.channel_b {
            return None;
        }

        let (block, rearm) = critical::with(|cs| {
            let cell = self.cursor.borrow(cs);
            let mut cursor = cell.get();

            let block = BlockRef {
                slot: cursor.fill,
                sequence: cursor.next_sequence(),
            };
            cursor.completions = cursor.completions.wrapping_add(1);
            self.ring.publish(block.slot, block.sequence);
            for queue in &self.queues {
                queue.push(block);
            }

            cursor.fill = (cursor.fill + 1) % N;
            // The sibling chained onto this slot the moment `channel` finished.
            self.ring.mark_filling(cursor.fill);
            cell.set(cursor);

            (block, (cursor.fill + 1) % N)
        });

        self.hw
            .set_destination(channel, self.ring.block_ptr(rearm).cast());
        self.hw.clear_completion_flag(channel);

        trace!(
            "block {} handed off from slot {}, channel {} re-armed on slot {}",
            block.sequence, block.slot, channel, rearm
        );
        Some(block.sequence)
    }
}

/// One consumer's view of the pipeline.
pub struct Consumer<'a, S: Sample, const LEN: usize, const N: usize, const Q: usize> {
    id: usize,
    queue: &'a LossyQueue<BlockRef, Q>,
    ring: &'a BufferRing<S, LEN, N>,
}

impl<'a, S: Sample, const LEN: usize, const N: usize, const Q: usize> Consumer<'a, S, LEN, N, Q> {
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Take the oldest pending block, if any.
    #[inline]
    pub fn poll(&self) -> Option<Block<'a, S, LEN, N>> {
        self.queue.pop().map(|handle| self.ring.block(handle))
    }

    /// Blocks waiting to be polled.
    #[inline]
    pub fn backlog(&self) -> usize {
        self.queue.len()
    }

    /// Blocks this consumer lost to eviction (wrapping).
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.queue.dropped()
    }

    /// Discard the backlog so the next `poll` yields the newest block.
    /// Returns how many blocks were skipped.
    #[inline]
    pub fn skip_to_latest(&self) -> usize {
        self.queue.skip_to_latest()
    }
}
