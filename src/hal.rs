//! Hardware seams: the sampling front end, the transfer engine and the
//! interrupt controller.
//!
//! These are one-shot register interfaces with no runtime state of their own,
//! so every method takes `&self` like a memory-mapped register block does.
//! Board support code implements them; the engine only sequences the calls.

/// Width of a single transfer-engine beat.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferSize {
    Byte,
    HalfWord,
    Word,
}

impl TransferSize {
    pub const fn bytes(self) -> usize {
        match self {
            TransferSize::Byte => 1,
            TransferSize::HalfWord => 2,
            TransferSize::Word => 4,
        }
    }
}

/// A value the front end can deposit into a sample block.
pub trait Sample: Copy + Send + Sync + 'static {
    /// Initial contents of freshly allocated blocks.
    const ZERO: Self;
    /// Significant bits per conversion.
    const BITS: u8;
    /// Beat width of the transfers that move one sample.
    const TRANSFER_SIZE: TransferSize;
}

/// 8-bit samples: the front end drops the low bits and transfers bytes.
impl Sample for u8 {
    const ZERO: Self = 0;
    const BITS: u8 = 8;
    const TRANSFER_SIZE: TransferSize = TransferSize::Byte;
}

/// Full 12-bit conversions in half-word containers.
impl Sample for u16 {
    const ZERO: Self = 0;
    const BITS: u8 = 12;
    const TRANSFER_SIZE: TransferSize = TransferSize::HalfWord;
}

/// How the front end's internal staging queue behaves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StagingPolicy {
    /// Queue level at which a transfer request is raised.
    pub threshold: u8,
    /// Raise transfer requests at all.
    pub request_enable: bool,
    /// Latch a flag when a sample arrives at a full queue.
    pub report_overflow: bool,
    /// Latch a flag when an empty queue is read.
    pub report_underflow: bool,
}

impl StagingPolicy {
    pub const DEFAULT: Self = Self {
        threshold: 1,
        request_enable: true,
        report_overflow: true,
        report_underflow: true,
    };
}

impl Default for StagingPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything the front end needs before it can free-run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrontEndConfig {
    /// Clock cycles between conversions, minus one.
    pub rate_divider: u32,
    /// Analog input to convert.
    pub channel: u8,
    /// Shift conversions down to 8 bits before staging them.
    pub shift_to_byte: bool,
    pub staging: StagingPolicy,
}

/// The analog-to-digital converter.
pub trait SamplingFrontEnd {
    /// Select the input, the conversion rate and the staging policy.
    fn configure(&self, config: &FrontEndConfig);

    /// Discard whatever conversions are sitting in the staging queue.
    fn flush_staging_queue(&self);

    /// Start free-running conversions.
    fn enable(&self);

    /// Address transfers read samples from.
    fn data_register(&self) -> *const u8;
}

/// Channel-oriented DMA controller.
pub trait TransferEngine {
    fn set_source(&self, channel: u8, source: *const u8);

    fn set_destination(&self, channel: u8, destination: *mut u8);

    /// Number of beats before the channel completes.
    fn set_transfer_count(&self, channel: u8, count: u32);

    fn set_transfer_size(&self, channel: u8, size: TransferSize);

    /// Peripheral request line that paces the channel.
    fn set_request_source(&self, channel: u8, request: u8);

    /// Channel to trigger when this one completes.
    fn set_chain_target(&self, channel: u8, target: u8);

    fn enable_completion_interrupt(&self, channel: u8);

    /// Start the channel; it waits for its request line from here on.
    fn arm(&self, channel: u8);

    fn completion_pending(&self, channel: u8) -> bool;

    fn clear_completion_flag(&self, channel: u8);
}

/// Vector table access.
pub trait InterruptController {
    fn install_handler(&self, vector: u16, handler: fn());

    fn enable_vector(&self, vector: u16);
}
