//! Recording stand-in for the hardware traits.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::vec::Vec;

use crate::hal::{
    FrontEndConfig, InterruptController, SamplingFrontEnd, TransferEngine, TransferSize,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    FrontEnd(FrontEndConfig),
    FlushStaging,
    EnableFrontEnd,
    Source(u8, usize),
    Destination(u8, usize),
    Count(u8, u32),
    Size(u8, TransferSize),
    Request(u8, u8),
    Chain(u8, u8),
    EnableCompletion(u8),
    Arm(u8),
    ClearCompletion(u8),
    InstallHandler(u16),
    EnableVector(u16),
}

pub(crate) fn noop_handler() {}

pub(crate) struct MockHardware {
    ops: Mutex<Vec<Op>>,
    pending: AtomicU64,
    fifo: u16,
}

impl MockHardware {
    pub(crate) fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            pending: AtomicU64::new(0),
            fifo: 0,
        }
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub(crate) fn take_ops(&self) -> Vec<Op> {
        core::mem::take(&mut *self.ops.lock().unwrap())
    }

    /// Latch a completion flag as the transfer engine would.
    pub(crate) fn raise(&self, channel: u8) {
        self.pending.fetch_or(1 << channel, Ordering::SeqCst);
    }

    pub(crate) fn fifo_addr(&self) -> usize {
        &self.fifo as *const u16 as usize
    }

    /// Destinations written to `channel`, in order.
    pub(crate) fn destinations(&self, channel: u8) -> Vec<usize> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Destination(ch, addr) if ch == channel => Some(addr),
                _ => None,
            })
            .collect()
    }
}

impl SamplingFrontEnd for MockHardware {
    fn configure(&self, config: &FrontEndConfig) {
        self.record(Op::FrontEnd(*config));
    }

    fn flush_staging_queue(&self) {
        self.record(Op::FlushStaging);
    }

    fn enable(&self) {
        self.record(Op::EnableFrontEnd);
    }

    fn data_register(&self) -> *const u8 {
        (&self.fifo as *const u16).cast()
    }
}

impl TransferEngine for MockHardware {
    fn set_source(&self, channel: u8, source: *const u8) {
        self.record(Op::Source(channel, source as usize));
    }

    fn set_destination(&self, channel: u8, destination: *mut u8) {
        self.record(Op::Destination(channel, destination as usize));
    }

    fn set_transfer_count(&self, channel: u8, count: u32) {
        self.record(Op::Count(channel, count));
    }

    fn set_transfer_size(&self, channel: u8, size: TransferSize) {
        self.record(Op::Size(channel, size));
    }

    fn set_request_source(&self, channel: u8, request: u8) {
        self.record(Op::Request(channel, request));
    }

    fn set_chain_target(&self, channel: u8, target: u8) {
        self.record(Op::Chain(channel, target));
    }

    fn enable_completion_interrupt(&self, channel: u8) {
        self.record(Op::EnableCompletion(channel));
    }

    fn arm(&self, channel: u8) {
        self.record(Op::Arm(channel));
    }

    fn completion_pending(&self, channel: u8) -> bool {
        self.pending.load(Ordering::SeqCst) & (1 << channel) != 0
    }

    fn clear_completion_flag(&self, channel: u8) {
        self.pending.fetch_and(!(1 << channel), Ordering::SeqCst);
        self.record(Op::ClearCompletion(channel));
    }
}

impl InterruptController for MockHardware {
    fn install_handler(&self, vector: u16, _handler: fn()) {
        self.record(Op::InstallHandler(vector));
    }

    fn enable_vector(&self, vector: u16) {
        self.record(Op::EnableVector(vector));
    }
}
