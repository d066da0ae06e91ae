//! Error type shared by configuration and retrieval paths.
//!
//! The completion handler never produces one of these: it only touches
//! storage that was sized and placed before acquisition started.

/// Result type used by the `ph-acquire` interfaces.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors reported synchronously to the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The requested analog input does not exist on the sampling front end.
    #[error("no such input channel {channel}: {available} channels available")]
    InvalidChannel { channel: u8, available: u8 },

    /// The consumer id is outside the statically registered range.
    #[error("no such consumer {consumer}: {available} consumers registered")]
    InvalidConsumer { consumer: usize, available: usize },

    /// Queue capacities must be a power of two so indices wrap by masking.
    #[error("queue capacity {capacity} is not a power of two")]
    CapacityNotPowerOfTwo { capacity: usize },

    /// The sample rate is zero or faster than the front-end clock.
    #[error("sample rate {sample_rate} Hz is not reachable from a {clock_hz} Hz clock")]
    InvalidSampleRate { sample_rate: u32, clock_hz: u32 },

    /// Both halves of the ping-pong pair name the same transfer channel.
    #[error("transfer channel {channel} cannot be chained to itself")]
    TransferChannelConflict { channel: u8 },

    /// `configure` was called on an engine that already left `Uninitialized`.
    #[error("acquisition is already configured")]
    AlreadyConfigured,

    /// `start` was called before `configure`, or twice.
    #[error("acquisition is not configured")]
    NotConfigured,

    /// The transfer engine started refilling the block while it was being read.
    #[error("block {sequence} was overwritten before it could be read")]
    BlockOverwritten { sequence: u32 },
}

#[cfg(test)]
mod tests {
    use super::Error;
    use std::string::ToString;

    #[test]
    fn messages_name_the_offending_value() {
        let err = Error::InvalidChannel {
            channel: 7,
            available: 4,
        };
        assert_eq!(
            err.to_string(),
            "no such input channel 7: 4 channels available"
        );

        let err = Error::BlockOverwritten { sequence: 42 };
        assert!(err.to_string().contains("42"));
    }
}
