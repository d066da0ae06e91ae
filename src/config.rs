//! Runtime acquisition parameters.
//!
//! The defaults describe an RP2040 running the ADC off its 48 MHz clock at
//! 30 kHz, streamed through DMA channels 9 and 10.

use crate::error::{Error, Result};
use crate::hal::StagingPolicy;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AcquisitionConfig {
    /// Front-end clock in Hz.
    pub clock_hz: u32,
    /// Requested conversions per second.
    pub sample_rate: u32,
    /// Number of selectable analog inputs.
    pub input_channels: u8,
    /// First half of the ping-pong transfer pair.
    pub channel_a: u8,
    /// Second half of the ping-pong transfer pair.
    pub channel_b: u8,
    /// Completion interrupt vector of the transfer engine.
    pub irq: u16,
    /// Request line the front end raises when a sample is staged.
    pub request_source: u8,
    pub staging: StagingPolicy,
}

impl AcquisitionConfig {
    pub const DEFAULT: Self = Self {
        clock_hz: 48_000_000,
        sample_rate: 30_000,
        input_channels: 4,
        channel_a: 9,
        channel_b: 10,
        irq: 11,
        request_source: 36,
        staging: StagingPolicy::DEFAULT,
    };

    pub const fn new() -> Self {
        Self::DEFAULT
    }

    pub const fn with_clock_hz(mut self, clock_hz: u32) -> Self {
        self.clock_hz = clock_hz;
        self
    }

    pub const fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub const fn with_input_channels(mut self, input_channels: u8) -> Self {
        self.input_channels = input_channels;
        self
    }

    pub const fn with_transfer_channels(mut self, channel_a: u8, channel_b: u8) -> Self {
        self.channel_a = channel_a;
        self.channel_b = channel_b;
        self
    }

    pub const fn with_irq(mut self, irq: u16) -> Self {
        self.irq = irq;
        self
    }

    pub const fn with_request_source(mut self, request_source: u8) -> Self {
        self.request_source = request_source;
        self
    }

    pub const fn with_staging(mut self, staging: StagingPolicy) -> Self {
        self.staging = staging;
        self
    }

    /// Front-end divider for the requested rate: `clock_hz / sample_rate - 1`.
    pub fn rate_divider(&self) -> Result<u32> {
        if self.sample_rate == 0 || self.sample_rate > self.clock_hz {
            return Err(Error::InvalidSampleRate {
                sample_rate: self.sample_rate,
                clock_hz: self.clock_hz,
            });
        }
        Ok(self.clock_hz / self.sample_rate - 1)
    }

    /// Rate the divider actually produces. Differs from `sample_rate` when
    /// the rate does not divide the clock.
    pub fn actual_sample_rate(&self) -> Result<u32> {
        Ok(self.clock_hz / (self.rate_divider()? + 1))
    }

    /// Check everything that doesn't depend on the caller's channel choice.
    pub fn validate(&self) -> Result<()> {
        self.rate_divider()?;
        if self.channel_a == self.channel_b {
            return Err(Error::TransferChannelConflict {
                channel: self.channel_a,
            });
        }
        Ok(())
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::AcquisitionConfig;
    use crate::error::Error;

    #[test]
    fn default_divider_matches_30khz() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.rate_divider(), Ok(1599));
        assert_eq!(config.actual_sample_rate(), Ok(30_000));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn inexact_rate_rounds_down_the_divider() {
        let config = AcquisitionConfig::new().with_sample_rate(44_100);
        assert_eq!(config.rate_divider(), Ok(1087));
        assert_eq!(config.actual_sample_rate(), Ok(44_117));
    }

    #[test]
    fn rejects_unreachable_rates() {
        let err = Error::InvalidSampleRate {
            sample_rate: 0,
            clock_hz: 48_000_000,
        };
        assert_eq!(AcquisitionConfig::new().with_sample_rate(0).validate(), Err(err));

        let config = AcquisitionConfig::new().with_clock_hz(1_000).with_sample_rate(2_000);
        assert!(matches!(
            config.rate_divider(),
            Err(Error::InvalidSampleRate { .. })
        ));
    }

    #[test]
    fn rejects_self_chained_pair() {
        let config = AcquisitionConfig::new().with_transfer_channels(3, 3);
        assert_eq!(
            config.validate(),
            Err(Error::TransferChannelConflict { channel: 3 })
        );
    }
}
