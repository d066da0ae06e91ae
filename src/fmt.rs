//! Logging shims.
//!
//! Forwards to `defmt` or `tracing` depending on the enabled feature and
//! expands to nothing otherwise. Arguments are moved into a throwaway tuple
//! in the silent case, so only log `Copy` values.
#![allow(unused_macros)]

#[cfg(feature = "defmt")]
macro_rules! trace { ($($arg:tt)*) => { ::defmt::trace!($($arg)*) }; }
#[cfg(feature = "defmt")]
macro_rules! debug { ($($arg:tt)*) => { ::defmt::debug!($($arg)*) }; }
#[cfg(feature = "defmt")]
macro_rules! info { ($($arg:tt)*) => { ::defmt::info!($($arg)*) }; }
#[cfg(feature = "defmt")]
macro_rules! warn { ($($arg:tt)*) => { ::defmt::warn!($($arg)*) }; }

#[cfg(all(not(feature = "defmt"), feature = "tracing"))]
macro_rules! trace { ($($arg:tt)*) => { ::tracing::trace!($($arg)*) }; }
#[cfg(all(not(feature = "defmt"), feature = "tracing"))]
macro_rules! debug { ($($arg:tt)*) => { ::tracing::debug!($($arg)*) }; }
#[cfg(all(not(feature = "defmt"), feature = "tracing"))]
macro_rules! info { ($($arg:tt)*) => { ::tracing::info!($($arg)*) }; }
#[cfg(all(not(feature = "defmt"), feature = "tracing"))]
macro_rules! warn { ($($arg:tt)*) => { ::tracing::warn!($($arg)*) }; }

#[cfg(all(not(feature = "defmt"), not(feature = "tracing")))]
macro_rules! trace { ($($arg:tt)*) => {{ let _ = ($($arg)*,); }}; }
#[cfg(all(not(feature = "defmt"), not(feature = "tracing")))]
macro_rules! debug { ($($arg:tt)*) => {{ let _ = ($($arg)*,); }}; }
#[cfg(all(not(feature = "defmt"), not(feature = "tracing")))]
macro_rules! info { ($($arg:tt)*) => {{ let _ = ($($arg)*,); }}; }
#[cfg(all(not(feature = "defmt"), not(feature = "tracing")))]
macro_rules! warn { ($($arg:tt)*) => {{ let _ = ($($arg)*,); }}; }
