//! Atomic types used by the pipeline.
//!
//! Targets without native compare-and-swap (thumbv6m) can route these through
//! `portable-atomic` with the `portable-atomic` feature.

#[cfg(not(feature = "portable-atomic"))]
pub(crate) use core::sync::atomic::{AtomicU8, AtomicU32, Ordering, fence};

#[cfg(feature = "portable-atomic")]
pub(crate) use portable_atomic::{AtomicU8, AtomicU32, Ordering, fence};
