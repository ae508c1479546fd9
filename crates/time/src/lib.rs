//! Notary Time Library
//!
//! Provides the logical clock the registry evaluates registration times,
//! license expiry and dispute timestamps against.
//!
//! # Features
//! - Second precision [`Timestamp`]
//! - Monotonic [`SystemClock`] that never moves backwards
//! - Manually driven [`ManualClock`] for deterministic replay and tests

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
