//! Test infrastructure for 802.1Q port identification
//!
//! Provides:
//! - Switch topology fixtures
//! - A membership store that records every call and injects failures
//! - Membership and command verification helpers
//! - Multi-step tagging scenarios

pub mod fixtures;
mod recording_store;
mod verification;

pub use fixtures::*;
pub use recording_store::{RecordingStore, StoreCall};
pub use verification::*;
