//! Membership store that records calls and injects failures
//!
//! Wraps an [`InMemoryStore`] so tests can check both the final table and
//! the exact order of store calls a transition issued.

use std::fmt;

use tag8021q::{InMemoryStore, MembershipQuery, MembershipStore, StoreError, VlanFlags};
use tracing::debug;

/// One call made to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    /// `add_membership(port, vid, flags)`
    Add {
        port: usize,
        vid: u16,
        flags: VlanFlags,
    },
    /// `remove_membership(port, vid)`
    Remove { port: usize, vid: u16 },
}

impl StoreCall {
    /// Port the call targets
    pub fn port(&self) -> usize {
        match self {
            StoreCall::Add { port, .. } | StoreCall::Remove { port, .. } => *port,
        }
    }

    /// VID the call targets
    pub fn vid(&self) -> u16 {
        match self {
            StoreCall::Add { vid, .. } | StoreCall::Remove { vid, .. } => *vid,
        }
    }
}

impl fmt::Display for StoreCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreCall::Add { port, vid, flags } => {
                write!(f, "add port {} vid {} ({})", port, vid, flags)
            }
            StoreCall::Remove { port, vid } => write!(f, "remove port {} vid {}", port, vid),
        }
    }
}

/// Store that records every call, optionally failing one of them
///
/// Failed calls are recorded too, and leave the table untouched.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    inner: InMemoryStore,
    calls: Vec<StoreCall>,
    fail_at_call: Option<usize>,
    fail_on: Option<(usize, u16)>,
    failure: Option<StoreError>,
}

impl RecordingStore {
    /// Create an empty store that never fails
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store wrapping an existing table
    pub fn with_table(inner: InMemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Fail the call with 0-based index `index`
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at_call = Some(index);
        self
    }

    /// Fail every call for `(port, vid)`
    pub fn failing_on(mut self, port: usize, vid: u16) -> Self {
        self.fail_on = Some((port, vid));
        self
    }

    /// Error returned by injected failures (default: a backend error)
    pub fn with_failure(mut self, failure: StoreError) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Stop injecting failures
    pub fn heal(&mut self) {
        self.fail_at_call = None;
        self.fail_on = None;
    }

    /// All calls in order, including failed ones
    pub fn calls(&self) -> &[StoreCall] {
        &self.calls
    }

    /// Forget recorded calls, keeping the table
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Current table
    pub fn table(&self) -> &InMemoryStore {
        &self.inner
    }

    fn record(&mut self, call: StoreCall) -> Result<(), StoreError> {
        let index = self.calls.len();
        self.calls.push(call);

        let injected = self.fail_at_call == Some(index)
            || self.fail_on == Some((call.port(), call.vid()));
        if injected {
            debug!(index, call = %call, "Injecting store failure");
            return Err(self
                .failure
                .clone()
                .unwrap_or_else(|| StoreError::backend("inject", format!("call {}", index))));
        }
        Ok(())
    }
}

impl MembershipStore for RecordingStore {
    fn add_membership(&mut self, port: usize, vid: u16, flags: VlanFlags) -> Result<(), StoreError> {
        self.record(StoreCall::Add { port, vid, flags })?;
        self.inner.add_membership(port, vid, flags)
    }

    fn remove_membership(&mut self, port: usize, vid: u16) -> Result<(), StoreError> {
        self.record(StoreCall::Remove { port, vid })?;
        self.inner.remove_membership(port, vid)
    }
}

impl MembershipQuery for RecordingStore {
    fn membership(&self, port: usize, vid: u16) -> Result<Option<VlanFlags>, StoreError> {
        self.inner.membership(port, vid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_records_calls() {
        let mut store = RecordingStore::new();
        store.add_membership(0, 1024, VlanFlags::UNTAGGED).unwrap();
        store.remove_membership(0, 1024).unwrap();

        assert_eq!(
            store.calls(),
            &[
                StoreCall::Add {
                    port: 0,
                    vid: 1024,
                    flags: VlanFlags::UNTAGGED
                },
                StoreCall::Remove { port: 0, vid: 1024 },
            ]
        );
        assert!(store.table().is_empty());
    }

    #[test]
    fn test_failing_at() {
        let mut store = RecordingStore::new()
            .failing_at(1)
            .with_failure(StoreError::TableFull { port: 1, vid: 7 });
        store.add_membership(0, 7, VlanFlags::TAGGED).unwrap();
        assert_eq!(
            store.add_membership(1, 7, VlanFlags::TAGGED),
            Err(StoreError::TableFull { port: 1, vid: 7 })
        );
        store.add_membership(2, 7, VlanFlags::TAGGED).unwrap();

        assert_eq!(store.calls().len(), 3);
        assert_eq!(store.table().vid_members(7), vec![0, 2]);
    }

    #[test]
    fn test_failing_on_and_heal() {
        let mut store = RecordingStore::new().failing_on(3, 2048);
        assert!(store.remove_membership(3, 2048).is_err());
        assert!(store.add_membership(3, 2048, VlanFlags::TAGGED).is_err());
        store.heal();
        store.add_membership(3, 2048, VlanFlags::TAGGED).unwrap();
        assert_eq!(store.membership(3, 2048), Ok(Some(VlanFlags::TAGGED)));
    }

    #[test]
    fn test_call_display() {
        let call = StoreCall::Add {
            port: 1,
            vid: 1025,
            flags: VlanFlags::UNTAGGED_PVID,
        };
        assert_eq!(call.to_string(), "add port 1 vid 1025 (pvid untagged)");
    }
}
