//! VLAN membership store interfaces.
//!
//! The store is the per-port VLAN table of the switch driver. It is keyed by
//! (port, VID) and only ever sees two operations: add a membership with its
//! flags, or remove it. Removing a membership that does not exist must
//! succeed, which is what makes disabling a port idempotent.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::types::VlanFlags;

/// Mutable access to a VLAN membership table.
///
/// Store calls are expected to be fast local table writes. Callers hold
/// `&mut` for the duration of a transition, which serializes concurrent
/// updates to the upstream port.
pub trait MembershipStore {
    /// Adds `port` to `vid` with `flags`, overwriting existing flags.
    fn add_membership(&mut self, port: usize, vid: u16, flags: VlanFlags)
        -> Result<(), StoreError>;

    /// Removes `port` from `vid`. Succeeds if the membership is absent.
    fn remove_membership(&mut self, port: usize, vid: u16) -> Result<(), StoreError>;
}

/// Read access to a VLAN membership table.
///
/// Only needed by the transactional wrapper, which snapshots entries
/// before mutating them. A store that cannot read its table must report an
/// error rather than `None`, since `None` is restored by removing the entry.
pub trait MembershipQuery {
    /// Returns the flags of `port` in `vid`, or `None` if not a member.
    fn membership(&self, port: usize, vid: u16) -> Result<Option<VlanFlags>, StoreError>;
}

impl<S: MembershipStore + ?Sized> MembershipStore for &mut S {
    fn add_membership(
        &mut self,
        port: usize,
        vid: u16,
        flags: VlanFlags,
    ) -> Result<(), StoreError> {
        (**self).add_membership(port, vid, flags)
    }

    fn remove_membership(&mut self, port: usize, vid: u16) -> Result<(), StoreError> {
        (**self).remove_membership(port, vid)
    }
}

impl<S: MembershipQuery + ?Sized> MembershipQuery for &mut S {
    fn membership(&self, port: usize, vid: u16) -> Result<Option<VlanFlags>, StoreError> {
        (**self).membership(port, vid)
    }
}

/// VLAN membership table held in memory.
///
/// Entries are kept ordered by (port, VID) so that snapshots compare
/// deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryStore {
    entries: BTreeMap<(usize, u16), VlanFlags>,
    capacity: Option<usize>,
}

impl InMemoryStore {
    /// Creates an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that rejects adds beyond `capacity` entries.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: Some(capacity),
        }
    }

    /// Number of memberships.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no memberships.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(port, vid, flags)` in (port, VID) order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, u16, VlanFlags)> + '_ {
        self.entries
            .iter()
            .map(|(&(port, vid), &flags)| (port, vid, flags))
    }

    /// Returns the memberships of one port.
    pub fn port_entries(&self, port: usize) -> Vec<(u16, VlanFlags)> {
        self.entries
            .range((port, 0)..=(port, u16::MAX))
            .map(|(&(_, vid), &flags)| (vid, flags))
            .collect()
    }

    /// Returns the ports that are members of `vid`.
    pub fn vid_members(&self, vid: u16) -> Vec<usize> {
        self.entries
            .keys()
            .filter(|(_, v)| *v == vid)
            .map(|(port, _)| *port)
            .collect()
    }

    /// Returns the VID marked pvid on `port`, if any.
    pub fn pvid(&self, port: usize) -> Option<u16> {
        self.port_entries(port)
            .into_iter()
            .find(|(_, flags)| flags.pvid)
            .map(|(vid, _)| vid)
    }
}

impl MembershipStore for InMemoryStore {
    fn add_membership(
        &mut self,
        port: usize,
        vid: u16,
        flags: VlanFlags,
    ) -> Result<(), StoreError> {
        let key = (port, vid);
        if let Some(capacity) = self.capacity {
            if !self.entries.contains_key(&key) && self.entries.len() >= capacity {
                return Err(StoreError::TableFull { port, vid });
            }
        }
        self.entries.insert(key, flags);
        Ok(())
    }

    fn remove_membership(&mut self, port: usize, vid: u16) -> Result<(), StoreError> {
        self.entries.remove(&(port, vid));
        Ok(())
    }
}

impl MembershipQuery for InMemoryStore {
    fn membership(&self, port: usize, vid: u16) -> Result<Option<VlanFlags>, StoreError> {
        Ok(self.entries.get(&(port, vid)).copied())
    }
}
