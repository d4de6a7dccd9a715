//! All-or-nothing port tagging transitions.
//!
//! [`configure_port_tagging`](crate::configure_port_tagging) leaves applied
//! steps in place when a later one fails. Stores that can report current
//! memberships can use [`configure_port_tagging_atomic`] instead, which
//! snapshots every (port, VID) the plan touches and puts it back on failure.

use tracing::{instrument, warn};

use crate::error::{StoreError, TaggingError, TaggingResult};
use crate::store::{MembershipQuery, MembershipStore};
use crate::sync::{apply_mutation, plan_port_tagging};
use crate::topology::TopologyProvider;
use crate::types::VlanFlags;

/// Prior state of one (port, VID) membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    port: usize,
    vid: u16,
    flags: Option<VlanFlags>,
}

impl Snapshot {
    fn restore<S>(&self, store: &mut S) -> Result<(), StoreError>
    where
        S: MembershipStore + ?Sized,
    {
        match self.flags {
            Some(flags) => store.add_membership(self.port, self.vid, flags),
            None => store.remove_membership(self.port, self.vid),
        }
    }
}

/// Enables or disables tagging on `port`, undoing partial work on failure.
///
/// # Errors
///
/// Returns the original failure once the store has been restored, or
/// [`TaggingError::RollbackFailed`] if restoring also failed. In the latter
/// case the store is left in whatever state the failed restore produced.
#[instrument(level = "debug", skip(topology, store))]
pub fn configure_port_tagging_atomic<T, S>(
    topology: &T,
    store: &mut S,
    port: usize,
    enabled: bool,
) -> TaggingResult<()>
where
    T: TopologyProvider + ?Sized,
    S: MembershipStore + MembershipQuery + ?Sized,
{
    let plan = plan_port_tagging(topology, port, enabled)?;
    let mut snapshots = Vec::with_capacity(plan.len());
    for m in &plan {
        let vid = m.vid.as_u16();
        let flags = store
            .membership(m.port, vid)
            .map_err(|source| TaggingError::Membership {
                step: m.step,
                vid: m.vid,
                port: m.port,
                source,
            })?;
        snapshots.push(Snapshot {
            port: m.port,
            vid,
            flags,
        });
    }

    for (applied, mutation) in plan.iter().enumerate() {
        let Err(cause) = apply_mutation(store, mutation) else {
            continue;
        };

        warn!(
            port,
            restoring = applied,
            "Rolling back port tagging after failure"
        );
        // The failed mutation may have partially landed; restore it too.
        for snapshot in snapshots[..=applied].iter().rev() {
            if let Err(rollback) = snapshot.restore(store) {
                return Err(TaggingError::RollbackFailed {
                    cause: Box::new(cause),
                    rollback,
                });
            }
        }
        return Err(cause);
    }

    Ok(())
}
