//! Membership synchronizer.
//!
//! Port identification through 802.1Q tags needs different VLAN setups for
//! the two directions of traffic:
//!
//! - RX (ingress from the network): every front-panel port gets a pvid that
//!   uniquely identifies it, and that VID egresses tagged towards the CPU so
//!   the receive path can recover the source port. If only the port itself
//!   were a member, bridged traffic between front-panel ports would be
//!   forced through the CPU, so every other non-upstream port is made an
//!   untagged member of the same VID (without pvid). This does not leak
//!   traffic: forwarding is still the AND of the L2 table and the VLAN
//!   restrictions, and the L2 table is what limits it here.
//! - TX (from the CPU towards the network): the RX VID cannot steer frames
//!   because every front-panel port is a member. A second VID is installed
//!   only on the target port (untagged) and on the upstream port (tagged),
//!   so a frame the CPU tags with it has exactly one possible egress.
//!
//! The resulting table, for one target port `swp0`:
//!
//! ```text
//!               CPU port                               CPU port
//! +-------------+-----+-------------+    +-------------+-----+-------------+
//! |  RX VID     |     |             |    |  TX VID     |     |             |
//! |  of swp0    |     |             |    |  of swp0    |     |             |
//! |             +-----+             |    |             +-----+             |
//! |                ^ T              |    |                | Tagged         |
//! |                |                |    |                | ingress        |
//! |    +-------+---+---+-------+    |    |    +-----------+                |
//! |    |       |       |       |    |    |    | Untagged                   |
//! |    |     U v     U v     U v    |    |    v egress                     |
//! | +-----+ +-----+ +-----+ +-----+ |    | +-----+ +-----+ +-----+ +-----+ |
//! | |     | |     | |     | |     | |    | |     | |     | |     | |     | |
//! | |PVID | |     | |     | |     | |    | |     | |     | |     | |     | |
//! +-+-----+-+-----+-+-----+-+-----+-+    +-+-----+-+-----+-+-----+-+-----+-+
//!   swp0    swp1    swp2    swp3           swp0    swp1    swp2    swp3
//! ```
//!
//! Mutations are applied in step order and the first failure is returned
//! as is. Steps that already succeeded stay applied; see
//! [`crate::transaction`] for the rollback variant.

use tracing::{debug, error, info, instrument};

use crate::error::{TaggingError, TaggingResult};
use crate::store::{MembershipQuery, MembershipStore};
use crate::topology::TopologyProvider;
use crate::transaction::configure_port_tagging_atomic;
use crate::types::{MembershipOp, TaggingState, TaggingStep, VlanFlags, VlanMutation};
use crate::vid::{encode_rx_identifier, encode_tx_identifier};

/// Computes the ordered mutations that enable or disable tagging on `port`.
///
/// Returns an empty plan for the upstream port and for any other port that
/// is not a front-panel port: their memberships are a side effect of
/// configuring the user ports.
///
/// # Errors
///
/// Returns [`TaggingError::PortOutOfRange`] if `port` does not exist.
pub fn plan_port_tagging<T>(topology: &T, port: usize, enabled: bool) -> TaggingResult<Vec<VlanMutation>>
where
    T: TopologyProvider + ?Sized,
{
    let num_ports = topology.num_ports();
    if port >= num_ports {
        return Err(TaggingError::PortOutOfRange {
            switch: topology.switch_index(),
            port,
            num_ports,
        });
    }
    let upstream = topology.upstream_port();
    if port == upstream || !topology.is_user_port(port) {
        return Ok(Vec::new());
    }

    let switch = topology.switch_index();
    let rx_vid = encode_rx_identifier(switch, port);
    let tx_vid = encode_tx_identifier(switch, port);

    let mutation = |step: TaggingStep, target: usize, vid, flags: VlanFlags| {
        if enabled {
            VlanMutation::add(step, target, vid, flags)
        } else {
            VlanMutation::remove(step, target, vid)
        }
    };

    let mut plan: Vec<VlanMutation> = (0..num_ports)
        .filter(|&other| other != upstream)
        .map(|other| {
            let flags = if other == port {
                VlanFlags::UNTAGGED_PVID
            } else {
                VlanFlags::UNTAGGED
            };
            mutation(TaggingStep::RxFanOut, other, rx_vid, flags)
        })
        .collect();

    plan.push(mutation(TaggingStep::RxUpstream, upstream, rx_vid, VlanFlags::TAGGED));
    plan.push(mutation(TaggingStep::TxPort, port, tx_vid, VlanFlags::UNTAGGED));
    plan.push(mutation(TaggingStep::TxUpstream, upstream, tx_vid, VlanFlags::TAGGED));

    Ok(plan)
}

/// Applies one mutation, tagging a store failure with its step, VID and port.
pub fn apply_mutation<S>(store: &mut S, mutation: &VlanMutation) -> TaggingResult<()>
where
    S: MembershipStore + ?Sized,
{
    let vid = mutation.vid;
    let result = match mutation.op {
        MembershipOp::Add(flags) => store.add_membership(mutation.port, vid.as_u16(), flags),
        MembershipOp::Remove => store.remove_membership(mutation.port, vid.as_u16()),
    };

    result.map_err(|source| {
        error!(
            step = %mutation.step,
            vid = %vid,
            port = mutation.port,
            error = %source,
            "Failed to apply {} VID {} to port {}",
            mutation.step,
            vid,
            mutation.port
        );
        TaggingError::Membership {
            step: mutation.step,
            vid,
            port: mutation.port,
            source,
        }
    })
}

/// Enables or disables 802.1Q port identification on one port.
///
/// Calling this on the upstream port (or any non-user port) is a no-op.
/// Re-applying the same transition converges to the same membership set.
///
/// # Errors
///
/// Returns the first store failure wrapped in [`TaggingError::Membership`];
/// mutations applied before it are not undone.
#[instrument(level = "debug", skip(topology, store))]
pub fn configure_port_tagging<T, S>(
    topology: &T,
    store: &mut S,
    port: usize,
    enabled: bool,
) -> TaggingResult<()>
where
    T: TopologyProvider + ?Sized,
    S: MembershipStore + ?Sized,
{
    let plan = plan_port_tagging(topology, port, enabled)?;
    if plan.is_empty() {
        debug!(port, "Not a user port, nothing to configure");
        return Ok(());
    }

    for mutation in &plan {
        apply_mutation(store, mutation)?;
    }

    debug!(
        switch = topology.switch_index(),
        port,
        mutations = plan.len(),
        "Port tagging {}",
        TaggingState::from(enabled)
    );
    Ok(())
}

/// Runs [`configure_port_tagging`] for every user port of a switch in
/// ascending order, stopping at the first failure.
pub fn configure_switch_tagging<T, S>(topology: &T, store: &mut S, enabled: bool) -> TaggingResult<()>
where
    T: TopologyProvider + ?Sized,
    S: MembershipStore + ?Sized,
{
    for port in topology.user_ports() {
        configure_port_tagging(topology, store, port, enabled)?;
    }
    Ok(())
}

/// Counters kept by [`PortTagger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggingStats {
    pub ports_enabled: u64,
    pub ports_disabled: u64,
    pub ports_skipped: u64,
    pub mutations_applied: u64,
    pub failures: u64,
}

/// Synchronizer bound to one membership store, with statistics.
pub struct PortTagger<S> {
    store: S,
    stats: TaggingStats,
}

impl<S: MembershipStore> PortTagger<S> {
    /// Creates a tagger over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            stats: TaggingStats::default(),
        }
    }

    /// Returns the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the store mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the tagger and returns the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Returns the counters.
    pub fn stats(&self) -> &TaggingStats {
        &self.stats
    }

    /// Enables or disables tagging on one port.
    ///
    /// Same semantics as [`configure_port_tagging`].
    #[instrument(level = "debug", skip(self, topology))]
    pub fn configure_port<T>(&mut self, topology: &T, port: usize, enabled: bool) -> TaggingResult<()>
    where
        T: TopologyProvider + ?Sized,
    {
        let plan = match plan_port_tagging(topology, port, enabled) {
            Ok(plan) => plan,
            Err(e) => {
                self.stats.failures += 1;
                return Err(e);
            }
        };
        if plan.is_empty() {
            self.stats.ports_skipped += 1;
            return Ok(());
        }

        for mutation in &plan {
            if let Err(e) = apply_mutation(&mut self.store, mutation) {
                self.stats.failures += 1;
                return Err(e);
            }
            self.stats.mutations_applied += 1;
        }

        if enabled {
            self.stats.ports_enabled += 1;
        } else {
            self.stats.ports_disabled += 1;
        }
        info!(
            switch = topology.switch_index(),
            port,
            "Port tagging {}",
            TaggingState::from(enabled)
        );
        Ok(())
    }

    /// Enables or disables tagging on every user port of a switch.
    pub fn configure_switch<T>(&mut self, topology: &T, enabled: bool) -> TaggingResult<()>
    where
        T: TopologyProvider + ?Sized,
    {
        for port in topology.user_ports() {
            self.configure_port(topology, port, enabled)?;
        }
        Ok(())
    }
}

impl<S: MembershipStore + MembershipQuery> PortTagger<S> {
    /// Like [`PortTagger::configure_port`], but restores the touched
    /// memberships if any step fails.
    pub fn configure_port_atomic<T>(&mut self, topology: &T, port: usize, enabled: bool) -> TaggingResult<()>
    where
        T: TopologyProvider + ?Sized,
    {
        let result = plan_port_tagging(topology, port, enabled).and_then(|plan| {
            configure_port_tagging_atomic(topology, &mut self.store, port, enabled).map(|()| plan.len())
        });

        match result {
            Ok(0) => self.stats.ports_skipped += 1,
            Ok(applied) => {
                self.stats.mutations_applied += applied as u64;
                if enabled {
                    self.stats.ports_enabled += 1;
                } else {
                    self.stats.ports_disabled += 1;
                }
                info!(
                    switch = topology.switch_index(),
                    port,
                    "Port tagging {}",
                    TaggingState::from(enabled)
                );
            }
            Err(e) => {
                self.stats.failures += 1;
                return Err(e);
            }
        }
        Ok(())
    }
}
