//! TaggerMgr - per-switch port tagging state on top of the synchronizer

use std::fmt;

use tag8021q::{
    encode_rx_identifier, encode_tx_identifier, MembershipQuery, MembershipStore, PortRole,
    PortTagger, SwitchLayout, TagVid, TaggingState, TaggingStats, TopologyProvider, VlanFlags,
};
use tracing::{debug, info, instrument};

use crate::bridge_store::BridgeVlanStore;
use crate::config::{SwitchConfig, Tag8021qConfig};
use crate::error::{MgrError, MgrResult};

/// Tagging status of one port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortStatus {
    pub switch: usize,
    pub port: usize,
    pub name: String,
    pub role: PortRole,
    /// State found in the membership table; `None` if not a user port or
    /// only partially configured
    pub state: Option<TaggingState>,
    pub rx_vid: TagVid,
    pub tx_vid: TagVid,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.map_or("unknown", |s| s.as_str());
        write!(
            f,
            "switch {} port {} ({}) {} rx {} tx {} {}",
            self.switch, self.port, self.name, self.role, self.rx_vid, self.tx_vid, state
        )
    }
}

struct ManagedSwitch<S> {
    config: SwitchConfig,
    layout: SwitchLayout,
    tagger: PortTagger<S>,
    /// Last applied state per port index
    states: Vec<Option<TaggingState>>,
}

/// TaggerMgr manages tag8021q memberships for every configured switch
///
/// Configuration flow:
/// 1. Configuration file → validated switch layouts
/// 2. enable/disable requests → synchronizer transitions on the switch store
///
/// Transitions that would not change the last applied state of a port are
/// skipped. Ports start in an unknown state, so the first request for a
/// port is always applied.
pub struct TaggerMgr<S = BridgeVlanStore> {
    switches: Vec<ManagedSwitch<S>>,

    /// Use the rollback-on-failure transition
    atomic: bool,
}

impl TaggerMgr<BridgeVlanStore> {
    /// Creates a manager driving the Linux bridge
    pub fn from_config(config: &Tag8021qConfig) -> MgrResult<Self> {
        Self::with_stores(config, |switch| {
            let store = BridgeVlanStore::new(switch.port_names());
            if config.dry_run {
                store.with_dry_run()
            } else {
                store
            }
        })
    }

    /// Gets commands captured in dry-run mode, in switch order
    pub fn captured_commands(&self) -> Vec<String> {
        self.switches
            .iter()
            .flat_map(|s| s.tagger.store().captured_commands().iter().cloned())
            .collect()
    }
}

impl<S: MembershipStore + MembershipQuery> TaggerMgr<S> {
    /// Creates a manager with one store per switch
    pub fn with_stores<F>(config: &Tag8021qConfig, mut make_store: F) -> MgrResult<Self>
    where
        F: FnMut(&SwitchConfig) -> S,
    {
        config.validate()?;

        let mut switches = Vec::with_capacity(config.switches.len());
        for switch in &config.switches {
            let layout = switch.layout()?;
            switches.push(ManagedSwitch {
                config: switch.clone(),
                states: vec![None; layout.num_ports()],
                tagger: PortTagger::new(make_store(switch)),
                layout,
            });
        }
        switches.sort_by_key(|s| s.layout.switch_index());

        info!(
            switches = switches.len(),
            atomic = config.atomic,
            dry_run = config.dry_run,
            "TaggerMgr initialized"
        );
        Ok(Self {
            switches,
            atomic: config.atomic,
        })
    }

    /// Configured switch indices in ascending order
    pub fn switch_indices(&self) -> Vec<usize> {
        self.switches
            .iter()
            .map(|s| s.layout.switch_index())
            .collect()
    }

    fn managed(&self, switch: usize) -> MgrResult<&ManagedSwitch<S>> {
        self.switches
            .iter()
            .find(|s| s.layout.switch_index() == switch)
            .ok_or(MgrError::UnknownSwitch(switch))
    }

    fn managed_mut(&mut self, switch: usize) -> MgrResult<&mut ManagedSwitch<S>> {
        self.switches
            .iter_mut()
            .find(|s| s.layout.switch_index() == switch)
            .ok_or(MgrError::UnknownSwitch(switch))
    }

    /// Enable or disable tagging on the port called `port`
    ///
    /// Returns true if a transition was applied, false if it was skipped
    /// (redundant request or not a user port).
    #[instrument(skip(self))]
    pub fn set_port_tagging(&mut self, switch: usize, port: &str, enabled: bool) -> MgrResult<bool> {
        let atomic = self.atomic;
        let managed = self.managed_mut(switch)?;
        let index = managed
            .config
            .port_index(port)
            .ok_or_else(|| MgrError::UnknownPort {
                switch,
                port: port.to_string(),
            })?;
        managed.apply(index, enabled, atomic)
    }

    /// Enable or disable tagging on every user port of a switch
    pub fn set_switch_tagging(&mut self, switch: usize, enabled: bool) -> MgrResult<usize> {
        let atomic = self.atomic;
        let managed = self.managed_mut(switch)?;
        let mut applied = 0;
        for port in managed.layout.user_ports() {
            if managed.apply(port, enabled, atomic)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Enable or disable tagging on every user port of every switch
    pub fn set_all(&mut self, enabled: bool) -> MgrResult<usize> {
        let mut applied = 0;
        for switch in self.switch_indices() {
            applied += self.set_switch_tagging(switch, enabled)?;
        }
        Ok(applied)
    }

    /// Last applied state of a port
    pub fn port_state(&self, switch: usize, port: &str) -> Option<TaggingState> {
        let managed = self.managed(switch).ok()?;
        let index = managed.config.port_index(port)?;
        managed.states.get(index).copied().flatten()
    }

    /// Synchronizer counters of a switch
    pub fn stats(&self, switch: usize) -> Option<&TaggingStats> {
        self.managed(switch).ok().map(|s| s.tagger.stats())
    }

    /// Membership store of a switch
    pub fn store(&self, switch: usize) -> Option<&S> {
        self.managed(switch).ok().map(|s| s.tagger.store())
    }

    /// Status of every port of every switch
    ///
    /// The state of a user port is read back from its store, so it reflects
    /// transitions made by earlier processes too.
    pub fn status(&self) -> MgrResult<Vec<PortStatus>> {
        let mut status = Vec::new();
        for managed in &self.switches {
            let switch = managed.layout.switch_index();
            for (port, cfg) in managed.config.ports.iter().enumerate() {
                status.push(PortStatus {
                    switch,
                    port,
                    name: cfg.name.clone(),
                    role: cfg.role,
                    state: managed.observed_state(port)?,
                    rx_vid: encode_rx_identifier(switch, port),
                    tx_vid: encode_tx_identifier(switch, port),
                });
            }
        }
        Ok(status)
    }
}

impl<S: MembershipStore + MembershipQuery> ManagedSwitch<S> {
    /// Tagging state of `port` as found in the store
    ///
    /// `None` for non-user ports and for ports holding only part of their
    /// memberships.
    fn observed_state(&self, port: usize) -> MgrResult<Option<TaggingState>> {
        if !self.layout.is_user_port(port) || port == self.layout.upstream_port() {
            return Ok(None);
        }
        let switch = self.layout.switch_index();
        let store = self.tagger.store();
        let rx = store.membership(port, encode_rx_identifier(switch, port).as_u16())?;
        let tx = store.membership(port, encode_tx_identifier(switch, port).as_u16())?;

        Ok(match (rx, tx) {
            (Some(VlanFlags::UNTAGGED_PVID), Some(VlanFlags::UNTAGGED)) => Some(TaggingState::Enabled),
            (None, None) => Some(TaggingState::Disabled),
            _ => None,
        })
    }

    fn apply(&mut self, port: usize, enabled: bool, atomic: bool) -> MgrResult<bool> {
        let target = TaggingState::from(enabled);
        if !self.layout.is_user_port(port) {
            debug!(port, "Not a user port, skipping");
            return Ok(false);
        }
        if self.states.get(port).copied().flatten() == Some(target) {
            debug!(port, state = %target, "Port already in requested state");
            return Ok(false);
        }

        if atomic {
            self.tagger.configure_port_atomic(&self.layout, port, enabled)?;
        } else {
            self.tagger.configure_port(&self.layout, port, enabled)?;
        }

        if let Some(state) = self.states.get_mut(port) {
            *state = Some(target);
        }
        Ok(true)
    }
}
