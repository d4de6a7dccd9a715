//! Type definitions shared by the synchronizer and the stores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::vid::TagVid;

/// Flags carried by one (port, VID) membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VlanFlags {
    /// Frames in this VID egress the port without a tag.
    pub untagged: bool,
    /// This VID classifies untagged ingress on the port.
    pub pvid: bool,
}

impl VlanFlags {
    /// Tagged egress, not pvid.
    pub const TAGGED: VlanFlags = VlanFlags {
        untagged: false,
        pvid: false,
    };

    /// Untagged egress, not pvid.
    pub const UNTAGGED: VlanFlags = VlanFlags {
        untagged: true,
        pvid: false,
    };

    /// Untagged egress and pvid.
    pub const UNTAGGED_PVID: VlanFlags = VlanFlags {
        untagged: true,
        pvid: true,
    };
}

impl fmt::Display for VlanFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.pvid, self.untagged) {
            (true, true) => f.write_str("pvid untagged"),
            (true, false) => f.write_str("pvid"),
            (false, true) => f.write_str("untagged"),
            (false, false) => f.write_str("tagged"),
        }
    }
}

/// Role of a port within its switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    /// Front-panel port (default).
    #[default]
    User,
    /// CPU-facing port.
    Upstream,
    /// Cascade port towards another switch of the fabric.
    Link,
    /// Port that is not wired.
    Unused,
}

impl PortRole {
    /// Returns the role name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PortRole::User => "user",
            PortRole::Upstream => "upstream",
            PortRole::Link => "link",
            PortRole::Unused => "unused",
        }
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(PortRole::User),
            "upstream" | "cpu" => Ok(PortRole::Upstream),
            "link" | "dsa" => Ok(PortRole::Link),
            "unused" => Ok(PortRole::Unused),
            _ => Err(format!("invalid port role: {}", s)),
        }
    }
}

/// Tagging configuration state of a user port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggingState {
    /// No tag8021q memberships installed.
    #[default]
    Disabled,
    /// RX and TX memberships installed.
    Enabled,
}

impl TaggingState {
    /// Returns true for [`TaggingState::Enabled`].
    pub const fn is_enabled(&self) -> bool {
        matches!(self, TaggingState::Enabled)
    }

    /// Returns the state name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaggingState::Disabled => "disabled",
            TaggingState::Enabled => "enabled",
        }
    }
}

impl From<bool> for TaggingState {
    fn from(enabled: bool) -> Self {
        if enabled {
            TaggingState::Enabled
        } else {
            TaggingState::Disabled
        }
    }
}

impl fmt::Display for TaggingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four ordered steps of a port tagging transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaggingStep {
    /// RX VID on every non-upstream port.
    RxFanOut,
    /// RX VID on the upstream port.
    RxUpstream,
    /// TX VID on the target port.
    TxPort,
    /// TX VID on the upstream port.
    TxUpstream,
}

impl TaggingStep {
    /// All steps in application order.
    pub const ALL: [TaggingStep; 4] = [
        TaggingStep::RxFanOut,
        TaggingStep::RxUpstream,
        TaggingStep::TxPort,
        TaggingStep::TxUpstream,
    ];

    /// Returns a short description used in logs and errors.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaggingStep::RxFanOut => "RX fan-out",
            TaggingStep::RxUpstream => "RX upstream",
            TaggingStep::TxPort => "TX port",
            TaggingStep::TxUpstream => "TX upstream",
        }
    }
}

impl fmt::Display for TaggingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change to the VLAN membership table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipOp {
    /// Add (or overwrite) membership with the given flags.
    Add(VlanFlags),
    /// Remove membership.
    Remove,
}

/// A membership change labelled with the step that issues it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VlanMutation {
    /// Step of the transition.
    pub step: TaggingStep,
    /// Port being mutated.
    pub port: usize,
    /// VID being mutated.
    pub vid: TagVid,
    /// Add or remove.
    pub op: MembershipOp,
}

impl VlanMutation {
    /// Creates an add mutation.
    pub fn add(step: TaggingStep, port: usize, vid: TagVid, flags: VlanFlags) -> Self {
        Self {
            step,
            port,
            vid,
            op: MembershipOp::Add(flags),
        }
    }

    /// Creates a remove mutation.
    pub fn remove(step: TaggingStep, port: usize, vid: TagVid) -> Self {
        Self {
            step,
            port,
            vid,
            op: MembershipOp::Remove,
        }
    }

    /// Returns true for additions.
    pub const fn is_add(&self) -> bool {
        matches!(self.op, MembershipOp::Add(_))
    }
}

impl fmt::Display for VlanMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            MembershipOp::Add(flags) => {
                write!(f, "add vid {} port {} ({})", self.vid, self.port, flags)
            }
            MembershipOp::Remove => write!(f, "del vid {} port {}", self.vid, self.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vid::encode_rx_identifier;

    #[test]
    fn test_vlan_flags_display() {
        assert_eq!(VlanFlags::TAGGED.to_string(), "tagged");
        assert_eq!(VlanFlags::UNTAGGED.to_string(), "untagged");
        assert_eq!(VlanFlags::UNTAGGED_PVID.to_string(), "pvid untagged");
        assert_eq!(VlanFlags::default(), VlanFlags::TAGGED);
    }

    #[test]
    fn test_port_role_from_str() {
        assert_eq!("user".parse::<PortRole>().unwrap(), PortRole::User);
        assert_eq!("CPU".parse::<PortRole>().unwrap(), PortRole::Upstream);
        assert_eq!("dsa".parse::<PortRole>().unwrap(), PortRole::Link);
        assert!("trunk".parse::<PortRole>().is_err());
    }

    #[test]
    fn test_tagging_state_from_bool() {
        assert_eq!(TaggingState::from(true), TaggingState::Enabled);
        assert_eq!(TaggingState::from(false), TaggingState::Disabled);
        assert!(TaggingState::Enabled.is_enabled());
    }

    #[test]
    fn test_steps_ordered() {
        let mut steps = TaggingStep::ALL;
        steps.sort();
        assert_eq!(steps, TaggingStep::ALL);
    }

    #[test]
    fn test_mutation_display() {
        let vid = encode_rx_identifier(0, 1);
        let add = VlanMutation::add(TaggingStep::RxFanOut, 1, vid, VlanFlags::UNTAGGED_PVID);
        assert!(add.is_add());
        assert_eq!(add.to_string(), "add vid 1025 port 1 (pvid untagged)");
        let del = VlanMutation::remove(TaggingStep::RxFanOut, 1, vid);
        assert_eq!(del.to_string(), "del vid 1025 port 1");
    }
}
