//! tag8021qmgrd - 802.1Q port identification manager
//!
//! Loads a switch fabric description from TOML and installs the tag8021q
//! RX/TX VLAN memberships of its user ports on the Linux bridge through
//! `bridge vlan` commands, or captures the commands in a dry run.

mod bridge_store;
pub mod commands;
pub mod config;
mod error;
pub mod shell;
mod tagger_mgr;

pub use bridge_store::BridgeVlanStore;
pub use config::{PortConfig, SwitchConfig, Tag8021qConfig, DEFAULT_CONFIG_PATH};
pub use error::{MgrError, MgrResult};
pub use tagger_mgr::{PortStatus, TaggerMgr};
