//! VLAN membership store backed by the Linux bridge.

use std::collections::HashMap;

use serde::Deserialize;
use tag8021q::{MembershipQuery, MembershipStore, StoreError, VlanFlags};
use tracing::{debug, info};

use crate::commands::{
    build_add_membership_cmd, build_remove_membership_cmd, build_show_membership_cmd,
};
use crate::error::{MgrError, MgrResult};
use crate::shell;

/// What iproute2 prints when the kernel answers ENOENT to a VLAN delete.
const ABSENT_MEMBERSHIP_MSG: &str = "RTNETLINK answers: No such file or directory";

/// Returns true if a failed `bridge vlan del` only means the membership was
/// not there.
///
/// A missing device, a missing `bridge` binary or a permission error are
/// real failures.
fn is_absent_membership(err: &MgrError) -> bool {
    match err {
        MgrError::ShellCommandFailed { output, .. } => output.contains(ABSENT_MEMBERSHIP_MSG),
        _ => false,
    }
}

/// One interface in `bridge -j vlan show` output
#[derive(Debug, Deserialize)]
struct VlanShowPort {
    #[serde(default)]
    vlans: Vec<VlanShowEntry>,
}

/// One VID (or VID range) of an interface
#[derive(Debug, Deserialize)]
struct VlanShowEntry {
    vlan: u16,
    #[serde(rename = "vlanEnd")]
    vlan_end: Option<u16>,
    #[serde(default)]
    flags: Vec<String>,
}

/// Looks up `vid` in `bridge -j vlan show dev <ifname>` output.
fn parse_vlan_show(json: &str, vid: u16) -> Result<Option<VlanFlags>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(None);
    }
    let ports: Vec<VlanShowPort> = serde_json::from_str(json)?;
    let entry = ports
        .iter()
        .flat_map(|p| p.vlans.iter())
        .find(|e| (e.vlan..=e.vlan_end.unwrap_or(e.vlan)).contains(&vid));

    Ok(entry.map(|e| VlanFlags {
        untagged: e.flags.iter().any(|f| f == "Egress Untagged"),
        pvid: e.flags.iter().any(|f| f == "PVID"),
    }))
}

/// Applies memberships with `bridge vlan` commands.
///
/// Port indices map to interface names in configuration order. Queries read
/// the kernel VLAN table, except in dry-run mode where nothing reaches the
/// kernel and the store answers from the memberships it recorded.
pub struct BridgeVlanStore {
    /// Interface name per port index
    ports: Vec<String>,

    /// Memberships recorded in dry-run mode
    installed: HashMap<(usize, u16), VlanFlags>,

    /// Capture commands instead of running them
    dry_run: bool,

    /// Commands captured in dry-run mode
    captured_commands: Vec<String>,
}

impl BridgeVlanStore {
    /// Creates a store for the given interface names.
    pub fn new(ports: Vec<String>) -> Self {
        Self {
            ports,
            installed: HashMap::new(),
            dry_run: false,
            captured_commands: Vec::new(),
        }
    }

    /// Enables dry-run mode.
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Returns true in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Gets captured commands (dry-run mode).
    pub fn captured_commands(&self) -> &[String] {
        &self.captured_commands
    }

    /// Interface name of `port`.
    pub fn port_name(&self, port: usize) -> Option<&str> {
        self.ports.get(port).map(String::as_str)
    }

    fn alias(&self, port: usize) -> Result<&str, StoreError> {
        self.port_name(port).ok_or(StoreError::InvalidPort(port))
    }

    fn exec(&mut self, cmd: String) -> MgrResult<()> {
        if self.dry_run {
            info!("Dry run: {}", cmd);
            self.captured_commands.push(cmd);
            return Ok(());
        }
        shell::exec_or_throw(&cmd).map(|_| ())
    }
}

impl MembershipStore for BridgeVlanStore {
    fn add_membership(&mut self, port: usize, vid: u16, flags: VlanFlags) -> Result<(), StoreError> {
        let cmd = build_add_membership_cmd(vid, self.alias(port)?, flags);
        self.exec(cmd)
            .map_err(|e| StoreError::backend("add", e.to_string()))?;
        if self.dry_run {
            self.installed.insert((port, vid), flags);
        }
        Ok(())
    }

    fn remove_membership(&mut self, port: usize, vid: u16) -> Result<(), StoreError> {
        let alias = self.alias(port)?.to_string();
        match self.exec(build_remove_membership_cmd(vid, &alias)) {
            Ok(()) => {}
            Err(e) if is_absent_membership(&e) => {
                debug!(port = %alias, vid, "Membership already absent");
            }
            Err(e) => return Err(StoreError::backend("del", e.to_string())),
        }
        self.installed.remove(&(port, vid));
        Ok(())
    }
}

impl MembershipQuery for BridgeVlanStore {
    fn membership(&self, port: usize, vid: u16) -> Result<Option<VlanFlags>, StoreError> {
        let alias = self.alias(port)?;
        if self.dry_run {
            return Ok(self.installed.get(&(port, vid)).copied());
        }

        let json = shell::exec_or_throw(&build_show_membership_cmd(alias))
            .map_err(|e| StoreError::backend("show", e.to_string()))?;
        parse_vlan_show(&json, vid).map_err(|e| {
            StoreError::backend("show", format!("unexpected output for {}: {}", alias, e))
        })
    }
}
