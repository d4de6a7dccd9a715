//! Shell command builders for bridge VLAN memberships

use tag8021q::VlanFlags;

use crate::shell::{self, shellquote};

/// Build add VLAN membership command
///
/// `bridge vlan add` overwrites the flags of an existing membership, so the
/// same command both installs and downgrades (e.g. pvid to plain untagged).
pub fn build_add_membership_cmd(vid: u16, port_alias: &str, flags: VlanFlags) -> String {
    let mut cmd = format!(
        "{} vlan add vid {} dev {}",
        shell::BRIDGE_CMD,
        vid,
        shellquote(port_alias)
    );
    if flags.pvid {
        cmd.push_str(" pvid");
    }
    if flags.untagged {
        cmd.push_str(" untagged");
    }
    cmd
}

/// Build remove VLAN membership command
pub fn build_remove_membership_cmd(vid: u16, port_alias: &str) -> String {
    format!(
        "{} vlan del vid {} dev {}",
        shell::BRIDGE_CMD,
        vid,
        shellquote(port_alias)
    )
}

/// Build the command listing the VLAN memberships of one port as JSON
pub fn build_show_membership_cmd(port_alias: &str) -> String {
    format!(
        "{} -j vlan show dev {}",
        shell::BRIDGE_CMD,
        shellquote(port_alias)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_add_membership_cmd() {
        assert_eq!(
            build_add_membership_cmd(1025, "swp1", VlanFlags::UNTAGGED_PVID),
            "/sbin/bridge vlan add vid 1025 dev \"swp1\" pvid untagged"
        );
        assert_eq!(
            build_add_membership_cmd(1025, "swp0", VlanFlags::UNTAGGED),
            "/sbin/bridge vlan add vid 1025 dev \"swp0\" untagged"
        );
        assert_eq!(
            build_add_membership_cmd(1025, "eth0", VlanFlags::TAGGED),
            "/sbin/bridge vlan add vid 1025 dev \"eth0\""
        );
    }

    #[test]
    fn test_build_remove_membership_cmd() {
        assert_eq!(
            build_remove_membership_cmd(2049, "swp1"),
            "/sbin/bridge vlan del vid 2049 dev \"swp1\""
        );
    }

    #[test]
    fn test_build_show_membership_cmd() {
        assert_eq!(
            build_show_membership_cmd("swp1"),
            "/sbin/bridge -j vlan show dev \"swp1\""
        );
    }

    #[test]
    fn test_port_alias_is_quoted() {
        assert_eq!(
            build_remove_membership_cmd(1024, "sw$p"),
            "/sbin/bridge vlan del vid 1024 dev \"sw\\$p\""
        );
    }
}
