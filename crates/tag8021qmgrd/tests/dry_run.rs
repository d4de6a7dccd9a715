//! Dry-run tests for tag8021qmgrd
//!
//! Loads a configuration file from disk, drives the manager with dry-run
//! bridge stores, and checks both the captured commands and the tracked
//! memberships.

use pretty_assertions::assert_eq;
use std::io::Write;
use tag8021q::{PortRole, TaggingState, VlanFlags};
use tag8021q_test::{CommandVerifier, MembershipVerifier};
use tag8021qmgrd::{Tag8021qConfig, TaggerMgr};

const FABRIC: &str = r#"
dry_run = true

[[switches]]
index = 2
ports = [
  { name = "swp0" },
  { name = "swp1" },
  { name = "eth1", role = "upstream" },
]

[[switches]]
index = 0
ports = [
  { name = "lan0" },
  { name = "lan1" },
  { name = "lan2" },
  { name = "cpu0", role = "upstream" },
]
"#;

fn load_fabric() -> (tempfile::NamedTempFile, Tag8021qConfig) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FABRIC.as_bytes()).unwrap();
    let config = Tag8021qConfig::load_or_default(file.path()).unwrap();
    (file, config)
}

#[test]
fn test_enable_port_issues_bridge_commands() {
    let (_file, config) = load_fabric();
    assert!(config.dry_run);

    let mut mgr = TaggerMgr::from_config(&config).unwrap();
    assert!(mgr.set_port_tagging(2, "swp1", true).unwrap());

    let verifier = CommandVerifier::new(mgr.captured_commands());
    verifier.assert_command_count(5).unwrap();
    assert_eq!(
        verifier.captured_commands(),
        &[
            "/sbin/bridge vlan add vid 1153 dev \"swp0\" untagged".to_string(),
            "/sbin/bridge vlan add vid 1153 dev \"swp1\" pvid untagged".to_string(),
            "/sbin/bridge vlan add vid 1153 dev \"eth1\"".to_string(),
            "/sbin/bridge vlan add vid 2177 dev \"swp1\" untagged".to_string(),
            "/sbin/bridge vlan add vid 2177 dev \"eth1\"".to_string(),
        ]
    );
    verifier.assert_command_not_executed("vlan del").unwrap();
    verifier.assert_command_not_executed("lan0").unwrap();
}

#[test]
fn test_store_tracks_enabled_port() {
    let (_file, config) = load_fabric();
    let mut mgr = TaggerMgr::from_config(&config).unwrap();
    mgr.set_port_tagging(2, "swp1", true).unwrap();

    let layout = config.switch(2).unwrap().layout().unwrap();
    let store = mgr.store(2).unwrap();
    let verifier = MembershipVerifier::new(store);
    verifier.assert_port_enabled(&layout, 1).unwrap();
    verifier.assert_port_disabled(&layout, 0).unwrap();
    verifier
        .assert_member(1, 1153, VlanFlags::UNTAGGED_PVID)
        .unwrap();
}

#[test]
fn test_disable_mirrors_enable() {
    let (_file, config) = load_fabric();
    let mut mgr = TaggerMgr::from_config(&config).unwrap();
    mgr.set_port_tagging(2, "swp1", true).unwrap();
    mgr.set_port_tagging(2, "swp1", false).unwrap();

    let verifier = CommandVerifier::new(mgr.captured_commands());
    verifier.assert_command_count(10).unwrap();
    assert_eq!(
        &verifier.captured_commands()[5..],
        &[
            "/sbin/bridge vlan del vid 1153 dev \"swp0\"".to_string(),
            "/sbin/bridge vlan del vid 1153 dev \"swp1\"".to_string(),
            "/sbin/bridge vlan del vid 1153 dev \"eth1\"".to_string(),
            "/sbin/bridge vlan del vid 2177 dev \"swp1\"".to_string(),
            "/sbin/bridge vlan del vid 2177 dev \"eth1\"".to_string(),
        ]
    );

    let layout = config.switch(2).unwrap().layout().unwrap();
    MembershipVerifier::new(mgr.store(2).unwrap())
        .assert_port_disabled(&layout, 1)
        .unwrap();
    assert_eq!(mgr.port_state(2, "swp1"), Some(TaggingState::Disabled));
}

#[test]
fn test_enable_all_in_switch_order() {
    let (_file, mut config) = load_fabric();
    config.atomic = true;
    let mut mgr = TaggerMgr::from_config(&config).unwrap();

    assert_eq!(mgr.set_all(true).unwrap(), 5);
    // Redundant requests are skipped
    assert_eq!(mgr.set_all(true).unwrap(), 0);

    let commands = mgr.captured_commands();
    assert_eq!(commands.len(), 3 * 6 + 2 * 5);
    // Switch 0 sorts before switch 2
    assert_eq!(commands[0], "/sbin/bridge vlan add vid 1024 dev \"lan0\" pvid untagged");
    assert_eq!(commands[18], "/sbin/bridge vlan add vid 1152 dev \"swp0\" pvid untagged");

    for switch in mgr.switch_indices() {
        let layout = config.switch(switch).unwrap().layout().unwrap();
        let verifier = MembershipVerifier::new(mgr.store(switch).unwrap());
        for (port, cfg) in config.switch(switch).unwrap().ports.iter().enumerate() {
            if cfg.role == PortRole::User {
                verifier.assert_port_enabled(&layout, port).unwrap();
            }
        }
    }
}

#[test]
fn test_status_reports_vids() {
    let (_file, config) = load_fabric();
    let mut mgr = TaggerMgr::from_config(&config).unwrap();
    mgr.set_port_tagging(0, "lan2", true).unwrap();

    let lines: Vec<String> = mgr
        .status()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[2], "switch 0 port 2 (lan2) user rx 1026 tx 2050 enabled");
    assert_eq!(lines[0], "switch 0 port 0 (lan0) user rx 1024 tx 2048 disabled");
    assert_eq!(lines[3], "switch 0 port 3 (cpu0) upstream rx 1027 tx 2051 unknown");
}

#[test]
fn test_unknown_port_is_rejected() {
    let (_file, config) = load_fabric();
    let mut mgr = TaggerMgr::from_config(&config).unwrap();
    assert!(mgr.set_port_tagging(0, "swp1", true).is_err());
    assert!(mgr.set_port_tagging(5, "lan0", true).is_err());
    assert!(mgr.captured_commands().is_empty());
}
