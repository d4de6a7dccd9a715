//! Public API tests for port tagging transitions.

use bytes::BytesMut;
use pretty_assertions::assert_eq;
use tag8021q::{
    configure_port_tagging, configure_switch_tagging, encode_rx_identifier, encode_tx_identifier,
    insert_frame_tag, InMemoryStore, MembershipQuery, PortRole, SwitchLayout, Tagger,
    TopologyProvider, VlanFlags, VlanTag, ETH_P_8021Q,
};

fn four_port_switch() -> SwitchLayout {
    SwitchLayout::new(0, 4, 3).unwrap()
}

#[test]
fn enable_installs_six_memberships() {
    let switch = four_port_switch();
    let mut store = InMemoryStore::new();
    configure_port_tagging(&switch, &mut store, 1, true).unwrap();

    let rx = encode_rx_identifier(0, 1).as_u16();
    let tx = encode_tx_identifier(0, 1).as_u16();
    let entries: Vec<_> = store.entries().collect();
    assert_eq!(
        entries,
        vec![
            (0, rx, VlanFlags::UNTAGGED),
            (1, rx, VlanFlags::UNTAGGED_PVID),
            (1, tx, VlanFlags::UNTAGGED),
            (2, rx, VlanFlags::UNTAGGED),
            (3, rx, VlanFlags::TAGGED),
            (3, tx, VlanFlags::TAGGED),
        ]
    );
}

#[test]
fn enable_twice_equals_enable_once() {
    let switch = four_port_switch();
    let mut once = InMemoryStore::new();
    configure_port_tagging(&switch, &mut once, 2, true).unwrap();

    let mut twice = InMemoryStore::new();
    configure_port_tagging(&switch, &mut twice, 2, true).unwrap();
    configure_port_tagging(&switch, &mut twice, 2, true).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn disable_is_idempotent() {
    let switch = four_port_switch();
    let mut store = InMemoryStore::new();
    configure_port_tagging(&switch, &mut store, 0, false).unwrap();
    configure_port_tagging(&switch, &mut store, 0, true).unwrap();
    configure_port_tagging(&switch, &mut store, 0, false).unwrap();
    configure_port_tagging(&switch, &mut store, 0, false).unwrap();
    assert!(store.is_empty());
}

#[test]
fn enable_then_disable_leaves_other_ports_alone() {
    let switch = four_port_switch();
    let mut store = InMemoryStore::new();
    configure_port_tagging(&switch, &mut store, 0, true).unwrap();
    let only_port0 = store.clone();

    configure_port_tagging(&switch, &mut store, 2, true).unwrap();
    configure_port_tagging(&switch, &mut store, 2, false).unwrap();
    assert_eq!(store, only_port0);
}

#[test]
fn every_user_port_gets_a_distinct_pvid() {
    let switch = SwitchLayout::new(5, 11, 10)
        .unwrap()
        .with_role(9, PortRole::Link)
        .unwrap()
        .with_role(8, PortRole::Unused)
        .unwrap();
    let mut store = InMemoryStore::new();
    configure_switch_tagging(&switch, &mut store, true).unwrap();

    let mut pvids: Vec<u16> = switch
        .user_ports()
        .into_iter()
        .map(|port| store.pvid(port).unwrap())
        .collect();
    pvids.sort_unstable();
    pvids.dedup();
    assert_eq!(pvids.len(), 8);

    // The cascade port still receives RX fan-out so bridged traffic can
    // leave the switch without a CPU detour
    let rx = encode_rx_identifier(5, 0).as_u16();
    assert_eq!(store.membership(9, rx), Ok(Some(VlanFlags::UNTAGGED)));
    assert_eq!(store.pvid(8), None);
}

#[test]
fn received_pvid_identifies_ingress_port() {
    let switch = SwitchLayout::new(3, 8, 7).unwrap();
    let mut store = InMemoryStore::new();
    configure_switch_tagging(&switch, &mut store, true).unwrap();

    let tagger = Tagger::default();
    for port in switch.user_ports() {
        // What the switch puts on the upstream port for a frame ingressing `port`
        let pvid = store.pvid(port).unwrap();
        assert_eq!(store.membership(7, pvid), Ok(Some(VlanFlags::TAGGED)));

        let mut frame = BytesMut::from(&[0u8; 60][..]);
        insert_frame_tag(&mut frame, VlanTag::new(ETH_P_8021Q, pvid)).unwrap();
        let identity = tagger.rcv(&mut frame).unwrap();
        assert_eq!((identity.switch_index, identity.port_index), (3, port));
    }
}
