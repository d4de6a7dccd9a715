//! tag8021q - port identification over 802.1Q VLAN tags
//!
//! Lets a host CPU attached to a switch fabric through one upstream port
//! learn the switch and port every received frame ingressed on, and steer
//! every transmitted frame to exactly one egress port, using nothing but
//! standard VLAN table entries.
//!
//! Provides:
//! - A codec packing direction, switch index and port index into a 12-bit VID
//! - A synchronizer installing the RX and TX VLAN memberships of a port
//! - Store and topology traits the synchronizer runs against
//! - Frame glue for inserting and stripping the 4-byte tag
//! - An opt-in all-or-nothing variant of the synchronizer
//!
//! ```
//! use tag8021q::{configure_port_tagging, InMemoryStore, SwitchLayout};
//!
//! let switch = SwitchLayout::new(0, 4, 3).unwrap();
//! let mut store = InMemoryStore::new();
//! configure_port_tagging(&switch, &mut store, 1, true).unwrap();
//! assert_eq!(store.len(), 6);
//! assert_eq!(store.pvid(1), Some(tag8021q::encode_rx_identifier(0, 1).as_u16()));
//! ```

pub mod error;
pub mod frame;
mod store;
mod sync;
mod topology;
pub mod transaction;
mod types;
pub mod vid;

pub use error::{StoreError, TaggingError, TaggingResult};
pub use frame::{
    insert_frame_tag, insert_tag, peek_and_strip_tag, strip_frame_tag, RxIdentity, Tagger,
    VlanTag, ETH_P_8021AD, ETH_P_8021Q, ETH_P_DSA_8021Q,
};
pub use store::{InMemoryStore, MembershipQuery, MembershipStore};
pub use sync::{
    apply_mutation, configure_port_tagging, configure_switch_tagging, plan_port_tagging,
    PortTagger, TaggingStats,
};
pub use topology::{SwitchLayout, TopologyProvider};
pub use transaction::configure_port_tagging_atomic;
pub use types::*;
pub use vid::{
    decode_port_index, decode_switch_index, encode_rx_identifier, encode_tx_identifier,
    Direction, TagVid, MAX_PORTS, MAX_SWITCHES, VID_MASK,
};
