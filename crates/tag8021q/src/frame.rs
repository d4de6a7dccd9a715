//! Transmit and receive glue for 4-byte VLAN tags.
//!
//! The tag is the protocol identifier followed by the tag control
//! information, both big endian:
//!
//! ```text
//! +--------+--------+-----+-----+-------------+
//! |  TPID (16 bits) | PCP | DEI |  VID (12)   |
//! +--------+--------+-----+-----+-------------+
//! ```
//!
//! On transmit the tag goes right after the destination and source MAC
//! addresses. On receive the tag is read and removed, and its VID is handed
//! to the codec.

use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

use crate::error::{TaggingError, TaggingResult};
use crate::vid::{encode_tx_identifier, Direction, TagVid};

/// Customer VLAN tag protocol identifier.
pub const ETH_P_8021Q: u16 = 0x8100;

/// Service VLAN tag protocol identifier.
pub const ETH_P_8021AD: u16 = 0x88A8;

/// Protocol identifier for switches that can use a private TPID for port
/// identification tags.
pub const ETH_P_DSA_8021Q: u16 = 0xDADB;

/// Length of one MAC address.
pub const ETH_ALEN: usize = 6;

/// Length of the destination and source addresses.
pub const ETH_ADDRS_LEN: usize = 2 * ETH_ALEN;

/// Length of a VLAN tag.
pub const VLAN_HLEN: usize = 4;

const PCP_SHIFT: u16 = 13;

/// A raw VLAN tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VlanTag {
    /// Tag protocol identifier.
    pub tpid: u16,
    /// Tag control information.
    pub tci: u16,
}

impl VlanTag {
    /// Creates a tag from its protocol id and tag control information.
    pub const fn new(tpid: u16, tci: u16) -> Self {
        Self { tpid, tci }
    }

    /// VID carried in the low 12 bits of the TCI.
    pub const fn vid(&self) -> TagVid {
        TagVid::from_tci(self.tci)
    }

    /// Priority code point.
    pub const fn pcp(&self) -> u8 {
        (self.tci >> PCP_SHIFT) as u8
    }
}

/// Prepends `tag` to `buf`.
pub fn insert_tag(buf: &mut BytesMut, tag: VlanTag) {
    let mut tagged = BytesMut::with_capacity(VLAN_HLEN + buf.len());
    tagged.put_u16(tag.tpid);
    tagged.put_u16(tag.tci);
    tagged.extend_from_slice(buf);
    *buf = tagged;
}

/// Reads the tag at the start of `buf` and removes it.
///
/// # Errors
///
/// Returns [`TaggingError::TruncatedFrame`] if fewer than 4 bytes are
/// available; `buf` is left untouched in that case.
pub fn peek_and_strip_tag(buf: &mut BytesMut) -> TaggingResult<VlanTag> {
    if buf.len() < VLAN_HLEN {
        return Err(TaggingError::truncated(VLAN_HLEN, buf.len()));
    }
    let tpid = buf.get_u16();
    let tci = buf.get_u16();
    Ok(VlanTag { tpid, tci })
}

/// Inserts `tag` after the MAC addresses of an Ethernet frame.
///
/// # Errors
///
/// Returns [`TaggingError::TruncatedFrame`] if the frame is shorter than
/// the address pair.
pub fn insert_frame_tag(frame: &mut BytesMut, tag: VlanTag) -> TaggingResult<()> {
    if frame.len() < ETH_ADDRS_LEN {
        return Err(TaggingError::truncated(ETH_ADDRS_LEN, frame.len()));
    }
    let mut payload = frame.split_off(ETH_ADDRS_LEN);
    insert_tag(&mut payload, tag);
    frame.unsplit(payload);
    Ok(())
}

/// Removes the tag that follows the MAC addresses of an Ethernet frame.
///
/// # Errors
///
/// Returns [`TaggingError::TruncatedFrame`] if the frame cannot hold the
/// addresses and a tag.
pub fn strip_frame_tag(frame: &mut BytesMut) -> TaggingResult<VlanTag> {
    let needed = ETH_ADDRS_LEN + VLAN_HLEN;
    if frame.len() < needed {
        return Err(TaggingError::truncated(needed, frame.len()));
    }
    let mut rest = frame.split_off(ETH_ADDRS_LEN);
    let tag = peek_and_strip_tag(&mut rest)?;
    frame.unsplit(rest);
    Ok(tag)
}

/// Source of a received frame, recovered from its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxIdentity {
    /// The tag as read from the wire.
    pub tag: VlanTag,
    /// Direction bits of the VID, `None` if it is not a tag8021q VID.
    pub direction: Option<Direction>,
    /// Switch the frame ingressed on.
    pub switch_index: usize,
    /// Port the frame ingressed on.
    pub port_index: usize,
}

impl RxIdentity {
    fn from_tag(tag: VlanTag) -> Self {
        let vid = tag.vid();
        Self {
            tag,
            direction: vid.direction(),
            switch_index: vid.switch_index(),
            port_index: vid.port_index(),
        }
    }

    /// VID carried by the tag.
    pub const fn vid(&self) -> TagVid {
        self.tag.vid()
    }
}

/// Frame tagger bound to one TPID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tagger {
    tpid: u16,
}

impl Default for Tagger {
    fn default() -> Self {
        Self::new(ETH_P_8021Q)
    }
}

impl Tagger {
    /// Creates a tagger inserting tags with protocol id `tpid`.
    pub const fn new(tpid: u16) -> Self {
        Self { tpid }
    }

    /// Protocol id written on xmit and expected on rcv.
    pub const fn tpid(&self) -> u16 {
        self.tpid
    }

    /// Tags `frame` so that the switch forwards it out of `port_index` only.
    ///
    /// Returns the TX VID that was inserted.
    pub fn xmit(
        &self,
        frame: &mut BytesMut,
        switch_index: usize,
        port_index: usize,
    ) -> TaggingResult<TagVid> {
        let vid = encode_tx_identifier(switch_index, port_index);
        insert_frame_tag(frame, VlanTag::new(self.tpid, vid.as_u16()))?;
        trace!(vid = %vid, switch = switch_index, port = port_index, "Tagged frame for xmit");
        Ok(vid)
    }

    /// Strips the tag of a received frame and decodes where it came from.
    ///
    /// The TPID is reported, not checked.
    pub fn rcv(&self, frame: &mut BytesMut) -> TaggingResult<RxIdentity> {
        let tag = strip_frame_tag(frame)?;
        let identity = RxIdentity::from_tag(tag);
        if tag.tpid != self.tpid {
            trace!(expected = self.tpid, tpid = tag.tpid, "Unexpected TPID on rcv");
        }
        Ok(identity)
    }
}
