//! 12-bit VID codec for port identification.
//!
//! Binary layout of the VID when the frame carries one of the tag8021q
//! identifiers:
//!
//! ```text
//! | 11  | 10  |  9  |  8  |  7  |  6  |  5  |  4  |  3  |  2  |  1  |  0  |
//! +-----------+-----+-----------------+-----------+-----------------------+
//! |    DIR    | RSV |    SWITCH_ID    |    RSV    |          PORT         |
//! +-----------+-----+-----------------+-----------+-----------------------+
//! ```
//!
//! DIR is `0b01` for RX VIDs and `0b10` for TX VIDs, so VIDs 0, 1 and 4095
//! are never produced. Both RSV fields are transmitted as zero and ignored
//! on receive.
//!
//! Encoding masks its inputs rather than validating them: a switch index of
//! 9 lands in SWITCH_ID as 1, a port index of 17 lands in PORT as 1. This is
//! bit-compatible with existing deployments. [`TagVid::try_encode`] is the
//! opt-in validated form.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TaggingError;

/// Number of switches addressable by SWITCH_ID.
pub const MAX_SWITCHES: usize = 8;

/// Number of ports addressable by PORT.
pub const MAX_PORTS: usize = 16;

/// Mask of the VID inside a tag control information word.
pub const VID_MASK: u16 = 0x0FFF;

const DIR_SHIFT: u16 = 10;
const DIR_MASK: u16 = 0x0C00;

const SWITCH_ID_SHIFT: u16 = 6;
const SWITCH_ID_MASK: u16 = 0x01C0;

const PORT_SHIFT: u16 = 0;
const PORT_MASK: u16 = 0x000F;

/// Direction encoded in the DIR field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Installed as pvid on the ingress port, seen tagged by the CPU.
    Rx,
    /// Inserted by the CPU to steer a frame to one egress port.
    Tx,
}

impl Direction {
    const fn bits(self) -> u16 {
        match self {
            Direction::Rx => 1,
            Direction::Tx => 2,
        }
    }

    /// Returns the direction name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Rx => "rx",
            Direction::Tx => "tx",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 12-bit VID carrying direction, switch index and port index.
///
/// # Examples
///
/// ```
/// use tag8021q::{Direction, TagVid};
///
/// let vid = TagVid::encode(Direction::Rx, 3, 5);
/// assert_eq!(vid.as_u16(), 0x4C5);
/// assert_eq!(vid.direction(), Some(Direction::Rx));
/// assert_eq!(vid.switch_index(), 3);
/// assert_eq!(vid.port_index(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct TagVid(u16);

impl TagVid {
    /// Builds a VID from its fields, masking each one to its width.
    pub const fn encode(direction: Direction, switch_index: usize, port_index: usize) -> Self {
        TagVid(
            ((direction.bits() << DIR_SHIFT) & DIR_MASK)
                | (((switch_index as u16) << SWITCH_ID_SHIFT) & SWITCH_ID_MASK)
                | (((port_index as u16) << PORT_SHIFT) & PORT_MASK),
        )
    }

    /// Builds a VID, rejecting indices that do not fit their field.
    ///
    /// # Errors
    ///
    /// Returns [`TaggingError::SwitchIndexOutOfRange`] or
    /// [`TaggingError::PortIndexOutOfRange`].
    pub fn try_encode(
        direction: Direction,
        switch_index: usize,
        port_index: usize,
    ) -> Result<Self, TaggingError> {
        if switch_index >= MAX_SWITCHES {
            return Err(TaggingError::SwitchIndexOutOfRange(switch_index));
        }
        if port_index >= MAX_PORTS {
            return Err(TaggingError::PortIndexOutOfRange(port_index));
        }
        Ok(Self::encode(direction, switch_index, port_index))
    }

    /// Extracts the VID from a tag control information word, dropping the
    /// PCP and DEI bits.
    pub const fn from_tci(tci: u16) -> Self {
        TagVid(tci & VID_MASK)
    }

    /// Returns the raw 12-bit value.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the direction, or `None` for the unused `00`/`11` patterns.
    pub const fn direction(&self) -> Option<Direction> {
        match (self.0 & DIR_MASK) >> DIR_SHIFT {
            1 => Some(Direction::Rx),
            2 => Some(Direction::Tx),
            _ => None,
        }
    }

    /// Returns the SWITCH_ID field.
    pub const fn switch_index(&self) -> usize {
        ((self.0 & SWITCH_ID_MASK) >> SWITCH_ID_SHIFT) as usize
    }

    /// Returns the PORT field.
    pub const fn port_index(&self) -> usize {
        ((self.0 & PORT_MASK) >> PORT_SHIFT) as usize
    }

    /// Returns true if DIR is RX.
    pub const fn is_rx(&self) -> bool {
        matches!(self.direction(), Some(Direction::Rx))
    }

    /// Returns true if DIR is TX.
    pub const fn is_tx(&self) -> bool {
        matches!(self.direction(), Some(Direction::Tx))
    }
}

impl fmt::Display for TagVid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for TagVid {
    fn from(tci: u16) -> Self {
        TagVid::from_tci(tci)
    }
}

impl From<TagVid> for u16 {
    fn from(vid: TagVid) -> u16 {
        vid.0
    }
}

/// Returns the VID a frame is tagged with on transmit to steer it out of
/// `port_index` of switch `switch_index`.
pub const fn encode_tx_identifier(switch_index: usize, port_index: usize) -> TagVid {
    TagVid::encode(Direction::Tx, switch_index, port_index)
}

/// Returns the VID installed as pvid on `port_index` of switch
/// `switch_index`, seen tagged by the CPU on receive.
pub const fn encode_rx_identifier(switch_index: usize, port_index: usize) -> TagVid {
    TagVid::encode(Direction::Rx, switch_index, port_index)
}

/// Decodes the switch index from a VID. DIR and reserved bits are not
/// checked.
pub const fn decode_switch_index(vid: u16) -> usize {
    TagVid::from_tci(vid).switch_index()
}

/// Decodes the port index from a VID. DIR and reserved bits are not
/// checked.
pub const fn decode_port_index(vid: u16) -> usize {
    TagVid::from_tci(vid).port_index()
}
