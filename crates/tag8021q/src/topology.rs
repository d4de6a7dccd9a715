//! Switch topology as seen by the synchronizer.

use serde::Serialize;

use crate::error::{TaggingError, TaggingResult};
use crate::types::PortRole;
use crate::vid::{MAX_PORTS, MAX_SWITCHES};

/// Read access to one switch of the fabric.
///
/// Implemented by whatever discovers the switch tree; the synchronizer
/// only needs the switch index, its ports and the upstream port.
pub trait TopologyProvider {
    /// Index of the switch within the fabric.
    fn switch_index(&self) -> usize;

    /// Number of ports on the switch.
    fn num_ports(&self) -> usize;

    /// Index of the CPU-facing port.
    fn upstream_port(&self) -> usize;

    /// Role of `port`, or `None` if the port does not exist.
    fn port_role(&self, port: usize) -> Option<PortRole>;

    /// Returns true if `port` is a front-panel port.
    fn is_user_port(&self, port: usize) -> bool {
        self.port_role(port) == Some(PortRole::User)
    }

    /// Returns the front-panel ports in ascending order.
    fn user_ports(&self) -> Vec<usize> {
        (0..self.num_ports())
            .filter(|&port| self.is_user_port(port))
            .collect()
    }
}

/// Static description of a switch.
///
/// # Examples
///
/// ```
/// use tag8021q::{PortRole, SwitchLayout, TopologyProvider};
///
/// let layout = SwitchLayout::new(0, 4, 3).unwrap();
/// assert_eq!(layout.upstream_port(), 3);
/// assert_eq!(layout.user_ports(), vec![0, 1, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchLayout {
    index: usize,
    upstream: usize,
    roles: Vec<PortRole>,
}

impl SwitchLayout {
    /// Creates a layout with `num_ports` user ports, one of which is the
    /// upstream port.
    ///
    /// # Errors
    ///
    /// Fails if the switch index or port count does not fit the VID fields,
    /// or the upstream port does not exist.
    pub fn new(index: usize, num_ports: usize, upstream: usize) -> TaggingResult<Self> {
        let mut roles = vec![PortRole::User; num_ports];
        if let Some(role) = roles.get_mut(upstream) {
            *role = PortRole::Upstream;
        }
        Self::from_roles(index, roles)
    }

    /// Creates a layout from per-port roles.
    ///
    /// # Errors
    ///
    /// Fails unless exactly one port is [`PortRole::Upstream`] and the
    /// indices fit the VID fields.
    pub fn from_roles(index: usize, roles: Vec<PortRole>) -> TaggingResult<Self> {
        if index >= MAX_SWITCHES {
            return Err(TaggingError::SwitchIndexOutOfRange(index));
        }
        if roles.is_empty() {
            return Err(TaggingError::invalid_topology(format!(
                "switch {} has no ports",
                index
            )));
        }
        if roles.len() > MAX_PORTS {
            return Err(TaggingError::PortIndexOutOfRange(roles.len() - 1));
        }

        let mut upstream_ports = roles
            .iter()
            .enumerate()
            .filter(|(_, role)| **role == PortRole::Upstream)
            .map(|(port, _)| port);
        let upstream = match (upstream_ports.next(), upstream_ports.next()) {
            (Some(port), None) => port,
            (None, _) => {
                return Err(TaggingError::invalid_topology(format!(
                    "switch {} has no upstream port",
                    index
                )))
            }
            (Some(first), Some(second)) => {
                return Err(TaggingError::invalid_topology(format!(
                    "switch {} has more than one upstream port ({} and {})",
                    index, first, second
                )))
            }
        };

        Ok(Self {
            index,
            upstream,
            roles,
        })
    }

    /// Changes the role of a non-upstream port.
    ///
    /// # Errors
    ///
    /// Fails if the port does not exist, or if the change would add or
    /// remove the upstream port.
    pub fn with_role(mut self, port: usize, role: PortRole) -> TaggingResult<Self> {
        let num_ports = self.roles.len();
        let current = self
            .roles
            .get_mut(port)
            .ok_or(TaggingError::PortOutOfRange {
                switch: self.index,
                port,
                num_ports,
            })?;
        if *current == PortRole::Upstream || role == PortRole::Upstream {
            return Err(TaggingError::invalid_topology(format!(
                "upstream port of switch {} is fixed at {}",
                self.index, self.upstream
            )));
        }
        *current = role;
        Ok(self)
    }

    /// Returns all port roles in port order.
    pub fn roles(&self) -> &[PortRole] {
        &self.roles
    }
}

impl TopologyProvider for SwitchLayout {
    fn switch_index(&self) -> usize {
        self.index
    }

    fn num_ports(&self) -> usize {
        self.roles.len()
    }

    fn upstream_port(&self) -> usize {
        self.upstream
    }

    fn port_role(&self, port: usize) -> Option<PortRole> {
        self.roles.get(port).copied()
    }
}

impl<T: TopologyProvider + ?Sized> TopologyProvider for &T {
    fn switch_index(&self) -> usize {
        (**self).switch_index()
    }

    fn num_ports(&self) -> usize {
        (**self).num_ports()
    }

    fn upstream_port(&self) -> usize {
        (**self).upstream_port()
    }

    fn port_role(&self, port: usize) -> Option<PortRole> {
        (**self).port_role(port)
    }
}
