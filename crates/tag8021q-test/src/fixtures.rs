//! Test fixtures for common switch layouts and tagging sequences
//!
//! Provides reusable topologies and scenarios for synchronizer testing

use tag8021q::{
    configure_port_tagging, MembershipStore, PortRole, SwitchLayout, TaggingResult,
    TopologyProvider,
};

/// Common switch layouts
pub mod switch_fixtures {
    use super::*;

    /// Four ports, 0-2 user, 3 upstream, switch 0
    pub fn four_port_switch() -> SwitchLayout {
        fixture(SwitchLayout::new(0, 4, 3))
    }

    /// `num_ports` ports with the upstream port at index 0
    pub fn upstream_first(index: usize, num_ports: usize) -> SwitchLayout {
        fixture(SwitchLayout::new(index, num_ports, 0))
    }

    /// Largest addressable switch: index 7, 16 ports, upstream last
    pub fn max_switch() -> SwitchLayout {
        fixture(SwitchLayout::new(7, 16, 15))
    }

    /// Six ports: 0-2 user, 3 unused, 4 cascade link, 5 upstream
    pub fn mixed_roles_switch(index: usize) -> SwitchLayout {
        fixture(SwitchLayout::from_roles(
            index,
            vec![
                PortRole::User,
                PortRole::User,
                PortRole::User,
                PortRole::Unused,
                PortRole::Link,
                PortRole::Upstream,
            ],
        ))
    }

    /// `count` identical switches with indices 0..count, five ports each,
    /// upstream port 4
    pub fn fabric(count: usize) -> Vec<SwitchLayout> {
        (0..count)
            .map(|index| fixture(SwitchLayout::new(index, 5, 4)))
            .collect()
    }

    fn fixture(layout: TaggingResult<SwitchLayout>) -> SwitchLayout {
        match layout {
            Ok(layout) => layout,
            Err(e) => panic!("invalid fixture layout: {e}"),
        }
    }
}

/// One port transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortTransition {
    /// Target port
    pub port: usize,
    /// Enable or disable
    pub enabled: bool,
}

/// Ordered list of port transitions applied to one switch
#[derive(Debug, Clone)]
pub struct TaggingScenario {
    /// Scenario name
    pub name: String,
    /// Transitions in order
    pub transitions: Vec<PortTransition>,
}

impl TaggingScenario {
    /// Create an empty scenario
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transitions: Vec::new(),
        }
    }

    /// Append an enable transition
    pub fn enable(mut self, port: usize) -> Self {
        self.transitions.push(PortTransition {
            port,
            enabled: true,
        });
        self
    }

    /// Append a disable transition
    pub fn disable(mut self, port: usize) -> Self {
        self.transitions.push(PortTransition {
            port,
            enabled: false,
        });
        self
    }

    /// Append an enable transition for every user port
    pub fn enable_all<T: TopologyProvider + ?Sized>(mut self, topology: &T) -> Self {
        for port in topology.user_ports() {
            self = self.enable(port);
        }
        self
    }

    /// Apply every transition in order, stopping at the first error
    pub fn run<T, S>(&self, topology: &T, store: &mut S) -> TaggingResult<()>
    where
        T: TopologyProvider + ?Sized,
        S: MembershipStore + ?Sized,
    {
        for transition in &self.transitions {
            configure_port_tagging(topology, store, transition.port, transition.enabled)?;
        }
        Ok(())
    }
}
