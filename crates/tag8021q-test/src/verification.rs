//! Verification helpers for testing port tagging
//!
//! Provides assertion helpers to verify VLAN table state and the commands
//! a backend would have executed

use tag8021q::{
    encode_rx_identifier, encode_tx_identifier, MembershipQuery, StoreError, TopologyProvider,
    VlanFlags,
};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Expected port {port} to be a member of VID {vid}")]
    MissingMembership { port: usize, vid: u16 },

    #[error("Port {port} unexpectedly a member of VID {vid} ({flags})")]
    UnexpectedMembership {
        port: usize,
        vid: u16,
        flags: VlanFlags,
    },

    #[error("Flags mismatch for port {port} VID {vid}: expected '{expected}', got '{actual}'")]
    FlagsMismatch {
        port: usize,
        vid: u16,
        expected: VlanFlags,
        actual: VlanFlags,
    },

    #[error("Expected {expected} {what}, found {actual}")]
    CountMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Expected command containing '{expected}', captured {captured:?}")]
    CommandNotExecuted {
        expected: String,
        captured: Vec<String>,
    },

    #[error("Command containing '{unexpected}' was executed")]
    CommandExecuted { unexpected: String },

    #[error("Could not read port {port} VID {vid}")]
    QueryFailed {
        port: usize,
        vid: u16,
        source: StoreError,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// VLAN table verification helper
pub struct MembershipVerifier<'a, Q: ?Sized> {
    store: &'a Q,
}

impl<'a, Q: MembershipQuery + ?Sized> MembershipVerifier<'a, Q> {
    /// Create a new verifier over `store`
    pub fn new(store: &'a Q) -> Self {
        Self { store }
    }

    fn query(&self, port: usize, vid: u16) -> VerifyResult<Option<VlanFlags>> {
        self.store
            .membership(port, vid)
            .map_err(|source| VerificationError::QueryFailed { port, vid, source })
    }

    /// Verify that `port` is a member of `vid` with exactly `expected` flags
    pub fn assert_member(&self, port: usize, vid: u16, expected: VlanFlags) -> VerifyResult<()> {
        match self.query(port, vid)? {
            None => Err(VerificationError::MissingMembership { port, vid }),
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(VerificationError::FlagsMismatch {
                port,
                vid,
                expected,
                actual,
            }),
        }
    }

    /// Verify that `port` is not a member of `vid`
    pub fn assert_not_member(&self, port: usize, vid: u16) -> VerifyResult<()> {
        match self.query(port, vid)? {
            None => Ok(()),
            Some(flags) => Err(VerificationError::UnexpectedMembership { port, vid, flags }),
        }
    }

    /// Verify every membership tagging `port` of `topology` should install
    pub fn assert_port_enabled<T>(&self, topology: &T, port: usize) -> VerifyResult<()>
    where
        T: TopologyProvider + ?Sized,
    {
        let switch = topology.switch_index();
        let upstream = topology.upstream_port();
        let rx = encode_rx_identifier(switch, port).as_u16();
        let tx = encode_tx_identifier(switch, port).as_u16();

        for other in (0..topology.num_ports()).filter(|&p| p != upstream) {
            let flags = if other == port {
                VlanFlags::UNTAGGED_PVID
            } else {
                VlanFlags::UNTAGGED
            };
            self.assert_member(other, rx, flags)?;
        }
        self.assert_member(upstream, rx, VlanFlags::TAGGED)?;
        self.assert_member(port, tx, VlanFlags::UNTAGGED)?;
        self.assert_member(upstream, tx, VlanFlags::TAGGED)
    }

    /// Verify that no port holds the RX or TX VID of `port`
    pub fn assert_port_disabled<T>(&self, topology: &T, port: usize) -> VerifyResult<()>
    where
        T: TopologyProvider + ?Sized,
    {
        let switch = topology.switch_index();
        let rx = encode_rx_identifier(switch, port).as_u16();
        let tx = encode_tx_identifier(switch, port).as_u16();
        for other in 0..topology.num_ports() {
            self.assert_not_member(other, rx)?;
            self.assert_not_member(other, tx)?;
        }
        Ok(())
    }
}

/// Verify a count
pub fn assert_count(what: &str, expected: usize, actual: usize) -> VerifyResult<()> {
    if expected != actual {
        return Err(VerificationError::CountMismatch {
            what: what.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Command execution verifier (for dry-run mode)
pub struct CommandVerifier {
    captured_commands: Vec<String>,
}

impl CommandVerifier {
    /// Create a new command verifier
    pub fn new(captured_commands: Vec<String>) -> Self {
        Self { captured_commands }
    }

    /// Verify that a command containing `expected` was executed
    pub fn assert_command_executed(&self, expected: &str) -> VerifyResult<()> {
        if self.captured_commands.iter().any(|cmd| cmd.contains(expected)) {
            Ok(())
        } else {
            Err(VerificationError::CommandNotExecuted {
                expected: expected.to_string(),
                captured: self.captured_commands.clone(),
            })
        }
    }

    /// Verify that no command containing `unexpected` was executed
    pub fn assert_command_not_executed(&self, unexpected: &str) -> VerifyResult<()> {
        if self.captured_commands.iter().any(|cmd| cmd.contains(unexpected)) {
            Err(VerificationError::CommandExecuted {
                unexpected: unexpected.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Verify the number of commands executed
    pub fn assert_command_count(&self, expected: usize) -> VerifyResult<()> {
        assert_count("commands", expected, self.captured_commands.len())
    }

    /// Get all captured commands
    pub fn captured_commands(&self) -> &[String] {
        &self.captured_commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch_fixtures::four_port_switch;
    use pretty_assertions::assert_eq;
    use tag8021q::{configure_port_tagging, InMemoryStore, MembershipStore};

    #[test]
    fn test_membership_verifier() {
        let switch = four_port_switch();
        let mut store = InMemoryStore::new();
        configure_port_tagging(&switch, &mut store, 0, true).unwrap();

        let verifier = MembershipVerifier::new(&store);
        assert!(verifier.assert_port_enabled(&switch, 0).is_ok());
        assert!(verifier.assert_port_disabled(&switch, 1).is_ok());
        assert_eq!(
            verifier.assert_port_enabled(&switch, 1),
            Err(VerificationError::MissingMembership { port: 0, vid: 1025 })
        );
        assert_eq!(
            verifier.assert_member(1, 1024, VlanFlags::UNTAGGED_PVID),
            Err(VerificationError::FlagsMismatch {
                port: 1,
                vid: 1024,
                expected: VlanFlags::UNTAGGED_PVID,
                actual: VlanFlags::UNTAGGED,
            })
        );
    }

    #[test]
    fn test_not_member() {
        let mut store = InMemoryStore::new();
        store.add_membership(2, 100, VlanFlags::TAGGED).unwrap();
        let verifier = MembershipVerifier::new(&store);
        assert!(verifier.assert_not_member(2, 101).is_ok());
        assert_eq!(
            verifier.assert_not_member(2, 100),
            Err(VerificationError::UnexpectedMembership {
                port: 2,
                vid: 100,
                flags: VlanFlags::TAGGED
            })
        );
    }

    #[test]
    fn test_command_verifier() {
        let commands = vec![
            "/sbin/bridge vlan add vid 1025 dev \"swp1\" pvid untagged".to_string(),
            "/sbin/bridge vlan add vid 1025 dev \"eth0\"".to_string(),
        ];

        let verifier = CommandVerifier::new(commands);

        assert!(verifier.assert_command_executed("pvid untagged").is_ok());
        assert!(verifier.assert_command_executed("dev \"eth0\"").is_ok());
        assert!(verifier.assert_command_not_executed("vlan del").is_ok());
        assert!(verifier.assert_command_count(2).is_ok());

        assert!(verifier.assert_command_count(3).is_err());
        assert!(verifier.assert_command_executed("nonexistent").is_err());
    }
}
