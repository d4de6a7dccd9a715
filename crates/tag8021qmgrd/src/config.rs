//! Configuration file support for tag8021qmgrd
//!
//! Loads and validates the switch fabric description from a TOML file.
//! Default location: /etc/sonic/tag8021q.conf
//!
//! ```toml
//! tpid = 33024
//! dry_run = false
//!
//! [[switches]]
//! index = 0
//! ports = [
//!   { name = "swp0", role = "user" },
//!   { name = "eth0", role = "upstream" },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tag8021q::{PortRole, SwitchLayout, Tagger, ETH_P_8021Q, MAX_PORTS, MAX_SWITCHES};
use tracing::warn;

use crate::error::{MgrError, MgrResult};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sonic/tag8021q.conf";

/// One port of a switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Linux interface name
    pub name: String,

    /// Port role (default: user)
    #[serde(default)]
    pub role: PortRole,
}

impl PortConfig {
    pub fn new(name: impl Into<String>, role: PortRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// One switch of the fabric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Switch index encoded in SWITCH_ID
    pub index: usize,

    /// Ports in hardware port order
    #[serde(default)]
    pub ports: Vec<PortConfig>,
}

impl SwitchConfig {
    /// Port index of the interface called `name`
    pub fn port_index(&self, name: &str) -> Option<usize> {
        self.ports.iter().position(|p| p.name == name)
    }

    /// Interface names in port order
    pub fn port_names(&self) -> Vec<String> {
        self.ports.iter().map(|p| p.name.clone()).collect()
    }

    /// Build the topology the synchronizer runs against
    pub fn layout(&self) -> MgrResult<SwitchLayout> {
        let roles = self.ports.iter().map(|p| p.role).collect();
        Ok(SwitchLayout::from_roles(self.index, roles)?)
    }

    fn validate(&self, position: usize) -> MgrResult<()> {
        let field = format!("switches[{}]", position);

        if self.index >= MAX_SWITCHES {
            return Err(MgrError::invalid_config(
                format!("{}.index", field),
                format!("switch index {} must be < {}", self.index, MAX_SWITCHES),
            ));
        }

        if self.ports.is_empty() || self.ports.len() > MAX_PORTS {
            return Err(MgrError::invalid_config(
                format!("{}.ports", field),
                format!("must have 1-{} ports, found {}", MAX_PORTS, self.ports.len()),
            ));
        }

        let upstream = self
            .ports
            .iter()
            .filter(|p| p.role == PortRole::Upstream)
            .count();
        if upstream != 1 {
            return Err(MgrError::invalid_config(
                format!("{}.ports", field),
                format!("exactly one upstream port required, found {}", upstream),
            ));
        }

        let mut names = HashSet::new();
        for port in &self.ports {
            if port.name.is_empty() {
                return Err(MgrError::invalid_config(
                    format!("{}.ports", field),
                    "interface name must not be empty",
                ));
            }
            if !names.insert(port.name.as_str()) {
                return Err(MgrError::invalid_config(
                    format!("{}.ports", field),
                    format!("duplicate interface name '{}'", port.name),
                ));
            }
        }

        Ok(())
    }
}

/// Complete tag8021qmgrd configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag8021qConfig {
    /// TPID used for frame tags
    #[serde(default = "default_tpid")]
    pub tpid: u16,

    /// Capture bridge commands instead of running them
    #[serde(default)]
    pub dry_run: bool,

    /// Restore touched memberships when a transition fails midway
    #[serde(default)]
    pub atomic: bool,

    /// Switches of the fabric
    #[serde(default)]
    pub switches: Vec<SwitchConfig>,
}

fn default_tpid() -> u16 {
    ETH_P_8021Q
}

impl Default for Tag8021qConfig {
    fn default() -> Self {
        Self {
            tpid: default_tpid(),
            dry_run: false,
            atomic: false,
            switches: Vec::new(),
        }
    }
}

impl Tag8021qConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> MgrResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| {
                MgrError::Configuration(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(MgrError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> MgrResult<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> MgrResult<Self> {
        toml::from_str(content).map_err(|e| MgrError::Configuration(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> MgrResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MgrError::Configuration(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Frame tagger for the configured TPID
    pub fn tagger(&self) -> Tagger {
        Tagger::new(self.tpid)
    }

    /// Switch with the given index
    pub fn switch(&self, index: usize) -> Option<&SwitchConfig> {
        self.switches.iter().find(|s| s.index == index)
    }

    /// Validate configuration
    pub fn validate(&self) -> MgrResult<()> {
        let mut indices = HashSet::new();
        for (position, switch) in self.switches.iter().enumerate() {
            switch.validate(position)?;
            if !indices.insert(switch.index) {
                return Err(MgrError::invalid_config(
                    format!("switches[{}].index", position),
                    format!("duplicate switch index {}", switch.index),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tag8021q::TopologyProvider;

    const FOUR_PORT: &str = r#"
[[switches]]
index = 0
ports = [
  { name = "swp0" },
  { name = "swp1", role = "user" },
  { name = "swp2", role = "user" },
  { name = "eth0", role = "upstream" },
]
"#;

    fn four_port_config() -> Tag8021qConfig {
        Tag8021qConfig::from_toml(FOUR_PORT).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Tag8021qConfig::default();
        assert_eq!(config.tpid, 0x8100);
        assert!(!config.dry_run);
        assert!(!config.atomic);
        assert!(config.switches.is_empty());
        assert!(config.validate().is_ok());
        assert_eq!(config.tagger(), Tagger::default());
    }

    #[test]
    fn test_toml_deserialization() {
        let config = four_port_config();
        // Unspecified values should use defaults
        assert_eq!(config.tpid, 0x8100);
        assert_eq!(config.switches.len(), 1);
        assert_eq!(config.switches[0].ports[0].role, PortRole::User);
        assert_eq!(config.switches[0].port_index("eth0"), Some(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_layout() {
        let layout = four_port_config().switches[0].layout().unwrap();
        assert_eq!(layout.upstream_port(), 3);
        assert_eq!(layout.user_ports(), vec![0, 1, 2]);
    }

    #[test]
    fn test_validate_rejects_bad_switch_index() {
        let mut config = four_port_config();
        config.switches[0].index = 8;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, MgrError::InvalidConfig { ref field, .. } if field == "switches[0].index"));
    }

    #[test]
    fn test_validate_rejects_duplicate_switch() {
        let mut config = four_port_config();
        config.switches.push(config.switches[0].clone());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate switch index 0"));
    }

    #[test]
    fn test_validate_rejects_upstream_count() {
        let mut config = four_port_config();
        config.switches[0].ports[0].role = PortRole::Upstream;
        assert!(config.validate().is_err());

        config.switches[0].ports[0].role = PortRole::User;
        config.switches[0].ports[3].role = PortRole::User;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_port_count() {
        let mut config = four_port_config();
        config.switches[0].ports.clear();
        assert!(config.validate().is_err());

        let mut config = four_port_config();
        for i in 0..13 {
            config.switches[0]
                .ports
                .push(PortConfig::new(format!("swp{}", i + 3), PortRole::User));
        }
        assert_eq!(config.switches[0].ports.len(), 17);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_names() {
        let mut config = four_port_config();
        config.switches[0].ports[1].name = "swp0".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("duplicate interface name"));

        let mut config = four_port_config();
        config.switches[0].ports[1].name.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_role_fails_to_parse() {
        let toml_str = r#"
[[switches]]
index = 0
ports = [{ name = "swp0", role = "trunk" }]
"#;
        assert!(matches!(
            Tag8021qConfig::from_toml(toml_str),
            Err(MgrError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let config = Tag8021qConfig::load_or_default("/nonexistent/tag8021q.conf").unwrap();
        assert_eq!(config, Tag8021qConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag8021q.conf");

        let mut config = four_port_config();
        config.dry_run = true;
        config.tpid = tag8021q::ETH_P_DSA_8021Q;
        config.save(&path).unwrap();

        let loaded = Tag8021qConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"switches = 3").unwrap();
        let err = Tag8021qConfig::load_or_default(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
