use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::protocol::WireFormat;

/// Default service port of the agent
pub const DEFAULT_PORT: u16 = 51821;

/// Global agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener configuration (daemon side)
    pub server: ServerConfig,

    /// Sender configuration (UI side)
    pub client: ClientConfig,

    /// How actions reach the configuration shell
    pub executor: ExecutorConfig,

    /// WireGuard defaults used when building actions
    pub wireguard: WireGuardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_addr: String,

    /// Encoding expected from clients
    pub wire_format: WireFormat,

    /// Largest message accepted in a single read (bytes)
    pub max_message_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Daemon address to connect to
    pub addr: String,

    /// Encoding the daemon expects
    pub wire_format: WireFormat,

    /// How long to wait for the reply (milliseconds)
    pub reply_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Configuration shell binary
    pub vtysh_path: PathBuf,

    /// Log actions instead of running them
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WireGuardConfig {
    /// WireGuard interface managed by the agent
    pub interface: String,

    /// Keepalive applied to every peer added (`off` or seconds)
    pub persistent_keepalive: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            wire_format: WireFormat::default(),
            max_message_size: 4096,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            wire_format: WireFormat::default(),
            reply_timeout_ms: 2000,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            vtysh_path: PathBuf::from("/sbin/vtysh"),
            dry_run: false,
        }
    }
}

impl Default for WireGuardConfig {
    fn default() -> Self {
        Self {
            interface: "wg0".into(),
            persistent_keepalive: "25".into(),
        }
    }
}

impl Config {
    /// Load config from default locations (in order of precedence):
    /// 1. $PWD/.wgagent.toml
    /// 2. /etc/wgagent/config.toml
    /// 3. $XDG_CONFIG_HOME/wgagent/config.toml
    /// 4. Built-in defaults
    pub fn load() -> Self {
        for path in search_paths() {
            match Self::load_from(&path) {
                Ok(config) => {
                    tracing::debug!("Loaded config from {}", path.display());
                    return config;
                }
                Err(ConfigError::Io(_)) => continue,
                Err(e) => {
                    tracing::warn!("Ignoring {}: {}", path.display(), e);
                }
            }
        }

        Self::default()
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.wireguard.validate()?;
        Ok(config)
    }
}

impl WireGuardConfig {
    /// Both values are substituted into configuration-shell actions
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name_ok = !self.interface.is_empty()
            && self.interface.len() <= 15
            && self
                .interface
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !name_ok {
            return Err(ConfigError::Invalid {
                key: "wireguard.interface",
                reason: format!("'{}' is not an interface name", self.interface),
            });
        }

        if self.persistent_keepalive != "off" && self.persistent_keepalive.parse::<u16>().is_err() {
            return Err(ConfigError::Invalid {
                key: "wireguard.persistent_keepalive",
                reason: format!(
                    "'{}' is neither 'off' nor a number of seconds",
                    self.persistent_keepalive
                ),
            });
        }

        Ok(())
    }
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(".wgagent.toml"),
        PathBuf::from("/etc/wgagent/config.toml"),
    ];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("wgagent").join("config.toml"));
    }
    paths
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:51821");
        assert_eq!(config.server.wire_format, WireFormat::Structured);
        assert_eq!(config.client.reply_timeout_ms, 2000);
        assert_eq!(config.wireguard.interface, "wg0");
        assert!(!config.executor.dry_run);
    }

    #[test]
    fn test_load_partial_file() -> Result<(), ConfigError> {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
wire_format = "text"

[executor]
dry_run = true
"#,
        )
        .unwrap();

        let config = Config::load_from(&path)?;
        assert_eq!(config.server.wire_format, WireFormat::Text);
        assert_eq!(config.server.max_message_size, 4096);
        assert!(config.executor.dry_run);
        assert_eq!(config.client.wire_format, WireFormat::Structured);

        Ok(())
    }

    #[test]
    fn test_load_rejects_bad_format() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nwire_format = \"gob\"\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_unsafe_wireguard_values() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        for body in [
            "[wireguard]\ninterface = \"wg0 mtu 9000\"\n",
            "[wireguard]\ninterface = \"\"\n",
            "[wireguard]\npersistent_keepalive = \"25; reboot\"\n",
            "[wireguard]\npersistent_keepalive = \"-1\"\n",
        ] {
            std::fs::write(&path, body).unwrap();
            assert!(
                matches!(Config::load_from(&path), Err(ConfigError::Invalid { .. })),
                "{:?}",
                body
            );
        }
    }

    #[test]
    fn test_wireguard_keepalive_off() {
        let wireguard = WireGuardConfig {
            interface: "wg1".into(),
            persistent_keepalive: "off".into(),
        };
        assert!(wireguard.validate().is_ok());
        assert!(WireGuardConfig::default().validate().is_ok());
    }
}
