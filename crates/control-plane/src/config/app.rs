//! Application configuration for the Signoff Control Plane server.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `SIGNOFF_`:
/// - `SIGNOFF_HOST`: Server bind address (default: "0.0.0.0")
/// - `SIGNOFF_PORT`: Server port (default: 8074)
/// - `SIGNOFF_DEBUG`: Enable debug mode (default: false)
/// - `SIGNOFF_SERVER_NAME`: Server name for identification
/// - `SIGNOFF_AUTO_INIT_SCHEMA`: Apply the embedded schema DDL at startup (default: true)
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable debug mode
    #[serde(default)]
    pub debug: bool,

    /// Server name for identification
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Apply the embedded schema DDL at startup
    #[serde(default = "default_true")]
    pub auto_init_schema: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8074
}

fn default_server_name() -> String {
    "signoff-control-plane".to_string()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `SIGNOFF_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("SIGNOFF_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            server_name: default_server_name(),
            auto_init_schema: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8074);
        assert!(!config.debug);
        assert!(config.auto_init_schema);
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8074");
    }
}
