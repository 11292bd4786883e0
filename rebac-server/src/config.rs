use config::{Config, ConfigError, Environment, File};
use rebac_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Environment prefix for configuration overrides, e.g. `REBAC_READ_PORT`
pub const ENV_PREFIX: &str = "REBAC";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address shared by both listeners
    pub host: String,
    /// Port of the read API (checks, listing, expand)
    pub read_port: u16,
    /// Port of the write API (tuple inserts and deletes)
    pub write_port: u16,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            read_port: 4466,
            write_port: 4467,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Layer defaults, the optional config file and `REBAC_*` environment
    /// variables (`__` separates nested keys, e.g. `REBAC_ENGINE__MAX_READ_DEPTH`).
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&ServerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("engine.namespaces")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn read_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.read_port).parse()
    }

    pub fn write_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.write_port).parse()
    }
}
