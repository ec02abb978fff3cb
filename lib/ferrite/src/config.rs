use crate::logging;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PORT: u16 = 6379;

#[derive(Serialize, Deserialize)]
pub struct Server {
    pub address: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub destination: String,
}

#[derive(Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: Server,
    pub logging: Logging,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            server: Server {
                address: Some(format!("127.0.0.1:{}", DEFAULT_PORT)),
            },
            logging: Logging {
                level: "debug".to_string(),
                destination: "stderr".to_string(),
            },
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> ServerConfig {
        serdeconv::from_toml_file(path).expect("Error loading server configuration file")
    }

    /// Listen address, falling back to the default loopback port.
    pub fn address(&self) -> String {
        match &self.server.address {
            Some(address) => address.clone(),
            None => format!("127.0.0.1:{}", DEFAULT_PORT),
        }
    }

    /// Build the terminal logger described by the `[logging]` section.
    pub fn build_logger(&self) -> logging::Logger {
        logging::terminal(&self.logging.level, &self.logging.destination)
    }
}
