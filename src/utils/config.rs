use std::collections::HashMap;
use std::str::FromStr;

use ini::Ini;
use log::LevelFilter;
use thiserror::Error;

use crate::utils::constants::BOOTSTRAP_FILES_DEFAULT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Load(#[from] ini::Error),
    #[error("'ports' section required")]
    MissingPorts,
    #[error("invalid port table entry {id:?} = {port:?}")]
    InvalidPortEntry { id: String, port: String },
    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),
    #[error("invalid bootstrap file count {0:?}")]
    InvalidFileCount(String),
    #[error("no port mapping for node id {0}")]
    UnknownNodeId(u32),
}

/// Deployment file for local testing: a static table mapping node
/// ids to localhost ports, plus node-level settings.
#[derive(Clone, Debug)]
pub struct Config {
    ports: HashMap<u32, u16>,
    pub log_level_filter: LevelFilter,
    pub bootstrap_files: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Config, ConfigError> {
        let conf = Ini::load_from_file(path)?;

        let ports_section = conf.section(Some("ports")).ok_or(ConfigError::MissingPorts)?;
        let mut ports = HashMap::new();
        for (id, port) in ports_section.iter() {
            let invalid = || ConfigError::InvalidPortEntry {
                id: id.to_string(),
                port: port.to_string(),
            };
            let id = id.parse::<u32>().map_err(|_| invalid())?;
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            ports.insert(id, port);
        }

        let node_section = conf.section(Some("node"));

        let log_level_filter = node_section
            .and_then(|section| section.get("log_level"))
            .map(|level| {
                LevelFilter::from_str(level).map_err(|_| ConfigError::InvalidLogLevel(level.to_string()))
            })
            .transpose()?
            .unwrap_or(LevelFilter::Info);

        let bootstrap_files = node_section
            .and_then(|section| section.get("bootstrap_files"))
            .map(|count| {
                count
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidFileCount(count.to_string()))
            })
            .transpose()?
            .unwrap_or(BOOTSTRAP_FILES_DEFAULT);

        Ok(Config {
            ports,
            log_level_filter,
            bootstrap_files,
        })
    }

    pub fn port(&self, node_id: u32) -> Result<u16, ConfigError> {
        self.ports
            .get(&node_id)
            .copied()
            .ok_or(ConfigError::UnknownNodeId(node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, contents).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn loads_ports_and_settings() {
        let path = write_config(
            "chord-node-config-full.ini",
            "[ports]\n0 = 9000\n1 = 9001\n\n[node]\nlog_level = debug\nbootstrap_files = 10\n",
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.port(0).unwrap(), 9000);
        assert_eq!(config.port(1).unwrap(), 9001);
        assert_eq!(config.log_level_filter, LevelFilter::Debug);
        assert_eq!(config.bootstrap_files, 10);
    }

    #[test]
    fn defaults_apply_without_a_node_section() {
        let path = write_config("chord-node-config-min.ini", "[ports]\n3 = 9003\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.log_level_filter, LevelFilter::Info);
        assert_eq!(config.bootstrap_files, BOOTSTRAP_FILES_DEFAULT);
        assert!(matches!(config.port(4), Err(ConfigError::UnknownNodeId(4))));
    }

    #[test]
    fn rejects_a_missing_ports_section() {
        let path = write_config("chord-node-config-empty.ini", "[node]\nlog_level = info\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::MissingPorts)));
    }
}
