//! Project configuration in `.kin/config.json`.

use kin_server::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_DIR: &str = ".kin";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    pub version: String,
    /// Where the family database lives. Relative paths are taken from the
    /// directory holding `.kin/`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            data_dir: None,
            port: DEFAULT_PORT,
        }
    }
}

impl CliConfig {
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Reads `.kin/config.json` under `root`, if present.
    pub fn load(root: &Path) -> Result<Option<Self>, Box<dyn std::error::Error>> {
        let path = Self::path_in(root);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let config: CliConfig = serde_json::from_str(&text)?;
        debug!("Loaded config from {}", path.display());
        Ok(Some(config))
    }

    pub fn write(&self, root: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::path_in(root);
        fs::create_dir_all(root.join(CONFIG_DIR))?;
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// Picks the data directory: explicit flag, then project config, then the
/// user data directory.
pub fn resolve_data_dir(flag: Option<&Path>, root: &Path, config: Option<&CliConfig>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = config.and_then(|c| c.data_dir.as_ref()) {
        return root.join(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("kin"))
        .unwrap_or_else(|| root.join(CONFIG_DIR).join("data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_load() {
        let dir = tempdir().unwrap();
        assert!(CliConfig::load(dir.path()).unwrap().is_none());

        let config = CliConfig {
            data_dir: Some(PathBuf::from(".kin/data")),
            ..Default::default()
        };
        config.write(dir.path()).unwrap();

        let loaded = CliConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.port, DEFAULT_PORT);
    }

    #[test]
    fn test_missing_port_defaults() {
        let config: CliConfig = serde_json::from_str(r#"{ "version": "1.0" }"#).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn test_resolve_data_dir_precedence() {
        let root = Path::new("/project");
        let config = CliConfig {
            data_dir: Some(PathBuf::from("db")),
            ..Default::default()
        };

        assert_eq!(
            resolve_data_dir(Some(Path::new("/tmp/kin")), root, Some(&config)),
            PathBuf::from("/tmp/kin")
        );
        assert_eq!(
            resolve_data_dir(None, root, Some(&config)),
            PathBuf::from("/project/db")
        );
    }
}
