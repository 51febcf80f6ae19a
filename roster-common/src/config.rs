//! Configuration loading and root folder resolution
//!
//! Configuration lives in a single TOML file. A missing file is not an error:
//! every section has defaults, so a fresh install starts with no config at all.
//!
//! ```toml
//! root_folder = "/srv/roster"
//!
//! [logging]
//! level = "debug"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 5740
//!
//! [[resolver.overrides]]
//! from = "budi@school.sch.id"
//! to = "budi.santoso@school.sch.id"
//!
//! [[resolver.compound_aliases]]
//! compact = "adisasmito"
//! expanded = "adi.sasmito"
//!
//! [schedule]
//! day_min = 0
//! day_max = 6
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "ROSTER_ROOT_FOLDER";

/// Environment variable naming an explicit config file
pub const CONFIG_FILE_ENV: &str = "ROSTER_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "roster.db";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub resolver: ResolverConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5740,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Identifier resolution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Known historical identifier → canonical identifier pairs
    pub overrides: Vec<OverrideRule>,
    /// Compact local parts that stand for a dotted/underscored form
    pub compound_aliases: Vec<CompoundAlias>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundAlias {
    pub compact: String,
    pub expanded: String,
}

/// Schedule row constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Inclusive lower bound for the Day column
    pub day_min: u8,
    /// Inclusive upper bound for the Day column
    pub day_max: u8,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day_min: 0,
            day_max: 6,
        }
    }
}

impl TomlConfig {
    /// Reject configurations that would make every row fail
    pub fn validate(&self) -> Result<()> {
        if self.schedule.day_min > self.schedule.day_max {
            return Err(Error::Config(format!(
                "schedule.day_min ({}) is greater than schedule.day_max ({})",
                self.schedule.day_min, self.schedule.day_max
            )));
        }

        for rule in &self.resolver.overrides {
            if rule.from.trim().is_empty() || rule.to.trim().is_empty() {
                return Err(Error::Config(
                    "resolver.overrides entries need non-empty `from` and `to`".to_string(),
                ));
            }
        }

        for alias in &self.resolver.compound_aliases {
            if alias.compact.trim().is_empty() || alias.expanded.trim().is_empty() {
                return Err(Error::Config(
                    "resolver.compound_aliases entries need non-empty `compact` and `expanded`"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration, falling back to defaults when no file exists
///
/// Priority for the file location: explicit path → `ROSTER_CONFIG` →
/// platform config dir. A file that exists but does not parse is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    match path {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            info!(
                path = %path.display(),
                overrides = config.resolver.overrides.len(),
                compound_aliases = config.resolver.compound_aliases.len(),
                "Loaded configuration"
            );
            Ok(config)
        }
        Some(path) if explicit.is_some() => Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        ))),
        Some(path) => {
            warn!(path = %path.display(), "No config file found, using defaults");
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Config file location when none is given explicitly
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("roster").join("config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `ROSTER_ROOT_FOLDER` environment variable
/// 3. `root_folder` in the TOML config
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&str>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("roster"))
        .unwrap_or_else(|| PathBuf::from("./roster_data"))
}

/// Creates the root folder on first run and hands out paths inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.port, 5740);
        assert_eq!(config.schedule.day_min, 0);
        assert_eq!(config.schedule.day_max, 6);
        assert!(config.resolver.overrides.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.schedule, ScheduleConfig::default());
    }

    #[test]
    fn test_inverted_day_range_rejected() {
        let mut config = TomlConfig::default();
        config.schedule.day_min = 5;
        config.schedule.day_max = 1;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_blank_override_rejected() {
        let mut config = TomlConfig::default();
        config.resolver.overrides.push(OverrideRule {
            from: " ".to_string(),
            to: "a@b".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_arg_wins() {
        let config = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let root = resolve_root_folder(Some("/from/cli"), &config);
        assert_eq!(root, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_database_path_inside_root() {
        let init = RootFolderInitializer::new(PathBuf::from("/srv/roster"));
        assert_eq!(init.database_path(), PathBuf::from("/srv/roster/roster.db"));
    }
}
