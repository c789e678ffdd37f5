//! Configuration file handling.
//!
//! Settings live in a TOML file with four sections: `[ui]` (the pick lists
//! offered when logging a transfer), `[logging]`, `[requests]` and
//! `[hashing]`. Missing keys fall back to their defaults, so an empty file is
//! a valid configuration.

use anyhow::Context;
use dta_files::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Log levels accepted by `logging.level`
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pick lists for transfer details
    pub ui: UiConfig,
    /// Transfer log and file list output
    pub logging: LoggingConfig,
    /// Request log and request file list output
    pub requests: RequestsConfig,
    /// Content hashing
    pub hashing: HashingConfig,
}

/// Pick lists for transfer details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Storage media used for transfers
    pub media_types: Vec<String>,
    /// Transfer type name to abbreviation, e.g. `"Low to High" = "L2H"`
    pub transfer_types: BTreeMap<String, String>,
    /// Networks that may appear as source or destination
    pub network_list: Vec<String>,
    /// This system's network, used for the `{direction}` token
    pub local_network: Option<String>,
    /// Pre-populated media identifiers
    pub media_ids: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| -> Vec<String> { items.iter().map(|s| (*s).to_string()).collect() };
        Self {
            media_types: strings(&[
                "Apricorn", "Blu-ray", "CD", "DVD", "Flash", "HDD", "microSD", "SD", "SSD",
            ]),
            transfer_types: [("Low to High", "L2H"), ("High to High", "H2H"), ("High to Low", "H2L")]
                .into_iter()
                .map(|(name, abbr)| (name.to_string(), abbr.to_string()))
                .collect(),
            network_list: strings(&["Intranet", "Customer", "IS001", "System 99"]),
            local_network: None,
            media_ids: Vec::new(),
        }
    }
}

/// Transfer log and file list output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for yearly transfer logs; file lists go in `<year>/` below it
    pub output_folder: PathBuf,
    /// Transfer log filename template
    pub transfer_log_name: String,
    /// File list filename template
    pub file_list_name: String,
    /// Format of the plain `{date}` token
    pub date_format: String,
    /// Format of the plain `{time}` token
    pub time_format: String,
    /// Default log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("./logs"),
            transfer_log_name: "TransferLog_{year}.log".to_string(),
            file_list_name:
                "{timestamp}_{username}_{transfertype}_{source}-{destination}_FileList.csv"
                    .to_string(),
            date_format: "yyyyMMdd".to_string(),
            time_format: "HHmmss".to_string(),
            level: "info".to_string(),
        }
    }
}

/// Request log and request file list output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestsConfig {
    /// Directory for request logs and request file lists
    pub output_folder: PathBuf,
    /// Request log filename template
    pub request_log_name: String,
    /// Request file list filename template
    pub file_list_name: String,
    /// Append a summary row to the yearly request log
    pub enable_request_log: bool,
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("./requests"),
            request_log_name: "RequestLog_{year}.log".to_string(),
            file_list_name: "{date:yyyyMMdd}_{username}_Request_{counter}.csv".to_string(),
            enable_request_log: true,
        }
    }
}

/// Content hashing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Hash selected files before writing the file list
    pub enabled: bool,
    /// Digest algorithm (sha256, blake3)
    pub algorithm: String,
    /// Also hash files found inside archives
    pub hash_archive_entries: bool,
    /// Deepest archive nesting level to list; unlimited when unset
    pub max_depth: Option<u32>,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: HashAlgorithm::default().as_str().to_string(),
            hash_archive_entries: false,
            max_depth: None,
        }
    }
}

impl HashingConfig {
    /// Parsed digest algorithm
    pub fn algorithm(&self) -> anyhow::Result<HashAlgorithm> {
        self.algorithm
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid hashing.algorithm: {e}"))
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load the default configuration file, creating it if it does not exist
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            return Self::load(&path);
        }

        let config = Self::default();
        match config.save(&path) {
            Ok(()) => tracing::info!("Created default configuration at {}", path.display()),
            Err(e) => tracing::warn!("Could not write default configuration: {:#}", e),
        }
        Ok(config)
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("dta")
            .join("config.toml")
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> anyhow::Result<()> {
        self.hashing.algorithm()?;

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid logging.level: {} (expected one of {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            );
        }

        for (key, template) in [
            ("logging.transfer_log_name", &self.logging.transfer_log_name),
            ("logging.file_list_name", &self.logging.file_list_name),
            ("requests.request_log_name", &self.requests.request_log_name),
            ("requests.file_list_name", &self.requests.file_list_name),
        ] {
            if template.trim().is_empty() {
                anyhow::bail!("{key} must not be empty");
            }
        }

        if let Some(local) = &self.ui.local_network
            && !self.ui.network_list.iter().any(|n| n == local)
        {
            anyhow::bail!("ui.local_network {local:?} is not in ui.network_list");
        }

        Ok(())
    }

    /// Resolve a transfer type given by full name or abbreviation to its
    /// abbreviation. Matching is case-insensitive.
    pub fn transfer_type_abbreviation(&self, value: &str) -> Option<&str> {
        self.ui
            .transfer_types
            .iter()
            .find(|(name, abbr)| name.eq_ignore_ascii_case(value) || abbr.eq_ignore_ascii_case(value))
            .map(|(_, abbr)| abbr.as_str())
    }
}

/// Parse a comma-separated list, dropping blank items
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `Name:ABBR, Name:ABBR` pairs
pub fn parse_transfer_types(value: &str) -> anyhow::Result<BTreeMap<String, String>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, abbr) = pair
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("Invalid transfer type {pair:?}, expected Name:ABBR"))?;
            Ok((name.trim().to_string(), abbr.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.logging.output_folder, PathBuf::from("./logs"));
        assert_eq!(config.hashing.algorithm().unwrap(), HashAlgorithm::Sha256);
        assert_eq!(config.ui.media_types.len(), 9);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[hashing]\nalgorithm = \"blake3\"\n\n[ui.transfer_types]\n\"Low to High\" = \"L2H\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.hashing.algorithm().unwrap(), HashAlgorithm::Blake3);
        assert!(config.hashing.enabled);
        assert_eq!(config.ui.transfer_types.len(), 1);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.ui.local_network = Some("IS001".to_string());
        config.hashing.max_depth = Some(4);
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.hashing.algorithm = "md4".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.file_list_name = "  ".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("file_list_name"));

        let mut config = Config::default();
        config.ui.local_network = Some("Mars".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load(&temp_dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_transfer_type_lookup() {
        let config = Config::default();
        assert_eq!(config.transfer_type_abbreviation("Low to High"), Some("L2H"));
        assert_eq!(config.transfer_type_abbreviation("low to high"), Some("L2H"));
        assert_eq!(config.transfer_type_abbreviation("h2l"), Some("H2L"));
        assert_eq!(config.transfer_type_abbreviation("Sideways"), None);
    }

    #[test]
    fn test_parse_lists() {
        assert_eq!(parse_list(" CD, DVD ,,SSD "), vec!["CD", "DVD", "SSD"]);
        assert!(parse_list("").is_empty());

        let types = parse_transfer_types("Low to High:L2H, High to Low:H2L").unwrap();
        assert_eq!(types.get("High to Low").map(String::as_str), Some("H2L"));
        assert!(parse_transfer_types("Broken").is_err());
    }
}
