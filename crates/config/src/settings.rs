// Application settings
// Loaded from ~/.config/shopmerge/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::regions::RegionTable;

/// Column names and key pattern of the Nanxi bill/order reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NanxiRules {
    #[serde(rename = "billKeyword")]
    pub bill_keyword: String,

    #[serde(rename = "orderKeyword")]
    pub order_keyword: String,

    /// Free-text column the order number is extracted from
    #[serde(rename = "descriptionColumn")]
    pub description_column: String,

    /// Regex whose first capture group is the order number
    #[serde(rename = "orderPattern")]
    pub order_pattern: String,

    #[serde(rename = "orderNumberColumn")]
    pub order_number_column: String,

    #[serde(rename = "amountColumn")]
    pub amount_column: String,

    /// Column appended to the order table
    #[serde(rename = "billAmountColumn")]
    pub bill_amount_column: String,
}

impl Default for NanxiRules {
    fn default() -> Self {
        Self {
            bill_keyword: "南溪账单".to_string(),
            order_keyword: "南溪订单".to_string(),
            description_column: "说明".to_string(),
            order_pattern: r"(10385\w*)".to_string(),
            order_number_column: "订单编号".to_string(),
            amount_column: "交易金额".to_string(),
            bill_amount_column: "账单交易金额".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Provenance columns
    #[serde(rename = "provenance.storeHeader")]
    pub store_header: String,

    #[serde(rename = "provenance.countryHeader")]
    pub country_header: String,

    #[serde(rename = "provenance.unknownStore")]
    pub unknown_store: String,

    #[serde(rename = "provenance.unknownCountry")]
    pub unknown_country: String,

    // Source layout
    #[serde(rename = "layout.warehouseDir")]
    pub warehouse_dir: String,

    #[serde(rename = "layout.amazonDir")]
    pub amazon_dir: String,

    // Country detection
    #[serde(rename = "regions")]
    pub regions: RegionTable,

    // Amazon
    #[serde(rename = "amazon.mappingPath")]
    pub mapping_path: Option<PathBuf>,

    // Nanxi
    #[serde(rename = "nanxi")]
    pub nanxi: NanxiRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_header: "store".to_string(),
            country_header: "country".to_string(),
            unknown_store: "unknown store".to_string(),
            unknown_country: "unknown".to_string(),
            warehouse_dir: "海外仓".to_string(),
            amazon_dir: "AMZ结算数据".to_string(),
            regions: RegionTable::default(),
            mapping_path: None,
            nanxi: NanxiRules::default(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shopmerge");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing file yields defaults; a file
    /// that exists but does not parse is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
