use crate::error::BolError;
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};
use time::UtcOffset;
use time::macros::format_description;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub zone: ZoneConfig,
    #[serde(default)]
    pub bill_to: BillTo,
    #[serde(default = "default_warehouses")]
    pub warehouses: Vec<Warehouse>,
    #[serde(default)]
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub store_key: String,
    pub page_size: usize,
    pub timeout_secs: u64,
    pub detail_level: String,
    pub combine: String,
    /// Ship class dropped from date-window fetches (identifier search keeps it).
    pub excluded_ship_class: String,
    pub search_window_days: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.teapplix.com/api2/OrderNotification".to_string(),
            store_key: "HD".to_string(),
            page_size: 500,
            timeout_secs: 45,
            detail_level: "shipping|inventory|marketplace".to_string(),
            combine: "combine".to_string(),
            excluded_ship_class: "UNSP_CG".to_string(),
            search_window_days: 90,
        }
    }
}

/// Reference zone for date windows and every displayed date.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    pub name: String,
    pub utc_offset: String,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            name: "America/Phoenix".to_string(),
            utc_offset: "-07:00".to_string(),
        }
    }
}

impl ZoneConfig {
    pub fn offset(&self) -> Result<UtcOffset, BolError> {
        let fmt = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
        UtcOffset::parse(self.utc_offset.trim(), fmt).map_err(|e| {
            BolError::Config(format!(
                "zone.utc_offset {:?} for {}: {e}",
                self.utc_offset, self.name
            ))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillTo {
    pub name: String,
    pub address: String,
    pub city_state_zip: String,
}

impl Default for BillTo {
    fn default() -> Self {
        Self {
            name: "THE HOME DEPOT".to_string(),
            address: "2455 PACES FERRY RD".to_string(),
            city_state_zip: "ATLANTA, GA 30339".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Warehouse {
    /// Display key used in rows, e.g. "CA 91789".
    pub key: String,
    pub name: String,
    pub addr: String,
    pub citystatezip: String,
    pub sid: String,
}

fn default_warehouses() -> Vec<Warehouse> {
    vec![
        Warehouse {
            key: "CA 91789".to_string(),
            name: "Festival Neo CA".to_string(),
            addr: "5500 Mission Blvd".to_string(),
            citystatezip: "Montclair, CA 91763".to_string(),
            sid: "CA-001".to_string(),
        },
        Warehouse {
            key: "NJ 08816".to_string(),
            name: "Festival Neo NJ".to_string(),
            addr: "10 Main St".to_string(),
            citystatezip: "East Brunswick, NJ 08816".to_string(),
            sid: "NJ-001".to_string(),
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownWarehouse {
    /// Use the first configured warehouse.
    #[default]
    Fallback,
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub template: PathBuf,
    pub output_dir: PathBuf,
    pub description_suffix: String,
    pub unknown_warehouse: UnknownWarehouse,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from("BOL.pdf"),
            output_dir: PathBuf::from("output_bols"),
            description_suffix: "Electric Fireplace".to_string(),
            unknown_warehouse: UnknownWarehouse::Fallback,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            zone: ZoneConfig::default(),
            bill_to: BillTo::default(),
            warehouses: default_warehouses(),
            document: DocumentConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BolError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, BolError> {
        let cfg: Config = toml::from_str(content).map_err(|e| BolError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), BolError> {
        if self.warehouses.is_empty() {
            return Err(BolError::Config("at least one [[warehouses]] entry is required".into()));
        }
        if self.api.page_size == 0 {
            return Err(BolError::Config("api.page_size must be positive".into()));
        }
        self.zone.offset()?;
        Ok(())
    }

    /// Key new display rows start with.
    pub fn default_warehouse_key(&self) -> &str {
        self.warehouses.first().map(|w| w.key.as_str()).unwrap_or_default()
    }

    pub fn warehouse(&self, key: &str) -> Option<&Warehouse> {
        self.warehouses.iter().find(|w| w.key == key)
    }

    /// API token comes from the environment, never the config file.
    pub fn api_token() -> Result<String, BolError> {
        std::env::var("TEAPPLIX_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(BolError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.api.page_size, 500);
        assert_eq!(cfg.api.timeout_secs, 45);
        assert_eq!(cfg.default_warehouse_key(), "CA 91789");
        assert_eq!(cfg.zone.offset().unwrap(), UtcOffset::from_hms(-7, 0, 0).unwrap());
        assert_eq!(cfg.document.unknown_warehouse, UnknownWarehouse::Fallback);
    }

    #[test]
    fn test_warehouses_keep_file_order() {
        let cfg = Config::from_toml(
            r#"
            [document]
            unknown_warehouse = "reject"

            [[warehouses]]
            key = "TX 75001"
            name = "Dallas"
            addr = "1 Elm St"
            citystatezip = "Addison, TX 75001"
            sid = "TX-9"

            [[warehouses]]
            key = "CA 91789"
            name = "Festival Neo CA"
            addr = "5500 Mission Blvd"
            citystatezip = "Montclair, CA 91763"
            sid = "CA-001"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.default_warehouse_key(), "TX 75001");
        assert_eq!(cfg.warehouse("CA 91789").unwrap().sid, "CA-001");
        assert!(cfg.warehouse("NJ 08816").is_none());
        assert_eq!(cfg.document.unknown_warehouse, UnknownWarehouse::Reject);
    }

    #[test]
    fn test_rejects_bad_offset_and_empty_warehouses() {
        assert!(Config::from_toml("[zone]\nutc_offset = \"seven\"").is_err());
        assert!(Config::from_toml("warehouses = []").is_err());
    }
}
