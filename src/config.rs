use crate::style::ColorScheme;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub workbook: WorkbookConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub boundaries: PathBuf,
    /// A spreadsheet file (`.xlsx`, `.xls`, `.ods`, ...) or a directory with
    /// one CSV file per sheet.
    #[serde(alias = "workbook_dir")]
    pub workbook: PathBuf,
    #[serde(default = "default_id_column")]
    pub id_property: String,
    #[serde(default = "default_name_column")]
    pub name_property: String,
}

/// Sheet and column names inside the workbook.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkbookConfig {
    pub index_sheet: String,
    pub index_code_column: String,
    pub index_label_column: String,
    /// When unset the label column doubles as the data sheet name.
    pub index_sheet_column: Option<String>,
    pub location_sheet: String,
    pub location_id_column: String,
    pub location_name_column: String,
    /// Identifier column of every data sheet.
    pub data_id_column: String,
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            index_sheet: "Index".to_string(),
            index_code_column: "index code".to_string(),
            index_label_column: "index".to_string(),
            index_sheet_column: None,
            location_sheet: "Location ID".to_string(),
            location_id_column: default_id_column(),
            location_name_column: default_name_column(),
            data_id_column: default_id_column(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    pub default_scheme: ColorScheme,
    /// [lat, lng]
    pub center: [f64; 2],
    pub zoom: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_scheme: ColorScheme::Reds,
            center: [32.0, 53.0],
            zoom: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: None,
        }
    }
}

fn default_id_column() -> String {
    "ID_1".to_string()
}

fn default_name_column() -> String {
    "NAME_1".to_string()
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_in_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            boundaries = "IRN_adm.json"
            workbook = "IrDevIndextest.xlsx"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.id_property, "ID_1");
        assert_eq!(config.input.workbook, PathBuf::from("IrDevIndextest.xlsx"));
        assert_eq!(config.workbook.index_sheet, "Index");
        assert_eq!(config.workbook.location_sheet, "Location ID");
        assert!(config.workbook.index_sheet_column.is_none());
        assert_eq!(config.display.default_scheme, ColorScheme::Reds);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn explicit_sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            boundaries = "b.geojson"
            workbook_dir = "wb"
            id_property = "code"

            [workbook]
            index_sheet_column = "sheet"
            data_id_column = "code"

            [display]
            default_scheme = "Greens"

            [server]
            port = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.input.id_property, "code");
        assert_eq!(config.input.workbook, PathBuf::from("wb"));
        assert_eq!(config.workbook.index_sheet_column.as_deref(), Some("sheet"));
        assert_eq!(config.workbook.data_id_column, "code");
        assert_eq!(config.workbook.index_code_column, "index code");
        assert_eq!(config.display.default_scheme, ColorScheme::Greens);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn bundled_config_serves_no_static_files() {
        let config = AppConfig::from_toml(include_str!("../config.toml")).unwrap();
        assert_eq!(config.input.workbook, PathBuf::from("data/IrDevIndextest.xlsx"));
        assert!(config.server.static_dir.is_none());
    }

    #[test]
    fn missing_input_section_is_an_error() {
        assert!(AppConfig::from_toml("[server]\nport = 1").is_err());
    }
}
