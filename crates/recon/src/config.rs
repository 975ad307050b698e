use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer};

use shipvoid_io::{LoadSpec, SheetSpec, TableSchema};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every field has a default, so an empty TOML document
/// describes the standard Shipvoid Forecast / Legacy Unbilled Cartons pair.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Distribution center code; the facility of records whose extract has
    /// no facility column.
    #[serde(default = "default_facility")]
    pub facility: String,
    /// Bypass the retrieval collaborator.
    #[serde(default)]
    pub skip_download: bool,
    /// Use only files already on local disk.
    #[serde(default)]
    pub local: bool,
    /// Restrict reconciliation to these facilities. Empty = all.
    #[serde(default)]
    pub facility_filter: Vec<String>,
    #[serde(default)]
    pub date_bucket: DateBucket,
    #[serde(default = "default_group_by")]
    pub group_by: Vec<GroupDimension>,
    /// Shipvoid statuses that are already billed and carry no void risk.
    #[serde(default = "default_billed_statuses")]
    pub billed_statuses: Vec<String>,
    #[serde(default = "SourceSchema::shipvoid", deserialize_with = "shipvoid_schema")]
    pub shipvoid: SourceSchema,
    #[serde(default = "SourceSchema::legacy", deserialize_with = "legacy_schema")]
    pub legacy: SourceSchema,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub facilities: Vec<FacilityConfig>,
}

fn default_name() -> String {
    "Shipvoid Cross-Reference".into()
}

fn default_facility() -> String {
    "6006".into()
}

fn default_group_by() -> Vec<GroupDimension> {
    vec![GroupDimension::Facility, GroupDimension::DateBucket]
}

fn default_billed_statuses() -> Vec<String> {
    vec!["VF".into(), "BILLED OR INACTIVE".into()]
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            facility: default_facility(),
            skip_download: false,
            local: false,
            facility_filter: Vec::new(),
            date_bucket: DateBucket::default(),
            group_by: default_group_by(),
            billed_statuses: default_billed_statuses(),
            shipvoid: SourceSchema::shipvoid(),
            legacy: SourceSchema::legacy(),
            paths: PathsConfig::default(),
            facilities: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBucket {
    #[default]
    Day,
    Week,
    Month,
}

impl DateBucket {
    /// Bucket label for a date: `2024-01-05`, `2024-W01`, `2024-01`.
    pub fn label(&self, date: NaiveDate) -> String {
        match self {
            Self::Day => date.format("%Y-%m-%d").to_string(),
            Self::Week => {
                let week = date.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Month => date.format("%Y-%m").to_string(),
        }
    }
}

impl std::str::FromStr for DateBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown date bucket '{other}' (expected day, week or month)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupDimension {
    Facility,
    DateBucket,
}

// ---------------------------------------------------------------------------
// Source schema + key rule
// ---------------------------------------------------------------------------

/// How the canonical join key is derived for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRule {
    /// Concatenated in order, trimmed, no separator.
    pub columns: Vec<String>,
    /// Used when the header lacks any of `columns`.
    pub fallback_column: Option<String>,
    /// Append `|YYYY-MM-DD` of the record date. A re-used container id from a
    /// different day then never joins.
    pub include_date: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetConfig {
    pub name: String,
    pub origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub key: KeyRule,
    pub date_column: String,
    pub quantity_column: Option<String>,
    pub status_column: Option<String>,
    pub facility_column: Option<String>,
    pub cost_column: Option<String>,
    /// Worksheets holding reconciliation rows. Empty = first sheet.
    pub sheets: Vec<SheetConfig>,
}

impl SourceSchema {
    /// Shipvoid Forecast workbook: Inhouse + Crossdock sheets, container id
    /// built from Store + Div + Carton Number.
    pub fn shipvoid() -> Self {
        Self {
            key: KeyRule {
                columns: vec!["Store".into(), "Div".into(), "Carton Number".into()],
                fallback_column: Some("Container ID".into()),
                include_date: true,
            },
            date_column: "Label Date".into(),
            quantity_column: Some("Whpk".into()),
            status_column: Some("Status".into()),
            facility_column: None,
            cost_column: Some("Whpk Cost".into()),
            sheets: vec![
                SheetConfig {
                    name: "Inhouse Data".into(),
                    origin: Some("In House".into()),
                },
                SheetConfig {
                    name: "Crossdock Data".into(),
                    origin: Some("CrossDock".into()),
                },
            ],
        }
    }

    /// Legacy Unbilled Cartons CSV.
    pub fn legacy() -> Self {
        Self {
            key: KeyRule {
                columns: vec!["container_id".into()],
                fallback_column: None,
                include_date: true,
            },
            date_column: "container_create_date".into(),
            quantity_column: Some("quantity".into()),
            status_column: None,
            facility_column: None,
            cost_column: None,
            sheets: Vec::new(),
        }
    }

    /// Loader spec: required columns and worksheets.
    pub fn load_spec(&self) -> LoadSpec {
        LoadSpec {
            schema: TableSchema {
                required: vec![self.date_column.clone()],
                key_columns: self.key.columns.clone(),
                key_fallback: self.key.fallback_column.clone(),
            },
            sheets: self
                .sheets
                .iter()
                .map(|s| SheetSpec {
                    name: s.name.clone(),
                    origin: s.origin.clone(),
                })
                .collect(),
        }
    }
}

/// TOML shape of `[shipvoid]` / `[legacy]`: every field overrides the
/// built-in schema. An empty string clears an optional column.
#[derive(Debug, Default, Deserialize)]
struct SchemaOverrides {
    key_columns: Option<Vec<String>>,
    key_fallback: Option<String>,
    include_date: Option<bool>,
    date_column: Option<String>,
    quantity_column: Option<String>,
    status_column: Option<String>,
    facility_column: Option<String>,
    cost_column: Option<String>,
    sheets: Option<Vec<SheetOverride>>,
}

#[derive(Debug, Deserialize)]
struct SheetOverride {
    name: String,
    #[serde(default)]
    origin: Option<String>,
}

fn optional_column(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl SchemaOverrides {
    fn apply(self, mut schema: SourceSchema) -> SourceSchema {
        if let Some(columns) = self.key_columns {
            schema.key.columns = columns;
        }
        if let Some(fallback) = self.key_fallback {
            schema.key.fallback_column = optional_column(fallback);
        }
        if let Some(include_date) = self.include_date {
            schema.key.include_date = include_date;
        }
        if let Some(date) = self.date_column {
            schema.date_column = date;
        }
        if let Some(q) = self.quantity_column {
            schema.quantity_column = optional_column(q);
        }
        if let Some(s) = self.status_column {
            schema.status_column = optional_column(s);
        }
        if let Some(f) = self.facility_column {
            schema.facility_column = optional_column(f);
        }
        if let Some(c) = self.cost_column {
            schema.cost_column = optional_column(c);
        }
        if let Some(sheets) = self.sheets {
            schema.sheets = sheets
                .into_iter()
                .map(|s| SheetConfig {
                    name: s.name,
                    origin: s.origin,
                })
                .collect();
        }
        schema
    }
}

fn shipvoid_schema<'de, D: Deserializer<'de>>(d: D) -> Result<SourceSchema, D::Error> {
    Ok(SchemaOverrides::deserialize(d)?.apply(SourceSchema::shipvoid()))
}

fn legacy_schema<'de, D: Deserializer<'de>>(d: D) -> Result<SourceSchema, D::Error> {
    Ok(SchemaOverrides::deserialize(d)?.apply(SourceSchema::legacy()))
}

// ---------------------------------------------------------------------------
// Paths + facilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Directory holding Shipvoid extracts. Overrides the facility base path.
    #[serde(default)]
    pub shipvoid_dir: Option<PathBuf>,
    /// Directory holding Legacy extracts.
    #[serde(default)]
    pub legacy_dir: Option<PathBuf>,
    /// Where the retrieval collaborator deposits downloaded files.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_shipvoid_patterns")]
    pub shipvoid_patterns: Vec<String>,
    #[serde(default = "default_legacy_patterns")]
    pub legacy_patterns: Vec<String>,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_shipvoid_patterns() -> Vec<String> {
    vec!["Shipvoid*.xlsm".into(), "Shipvoid*.xlsx".into(), "Shipvoid*.xls".into()]
}

fn default_legacy_patterns() -> Vec<String> {
    vec!["Legacy*.csv".into()]
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            shipvoid_dir: None,
            legacy_dir: None,
            download_dir: default_download_dir(),
            shipvoid_patterns: default_shipvoid_patterns(),
            legacy_patterns: default_legacy_patterns(),
        }
    }
}

/// A distribution center whose Shipvoid extracts live on a share.
#[derive(Debug, Clone, Deserialize)]
pub struct FacilityConfig {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub base_path: PathBuf,
    /// Extracts are filed under `<base>/<YYYY>/<MON YYYY>`.
    #[serde(default)]
    pub monthly_folders: bool,
}

impl FacilityConfig {
    pub fn dir_for(&self, date: NaiveDate) -> PathBuf {
        if self.monthly_folders {
            let year = date.format("%Y").to_string();
            let month = date.format("%b %Y").to_string().to_uppercase();
            self.base_path.join(year).join(month)
        } else {
            self.base_path.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&input)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.facility.trim().is_empty() {
            return Err(ConfigError::Validation("facility must not be empty".into()));
        }

        for (label, schema) in [("shipvoid", &self.shipvoid), ("legacy", &self.legacy)] {
            if schema.key.columns.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{label}: key_columns must not be empty"
                )));
            }
            if schema.key.columns.iter().any(|c| c.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "{label}: key_columns contains a blank column name"
                )));
            }
            if schema.date_column.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{label}: date_column must not be empty"
                )));
            }
        }

        if self.shipvoid.sheets.is_empty() {
            return Err(ConfigError::Validation(
                "shipvoid: at least one sheet is required".into(),
            ));
        }

        for (i, dim) in self.group_by.iter().enumerate() {
            if self.group_by[..i].contains(dim) {
                return Err(ConfigError::Validation(format!(
                    "group_by lists {dim:?} more than once"
                )));
            }
        }

        if self.facility_filter.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "facility_filter contains a blank facility code".into(),
            ));
        }

        for (i, fac) in self.facilities.iter().enumerate() {
            if self.facilities[..i].iter().any(|f| f.code == fac.code) {
                return Err(ConfigError::Validation(format!(
                    "facility '{}' is configured more than once",
                    fac.code
                )));
            }
        }

        Ok(())
    }

    /// Whether the retrieval collaborator should be bypassed.
    pub fn bypass_retrieval(&self) -> bool {
        self.skip_download || self.local
    }

    /// Directory to search for Shipvoid extracts on `date`.
    pub fn shipvoid_dir(&self, date: NaiveDate) -> PathBuf {
        if let Some(dir) = &self.paths.shipvoid_dir {
            return dir.clone();
        }
        self.facilities
            .iter()
            .find(|f| f.code == self.facility)
            .map(|f| f.dir_for(date))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn legacy_dir(&self) -> PathBuf {
        self.paths.legacy_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn facility_in_scope(&self, facility: &str) -> bool {
        self.facility_filter.is_empty() || self.facility_filter.iter().any(|f| f == facility)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
