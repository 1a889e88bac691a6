//! Table and store configuration.
//!
//! Supports TOML config files, environment variable overrides, and defaults.

use crate::error::ResultMessage;
use crate::error::SheetOrmError;
use crate::store::ValueInputOption;
use serde::Deserialize;
use serde::Serialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors related to configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },

    #[error("Missing required setting '{0}'")]
    MissingValue(&'static str),
}

/// Where the table lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Sent as the HTTP user agent (default: "sheet_orm")
    pub application_name: String,
    /// Spreadsheet ID, found in the sheet URL after "/d/"
    pub spreadsheet_id: String,
    /// Tab holding the table (default: "Sheet1")
    pub sheet_name: String,
    /// Base URL of the Sheets API (default: "https://sheets.googleapis.com/v4/")
    pub endpoint: String,
    /// Bearer token; when absent it is read from `token_env`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Environment variable holding the bearer token (default: "SHEET_ORM_ACCESS_TOKEN")
    pub token_env: String,
    /// How the header row is written (default: RAW)
    pub header_input_option: ValueInputOption,
    /// How saved rows are written (default: USER_ENTERED)
    pub save_input_option: ValueInputOption,
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            application_name: "sheet_orm".to_owned(),
            spreadsheet_id: String::new(),
            sheet_name: "Sheet1".to_owned(),
            endpoint: "https://sheets.googleapis.com/v4/".to_owned(),
            access_token: None,
            token_env: "SHEET_ORM_ACCESS_TOKEN".to_owned(),
            header_input_option: ValueInputOption::Raw,
            save_input_option: ValueInputOption::UserEntered,
            timeout_secs: 30,
        }
    }
}

impl SheetConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SheetOrmError> {
        let path = path.as_ref();
        let prefix = format!("Failed to read config file '{}'", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(SheetOrmError::from)
            .with_prefix(&prefix)?;
        Self::from_toml(&content).with_prefix(&prefix)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SheetOrmError> {
        Ok(toml::from_str(toml_str).map_err(ConfigError::from)?)
    }

    /// Saves the configuration to a TOML file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), SheetOrmError> {
        let toml = toml::to_string_pretty(self).map_err(ConfigError::from)?;
        std::fs::write(path.as_ref(), toml)?;
        Ok(())
    }

    /// Applies environment variable overrides.
    /// Environment variables are prefixed with `SHEET_ORM_`.
    /// Example: `SHEET_ORM_SHEET_NAME=Pets` overrides `sheet_name`.
    pub fn apply_env_overrides(&mut self) -> Result<(), SheetOrmError> {
        if let Ok(val) = env::var("SHEET_ORM_APPLICATION_NAME") {
            self.application_name = val;
        }
        if let Ok(val) = env::var("SHEET_ORM_SPREADSHEET_ID") {
            self.spreadsheet_id = val;
        }
        if let Ok(val) = env::var("SHEET_ORM_SHEET_NAME") {
            self.sheet_name = val;
        }
        if let Ok(val) = env::var("SHEET_ORM_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = env::var("SHEET_ORM_ACCESS_TOKEN") {
            self.access_token = Some(val);
        }
        if let Ok(val) = env::var("SHEET_ORM_SAVE_INPUT_OPTION") {
            self.save_input_option = parse_input_option("save_input_option", &val)?;
        }
        if let Ok(val) = env::var("SHEET_ORM_TIMEOUT_SECS") {
            self.timeout_secs = val.parse().map_err(|_| ConfigError::InvalidValue {
                name: "timeout_secs".to_owned(),
                value: val.to_owned(),
            })?;
        }
        Ok(())
    }

    /// Rejects settings no store call can succeed with.
    pub fn validate(&self) -> Result<(), SheetOrmError> {
        if self.spreadsheet_id.trim().is_empty() {
            Err(ConfigError::MissingValue("spreadsheet_id"))?;
        }
        if self.sheet_name.trim().is_empty() {
            Err(ConfigError::MissingValue("sheet_name"))?;
        }
        if self.timeout_secs == 0 {
            Err(ConfigError::InvalidValue {
                name: "timeout_secs".to_owned(),
                value: "0".to_owned(),
            })?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_input_option(name: &str, value: &str) -> Result<ValueInputOption, ConfigError> {
    match value.to_ascii_uppercase().as_str() {
        "RAW" => Ok(ValueInputOption::Raw),
        "USER_ENTERED" => Ok(ValueInputOption::UserEntered),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_owned(),
            value: value.to_owned(),
        }),
    }
}
