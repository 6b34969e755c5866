//! Generator configuration.
//!
//! Loaded from JSON or TOML with camelCase keys. Unknown keys are logged and
//! kept aside; missing required keys fail before any input is parsed.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, SdkGenError};
use crate::naming::studly_case;

const REQUIRED_KEYS: &[&str] = &["connectorName", "namespace"];

/// Base classes generated directly under the root namespace.
const BASE_CLASS_NAMES: &[&str] = &["Dto", "Resource"];

/// Configuration consumed by the generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Class name of the generated connector.
    pub connector_name: String,

    /// Root namespace of every generated artifact.
    pub namespace: String,

    #[serde(default = "default_resource_suffix")]
    pub resource_namespace_suffix: String,

    #[serde(default = "default_request_suffix")]
    pub request_namespace_suffix: String,

    #[serde(default = "default_dto_suffix")]
    pub dto_namespace_suffix: String,

    #[serde(default = "default_response_suffix")]
    pub response_namespace_suffix: String,

    /// Collection assigned to endpoints without one.
    #[serde(default = "default_fallback_resource")]
    pub fallback_resource_name: String,

    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Overwrite existing files instead of skipping them.
    #[serde(default)]
    pub force: bool,

    #[serde(default)]
    pub ignored_query_params: Vec<String>,

    #[serde(default)]
    pub ignored_body_params: Vec<String>,

    #[serde(default)]
    pub ignored_header_params: Vec<String>,

    /// Free-form settings for downstream tooling.
    #[serde(default)]
    pub extra: IndexMap<String, Value>,

    #[serde(flatten, skip_serializing)]
    unknown: BTreeMap<String, Value>,
}

fn default_resource_suffix() -> String {
    "Resource".to_string()
}

fn default_request_suffix() -> String {
    "Requests".to_string()
}

fn default_dto_suffix() -> String {
    "Dto".to_string()
}

fn default_response_suffix() -> String {
    "Responses".to_string()
}

fn default_fallback_resource() -> String {
    "Misc".to_string()
}

fn default_output_dir() -> String {
    "build".to_string()
}

impl Config {
    /// Create a configuration with defaults for everything but the required keys.
    pub fn new(connector_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            connector_name: connector_name.into(),
            namespace: namespace.into(),
            resource_namespace_suffix: default_resource_suffix(),
            request_namespace_suffix: default_request_suffix(),
            dto_namespace_suffix: default_dto_suffix(),
            response_namespace_suffix: default_response_suffix(),
            fallback_resource_name: default_fallback_resource(),
            output_dir: default_output_dir(),
            force: false,
            ignored_query_params: Vec::new(),
            ignored_body_params: Vec::new(),
            ignored_header_params: Vec::new(),
            extra: IndexMap::new(),
            unknown: BTreeMap::new(),
        }
    }

    /// Build a configuration from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = &value else {
            return Err(SdkGenError::config("<root>", "configuration must be a map"));
        };
        for key in REQUIRED_KEYS {
            if !map.contains_key(*key) {
                return Err(SdkGenError::config(*key, "required key is missing"));
            }
        }

        let config: Config = serde_json::from_value(value)
            .map_err(|e| SdkGenError::config("<root>", e.to_string()))?;
        config.validate()?;
        for key in config.unknown.keys() {
            warn!(key = %key, "Ignoring unknown configuration key.");
        }
        Ok(config)
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| SdkGenError::config("<root>", format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Parse a TOML configuration document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: toml::Table = source
            .parse()
            .map_err(|e| SdkGenError::config("<root>", format!("invalid TOML: {e}")))?;
        let value = serde_json::to_value(table)
            .map_err(|e| SdkGenError::config("<root>", e.to_string()))?;
        Self::from_value(value)
    }

    /// Reject values the generators cannot honour.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.connector_name.trim().is_empty() {
            return Err(SdkGenError::config("connectorName", "must not be empty"));
        }
        let connector = studly_case(&self.connector_name);
        if BASE_CLASS_NAMES.contains(&connector.as_str()) {
            return Err(SdkGenError::config(
                "connectorName",
                format!("'{connector}' is the name of a generated base class"),
            ));
        }
        if self.namespace.trim().is_empty() {
            return Err(SdkGenError::config("namespace", "must not be empty"));
        }
        Ok(())
    }

    /// Keys present in the source document that this configuration does not know.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &str> {
        self.unknown.keys().map(String::as_str)
    }

    /// Root namespace without leading/trailing separators.
    pub fn namespace(&self) -> String {
        self.namespace.trim_matches('\\').to_string()
    }

    pub fn resource_namespace(&self) -> String {
        self.sub_namespace(&self.resource_namespace_suffix)
    }

    pub fn request_namespace(&self) -> String {
        self.sub_namespace(&self.request_namespace_suffix)
    }

    pub fn dto_namespace(&self) -> String {
        self.sub_namespace(&self.dto_namespace_suffix)
    }

    pub fn response_namespace(&self) -> String {
        self.sub_namespace(&self.response_namespace_suffix)
    }

    pub fn is_ignored_query(&self, name: &str) -> bool {
        self.ignored_query_params.iter().any(|p| p == name)
    }

    pub fn is_ignored_body(&self, name: &str) -> bool {
        self.ignored_body_params.iter().any(|p| p == name)
    }

    pub fn is_ignored_header(&self, name: &str) -> bool {
        self.ignored_header_params
            .iter()
            .any(|p| p.eq_ignore_ascii_case(name))
    }

    fn sub_namespace(&self, suffix: &str) -> String {
        let suffix = suffix.trim_matches('\\');
        if suffix.is_empty() {
            self.namespace()
        } else {
            format!("{}\\{}", self.namespace(), suffix)
        }
    }
}
