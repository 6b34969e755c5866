//! HTTP Archive (HAR) input.
//!
//! A capture has no metadata about parameters, so only query parameters are
//! recovered (typed `mixed`, nullable). Requests outside the API path marker
//! are dropped, and repeated `(method, path)` pairs collapse into one endpoint.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Result, SdkGenError};
use crate::model::{ApiSpecification, BaseUrl, Endpoint, HttpMethod, ParamType, Parameter};

use super::{InputFormat, Parser};

/// Default substring identifying API requests in a capture.
pub const DEFAULT_API_MARKER: &str = "/api/";

#[derive(Debug, Clone, Deserialize)]
struct Archive {
    log: Option<Log>,
}

#[derive(Debug, Clone, Deserialize)]
struct Log {
    entries: Option<Vec<Entry>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Entry {
    request: Request,
}

#[derive(Debug, Clone, Deserialize)]
struct Request {
    method: String,
    url: String,
}

/// Parser for HAR captures.
#[derive(Debug, Clone)]
pub struct HarParser {
    archive: Archive,
    api_marker: String,
}

impl HarParser {
    /// Decode a HAR document.
    pub fn from_source(source: &str) -> Result<Self> {
        let archive = serde_json::from_str(source)
            .map_err(|e| SdkGenError::malformed("<document>", format!("invalid HAR JSON: {e}")))?;
        Ok(Self {
            archive,
            api_marker: DEFAULT_API_MARKER.to_string(),
        })
    }

    /// Keep only requests whose URL contains `marker`.
    pub fn with_api_marker(mut self, marker: impl Into<String>) -> Self {
        self.api_marker = marker.into();
        self
    }
}

impl Parser for HarParser {
    fn format(&self) -> InputFormat {
        InputFormat::Har
    }

    fn parse(&self) -> Result<ApiSpecification> {
        let entries = self
            .archive
            .log
            .as_ref()
            .ok_or_else(|| SdkGenError::malformed("log", "archive has no log object"))?
            .entries
            .as_ref()
            .ok_or_else(|| SdkGenError::malformed("log.entries", "archive has no entries"))?;

        let mut endpoints: Vec<Endpoint> = Vec::new();
        let mut seen: HashMap<(HttpMethod, String), usize> = HashMap::new();
        let mut base_url = None;

        for (index, entry) in entries.iter().enumerate() {
            let raw = &entry.request.url;
            if !raw.contains(&self.api_marker) {
                continue;
            }
            let location = format!("log.entries[{index}].request.url");
            let url = Url::parse(raw)
                .map_err(|e| SdkGenError::malformed(location, format!("invalid URL '{raw}': {e}")))?;
            let method = entry.request.method.parse::<HttpMethod>()?;
            let path = url.path().to_string();

            if base_url.is_none() {
                base_url = Some(url.origin().ascii_serialization());
            }

            let query: Vec<Parameter> = url
                .query_pairs()
                .map(|(name, _)| Parameter::new(name.into_owned(), ParamType::Mixed).nullable(true))
                .collect();

            if let Some(&existing) = seen.get(&(method, path.clone())) {
                let endpoint = &mut endpoints[existing];
                for parameter in query {
                    if !endpoint.query_parameters.iter().any(|p| p.name == parameter.name) {
                        endpoint.query_parameters.push(parameter);
                    }
                }
                continue;
            }

            let mut endpoint = Endpoint::new(String::new(), method, &path);
            endpoint.name = endpoint.fallback_name();
            for parameter in query {
                if !endpoint.query_parameters.iter().any(|p| p.name == parameter.name) {
                    endpoint.query_parameters.push(parameter);
                }
            }
            seen.insert((method, path), endpoints.len());
            endpoints.push(endpoint);
        }

        debug!(entries = entries.len(), endpoints = endpoints.len(), "Parsed HAR capture.");

        Ok(ApiSpecification {
            base_url: BaseUrl {
                url: base_url.unwrap_or_default(),
                parameters: Vec::new(),
            },
            endpoints,
            ..ApiSpecification::default()
        })
    }
}
