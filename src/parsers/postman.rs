//! Postman Collection v2.1 input.
//!
//! Folders become collections, except folders whose name contains `{` or `}`:
//! those group requests by path variable and are walked without being pushed
//! onto the collection stack.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::error::{Result, SdkGenError};
use crate::model::{ApiSpecification, BaseUrl, Endpoint, HttpMethod, ParamType, Parameter};

use super::inference::body_parameters;
use super::{InputFormat, Parser, ensure_path_parameters, is_literal_default};

/// Collection variables tried, in order, for the base URL.
const BASE_URL_VARIABLES: &[&str] = &["baseUrl", "base_url", "url"];

#[derive(Debug, Clone, Deserialize)]
struct Collection {
    info: Option<Info>,
    item: Option<Vec<Value>>,
    #[serde(default)]
    variable: Vec<Variable>,
}

#[derive(Debug, Clone, Deserialize)]
struct Info {
    name: Option<String>,
    description: Option<Description>,
}

/// A folder (`ItemGroup`). Children stay raw so each one is decoded with
/// its own location.
#[derive(Debug, Clone, Deserialize)]
struct Folder {
    #[serde(default)]
    name: String,
    item: Vec<Value>,
}

/// A request (`Item`).
#[derive(Debug, Clone, Deserialize)]
struct Item {
    #[serde(default)]
    name: String,
    request: RequestSpec,
    description: Option<Description>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RequestSpec {
    Url(String),
    Full(Box<Request>),
}

#[derive(Debug, Clone, Deserialize)]
struct Request {
    #[serde(default = "default_method")]
    method: String,
    url: Option<UrlSpec>,
    #[serde(default)]
    header: Vec<KeyValue>,
    body: Option<Body>,
    description: Option<Description>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum UrlSpec {
    Raw(String),
    Structured(Url),
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Url {
    raw: Option<String>,
    #[serde(default)]
    path: PathSpec,
    #[serde(default)]
    query: Vec<KeyValue>,
    #[serde(default)]
    variable: Vec<Variable>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PathSpec {
    Joined(String),
    Segments(Vec<Value>),
}

impl Default for PathSpec {
    fn default() -> Self {
        PathSpec::Segments(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct KeyValue {
    key: Option<String>,
    value: Option<Value>,
    description: Option<Description>,
}

#[derive(Debug, Clone, Deserialize)]
struct Variable {
    key: Option<String>,
    value: Option<Value>,
    description: Option<Description>,
}

#[derive(Debug, Clone, Deserialize)]
struct Body {
    mode: Option<String>,
    raw: Option<String>,
    #[serde(default)]
    urlencoded: Vec<KeyValue>,
    #[serde(default)]
    formdata: Vec<KeyValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Description {
    Text(String),
    Object { content: Option<String> },
}

impl Description {
    fn text(&self) -> Option<String> {
        match self {
            Description::Text(text) => Some(text.clone()),
            Description::Object { content } => content.clone(),
        }
    }
}

/// Parser for Postman Collection v2.1 JSON.
#[derive(Debug, Clone)]
pub struct PostmanParser {
    collection: Value,
}

impl PostmanParser {
    /// Decode a collection document.
    pub fn from_source(source: &str) -> Result<Self> {
        let collection = serde_json::from_str(source).map_err(|e| {
            SdkGenError::malformed("<document>", format!("invalid Postman JSON: {e}"))
        })?;
        Ok(Self { collection })
    }
}

impl Parser for PostmanParser {
    fn format(&self) -> InputFormat {
        InputFormat::Postman
    }

    fn parse(&self) -> Result<ApiSpecification> {
        let collection: Collection = serde_json::from_value(self.collection.clone())
            .map_err(|e| SdkGenError::malformed("<document>", e.to_string()))?;
        let info = collection
            .info
            .as_ref()
            .ok_or_else(|| SdkGenError::malformed("info", "collection has no info object"))?;
        let name = info
            .name
            .clone()
            .ok_or_else(|| SdkGenError::malformed("info.name", "collection has no name"))?;
        let items = collection
            .item
            .as_ref()
            .ok_or_else(|| SdkGenError::malformed("item", "collection has no items"))?;

        let mut walker = Walker::default();
        walker.walk(items, "item")?;
        debug!(collection = %name, endpoints = walker.endpoints.len(), "Parsed Postman collection.");

        Ok(ApiSpecification {
            name: Some(name),
            description: info.description.as_ref().and_then(Description::text),
            base_url: base_url(&collection.variable),
            endpoints: walker.endpoints,
            ..ApiSpecification::default()
        })
    }
}

fn base_url(variables: &[Variable]) -> BaseUrl {
    let url = BASE_URL_VARIABLES
        .iter()
        .find_map(|wanted| {
            variables
                .iter()
                .find(|v| v.key.as_deref() == Some(*wanted))
                .and_then(|v| v.value.as_ref())
                .and_then(Value::as_str)
        })
        .unwrap_or_default();
    BaseUrl {
        url: url.to_string(),
        parameters: Vec::new(),
    }
}

/// Depth-first walk keeping the active collection stack.
#[derive(Debug, Default)]
struct Walker {
    stack: Vec<String>,
    endpoints: Vec<Endpoint>,
}

impl Walker {
    /// Walk the nodes under `location`, e.g. `item[2].item`.
    fn walk(&mut self, nodes: &[Value], location: &str) -> Result<()> {
        for (index, node) in nodes.iter().enumerate() {
            let location = format!("{location}[{index}]");
            if node.get("item").is_some() {
                let folder: Folder = decode_node(node, &location)?;
                let grouping = !folder.name.contains('{') && !folder.name.contains('}');
                if grouping {
                    self.stack.push(folder.name.clone());
                }
                self.walk(&folder.item, &format!("{location}.item"))?;
                if grouping {
                    self.stack.pop();
                }
            } else {
                let item: Item = decode_node(node, &location)?;
                let mut endpoint = convert_item(&item.name, &item.request, item.description.as_ref())?;
                endpoint.collection = self.stack.last().cloned();
                self.endpoints.push(endpoint);
            }
        }
        Ok(())
    }
}

fn decode_node<T: serde::de::DeserializeOwned>(node: &Value, location: &str) -> Result<T> {
    T::deserialize(node).map_err(|e| {
        let reason = match node.get("name").and_then(Value::as_str) {
            Some(name) => format!("'{name}': {e}"),
            None => e.to_string(),
        };
        SdkGenError::malformed(location, reason)
    })
}

fn convert_item(name: &str, request: &RequestSpec, description: Option<&Description>) -> Result<Endpoint> {
    let from_string;
    let request = match request {
        RequestSpec::Url(raw) => {
            from_string = Request {
                method: default_method(),
                url: Some(UrlSpec::Raw(raw.clone())),
                header: Vec::new(),
                body: None,
                description: None,
            };
            &from_string
        }
        RequestSpec::Full(request) => request,
    };

    let method = request.method.parse::<HttpMethod>()?;
    let mut url = match &request.url {
        Some(UrlSpec::Structured(url)) => url.clone(),
        Some(UrlSpec::Raw(raw)) => Url {
            raw: Some(raw.clone()),
            ..Url::default()
        },
        None => Url::default(),
    };
    if url.query.is_empty()
        && let Some(raw) = &url.raw
    {
        url.query = raw_query(raw);
    }

    let mut endpoint = Endpoint::new(name, method, &url_path(&url));
    endpoint.description = request
        .description
        .as_ref()
        .or(description)
        .and_then(Description::text)
        .filter(|d| !d.trim().is_empty());

    endpoint.path_parameters = url
        .variable
        .iter()
        .filter_map(|variable| {
            let key = variable.key.clone()?;
            let param = Parameter::new(key, ParamType::String)
                .with_description(variable.description.as_ref().and_then(Description::text));
            Some(param)
        })
        .collect();

    endpoint.query_parameters = url
        .query
        .iter()
        .filter_map(|entry| {
            let key = entry.key.clone()?;
            let default = entry.value.clone().filter(is_literal_default);
            Some(
                Parameter::new(key, ParamType::String)
                    .nullable(true)
                    .with_description(entry.description.as_ref().and_then(Description::text))
                    .with_default(default),
            )
        })
        .collect();

    // Disabled headers are kept.
    endpoint.header_parameters = request
        .header
        .iter()
        .filter_map(|entry| {
            let key = entry.key.clone()?;
            Some(
                Parameter::new(key, ParamType::String)
                    .nullable(true)
                    .with_description(entry.description.as_ref().and_then(Description::text)),
            )
        })
        .collect();

    if let Some(body) = &request.body {
        endpoint.body_parameters = convert_body(body, &endpoint.location());
    }

    ensure_path_parameters(&mut endpoint);
    Ok(endpoint)
}

fn convert_body(body: &Body, location: &str) -> Vec<Parameter> {
    match body.mode.as_deref() {
        Some("urlencoded") => form_parameters(&body.urlencoded),
        Some("formdata") => form_parameters(&body.formdata),
        _ => {
            let Some(raw) = body.raw.as_deref().filter(|r| !r.trim().is_empty()) else {
                return Vec::new();
            };
            match serde_json::from_str::<Value>(raw) {
                Ok(value) => body_parameters(&value),
                Err(e) => {
                    debug!(endpoint = %location, error = %e, "Raw body is not JSON; no body parameters.");
                    Vec::new()
                }
            }
        }
    }
}

fn form_parameters(fields: &[KeyValue]) -> Vec<Parameter> {
    fields
        .iter()
        .filter_map(|field| {
            let key = field.key.clone()?;
            Some(Parameter::new(key, ParamType::String).nullable(true))
        })
        .collect()
}

/// Path of a structured URL; `{{var}}` segments become placeholders.
fn url_path(url: &Url) -> String {
    let segments: Vec<String> = match &url.path {
        PathSpec::Segments(segments) if !segments.is_empty() => segments
            .iter()
            .filter_map(|segment| match segment {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => map.get("value").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        PathSpec::Joined(joined) => joined.split('/').map(str::to_string).collect(),
        PathSpec::Segments(_) => {
            return url.raw.as_deref().map(raw_path).unwrap_or_default();
        }
    };
    let segments: Vec<String> = segments.iter().map(|s| variable_segment(s)).collect();
    format!("/{}", segments.join("/"))
}

/// Path of a raw URL such as `{{baseUrl}}/users/:id?x=1`.
fn raw_path(raw: &str) -> String {
    let without_query = raw.split(['?', '#']).next().unwrap_or_default();
    let without_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    // The first segment is the host or the base URL variable.
    let path: Vec<String> = without_scheme
        .split('/')
        .skip(1)
        .map(variable_segment)
        .collect();
    format!("/{}", path.join("/"))
}

/// Query entries of a raw URL such as `{{baseUrl}}/orders?page=1&sort=<string>`.
fn raw_query(raw: &str) -> Vec<KeyValue> {
    let Some((_, query)) = raw.split_once('?') else {
        return Vec::new();
    };
    let query = query.split('#').next().unwrap_or_default();
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| KeyValue {
            key: Some(key.into_owned()),
            value: Some(Value::String(value.into_owned())),
            description: None,
        })
        .collect()
}

fn variable_segment(segment: &str) -> String {
    match segment
        .strip_prefix("{{")
        .and_then(|s| s.strip_suffix("}}"))
    {
        Some(name) if !name.is_empty() => format!(":{name}"),
        _ => segment.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::PathSegment;

    fn parse(json: &str) -> Result<ApiSpecification> {
        PostmanParser::from_source(json)?.parse()
    }

    #[test]
    fn test_single_request() {
        let api = parse(
            r##"{
            "info": {"name": "Shop", "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"},
            "variable": [{"key": "baseUrl", "value": "https://api.shop.test"}],
            "item": [{
                "name": "Get order",
                "request": {
                    "method": "GET",
                    "header": [{"key": "X-Tenant", "value": "acme", "disabled": true}],
                    "url": {
                        "raw": "{{baseUrl}}/orders/:order_id?expand=<string>",
                        "host": ["{{baseUrl}}"],
                        "path": ["orders", ":order_id"],
                        "query": [{"key": "expand", "value": "<string>"}],
                        "variable": [{"key": "order_id", "value": "", "description": "Order identifier"}]
                    }
                }
            }]
        }"##,
        )
        .unwrap();

        assert_eq!(api.name.as_deref(), Some("Shop"));
        assert_eq!(api.base_url.url, "https://api.shop.test");
        assert_eq!(api.endpoints.len(), 1);

        let endpoint = &api.endpoints[0];
        assert_eq!(endpoint.method, HttpMethod::Get);
        assert_eq!(
            endpoint.path_segments,
            vec![
                PathSegment::Literal("orders".into()),
                PathSegment::Placeholder("order_id".into())
            ]
        );
        assert_eq!(endpoint.path_parameters.len(), 1);
        assert_eq!(
            endpoint.path_parameters[0].description.as_deref(),
            Some("Order identifier")
        );
        assert_eq!(endpoint.query_parameters[0].name, "expand");
        assert_eq!(endpoint.query_parameters[0].default, None);
        assert_eq!(endpoint.header_parameters[0].name, "X-Tenant");
        assert!(endpoint.collection.is_none());
    }

    #[test]
    fn test_folders_set_collection_except_variable_folders() {
        let api = parse(
            r##"{
            "info": {"name": "Shop"},
            "item": [{
                "name": "Orders",
                "item": [
                    {"name": "List orders", "request": {"method": "GET", "url": {"path": ["orders"]}}},
                    {"name": "{orderId}", "item": [
                        {"name": "Delete order", "request": {"method": "DELETE", "url": {"path": ["orders", ":orderId"]}}}
                    ]}
                ]
            }, {
                "name": "Ping", "request": "https://api.shop.test/ping"
            }]
        }"##,
        )
        .unwrap();

        let collections: Vec<_> = api.endpoints.iter().map(|e| e.collection.as_deref()).collect();
        assert_eq!(collections, vec![Some("Orders"), Some("Orders"), None]);
        assert_eq!(api.endpoints[1].path_parameters[0].name, "orderId");
        assert_eq!(api.endpoints[2].path(), "/ping");
    }

    #[test]
    fn test_raw_json_body_is_inferred() {
        let api = parse(
            r##"{
            "info": {"name": "Shop"},
            "item": [{"name": "Create order", "request": {
                "method": "POST",
                "url": "{{baseUrl}}/orders",
                "body": {"mode": "raw", "raw": "{\"sku\": \"<string>\", \"quantity\": 2, \"note\": \"<string,null>\"}"}
            }}]
        }"##,
        )
        .unwrap();

        let body = &api.endpoints[0].body_parameters;
        let names: Vec<_> = body.iter().map(|p| (p.name.as_str(), p.ty.clone(), p.nullable)).collect();
        assert_eq!(
            names,
            vec![
                ("sku", ParamType::String, false),
                ("quantity", ParamType::Int, false),
                ("note", ParamType::String, true),
            ]
        );
        assert_eq!(api.endpoints[0].path(), "/orders");
    }

    #[test]
    fn test_missing_items_is_malformed() {
        let err = parse(r#"{"info": {"name": "Shop"}}"#).unwrap_err();
        assert!(matches!(err, SdkGenError::MalformedSpecification { ref location, .. } if location == "item"));
    }

    #[test]
    fn test_broken_nested_item_reports_its_location() {
        let err = parse(
            r##"{
            "info": {"name": "Shop"},
            "item": [
                {"name": "Ping", "request": "https://api.shop.test/ping"},
                {"name": "Orders", "item": [
                    {"name": "List orders", "request": {"method": "GET", "url": {"path": ["orders"]}}},
                    {"name": "Broken order", "request": {"method": "GET", "url": 42}}
                ]}
            ]
        }"##,
        )
        .unwrap_err();

        match err {
            SdkGenError::MalformedSpecification { location, reason } => {
                assert_eq!(location, "item[1].item[1]");
                assert!(reason.contains("Broken order"));
            }
            other => unreachable!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_string_urls_keep_their_query() {
        let api = parse(
            r##"{
            "info": {"name": "Shop"},
            "item": [
                {"name": "Search", "request": "{{baseUrl}}/search?q=<string>&limit=20"},
                {"name": "List orders", "request": {"method": "GET", "url": "{{baseUrl}}/orders?page=1"}}
            ]
        }"##,
        )
        .unwrap();

        let search = &api.endpoints[0];
        assert_eq!(search.path(), "/search");
        let query: Vec<_> = search
            .query_parameters
            .iter()
            .map(|p| (p.name.as_str(), p.default.clone()))
            .collect();
        assert_eq!(query, vec![("q", None), ("limit", Some(Value::from("20")))]);

        assert_eq!(api.endpoints[1].query_parameters[0].name, "page");
    }

    #[test]
    fn test_variable_segments_become_placeholders() {
        assert_eq!(raw_path("{{baseUrl}}/users/{{userId}}?x=1"), "/users/:userId");
        assert_eq!(raw_path("https://host.test/a/b"), "/a/b");
    }
}
