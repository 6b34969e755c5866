//! OpenAPI specification structs for serde deserialization.
//!
//! This module defines the subset of OpenAPI 3.x needed to build the API
//! model. Maps are [`IndexMap`]s so document order survives into the
//! generated code.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkGenError};

/// Prefix of local schema references.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Prefix of local parameter references.
pub const PARAMETER_REF_PREFIX: &str = "#/components/parameters/";

/// Root OpenAPI document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenApiDocument {
    #[serde(default)]
    pub openapi: Option<String>,
    pub info: Option<Info>,
    #[serde(default)]
    pub servers: Vec<Server>,
    pub paths: Option<IndexMap<String, PathItem>>,
    #[serde(default)]
    pub components: Components,
    #[serde(default)]
    pub security: Vec<IndexMap<String, Vec<String>>>,
}

/// API metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Info {
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
}

/// Server entry with URL template variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub variables: IndexMap<String, ServerVariable>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerVariable {
    pub default: Option<String>,
    pub description: Option<String>,
}

/// Components section containing reusable schemas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(default)]
    pub security_schemes: IndexMap<String, SecuritySchemeObject>,
}

/// A path item containing operations for different HTTP methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
    /// Path-level parameters shared by all operations.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    /// Operations in declaration order of the OpenAPI path item object.
    pub fn operations(&self) -> Vec<(&'static str, &Operation)> {
        [
            ("GET", self.get.as_ref()),
            ("PUT", self.put.as_ref()),
            ("POST", self.post.as_ref()),
            ("DELETE", self.delete.as_ref()),
            ("OPTIONS", self.options.as_ref()),
            ("HEAD", self.head.as_ref()),
            ("PATCH", self.patch.as_ref()),
            ("TRACE", self.trace.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.map(|op| (method, op)))
        .collect()
    }

    pub(crate) fn operations_mut(&mut self) -> Vec<(&'static str, &mut Operation)> {
        [
            ("GET", self.get.as_mut()),
            ("PUT", self.put.as_mut()),
            ("POST", self.post.as_mut()),
            ("DELETE", self.delete.as_mut()),
            ("OPTIONS", self.options.as_mut()),
            ("HEAD", self.head.as_mut()),
            ("PATCH", self.patch.as_mut()),
            ("TRACE", self.trace.as_mut()),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.map(|op| (method, op)))
        .collect()
    }
}

/// An API operation (endpoint).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
}

/// A parameter (query, path, header or cookie), or a reference to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "in", default)]
    pub location: String,
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub schema: Option<Schema>,
}

/// A request body definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBody {
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// A response definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Media type content (e.g., application/json).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Option<Schema>,
}

/// Pick the JSON media type of a content map, falling back to the first entry.
pub fn json_media_type(content: &IndexMap<String, MediaType>) -> Option<&MediaType> {
    content
        .iter()
        .find(|(mime, _)| is_json_mime(mime))
        .or_else(|| content.first())
        .map(|(_, media)| media)
}

pub(crate) fn json_media_type_mut(
    content: &mut IndexMap<String, MediaType>,
) -> Option<&mut MediaType> {
    let index = content
        .keys()
        .position(|mime| is_json_mime(mime))
        .or(if content.is_empty() { None } else { Some(0) })?;
    content.get_index_mut(index).map(|(_, media)| media)
}

fn is_json_mime(mime: &str) -> bool {
    mime == "application/json" || mime.ends_with("+json")
}

/// Security scheme object, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecuritySchemeObject {
    #[serde(rename = "apiKey")]
    ApiKey {
        name: String,
        #[serde(rename = "in")]
        location: String,
        description: Option<String>,
    },
    #[serde(rename = "http")]
    Http {
        scheme: String,
        #[serde(rename = "bearerFormat")]
        bearer_format: Option<String>,
        description: Option<String>,
    },
    #[serde(rename = "oauth2")]
    OAuth2 {
        #[serde(default)]
        flows: IndexMap<String, OAuthFlowObject>,
        description: Option<String>,
    },
    #[serde(rename = "openIdConnect")]
    OpenIdConnect {
        #[serde(rename = "openIdConnectUrl")]
        open_id_connect_url: String,
        description: Option<String>,
    },
    #[serde(rename = "mutualTLS")]
    MutualTls { description: Option<String> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlowObject {
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
    #[serde(default)]
    pub scopes: IndexMap<String, String>,
}

/// Where a hoisted schema came from; recorded as a vendor extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaOrigin {
    Request,
    Response,
}

/// JSON Schema definition used in OpenAPI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// The type of the schema (string, number, integer, boolean, object, array).
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,

    /// Reference to another schema.
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    pub title: Option<String>,

    pub description: Option<String>,

    /// Properties for object types.
    pub properties: Option<IndexMap<String, Schema>>,

    /// Required property names for object types.
    pub required: Option<Vec<String>>,

    /// Item schema for array types.
    pub items: Option<Box<Schema>>,

    /// Intersection type (all of these schemas combined).
    pub all_of: Option<Vec<Schema>>,

    /// Format hint (e.g., date-time, int64, double).
    pub format: Option<String>,

    /// OpenAPI 3.0 nullable flag (3.1 uses type arrays instead).
    pub nullable: Option<bool>,

    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<serde_json::Value>>,

    pub default: Option<serde_json::Value>,

    /// Set by the normalizer on schemas hoisted out of operation bodies.
    #[serde(rename = "x-sdk-origin")]
    pub origin: Option<SchemaOrigin>,
}

/// Schema type can be a single type or an array of types (for nullable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

impl OpenApiDocument {
    /// Parse an OpenAPI document from JSON or YAML text.
    pub fn parse(source: &str) -> Result<Self> {
        if source.trim_start().starts_with('{') {
            serde_json::from_str(source).map_err(|e| {
                SdkGenError::malformed("<document>", format!("invalid OpenAPI JSON: {e}"))
            })
        } else {
            serde_yaml::from_str(source).map_err(|e| {
                SdkGenError::malformed("<document>", format!("invalid OpenAPI YAML: {e}"))
            })
        }
    }
}

impl Schema {
    /// Build a `$ref` schema pointing at a component schema.
    pub fn reference(name: &str) -> Self {
        Self {
            ref_path: Some(format!("{SCHEMA_REF_PREFIX}{name}")),
            ..Self::default()
        }
    }

    /// Name of the referenced component schema, if this is a local `$ref`.
    pub fn ref_name(&self) -> Option<&str> {
        self.ref_path
            .as_deref()
            .map(|r| r.strip_prefix(SCHEMA_REF_PREFIX).unwrap_or(r))
    }

    /// First non-null type name.
    pub fn primary_type(&self) -> Option<&str> {
        match &self.schema_type {
            Some(SchemaType::Single(t)) => Some(t.as_str()),
            Some(SchemaType::Multiple(types)) => {
                types.iter().map(String::as_str).find(|t| *t != "null")
            }
            None => None,
        }
    }

    /// Check if this schema is nullable (nullable flag or null in a type array).
    pub fn is_nullable(&self) -> bool {
        if self.nullable == Some(true) {
            return true;
        }
        matches!(&self.schema_type, Some(SchemaType::Multiple(types)) if types.iter().any(|t| t == "null"))
    }

    /// Object schema with inline properties (no `$ref`).
    pub fn is_inline_object(&self) -> bool {
        self.ref_path.is_none()
            && self.all_of.is_none()
            && (self.properties.as_ref().is_some_and(|p| !p.is_empty())
                || (self.primary_type() == Some("object") && self.properties.is_some()))
    }

    /// Array whose items are (recursively) an inline object.
    pub fn is_array_of_inline_objects(&self) -> bool {
        self.ref_path.is_none()
            && self.primary_type() == Some("array")
            && self
                .items
                .as_ref()
                .is_some_and(|items| items.is_inline_object() || items.is_array_of_inline_objects())
    }

    /// Whether the normalizer should hoist this schema into the table.
    pub fn needs_name(&self) -> bool {
        self.is_inline_object() || self.is_array_of_inline_objects()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_and_yaml() {
        let json = r#"{"openapi": "3.0.0", "info": {"title": "T"}, "paths": {}}"#;
        let doc = OpenApiDocument::parse(json).unwrap();
        assert_eq!(doc.info.unwrap().title.as_deref(), Some("T"));

        let yaml = "openapi: 3.0.0\ninfo:\n  title: Y\npaths:\n  /a:\n    get:\n      operationId: getA\n";
        let doc = OpenApiDocument::parse(yaml).unwrap();
        let paths = doc.paths.unwrap();
        let (method, op) = paths["/a"].operations()[0];
        assert_eq!(method, "GET");
        assert_eq!(op.operation_id.as_deref(), Some("getA"));
    }

    #[test]
    fn test_invalid_document_is_malformed() {
        let err = OpenApiDocument::parse("{ not json").unwrap_err();
        assert!(matches!(err, SdkGenError::MalformedSpecification { .. }));
    }

    #[test]
    fn test_nullable_forms() {
        let schema: Schema = serde_json::from_str(r#"{"type": ["string", "null"]}"#).unwrap();
        assert!(schema.is_nullable());
        assert_eq!(schema.primary_type(), Some("string"));

        let schema: Schema = serde_json::from_str(r#"{"type": "string", "nullable": true}"#).unwrap();
        assert!(schema.is_nullable());
    }

    #[test]
    fn test_security_scheme_tagging() {
        let scheme: SecuritySchemeObject =
            serde_json::from_str(r#"{"type": "apiKey", "name": "X-Api-Key", "in": "header"}"#)
                .unwrap();
        assert!(matches!(scheme, SecuritySchemeObject::ApiKey { ref name, .. } if name == "X-Api-Key"));
    }

    #[test]
    fn test_needs_name() {
        let inline: Schema =
            serde_json::from_str(r#"{"type": "object", "properties": {"a": {"type": "string"}}}"#)
                .unwrap();
        assert!(inline.needs_name());

        let array: Schema = serde_json::from_str(
            r#"{"type": "array", "items": {"type": "object", "properties": {"a": {"type": "string"}}}}"#,
        )
        .unwrap();
        assert!(array.needs_name());

        let scalars: Schema =
            serde_json::from_str(r#"{"type": "array", "items": {"type": "string"}}"#).unwrap();
        assert!(!scalars.needs_name());

        assert!(!Schema::reference("User").needs_name());
        assert_eq!(Schema::reference("User").ref_name(), Some("User"));
    }
}
