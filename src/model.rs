//! Unified API model shared by every parser and generator.
//!
//! Parsers build an [`ApiSpecification`] once per run; generators only read
//! it. Schemas reference each other by name through [`ParamType::Named`], so
//! self-referential and mutually-referential types form an index cycle over
//! [`Components::schemas`] instead of an ownership cycle.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SdkGenError;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Connect,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Methods whose requests carry a body in the generated client.
    pub fn allows_body(&self) -> bool {
        matches!(
            self,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch | HttpMethod::Delete
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = SdkGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            "CONNECT" => Ok(HttpMethod::Connect),
            "TRACE" => Ok(HttpMethod::Trace),
            other => Err(SdkGenError::malformed(
                "method",
                format!("unsupported HTTP method '{other}'"),
            )),
        }
    }
}

/// Semantic type tag of a parameter or schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    String,
    Int,
    Float,
    /// JSON-Schema `number` without a format hint: float or int.
    Number,
    Bool,
    /// Objects and arrays.
    Array,
    Mixed,
    /// Reference to a schema registered in [`Components::schemas`].
    Named(String),
}

impl ParamType {
    /// Map a JSON-Schema primitive type name (with optional format) to a tag.
    pub fn from_json_schema(type_name: &str, format: Option<&str>) -> Self {
        match type_name {
            "integer" => ParamType::Int,
            "number" => match format {
                Some("float" | "double") => ParamType::Float,
                Some("int32" | "int64") => ParamType::Int,
                _ => ParamType::Number,
            },
            "string" => ParamType::String,
            "boolean" => ParamType::Bool,
            "object" | "array" => ParamType::Array,
            _ => ParamType::Mixed,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ParamType::Array | ParamType::Named(_))
    }

    pub fn schema_name(&self) -> Option<&str> {
        match self {
            ParamType::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// A single request parameter (path, query, body or header).
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub ty: ParamType,
    pub nullable: bool,
    /// Raw, pre-normalization name as it appears on the wire.
    pub name: String,
    pub description: Option<String>,
    /// Literal default taken from the source document, if any.
    pub default: Option<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            ty,
            nullable: false,
            name: name.into(),
            description: None,
            default: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }
}

/// Required-ness of a schema's members.
///
/// Objects list their required property names; arrays carry a single flag.
/// The enum makes the two forms mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Required {
    #[default]
    Unspecified,
    Properties(Vec<String>),
    Array(bool),
}

/// A normalized type description.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub ty: ParamType,
    pub nullable: bool,
    pub name: String,
    pub description: Option<String>,
    pub items: Option<Box<Schema>>,
    pub properties: IndexMap<String, Schema>,
    pub required: Required,
    pub enum_values: Vec<Value>,
}

impl Schema {
    /// A scalar or reference schema with no members.
    pub fn scalar(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            ty,
            nullable: false,
            name: name.into(),
            description: None,
            items: None,
            properties: IndexMap::new(),
            required: Required::Unspecified,
            enum_values: Vec::new(),
        }
    }

    /// An object schema with ordered properties.
    pub fn object(
        name: impl Into<String>,
        properties: IndexMap<String, Schema>,
        required: Vec<String>,
    ) -> Self {
        Self {
            properties,
            required: Required::Properties(required),
            ..Self::scalar(name, ParamType::Array)
        }
    }

    /// An array schema of `items`.
    pub fn array(name: impl Into<String>, items: Schema, required: bool) -> Self {
        Self {
            items: Some(Box::new(items)),
            required: Required::Array(required),
            ..Self::scalar(name, ParamType::Array)
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    /// Whether this schema has members and therefore needs a generated class.
    pub fn is_object(&self) -> bool {
        !self.properties.is_empty()
    }

    pub fn is_property_required(&self, property: &str) -> bool {
        match &self.required {
            Required::Properties(names) => names.iter().any(|n| n == property),
            _ => false,
        }
    }

    /// The named schema an array's items reference, if any.
    pub fn item_schema_name(&self) -> Option<&str> {
        self.items.as_ref().and_then(|items| items.ty.schema_name())
    }

    /// View a property schema as a request parameter.
    pub fn to_parameter(&self, required: bool) -> Parameter {
        Parameter::new(self.name.clone(), self.ty.clone())
            .nullable(self.nullable || !required)
            .with_description(self.description.clone())
    }
}

/// Location of an API key credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Query,
    Header,
    Cookie,
}

/// One OAuth2 flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OAuthFlow {
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
    pub scopes: IndexMap<String, String>,
}

/// Authentication scheme declared by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityScheme {
    ApiKey {
        name: String,
        location: ApiKeyLocation,
        description: Option<String>,
    },
    Http {
        scheme: String,
        bearer_format: Option<String>,
        description: Option<String>,
    },
    OAuth2 {
        flows: IndexMap<String, OAuthFlow>,
        description: Option<String>,
    },
    OpenIdConnect {
        open_id_connect_url: String,
        description: Option<String>,
    },
    MutualTls {
        description: Option<String>,
    },
}

impl SecurityScheme {
    pub fn kind(&self) -> &'static str {
        match self {
            SecurityScheme::ApiKey { .. } => "apiKey",
            SecurityScheme::Http { .. } => "http",
            SecurityScheme::OAuth2 { .. } => "oauth2",
            SecurityScheme::OpenIdConnect { .. } => "openIdConnect",
            SecurityScheme::MutualTls { .. } => "mutualTLS",
        }
    }
}

/// Reference from the API to a declared security scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub scheme_name: String,
    pub scopes: Vec<String>,
}

/// Variable substituted into the base URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerParameter {
    pub name: String,
    pub default: Option<String>,
    pub description: Option<String>,
}

/// Base URL template such as `https://{region}.example.com/v1`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BaseUrl {
    pub url: String,
    pub parameters: Vec<ServerParameter>,
}

/// Reusable components: security schemes and the named schema table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Components {
    pub security_schemes: IndexMap<String, SecurityScheme>,
    pub schemas: IndexMap<String, Schema>,
    /// Names in `schemas` that were hoisted from response bodies.
    pub response_schemas: Vec<String>,
}

impl Components {
    pub fn is_response_schema(&self, name: &str) -> bool {
        self.response_schemas.iter().any(|n| n == name)
    }
}

/// A documented response of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    pub status: String,
    /// Name of the schema table entry describing the JSON body.
    pub schema: Option<String>,
}

impl EndpointResponse {
    pub fn is_success(&self) -> bool {
        self.status.starts_with('2')
    }
}

/// One path segment of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(String),
    /// `:name` placeholder.
    Placeholder(String),
}

impl PathSegment {
    /// Parse a `:name` or literal token.
    pub fn parse(token: &str) -> Self {
        match token.strip_prefix(':') {
            Some(name) if !name.is_empty() => PathSegment::Placeholder(name.to_string()),
            _ => PathSegment::Literal(token.to_string()),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Literal(s) => f.write_str(s),
            PathSegment::Placeholder(name) => write!(f, ":{name}"),
        }
    }
}

/// One operation of the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// Human label; source of generated identifiers.
    pub name: String,
    pub method: HttpMethod,
    pub path_segments: Vec<PathSegment>,
    pub collection: Option<String>,
    pub description: Option<String>,
    pub path_parameters: Vec<Parameter>,
    pub query_parameters: Vec<Parameter>,
    pub body_parameters: Vec<Parameter>,
    pub header_parameters: Vec<Parameter>,
    pub responses: Vec<EndpointResponse>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, method: HttpMethod, path: &str) -> Self {
        Self {
            name: name.into(),
            method,
            path_segments: path
                .trim_matches('/')
                .split('/')
                .filter(|s| !s.is_empty())
                .map(PathSegment::parse)
                .collect(),
            collection: None,
            description: None,
            path_parameters: Vec::new(),
            query_parameters: Vec::new(),
            body_parameters: Vec::new(),
            header_parameters: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Path rendered with `:placeholder` tokens, e.g. `/users/:user_id`.
    pub fn path(&self) -> String {
        let joined = self
            .path_segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("/{joined}")
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.path_segments.iter().filter_map(|s| match s {
            PathSegment::Placeholder(name) => Some(name.as_str()),
            PathSegment::Literal(_) => None,
        })
    }

    /// The schema named by the first successful response, if any.
    pub fn success_schema(&self) -> Option<&str> {
        self.responses
            .iter()
            .filter(|r| r.is_success())
            .find_map(|r| r.schema.as_deref())
    }

    /// Name synthesized from method and path, e.g. `get users by id`.
    pub fn fallback_name(&self) -> String {
        let mut words = vec![self.method.as_str().to_ascii_lowercase()];
        for segment in &self.path_segments {
            match segment {
                PathSegment::Literal(literal) => words.push(literal.clone()),
                PathSegment::Placeholder(name) => words.push(format!("by {name}")),
            }
        }
        words.join(" ")
    }

    /// Label used in diagnostics, e.g. `GET /users/:id`.
    pub fn location(&self) -> String {
        format!("{} {}", self.method, self.path())
    }
}

/// Root of the unified model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiSpecification {
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_url: BaseUrl,
    pub security_requirements: Vec<SecurityRequirement>,
    pub components: Components,
    pub endpoints: Vec<Endpoint>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trip() {
        for method in [
            HttpMethod::Get,
            HttpMethod::Head,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Patch,
            HttpMethod::Delete,
            HttpMethod::Options,
            HttpMethod::Connect,
            HttpMethod::Trace,
        ] {
            assert_eq!(method.as_str().parse::<HttpMethod>().unwrap(), method);
        }
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_json_schema_type_mapping() {
        assert_eq!(ParamType::from_json_schema("integer", None), ParamType::Int);
        assert_eq!(ParamType::from_json_schema("number", None), ParamType::Number);
        assert_eq!(
            ParamType::from_json_schema("number", Some("double")),
            ParamType::Float
        );
        assert_eq!(
            ParamType::from_json_schema("number", Some("int64")),
            ParamType::Int
        );
        assert_eq!(ParamType::from_json_schema("string", None), ParamType::String);
        assert_eq!(ParamType::from_json_schema("boolean", None), ParamType::Bool);
        assert_eq!(ParamType::from_json_schema("object", None), ParamType::Array);
        assert_eq!(ParamType::from_json_schema("array", None), ParamType::Array);
        assert_eq!(ParamType::from_json_schema("null", None), ParamType::Mixed);
    }

    #[test]
    fn test_endpoint_path_segments() {
        let endpoint = Endpoint::new("Get user", HttpMethod::Get, "/users/:user_id/");
        assert_eq!(
            endpoint.path_segments,
            vec![
                PathSegment::Literal("users".into()),
                PathSegment::Placeholder("user_id".into()),
            ]
        );
        assert_eq!(endpoint.path(), "/users/:user_id");
        assert_eq!(endpoint.placeholders().collect::<Vec<_>>(), vec!["user_id"]);
        assert_eq!(endpoint.location(), "GET /users/:user_id");
        assert_eq!(endpoint.fallback_name(), "get users by user_id");
    }

    #[test]
    fn test_root_path_has_no_segments() {
        let endpoint = Endpoint::new("Root", HttpMethod::Get, "/");
        assert!(endpoint.path_segments.is_empty());
        assert_eq!(endpoint.path(), "/");
    }

    #[test]
    fn test_required_forms_are_exclusive() {
        let object = Schema::object("User", IndexMap::new(), vec!["id".into()]);
        assert!(object.is_property_required("id"));
        let array = Schema::array("Users", Schema::scalar("item", ParamType::String), true);
        assert_eq!(array.required, Required::Array(true));
        assert!(!array.is_property_required("id"));
    }

    #[test]
    fn test_success_schema_skips_errors() {
        let mut endpoint = Endpoint::new("x", HttpMethod::Get, "/x");
        endpoint.responses = vec![
            EndpointResponse { status: "404".into(), schema: Some("Error".into()) },
            EndpointResponse { status: "200".into(), schema: Some("Thing".into()) },
        ];
        assert_eq!(endpoint.success_schema(), Some("Thing"));
    }
}
