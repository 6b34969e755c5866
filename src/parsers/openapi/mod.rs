//! OpenAPI 3.x input.
//!
//! - `spec`: serde model of the document
//! - `normalize`: schema hoisting, deduplication and reference checks
//!
//! [`OpenApiParser`] normalizes the document first and then maps it onto the
//! unified API model.

pub mod normalize;
pub mod spec;

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Result, SdkGenError};
use crate::model::{
    ApiKeyLocation, ApiSpecification, BaseUrl, Components, Endpoint, EndpointResponse, HttpMethod,
    OAuthFlow, ParamType, Parameter, Schema, SecurityRequirement, SecurityScheme, ServerParameter,
};

use self::normalize::normalize_document;
use self::spec::{
    OpenApiDocument, Operation, PARAMETER_REF_PREFIX, PathItem, SchemaOrigin,
    SecuritySchemeObject, json_media_type,
};
use super::{InputFormat, Parser, ensure_path_parameters, is_literal_default};

/// Parser for OpenAPI 3.x documents in JSON or YAML.
#[derive(Debug, Clone)]
pub struct OpenApiParser {
    document: OpenApiDocument,
}

impl OpenApiParser {
    pub fn new(document: OpenApiDocument) -> Self {
        Self { document }
    }

    /// Decode a JSON or YAML document.
    pub fn from_source(source: &str) -> Result<Self> {
        OpenApiDocument::parse(source).map(Self::new)
    }
}

impl Parser for OpenApiParser {
    fn format(&self) -> InputFormat {
        InputFormat::OpenApi
    }

    fn parse(&self) -> Result<ApiSpecification> {
        let info = self
            .document
            .info
            .as_ref()
            .ok_or_else(|| SdkGenError::malformed("info", "document has no info object"))?;
        let title = info
            .title
            .clone()
            .ok_or_else(|| SdkGenError::malformed("info.title", "document has no title"))?;
        if self.document.paths.is_none() {
            return Err(SdkGenError::malformed("paths", "document has no paths object"));
        }

        let mut document = self.document.clone();
        normalize_document(&mut document)?;

        let components = convert_components(&document)?;
        let mut endpoints = Vec::new();
        for (path, item) in document.paths.iter().flatten() {
            for (method, operation) in item.operations() {
                endpoints.push(convert_operation(&document, path, method, item, operation)?);
            }
        }
        debug!(title = %title, endpoints = endpoints.len(), "Parsed OpenAPI document.");

        Ok(ApiSpecification {
            name: Some(title),
            description: info.description.clone(),
            base_url: convert_base_url(&document),
            security_requirements: convert_security(&document),
            components,
            endpoints,
        })
    }
}

fn convert_base_url(doc: &OpenApiDocument) -> BaseUrl {
    let Some(server) = doc.servers.first() else {
        return BaseUrl::default();
    };
    BaseUrl {
        url: server.url.clone(),
        parameters: server
            .variables
            .iter()
            .map(|(name, variable)| ServerParameter {
                name: name.clone(),
                default: variable.default.clone(),
                description: variable.description.clone(),
            })
            .collect(),
    }
}

fn convert_security(doc: &OpenApiDocument) -> Vec<SecurityRequirement> {
    doc.security
        .iter()
        .flat_map(|requirement| requirement.iter())
        .map(|(name, scopes)| SecurityRequirement {
            scheme_name: name.clone(),
            scopes: scopes.clone(),
        })
        .collect()
}

fn convert_components(doc: &OpenApiDocument) -> Result<Components> {
    let mut security_schemes = IndexMap::new();
    for (name, scheme) in &doc.components.security_schemes {
        security_schemes.insert(name.clone(), convert_security_scheme(name, scheme)?);
    }

    let table = &doc.components.schemas;
    let mut schemas = IndexMap::new();
    let mut response_schemas = Vec::new();
    for (name, schema) in table {
        schemas.insert(name.clone(), convert_schema(name, schema, table));
        if schema.origin == Some(SchemaOrigin::Response) {
            response_schemas.push(name.clone());
        }
    }

    Ok(Components {
        security_schemes,
        schemas,
        response_schemas,
    })
}

fn convert_security_scheme(name: &str, scheme: &SecuritySchemeObject) -> Result<SecurityScheme> {
    Ok(match scheme {
        SecuritySchemeObject::ApiKey {
            name: key_name,
            location,
            description,
        } => SecurityScheme::ApiKey {
            name: key_name.clone(),
            location: match location.as_str() {
                "query" => ApiKeyLocation::Query,
                "header" => ApiKeyLocation::Header,
                "cookie" => ApiKeyLocation::Cookie,
                other => {
                    return Err(SdkGenError::malformed(
                        format!("components.securitySchemes.{name}.in"),
                        format!("unknown api key location '{other}'"),
                    ));
                }
            },
            description: description.clone(),
        },
        SecuritySchemeObject::Http {
            scheme,
            bearer_format,
            description,
        } => SecurityScheme::Http {
            scheme: scheme.clone(),
            bearer_format: bearer_format.clone(),
            description: description.clone(),
        },
        SecuritySchemeObject::OAuth2 { flows, description } => SecurityScheme::OAuth2 {
            flows: flows
                .iter()
                .map(|(kind, flow)| {
                    let flow = OAuthFlow {
                        authorization_url: flow.authorization_url.clone(),
                        token_url: flow.token_url.clone(),
                        refresh_url: flow.refresh_url.clone(),
                        scopes: flow.scopes.clone(),
                    };
                    (kind.clone(), flow)
                })
                .collect(),
            description: description.clone(),
        },
        SecuritySchemeObject::OpenIdConnect {
            open_id_connect_url,
            description,
        } => SecurityScheme::OpenIdConnect {
            open_id_connect_url: open_id_connect_url.clone(),
            description: description.clone(),
        },
        SecuritySchemeObject::MutualTls { description } => SecurityScheme::MutualTls {
            description: description.clone(),
        },
    })
}

/// Map a normalized serde schema onto the model.
///
/// References become [`ParamType::Named`] and are not followed, except for
/// `allOf` members whose properties are merged, through nested `allOf`s too.
fn convert_schema(name: &str, schema: &spec::Schema, table: &IndexMap<String, spec::Schema>) -> Schema {
    let nullable = schema.is_nullable();
    let description = schema.description.clone();

    if let Some(target) = schema.ref_name() {
        return Schema::scalar(name, ParamType::Named(target.to_string()))
            .nullable(nullable)
            .with_description(description);
    }

    let mut converted = if schema.all_of.is_some() {
        let mut merged = AllOfMerge::new(table);
        merged.collect(schema);
        Schema::object(name, merged.properties, merged.required)
    } else if schema.primary_type() == Some("array") {
        let items = schema.items.as_deref().map_or_else(
            || Schema::scalar(format!("{name} item"), ParamType::Mixed),
            |items| convert_schema(&format!("{name} item"), items, table),
        );
        Schema::array(name, items, false)
    } else if let Some(properties) = &schema.properties {
        let properties = properties
            .iter()
            .map(|(property, member)| (property.clone(), convert_schema(property, member, table)))
            .collect();
        Schema::object(name, properties, schema.required.clone().unwrap_or_default())
    } else {
        let ty = schema
            .primary_type()
            .map_or(ParamType::Mixed, |t| ParamType::from_json_schema(t, schema.format.as_deref()));
        Schema::scalar(name, ty)
    };

    converted.enum_values = schema.enum_values.clone().unwrap_or_default();
    converted.nullable(nullable).with_description(description)
}

/// Properties and required names gathered from an `allOf` tree.
struct AllOfMerge<'a> {
    table: &'a IndexMap<String, spec::Schema>,
    visited: HashSet<&'a str>,
    properties: IndexMap<String, Schema>,
    required: Vec<String>,
}

impl<'a> AllOfMerge<'a> {
    fn new(table: &'a IndexMap<String, spec::Schema>) -> Self {
        Self {
            table,
            visited: HashSet::new(),
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// Members first, then the schema's own properties. Each referenced
    /// component is merged at most once, so cycles end.
    fn collect(&mut self, schema: &spec::Schema) {
        let source = match schema.ref_name() {
            Some(target) => {
                let Some((key, resolved)) = self.table.get_key_value(target) else {
                    return;
                };
                if !self.visited.insert(key.as_str()) {
                    return;
                }
                resolved
            }
            None => schema,
        };

        for member in source.all_of.iter().flatten() {
            self.collect(member);
        }
        for (property, property_schema) in source.properties.iter().flatten() {
            self.properties.insert(
                property.clone(),
                convert_schema(property, property_schema, self.table),
            );
        }
        for name in source.required.iter().flatten() {
            if !self.required.contains(name) {
                self.required.push(name.clone());
            }
        }
    }
}

fn convert_operation(
    doc: &OpenApiDocument,
    path: &str,
    method: &str,
    item: &PathItem,
    operation: &Operation,
) -> Result<Endpoint> {
    let location = format!("{method} {path}");
    let name = operation
        .operation_id
        .clone()
        .or_else(|| operation.summary.clone())
        .unwrap_or_default();

    let mut endpoint = Endpoint::new(name, method.parse::<HttpMethod>()?, &to_placeholder_path(path));
    endpoint.collection = operation.tags.first().cloned();
    endpoint.description = operation
        .description
        .clone()
        .or_else(|| operation.summary.clone())
        .filter(|d| !d.trim().is_empty());

    // Path-level parameters first; operation-level ones replace them by (name, location).
    let mut merged: IndexMap<(String, String), spec::Parameter> = IndexMap::new();
    for parameter in item.parameters.iter().chain(&operation.parameters) {
        let parameter = resolve_parameter(doc, parameter, &location)?;
        merged.insert((parameter.name.clone(), parameter.location.clone()), parameter);
    }

    for ((name, location_kind), parameter) in &merged {
        let converted = convert_parameter(parameter);
        match location_kind.as_str() {
            "path" => endpoint.path_parameters.push(converted.nullable(false)),
            "query" => endpoint.query_parameters.push(converted),
            "header" => endpoint.header_parameters.push(converted),
            "cookie" => debug!(parameter = %name, endpoint = %location, "Skipping cookie parameter."),
            other => warn!(parameter = %name, location = %other, "Skipping parameter with unknown location."),
        }
    }

    if let Some(body) = &operation.request_body
        && let Some(schema) = json_media_type(&body.content).and_then(|m| m.schema.as_ref())
    {
        endpoint.body_parameters = body_parameters(doc, schema);
    }

    for (status, response) in &operation.responses {
        let schema = json_media_type(&response.content)
            .and_then(|m| m.schema.as_ref())
            .and_then(|s| s.ref_name())
            .map(str::to_string);
        endpoint.responses.push(EndpointResponse {
            status: status.clone(),
            schema,
        });
    }

    ensure_path_parameters(&mut endpoint);
    Ok(endpoint)
}

/// Rewrite `{param}` path segments to `:param`.
fn to_placeholder_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if !name.is_empty() => format!(":{name}"),
                _ => segment.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn resolve_parameter(
    doc: &OpenApiDocument,
    parameter: &spec::Parameter,
    location: &str,
) -> Result<spec::Parameter> {
    let Some(reference) = &parameter.ref_path else {
        return Ok(parameter.clone());
    };
    reference
        .strip_prefix(PARAMETER_REF_PREFIX)
        .and_then(|name| doc.components.parameters.get(name))
        .cloned()
        .ok_or_else(|| SdkGenError::unresolved(reference.clone(), location))
}

fn convert_parameter(parameter: &spec::Parameter) -> Parameter {
    let (ty, schema_nullable, default) = match &parameter.schema {
        Some(schema) => {
            let ty = match schema.ref_name() {
                Some(target) => ParamType::Named(target.to_string()),
                None => schema
                    .primary_type()
                    .map_or(ParamType::Mixed, |t| ParamType::from_json_schema(t, schema.format.as_deref())),
            };
            (ty, schema.is_nullable(), schema.default.clone().filter(is_literal_default))
        }
        None => (ParamType::String, false, None),
    };

    Parameter::new(parameter.name.clone(), ty)
        .nullable(schema_nullable || !parameter.required)
        .with_description(parameter.description.clone())
        .with_default(default)
}

/// Body parameters from the properties of the (referenced) body schema.
fn body_parameters(doc: &OpenApiDocument, schema: &spec::Schema) -> Vec<Parameter> {
    let table = &doc.components.schemas;
    let target = schema.ref_name().and_then(|name| table.get(name)).unwrap_or(schema);
    let converted = convert_schema("data", target, table);

    if converted.is_object() {
        converted
            .properties
            .iter()
            .map(|(name, property)| {
                let mut parameter = property.to_parameter(converted.is_property_required(name));
                parameter.default = target
                    .properties
                    .as_ref()
                    .and_then(|p| p.get(name))
                    .and_then(|p| p.default.clone())
                    .filter(is_literal_default);
                parameter
            })
            .collect()
    } else {
        vec![Parameter::new("data", converted.ty.clone()).nullable(converted.nullable)]
    }
}
