//! Source parsers.
//!
//! Every input format implements [`Parser`] and produces the same
//! [`ApiSpecification`]. Formats are selected at runtime through
//! [`InputFormat`] and the [`parser_for`] lookup table.

pub mod har;
pub mod inference;
pub mod openapi;
pub mod postman;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{Result, SdkGenError};
use crate::model::{ApiSpecification, Endpoint, ParamType, Parameter};
use crate::naming::{camel_case, is_type_annotation};

pub use har::HarParser;
pub use openapi::OpenApiParser;
pub use postman::PostmanParser;

/// Capability shared by all input formats.
pub trait Parser: fmt::Debug {
    /// The format this parser reads.
    fn format(&self) -> InputFormat;

    /// Build the API model from the decoded input.
    fn parse(&self) -> Result<ApiSpecification>;
}

/// Runtime tag selecting a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputFormat {
    OpenApi,
    Postman,
    Har,
}

type ParserFactory = fn(&str) -> Result<Box<dyn Parser>>;

/// Registered formats: tag, CLI name, factory.
const REGISTRY: &[(InputFormat, &str, ParserFactory)] = &[
    (InputFormat::OpenApi, "openapi", openapi_parser),
    (InputFormat::Postman, "postman", postman_parser),
    (InputFormat::Har, "har", har_parser),
];

fn openapi_parser(source: &str) -> Result<Box<dyn Parser>> {
    Ok(Box::new(OpenApiParser::from_source(source)?))
}

fn postman_parser(source: &str) -> Result<Box<dyn Parser>> {
    Ok(Box::new(PostmanParser::from_source(source)?))
}

fn har_parser(source: &str) -> Result<Box<dyn Parser>> {
    Ok(Box::new(HarParser::from_source(source)?))
}

impl InputFormat {
    pub fn name(&self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(format, _, _)| format == self)
            .map_or("unknown", |(_, name, _)| *name)
    }

    pub fn all() -> impl Iterator<Item = InputFormat> {
        REGISTRY.iter().map(|(format, _, _)| *format)
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InputFormat {
    type Err = SdkGenError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        REGISTRY
            .iter()
            .find(|(_, name, _)| *name == wanted)
            .map(|(format, _, _)| *format)
            .ok_or_else(|| {
                let known: Vec<_> = REGISTRY.iter().map(|(_, name, _)| *name).collect();
                SdkGenError::config(
                    "type",
                    format!("unknown input type '{s}', expected one of: {}", known.join(", ")),
                )
            })
    }
}

/// Decode `source` with the parser registered for `format`.
pub fn parser_for(format: InputFormat, source: &str) -> Result<Box<dyn Parser>> {
    let (_, _, factory) = REGISTRY
        .iter()
        .find(|(registered, _, _)| *registered == format)
        .ok_or_else(|| SdkGenError::config("type", format!("no parser registered for {format:?}")))?;
    factory(source)
}

/// Give every `:name` placeholder a path parameter.
///
/// Placeholders are matched by normalized variable name; unmatched ones get a
/// required string parameter.
pub(crate) fn ensure_path_parameters(endpoint: &mut Endpoint) {
    let missing: Vec<String> = endpoint
        .placeholders()
        .filter(|placeholder| {
            let wanted = camel_case(placeholder);
            !endpoint
                .path_parameters
                .iter()
                .any(|p| camel_case(&p.name) == wanted)
        })
        .map(str::to_string)
        .collect();

    for name in missing {
        endpoint
            .path_parameters
            .push(Parameter::new(name, ParamType::String));
    }
}

/// Scalar defaults that are real values rather than placeholders.
pub(crate) fn is_literal_default(value: &Value) -> bool {
    match value {
        Value::String(s) => !is_type_annotation(s),
        Value::Bool(_) | Value::Number(_) => true,
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}
