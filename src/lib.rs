//! Generate Saloon-based PHP SDKs from API descriptions.
//!
//! An OpenAPI document, Postman collection or HAR capture is parsed into an
//! [`ApiSpecification`], turned into PHP class models by [`codegen`] and
//! written to disk by [`output`].

#![forbid(unsafe_code)]
#![deny(unused_must_use, missing_debug_implementations)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub mod codegen;
pub mod config;
pub mod error;
pub mod model;
pub mod naming;
pub mod output;
pub mod parsers;

pub use codegen::{GeneratedCode, generate};
pub use config::Config;
pub use error::{CollisionKind, IdentifierCollision, Result, SdkGenError};
pub use model::ApiSpecification;
pub use parsers::{InputFormat, Parser, parser_for};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SDKGEN_LOG";

/// Parse `source` as `format` and generate the SDK described by it.
pub fn generate_from_source(
    format: InputFormat,
    source: &str,
    config: &Config,
) -> Result<GeneratedCode> {
    let spec = parser_for(format, source)?.parse()?;
    info!(
        format = %format,
        endpoints = spec.endpoints.len(),
        schemas = spec.components.schemas.len(),
        "Parsed API description."
    );
    codegen::generate(&spec, config)
}

/// Initialize tracing for the CLI.
///
/// `SDKGEN_LOG` accepts either a plain level (`debug`), which is scoped to
/// this crate, or a full filter directive. Logs go to stderr so generated
/// output on stdout stays clean.
pub fn init_tracing() {
    let filter = match std::env::var(LOG_ENV) {
        Ok(value) if is_plain_level(&value) => {
            format!("sdkgen={}", value.trim().to_ascii_lowercase())
        }
        Ok(value) if !value.trim().is_empty() => value,
        _ => "sdkgen=info".to_string(),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn is_plain_level(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_plain_level() {
        assert!(is_plain_level("debug"));
        assert!(is_plain_level("WARN"));
        assert!(!is_plain_level("sdkgen=trace"));
        assert!(!is_plain_level(""));
    }

    #[test]
    fn test_generate_from_source_runs_whole_pipeline() {
        let source = r#"{
            "openapi": "3.0.0",
            "info": {"title": "Acme"},
            "paths": {"/ping": {"get": {"summary": "Ping"}}}
        }"#;
        let config = Config::new("Acme", "App\\Sdk");

        let code = generate_from_source(InputFormat::OpenApi, source, &config).unwrap();
        assert_eq!(code.request_classes.len(), 1);
        assert_eq!(code.resource_classes.len(), 1);
        assert_eq!(code.connector_class.fqcn(), "App\\Sdk\\Acme");
    }
}
