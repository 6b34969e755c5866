//! Error types for the SDK generation pipeline.
//!
//! Every fatal variant names the location in the source document (path,
//! operation, schema or configuration key) that triggered it, so users can
//! find the problem without re-running with debug logging.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SdkGenError>;

/// Errors that abort a generation run.
#[derive(Debug, Error)]
pub enum SdkGenError {
    /// Required top-level fields are missing or the input cannot be decoded.
    #[error("malformed specification at '{location}': {reason}")]
    MalformedSpecification { location: String, reason: String },

    /// A schema needs a name and none can be derived.
    #[error("cannot name schema at '{location}': {reason}")]
    SchemaNaming { location: String, reason: String },

    /// A `$ref` pointer does not resolve against the component tables.
    #[error("unresolved reference '{reference}' at '{location}'")]
    UnresolvedReference { reference: String, location: String },

    /// A `{token}` in a URL template has no substitution.
    #[error("template '{template}' has no substitution for '{{{token}}}'")]
    Templating { template: String, token: String },

    /// Configuration is missing a required key or cannot be decoded.
    #[error("invalid configuration key '{key}': {reason}")]
    Config { key: String, reason: String },

    /// Reading input or writing generated files failed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SdkGenError {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSpecification {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolved(reference: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
            location: location.into(),
        }
    }

    pub(crate) fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// What kind of identifier collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    /// Resource method name.
    Method,
    /// Request constructor member (and resource method argument).
    Parameter,
    /// Dto or Response member.
    Property,
}

/// Two identifiers in one class normalized to the same name.
///
/// Recovered locally: the later one receives `substituted` and the
/// collision is reported through [`crate::codegen::GeneratedCode::collisions`].
/// Wire names are untouched, so the renamed member still maps to its
/// original key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierCollision {
    pub kind: CollisionKind,
    /// Class owning the identifiers (resource, request or Dto).
    pub resource: String,
    /// Endpoint label, or the schema name for property collisions.
    pub endpoint: String,
    /// The identifier both normalized to.
    pub original: String,
    /// The deterministic alternate given to the later one.
    pub substituted: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_location() {
        let err = SdkGenError::malformed("info.title", "missing");
        assert_eq!(
            err.to_string(),
            "malformed specification at 'info.title': missing"
        );

        let err = SdkGenError::unresolved("#/components/schemas/Nope", "GET /users");
        assert!(err.to_string().contains("#/components/schemas/Nope"));
        assert!(err.to_string().contains("GET /users"));
    }

    #[test]
    fn test_templating_message_shows_braced_token() {
        let err = SdkGenError::Templating {
            template: "https://{region}.example.com".into(),
            token: "region".into(),
        };
        assert_eq!(
            err.to_string(),
            "template 'https://{region}.example.com' has no substitution for '{region}'"
        );
    }
}
