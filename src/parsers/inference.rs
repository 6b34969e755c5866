//! Type inference from example bodies.
//!
//! Postman collections carry example payloads instead of schemas. Each leaf
//! of an example is typed either from an angle-bracket annotation such as
//! `<string>` or `<integer,null>`, or from the JSON value itself. Objects and
//! arrays recurse, so the result has the same shape as the input.
//!
//! ## Examples
//!
//! ```ignore
//! // {"id": "<integer>", "tags": ["a"], "meta": {"x": true}}
//! // -> {"id": Leaf(["integer"]), "tags": Array([Leaf(["string"])]), "meta": Object({"x": Leaf(["boolean"])})}
//! ```

use indexmap::IndexMap;
use serde_json::Value;

use crate::model::{ParamType, Parameter};
use crate::naming::is_type_annotation;

/// Inferred type tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferredType {
    /// Candidate type names of a leaf, e.g. `["integer", "null"]`.
    Leaf(Vec<String>),
    Object(IndexMap<String, InferredType>),
    Array(Vec<InferredType>),
}

impl InferredType {
    /// Collapse the tree to a semantic type and a nullability flag.
    pub fn to_param_type(&self) -> (ParamType, bool) {
        match self {
            InferredType::Object(_) | InferredType::Array(_) => (ParamType::Array, false),
            InferredType::Leaf(candidates) => {
                let nullable = candidates.iter().any(|c| c == "null");
                let ty = candidates
                    .iter()
                    .find(|c| *c != "null")
                    .map_or(ParamType::Mixed, |c| type_from_name(c));
                (ty, nullable)
            }
        }
    }
}

/// Infer the type tree of a JSON value.
pub fn infer_types(value: &Value) -> InferredType {
    match value {
        Value::Object(map) => InferredType::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), infer_types(value)))
                .collect(),
        ),
        Value::Array(items) => InferredType::Array(items.iter().map(infer_types).collect()),
        Value::String(s) if is_type_annotation(s) => InferredType::Leaf(parse_annotation(s)),
        other => InferredType::Leaf(vec![runtime_type_name(other).to_string()]),
    }
}

/// Body parameters for the top-level keys of an example payload.
///
/// Non-object payloads become a single `data` parameter.
pub fn body_parameters(value: &Value) -> Vec<Parameter> {
    match infer_types(value) {
        InferredType::Object(fields) => fields
            .iter()
            .map(|(name, inferred)| {
                let (ty, nullable) = inferred.to_param_type();
                Parameter::new(name.clone(), ty).nullable(nullable)
            })
            .collect(),
        other => {
            let (ty, nullable) = other.to_param_type();
            vec![Parameter::new("data", ty).nullable(nullable)]
        }
    }
}

/// Split `<integer, null>` into `["integer", "null"]`.
fn parse_annotation(annotation: &str) -> Vec<String> {
    let inner = annotation
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>');
    inner
        .split(',')
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn runtime_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "double",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Map a type name from an annotation or a runtime value to a semantic type.
fn type_from_name(name: &str) -> ParamType {
    match name {
        "int" | "integer" | "long" => ParamType::Int,
        "float" | "double" | "decimal" => ParamType::Float,
        "number" => ParamType::Number,
        "bool" | "boolean" => ParamType::Bool,
        "string" | "date" | "datetime" | "date-time" | "uuid" => ParamType::String,
        "array" | "object" => ParamType::Array,
        _ => ParamType::Mixed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_annotations_split_into_candidates() {
        let inferred = infer_types(&json!("<integer, null>"));
        assert_eq!(
            inferred,
            InferredType::Leaf(vec!["integer".into(), "null".into()])
        );
        assert_eq!(inferred.to_param_type(), (ParamType::Int, true));
    }

    #[test]
    fn test_runtime_types() {
        assert_eq!(infer_types(&json!(1)).to_param_type(), (ParamType::Int, false));
        assert_eq!(infer_types(&json!(1.5)).to_param_type(), (ParamType::Float, false));
        assert_eq!(infer_types(&json!("x")).to_param_type(), (ParamType::String, false));
        assert_eq!(infer_types(&json!(null)).to_param_type(), (ParamType::Mixed, true));
    }

    #[test]
    fn test_tree_keeps_shape() {
        let inferred = infer_types(&json!({"id": "<string>", "tags": [true], "meta": {"n": 1}}));
        let InferredType::Object(fields) = inferred else {
            unreachable!("object expected");
        };
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["id", "tags", "meta"]);
        assert_eq!(
            fields["tags"],
            InferredType::Array(vec![InferredType::Leaf(vec!["boolean".into()])])
        );
        assert!(matches!(fields["meta"], InferredType::Object(_)));
    }

    #[test]
    fn test_body_parameters() {
        let params = body_parameters(&json!({"name": "Ann", "age": "<integer,null>", "tags": []}));
        let summary: Vec<_> = params
            .iter()
            .map(|p| (p.name.as_str(), p.ty.clone(), p.nullable))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("name", ParamType::String, false),
                ("age", ParamType::Int, true),
                ("tags", ParamType::Array, false),
            ]
        );

        let params = body_parameters(&json!([1, 2]));
        assert_eq!(params[0].name, "data");
        assert_eq!(params[0].ty, ParamType::Array);
    }
}
