//! Schema normalization for OpenAPI documents.
//!
//! This module flattens the schema forest of a document into the named
//! `components.schemas` table:
//! - Inline request/response bodies are hoisted under a derived name
//! - Nested inline objects are hoisted under `Parent + Property`
//! - Structurally identical inline schemas share one table entry
//! - Every `$ref` is checked against the final table
//!
//! Entries are registered before their members are visited, so self- and
//! mutually-referential schemas resolve to the same entry instead of looping.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Result, SdkGenError};
use crate::naming::{singularize, studly_case};

use super::spec::{
    OpenApiDocument, Operation, SCHEMA_REF_PREFIX, Schema, SchemaOrigin, json_media_type,
    json_media_type_mut,
};

/// Shallow structural identity used for deduplication.
///
/// Compares type, property-name set and description only. Members are not
/// compared, so entries still being normalized can be matched safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Signature {
    ty: Option<String>,
    reference: Option<String>,
    properties: Vec<String>,
    description: Option<String>,
    items: Option<Box<Signature>>,
}

impl Signature {
    fn of(schema: &Schema) -> Self {
        let mut properties: Vec<String> = schema
            .properties
            .as_ref()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        properties.sort();

        let ty = schema
            .primary_type()
            .map(str::to_string)
            .or_else(|| schema.properties.as_ref().map(|_| "object".to_string()));

        Self {
            ty,
            reference: schema.ref_path.clone(),
            properties,
            description: schema.description.clone(),
            items: schema.items.as_deref().map(|items| Box::new(Signature::of(items))),
        }
    }
}

/// Working state of one normalization pass.
#[derive(Debug)]
struct SchemaNormalizer {
    table: IndexMap<String, Schema>,
    signatures: HashMap<Signature, String>,
}

/// Normalize every schema of `doc` in place.
pub fn normalize_document(doc: &mut OpenApiDocument) -> Result<()> {
    let mut normalizer = SchemaNormalizer::new(std::mem::take(&mut doc.components.schemas));

    if let Some(paths) = doc.paths.as_mut() {
        for (path, item) in paths.iter_mut() {
            for (method, operation) in item.operations_mut() {
                normalizer.hoist_operation(path, method, operation)?;
            }
        }
    }

    normalizer.normalize_table()?;
    doc.components.schemas = normalizer.table;

    resolve_references(doc)
}

impl SchemaNormalizer {
    fn new(table: IndexMap<String, Schema>) -> Self {
        let mut signatures = HashMap::new();
        for (name, schema) in &table {
            signatures
                .entry(Signature::of(schema))
                .or_insert_with(|| name.clone());
        }
        Self { table, signatures }
    }

    /// Hoist the inline request and response bodies of one operation.
    fn hoist_operation(&mut self, path: &str, method: &str, operation: &mut Operation) -> Result<()> {
        let location = format!("{method} {path}");
        let base = operation
            .operation_id
            .clone()
            .or_else(|| operation.summary.clone())
            .filter(|b| !studly_case(b).is_empty());

        if let Some(body) = operation.request_body.as_mut()
            && let Some(schema) = json_media_type_mut(&mut body.content).and_then(|m| m.schema.as_mut())
        {
            self.hoist_body(schema, base.as_deref(), "Request", SchemaOrigin::Request, &location)?;
        }

        for (status, response) in &mut operation.responses {
            if let Some(schema) =
                json_media_type_mut(&mut response.content).and_then(|m| m.schema.as_mut())
            {
                let location = format!("{location} response {status}");
                self.hoist_body(schema, base.as_deref(), "Response", SchemaOrigin::Response, &location)?;
            }
        }
        Ok(())
    }

    fn hoist_body(
        &mut self,
        schema: &mut Schema,
        base: Option<&str>,
        suffix: &str,
        origin: SchemaOrigin,
        location: &str,
    ) -> Result<()> {
        if !schema.needs_name() {
            return Ok(());
        }

        let title = schema.title.as_deref().map(studly_case).filter(|t| !t.is_empty());
        let name = match (title, base) {
            (Some(title), _) => title,
            (None, Some(base)) => studly_case(&format!("{base} {suffix}")),
            (None, None) => {
                return Err(SdkGenError::SchemaNaming {
                    location: location.to_string(),
                    reason: "inline schema has no title and the operation has no operationId or summary"
                        .to_string(),
                });
            }
        };

        let registered = self.register(name, std::mem::take(schema), Some(origin));
        *schema = Schema::reference(&registered);
        Ok(())
    }

    /// Register a schema, reusing a structurally identical entry if one exists.
    fn register(&mut self, name: String, mut schema: Schema, origin: Option<SchemaOrigin>) -> String {
        let signature = Signature::of(&schema);
        if let Some(existing) = self.signatures.get(&signature) {
            debug!(schema = %name, existing = %existing, "Reusing identical schema.");
            return existing.clone();
        }

        let name = self.unique_name(name);
        debug!(schema = %name, "Hoisting inline schema.");
        schema.origin = origin;
        self.signatures.insert(signature, name.clone());
        self.table.insert(name.clone(), schema);
        name
    }

    fn unique_name(&self, name: String) -> String {
        if !self.table.contains_key(&name) {
            return name;
        }
        (2..)
            .map(|n| format!("{name}{n}"))
            .find(|candidate| !self.table.contains_key(candidate))
            .unwrap_or(name)
    }

    /// Visit every table entry once, including entries hoisted along the way.
    fn normalize_table(&mut self) -> Result<()> {
        let mut index = 0;
        while let Some((name, schema)) = self.table.get_index(index) {
            let name = name.clone();
            let mut schema = schema.clone();
            let origin = schema.origin;

            self.normalize_members(&mut schema, &name, origin)?;

            if let Some((_, slot)) = self.table.get_index_mut(index) {
                *slot = schema;
            }
            index += 1;
        }
        Ok(())
    }

    fn normalize_members(
        &mut self,
        schema: &mut Schema,
        owner: &str,
        origin: Option<SchemaOrigin>,
    ) -> Result<()> {
        if let Some(properties) = schema.properties.as_mut() {
            for (property, member) in properties.iter_mut() {
                let hint = format!("{owner} {property}");
                let item_hint = format!("{owner} {}", singularize(property));
                self.normalize_member(member, &hint, &item_hint, origin)?;
            }
        }

        if let Some(items) = schema.items.as_mut() {
            let hint = format!("{owner} item");
            self.normalize_member(items, &hint, &hint, origin)?;
        }

        // allOf members stay inline; only their own members are hoisted.
        if let Some(members) = schema.all_of.as_mut() {
            for member in members.iter_mut() {
                self.normalize_members(member, owner, origin)?;
            }
        }
        Ok(())
    }

    fn normalize_member(
        &mut self,
        member: &mut Schema,
        hint: &str,
        item_hint: &str,
        origin: Option<SchemaOrigin>,
    ) -> Result<()> {
        if member.is_inline_object() {
            let name = member
                .title
                .as_deref()
                .map(studly_case)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| studly_case(hint));
            if name.is_empty() {
                return Err(SdkGenError::SchemaNaming {
                    location: hint.to_string(),
                    reason: "nested schema name normalizes to nothing".to_string(),
                });
            }

            let nullable = member.is_nullable();
            let description = member.description.clone();
            let registered = self.register(name, std::mem::take(member), origin);
            *member = Schema {
                nullable: nullable.then_some(true),
                description,
                ..Schema::reference(&registered)
            };
        } else if member.is_array_of_inline_objects() {
            if let Some(items) = member.items.as_mut() {
                self.normalize_member(items, item_hint, item_hint, origin)?;
            }
        } else if member.all_of.is_some() {
            let owner = studly_case(hint);
            self.normalize_members(member, &owner, origin)?;
        }
        Ok(())
    }
}

/// Check every schema reference of `doc` against the final table.
fn resolve_references(doc: &OpenApiDocument) -> Result<()> {
    let table = &doc.components.schemas;

    for (name, schema) in table {
        check_schema(schema, table, &format!("components.schemas.{name}"))?;
    }
    for (name, parameter) in &doc.components.parameters {
        if let Some(schema) = &parameter.schema {
            check_schema(schema, table, &format!("components.parameters.{name}"))?;
        }
    }

    let Some(paths) = &doc.paths else {
        return Ok(());
    };
    for (path, item) in paths {
        for (method, operation) in item.operations() {
            let location = format!("{method} {path}");
            for parameter in item.parameters.iter().chain(&operation.parameters) {
                if let Some(schema) = &parameter.schema {
                    check_schema(schema, table, &format!("{location} parameter {}", parameter.name))?;
                }
            }
            if let Some(schema) = operation
                .request_body
                .as_ref()
                .and_then(|b| json_media_type(&b.content))
                .and_then(|m| m.schema.as_ref())
            {
                check_schema(schema, table, &format!("{location} request body"))?;
            }
            for (status, response) in &operation.responses {
                if let Some(schema) = json_media_type(&response.content).and_then(|m| m.schema.as_ref())
                {
                    check_schema(schema, table, &format!("{location} response {status}"))?;
                }
            }
        }
    }
    Ok(())
}

fn check_schema(schema: &Schema, table: &IndexMap<String, Schema>, location: &str) -> Result<()> {
    if let Some(reference) = &schema.ref_path {
        let resolved = reference
            .strip_prefix(SCHEMA_REF_PREFIX)
            .is_some_and(|name| table.contains_key(name));
        if !resolved {
            return Err(SdkGenError::unresolved(reference.clone(), location));
        }
    }
    for (property, member) in schema.properties.iter().flatten() {
        check_schema(member, table, &format!("{location}.properties.{property}"))?;
    }
    if let Some(items) = &schema.items {
        check_schema(items, table, &format!("{location}.items"))?;
    }
    for (i, member) in schema.all_of.iter().flatten().enumerate() {
        check_schema(member, table, &format!("{location}.allOf[{i}]"))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn normalized(json: &str) -> OpenApiDocument {
        let mut doc = OpenApiDocument::parse(json).unwrap();
        normalize_document(&mut doc).unwrap();
        doc
    }

    fn body_ref(doc: &OpenApiDocument, path: &str) -> Option<String> {
        let paths = doc.paths.as_ref().unwrap();
        let (_, op) = paths[path].operations()[0];
        let body = op.request_body.as_ref().unwrap();
        json_media_type(&body.content)
            .and_then(|m| m.schema.as_ref())
            .and_then(|s| s.ref_name())
            .map(str::to_string)
    }

    #[test]
    fn test_identical_inline_bodies_share_one_entry() {
        let doc = normalized(
            r##"{
            "openapi": "3.0.0",
            "info": {"title": "Test"},
            "paths": {
                "/users": {
                    "post": {
                        "operationId": "createUser",
                        "requestBody": {"content": {"application/json": {"schema": {
                            "type": "object",
                            "properties": {"name": {"type": "string"}, "email": {"type": "string"}}
                        }}}}
                    }
                },
                "/admins": {
                    "post": {
                        "operationId": "createAdmin",
                        "requestBody": {"content": {"application/json": {"schema": {
                            "type": "object",
                            "properties": {"email": {"type": "string"}, "name": {"type": "string"}}
                        }}}}
                    }
                }
            }
        }"##,
        );

        assert_eq!(doc.components.schemas.len(), 1);
        assert_eq!(body_ref(&doc, "/users").as_deref(), Some("CreateUserRequest"));
        assert_eq!(body_ref(&doc, "/admins").as_deref(), Some("CreateUserRequest"));
    }

    #[test]
    fn test_self_referential_schema_terminates() {
        let doc = normalized(
            r##"{
            "openapi": "3.0.0",
            "info": {"title": "Test"},
            "paths": {},
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "parent": {"$ref": "#/components/schemas/Node"},
                        "children": {"type": "array", "items": {"$ref": "#/components/schemas/Node"}}
                    }
                }
            }}
        }"##,
        );

        assert_eq!(doc.components.schemas.len(), 1);
        let node = &doc.components.schemas["Node"];
        let props = node.properties.as_ref().unwrap();
        assert_eq!(props["parent"].ref_name(), Some("Node"));
        assert_eq!(props["children"].items.as_ref().unwrap().ref_name(), Some("Node"));
    }

    #[test]
    fn test_nested_inline_objects_are_hoisted() {
        let doc = normalized(
            r##"{
            "openapi": "3.0.0",
            "info": {"title": "Test"},
            "paths": {},
            "components": {"schemas": {
                "User": {
                    "type": "object",
                    "properties": {
                        "home_address": {
                            "type": "object",
                            "properties": {"street": {"type": "string"}}
                        },
                        "pets": {
                            "type": "array",
                            "items": {"type": "object", "properties": {"kind": {"type": "string"}}}
                        }
                    }
                }
            }}
        }"##,
        );

        let names: Vec<_> = doc.components.schemas.keys().cloned().collect();
        assert_eq!(names, vec!["User", "UserHomeAddress", "UserPet"]);
        let props = doc.components.schemas["User"].properties.clone().unwrap();
        assert_eq!(props["home_address"].ref_name(), Some("UserHomeAddress"));
        assert_eq!(props["pets"].items.as_ref().unwrap().ref_name(), Some("UserPet"));
    }

    #[test]
    fn test_response_bodies_are_marked() {
        let doc = normalized(
            r##"{
            "openapi": "3.0.0",
            "info": {"title": "Test"},
            "paths": {
                "/users": {
                    "get": {
                        "operationId": "listUsers",
                        "responses": {"200": {"content": {"application/json": {"schema": {
                            "type": "array",
                            "items": {"type": "object", "properties": {"id": {"type": "integer"}}}
                        }}}}}
                    }
                }
            }
        }"##,
        );

        let list = &doc.components.schemas["ListUsersResponse"];
        assert_eq!(list.origin, Some(SchemaOrigin::Response));
        assert_eq!(list.items.as_ref().unwrap().ref_name(), Some("ListUsersResponseItem"));
        assert_eq!(
            doc.components.schemas["ListUsersResponseItem"].origin,
            Some(SchemaOrigin::Response)
        );
    }

    #[test]
    fn test_clashing_names_get_suffix() {
        let doc = normalized(
            r##"{
            "openapi": "3.0.0",
            "info": {"title": "Test"},
            "paths": {
                "/a": {"post": {"operationId": "send", "requestBody": {"content": {"application/json": {"schema": {
                    "title": "Payload", "type": "object", "properties": {"a": {"type": "string"}}
                }}}}}},
                "/b": {"post": {"operationId": "send2", "requestBody": {"content": {"application/json": {"schema": {
                    "title": "Payload", "type": "object", "properties": {"b": {"type": "string"}}
                }}}}}}
            }
        }"##,
        );

        assert_eq!(body_ref(&doc, "/a").as_deref(), Some("Payload"));
        assert_eq!(body_ref(&doc, "/b").as_deref(), Some("Payload2"));
    }

    #[test]
    fn test_unnamed_inline_schema_fails() {
        let mut doc = OpenApiDocument::parse(
            r##"{
            "openapi": "3.0.0",
            "info": {"title": "Test"},
            "paths": {"/things": {"post": {"requestBody": {"content": {"application/json": {"schema": {
                "type": "object", "properties": {"a": {"type": "string"}}
            }}}}}}}
        }"##,
        )
        .unwrap();

        let err = normalize_document(&mut doc).unwrap_err();
        assert!(
            matches!(err, SdkGenError::SchemaNaming { ref location, .. } if location == "POST /things")
        );
    }

    #[test]
    fn test_unresolved_reference_fails() {
        let mut doc = OpenApiDocument::parse(
            r##"{
            "openapi": "3.0.0",
            "info": {"title": "Test"},
            "paths": {},
            "components": {"schemas": {
                "User": {"type": "object", "properties": {"team": {"$ref": "#/components/schemas/Team"}}}
            }}
        }"##,
        )
        .unwrap();

        let err = normalize_document(&mut doc).unwrap_err();
        match err {
            SdkGenError::UnresolvedReference { reference, location } => {
                assert_eq!(reference, "#/components/schemas/Team");
                assert_eq!(location, "components.schemas.User.properties.team");
            }
            other => unreachable!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_inline_body_reuses_matching_component() {
        let doc = normalized(
            r##"{
            "openapi": "3.0.0",
            "info": {"title": "Test"},
            "paths": {"/pets": {"post": {"operationId": "addPet", "requestBody": {"content": {"application/json": {"schema": {
                "type": "object", "properties": {"name": {"type": "string"}}
            }}}}}}},
            "components": {"schemas": {
                "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
            }}
        }"##,
        );

        assert_eq!(doc.components.schemas.len(), 1);
        assert_eq!(body_ref(&doc, "/pets").as_deref(), Some("Pet"));
    }
}
