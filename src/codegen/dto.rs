//! Dto and Response classes for the named schema table.
//!
//! Each object schema becomes one class whose promoted constructor members
//! mirror its properties. Object-typed members point at the member schema's
//! own class, so a self-referential schema produces exactly one class naming
//! itself. Scalar and array-of-scalar entries produce nothing.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::types::{
    ClassDecl, ClassKind, PhpExpr, PhpFile, PhpMethod, PhpParam, PhpProperty, PhpType, Visibility,
};
use super::plan::claim_variable;
use super::{ClassRef, GenerationContext, doc_lines, import_base, import_class, php_type, support};
use crate::error::{CollisionKind, IdentifierCollision};
use crate::model::{ApiSpecification, ParamType, Schema};

/// Assign a class to every object schema before any file is built, so
/// members can name classes of schemas declared later in the table.
pub(crate) fn register_classes(spec: &ApiSpecification, ctx: &mut GenerationContext<'_>) {
    let config = ctx.config;
    let fixed = ctx.fixed_classes();
    let mut taken: HashSet<String> = HashSet::new();

    for (name, schema) in &spec.components.schemas {
        if !schema.is_object() {
            debug!(schema = %name, "Schema has no members, no class generated.");
            continue;
        }
        let namespace = if spec.components.is_response_schema(name) {
            config.response_namespace()
        } else {
            config.dto_namespace()
        };

        let base = ctx.names.to_class_name(name, "Dto");
        let mut class_name = base.clone();
        let mut n = 2;
        while taken.contains(&class_name)
            || fixed.contains(&format!("{namespace}\\{class_name}"))
        {
            class_name = format!("{base}{n}");
            n += 1;
        }
        taken.insert(class_name.clone());

        ctx.register_schema_class(
            name.clone(),
            ClassRef {
                namespace,
                name: class_name,
            },
        );
    }
}

/// Build the registered classes, split into (Dto, Response) lists.
pub(crate) fn generate(
    spec: &ApiSpecification,
    ctx: &mut GenerationContext<'_>,
) -> (Vec<PhpFile>, Vec<PhpFile>) {
    let registered: Vec<(String, ClassRef)> = ctx
        .schema_classes()
        .map(|(schema, class)| (schema.clone(), class.clone()))
        .collect();

    let mut dtos = Vec::new();
    let mut responses = Vec::new();
    for (schema_name, class) in registered {
        let Some(schema) = spec.components.schemas.get(&schema_name) else {
            continue;
        };
        let file = generate_class(spec, &schema_name, schema, &class, ctx);
        if spec.components.is_response_schema(&schema_name) {
            responses.push(file);
        } else {
            dtos.push(file);
        }
    }
    (dtos, responses)
}

/// How a member is typed and deserialized.
struct MemberType {
    ty: PhpType,
    /// Single nested Dto.
    cast: Option<ClassRef>,
    /// List of nested Dtos.
    list_cast: Option<ClassRef>,
}

impl MemberType {
    fn plain(ty: PhpType) -> Self {
        Self {
            ty,
            cast: None,
            list_cast: None,
        }
    }
}

fn generate_class(
    spec: &ApiSpecification,
    schema_name: &str,
    schema: &Schema,
    class: &ClassRef,
    ctx: &mut GenerationContext<'_>,
) -> PhpFile {
    let mut decl = ClassDecl::new(ClassKind::Class, class.name.clone());
    decl.doc = doc_lines([schema.description.clone()]);
    let mut file = PhpFile::new(class.namespace.clone(), decl);
    let base = import_base(&mut file, &support::dto_base_fqcn(ctx.config), "BaseDto");
    file.class.extends = Some(base);

    let mut params = Vec::new();
    let mut field_map = Vec::new();
    let mut casts = Vec::new();
    let mut list_casts = Vec::new();
    let mut variables = HashSet::new();

    for (property, member) in &schema.properties {
        let wanted = ctx.names.to_variable_name(property);
        let variable = claim_variable(&mut variables, &wanted);
        if variable != wanted {
            warn!(
                schema = %schema_name,
                property = %property,
                original = %wanted,
                substituted = %variable,
                "Property variable already taken, using alternate."
            );
            ctx.record_collision(IdentifierCollision {
                kind: CollisionKind::Property,
                resource: class.name.clone(),
                endpoint: schema_name.to_string(),
                original: wanted,
                substituted: variable.clone(),
            });
        }
        let resolved = member_type(spec, member, ctx);
        let nullable = member.nullable || !schema.is_property_required(property);

        let mut doc = vec![member.description.clone()];
        if !member.enum_values.is_empty() {
            let allowed: Vec<String> = member.enum_values.iter().map(|v| v.to_string()).collect();
            doc.push(Some(format!("Allowed values: {}", allowed.join(", "))));
        }

        let mut ty = resolved.ty;
        if let Some(cast) = &resolved.cast {
            let short = import_class(&mut file, cast, "Dto");
            ty = PhpType::named(short.clone());
            casts.push((variable.clone(), short));
        }
        if let Some(cast) = &resolved.list_cast {
            let short = import_class(&mut file, cast, "Dto");
            doc.push(Some(format!("@var {short}[]{}", if nullable { "|null" } else { "" })));
            list_casts.push((variable.clone(), short));
        }

        let mut param = PhpParam::new(variable.clone(), ty.nullable(nullable))
            .promoted(Visibility::Public)
            .with_doc(doc_lines(doc));
        if nullable {
            param = param.with_default(Some(PhpExpr::null()));
        }
        params.push(param);
        field_map.push((property.clone(), variable));
    }

    // Required members first so optional ones may keep their null default.
    params.sort_by_key(|p| p.default.is_some());

    file.class.properties.push(static_map(
        "fieldMap",
        field_map
            .into_iter()
            .map(|(wire, variable)| (PhpExpr::string(wire), PhpExpr::string(variable)))
            .collect(),
    ));
    if !casts.is_empty() {
        file.class.properties.push(static_map("casts", class_map(casts)));
    }
    if !list_casts.is_empty() {
        file.class.properties.push(static_map("listCasts", class_map(list_casts)));
    }
    file.class.methods.push(PhpMethod::new("__construct").params(params));

    debug!(schema = %schema_name, class = %file.fqcn(), "Generated Dto.");
    file
}

/// Resolve the PHP type of one member schema.
fn member_type(spec: &ApiSpecification, member: &Schema, ctx: &GenerationContext<'_>) -> MemberType {
    match &member.ty {
        ParamType::Named(name) => {
            if let Some(class) = ctx.schema_class(name) {
                return MemberType {
                    ty: PhpType::named(class.name.clone()),
                    cast: Some(class.clone()),
                    list_cast: None,
                };
            }
            // Named alias of a scalar or list schema.
            match spec.components.schemas.get(name) {
                Some(target) if target.items.is_some() => list_type(target, ctx),
                Some(target) if !matches!(target.ty, ParamType::Named(_)) => {
                    MemberType::plain(php_type(&target.ty))
                }
                _ => MemberType::plain(PhpType::mixed()),
            }
        }
        ParamType::Array if member.items.is_some() => list_type(member, ctx),
        other => MemberType::plain(php_type(other)),
    }
}

fn list_type(schema: &Schema, ctx: &GenerationContext<'_>) -> MemberType {
    MemberType {
        ty: PhpType::array(),
        cast: None,
        list_cast: schema
            .item_schema_name()
            .and_then(|item| ctx.schema_class(item))
            .cloned(),
    }
}

fn class_map(entries: Vec<(String, String)>) -> Vec<(PhpExpr, PhpExpr)> {
    entries
        .into_iter()
        .map(|(variable, class)| {
            (
                PhpExpr::string(variable),
                PhpExpr::ClassConst {
                    class,
                    name: "class".to_string(),
                },
            )
        })
        .collect()
}

fn static_map(name: &str, entries: Vec<(PhpExpr, PhpExpr)>) -> PhpProperty {
    PhpProperty {
        visibility: Visibility::Protected,
        is_static: true,
        name: name.to_string(),
        ty: Some(PhpType::array()),
        default: Some(PhpExpr::Array(entries)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codegen::Emit;
    use crate::codegen::types::UseDecl;
    use crate::config::Config;
    use indexmap::IndexMap;
    use serde_json::json;

    fn node_schema() -> Schema {
        let mut properties = IndexMap::new();
        properties.insert("id".to_string(), Schema::scalar("id", ParamType::Int));
        properties.insert(
            "parent".to_string(),
            Schema::scalar("parent", ParamType::Named("Node".into())),
        );
        properties.insert(
            "children".to_string(),
            Schema::array(
                "children",
                Schema::scalar("items", ParamType::Named("Node".into())),
                false,
            ),
        );
        Schema::object("Node", properties, vec!["id".into()])
    }

    fn run(spec: &ApiSpecification, config: &Config) -> (Vec<PhpFile>, Vec<PhpFile>) {
        let mut ctx = GenerationContext::new(config);
        register_classes(spec, &mut ctx);
        generate(spec, &mut ctx)
    }

    #[test]
    fn test_self_referential_schema_yields_one_class() {
        let mut spec = ApiSpecification::default();
        spec.components.schemas.insert("Node".into(), node_schema());
        let config = Config::new("Acme", "App");

        let (dtos, responses) = run(&spec, &config);
        assert_eq!(dtos.len(), 1);
        assert!(responses.is_empty());

        let node = &dtos[0];
        assert_eq!(node.fqcn(), "App\\Dto\\Node");
        assert!(node.uses.iter().all(|u| u.path != "App\\Dto\\Node"));

        let php = node.emit();
        assert!(php.contains("class Node extends Dto\n"));
        assert!(php.contains("        public int $id,\n"));
        assert!(php.contains("        public ?Node $parent = null,\n"));
        assert!(php.contains("         * @var Node[]|null\n"));
        assert!(php.contains("        public ?array $children = null,\n"));
        assert!(php.contains("    protected static array $casts = ['parent' => Node::class];\n"));
        assert!(php.contains("    protected static array $listCasts = ['children' => Node::class];\n"));
    }

    #[test]
    fn test_scalar_schemas_are_skipped() {
        let mut spec = ApiSpecification::default();
        spec.components
            .schemas
            .insert("Tag".into(), Schema::scalar("Tag", ParamType::String));
        spec.components.schemas.insert(
            "Tags".into(),
            Schema::array("Tags", Schema::scalar("items", ParamType::String), false),
        );
        let config = Config::new("Acme", "App");

        let (dtos, responses) = run(&spec, &config);
        assert!(dtos.is_empty());
        assert!(responses.is_empty());
    }

    #[test]
    fn test_response_schemas_reference_dtos_across_namespaces() {
        let mut spec = ApiSpecification::default();
        let mut user = IndexMap::new();
        user.insert("user_name".to_string(), Schema::scalar("user_name", ParamType::String));
        let mut status = Schema::scalar("status", ParamType::String);
        status.enum_values = vec![json!("active"), json!("banned")];
        user.insert("status".to_string(), status);
        spec.components.schemas.insert(
            "User".into(),
            Schema::object("User", user, vec!["user_name".into(), "status".into()]),
        );

        let mut envelope = IndexMap::new();
        envelope.insert(
            "data".to_string(),
            Schema::scalar("data", ParamType::Named("User".into())),
        );
        spec.components
            .schemas
            .insert("GetUserResponse".into(), Schema::object("GetUserResponse", envelope, vec![]));
        spec.components.response_schemas.push("GetUserResponse".into());
        let config = Config::new("Acme", "App");

        let (dtos, responses) = run(&spec, &config);
        assert_eq!(dtos.len(), 1);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].fqcn(), "App\\Responses\\GetUserResponse");
        assert!(responses[0].uses.contains(&UseDecl::new("App\\Dto\\User")));

        let php = dtos[0].emit();
        assert!(php.contains("    protected static array $fieldMap = ['user_name' => 'userName', 'status' => 'status'];\n"));
        assert!(php.contains("Allowed values: \"active\", \"banned\""));
        assert!(php.contains("        public string $userName,\n"));
    }

    #[test]
    fn test_dto_named_like_base_aliases_it() {
        let mut spec = ApiSpecification::default();
        let mut properties = IndexMap::new();
        properties.insert("x".to_string(), Schema::scalar("x", ParamType::Int));
        spec.components
            .schemas
            .insert("Dto".into(), Schema::object("Dto", properties, vec![]));
        let config = Config::new("Acme", "App");

        let (dtos, _) = run(&spec, &config);
        assert_eq!(dtos[0].class.extends.as_deref(), Some("BaseDto"));
        assert!(dtos[0].uses.contains(&UseDecl::aliased("App\\Dto", "BaseDto")));
    }

    #[test]
    fn test_members_with_same_variable_are_both_kept() {
        let mut spec = ApiSpecification::default();
        let mut properties = IndexMap::new();
        properties.insert("user_id".to_string(), Schema::scalar("user_id", ParamType::Int));
        properties.insert("userId".to_string(), Schema::scalar("userId", ParamType::String));
        spec.components.schemas.insert(
            "Membership".into(),
            Schema::object("Membership", properties, vec!["user_id".into(), "userId".into()]),
        );
        let config = Config::new("Acme", "App");
        let mut ctx = GenerationContext::new(&config);
        register_classes(&spec, &mut ctx);

        let (dtos, _) = generate(&spec, &mut ctx);
        let php = dtos[0].emit();
        assert!(php.contains("        public int $userId,\n"));
        assert!(php.contains("        public string $userIdDuplicate1,\n"));
        assert!(php.contains("['user_id' => 'userId', 'userId' => 'userIdDuplicate1']"));

        assert_eq!(
            ctx.collisions,
            vec![IdentifierCollision {
                kind: CollisionKind::Property,
                resource: "Membership".into(),
                endpoint: "Membership".into(),
                original: "userId".into(),
                substituted: "userIdDuplicate1".into(),
            }]
        );
    }

    #[test]
    fn test_required_members_come_first() {
        let mut spec = ApiSpecification::default();
        let mut properties = IndexMap::new();
        properties.insert("note".to_string(), Schema::scalar("note", ParamType::String));
        properties.insert("id".to_string(), Schema::scalar("id", ParamType::Int));
        spec.components
            .schemas
            .insert("Item".into(), Schema::object("Item", properties, vec!["id".into()]));
        let config = Config::new("Acme", "App");

        let (dtos, _) = run(&spec, &config);
        let ctor = dtos[0].class.constructor().unwrap();
        let names: Vec<_> = ctor.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "note"]);
    }
}
