//! Code generation from the API model to PHP artifacts.
//!
//! This module defines a three-layer architecture:
//! 1. Plan: endpoint naming, collision handling and parameter order (`plan`)
//! 2. Generators: model + plan -> PHP AST, one module per artifact kind
//! 3. Emission: PHP AST -> source text via the `Emit` trait (`emit`)
//!
//! ## Module Structure
//!
//! - `types`: PHP AST (PhpFile, ClassDecl, PhpMethod, PhpExpr, ...)
//! - `plan`: per-run naming plan shared by the request/resource/connector stages
//! - `support`: fixed base classes, contracts and traits
//! - `dto`: Dto and Response classes for named object schemas
//! - `request`, `resource`, `connector`: the client layers
//! - `emit`: AST -> code strings

mod connector;
mod dto;
pub mod emit;
pub mod plan;
mod request;
mod resource;
mod support;
pub mod types;

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::info;

use crate::config::Config;
use crate::error::{IdentifierCollision, Result};
use crate::model::{ApiSpecification, ParamType};
use crate::naming::NameCache;

pub use connector::render_base_url;
pub use emit::Emit;
pub use types::PhpFile;

use self::types::{PhpType, UseDecl};

/// Every artifact produced by one generation run.
#[derive(Debug, Clone)]
pub struct GeneratedCode {
    pub connector_class: PhpFile,
    pub resource_base_class: PhpFile,
    /// Dto base class, deserialization contract and field-map trait.
    pub support_classes: Vec<PhpFile>,
    pub dto_classes: Vec<PhpFile>,
    pub response_classes: Vec<PhpFile>,
    pub request_classes: Vec<PhpFile>,
    pub resource_classes: Vec<PhpFile>,
    /// Method, parameter and property names replaced because they were already taken.
    pub collisions: Vec<IdentifierCollision>,
}

impl GeneratedCode {
    /// All artifacts in generation order.
    pub fn all_files(&self) -> impl Iterator<Item = &PhpFile> {
        std::iter::once(&self.resource_base_class)
            .chain(&self.support_classes)
            .chain(&self.dto_classes)
            .chain(&self.response_classes)
            .chain(&self.request_classes)
            .chain(&self.resource_classes)
            .chain(std::iter::once(&self.connector_class))
    }

    /// Look up an artifact by fully-qualified class name.
    pub fn find(&self, fqcn: &str) -> Option<&PhpFile> {
        self.all_files().find(|file| file.fqcn() == fqcn)
    }
}

/// A generated class known to other stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRef {
    pub namespace: String,
    pub name: String,
}

impl ClassRef {
    pub fn fqcn(&self) -> String {
        format!("{}\\{}", self.namespace, self.name)
    }
}

/// Run-scoped state shared by all generators.
///
/// Owns the name cache, so two runs never share identifier translations.
#[derive(Debug)]
pub struct GenerationContext<'a> {
    pub config: &'a Config,
    pub names: NameCache,
    schema_classes: IndexMap<String, ClassRef>,
    collisions: Vec<IdentifierCollision>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            names: NameCache::new(),
            schema_classes: IndexMap::new(),
            collisions: Vec::new(),
        }
    }

    /// The Dto/Response class generated for a schema table entry.
    pub fn schema_class(&self, schema: &str) -> Option<&ClassRef> {
        self.schema_classes.get(schema)
    }

    pub(crate) fn register_schema_class(&mut self, schema: String, class: ClassRef) {
        self.schema_classes.insert(schema, class);
    }

    /// Connector class name, decided once per run.
    pub(crate) fn connector_class(&mut self) -> String {
        self.names.to_class_name(&self.config.connector_name, "Connector")
    }

    /// Classes every run declares at fixed names: base classes and the connector.
    pub(crate) fn fixed_classes(&mut self) -> HashSet<String> {
        let class = self.connector_class();
        let connector = format!("{}\\{class}", self.config.namespace());
        support::fixed_fqcns(self.config)
            .into_iter()
            .chain(std::iter::once(connector))
            .collect()
    }

    pub(crate) fn record_collision(&mut self, collision: IdentifierCollision) {
        self.collisions.push(collision);
    }

    pub(crate) fn schema_classes(&self) -> impl Iterator<Item = (&String, &ClassRef)> {
        self.schema_classes.iter()
    }
}

/// Generate every artifact for `spec`.
///
/// Stages run in dependency order: support files, Dto/Response classes,
/// requests, resources and finally the connector.
pub fn generate(spec: &ApiSpecification, config: &Config) -> Result<GeneratedCode> {
    config.validate()?;
    let mut ctx = GenerationContext::new(config);

    let support = support::generate(&ctx);

    dto::register_classes(spec, &mut ctx);
    let (dto_classes, response_classes) = dto::generate(spec, &mut ctx);

    let plan = plan::build(spec, &mut ctx);
    let request_classes = request::generate(spec, &plan, &ctx);
    let resource_classes = resource::generate(&plan, &ctx);
    let connector_class = connector::generate(spec, &plan, &mut ctx)?;

    let mut collisions = std::mem::take(&mut ctx.collisions);
    collisions.extend(plan.collisions);

    info!(
        requests = request_classes.len(),
        resources = resource_classes.len(),
        dtos = dto_classes.len() + response_classes.len(),
        collisions = collisions.len(),
        "Generated SDK."
    );

    Ok(GeneratedCode {
        connector_class,
        resource_base_class: support.resource_base,
        support_classes: support.others,
        dto_classes,
        response_classes,
        request_classes,
        resource_classes,
        collisions,
    })
}

/// PHP type of a request-level parameter.
pub(crate) fn php_type(ty: &ParamType) -> PhpType {
    match ty {
        ParamType::String => PhpType::string(),
        ParamType::Int => PhpType::named("int"),
        ParamType::Float => PhpType::named("float"),
        ParamType::Number => PhpType::Union(vec![PhpType::named("float"), PhpType::named("int")]),
        ParamType::Bool => PhpType::named("bool"),
        ParamType::Array | ParamType::Named(_) => PhpType::array(),
        ParamType::Mixed => PhpType::mixed(),
    }
}

/// Import `base_fqcn` into `file` and return the name to extend it by.
///
/// A class sharing the base's short name imports it under `alias`.
pub(crate) fn import_base(file: &mut PhpFile, base_fqcn: &str, alias: &str) -> String {
    let short = base_fqcn.rsplit('\\').next().unwrap_or(base_fqcn);
    if file.class.name == short {
        file.add_use(UseDecl::aliased(base_fqcn, alias));
        alias.to_string()
    } else {
        file.add_use(UseDecl::new(base_fqcn));
        short.to_string()
    }
}

/// Import a generated class into `file` and return the name to refer to it by.
///
/// A short name already taken by the file's own class or another import is
/// aliased as `{Name}{alias_suffix}`.
pub(crate) fn import_class(file: &mut PhpFile, class: &ClassRef, alias_suffix: &str) -> String {
    if class.namespace == file.namespace && class.name == file.class.name {
        return class.name.clone();
    }
    let fqcn = class.fqcn();
    if let Some(existing) = file.uses.iter().find(|u| u.path == fqcn) {
        return existing.alias.clone().unwrap_or_else(|| class.name.clone());
    }

    let taken = class.name == file.class.name
        || file.uses.iter().any(|u| {
            let visible = u
                .alias
                .as_deref()
                .unwrap_or_else(|| u.path.rsplit('\\').next().unwrap_or(&u.path));
            visible == class.name
        });
    if taken {
        let alias = format!("{}{alias_suffix}", class.name);
        file.add_use(UseDecl::aliased(fqcn, alias.clone()));
        alias
    } else {
        file.add_use(UseDecl::new(fqcn));
        class.name.clone()
    }
}

/// Join non-empty doc lines into one docblock body.
pub(crate) fn doc_lines(lines: impl IntoIterator<Item = Option<String>>) -> Option<String> {
    let lines: Vec<String> = lines
        .into_iter()
        .flatten()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n\n"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codegen::types::{ClassDecl, ClassKind};
    use crate::model::{Endpoint, HttpMethod};

    #[test]
    fn test_import_base_aliases_same_name() {
        let mut file = PhpFile::new("App\\Resource", ClassDecl::new(ClassKind::Class, "Resource"));
        assert_eq!(import_base(&mut file, "App\\Resource", "BaseResource"), "BaseResource");
        assert_eq!(file.uses, vec![UseDecl::aliased("App\\Resource", "BaseResource")]);

        let mut file = PhpFile::new("App\\Resource", ClassDecl::new(ClassKind::Class, "Users"));
        assert_eq!(import_base(&mut file, "App\\Resource", "BaseResource"), "Resource");
    }

    #[test]
    fn test_generate_orders_stages() {
        let mut spec = ApiSpecification::default();
        spec.base_url.url = "https://api.test".into();
        spec.endpoints.push(Endpoint::new("List users", HttpMethod::Get, "/users"));
        let config = Config::new("Acme", "App\\Sdk");

        let generated = generate(&spec, &config).unwrap();
        let names: Vec<_> = generated.all_files().map(PhpFile::fqcn).collect();
        assert_eq!(names.first().map(String::as_str), Some("App\\Sdk\\Resource"));
        assert_eq!(names.last().map(String::as_str), Some("App\\Sdk\\Acme"));
        assert!(generated.find("App\\Sdk\\Requests\\Misc\\ListUsers").is_some());
        assert!(generated.find("App\\Sdk\\Resource\\Misc").is_some());
    }

    #[test]
    fn test_generated_classes_never_shadow_fixed_ones() {
        let mut spec = ApiSpecification::default();
        let mut properties = IndexMap::new();
        properties.insert("id".to_string(), crate::model::Schema::scalar("id", ParamType::Int));
        for name in ["Dto", "Acme"] {
            spec.components.schemas.insert(
                name.to_string(),
                crate::model::Schema::object(name, properties.clone(), vec![]),
            );
        }
        let mut endpoint = Endpoint::new("List users", HttpMethod::Get, "/users");
        endpoint.collection = Some("Resource".into());
        spec.endpoints.push(endpoint);

        let mut config = Config::new("Acme", "App");
        config.dto_namespace_suffix = String::new();
        config.resource_namespace_suffix = String::new();

        let generated = generate(&spec, &config).unwrap();
        let mut names: Vec<_> = generated.all_files().map(PhpFile::fqcn).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);

        let dtos: Vec<_> = generated.dto_classes.iter().map(|f| f.class.name.as_str()).collect();
        assert_eq!(dtos, vec!["Dto2", "Acme2"]);
        assert!(generated.find("App\\ResourceResource").is_some());
        assert!(generated.connector_class.emit().contains("return new ResourceResource($this);"));
    }

    #[test]
    fn test_connector_named_like_base_class_is_rejected() {
        let config = Config::new("Resource", "App");
        let err = generate(&ApiSpecification::default(), &config).unwrap_err();
        assert!(matches!(err, crate::error::SdkGenError::Config { ref key, .. } if key == "connectorName"));
    }

    #[test]
    fn test_import_class_aliases_taken_names() {
        let mut file = PhpFile::new("App\\Requests\\Users", ClassDecl::new(ClassKind::Class, "GetUser"));
        file.add_use(UseDecl::new("Saloon\\Http\\Response"));

        let dto = ClassRef {
            namespace: "App\\Dto".into(),
            name: "Response".into(),
        };
        assert_eq!(import_class(&mut file, &dto, "Dto"), "ResponseDto");
        assert_eq!(import_class(&mut file, &dto, "Dto"), "ResponseDto");

        let user = ClassRef {
            namespace: "App\\Dto".into(),
            name: "User".into(),
        };
        assert_eq!(import_class(&mut file, &user, "Dto"), "User");
        assert_eq!(file.uses.len(), 3);
    }

    #[test]
    fn test_php_types() {
        assert_eq!(php_type(&ParamType::Number).emit(), "float|int");
        assert_eq!(php_type(&ParamType::Named("User".into())).emit(), "array");
    }
}
