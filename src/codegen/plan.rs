//! Naming plan for the client layers.
//!
//! Requests, resources and the connector all refer to the same method names,
//! request class names and parameter lists. They are decided once here, in
//! input order, so every cross-reference between those artifacts agrees.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CollisionKind, IdentifierCollision};
use crate::model::{ApiSpecification, Endpoint, ParamType, Parameter};
use crate::naming::{NameCache, is_type_annotation};
use crate::parsers::is_literal_default;

use super::GenerationContext;

/// Class names already imported into request and resource files.
const IMPORTED_NAMES: &[&str] = &["Request", "Response", "Method", "HasBody", "HasJsonBody"];

/// Where a parameter travels in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Path,
    Body,
    Query,
    Header,
}

/// A parameter with its generated variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedParameter {
    pub kind: ParameterKind,
    pub variable: String,
    pub parameter: Parameter,
}

impl PlannedParameter {
    /// Path members are always required.
    pub fn nullable(&self) -> bool {
        self.kind != ParameterKind::Path && self.parameter.nullable
    }

    /// Wire name used as the array key in default accessors.
    pub fn wire_name(&self) -> &str {
        &self.parameter.name
    }

    /// Literal default, if the source supplied a usable one.
    pub fn default(&self) -> Option<&serde_json::Value> {
        self.parameter.default.as_ref().filter(|v| is_literal_default(v))
    }
}

/// One endpoint with its decided identifiers.
#[derive(Debug, Clone)]
pub struct EndpointPlan<'a> {
    pub endpoint: &'a Endpoint,
    pub method_name: String,
    pub request_class: String,
    /// Path, body, query, header, in that order.
    pub parameters: Vec<PlannedParameter>,
}

impl EndpointPlan<'_> {
    pub fn parameters_of(&self, kind: ParameterKind) -> impl Iterator<Item = &PlannedParameter> {
        self.parameters.iter().filter(move |p| p.kind == kind)
    }
}

/// One collection and its endpoints.
#[derive(Debug, Clone)]
pub struct ResourcePlan<'a> {
    pub class_name: String,
    /// Collection label the class name was derived from.
    pub label: String,
    pub endpoints: Vec<EndpointPlan<'a>>,
}

impl ResourcePlan<'_> {
    pub fn request_namespace(&self, config: &Config) -> String {
        format!("{}\\{}", config.request_namespace(), self.class_name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationPlan<'a> {
    /// Resources in first-seen collection order.
    pub resources: Vec<ResourcePlan<'a>>,
    pub collisions: Vec<IdentifierCollision>,
}

/// Group endpoints into resources and assign collision-free names.
pub fn build<'a>(spec: &'a ApiSpecification, ctx: &mut GenerationContext<'_>) -> GenerationPlan<'a> {
    let config = ctx.config;
    let fixed = ctx.fixed_classes();
    let names = &mut ctx.names;

    let mut resources: IndexMap<String, ResourceBuilder<'a>> = IndexMap::new();
    let mut collisions = Vec::new();

    for endpoint in &spec.endpoints {
        let label = endpoint
            .collection
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(config.fallback_resource_name.as_str())
            .to_string();
        let mut class_name = names.to_class_name(&label, "Resource");
        if fixed.contains(&format!("{}\\{class_name}", config.resource_namespace())) {
            class_name.push_str("Resource");
        }
        let resource = resources
            .entry(class_name.clone())
            .or_insert_with(|| ResourceBuilder::new(class_name, label));

        let source_name = if endpoint.name.trim().is_empty() {
            endpoint.fallback_name()
        } else {
            endpoint.name.clone()
        };
        let wanted = names.to_variable_name(&source_name);
        let method_name = resource.claim_method(&wanted);
        if method_name != wanted {
            warn!(
                resource = %resource.class_name,
                endpoint = %endpoint.location(),
                original = %wanted,
                substituted = %method_name,
                "Method name already taken, using alternate."
            );
            collisions.push(IdentifierCollision {
                kind: CollisionKind::Method,
                resource: resource.class_name.clone(),
                endpoint: source_name.clone(),
                original: wanted,
                substituted: method_name.clone(),
            });
        }

        let request_class = resource.claim_request_class(names.to_class_name(&method_name, "Request"));
        let planned = plan_parameters(endpoint, config, names);
        for (original, substituted) in planned.renamed {
            warn!(
                request = %request_class,
                endpoint = %endpoint.location(),
                original = %original,
                substituted = %substituted,
                "Parameter variable already taken, using alternate."
            );
            collisions.push(IdentifierCollision {
                kind: CollisionKind::Parameter,
                resource: request_class.clone(),
                endpoint: source_name.clone(),
                original,
                substituted,
            });
        }
        let parameters = planned.items;
        debug!(
            endpoint = %endpoint.location(),
            method = %method_name,
            request = %request_class,
            parameters = parameters.len(),
            "Planned endpoint."
        );

        resource.endpoints.push(EndpointPlan {
            endpoint,
            method_name,
            request_class,
            parameters,
        });
    }

    GenerationPlan {
        resources: resources.into_values().map(ResourceBuilder::finish).collect(),
        collisions,
    }
}

struct ResourceBuilder<'a> {
    class_name: String,
    label: String,
    endpoints: Vec<EndpointPlan<'a>>,
    methods: HashSet<String>,
    request_classes: HashSet<String>,
}

impl<'a> ResourceBuilder<'a> {
    fn new(class_name: String, label: String) -> Self {
        Self {
            class_name,
            label,
            endpoints: Vec::new(),
            methods: HashSet::new(),
            request_classes: HashSet::new(),
        }
    }

    fn claim_method(&mut self, wanted: &str) -> String {
        claim_variable(&mut self.methods, wanted)
    }

    fn claim_request_class(&mut self, wanted: String) -> String {
        let mut base = wanted;
        if IMPORTED_NAMES.contains(&base.as_str()) {
            base.push_str("Request");
        }
        let mut name = base.clone();
        let mut n = 2;
        while self.request_classes.contains(&name) {
            name = format!("{base}{n}");
            n += 1;
        }
        self.request_classes.insert(name.clone());
        name
    }

    fn finish(self) -> ResourcePlan<'a> {
        ResourcePlan {
            class_name: self.class_name,
            label: self.label,
            endpoints: self.endpoints,
        }
    }
}

/// Ordered, filtered parameter list of one endpoint.
///
/// Path members follow placeholder order and are never filtered. A
/// placeholder without a declared parameter gets an implicit string member.
///
/// Members whose variable name is already taken are renamed
/// `{variable}Duplicate{n}`; the renames are returned alongside.
fn plan_parameters(endpoint: &Endpoint, config: &Config, names: &mut NameCache) -> ParameterList {
    let mut planned = ParameterList::default();

    for placeholder in endpoint.placeholders() {
        let variable = names.to_variable_name(placeholder);
        let declared = endpoint
            .path_parameters
            .iter()
            .find(|p| names.to_variable_name(&p.name) == variable)
            .cloned();
        let parameter = declared.unwrap_or_else(|| Parameter::new(placeholder, ParamType::String));
        planned.push(ParameterKind::Path, variable, parameter);
    }
    for parameter in &endpoint.path_parameters {
        let variable = names.to_variable_name(&parameter.name);
        if !planned.variables.contains(&variable) {
            planned.push(ParameterKind::Path, variable, parameter.clone());
        }
    }

    let lists = [
        (ParameterKind::Body, &endpoint.body_parameters),
        (ParameterKind::Query, &endpoint.query_parameters),
        (ParameterKind::Header, &endpoint.header_parameters),
    ];
    for (kind, parameters) in lists {
        for parameter in parameters {
            let ignored = match kind {
                ParameterKind::Body => config.is_ignored_body(&parameter.name),
                ParameterKind::Query => config.is_ignored_query(&parameter.name),
                ParameterKind::Header => config.is_ignored_header(&parameter.name),
                ParameterKind::Path => false,
            };
            if ignored || is_type_annotation(&parameter.name) {
                continue;
            }
            let variable = names.to_variable_name(&parameter.name);
            planned.push(kind, variable, parameter.clone());
        }
    }

    planned
}

#[derive(Debug, Default)]
struct ParameterList {
    items: Vec<PlannedParameter>,
    variables: HashSet<String>,
    /// `(original, substituted)` variable names.
    renamed: Vec<(String, String)>,
}

impl ParameterList {
    fn push(&mut self, kind: ParameterKind, variable: String, parameter: Parameter) {
        let claimed = claim_variable(&mut self.variables, &variable);
        if claimed != variable {
            self.renamed.push((variable, claimed.clone()));
        }
        self.items.push(PlannedParameter {
            kind,
            variable: claimed,
            parameter,
        });
    }
}

/// `wanted`, or `{wanted}Duplicate{n}` with the lowest free `n`, marked taken.
pub(crate) fn claim_variable(taken: &mut HashSet<String>, wanted: &str) -> String {
    let mut name = wanted.to_string();
    let mut n = 1;
    while taken.contains(&name) {
        name = format!("{wanted}Duplicate{n}");
        n += 1;
    }
    taken.insert(name.clone());
    name
}
