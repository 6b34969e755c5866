//! The connector: base URL, authentication and resource accessors.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::plan::GenerationPlan;
use super::resource::resource_class;
use super::types::{
    ClassDecl, ClassKind, InterpolationPart, PhpExpr, PhpFile, PhpMethod, PhpParam, PhpStmt,
    PhpType, UseDecl, Visibility,
};
use super::{GenerationContext, doc_lines, import_base, import_class};
use crate::error::{Result, SdkGenError};
use crate::model::{ApiKeyLocation, ApiSpecification, SecurityScheme};

/// Methods a Saloon connector already defines; accessors must not shadow them.
const CONNECTOR_METHODS: &[&str] = &[
    "authenticate",
    "boot",
    "config",
    "debug",
    "defaultAuth",
    "defaultConfig",
    "defaultHeaders",
    "defaultQuery",
    "headers",
    "middleware",
    "pool",
    "query",
    "resolveBaseUrl",
    "send",
    "sendAsync",
    "sender",
];

pub(crate) fn generate(
    spec: &ApiSpecification,
    plan: &GenerationPlan<'_>,
    ctx: &mut GenerationContext<'_>,
) -> Result<PhpFile> {
    let config = ctx.config;
    let class_name = ctx.connector_class();
    let mut file = PhpFile::new(config.namespace(), ClassDecl::new(ClassKind::Class, class_name));
    let base = import_base(&mut file, "Saloon\\Http\\Connector", "SaloonConnector");
    file.class.extends = Some(base);

    let mut params = Vec::new();
    let mut auth = Vec::new();
    let mut variables = HashSet::new();

    for requirement in &spec.security_requirements {
        let Some(scheme) = spec.components.security_schemes.get(&requirement.scheme_name) else {
            warn!(scheme = %requirement.scheme_name, "Security requirement names an undeclared scheme, skipping.");
            continue;
        };
        let SecurityScheme::ApiKey {
            name,
            location,
            description,
        } = scheme
        else {
            warn!(scheme = %requirement.scheme_name, kind = scheme.kind(), "Unsupported authentication kind, skipping.");
            continue;
        };

        let variable = ctx.names.credential_name(name);
        if !variables.insert(variable.clone()) {
            continue;
        }
        let (authenticator, args) = match location {
            ApiKeyLocation::Header => (
                "HeaderAuthenticator",
                vec![PhpExpr::this_prop(variable.clone()), PhpExpr::string(name.clone())],
            ),
            ApiKeyLocation::Query => (
                "QueryAuthenticator",
                vec![PhpExpr::string(name.clone()), PhpExpr::this_prop(variable.clone())],
            ),
            ApiKeyLocation::Cookie => {
                warn!(scheme = %requirement.scheme_name, "Cookie API keys are not supported, skipping.");
                variables.remove(&variable);
                continue;
            }
        };

        file.add_use(UseDecl::new(format!("Saloon\\Http\\Auth\\{authenticator}")));
        params.push(
            PhpParam::new(variable, PhpType::string())
                .promoted(Visibility::Protected)
                .with_doc(doc_lines([description.clone()])),
        );
        auth.push(PhpStmt::Expr(PhpExpr::MethodCall {
            object: Box::new(PhpExpr::var("this")),
            method: "authenticate".to_string(),
            args: vec![PhpExpr::New {
                class: authenticator.to_string(),
                args,
            }],
        }));
    }

    let mut members = Vec::new();
    for parameter in &spec.base_url.parameters {
        let variable = ctx.names.to_variable_name(&parameter.name);
        members.push((parameter.name.clone(), variable.clone()));
        if !variables.insert(variable.clone()) {
            continue;
        }
        params.push(
            PhpParam::new(variable, PhpType::string())
                .promoted(Visibility::Protected)
                .with_default(parameter.default.clone().map(PhpExpr::string))
                .with_doc(doc_lines([parameter.description.clone()])),
        );
    }
    params.sort_by_key(|p| p.default.is_some());

    if !params.is_empty() {
        file.class
            .methods
            .push(PhpMethod::new("__construct").params(params).body(auth));
    }

    file.class.methods.push(
        PhpMethod::new("resolveBaseUrl")
            .returns(PhpType::string())
            .body(vec![PhpStmt::Return(render_base_url(&spec.base_url.url, &members)?)]),
    );

    file.class.methods.push(
        PhpMethod::new("defaultHeaders")
            .visibility(Visibility::Protected)
            .returns(PhpType::array())
            .body(vec![PhpStmt::Return(PhpExpr::Array(vec![
                (PhpExpr::string("Accept"), PhpExpr::string("application/json")),
                (PhpExpr::string("Content-Type"), PhpExpr::string("application/json")),
            ]))]),
    );

    let mut resources: Vec<_> = plan
        .resources
        .iter()
        .map(|resource| resource_class(resource, ctx))
        .collect();
    resources.sort_by(|a, b| a.name.cmp(&b.name));
    resources.dedup_by(|a, b| a.name == b.name);

    for resource in &resources {
        let mut method_name = ctx.names.to_variable_name(&resource.name);
        if CONNECTOR_METHODS.contains(&method_name.as_str()) {
            method_name.push_str("Resource");
        }
        let class = import_class(&mut file, resource, "Resource");
        file.class.methods.push(
            PhpMethod::new(method_name)
                .returns(PhpType::named(class.clone()))
                .body(vec![PhpStmt::Return(PhpExpr::New {
                    class,
                    args: vec![PhpExpr::var("this")],
                })]),
        );
    }

    debug!(class = %file.fqcn(), resources = resources.len(), "Generated connector.");
    Ok(file)
}

/// Render a base-URL template such as `https://{region}.example.com`.
///
/// `members` maps each `{token}` to the connector property substituted for
/// it. A token with no entry is a [`SdkGenError::Templating`] error.
pub fn render_base_url(template: &str, members: &[(String, String)]) -> Result<PhpExpr> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        literal.push_str(&rest[..open]);
        let token = &rest[open + 1..close];
        let property = members
            .iter()
            .find(|(name, _)| name == token)
            .map(|(_, property)| property.clone())
            .ok_or_else(|| SdkGenError::Templating {
                template: template.to_string(),
                token: token.to_string(),
            })?;
        if !literal.is_empty() {
            parts.push(InterpolationPart::Literal(std::mem::take(&mut literal)));
        }
        parts.push(InterpolationPart::Property {
            source: token.to_string(),
            property,
        });
        rest = &rest[close + 1..];
    }
    literal.push_str(rest);

    if parts.is_empty() {
        return Ok(PhpExpr::string(literal));
    }
    if !literal.is_empty() {
        parts.push(InterpolationPart::Literal(literal));
    }
    Ok(PhpExpr::Interpolated(parts))
}
