//! One Request class per endpoint.

use tracing::debug;

use super::plan::{EndpointPlan, GenerationPlan, ParameterKind, PlannedParameter, ResourcePlan};
use super::types::{
    ClassDecl, ClassKind, InterpolationPart, PhpExpr, PhpFile, PhpMethod, PhpParam, PhpProperty,
    PhpStmt, PhpType, UseDecl, Visibility,
};
use super::{GenerationContext, doc_lines, import_class, php_type};
use crate::model::{ApiSpecification, PathSegment};

pub(crate) fn generate(
    spec: &ApiSpecification,
    plan: &GenerationPlan<'_>,
    ctx: &GenerationContext<'_>,
) -> Vec<PhpFile> {
    plan.resources
        .iter()
        .flat_map(|resource| {
            resource
                .endpoints
                .iter()
                .map(move |endpoint| (resource, endpoint))
        })
        .map(|(resource, endpoint)| generate_request(spec, resource, endpoint, ctx))
        .collect()
}

fn generate_request(
    spec: &ApiSpecification,
    resource: &ResourcePlan<'_>,
    plan: &EndpointPlan<'_>,
    ctx: &GenerationContext<'_>,
) -> PhpFile {
    let endpoint = plan.endpoint;

    let mut class = ClassDecl::new(ClassKind::Class, plan.request_class.clone());
    class.extends = Some("Request".to_string());
    class.doc = doc_lines([Some(endpoint.name.clone()), endpoint.description.clone()]);
    class.properties.push(PhpProperty {
        visibility: Visibility::Protected,
        is_static: false,
        name: "method".to_string(),
        ty: Some(PhpType::named("Method")),
        default: Some(PhpExpr::ClassConst {
            class: "Method".to_string(),
            name: endpoint.method.as_str().to_string(),
        }),
    });

    let mut file = PhpFile::new(resource.request_namespace(ctx.config), class);
    file.add_use(UseDecl::new("Saloon\\Enums\\Method"));
    file.add_use(UseDecl::new("Saloon\\Http\\Request"));

    file.class.methods.push(
        PhpMethod::new("resolveEndpoint")
            .returns(PhpType::string())
            .body(vec![PhpStmt::Return(resolve_endpoint(plan))]),
    );

    if !plan.parameters.is_empty() {
        let params = plan
            .parameters
            .iter()
            .map(|p| constructor_param(p).promoted(Visibility::Protected))
            .collect();
        file.class
            .methods
            .push(PhpMethod::new("__construct").params(params));
    }

    let body: Vec<_> = plan.parameters_of(ParameterKind::Body).collect();
    if !body.is_empty() {
        file.class.implements.push("HasBody".to_string());
        file.class.traits.push("HasJsonBody".to_string());
        file.add_use(UseDecl::new("Saloon\\Contracts\\Body\\HasBody"));
        file.add_use(UseDecl::new("Saloon\\Traits\\Body\\HasJsonBody"));
        file.class.methods.push(default_accessor("defaultBody", &body));
    }

    let query: Vec<_> = plan.parameters_of(ParameterKind::Query).collect();
    if !query.is_empty() {
        file.class.methods.push(default_accessor("defaultQuery", &query));
    }

    let headers: Vec<_> = plan.parameters_of(ParameterKind::Header).collect();
    if !headers.is_empty() {
        file.class
            .methods
            .push(default_accessor("defaultHeaders", &headers));
    }

    if let Some(method) = create_dto_from_response(spec, plan, ctx, &mut file) {
        file.class.methods.push(method);
    }

    debug!(endpoint = %endpoint.location(), class = %file.fqcn(), "Generated request.");
    file
}

/// Typed constructor/method parameter for a planned parameter.
pub(crate) fn constructor_param(planned: &PlannedParameter) -> PhpParam {
    let nullable = planned.nullable();
    let ty = php_type(&planned.parameter.ty).nullable(nullable);
    let default = match planned.default().and_then(PhpExpr::from_json) {
        Some(literal) => Some(literal),
        None if nullable => Some(PhpExpr::null()),
        None => None,
    };
    PhpParam::new(planned.variable.clone(), ty).with_default(default)
}

/// Path in substitution form: literal segments verbatim, placeholders as
/// `{$this->member}`.
fn resolve_endpoint(plan: &EndpointPlan<'_>) -> PhpExpr {
    let segments = &plan.endpoint.path_segments;
    if segments.is_empty() {
        return PhpExpr::string("/");
    }

    let mut parts: Vec<InterpolationPart> = Vec::new();
    let mut literal = String::new();
    for segment in segments {
        literal.push('/');
        match segment {
            PathSegment::Literal(text) => literal.push_str(text),
            PathSegment::Placeholder(name) => {
                let property = plan
                    .parameters_of(ParameterKind::Path)
                    .find(|p| placeholder_matches(p, name))
                    .map_or_else(|| name.clone(), |p| p.variable.clone());
                parts.push(InterpolationPart::Literal(std::mem::take(&mut literal)));
                parts.push(InterpolationPart::Property {
                    source: name.clone(),
                    property,
                });
            }
        }
    }
    if !literal.is_empty() {
        parts.push(InterpolationPart::Literal(literal));
    }

    if parts.len() == 1
        && let Some(InterpolationPart::Literal(text)) = parts.first()
    {
        return PhpExpr::string(text.clone());
    }
    PhpExpr::Interpolated(parts)
}

fn placeholder_matches(planned: &PlannedParameter, placeholder: &str) -> bool {
    planned.parameter.name == placeholder
        || planned.variable == crate::naming::camel_case(placeholder)
}

/// `return array_filter([...], fn ($value) => $value !== null);`
fn default_accessor(name: &str, parameters: &[&PlannedParameter]) -> PhpMethod {
    let entries = parameters
        .iter()
        .map(|p| (PhpExpr::string(p.wire_name()), PhpExpr::this_prop(p.variable.clone())))
        .collect();
    let filtered = PhpExpr::Call {
        function: "array_filter".to_string(),
        args: vec![
            PhpExpr::Array(entries),
            PhpExpr::ArrowFn {
                params: vec![PhpParam::untyped("value")],
                body: Box::new(PhpExpr::NotIdentical(
                    Box::new(PhpExpr::var("value")),
                    Box::new(PhpExpr::null()),
                )),
            },
        ],
    };
    PhpMethod::new(name)
        .visibility(Visibility::Protected)
        .returns(PhpType::array())
        .body(vec![PhpStmt::Return(filtered)])
}

/// Map the first successful response to its Dto/Response class.
fn create_dto_from_response(
    spec: &ApiSpecification,
    plan: &EndpointPlan<'_>,
    ctx: &GenerationContext<'_>,
    file: &mut PhpFile,
) -> Option<PhpMethod> {
    let schema_name = plan.endpoint.success_schema()?;
    let (class, is_list) = match ctx.schema_class(schema_name) {
        Some(class) => (class, false),
        None => {
            let item = spec
                .components
                .schemas
                .get(schema_name)
                .and_then(|schema| schema.item_schema_name())
                .and_then(|item| ctx.schema_class(item))?;
            (item, true)
        }
    };

    file.add_use(UseDecl::new("Saloon\\Http\\Response"));
    let class_name = import_class(file, class, "Dto");
    let json = PhpExpr::MethodCall {
        object: Box::new(PhpExpr::var("response")),
        method: "json".to_string(),
        args: Vec::new(),
    };

    let returned = if is_list {
        PhpExpr::Call {
            function: "array_map".to_string(),
            args: vec![
                PhpExpr::ArrowFn {
                    params: vec![PhpParam::new("item", PhpType::array())],
                    body: Box::new(PhpExpr::StaticCall {
                        class: class_name,
                        method: "fromArray".to_string(),
                        args: vec![PhpExpr::var("item")],
                    }),
                },
                json,
            ],
        }
    } else {
        PhpExpr::StaticCall {
            class: class_name,
            method: "fromArray".to_string(),
            args: vec![json],
        }
    };

    Some(
        PhpMethod::new("createDtoFromResponse")
            .params(vec![PhpParam::new("response", PhpType::named("Response"))])
            .returns(PhpType::mixed())
            .body(vec![PhpStmt::Return(returned)]),
    )
}
