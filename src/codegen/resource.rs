//! One Resource class per collection.
//!
//! Each method takes the endpoint's parameters in plan order and sends the
//! matching Request through the connector.

use tracing::debug;

use super::plan::{GenerationPlan, ResourcePlan};
use super::request::constructor_param;
use super::types::{ClassDecl, ClassKind, PhpExpr, PhpFile, PhpMethod, PhpStmt, PhpType, UseDecl};
use super::{ClassRef, GenerationContext, doc_lines, import_base, import_class, support};

pub(crate) fn generate(plan: &GenerationPlan<'_>, ctx: &GenerationContext<'_>) -> Vec<PhpFile> {
    plan.resources
        .iter()
        .map(|resource| generate_resource(resource, ctx))
        .collect()
}

/// Fully-qualified class of a resource.
pub(crate) fn resource_class(resource: &ResourcePlan<'_>, ctx: &GenerationContext<'_>) -> ClassRef {
    ClassRef {
        namespace: ctx.config.resource_namespace(),
        name: resource.class_name.clone(),
    }
}

fn generate_resource(resource: &ResourcePlan<'_>, ctx: &GenerationContext<'_>) -> PhpFile {
    let class = resource_class(resource, ctx);
    let mut file = PhpFile::new(class.namespace, ClassDecl::new(ClassKind::Class, class.name));
    let base = import_base(&mut file, &support::resource_base_fqcn(ctx.config), "BaseResource");
    file.class.extends = Some(base);
    file.add_use(UseDecl::new("Saloon\\Http\\Response"));

    let request_namespace = resource.request_namespace(ctx.config);
    for endpoint in &resource.endpoints {
        let request = ClassRef {
            namespace: request_namespace.clone(),
            name: endpoint.request_class.clone(),
        };
        let request_name = import_class(&mut file, &request, "Request");

        let params = endpoint.parameters.iter().map(constructor_param).collect();
        let args = endpoint
            .parameters
            .iter()
            .map(|p| PhpExpr::var(p.variable.clone()))
            .collect();
        let send = PhpExpr::MethodCall {
            object: Box::new(PhpExpr::this_prop("connector")),
            method: "send".to_string(),
            args: vec![PhpExpr::New {
                class: request_name,
                args,
            }],
        };

        file.class.methods.push(
            PhpMethod::new(endpoint.method_name.clone())
                .params(params)
                .returns(PhpType::named("Response"))
                .body(vec![PhpStmt::Return(send)])
                .with_doc(doc_lines([endpoint.endpoint.description.clone()])),
        );
    }

    debug!(resource = %resource.label, class = %file.fqcn(), methods = resource.endpoints.len(), "Generated resource.");
    file
}
