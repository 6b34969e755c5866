//! PHP code emission via the Emit trait.
//!
//! Each AST node implements `Emit`; rendering is purely mechanical string
//! building with PSR-12 layout (4-space indentation, braces on their own line
//! for classes and methods).

use super::types::{
    ClassDecl, ClassKind, InterpolationPart, PhpExpr, PhpFile, PhpLiteral, PhpMethod, PhpParam,
    PhpProperty, PhpStmt, PhpType, UseDecl, Visibility,
};

const INDENT: &str = "    ";

/// Trait for emitting PHP code from AST nodes.
pub trait Emit {
    /// Convert the AST node to its PHP source representation.
    fn emit(&self) -> String;
}

// =============================================================================
// Types and literals
// =============================================================================

impl Emit for PhpType {
    fn emit(&self) -> String {
        match self {
            PhpType::Named(name) => name.clone(),
            PhpType::Nullable(inner) => match inner.as_ref() {
                PhpType::Named(name) if name == "mixed" || name == "null" => name.clone(),
                PhpType::Named(name) => format!("?{name}"),
                other => format!("{}|null", other.emit()),
            },
            PhpType::Union(types) => types.iter().map(Emit::emit).collect::<Vec<_>>().join("|"),
        }
    }
}

impl Emit for PhpLiteral {
    fn emit(&self) -> String {
        match self {
            PhpLiteral::String(s) => {
                let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
                format!("'{escaped}'")
            }
            PhpLiteral::Int(i) => i.to_string(),
            PhpLiteral::Float(f) => format!("{f:?}"),
            PhpLiteral::Bool(b) => b.to_string(),
            PhpLiteral::Null => "null".to_string(),
        }
    }
}

impl Emit for Visibility {
    fn emit(&self) -> String {
        match self {
            Visibility::Public => "public".to_string(),
            Visibility::Protected => "protected".to_string(),
            Visibility::Private => "private".to_string(),
        }
    }
}

// =============================================================================
// Expressions
// =============================================================================

fn emit_args(args: &[PhpExpr]) -> String {
    args.iter().map(Emit::emit).collect::<Vec<_>>().join(", ")
}

impl Emit for PhpExpr {
    fn emit(&self) -> String {
        match self {
            PhpExpr::Variable(name) => format!("${name}"),
            PhpExpr::Literal(literal) => literal.emit(),
            PhpExpr::ThisProperty(name) => format!("$this->{name}"),
            PhpExpr::ClassConst { class, name } => format!("{class}::{name}"),
            PhpExpr::Array(entries) => {
                let parts: Vec<_> = entries
                    .iter()
                    .map(|(key, value)| format!("{} => {}", key.emit(), value.emit()))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            PhpExpr::Call { function, args } => format!("{function}({})", emit_args(args)),
            PhpExpr::MethodCall {
                object,
                method,
                args,
            } => format!("{}->{method}({})", object.emit(), emit_args(args)),
            PhpExpr::StaticCall {
                class,
                method,
                args,
            } => format!("{class}::{method}({})", emit_args(args)),
            PhpExpr::New { class, args } => format!("new {class}({})", emit_args(args)),
            PhpExpr::ArrowFn { params, body } => {
                let params = params.iter().map(Emit::emit).collect::<Vec<_>>().join(", ");
                format!("fn ({params}) => {}", body.emit())
            }
            PhpExpr::NotIdentical(left, right) => format!("{} !== {}", left.emit(), right.emit()),
            PhpExpr::Interpolated(parts) => {
                let content: String = parts
                    .iter()
                    .map(|part| match part {
                        InterpolationPart::Literal(text) => text
                            .replace('\\', "\\\\")
                            .replace('"', "\\\"")
                            .replace('$', "\\$"),
                        InterpolationPart::Property { property, .. } => {
                            format!("{{$this->{property}}}")
                        }
                    })
                    .collect();
                format!("\"{content}\"")
            }
        }
    }
}

impl Emit for PhpParam {
    fn emit(&self) -> String {
        let mut out = String::new();
        if let Some(visibility) = self.promoted {
            out.push_str(&visibility.emit());
            out.push(' ');
        }
        if let Some(ty) = &self.ty {
            out.push_str(&ty.emit());
            out.push(' ');
        }
        out.push('$');
        out.push_str(&self.name);
        if let Some(default) = &self.default {
            out.push_str(" = ");
            out.push_str(&default.emit());
        }
        out
    }
}

// =============================================================================
// Statements and members
// =============================================================================

impl PhpStmt {
    /// Emit with the given indentation level (4 spaces per level).
    pub fn emit_indented(&self, indent: usize) -> String {
        let prefix = INDENT.repeat(indent);
        match self {
            PhpStmt::Return(expr) => format!("{prefix}return {};\n", expr.emit()),
            PhpStmt::Expr(expr) => format!("{prefix}{};\n", expr.emit()),
            PhpStmt::Raw(code) => code
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        "\n".to_string()
                    } else {
                        format!("{prefix}{line}\n")
                    }
                })
                .collect(),
        }
    }
}

impl Emit for PhpStmt {
    fn emit(&self) -> String {
        self.emit_indented(2)
    }
}

fn emit_doc(doc: &str, indent: usize) -> String {
    let prefix = INDENT.repeat(indent);
    let mut out = format!("{prefix}/**\n");
    for line in doc.lines() {
        if line.trim().is_empty() {
            out.push_str(&format!("{prefix} *\n"));
        } else {
            out.push_str(&format!("{prefix} * {line}\n"));
        }
    }
    out.push_str(&format!("{prefix} */\n"));
    out
}

impl Emit for PhpProperty {
    fn emit(&self) -> String {
        let mut out = format!("{INDENT}{}", self.visibility.emit());
        if self.is_static {
            out.push_str(" static");
        }
        if let Some(ty) = &self.ty {
            out.push(' ');
            out.push_str(&ty.emit());
        }
        out.push_str(&format!(" ${}", self.name));
        if let Some(default) = &self.default {
            out.push_str(&format!(" = {}", default.emit()));
        }
        out.push_str(";\n");
        out
    }
}

impl PhpMethod {
    fn emit_in(&self, kind: ClassKind) -> String {
        let mut out = String::new();
        if let Some(doc) = &self.doc {
            out.push_str(&emit_doc(doc, 1));
        }

        let mut modifiers = Vec::new();
        if self.is_abstract && kind != ClassKind::Interface {
            modifiers.push("abstract".to_string());
        }
        modifiers.push(self.visibility.emit());
        if self.is_static {
            modifiers.push("static".to_string());
        }

        let promoted = self.params.iter().any(|p| p.promoted.is_some());
        let params = if promoted {
            let mut lines = String::from("\n");
            for param in &self.params {
                if let Some(doc) = &param.doc {
                    lines.push_str(&emit_doc(doc, 2));
                }
                lines.push_str(&format!("{INDENT}{INDENT}{},\n", param.emit()));
            }
            lines.push_str(INDENT);
            lines
        } else {
            self.params.iter().map(Emit::emit).collect::<Vec<_>>().join(", ")
        };

        let return_type = self
            .return_type
            .as_ref()
            .map(|t| format!(": {}", t.emit()))
            .unwrap_or_default();

        out.push_str(&format!(
            "{INDENT}{} function {}({params}){return_type}",
            modifiers.join(" "),
            self.name
        ));

        if self.is_abstract || kind == ClassKind::Interface {
            out.push_str(";\n");
            return out;
        }

        if promoted {
            out.push_str(" {\n");
        } else {
            out.push_str(&format!("\n{INDENT}{{\n"));
        }
        for stmt in &self.body {
            out.push_str(&stmt.emit_indented(2));
        }
        out.push_str(&format!("{INDENT}}}\n"));
        out
    }
}

impl Emit for PhpMethod {
    fn emit(&self) -> String {
        self.emit_in(ClassKind::Class)
    }
}

// =============================================================================
// Declarations
// =============================================================================

impl Emit for ClassDecl {
    fn emit(&self) -> String {
        let mut out = String::new();
        if let Some(doc) = &self.doc {
            out.push_str(&emit_doc(doc, 0));
        }

        let keyword = match self.kind {
            ClassKind::Class => "class",
            ClassKind::AbstractClass => "abstract class",
            ClassKind::Interface => "interface",
            ClassKind::Trait => "trait",
        };
        out.push_str(&format!("{keyword} {}", self.name));
        if let Some(parent) = &self.extends {
            out.push_str(&format!(" extends {parent}"));
        }
        if !self.implements.is_empty() {
            out.push_str(&format!(" implements {}", self.implements.join(", ")));
        }
        out.push_str("\n{\n");

        let mut sections = Vec::new();
        if !self.traits.is_empty() {
            sections.push(
                self.traits
                    .iter()
                    .map(|t| format!("{INDENT}use {t};\n"))
                    .collect::<String>(),
            );
        }
        if !self.properties.is_empty() {
            sections.push(self.properties.iter().map(Emit::emit).collect::<String>());
        }
        sections.extend(self.methods.iter().map(|m| m.emit_in(self.kind)));

        out.push_str(&sections.join("\n"));
        out.push_str("}\n");
        out
    }
}

impl Emit for UseDecl {
    fn emit(&self) -> String {
        match &self.alias {
            Some(alias) => format!("use {} as {alias};", self.path),
            None => format!("use {};", self.path),
        }
    }
}

impl Emit for PhpFile {
    fn emit(&self) -> String {
        let mut out = String::from("<?php\n\n");
        if !self.namespace.is_empty() {
            out.push_str(&format!("namespace {};\n\n", self.namespace));
        }
        if !self.uses.is_empty() {
            let mut uses = self.uses.clone();
            uses.sort();
            for import in &uses {
                out.push_str(&import.emit());
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str(&self.class.emit());
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_types() {
        assert_eq!(PhpType::string().nullable(true).emit(), "?string");
        assert_eq!(PhpType::mixed().nullable(true).emit(), "mixed");
        let number = PhpType::Union(vec![PhpType::named("float"), PhpType::named("int")]);
        assert_eq!(number.clone().emit(), "float|int");
        assert_eq!(number.nullable(true).emit(), "float|int|null");
    }

    #[test]
    fn test_literals_are_escaped() {
        assert_eq!(PhpExpr::string("it's").emit(), r"'it\'s'");
        assert_eq!(PhpLiteral::Float(2.0).emit(), "2.0");
        assert_eq!(PhpExpr::null().emit(), "null");
    }

    #[test]
    fn test_interpolated_string() {
        let expr = PhpExpr::Interpolated(vec![
            InterpolationPart::Literal("/users/".into()),
            InterpolationPart::Property {
                source: "user_id".into(),
                property: "userId".into(),
            },
        ]);
        assert_eq!(expr.emit(), r#""/users/{$this->userId}""#);
        assert_eq!(expr.template().as_deref(), Some("/users/{user_id}"));
    }

    #[test]
    fn test_array_filter_call() {
        let expr = PhpExpr::Call {
            function: "array_filter".into(),
            args: vec![
                PhpExpr::Array(vec![(PhpExpr::string("channel_id"), PhpExpr::this_prop("channelId"))]),
                PhpExpr::ArrowFn {
                    params: vec![PhpParam::untyped("value")],
                    body: Box::new(PhpExpr::NotIdentical(
                        Box::new(PhpExpr::var("value")),
                        Box::new(PhpExpr::null()),
                    )),
                },
            ],
        };
        assert_eq!(
            expr.emit(),
            "array_filter(['channel_id' => $this->channelId], fn ($value) => $value !== null)"
        );
    }

    #[test]
    fn test_class_with_promoted_constructor() {
        let mut class = ClassDecl::new(ClassKind::Class, "GetUser");
        class.extends = Some("Request".into());
        class.properties.push(PhpProperty {
            visibility: Visibility::Protected,
            is_static: false,
            name: "method".into(),
            ty: Some(PhpType::named("Method")),
            default: Some(PhpExpr::ClassConst {
                class: "Method".into(),
                name: "GET".into(),
            }),
        });
        class.methods.push(PhpMethod::new("__construct").params(vec![
            PhpParam::new("userId", PhpType::string()).promoted(Visibility::Protected),
        ]));
        class.methods.push(
            PhpMethod::new("resolveEndpoint")
                .returns(PhpType::string())
                .body(vec![PhpStmt::Return(PhpExpr::string("/users"))]),
        );

        let mut file = PhpFile::new("App\\Requests", class);
        file.add_use(UseDecl::new("Saloon\\Http\\Request"));
        file.add_use(UseDecl::new("Saloon\\Enums\\Method"));
        file.add_use(UseDecl::new("App\\Requests\\Sibling"));

        let expected = r#"<?php

namespace App\Requests;

use Saloon\Enums\Method;
use Saloon\Http\Request;

class GetUser extends Request
{
    protected Method $method = Method::GET;

    public function __construct(
        protected string $userId,
    ) {
    }

    public function resolveEndpoint(): string
    {
        return '/users';
    }
}
"#;
        assert_eq!(file.emit(), expected);
    }

    #[test]
    fn test_interface_methods_have_no_body() {
        let mut iface = ClassDecl::new(ClassKind::Interface, "Deserializable");
        let mut method = PhpMethod::new("fromArray")
            .params(vec![PhpParam::new("data", PhpType::array())])
            .returns(PhpType::named("static"));
        method.is_static = true;
        iface.methods.push(method);

        assert_eq!(
            iface.emit(),
            "interface Deserializable\n{\n    public static function fromArray(array $data): static;\n}\n"
        );
    }
}
