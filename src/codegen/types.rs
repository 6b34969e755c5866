//! PHP AST for generated artifacts.
//!
//! This module defines the structured source representation:
//! - PhpType: Type declarations (scalars, classes, nullable, unions)
//! - PhpExpr: Expressions (variables, calls, arrays, interpolated strings)
//! - PhpStmt: Statements in method bodies
//! - ClassDecl / PhpFile: One class-like declaration in its namespace
//!
//! Artifacts stay in this form until [`super::emit::Emit`] renders them, so
//! generated names and members can be inspected.

/// PHP type declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhpType {
    /// Built-in or class name: `string`, `array`, `User`
    Named(String),
    /// `?T` (rendered as `T|null` inside unions, dropped for `mixed`)
    Nullable(Box<PhpType>),
    /// `A|B`
    Union(Vec<PhpType>),
}

impl PhpType {
    pub fn named(name: impl Into<String>) -> Self {
        PhpType::Named(name.into())
    }

    pub fn string() -> Self {
        Self::named("string")
    }

    pub fn array() -> Self {
        Self::named("array")
    }

    pub fn mixed() -> Self {
        Self::named("mixed")
    }

    pub fn nullable(self, nullable: bool) -> Self {
        match self {
            PhpType::Nullable(_) => self,
            other if nullable => PhpType::Nullable(Box::new(other)),
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, PhpType::Nullable(_))
    }
}

/// PHP literal values
#[derive(Debug, Clone, PartialEq)]
pub enum PhpLiteral {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// One part of a double-quoted interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationPart {
    Literal(String),
    /// `{$this->property}`; `source` is the placeholder name it replaces.
    Property { source: String, property: String },
}

/// PHP expression
#[derive(Debug, Clone, PartialEq)]
pub enum PhpExpr {
    /// `$name`
    Variable(String),
    Literal(PhpLiteral),
    /// `$this->name`
    ThisProperty(String),
    /// `Class::NAME` or `Class::class`
    ClassConst { class: String, name: String },
    /// `['key' => value, ...]`
    Array(Vec<(PhpExpr, PhpExpr)>),
    /// `function_name(args)`
    Call { function: String, args: Vec<PhpExpr> },
    /// `$object->method(args)`
    MethodCall {
        object: Box<PhpExpr>,
        method: String,
        args: Vec<PhpExpr>,
    },
    /// `Class::method(args)`
    StaticCall {
        class: String,
        method: String,
        args: Vec<PhpExpr>,
    },
    /// `new Class(args)`
    New { class: String, args: Vec<PhpExpr> },
    /// `fn (params) => body`
    ArrowFn {
        params: Vec<PhpParam>,
        body: Box<PhpExpr>,
    },
    /// `left !== right`
    NotIdentical(Box<PhpExpr>, Box<PhpExpr>),
    /// `"..."` with `{$this->x}` parts
    Interpolated(Vec<InterpolationPart>),
}

impl PhpExpr {
    pub fn string(value: impl Into<String>) -> Self {
        PhpExpr::Literal(PhpLiteral::String(value.into()))
    }

    pub fn null() -> Self {
        PhpExpr::Literal(PhpLiteral::Null)
    }

    pub fn var(name: impl Into<String>) -> Self {
        PhpExpr::Variable(name.into())
    }

    pub fn this_prop(name: impl Into<String>) -> Self {
        PhpExpr::ThisProperty(name.into())
    }

    /// Convert a JSON scalar to a literal; other values have no literal form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let literal = match value {
            serde_json::Value::String(s) => PhpLiteral::String(s.clone()),
            serde_json::Value::Bool(b) => PhpLiteral::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PhpLiteral::Int(i),
                None => PhpLiteral::Float(n.as_f64()?),
            },
            serde_json::Value::Null => PhpLiteral::Null,
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => return None,
        };
        Some(PhpExpr::Literal(literal))
    }

    /// An interpolated string in `{placeholder}` substitution form,
    /// e.g. `/users/{user_id}`.
    pub fn template(&self) -> Option<String> {
        let PhpExpr::Interpolated(parts) = self else {
            return None;
        };
        Some(
            parts
                .iter()
                .map(|part| match part {
                    InterpolationPart::Literal(text) => text.clone(),
                    InterpolationPart::Property { source, .. } => format!("{{{source}}}"),
                })
                .collect(),
        )
    }
}

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Function or constructor parameter
#[derive(Debug, Clone, PartialEq)]
pub struct PhpParam {
    pub name: String,
    pub ty: Option<PhpType>,
    pub default: Option<PhpExpr>,
    /// Constructor property promotion.
    pub promoted: Option<Visibility>,
    /// Docblock placed above a promoted parameter.
    pub doc: Option<String>,
}

impl PhpParam {
    pub fn new(name: impl Into<String>, ty: PhpType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            default: None,
            promoted: None,
            doc: None,
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
            promoted: None,
            doc: None,
        }
    }

    pub fn with_default(mut self, default: Option<PhpExpr>) -> Self {
        self.default = default;
        self
    }

    pub fn promoted(mut self, visibility: Visibility) -> Self {
        self.promoted = Some(visibility);
        self
    }

    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc;
        self
    }
}

/// Statement in a method body
#[derive(Debug, Clone, PartialEq)]
pub enum PhpStmt {
    Return(PhpExpr),
    Expr(PhpExpr),
    /// Verbatim lines for fixed templates.
    Raw(String),
}

/// Class property declaration
#[derive(Debug, Clone, PartialEq)]
pub struct PhpProperty {
    pub visibility: Visibility,
    pub is_static: bool,
    pub name: String,
    pub ty: Option<PhpType>,
    pub default: Option<PhpExpr>,
}

/// Method declaration
#[derive(Debug, Clone, PartialEq)]
pub struct PhpMethod {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<PhpParam>,
    pub return_type: Option<PhpType>,
    pub body: Vec<PhpStmt>,
    pub doc: Option<String>,
}

impl PhpMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_static: false,
            is_abstract: false,
            params: Vec::new(),
            return_type: None,
            body: Vec::new(),
            doc: None,
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn params(mut self, params: Vec<PhpParam>) -> Self {
        self.params = params;
        self
    }

    pub fn returns(mut self, ty: PhpType) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn body(mut self, body: Vec<PhpStmt>) -> Self {
        self.body = body;
        self
    }

    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc;
        self
    }

    /// The expression of the first `return`, if any.
    pub fn returned(&self) -> Option<&PhpExpr> {
        self.body.iter().find_map(|stmt| match stmt {
            PhpStmt::Return(expr) => Some(expr),
            _ => None,
        })
    }
}

/// Kind of class-like declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    AbstractClass,
    Interface,
    Trait,
}

/// Class-like declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub kind: ClassKind,
    pub name: String,
    pub extends: Option<String>,
    pub implements: Vec<String>,
    pub traits: Vec<String>,
    pub doc: Option<String>,
    pub properties: Vec<PhpProperty>,
    pub methods: Vec<PhpMethod>,
}

impl ClassDecl {
    pub fn new(kind: ClassKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            extends: None,
            implements: Vec::new(),
            traits: Vec::new(),
            doc: None,
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&PhpMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn constructor(&self) -> Option<&PhpMethod> {
        self.method("__construct")
    }
}

/// `use` import
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UseDecl {
    pub path: String,
    pub alias: Option<String>,
}

impl UseDecl {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: None,
        }
    }

    pub fn aliased(path: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            alias: Some(alias.into()),
        }
    }
}

/// One generated source unit: a namespace, its imports and one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PhpFile {
    pub namespace: String,
    pub uses: Vec<UseDecl>,
    pub class: ClassDecl,
}

impl PhpFile {
    pub fn new(namespace: impl Into<String>, class: ClassDecl) -> Self {
        Self {
            namespace: namespace.into(),
            uses: Vec::new(),
            class,
        }
    }

    /// Add an import unless it is already present or names this namespace.
    pub fn add_use(&mut self, import: UseDecl) {
        let same_namespace = import
            .path
            .rsplit_once('\\')
            .is_some_and(|(ns, _)| ns == self.namespace)
            && import.alias.is_none();
        if !same_namespace && !self.uses.contains(&import) {
            self.uses.push(import);
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Fully-qualified class name.
    pub fn fqcn(&self) -> String {
        format!("{}\\{}", self.namespace, self.class.name)
    }
}
