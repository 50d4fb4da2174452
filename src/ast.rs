use crate::source_location::SourceSpan;
use crate::string_interner::Symbol;

#[derive(Debug, Clone, Copy)]
pub struct Name {
    pub span: SourceSpan,
    pub sym: Symbol,
}

/// A top-level `type` declaration.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: Name,
    /// Declared with a type parameter list, e.g. `type Pair[K comparable, V any] struct`.
    pub generic: bool,
    /// `type A = B`
    pub alias: bool,
    pub kind: DeclarationKind,
}

#[derive(Debug, Clone)]
pub enum DeclarationKind {
    Record(Vec<FieldDecl>),
    Other(TypeExpr),
}

/// One line of a struct body. `A, B int` declares two fields sharing one type
/// expression; an embedded field is named after its base type.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub names: Vec<Name>,
    pub ty: TypeExpr,
    pub tag: Option<Symbol>,
    pub embedded: bool,
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub span: SourceSpan,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Identifier(Symbol),
    Qualified { package: Symbol, name: Symbol },
    Pointer(Box<TypeExpr>),
    Array {
        length: LengthExpr,
        element: Box<TypeExpr>,
    },
    Slice(Box<TypeExpr>),
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Unsupported(UnsupportedForm),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedForm {
    AnonymousStruct,
    Interface,
    Function,
    Channel,
    GenericInstance,
}

impl UnsupportedForm {
    pub fn description(&self) -> &'static str {
        match self {
            UnsupportedForm::AnonymousStruct => "anonymous struct",
            UnsupportedForm::Interface => "interface literal",
            UnsupportedForm::Function => "function type",
            UnsupportedForm::Channel => "channel",
            UnsupportedForm::GenericInstance => "generic instantiation",
        }
    }
}

/// The length of a fixed array, as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthExpr {
    Literal(String),
    Named(String),
    /// `[...]T`, only valid in composite literals.
    Ellipsis,
    Expression(String),
}

impl LengthExpr {
    pub fn text(&self) -> &str {
        match self {
            LengthExpr::Literal(s) | LengthExpr::Named(s) | LengthExpr::Expression(s) => s,
            LengthExpr::Ellipsis => "...",
        }
    }
}

impl Declaration {
    pub fn is_record(&self) -> bool {
        matches!(self.kind, DeclarationKind::Record(_))
    }
}
