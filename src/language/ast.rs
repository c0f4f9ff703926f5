//! Syntax tree consumed by the analysis passes. The parser producing it is
//! a separate component; tests build these nodes directly.

use std::collections::HashMap;

use crate::language::span::{Span, Spanned};
use crate::model::{DeclarationId, MemberReference, ProducedType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Annotation {
    pub name: String,
    pub span: Span,
}

pub fn has_annotation(annotations: &[Annotation], name: &str) -> bool {
    annotations.iter().any(|a| a.name == name)
}

/// Words every unit can use as declaration modifiers. Importing a member
/// of the language module under an alias adds the alias here.
const UNIT_MODIFIERS: &[&str] = &[
    "shared", "formal", "default", "actual", "abstract", "variable", "optional", "export",
];

/// One source file: at most one module or package descriptor, member
/// imports, then toplevel declarations.
#[derive(Debug, Default)]
pub struct CompilationUnit {
    pub module_descriptor: Option<ModuleDescriptor>,
    pub package_descriptor: Option<PackageDescriptor>,
    pub member_imports: Vec<MemberImport>,
    pub items: Vec<Item>,
    pub modifiers: HashMap<String, String>,
}

impl CompilationUnit {
    pub fn new() -> Self {
        let mut modifiers = HashMap::new();
        for word in UNIT_MODIFIERS {
            modifiers.insert(word.to_string(), word.to_string());
        }
        Self {
            modifiers,
            ..Self::default()
        }
    }
}

/// A module name as written: a dotted identifier path, a quoted literal,
/// or something computed at runtime (which has no static name at all).
#[derive(Clone, Debug)]
pub enum DescriptorName {
    Path(Vec<Identifier>),
    Quoted(Spanned<String>),
    Computed(Span),
}

impl DescriptorName {
    pub fn span(&self) -> Span {
        match self {
            DescriptorName::Path(parts) => match (parts.first(), parts.last()) {
                (Some(first), Some(last)) => first.span.join(last.span),
                _ => Span::default(),
            },
            DescriptorName::Quoted(quoted) => quoted.span,
            DescriptorName::Computed(span) => *span,
        }
    }

    /// The dotted segments, when statically known.
    pub fn segments(&self) -> Option<Vec<String>> {
        match self {
            DescriptorName::Path(parts) => {
                Some(parts.iter().map(|part| part.name.clone()).collect())
            }
            DescriptorName::Quoted(quoted) => {
                Some(quoted.value.split('.').map(str::to_string).collect())
            }
            DescriptorName::Computed(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct ModuleDescriptor {
    pub name: DescriptorName,
    pub version: Option<Spanned<String>>,
    pub annotations: Vec<Annotation>,
    pub imports: Vec<ImportModule>,
    pub span: Span,
}

#[derive(Debug)]
pub struct PackageDescriptor {
    pub name: DescriptorName,
    pub annotations: Vec<Annotation>,
    pub span: Span,
}

#[derive(Debug)]
pub struct ImportModule {
    pub name: DescriptorName,
    pub version: Option<Spanned<String>>,
    pub annotations: Vec<Annotation>,
    pub span: Span,
}

/// `import some.package { member, alias = member }`.
#[derive(Debug)]
pub struct MemberImport {
    pub path: Vec<Identifier>,
    pub members: Vec<ImportedMember>,
    pub span: Span,
}

impl MemberImport {
    pub fn path_name(&self) -> String {
        let parts: Vec<String> = self.path.iter().map(|p| p.name.clone()).collect();
        parts.join(".")
    }
}

#[derive(Debug)]
pub struct ImportedMember {
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

#[derive(Debug)]
pub enum Item {
    Value(ValueDeclaration),
    Getter(GetterDefinition),
    Setter(SetterDefinition),
    Method(MethodDefinition),
    Class(ClassDefinition),
    Interface(InterfaceDefinition),
    Object(ObjectDefinition),
}

#[derive(Debug)]
pub struct ValueDeclaration {
    pub name: Identifier,
    pub ty: TypeRef,
    pub initializer: Option<Expr>,
    pub annotations: Vec<Annotation>,
    pub model: Option<DeclarationId>,
    pub span: Span,
}

#[derive(Debug)]
pub struct GetterDefinition {
    pub name: Identifier,
    pub ty: TypeRef,
    pub block: Block,
    pub model: Option<DeclarationId>,
    pub span: Span,
}

#[derive(Debug)]
pub struct SetterDefinition {
    pub name: Identifier,
    pub parameter: ParameterNode,
    pub block: Block,
    pub model: Option<DeclarationId>,
    pub span: Span,
}

#[derive(Debug)]
pub struct MethodDefinition {
    pub name: Identifier,
    pub ty: TypeRef,
    pub parameter_lists: Vec<ParameterListNode>,
    pub body: MethodBody,
    pub annotations: Vec<Annotation>,
    pub model: Option<DeclarationId>,
    pub span: Span,
}

#[derive(Debug)]
pub enum MethodBody {
    Block(Block),
    /// `function f() => expression;`
    Specifier(Expr),
    /// Formal declarations have no body.
    None,
}

#[derive(Debug)]
pub struct ClassDefinition {
    pub name: Identifier,
    pub parameters: Option<ParameterListNode>,
    pub extended: Option<TypeAnnotation>,
    pub body: Body,
    pub annotations: Vec<Annotation>,
    pub model: Option<DeclarationId>,
    pub span: Span,
}

#[derive(Debug)]
pub struct InterfaceDefinition {
    pub name: Identifier,
    pub body: Body,
    pub annotations: Vec<Annotation>,
    pub model: Option<DeclarationId>,
    pub span: Span,
}

#[derive(Debug)]
pub struct ObjectDefinition {
    pub name: Identifier,
    pub body: Body,
    pub model: Option<DeclarationId>,
    pub span: Span,
}

/// A class, interface or object body.
#[derive(Debug, Default)]
pub struct Body {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug)]
pub enum Statement {
    Item(Item),
    Expression(Expr),
    Return {
        value: Option<Expr>,
        span: Span,
    },
    /// `member := value` re-specification.
    Specifier {
        member: Expr,
        value: Expr,
        span: Span,
    },
    For(ForStatement),
}

#[derive(Debug)]
pub struct ForStatement {
    pub key: Option<VariableDecl>,
    pub variable: VariableDecl,
    pub iterated: Expr,
    pub block: Block,
    pub span: Span,
}

#[derive(Debug)]
pub struct VariableDecl {
    pub name: Identifier,
    pub ty: TypeRef,
    pub model: Option<DeclarationId>,
    pub span: Span,
}

/// The written type of a declaration: explicit, to be inferred, or void.
#[derive(Debug)]
pub enum TypeRef {
    Explicit(TypeAnnotation),
    Infer(Span),
    Void(Span),
}

impl TypeRef {
    pub fn span(&self) -> Span {
        match self {
            TypeRef::Explicit(annotation) => annotation.span,
            TypeRef::Infer(span) | TypeRef::Void(span) => *span,
        }
    }
}

/// A written type expression: a type name with optional type arguments.
#[derive(Clone, Debug)]
pub struct TypeAnnotation {
    pub name: Identifier,
    pub arguments: Vec<TypeAnnotation>,
    pub span: Span,
}

impl TypeAnnotation {
    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: Identifier::new(name, span),
            arguments: Vec::new(),
            span,
        }
    }
}

#[derive(Debug)]
pub struct ParameterListNode {
    pub parameters: Vec<ParameterNode>,
    pub span: Span,
}

#[derive(Debug)]
pub struct ParameterNode {
    pub name: Identifier,
    pub ty: TypeAnnotation,
    pub default: Option<Expr>,
    pub sequenced: bool,
    pub span: Span,
}

/// Write-once slot for the type the checker computes for a node. The
/// first fill wins; later fills are ignored so error recovery can never
/// overwrite an already established type.
#[derive(Clone, Debug, Default)]
pub struct TypeCell(Option<ProducedType>);

impl TypeCell {
    pub fn fill(&mut self, ty: ProducedType) {
        if self.0.is_none() {
            self.0 = Some(ty);
        }
    }

    pub fn get(&self) -> Option<&ProducedType> {
        self.0.as_ref()
    }

    pub fn is_filled(&self) -> bool {
        self.0.is_some()
    }
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: TypeCell,
    pub member: Option<MemberReference>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: TypeCell::default(),
            member: None,
        }
    }
}

#[derive(Debug)]
pub enum ExprKind {
    StringLiteral(String),
    NaturalLiteral(String),
    FloatLiteral(String),
    CharLiteral(String),
    QuotedLiteral(String),
    /// Alternating literal segments and interpolated expressions.
    StringTemplate {
        segments: Vec<String>,
        expressions: Vec<Expr>,
    },
    SequenceEnumeration(Vec<Expr>),
    /// A bare name resolved through the lexical scope chain.
    Base(Identifier),
    /// `primary.name`.
    Member {
        primary: Box<Expr>,
        name: Identifier,
    },
    This,
    Super,
    Outer,
    Invocation {
        primary: Box<Expr>,
        positional: Option<Vec<Expr>>,
        named: Option<NamedArgumentList>,
    },
    Index {
        primary: Box<Expr>,
        index: Box<Expr>,
    },
    Prefix {
        op: IncDecOp,
        term: Box<Expr>,
    },
    Postfix {
        op: IncDecOp,
        term: Box<Expr>,
    },
    Not(Box<Expr>),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Paren(Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncDecOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Power,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Equal,
    NotEqual,
    Identical,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Assign,
    /// `left else right`: the fallback when the left term is absent.
    Default,
    /// Formats the left term using the right as a pattern; yields String.
    Format,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Remainder
                | BinaryOp::Power
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessOrEqual | BinaryOp::GreaterOrEqual
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Identical)
    }
}

#[derive(Debug)]
pub struct NamedArgumentList {
    pub named: Vec<NamedArgument>,
    /// Trailing bare expressions forming the sequenced-argument block.
    pub sequenced: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug)]
pub enum NamedArgument {
    /// `name = expression;`
    Specified {
        name: Identifier,
        value: Expr,
        span: Span,
    },
    /// A typed getter/function argument: `Natural count { return 3; }`.
    Typed {
        name: Identifier,
        ty: TypeAnnotation,
        block: Block,
        span: Span,
    },
}

impl NamedArgument {
    pub fn name(&self) -> &Identifier {
        match self {
            NamedArgument::Specified { name, .. } | NamedArgument::Typed { name, .. } => name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            NamedArgument::Specified { span, .. } | NamedArgument::Typed { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_cell_keeps_the_first_fill() {
        let mut cell = TypeCell::default();
        assert!(!cell.is_filled());
        cell.fill(ProducedType::of(DeclarationId(0)));
        cell.fill(ProducedType::of(DeclarationId(1)));
        assert_eq!(cell.get(), Some(&ProducedType::of(DeclarationId(0))));
    }

    #[test]
    fn descriptor_name_segments() {
        let path = DescriptorName::Path(vec![
            Identifier::new("quill", Span::new(7, 12)),
            Identifier::new("demo", Span::new(13, 17)),
        ]);
        assert_eq!(
            path.segments(),
            Some(vec!["quill".to_string(), "demo".to_string()])
        );
        assert_eq!(path.span(), Span::new(7, 17));

        let quoted = DescriptorName::Quoted(Spanned::new("a.b".to_string(), Span::new(0, 5)));
        assert_eq!(
            quoted.segments(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(DescriptorName::Computed(Span::default()).segments().is_none());
    }

    #[test]
    fn fresh_units_know_the_modifier_words() {
        let unit = CompilationUnit::new();
        assert_eq!(unit.modifiers.get("shared").map(String::as_str), Some("shared"));
        assert!(unit.modifiers.get("print").is_none());
    }
}
