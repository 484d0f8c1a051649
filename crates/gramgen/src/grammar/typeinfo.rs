//! Types of nonterminal values and builder methods.

use super::Grammar;
use crate::types::Map;
use std::fmt;

/// The type of a value on the parser stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value. Unit arguments are dropped from generated signatures.
    Unit,
    /// The text of a variable terminal.
    Str,
    Bool,
    /// An AST node type, named in CamelCase.
    Node(String),
    Option(Box<Type>),
}

impl Type {
    pub fn node(name: impl Into<String>) -> Self {
        Self::Node(name.into())
    }

    pub fn option(inner: Type) -> Self {
        Self::Option(Box::new(inner))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Str => f.write_str("str"),
            Self::Bool => f.write_str("bool"),
            Self::Node(name) => f.write_str(name),
            Self::Option(inner) => write!(f, "Option<{}>", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodType {
    pub argument_types: Vec<Type>,
    pub return_type: Type,
}

impl MethodType {
    pub fn new(argument_types: Vec<Type>, return_type: Type) -> Self {
        Self {
            argument_types,
            return_type,
        }
    }
}

/// The type assignment of a grammar.
///
/// `nt_types` is keyed by nonterminal family name; `methods` by method name
/// as it appears in reduce expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeInfo {
    pub nt_types: Map<String, Type>,
    pub methods: Map<String, MethodType>,
}

impl TypeInfo {
    pub fn nt_type(&mut self, name: impl Into<String>, ty: Type) -> &mut Self {
        self.nt_types.insert(name.into(), ty);
        self
    }

    pub fn method(&mut self, name: impl Into<String>, ty: MethodType) -> &mut Self {
        self.methods.insert(name.into(), ty);
        self
    }
}

/// A type inference pass run during grammar construction.
///
/// Inference sees the validated grammar before its init nonterminals are
/// synthesized.
pub trait InferTypes {
    fn infer_types(&self, grammar: &Grammar) -> anyhow::Result<TypeInfo>;
}

impl<F> InferTypes for F
where
    F: Fn(&Grammar) -> anyhow::Result<TypeInfo>,
{
    fn infer_types(&self, grammar: &Grammar) -> anyhow::Result<TypeInfo> {
        (self)(grammar)
    }
}
