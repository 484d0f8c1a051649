//! The reduce-action language.

use crate::util::write_separated;
use std::fmt;

/// An expression computing the value of a reduced production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReduceExpr {
    /// The value of the i-th concrete element of the body.
    Slot(usize),
    Call(CallMethod),
    Some(Box<ReduceExpr>),
    None,
}

/// A call to a named method of the AST builder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallMethod {
    /// Either an identifier or an identifier, a space, and a decimal
    /// production number (e.g. `"Statement 2"`).
    pub method: String,
    pub args: Vec<ReduceExpr>,
}

impl ReduceExpr {
    pub fn call(method: impl Into<String>, args: Vec<ReduceExpr>) -> Self {
        Self::Call(CallMethod {
            method: method.into(),
            args,
        })
    }

    pub fn some(inner: ReduceExpr) -> Self {
        Self::Some(Box::new(inner))
    }

    /// `[$0, $1, ..., $(n-1)]`
    pub fn slots(n: usize) -> Vec<ReduceExpr> {
        (0..n).map(Self::Slot).collect()
    }

    /// Visit every slot index referenced by this expression.
    pub fn for_each_slot(&self, f: &mut impl FnMut(usize)) {
        match self {
            Self::Slot(i) => f(*i),
            Self::Call(call) => call.args.iter().for_each(|arg| arg.for_each_slot(f)),
            Self::Some(inner) => inner.for_each_slot(f),
            Self::None => {}
        }
    }

    /// Visit every method call in this expression, innermost first.
    pub fn for_each_call<'a>(&'a self, f: &mut impl FnMut(&'a CallMethod)) {
        match self {
            Self::Call(call) => {
                call.args.iter().for_each(|arg| arg.for_each_call(f));
                f(call);
            }
            Self::Some(inner) => inner.for_each_call(f),
            Self::Slot(..) | Self::None => {}
        }
    }
}

impl fmt::Display for ReduceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slot(i) => write!(f, "${}", i),
            Self::Call(call) => {
                write!(f, "{}(", call.method)?;
                write_separated(f, ", ", &call.args)?;
                f.write_str(")")
            }
            Self::Some(inner) => write!(f, "Some({})", inner),
            Self::None => f.write_str("None"),
        }
    }
}

/// What happens when a production is reduced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReduceAction {
    Expr(ReduceExpr),
    /// Parsing is complete. Only valid in init nonterminals.
    Accept,
}

impl ReduceAction {
    pub fn expr(&self) -> Option<&ReduceExpr> {
        match self {
            Self::Expr(expr) => Some(expr),
            Self::Accept => None,
        }
    }
}

impl From<ReduceExpr> for ReduceAction {
    fn from(expr: ReduceExpr) -> Self {
        Self::Expr(expr)
    }
}

impl fmt::Display for ReduceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr(expr) => expr.fmt(f),
            Self::Accept => f.write_str("<accept>"),
        }
    }
}

/// Return `true` if `name` is acceptable as a reduce-action method name.
pub fn is_method_name(name: &str) -> bool {
    use crate::util::is_identifier;
    match name.split_once(' ') {
        None => is_identifier(name),
        Some((base, n)) => {
            is_identifier(base) && !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_display() {
        let expr = ReduceExpr::call(
            "binary_expr",
            vec![
                ReduceExpr::Slot(0),
                ReduceExpr::some(ReduceExpr::Slot(2)),
                ReduceExpr::None,
            ],
        );
        assert_eq!(expr.to_string(), "binary_expr($0, Some($2), None)");
        assert_eq!(ReduceAction::Accept.to_string(), "<accept>");
    }

    #[test]
    fn method_names() {
        assert!(is_method_name("expr_plus"));
        assert!(is_method_name("Statement 2"));
        assert!(!is_method_name("Statement "));
        assert!(!is_method_name("Statement two"));
        assert!(!is_method_name("a b c"));
        assert!(!is_method_name("3d"));
    }
}
