//! Grammar symbols and the elements of production bodies.

use crate::util::write_separated;
use std::{collections::BTreeSet, fmt, rc::Rc};

/// The name part of a nonterminal identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NtName {
    Plain(String),

    /// A synthesized entry point for one goal nonterminal.
    ///
    /// Init nonterminals are never referenced from a production body. Each
    /// one has a single production `InitNt(goal) ::= goal => <accept>`.
    Init(Rc<Nt>),
}

/// The value passed for one parameter of a nonterminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArgValue {
    Bool(bool),
    /// Pass the value of the enclosing nonterminal's parameter through.
    Var(String),
}

/// A nonterminal identity: a name plus the arguments bound to its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nt {
    pub name: NtName,
    pub args: Vec<(String, ArgValue)>,
}

impl Nt {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: NtName::Plain(name.into()),
            args: vec![],
        }
    }

    pub fn with_args<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = (S, ArgValue)>,
        S: Into<String>,
    {
        Self {
            name: NtName::Plain(name.into()),
            args: args.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// The init nonterminal of `goal`.
    pub fn init(goal: Rc<Nt>) -> Self {
        Self {
            name: NtName::Init(goal),
            args: vec![],
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self.name, NtName::Init(..))
    }

    /// The goal of an init nonterminal.
    pub fn init_goal(&self) -> Option<&Rc<Nt>> {
        match &self.name {
            NtName::Init(goal) => Some(goal),
            NtName::Plain(..) => None,
        }
    }

    /// The plain name of this nonterminal, looking through init nonterminals.
    pub fn base_name(&self) -> &str {
        match &self.name {
            NtName::Plain(name) => name,
            NtName::Init(goal) => goal.base_name(),
        }
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.args.iter().map(|(name, _)| &**name)
    }
}

impl From<&str> for Nt {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Nt {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Renders `+flag`, `~flag`, `?var` and `name=value` argument lists.
impl fmt::Display for Nt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            NtName::Plain(name) => f.write_str(name)?,
            NtName::Init(goal) => write!(f, "InitNt({})", goal)?,
        }
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (name, value)) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                ArgValue::Bool(true) => write!(f, "+{}", name)?,
                ArgValue::Bool(false) => write!(f, "~{}", name)?,
                ArgValue::Var(var) if var == name => write!(f, "?{}", var)?,
                ArgValue::Var(var) => write!(f, "{}={}", name, var)?,
            }
        }
        f.write_str("]")
    }
}

/// A zero-width restriction on the next token.
///
/// A positive rule requires the next token to be one of `set`; a negative
/// rule requires it to be none of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookaheadRule {
    pub set: BTreeSet<String>,
    pub positive: bool,
}

impl LookaheadRule {
    pub fn new<I, S>(set: I, positive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            set: set.into_iter().map(Into::into).collect(),
            positive,
        }
    }
}

impl fmt::Display for LookaheadRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted = self.set.iter().map(|t| format!("{:?}", t));
        if self.set.len() == 1 {
            let op = if self.positive { "==" } else { "!=" };
            f.write_str("[lookahead ")?;
            f.write_str(op)?;
            f.write_str(" ")?;
            write_separated(f, "", quoted)?;
            f.write_str("]")
        } else {
            let op = if self.positive { "in" } else { "not in" };
            write!(f, "[lookahead {} {{", op)?;
            write_separated(f, ", ", quoted)?;
            f.write_str("}]")
        }
    }
}

/// Return `true` if the restriction `rule` allows the terminal `t`.
///
/// `None` means "no restriction".
pub fn lookahead_contains(rule: Option<&LookaheadRule>, t: &str) -> bool {
    match rule {
        None => true,
        Some(rule) if rule.positive => rule.set.contains(t),
        Some(rule) => !rule.set.contains(t),
    }
}

/// Combine two restrictions into the single rule that allows exactly the
/// terminals allowed by both.
pub fn lookahead_intersect(
    a: Option<&LookaheadRule>,
    b: Option<&LookaheadRule>,
) -> Option<LookaheadRule> {
    match (a, b) {
        (None, b) => b.cloned(),
        (a, None) => a.cloned(),
        (Some(a), Some(b)) => Some(match (a.positive, b.positive) {
            (true, true) => LookaheadRule {
                set: a.set.intersection(&b.set).cloned().collect(),
                positive: true,
            },
            (true, false) => LookaheadRule {
                set: a.set.difference(&b.set).cloned().collect(),
                positive: true,
            },
            (false, true) => LookaheadRule {
                set: b.set.difference(&a.set).cloned().collect(),
                positive: true,
            },
            // not in A and not in B == not in (A | B)
            (false, false) => LookaheadRule {
                set: a.set.union(&b.set).cloned().collect(),
                positive: false,
            },
        }),
    }
}

/// The recovery code carried by a synthetic error symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecoveryCode {
    /// Automatic semicolon insertion, allowed only after a line break.
    Asi,
    /// Automatic semicolon insertion at the end of `do ... while (...)`.
    DoWhileAsi,
}

impl RecoveryCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asi => "asi",
            Self::DoWhileAsi => "do_while_asi",
        }
    }
}

impl fmt::Display for RecoveryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value excluded by `but not` / `but not one of`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Exclusion {
    Terminal(String),
    Nonterminal(String),
    CharRange(String, String),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(t) => write!(f, "{:?}", t),
            Self::Nonterminal(nt) => f.write_str(nt),
            Self::CharRange(lo, hi) => write!(f, "{} through {}", lo, hi),
        }
    }
}

/// One element of a production body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    /// A terminal.
    ///
    /// In raw input a bare name may also denote a parameterless
    /// nonterminal; grammar construction resolves those to `Element::Nt`.
    Terminal(String),
    Nt(Rc<Nt>),
    Optional(Box<Element>),
    Lookahead(Rc<LookaheadRule>),
    NoLineTerminatorHere,
    /// A nonterminal restricted to exclude some of its matches.
    Exclude {
        nt: Box<Element>,
        excluded: Vec<Exclusion>,
    },
    /// The token injected just before a token that matches nothing.
    ErrorToken,
    /// A synthetic error symbol carrying a recovery code.
    ErrorSymbol(RecoveryCode),
}

impl Element {
    pub fn terminal(t: impl Into<String>) -> Self {
        Self::Terminal(t.into())
    }

    pub fn nt(nt: impl Into<Nt>) -> Self {
        Self::Nt(Rc::new(nt.into()))
    }

    pub fn optional(inner: Element) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn lookahead<I, S>(set: I, positive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Lookahead(Rc::new(LookaheadRule::new(set, positive)))
    }

    /// Return `true` if matching this element pushes a value onto the
    /// parser stack.
    pub fn is_concrete(&self) -> bool {
        !matches!(
            self,
            Self::Lookahead(..) | Self::NoLineTerminatorHere | Self::ErrorToken | Self::ErrorSymbol(..)
        )
    }

    pub fn is_terminal(&self, t: &str) -> bool {
        matches!(self, Self::Terminal(s) if s == t)
    }

    /// The name of the symbol this element refers to, if any.
    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Self::Terminal(t) => Some(t),
            Self::Nt(nt) => Some(nt.base_name()),
            Self::Optional(inner) => inner.symbol_name(),
            Self::Exclude { nt, .. } => nt.symbol_name(),
            _ => None,
        }
    }
}

/// Count the elements of `body` that push a value.
pub fn concrete_len(body: &[Element]) -> usize {
    body.iter().filter(|e| e.is_concrete()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(set: &[&str], positive: bool) -> LookaheadRule {
        LookaheadRule::new(set.iter().copied(), positive)
    }

    #[test]
    fn intersect_with_none() {
        let r = rule(&["a", "b"], true);
        assert_eq!(lookahead_intersect(Some(&r), None), Some(r.clone()));
        assert_eq!(lookahead_intersect(None, Some(&r)), Some(r));
        assert_eq!(lookahead_intersect(None, None), None);
    }

    #[test]
    fn intersect_mixed_polarity() {
        let pos = rule(&["a", "b", "c"], true);
        let neg = rule(&["b", "d"], false);
        let expected = rule(&["a", "c"], true);
        assert_eq!(lookahead_intersect(Some(&pos), Some(&neg)), Some(expected.clone()));
        assert_eq!(lookahead_intersect(Some(&neg), Some(&pos)), Some(expected));
    }

    #[test]
    fn intersect_negatives_is_union() {
        let a = rule(&["{"], false);
        let b = rule(&["function", "class"], false);
        let merged = lookahead_intersect(Some(&a), Some(&b)).unwrap();
        assert!(!merged.positive);
        assert_eq!(merged.set.len(), 3);
        assert!(!lookahead_contains(Some(&merged), "class"));
        assert!(lookahead_contains(Some(&merged), "let"));
    }

    #[test]
    fn nt_display() {
        let nt = Nt::with_args(
            "Statement",
            [
                ("Yield", ArgValue::Bool(true)),
                ("Await", ArgValue::Bool(false)),
                ("Return", ArgValue::Var("Return".into())),
                ("In", ArgValue::Var("Other".into())),
            ],
        );
        assert_eq!(nt.to_string(), "Statement[+Yield, ~Await, ?Return, In=Other]");
        let init = Nt::init(Rc::new(Nt::new("Script")));
        assert_eq!(init.to_string(), "InitNt(Script)");
        assert_eq!(init.base_name(), "Script");
    }

    #[test]
    fn lookahead_display() {
        assert_eq!(rule(&["{"], false).to_string(), r#"[lookahead != "{"]"#);
        assert_eq!(
            rule(&["class", "let"], false).to_string(),
            r#"[lookahead not in {"class", "let"}]"#
        );
    }
}
