//! Desugaring of ECMArkup grammar fragments.
//!
//! The ECMAScript specification writes its grammars in a notation with
//! conditions (`[+In]`), lookahead restrictions, `but not` exclusions and an
//! implicit rule for automatic semicolon insertion. The builder here turns the
//! fragments produced by a tokenizer for that notation into plain
//! [`NtDef`]s, and [`finish`] assembles them into a validated [`Grammar`].

use crate::{
    grammar::{
        concrete_len, ArgValue, Condition, Element, Exclusion, Grammar, GrammarError,
        LookaheadRule, Nt, NtDef, Production, RawNtDef, RecoveryCode, ReduceAction,
        ReduceExpr, Type, TypeSource,
    },
    types::{Map, Set},
};
use regex::Regex;
use std::{fmt, rc::Rc};

/// The production groups of the ECMAScript grammar.
///
/// A production `A : B` whose two names match the same group forwards the
/// value of `B` instead of calling a builder method, so `Statement :
/// IfStatement` gets the reducer `$0`.
pub const ECMASCRIPT_PRODUCTION_GROUPS: &[&str] = &[
    r"(Expression|^(Array|Object)?Literal)$",
    r"(Statement|Declaration|^StatementListItem|^ModuleItem)$",
    r"Method(Definition)?$",
];

/// Nonterminals whose semicolon-terminated productions never take part in
/// automatic semicolon insertion.
pub const ECMASCRIPT_ASI_EXEMPT_PREFIXES: &[&str] = &["ForLexicalDeclaration"];

/// The grammar a nonterminal definition belongs to, after the number of
/// colons in its definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    /// `:`
    Syntactic,
    /// `::`
    Lexical,
    /// `:::`
    NumericString,
}

impl GrammarKind {
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            ":" => Some(Self::Syntactic),
            "::" => Some(Self::Lexical),
            ":::" => Some(Self::NumericString),
            _ => None,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::Syntactic => ":",
            Self::Lexical => "::",
            Self::NumericString => ":::",
        }
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EsGrammarError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(
        "all goal nonterminals must be part of the same grammar; \
         got {goals:?} (matching these grammars: {kinds:?})"
    )]
    MixedGrammarGoals {
        goals: Vec<String>,
        kinds: Vec<GrammarKind>,
    },
}

/// The left-hand side of a definition: `Name` or `Name[Param, ...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NtLhs {
    pub name: String,
    pub params: Vec<String>,
}

impl NtLhs {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: vec![],
        }
    }

    pub fn with_params<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

/// One right-hand side line of a definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub body: Vec<Element>,
    /// `None` if the line has no explicit `=> reducer`.
    pub reducer: Option<ReduceExpr>,
    pub condition: Option<Condition>,
}

impl Fragment {
    pub fn new(body: Vec<Element>) -> Self {
        Self {
            body,
            reducer: None,
            condition: None,
        }
    }

    pub fn with_reducer(mut self, reducer: ReduceExpr) -> Self {
        self.reducer = Some(reducer);
        self
    }

    /// `[+param]` / `[~param]` prefix.
    pub fn with_condition(mut self, param: impl Into<String>, value: bool) -> Self {
        self.condition = Some(Condition {
            param: param.into(),
            value,
        });
        self
    }
}

/// A desugared definition, tagged with the grammar it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct EsNtDef {
    pub name: String,
    pub kind: GrammarKind,
    pub def: NtDef,
}

/// Turns fragments into nonterminal definitions.
#[derive(Debug, Clone)]
pub struct EsGrammarBuilder {
    production_groups: Vec<Regex>,
    asi_exempt_prefixes: Vec<String>,
}

impl Default for EsGrammarBuilder {
    fn default() -> Self {
        Self {
            production_groups: ECMASCRIPT_PRODUCTION_GROUPS
                .iter()
                .map(|pattern| Regex::new(pattern).unwrap_or_else(|e| unreachable!("{}", e)))
                .collect(),
            asi_exempt_prefixes: ECMASCRIPT_ASI_EXEMPT_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EsGrammarBuilder {
    /// A builder configured for the ECMAScript grammar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the production groups used for default reducer inference.
    pub fn production_groups<I, S>(mut self, patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.production_groups = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Replace the nonterminal name prefixes exempt from semicolon insertion.
    pub fn asi_exempt_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asi_exempt_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Return `true` if `lhs_name` and the name of `rhs` match the same
    /// production group.
    pub fn is_matched_pair(&self, lhs_name: &str, rhs: &Element) -> bool {
        let rhs_name = match rhs {
            Element::Terminal(name) => &**name,
            Element::Nt(nt) => nt.base_name(),
            _ => return false,
        };
        self.production_groups
            .iter()
            .any(|group| group.is_match(lhs_name) && group.is_match(rhs_name))
    }

    /// The reducer of a fragment written without one.
    pub fn default_reducer(
        &self,
        lhs_name: &str,
        index: usize,
        body: &[Element],
        is_sole_production: bool,
    ) -> ReduceExpr {
        let nargs = concrete_len(body);
        if body.len() == 1 && nargs == 1 && self.is_matched_pair(lhs_name, &body[0]) {
            return ReduceExpr::Slot(0);
        }
        let method = if is_sole_production {
            lhs_name.to_owned()
        } else {
            format!("{} {}", lhs_name, index)
        };
        ReduceExpr::call(method, ReduceExpr::slots(nargs))
    }

    pub fn to_production(
        &self,
        lhs_name: &str,
        index: usize,
        fragment: Fragment,
        is_sole_production: bool,
    ) -> Production {
        let reducer = match fragment.reducer {
            Some(reducer) => reducer,
            None => self.default_reducer(lhs_name, index, &fragment.body, is_sole_production),
        };
        Production {
            body: fragment.body,
            action: ReduceAction::Expr(reducer),
            condition: fragment.condition,
        }
    }

    /// Return `true` if automatic semicolon insertion may happen at the end
    /// of `prod`.
    ///
    /// A body consisting of `;` alone (empty statements, class members) does
    /// not qualify, and neither do semicolons other than the last element.
    pub fn needs_asi(&self, lhs_name: &str, prod: &Production) -> bool {
        !self
            .asi_exempt_prefixes
            .iter()
            .any(|prefix| lhs_name.starts_with(&**prefix))
            && prod.body.len() > 1
            && prod.body.last().map_or(false, |e| e.is_terminal(";"))
    }

    /// Split `prod` into the production consuming the semicolon and a
    /// fallback ending in an error symbol that performs the insertion.
    ///
    /// With an inferred reducer the semicolon is not passed to the method, so
    /// both alternatives call it with the same arguments.
    pub fn apply_asi(&self, prod: Production, reducer_was_autogenerated: bool) -> [Production; 2] {
        let action = match prod.action {
            ReduceAction::Expr(ReduceExpr::Call(mut call)) if reducer_was_autogenerated => {
                call.args.pop();
                ReduceAction::Expr(ReduceExpr::Call(call))
            }
            action => action,
        };

        let code = if is_do_while(&prod.body) {
            RecoveryCode::DoWhileAsi
        } else {
            RecoveryCode::Asi
        };

        let mut fallback_body = prod.body.clone();
        fallback_body.pop();
        fallback_body.push(Element::ErrorSymbol(code));

        tracing::trace!(code = %code, len = prod.body.len(), "split production for ASI");

        [
            Production {
                body: prod.body,
                action: action.clone(),
                condition: prod.condition.clone(),
            },
            Production {
                body: fallback_body,
                action,
                condition: prod.condition,
            },
        ]
    }

    /// Desugar one definition `lhs : fragments`.
    pub fn nt_def(
        &self,
        ty: Option<Type>,
        lhs: NtLhs,
        kind: GrammarKind,
        fragments: Vec<Fragment>,
    ) -> EsNtDef {
        let is_sole_production = fragments.len() == 1;
        let mut rhs_list = Vec::with_capacity(fragments.len());
        for (i, fragment) in fragments.into_iter().enumerate() {
            let reducer_was_autogenerated = fragment.reducer.is_none();
            let prod = self.to_production(&lhs.name, i, fragment, is_sole_production);
            if self.needs_asi(&lhs.name, &prod) {
                rhs_list.extend(self.apply_asi(prod, reducer_was_autogenerated));
            } else {
                rhs_list.push(prod);
            }
        }
        EsNtDef {
            name: lhs.name,
            kind,
            def: NtDef {
                params: lhs.params,
                rhs_list,
                ty,
            },
        }
    }

    /// Desugar `lhs :: one of t1 t2 ...`.
    pub fn nt_def_one_of<I, S>(
        &self,
        ty: Option<Type>,
        lhs: NtLhs,
        kind: GrammarKind,
        terminals: I,
    ) -> EsNtDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = terminals
            .into_iter()
            .map(|t| Fragment::new(vec![Element::Terminal(t.into())]))
            .collect();
        self.nt_def(ty, lhs, kind, fragments)
    }
}

fn is_do_while(body: &[Element]) -> bool {
    body.len() == 7
        && body[0].is_terminal("do")
        && body[2].is_terminal("while")
        && body[3].is_terminal("(")
        && body[5].is_terminal(")")
        && body[6].is_terminal(";")
}

/// `[lookahead == t]`
pub fn la_eq(t: impl Into<String>) -> Element {
    Element::lookahead([t.into()], true)
}

/// `[lookahead != t]`
pub fn la_ne(t: impl Into<String>) -> Element {
    Element::lookahead([t.into()], false)
}

/// `[lookahead ∉ Nonterminal]`
pub fn la_not_in_nonterminal(nt: impl Into<String>) -> Element {
    Element::lookahead([nt.into()], false)
}

/// `[lookahead ∉ { a, b c, ... }]`
///
/// Each exclusion is a token sequence. Only single-token exclusions can be
/// expressed as a lookahead rule.
pub fn la_not_in_set<I>(exclusions: I) -> Result<Element, GrammarError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let exclusions: Vec<Vec<String>> = exclusions.into_iter().collect();
    if let Some(long) = exclusions.iter().find(|seq| seq.len() != 1) {
        return Err(format!("unsupported: lookahead > 1 token, {:?}", long).into());
    }
    let set = exclusions.into_iter().flatten();
    Ok(Element::Lookahead(Rc::new(LookaheadRule::new(set, false))))
}

/// `[no LineTerminator here]`
pub fn no_line_terminator_here() -> Element {
    Element::NoLineTerminatorHere
}

/// A reference to a nonterminal without arguments.
pub fn nonterminal(name: impl Into<String>) -> Element {
    Element::nt(Nt::new(name))
}

/// `Name[args]`. Every parameter may be passed once.
pub fn nonterminal_apply<S>(name: S, args: Vec<(String, ArgValue)>) -> Result<Element, GrammarError>
where
    S: Into<String>,
{
    let name = name.into();
    let mut seen = Set::default();
    if let Some((dup, _)) = args.iter().find(|(param, _)| !seen.insert(param)) {
        return Err(format!("parameter {} passed multiple times to {}", dup, name).into());
    }
    Ok(Element::nt(Nt::with_args(name, args)))
}

/// The sigil of a nonterminal argument.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sigil {
    /// `+`
    True,
    /// `~`
    False,
    /// `?`
    Pass,
}

/// `+Param`, `~Param`, `?Param`
pub fn arg_expr(sigil: Sigil, name: impl Into<String>) -> (String, ArgValue) {
    let name = name.into();
    let value = match sigil {
        Sigil::True => ArgValue::Bool(true),
        Sigil::False => ArgValue::Bool(false),
        Sigil::Pass => ArgValue::Var(name.clone()),
    };
    (name, value)
}

pub fn optional(e: Element) -> Element {
    Element::optional(e)
}

/// `nt but not exclusion`
pub fn but_not(nt: Element, exclusion: Exclusion) -> Element {
    but_not_one_of(nt, vec![exclusion])
}

/// `nt but not one of a or b ...`
pub fn but_not_one_of(nt: Element, excluded: Vec<Exclusion>) -> Element {
    Element::Exclude {
        nt: Box::new(nt),
        excluded,
    }
}

/// The terminal denoted by a code point abbreviation: `<LF>`, `<ZWNJ>`,
/// `U+00A0` and so on.
///
/// `<USP>` stands for any character in the `Zs` category and is returned as
/// the terminal `Zs`, which the grammar should declare as a variable
/// terminal.
pub fn code_point(abbrev: &str) -> Result<Element, GrammarError> {
    let ch = match abbrev {
        "<ZWNJ>" => '\u{200c}',
        "<ZWJ>" => '\u{200d}',
        "<ZWNBSP>" => '\u{feff}',
        "<TAB>" => '\t',
        "<VT>" => '\u{000b}',
        "<FF>" => '\u{000c}',
        "<SP>" => ' ',
        "<NBSP>" => '\u{00a0}',
        "<USP>" => return Ok(Element::terminal("Zs")),
        "<LF>" => '\n',
        "<CR>" => '\r',
        "<LS>" => '\u{2028}',
        "<PS>" => '\u{2029}',
        _ => {
            let hex = abbrev
                .strip_prefix("U+")
                .filter(|hex| hex.len() == 4)
                .ok_or_else(|| format!("unrecognized character abbreviation {:?}", abbrev))?;
            u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| format!("invalid code point {:?}", abbrev))?
        }
    };
    Ok(Element::Terminal(ch.to_string()))
}

/// Assemble desugared definitions into a grammar.
///
/// With `single_grammar`, all goals must belong to one kind of grammar, and
/// definitions of other kinds become variable terminals: relative to a
/// syntactic grammar, `IdentifierName` is a token.
pub fn finish(
    nt_defs: Vec<EsNtDef>,
    goals: &[&str],
    single_grammar: bool,
    types: TypeSource<'_>,
) -> Result<Grammar, EsGrammarError> {
    let span = tracing::debug_span!("esgrammar_finish", goals = ?goals);
    let _enter = span.enter();

    let mut kinds: Map<String, GrammarKind> = Map::default();
    for def in &nt_defs {
        if kinds.insert(def.name.clone(), def.kind).is_some() {
            return Err(GrammarError::from(format!(
                "duplicate definitions for nonterminal {:?}",
                def.name
            ))
            .into());
        }
    }

    if goals.is_empty() {
        return Err(GrammarError::from("no goal nonterminals specified").into());
    }

    let selected = if single_grammar {
        let mut selected: Vec<GrammarKind> = vec![];
        for goal in goals {
            let kind = *kinds
                .get(*goal)
                .ok_or_else(|| GrammarError::from(format!("undefined goal {:?}", goal)))?;
            if !selected.contains(&kind) {
                selected.push(kind);
            }
        }
        if selected.len() > 1 {
            return Err(EsGrammarError::MixedGrammarGoals {
                goals: goals.iter().map(|g| g.to_string()).collect(),
                kinds: selected,
            });
        }
        selected.first().copied()
    } else {
        None
    };

    let mut variable_terminals: Set<String> = Set::default();
    let mut selected_defs = vec![];
    for def in nt_defs {
        match selected {
            Some(kind) if def.kind != kind => {
                variable_terminals.insert(def.name);
            }
            _ => selected_defs.push(def),
        }
    }
    tracing::debug!(
        nonterminals = selected_defs.len(),
        variable_terminals = variable_terminals.len(),
        "selected grammar"
    );

    let nt_names: Set<&str> = selected_defs.iter().map(|d| &*d.name).collect();
    let mut nonterminals = Vec::with_capacity(selected_defs.len());
    for es_def in &selected_defs {
        let mut rhs_list = Vec::with_capacity(es_def.def.rhs_list.len());
        for prod in &es_def.def.rhs_list {
            let body = prod
                .body
                .iter()
                .map(|e| fold_element(e, &variable_terminals, &nt_names))
                .collect::<Result<_, _>>()?;
            rhs_list.push(Production {
                body,
                action: prod.action.clone(),
                condition: prod.condition.clone(),
            });
        }
        let def = NtDef {
            params: es_def.def.params.clone(),
            rhs_list,
            ty: es_def.def.ty.clone(),
        };
        nonterminals.push((Nt::new(es_def.name.clone()), RawNtDef::from(def)));
    }

    let grammar = Grammar::new(
        nonterminals,
        Some(goals.iter().map(|g| Nt::new(*g)).collect()),
        variable_terminals,
        types,
    )?;
    Ok(grammar)
}

/// Replace references to folded nonterminals by variable terminals, and
/// reject terminals spelled like nonterminals.
fn fold_element(
    e: &Element,
    variable_terminals: &Set<String>,
    nt_names: &Set<&str>,
) -> Result<Element, GrammarError> {
    Ok(match e {
        Element::Nt(nt) if nt.args.is_empty() && variable_terminals.contains(nt.base_name()) => {
            Element::Terminal(nt.base_name().to_owned())
        }
        Element::Terminal(t) if nt_names.contains(&**t) => {
            return Err(format!(
                "grammar contains both a terminal `{}` and nonterminal {}",
                t, t
            )
            .into())
        }
        Element::Optional(inner) => {
            Element::optional(fold_element(inner, variable_terminals, nt_names)?)
        }
        Element::Exclude { nt, excluded } => Element::Exclude {
            nt: Box::new(fold_element(nt, variable_terminals, nt_names)?),
            excluded: excluded.clone(),
        },
        e => e.clone(),
    })
}
