//! Grammar types.

mod body;
mod element;
mod expr;
mod typeinfo;

pub use self::{element::*, expr::*, typeinfo::*};

use crate::{
    types::{Interner, Map, Set},
    util::{display_fn, is_identifier, write_separated},
};
use std::{fmt, rc::Rc};

/// Restricts a production to family members whose parameter has the given
/// value (`#[if +param]`, `#[if ~param]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub param: String,
    pub value: bool,
}

/// A production rule: body, reduce action, and optional condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    pub body: Vec<Element>,
    pub action: ReduceAction,
    pub condition: Option<Condition>,
}

impl Production {
    pub fn new(body: Vec<Element>, action: impl Into<ReduceAction>) -> Self {
        Self {
            body,
            action: action.into(),
            condition: None,
        }
    }

    pub fn with_condition(mut self, param: impl Into<String>, value: bool) -> Self {
        self.condition = Some(Condition {
            param: param.into(),
            value,
        });
        self
    }

    /// The number of body elements that push a value.
    pub fn concrete_len(&self) -> usize {
        concrete_len(&self.body)
    }
}

/// A right-hand side as supplied to grammar construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    /// A body without an action; construction infers a default action.
    Bare(Vec<Element>),
    Production(Production),
}

impl From<Vec<Element>> for Rhs {
    fn from(body: Vec<Element>) -> Self {
        Self::Bare(body)
    }
}

impl From<Production> for Rhs {
    fn from(prod: Production) -> Self {
        Self::Production(prod)
    }
}

/// A nonterminal definition as supplied to grammar construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawNtDef {
    pub params: Vec<String>,
    pub rhs_list: Vec<Rhs>,
    pub ty: Option<Type>,
}

impl RawNtDef {
    pub fn new<I, R>(rhs_list: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rhs>,
    {
        Self {
            params: vec![],
            rhs_list: rhs_list.into_iter().map(Into::into).collect(),
            ty: None,
        }
    }

    pub fn with_params<P, S>(mut self, params: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }
}

impl From<NtDef> for RawNtDef {
    fn from(def: NtDef) -> Self {
        Self {
            params: def.params,
            rhs_list: def.rhs_list.into_iter().map(Rhs::Production).collect(),
            ty: def.ty,
        }
    }
}

/// The validated definition of one nonterminal family.
#[derive(Debug, Clone, PartialEq)]
pub struct NtDef {
    pub params: Vec<String>,
    pub rhs_list: Vec<Production>,
    pub ty: Option<Type>,
}

/// Where the type assignment of a new grammar comes from.
pub enum TypeSource<'a> {
    Known(Rc<TypeInfo>),
    Infer(&'a dyn InferTypes),
}

impl From<TypeInfo> for TypeSource<'_> {
    fn from(info: TypeInfo) -> Self {
        Self::Known(Rc::new(info))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("invalid grammar: {}", msg)]
    Invalid { msg: String },

    #[error("type inference failed: {}", _0)]
    TypeInference(anyhow::Error),
}

impl From<&str> for GrammarError {
    fn from(msg: &str) -> Self {
        Self::Invalid { msg: msg.into() }
    }
}

impl From<String> for GrammarError {
    fn from(msg: String) -> Self {
        Self::Invalid { msg }
    }
}

/// A validated grammar.
///
/// Nonterminal values and lookahead rules are canonicalized through interners
/// owned by the grammar, so equal values reachable from one grammar share a
/// single allocation.
#[derive(Debug)]
pub struct Grammar {
    nonterminals: Map<Rc<Nt>, NtDef>,
    goals: Vec<Rc<Nt>>,
    init_nts: Vec<Rc<Nt>>,
    terminals: Set<String>,
    variable_terminals: Set<String>,
    nt_params: Map<String, Vec<String>>,
    type_info: Rc<TypeInfo>,
    nts: Interner<Nt>,
    lookaheads: Interner<LookaheadRule>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for t in &self.terminals {
            if self.variable_terminals.contains(t) {
                writeln!(f, "- {} (variable)", t)?;
            } else {
                writeln!(f, "- {:?}", t)?;
            }
        }
        writeln!(f, "\n## goals:")?;
        for goal in &self.goals {
            writeln!(f, "- {}", goal)?;
        }
        writeln!(f, "\n## nonterminals:")?;
        for (nt, def) in &self.nonterminals {
            write!(f, "{}", nt)?;
            if !def.params.is_empty() {
                f.write_str("[")?;
                write_separated(f, ", ", &def.params)?;
                f.write_str("]")?;
            }
            writeln!(f, " ::=")?;
            for prod in &def.rhs_list {
                writeln!(f, "    {} => {}", self.rhs_to_str(prod), prod.action)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Grammar {
    /// Build and validate a grammar.
    ///
    /// `goals` defaults to the first nonterminal. Every goal gets a
    /// synthesized init nonterminal appended to the nonterminal map.
    pub fn new<N, V, S>(
        nonterminals: N,
        goals: Option<Vec<Nt>>,
        variable_terminals: V,
        types: TypeSource<'_>,
    ) -> Result<Self, GrammarError>
    where
        N: IntoIterator<Item = (Nt, RawNtDef)>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let span = tracing::debug_span!("grammar_new");
        let _enter = span.enter();

        let input: Vec<(Nt, RawNtDef)> = nonterminals.into_iter().collect();
        let variable_terminals: Set<String> =
            variable_terminals.into_iter().map(Into::into).collect();

        let nt_params = collect_params(&input, &variable_terminals)?;
        let applied_keys = input.iter().any(|(key, _)| !key.args.is_empty());

        let mut g = Grammar {
            nonterminals: Map::default(),
            goals: vec![],
            init_nts: vec![],
            terminals: Set::default(),
            variable_terminals,
            nt_params,
            type_info: Rc::default(),
            nts: Interner::default(),
            lookaheads: Interner::default(),
        };

        let goals = match goals {
            Some(goals) => goals,
            None => {
                let first = input
                    .iter()
                    .find(|(key, _)| !key.is_init())
                    .ok_or("grammar has no nonterminals")?;
                vec![first.0.clone()]
            }
        };
        if goals.is_empty() {
            return Err("grammar has no goal nonterminals".into());
        }
        for goal in goals {
            let goal = g.resolve_goal(&goal, &input, applied_keys)?;
            if !g.goals.contains(&goal) {
                g.goals.push(goal);
            }
        }

        let mut used_terminals = Set::default();
        for (key, raw) in &input {
            let key = g.intern_key(key)?;
            let params: &[String] = match &key.name {
                NtName::Plain(name) => g.nt_params.get(name).map_or(&[], |p| &p[..]),
                NtName::Init(..) => &[],
            };
            let sole_production = raw.rhs_list.len() == 1;
            let mut rhs_list = Vec::with_capacity(raw.rhs_list.len());
            for (i, rhs) in raw.rhs_list.iter().enumerate() {
                let prod = match rhs {
                    Rhs::Bare(body) => {
                        let body = g.resolve_body(body, params, &mut used_terminals)?;
                        let action = default_action(&key, i, &body, sole_production);
                        Production::new(body, action)
                    }
                    Rhs::Production(prod) => Production {
                        body: g.resolve_body(&prod.body, params, &mut used_terminals)?,
                        action: prod.action.clone(),
                        condition: prod.condition.clone(),
                    },
                };
                if let Some(cond) = &prod.condition {
                    if !params.contains(&cond.param) {
                        return Err(format!(
                            "production #{} of {} is conditional on undefined parameter {:?}",
                            i, key, cond.param
                        )
                        .into());
                    }
                }
                check_action(&key, i, &prod)?;
                rhs_list.push(prod);
            }
            if let Some(goal) = key.init_goal() {
                check_init_shape(&key, goal, &rhs_list)?;
            }
            let def = NtDef {
                params: params.to_vec(),
                rhs_list,
                ty: raw.ty.clone(),
            };
            g.nonterminals.insert(key, def);
        }

        if applied_keys {
            g.check_applied_references()?;
        }

        g.terminals = g.variable_terminals.clone();
        g.terminals.extend(used_terminals);

        g.type_info = match types {
            TypeSource::Known(info) => info,
            TypeSource::Infer(infer) => {
                let info = infer.infer_types(&g).map_err(GrammarError::TypeInference)?;
                Rc::new(info)
            }
        };

        for goal in g.goals.clone() {
            let init = g.nts.intern(Nt::init(goal.clone()));
            if !g.nonterminals.contains_key(&init) {
                let def = NtDef {
                    params: vec![],
                    rhs_list: vec![Production::new(
                        vec![Element::Nt(goal)],
                        ReduceAction::Accept,
                    )],
                    ty: None,
                };
                g.nonterminals.insert(init.clone(), def);
            }
            g.init_nts.push(init);
        }

        tracing::debug!(
            nonterminals = g.nonterminals.len(),
            terminals = g.terminals.len(),
            goals = g.goals.len(),
            "grammar validated"
        );
        Ok(g)
    }

    /// Build a grammar with the same goals, variable terminals and type
    /// information as this one, but a different set of nonterminals.
    pub fn with_nonterminals<N>(&self, nonterminals: N) -> Result<Grammar, GrammarError>
    where
        N: IntoIterator<Item = (Nt, NtDef)>,
    {
        Grammar::new(
            nonterminals
                .into_iter()
                .map(|(nt, def)| (nt, RawNtDef::from(def))),
            Some(self.goals.iter().map(|g| (**g).clone()).collect()),
            self.variable_terminals.iter().cloned(),
            TypeSource::Known(self.type_info.clone()),
        )
    }

    pub fn nonterminals(&self) -> &Map<Rc<Nt>, NtDef> {
        &self.nonterminals
    }

    pub fn goals(&self) -> &[Rc<Nt>] {
        &self.goals
    }

    pub fn init_nts(&self) -> &[Rc<Nt>] {
        &self.init_nts
    }

    /// Every terminal used by some production, plus the variable terminals.
    pub fn terminals(&self) -> &Set<String> {
        &self.terminals
    }

    pub fn variable_terminals(&self) -> &Set<String> {
        &self.variable_terminals
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.terminals.contains(name)
    }

    pub fn is_variable_terminal(&self, name: &str) -> bool {
        self.variable_terminals.contains(name)
    }

    /// The parameter names of the nonterminal family `name`.
    pub fn nt_params(&self, name: &str) -> Option<&[String]> {
        self.nt_params.get(name).map(|p| &p[..])
    }

    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub fn nt_type(&self, nt: &Nt) -> Option<&Type> {
        self.type_info.nt_types.get(nt.base_name())
    }

    pub fn method_type(&self, method: &str) -> Option<&MethodType> {
        self.type_info.methods.get(method)
    }

    /// Return the canonical instance of `nt` for this grammar.
    pub fn intern_nt(&self, nt: Nt) -> Rc<Nt> {
        match nt.name {
            NtName::Init(goal) => self.nts.intern(Nt::init(self.nts.intern_rc(&goal))),
            NtName::Plain(..) => self.nts.intern(nt),
        }
    }

    /// Return the canonical instance of `rule` for this grammar.
    pub fn intern_lookahead(&self, rule: LookaheadRule) -> Rc<LookaheadRule> {
        self.lookaheads.intern(rule)
    }

    pub fn element_to_str(&self, e: &Element) -> String {
        self.display_element(e).to_string()
    }

    pub fn display_element<'g>(&'g self, e: &'g Element) -> impl fmt::Display + 'g {
        display_fn(move |f| self.fmt_element(e, f))
    }

    fn fmt_element(&self, e: &Element, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match e {
            Element::Terminal(t) if self.variable_terminals.contains(t) => f.write_str(t),
            Element::Terminal(t) => write!(f, "{:?}", t),
            Element::Nt(nt) => write!(f, "{}", nt),
            Element::Optional(inner) => {
                self.fmt_element(inner, f)?;
                f.write_str("?")
            }
            Element::Lookahead(rule) => write!(f, "{}", rule),
            Element::NoLineTerminatorHere => f.write_str("[no LineTerminator here]"),
            Element::Exclude { nt, excluded } => {
                self.fmt_element(nt, f)?;
                f.write_str(" but not ")?;
                if excluded.len() == 1 {
                    write!(f, "{}", excluded[0])
                } else {
                    f.write_str("one of ")?;
                    write_separated(f, " or ", excluded)
                }
            }
            Element::ErrorToken => f.write_str("ErrorToken"),
            Element::ErrorSymbol(code) => write!(f, "ErrorSymbol({})", code),
        }
    }

    /// Render a production body, prefixed with its condition if any.
    pub fn rhs_to_str(&self, prod: &Production) -> String {
        let mut out = String::new();
        if let Some(cond) = &prod.condition {
            let sign = if cond.value { '+' } else { '~' };
            out += &format!("#[if {}{}] ", sign, cond.param);
        }
        out += &self.body_to_str(&prod.body);
        out
    }

    pub fn body_to_str(&self, body: &[Element]) -> String {
        if body.is_empty() {
            return "[empty]".into();
        }
        display_fn(|f| write_separated(f, " ", body.iter().map(|e| self.display_element(e))))
            .to_string()
    }

    /// `nt ::= rhs => action`
    pub fn production_to_str(&self, nt: &Nt, prod: &Production) -> String {
        format!("{} ::= {} => {}", nt, self.rhs_to_str(prod), prod.action)
    }

    fn resolve_goal(
        &self,
        goal: &Nt,
        input: &[(Nt, RawNtDef)],
        applied_keys: bool,
    ) -> Result<Rc<Nt>, GrammarError> {
        let undefined = || GrammarError::from(format!("goal {} is not a defined nonterminal", goal));
        let name = match &goal.name {
            NtName::Plain(name) => name,
            NtName::Init(..) => return Err(undefined()),
        };
        let params = self.nt_params.get(name).ok_or_else(undefined)?;
        if applied_keys && !goal.args.is_empty() {
            if !input.iter().any(|(key, _)| key == goal) {
                return Err(undefined());
            }
        } else if !goal.param_names().eq(params.iter().map(|p| &**p))
            || goal.args.iter().any(|(_, v)| !matches!(v, ArgValue::Bool(..)))
        {
            return Err(undefined());
        }
        Ok(self.nts.intern(goal.clone()))
    }

    fn intern_key(&self, key: &Nt) -> Result<Rc<Nt>, GrammarError> {
        if let Some(goal) = key.init_goal() {
            if !self.goals.iter().any(|g| **g == **goal) {
                return Err(format!("{} is defined for {}, which is not a goal", key, goal).into());
            }
        }
        Ok(self.intern_nt(key.clone()))
    }

    fn resolve_body(
        &self,
        body: &[Element],
        params: &[String],
        used_terminals: &mut Set<String>,
    ) -> Result<Vec<Element>, GrammarError> {
        body.iter()
            .map(|e| self.resolve_element(e, params, used_terminals))
            .collect()
    }

    fn resolve_element(
        &self,
        e: &Element,
        params: &[String],
        used_terminals: &mut Set<String>,
    ) -> Result<Element, GrammarError> {
        Ok(match e {
            Element::Terminal(t) => match self.nt_params.get(t) {
                Some(p) if p.is_empty() => Element::Nt(self.nts.intern(Nt::new(t.clone()))),
                Some(p) => {
                    return Err(format!(
                        "nonterminal {} is used without its parameters {:?}",
                        t, p
                    )
                    .into())
                }
                None => {
                    used_terminals.insert(t.clone());
                    Element::Terminal(t.clone())
                }
            },
            Element::Nt(nt) => Element::Nt(self.resolve_nt(nt, params)?),
            Element::Optional(inner) => match **inner {
                Element::Terminal(..) | Element::Nt(..) | Element::Exclude { .. } => {
                    Element::optional(self.resolve_element(inner, params, used_terminals)?)
                }
                _ => {
                    return Err(format!(
                        "unsupported element inside optional: {}",
                        self.display_element(inner)
                    )
                    .into())
                }
            },
            Element::Lookahead(rule) => Element::Lookahead(self.lookaheads.intern_rc(rule)),
            Element::Exclude { nt, excluded } => {
                let inner = self.resolve_element(nt, params, used_terminals)?;
                if !matches!(inner, Element::Nt(..) | Element::Terminal(..)) {
                    return Err(format!(
                        "exclusions apply only to symbols, not {}",
                        self.display_element(&inner)
                    )
                    .into());
                }
                Element::Exclude {
                    nt: Box::new(inner),
                    excluded: excluded.clone(),
                }
            }
            Element::NoLineTerminatorHere | Element::ErrorToken | Element::ErrorSymbol(..) => {
                e.clone()
            }
        })
    }

    fn resolve_nt(&self, nt: &Nt, params: &[String]) -> Result<Rc<Nt>, GrammarError> {
        let name = match &nt.name {
            NtName::Plain(name) => name,
            NtName::Init(..) => {
                return Err(format!("{} cannot appear in a production body", nt).into())
            }
        };
        let expected = self
            .nt_params
            .get(name)
            .ok_or_else(|| format!("undefined nonterminal {}", nt))?;
        if !nt.param_names().eq(expected.iter().map(|p| &**p)) {
            return Err(format!(
                "wrong arguments for {}: expected parameters [{}]",
                nt,
                expected.join(", ")
            )
            .into());
        }
        for (_, value) in &nt.args {
            if let ArgValue::Var(var) = value {
                if !params.contains(var) {
                    return Err(format!("undefined variable {:?} passed to {}", var, nt).into());
                }
            }
        }
        Ok(self.nts.intern(nt.clone()))
    }

    /// With fully-applied keys, every nonterminal reference must name a key.
    fn check_applied_references(&self) -> Result<(), GrammarError> {
        fn referenced(e: &Element) -> Option<&Rc<Nt>> {
            match e {
                Element::Nt(nt) => Some(nt),
                Element::Optional(inner) => referenced(inner),
                Element::Exclude { nt, .. } => referenced(nt),
                _ => None,
            }
        }
        for (key, def) in &self.nonterminals {
            for prod in &def.rhs_list {
                for nt in prod.body.iter().filter_map(referenced) {
                    if !self.nonterminals.contains_key(nt) {
                        return Err(format!(
                            "undefined nonterminal {} referenced in {}",
                            nt,
                            self.production_to_str(key, prod)
                        )
                        .into());
                    }
                }
            }
        }
        Ok(())
    }
}

/// Deep copy. The copy owns fresh interners and shares no canonical
/// instances with the original.
impl Clone for Grammar {
    fn clone(&self) -> Self {
        let nts = Interner::default();
        let lookaheads = Interner::default();

        fn copy_nt(nt: &Nt, nts: &Interner<Nt>) -> Rc<Nt> {
            match &nt.name {
                NtName::Init(goal) => nts.intern(Nt::init(copy_nt(goal, nts))),
                NtName::Plain(..) => nts.intern(nt.clone()),
            }
        }
        fn copy_element(
            e: &Element,
            nts: &Interner<Nt>,
            lookaheads: &Interner<LookaheadRule>,
        ) -> Element {
            match e {
                Element::Nt(nt) => Element::Nt(copy_nt(nt, nts)),
                Element::Optional(inner) => {
                    Element::Optional(Box::new(copy_element(inner, nts, lookaheads)))
                }
                Element::Lookahead(rule) => Element::Lookahead(lookaheads.intern((**rule).clone())),
                Element::Exclude { nt, excluded } => Element::Exclude {
                    nt: Box::new(copy_element(nt, nts, lookaheads)),
                    excluded: excluded.clone(),
                },
                e => e.clone(),
            }
        }

        let nonterminals = self
            .nonterminals
            .iter()
            .map(|(nt, def)| {
                let rhs_list = def
                    .rhs_list
                    .iter()
                    .map(|prod| Production {
                        body: prod
                            .body
                            .iter()
                            .map(|e| copy_element(e, &nts, &lookaheads))
                            .collect(),
                        action: prod.action.clone(),
                        condition: prod.condition.clone(),
                    })
                    .collect();
                let def = NtDef {
                    params: def.params.clone(),
                    rhs_list,
                    ty: def.ty.clone(),
                };
                (copy_nt(nt, &nts), def)
            })
            .collect();

        Self {
            nonterminals,
            goals: self.goals.iter().map(|g| copy_nt(g, &nts)).collect(),
            init_nts: self.init_nts.iter().map(|n| copy_nt(n, &nts)).collect(),
            terminals: self.terminals.clone(),
            variable_terminals: self.variable_terminals.clone(),
            nt_params: self.nt_params.clone(),
            type_info: Rc::new((*self.type_info).clone()),
            nts,
            lookaheads,
        }
    }
}

/// Check the key set and compute the parameter list of every family.
fn collect_params(
    input: &[(Nt, RawNtDef)],
    variable_terminals: &Set<String>,
) -> Result<Map<String, Vec<String>>, GrammarError> {
    let applied_keys = input.iter().any(|(key, _)| !key.args.is_empty());
    let mut seen = Set::default();
    let mut nt_params: Map<String, Vec<String>> = Map::default();
    for (key, def) in input {
        if !seen.insert(key) {
            return Err(format!("duplicate definition of {}", key).into());
        }
        let name = match &key.name {
            NtName::Plain(name) => name,
            NtName::Init(..) => {
                if !key.args.is_empty() || !def.params.is_empty() {
                    return Err(format!("{} cannot take parameters", key).into());
                }
                continue;
            }
        };
        if !is_identifier(name) {
            return Err(format!("invalid nonterminal name {:?}", name).into());
        }
        if variable_terminals.contains(name) {
            return Err(format!("{:?} is both a terminal and a nonterminal", name).into());
        }
        let params: Vec<String> = if applied_keys {
            if !def.params.is_empty() {
                return Err(format!(
                    "{} declares parameters, but the grammar is keyed by applied nonterminals",
                    key
                )
                .into());
            }
            if key.args.iter().any(|(_, v)| !matches!(v, ArgValue::Bool(..))) {
                return Err(format!("key {} must bind every parameter to a boolean", key).into());
            }
            key.param_names().map(String::from).collect()
        } else {
            def.params.clone()
        };
        if let Some(p) = params.iter().find(|p| !is_identifier(p)) {
            return Err(format!("invalid parameter name {:?} in {}", p, key).into());
        }
        match nt_params.get(name) {
            Some(existing) if *existing != params => {
                return Err(format!(
                    "conflicting parameter name lists for {}: [{}] and [{}]",
                    name,
                    existing.join(", "),
                    params.join(", ")
                )
                .into());
            }
            Some(..) => {}
            None => {
                nt_params.insert(name.clone(), params);
            }
        }
    }
    Ok(nt_params)
}

/// The action of a bare right-hand side.
fn default_action(nt: &Nt, index: usize, body: &[Element], sole_production: bool) -> ReduceAction {
    let nargs = concrete_len(body);
    if body.len() == 1 && nargs == 1 {
        return ReduceExpr::Slot(0).into();
    }
    let method = if sole_production {
        nt.base_name().to_owned()
    } else {
        format!("{} {}", nt.base_name(), index)
    };
    ReduceExpr::call(method, ReduceExpr::slots(nargs)).into()
}

fn check_action(nt: &Nt, index: usize, prod: &Production) -> Result<(), GrammarError> {
    let expr = match &prod.action {
        ReduceAction::Accept if nt.is_init() => return Ok(()),
        ReduceAction::Accept => {
            return Err(format!(
                "production #{} of {} uses <accept> outside an init nonterminal",
                index, nt
            )
            .into())
        }
        ReduceAction::Expr(expr) => expr,
    };
    if nt.is_init() {
        return Err(format!("production #{} of {} must be <accept>", index, nt).into());
    }

    let concrete = prod.concrete_len();
    let mut out_of_range = None;
    expr.for_each_slot(&mut |i| {
        if i >= concrete && out_of_range.is_none() {
            out_of_range = Some(i);
        }
    });
    if let Some(i) = out_of_range {
        return Err(format!(
            "element number {} out of range for production #{} of {} ({} concrete elements)",
            i, index, nt, concrete
        )
        .into());
    }

    let mut bad_method = None;
    expr.for_each_call(&mut |call| {
        if bad_method.is_none() && !is_method_name(&call.method) {
            bad_method = Some(call.method.clone());
        }
    });
    if let Some(method) = bad_method {
        return Err(format!(
            "invalid method name {:?} in production #{} of {}",
            method, index, nt
        )
        .into());
    }
    Ok(())
}

/// Init nonterminals take one of three shapes:
///
/// * `[goal]`
/// * `[goal?]`
/// * `[]` and `[goal]`
fn check_init_shape(key: &Nt, goal: &Nt, rhs_list: &[Production]) -> Result<(), GrammarError> {
    let is_goal = |e: &Element| matches!(e, Element::Nt(nt) if **nt == *goal);
    let ok = match rhs_list {
        [single] => match &single.body[..] {
            [e] => is_goal(e) || matches!(e, Element::Optional(inner) if is_goal(&**inner)),
            _ => false,
        },
        [a, b] => a.body.is_empty() && matches!(&b.body[..], [e] if is_goal(e)),
        _ => false,
    };
    if !ok || rhs_list.iter().any(|p| p.condition.is_some()) {
        return Err(format!("malformed init nonterminal {}", key).into());
    }
    Ok(())
}
