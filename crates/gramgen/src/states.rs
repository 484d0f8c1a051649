//! Parser states computed by the automaton builder.
//!
//! Automaton construction happens upstream. This module only describes the
//! finished automaton in the shape the code generators consume, and checks
//! that its indices are consistent.

#[cfg(test)]
pub(crate) mod fixtures;

use crate::{
    grammar::{concrete_len, Element, Grammar, LookaheadRule, Nt, RecoveryCode, ReduceAction},
    types::{Map, Set},
    util::{display_fn, write_separated},
};
use std::{fmt, rc::Rc};

/// A column of an action row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Terminal(String),
    /// End of input.
    End,
    /// The synthetic token tried once when an error is recoverable.
    ErrorToken,
}

impl Term {
    pub fn terminal(name: impl Into<String>) -> Self {
        Self::Terminal(name.into())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(t) => write!(f, "{:?}", t),
            Self::End => f.write_str("$"),
            Self::ErrorToken => f.write_str("ErrorToken"),
        }
    }
}

/// An entry of an action row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(usize),
    /// Reduce by the production with this index in [`ParserStates::prods`].
    Reduce(usize),
    Accept,
    /// Choose by whether a line terminator preceded the lookahead token.
    IfSameLine {
        same_line: Box<Action>,
        line_break: Box<Action>,
    },
}

impl Action {
    pub fn if_same_line(same_line: Action, line_break: Action) -> Self {
        Self::IfSameLine {
            same_line: Box::new(same_line),
            line_break: Box::new(line_break),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(dest) => write!(f, "shift {}", dest),
            Self::Reduce(prod) => write!(f, "reduce {}", prod),
            Self::Accept => f.write_str("accept"),
            Self::IfSameLine {
                same_line,
                line_break,
            } => write!(f, "if same line {{{}}} else {{{}}}", same_line, line_break),
        }
    }
}

/// An argument of an [`EpsilonAction::FunCall`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunArg {
    /// The value `n` entries below the top of the stack, after the call's
    /// offset is added.
    Slot(usize),
    /// A local variable set by an earlier call of the same procedure.
    Var(String),
    Some(Box<FunArg>),
    None,
}

impl fmt::Display for FunArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slot(i) => write!(f, "${}", i),
            Self::Var(name) => f.write_str(name),
            Self::Some(inner) => write!(f, "Some({})", inner),
            Self::None => f.write_str("None"),
        }
    }
}

/// A transition that does not consume the lookahead token.
///
/// These appear in states whose behavior depends on parser-side state (the
/// flag stacks or the lexer's line-break memory) rather than on the next
/// token alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EpsilonAction {
    /// Pop `replay + pop` entries, push `nt`, then shift the `replay`
    /// popped entries again.
    Reduce {
        nt: Rc<Nt>,
        replay: usize,
        pop: usize,
    },
    /// Fail if a line terminator precedes the token at `offset`
    /// (`-1` is the lookahead token).
    CheckNotOnNewLine { offset: isize },
    /// Continue only if the top of flag stack `flag` equals `value`.
    FilterFlag { flag: usize, value: bool },
    PushFlag { flag: usize, value: bool },
    PopFlag { flag: usize },
    /// Call a builder method and store the result in the local `set_to`.
    ///
    /// `id` forwards its sole argument and `accept` finishes the parse.
    FunCall {
        method: String,
        args: Vec<FunArg>,
        set_to: String,
        offset: usize,
    },
    Seq(Vec<EpsilonAction>),
}

impl fmt::Display for EpsilonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reduce { nt, replay, pop } => {
                write!(f, "Reduce({}, replay: {}, pop: {})", nt, replay, pop)
            }
            Self::CheckNotOnNewLine { offset } => write!(f, "CheckNotOnNewLine({})", offset),
            Self::FilterFlag { flag, value } => write!(f, "FilterFlag({}, {})", flag, value),
            Self::PushFlag { flag, value } => write!(f, "PushFlag({}, {})", flag, value),
            Self::PopFlag { flag } => write!(f, "PopFlag({})", flag),
            Self::FunCall {
                method,
                args,
                set_to,
                offset,
            } => {
                write!(f, "{} = {}(", set_to, method)?;
                write_separated(f, ", ", args)?;
                write!(f, ") @{}", offset)
            }
            Self::Seq(actions) => {
                f.write_str("Seq(")?;
                write_separated(f, "; ", actions)?;
                f.write_str(")")
            }
        }
    }
}

/// An LR item: a production with a position and its follow set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LrItem {
    pub prod_index: usize,
    pub offset: usize,
    pub lookahead: Option<Rc<LookaheadRule>>,
    pub followed_by: Vec<Term>,
}

/// A numbered production of the automaton.
#[derive(Debug, Clone, PartialEq)]
pub struct Prod {
    pub nt: Rc<Nt>,
    /// The index of this production within its nonterminal definition.
    pub index: usize,
    pub body: Vec<Element>,
    pub action: ReduceAction,
}

impl Prod {
    /// Number every production of `grammar`, in definition order.
    pub fn enumerate(grammar: &Grammar) -> Vec<Prod> {
        grammar
            .nonterminals()
            .iter()
            .flat_map(|(nt, def)| {
                def.rhs_list.iter().enumerate().map(move |(index, prod)| Prod {
                    nt: nt.clone(),
                    index,
                    body: prod.body.clone(),
                    action: prod.action.clone(),
                })
            })
            .collect()
    }

    pub fn concrete_len(&self) -> usize {
        concrete_len(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub index: usize,
    pub action_row: Map<Term, Action>,
    /// Continuations after reducing to a nonterminal (the goto row).
    pub ctn_row: Map<Rc<Nt>, usize>,
    /// Epsilon transitions, tried in order. A state with any of these is
    /// driven by a generated procedure instead of a table row.
    pub epsilon: Vec<(EpsilonAction, usize)>,
    /// The recovery code of the error symbol this state can shift.
    pub error_code: Option<RecoveryCode>,
    /// A short description of how the state is reached, for comments.
    pub traceback: Option<String>,
    pub items: Vec<LrItem>,
}

impl State {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            action_row: Map::default(),
            ctn_row: Map::default(),
            epsilon: vec![],
            error_code: None,
            traceback: None,
            items: vec![],
        }
    }

    pub fn with_action(mut self, term: Term, action: Action) -> Self {
        self.action_row.insert(term, action);
        self
    }

    pub fn with_goto(mut self, nt: Rc<Nt>, dest: usize) -> Self {
        self.ctn_row.insert(nt, dest);
        self
    }

    pub fn with_epsilon(mut self, action: EpsilonAction, dest: usize) -> Self {
        self.epsilon.push((action, dest));
        self
    }

    pub fn with_error_code(mut self, code: RecoveryCode) -> Self {
        self.error_code = Some(code);
        self
    }

    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    pub fn with_item(mut self, item: LrItem) -> Self {
        self.items.push(item);
        self
    }

    /// Whether the behavior of this state depends on more than the
    /// lookahead token.
    pub fn is_inconsistent(&self) -> bool {
        !self.epsilon.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatesError {
    #[error("state {}: {}", state, msg)]
    Inconsistent { state: usize, msg: String },

    #[error("{}", msg)]
    Other { msg: String },
}

impl From<&str> for StatesError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}

impl From<String> for StatesError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

/// The finished automaton: the grammar, its numbered states and
/// productions, and the initial state of every goal.
#[derive(Debug)]
pub struct ParserStates {
    pub grammar: Grammar,
    pub states: Vec<State>,
    pub prods: Vec<Prod>,
    /// Keyed by goal nonterminal.
    pub init_state_map: Map<Rc<Nt>, usize>,
}

impl ParserStates {
    /// Bundle an automaton, checking that every index it contains is in
    /// range.
    pub fn new(
        grammar: Grammar,
        states: Vec<State>,
        prods: Vec<Prod>,
        init_state_map: Map<Rc<Nt>, usize>,
    ) -> Result<Self, StatesError> {
        let nstates = states.len();
        let bad = |state: usize, msg: String| StatesError::Inconsistent { state, msg };

        fn check_action(action: &Action, nstates: usize, nprods: usize) -> Result<(), String> {
            match action {
                Action::Shift(dest) if *dest >= nstates => {
                    Err(format!("shift to undefined state {}", dest))
                }
                Action::Reduce(prod) if *prod >= nprods => {
                    Err(format!("reduce by undefined production {}", prod))
                }
                Action::IfSameLine {
                    same_line,
                    line_break,
                } => {
                    check_action(same_line, nstates, nprods)?;
                    check_action(line_break, nstates, nprods)
                }
                _ => Ok(()),
            }
        }

        for (i, state) in states.iter().enumerate() {
            if state.index != i {
                return Err(bad(i, format!("numbered {}", state.index)));
            }
            for (term, action) in &state.action_row {
                check_action(action, nstates, prods.len())
                    .map_err(|msg| bad(i, format!("{} on {}", msg, term)))?;
            }
            for (nt, dest) in &state.ctn_row {
                if *dest >= nstates {
                    return Err(bad(i, format!("goto on {} to undefined state {}", nt, dest)));
                }
                if !grammar.nonterminals().contains_key(nt) {
                    return Err(bad(i, format!("goto on undefined nonterminal {}", nt)));
                }
            }
            for (action, dest) in &state.epsilon {
                if *dest >= nstates {
                    return Err(bad(i, format!("{} leads to undefined state {}", action, dest)));
                }
            }
            if state.error_code.is_some() && !state.action_row.contains_key(&Term::ErrorToken) {
                return Err(bad(i, "recovery code without an ErrorToken action".into()));
            }
        }
        for prod in &prods {
            if !grammar.nonterminals().contains_key(&prod.nt) {
                return Err(format!("production of undefined nonterminal {}", prod.nt).into());
            }
        }
        for (goal, state) in &init_state_map {
            if !grammar.goals().contains(goal) {
                return Err(format!("{} is not a goal nonterminal", goal).into());
            }
            if *state >= nstates {
                return Err(format!("goal {} starts in undefined state {}", goal, state).into());
            }
        }

        tracing::debug!(
            states = nstates,
            prods = prods.len(),
            goals = init_state_map.len(),
            "parser states loaded"
        );
        Ok(Self {
            grammar,
            states,
            prods,
            init_state_map,
        })
    }

    /// The columns of the action rows, in order of first use.
    pub fn terminals(&self) -> Set<&Term> {
        self.states
            .iter()
            .flat_map(|state| state.action_row.keys())
            .collect()
    }

    /// The columns of the goto rows, in order of first use.
    pub fn nonterminals(&self) -> Set<&Rc<Nt>> {
        self.states
            .iter()
            .flat_map(|state| state.ctn_row.keys())
            .collect()
    }
}

impl Grammar {
    /// `nt ::= a · [lookahead] b >> {followers}`
    pub fn lr_item_to_str(&self, prods: &[Prod], item: &LrItem) -> String {
        let prod = &prods[item.prod_index];
        let (before, after) = prod.body.split_at(item.offset.min(prod.body.len()));
        let body = display_fn(|f| {
            let mut parts: Vec<String> = before.iter().map(|e| self.element_to_str(e)).collect();
            parts.push("\u{b7}".into());
            if let Some(rule) = &item.lookahead {
                parts.push(rule.to_string());
            }
            parts.extend(after.iter().map(|e| self.element_to_str(e)));
            write_separated(f, " ", parts)
        });
        let followers = display_fn(|f| write_separated(f, ", ", &item.followed_by));
        format!("{} ::= {} >> {{{}}}", prod.nt, body, followers)
    }

    pub fn item_set_to_str(&self, prods: &[Prod], items: &[LrItem]) -> String {
        let items = display_fn(|f| {
            write_separated(f, ",  ", items.iter().map(|item| self.lr_item_to_str(prods, item)))
        });
        format!("{{{}}}", items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_is_consistent() {
        let states = fixtures::sum_states();
        assert_eq!(states.states.len(), 6);
        assert_eq!(states.prods.len(), 4);
        let terminals: Vec<String> = states.terminals().iter().map(|t| t.to_string()).collect();
        assert_eq!(terminals, ["\"NUM\"", "\"+\"", "$"]);
        let nts: Vec<String> = states.nonterminals().iter().map(|nt| nt.to_string()).collect();
        assert_eq!(nts, ["expr", "term"]);
    }

    #[test]
    fn out_of_range_indices() {
        let base = fixtures::sum_states();
        let mut states = base.states.clone();
        states[0] = states[0].clone().with_action(Term::terminal("+"), Action::Shift(17));
        let err = ParserStates::new(
            base.grammar.clone(),
            states,
            base.prods.clone(),
            base.init_state_map.iter().map(|(g, s)| (g.clone(), *s)).collect(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("undefined state 17"), "{}", err);

        let mut states = base.states.clone();
        states[3].index = 4;
        assert!(ParserStates::new(base.grammar.clone(), states, base.prods.clone(), Map::default()).is_err());
    }

    #[test]
    fn item_rendering() {
        let states = fixtures::sum_states();
        let item = LrItem {
            prod_index: 1,
            offset: 1,
            lookahead: None,
            followed_by: vec![Term::terminal("+"), Term::End],
        };
        assert_eq!(
            states.grammar.lr_item_to_str(&states.prods, &item),
            "expr ::= expr \u{b7} \"+\" term >> {\"+\", $}"
        );
        let start = LrItem {
            prod_index: 2,
            offset: 0,
            lookahead: Some(Rc::new(LookaheadRule::new(["("], false))),
            followed_by: vec![],
        };
        assert_eq!(
            states.grammar.item_set_to_str(&states.prods, &[item, start]),
            "{expr ::= expr \u{b7} \"+\" term >> {\"+\", $},  \
             term ::= \u{b7} [lookahead != \"(\"] NUM >> {}}"
        );
    }
}
