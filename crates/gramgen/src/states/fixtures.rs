//! Hand-built automata for unit tests.

use super::*;
use crate::grammar::{MethodType, Production, RawNtDef, ReduceExpr, Rhs, Type, TypeInfo, TypeSource};

fn t(s: &str) -> Element {
    Element::terminal(s)
}

pub(crate) fn sum_grammar() -> Grammar {
    sum_grammar_typed(sum_types())
}

pub(crate) fn sum_types() -> TypeInfo {
    let mut types = TypeInfo::default();
    types
        .nt_type("expr", Type::node("Expr"))
        .nt_type("term", Type::node("Expr"))
        .method(
            "expr_plus",
            MethodType::new(vec![Type::node("Expr"), Type::node("Expr")], Type::node("Expr")),
        )
        .method("term_num", MethodType::new(vec![Type::Str], Type::node("Expr")));
    types
}

pub(crate) fn sum_grammar_typed(types: TypeInfo) -> Grammar {
    Grammar::new(
        vec![
            (
                Nt::new("expr"),
                RawNtDef::new(vec![
                    Rhs::from(vec![t("term")]),
                    Rhs::from(Production::new(
                        vec![t("expr"), t("+"), t("term")],
                        ReduceExpr::call("expr_plus", vec![ReduceExpr::Slot(0), ReduceExpr::Slot(2)]),
                    )),
                ]),
            ),
            (
                Nt::new("term"),
                RawNtDef::new(vec![Production::new(
                    vec![t("NUM")],
                    ReduceExpr::call("term_num", vec![ReduceExpr::Slot(0)]),
                )]),
            ),
        ],
        None,
        ["NUM"],
        TypeSource::from(types),
    )
    .unwrap()
}

/// SLR automaton of
///
/// ```text
/// expr ::= term | expr "+" term
/// term ::= NUM
/// ```
pub(crate) fn sum_states() -> ParserStates {
    sum_states_of(sum_grammar())
}

/// The automaton of [`sum_states`] over another rendition of its grammar.
pub(crate) fn sum_states_of(grammar: Grammar) -> ParserStates {
    let prods = Prod::enumerate(&grammar);
    let expr = grammar.intern_nt(Nt::new("expr"));
    let term = grammar.intern_nt(Nt::new("term"));
    let num = || Term::terminal("NUM");
    let plus = || Term::terminal("+");

    let states = vec![
        State::new(0)
            .with_action(num(), Action::Shift(1))
            .with_goto(expr.clone(), 2)
            .with_goto(term.clone(), 3),
        State::new(1)
            .with_action(plus(), Action::Reduce(2))
            .with_action(Term::End, Action::Reduce(2))
            .with_traceback("NUM"),
        State::new(2)
            .with_action(plus(), Action::Shift(4))
            .with_action(Term::End, Action::Accept)
            .with_traceback("expr"),
        State::new(3)
            .with_action(plus(), Action::Reduce(0))
            .with_action(Term::End, Action::Reduce(0))
            .with_traceback("term"),
        State::new(4)
            .with_action(num(), Action::Shift(1))
            .with_goto(term, 5)
            .with_traceback("expr \"+\""),
        State::new(5)
            .with_action(plus(), Action::Reduce(1))
            .with_action(Term::End, Action::Reduce(1))
            .with_traceback("expr \"+\" term"),
    ];
    let mut init_state_map = Map::default();
    init_state_map.insert(expr, 0);
    ParserStates::new(grammar, states, prods, init_state_map).unwrap()
}

/// The sum automaton with a line-sensitive action, a recovery state and a
/// state driven by epsilon transitions grafted on.
pub(crate) fn flagged_states() -> ParserStates {
    let base = sum_states();
    let expr = base.grammar.intern_nt(Nt::new("expr"));
    let mut states = base.states.clone();
    states[2] = State::new(2)
        .with_action(
            Term::terminal("+"),
            Action::if_same_line(Action::Shift(4), Action::Accept),
        )
        .with_action(Term::End, Action::Accept)
        .with_action(Term::ErrorToken, Action::Shift(6))
        .with_error_code(RecoveryCode::Asi);
    states.push(
        State::new(6)
            .with_epsilon(
                EpsilonAction::Seq(vec![
                    EpsilonAction::FilterFlag { flag: 0, value: true },
                    EpsilonAction::FunCall {
                        method: "expr_asi".into(),
                        args: vec![FunArg::Slot(1)],
                        set_to: "value".into(),
                        offset: 0,
                    },
                    EpsilonAction::Reduce {
                        nt: expr.clone(),
                        replay: 0,
                        pop: 1,
                    },
                ]),
                2,
            )
            .with_epsilon(
                EpsilonAction::Seq(vec![
                    EpsilonAction::FilterFlag { flag: 0, value: false },
                    EpsilonAction::CheckNotOnNewLine { offset: -1 },
                    EpsilonAction::PushFlag { flag: 0, value: false },
                ]),
                4,
            )
            .with_epsilon(EpsilonAction::PopFlag { flag: 0 }, 2),
    );
    let init_state_map = base.init_state_map.clone();
    ParserStates::new(base.grammar, states, base.prods, init_state_map).unwrap()
}
