//! Grammars and hand-built automata for integration tests.

use anyhow::Context as _;
use gramgen::{
    esgrammar::{self, EsGrammarBuilder, Fragment, GrammarKind, NtLhs},
    grammar::{
        Element, Grammar, MethodType, Nt, Production, RawNtDef, RecoveryCode, ReduceExpr, Type,
        TypeInfo, TypeSource,
    },
    states::{Action, EpsilonAction, FunArg, ParserStates, Prod, State, Term},
    types::Map,
};
use std::rc::Rc;

fn t(s: &str) -> Element {
    Element::terminal(s)
}

fn call(method: &str, slots: &[usize]) -> ReduceExpr {
    ReduceExpr::call(method, slots.iter().map(|i| ReduceExpr::Slot(*i)).collect())
}

fn bundle(
    grammar: Grammar,
    states: Vec<State>,
    goal: &str,
) -> anyhow::Result<ParserStates> {
    let prods = Prod::enumerate(&grammar);
    let mut init_state_map: Map<Rc<Nt>, usize> = Map::default();
    init_state_map.insert(grammar.intern_nt(Nt::new(goal)), 0);
    ParserStates::new(grammar, states, prods, init_state_map)
        .with_context(|| format!("inconsistent automaton for goal {}", goal))
}

/// ```text
/// expr   ::= term | expr "+" term
/// term   ::= factor | term "*" factor
/// factor ::= NUM | "(" expr ")"
/// ```
pub fn arithmetic_grammar() -> anyhow::Result<Grammar> {
    let mut types = TypeInfo::default();
    let expr_ty = || Type::node("Expr");
    types
        .nt_type("expr", expr_ty())
        .nt_type("term", expr_ty())
        .nt_type("factor", expr_ty())
        .method("add", MethodType::new(vec![expr_ty(), expr_ty()], expr_ty()))
        .method("mul", MethodType::new(vec![expr_ty(), expr_ty()], expr_ty()))
        .method("num", MethodType::new(vec![Type::Str], expr_ty()));

    let grammar = Grammar::new(
        vec![
            (
                Nt::new("expr"),
                RawNtDef::new(vec![
                    Production::new(vec![t("term")], ReduceExpr::Slot(0)),
                    Production::new(vec![t("expr"), t("+"), t("term")], call("add", &[0, 2])),
                ]),
            ),
            (
                Nt::new("term"),
                RawNtDef::new(vec![
                    Production::new(vec![t("factor")], ReduceExpr::Slot(0)),
                    Production::new(vec![t("term"), t("*"), t("factor")], call("mul", &[0, 2])),
                ]),
            ),
            (
                Nt::new("factor"),
                RawNtDef::new(vec![
                    Production::new(vec![t("NUM")], call("num", &[0])),
                    Production::new(vec![t("("), t("expr"), t(")")], ReduceExpr::Slot(1)),
                ]),
            ),
        ],
        None,
        ["NUM"],
        TypeSource::from(types),
    )?;
    Ok(grammar)
}

/// The SLR(1) automaton of [`arithmetic_grammar`].
pub fn arithmetic() -> anyhow::Result<ParserStates> {
    let grammar = arithmetic_grammar()?;
    let expr = grammar.intern_nt(Nt::new("expr"));
    let term = grammar.intern_nt(Nt::new("term"));
    let factor = grammar.intern_nt(Nt::new("factor"));

    let shift_operand = |state: State| {
        state
            .with_action(Term::terminal("NUM"), Action::Shift(5))
            .with_action(Term::terminal("("), Action::Shift(4))
    };
    let reduce_all = |state: State, prod: usize| {
        ["+", "*", ")"]
            .iter()
            .fold(state, |state, op| {
                state.with_action(Term::terminal(*op), Action::Reduce(prod))
            })
            .with_action(Term::End, Action::Reduce(prod))
    };

    let states = vec![
        shift_operand(State::new(0))
            .with_goto(expr.clone(), 1)
            .with_goto(term.clone(), 2)
            .with_goto(factor.clone(), 3),
        State::new(1)
            .with_action(Term::terminal("+"), Action::Shift(6))
            .with_action(Term::End, Action::Accept)
            .with_traceback("expr"),
        State::new(2)
            .with_action(Term::terminal("*"), Action::Shift(7))
            .with_action(Term::terminal("+"), Action::Reduce(0))
            .with_action(Term::terminal(")"), Action::Reduce(0))
            .with_action(Term::End, Action::Reduce(0))
            .with_traceback("term"),
        reduce_all(State::new(3), 2).with_traceback("factor"),
        shift_operand(State::new(4))
            .with_goto(expr, 8)
            .with_goto(term.clone(), 2)
            .with_goto(factor.clone(), 3)
            .with_traceback("\"(\""),
        reduce_all(State::new(5), 4).with_traceback("NUM"),
        shift_operand(State::new(6))
            .with_goto(term, 9)
            .with_goto(factor.clone(), 3)
            .with_traceback("expr \"+\""),
        shift_operand(State::new(7))
            .with_goto(factor, 10)
            .with_traceback("term \"*\""),
        State::new(8)
            .with_action(Term::terminal(")"), Action::Shift(11))
            .with_action(Term::terminal("+"), Action::Shift(6))
            .with_traceback("\"(\" expr"),
        State::new(9)
            .with_action(Term::terminal("*"), Action::Shift(7))
            .with_action(Term::terminal("+"), Action::Reduce(1))
            .with_action(Term::terminal(")"), Action::Reduce(1))
            .with_action(Term::End, Action::Reduce(1))
            .with_traceback("expr \"+\" term"),
        reduce_all(State::new(10), 3).with_traceback("term \"*\" factor"),
        reduce_all(State::new(11), 5).with_traceback("\"(\" expr \")\""),
    ];
    bundle(grammar, states, "expr")
}

/// A statement list with automatic semicolon insertion, desugared from
/// ECMArkup-style definitions:
///
/// ```text
/// Script : StatementList
/// StatementList : Statement
/// StatementList : StatementList Statement
/// Statement : Identifier `;`
/// Identifier :: one of `x` `y` `z`
/// ```
pub fn statements_grammar() -> anyhow::Result<Grammar> {
    let builder = EsGrammarBuilder::new();
    let nt = esgrammar::nonterminal;
    let defs = vec![
        builder.nt_def(
            None,
            NtLhs::new("Script"),
            GrammarKind::Syntactic,
            vec![Fragment::new(vec![nt("StatementList")])],
        ),
        builder.nt_def(
            None,
            NtLhs::new("StatementList"),
            GrammarKind::Syntactic,
            vec![
                Fragment::new(vec![nt("Statement")]),
                Fragment::new(vec![nt("StatementList"), nt("Statement")]),
            ],
        ),
        builder.nt_def(
            None,
            NtLhs::new("Statement"),
            GrammarKind::Syntactic,
            vec![Fragment::new(vec![nt("Identifier"), t(";")])],
        ),
        builder.nt_def_one_of(
            None,
            NtLhs::new("Identifier"),
            GrammarKind::Lexical,
            ["x", "y", "z"],
        ),
    ];

    let mut types = TypeInfo::default();
    types
        .nt_type("Script", Type::node("Script"))
        .nt_type("StatementList", Type::node("Script"))
        .nt_type("Statement", Type::node("Stmt"))
        .method(
            "Script",
            MethodType::new(vec![Type::node("Script")], Type::node("Script")),
        )
        .method(
            "StatementList 0",
            MethodType::new(vec![Type::node("Stmt")], Type::node("Script")),
        )
        .method(
            "StatementList 1",
            MethodType::new(
                vec![Type::node("Script"), Type::node("Stmt")],
                Type::node("Script"),
            ),
        )
        .method("Statement", MethodType::new(vec![Type::Str], Type::node("Stmt")));

    let grammar = esgrammar::finish(defs, &["Script"], true, TypeSource::from(types))?;
    Ok(grammar)
}

/// The LR(0) automaton of [`statements_grammar`]. State 4 recovers from a
/// missing semicolon through the error token.
pub fn statements() -> anyhow::Result<ParserStates> {
    let grammar = statements_grammar()?;
    let script = grammar.intern_nt(Nt::new("Script"));
    let list = grammar.intern_nt(Nt::new("StatementList"));
    let stmt = grammar.intern_nt(Nt::new("Statement"));
    let ident = || Term::terminal("Identifier");
    let reduce_all = |state: State, prod: usize| {
        state
            .with_action(ident(), Action::Reduce(prod))
            .with_action(Term::End, Action::Reduce(prod))
    };

    let states = vec![
        State::new(0)
            .with_action(ident(), Action::Shift(4))
            .with_goto(script, 1)
            .with_goto(list, 2)
            .with_goto(stmt.clone(), 3),
        State::new(1)
            .with_action(Term::End, Action::Accept)
            .with_traceback("Script"),
        State::new(2)
            .with_action(ident(), Action::Shift(4))
            .with_action(Term::End, Action::Reduce(0))
            .with_goto(stmt, 5)
            .with_traceback("StatementList"),
        reduce_all(State::new(3), 1).with_traceback("Statement"),
        State::new(4)
            .with_action(Term::terminal(";"), Action::Shift(6))
            .with_action(Term::ErrorToken, Action::Shift(7))
            .with_error_code(RecoveryCode::Asi)
            .with_traceback("Identifier"),
        reduce_all(State::new(5), 2).with_traceback("StatementList Statement"),
        reduce_all(State::new(6), 3).with_traceback("Identifier \";\""),
        reduce_all(State::new(7), 4).with_traceback("Identifier ErrorSymbol(asi)"),
    ];
    bundle(grammar, states, "Script")
}

/// ```text
/// Expr ::= Identifier | Expr [no LineTerminator here] "++"
/// ```
pub fn postfix_grammar() -> anyhow::Result<Grammar> {
    let grammar = Grammar::new(
        vec![(
            Nt::new("Expr"),
            RawNtDef::new(vec![
                Production::new(vec![t("Identifier")], call("ident", &[0])),
                Production::new(
                    vec![t("Expr"), Element::NoLineTerminatorHere, t("++")],
                    call("postinc", &[0]),
                ),
            ]),
        )],
        None,
        ["Identifier"],
        TypeSource::from(TypeInfo::default()),
    )?;
    Ok(grammar)
}

/// The automaton of [`postfix_grammar`]. State 2 checks for a line break
/// before the lookahead token, so it is driven by a procedure.
pub fn postfix() -> anyhow::Result<ParserStates> {
    let grammar = postfix_grammar()?;
    let expr = grammar.intern_nt(Nt::new("Expr"));
    let incr = || Term::terminal("++");

    let states = vec![
        State::new(0)
            .with_action(Term::terminal("Identifier"), Action::Shift(1))
            .with_goto(expr, 2),
        State::new(1)
            .with_action(incr(), Action::Reduce(0))
            .with_action(Term::End, Action::Reduce(0))
            .with_traceback("Identifier"),
        State::new(2)
            .with_epsilon(EpsilonAction::CheckNotOnNewLine { offset: -1 }, 3)
            .with_traceback("Expr"),
        State::new(3)
            .with_action(incr(), Action::Shift(4))
            .with_action(Term::End, Action::Accept)
            .with_traceback("Expr [no LineTerminator here]"),
        State::new(4)
            .with_action(incr(), Action::Reduce(1))
            .with_action(Term::End, Action::Reduce(1))
            .with_traceback("Expr \"++\""),
    ];
    bundle(grammar, states, "Expr")
}

/// ```text
/// item ::= NUM | "[" list "]"
/// list ::= item | list "," item
/// ```
pub fn bracketed_grammar() -> anyhow::Result<Grammar> {
    let grammar = Grammar::new(
        vec![
            (
                Nt::new("item"),
                RawNtDef::new(vec![
                    Production::new(vec![t("NUM")], call("num", &[0])),
                    Production::new(vec![t("["), t("list"), t("]")], call("group", &[1])),
                ]),
            ),
            (
                Nt::new("list"),
                RawNtDef::new(vec![
                    Production::new(vec![t("item")], call("single", &[0])),
                    Production::new(vec![t("list"), t(","), t("item")], call("append", &[0, 2])),
                ]),
            ),
        ],
        None,
        ["NUM"],
        TypeSource::from(TypeInfo::default()),
    )?;
    Ok(grammar)
}

/// An automaton of [`bracketed_grammar`] driven mostly by procedures.
///
/// Flag 0 is true inside brackets. State 10 follows every `item` reached
/// from states 1 and 5 and decides by that flag whether a list may go on,
/// so a comma at the top level is a syntax error. `NUM` leaves a computed
/// value that state 4 pops together with the token, and state 13 reduces a
/// list under the `,` or `]` it has already shifted, then shifts it again.
pub fn bracketed() -> anyhow::Result<ParserStates> {
    let grammar = bracketed_grammar()?;
    let item = grammar.intern_nt(Nt::new("item"));
    let list = grammar.intern_nt(Nt::new("list"));
    let fun_call = |method: &str, slot: usize| EpsilonAction::FunCall {
        method: method.into(),
        args: vec![FunArg::Slot(slot)],
        set_to: "value".into(),
        offset: 0,
    };
    let shift_item = |state: State| {
        state
            .with_action(Term::terminal("NUM"), Action::Shift(2))
            .with_action(Term::terminal("["), Action::Shift(3))
    };

    let states = vec![
        State::new(0).with_epsilon(EpsilonAction::PushFlag { flag: 0, value: false }, 1),
        shift_item(State::new(1)).with_goto(item.clone(), 10),
        State::new(2)
            .with_epsilon(fun_call("num", 1), 4)
            .with_traceback("NUM"),
        State::new(3)
            .with_epsilon(EpsilonAction::PushFlag { flag: 0, value: true }, 5)
            .with_traceback("\"[\""),
        State::new(4)
            .with_epsilon(
                EpsilonAction::Seq(vec![
                    fun_call("id", 1),
                    EpsilonAction::Reduce {
                        nt: item.clone(),
                        replay: 0,
                        pop: 2,
                    },
                ]),
                10,
            )
            .with_traceback("NUM"),
        shift_item(State::new(5))
            .with_goto(item.clone(), 10)
            .with_goto(list.clone(), 7)
            .with_traceback("\"[\""),
        State::new(6)
            .with_action(Term::terminal(","), Action::Shift(13))
            .with_action(Term::terminal("]"), Action::Shift(13))
            .with_traceback("\"[\" item"),
        State::new(7)
            .with_action(Term::terminal(","), Action::Shift(9))
            .with_action(Term::terminal("]"), Action::Shift(8))
            .with_traceback("\"[\" list"),
        State::new(8)
            .with_epsilon(
                EpsilonAction::Seq(vec![
                    EpsilonAction::PopFlag { flag: 0 },
                    fun_call("group", 2),
                    EpsilonAction::Reduce {
                        nt: item.clone(),
                        replay: 0,
                        pop: 3,
                    },
                ]),
                10,
            )
            .with_traceback("\"[\" list \"]\""),
        shift_item(State::new(9))
            .with_goto(item, 12)
            .with_traceback("list \",\""),
        State::new(10)
            .with_epsilon(EpsilonAction::FilterFlag { flag: 0, value: true }, 6)
            .with_epsilon(EpsilonAction::FilterFlag { flag: 0, value: false }, 11)
            .with_traceback("item"),
        State::new(11)
            .with_action(Term::End, Action::Accept)
            .with_traceback("item"),
        State::new(12)
            .with_action(Term::terminal(","), Action::Reduce(3))
            .with_action(Term::terminal("]"), Action::Reduce(3))
            .with_traceback("list \",\" item"),
        State::new(13)
            .with_epsilon(
                EpsilonAction::Seq(vec![
                    fun_call("single", 2),
                    EpsilonAction::Reduce {
                        nt: list,
                        replay: 1,
                        pop: 1,
                    },
                ]),
                7,
            )
            .with_traceback("\"[\" item \",\""),
    ];
    bundle(grammar, states, "item")
}

/// `k` left-associative binary operators `op0` ... `op{k-1}` over `NUM`,
/// all of the same precedence.
pub fn operators(k: usize) -> anyhow::Result<ParserStates> {
    let mut types = TypeInfo::default();
    types
        .nt_type("expr", Type::node("Expr"))
        .nt_type("atom", Type::node("Expr"))
        .method(
            "binary",
            MethodType::new(vec![Type::node("Expr"), Type::node("Expr")], Type::node("Expr")),
        )
        .method("num", MethodType::new(vec![Type::Str], Type::node("Expr")));

    let ops: Vec<String> = (0..k).map(|i| format!("op{}", i)).collect();
    let mut expr_rhs = vec![Production::new(vec![t("atom")], ReduceExpr::Slot(0))];
    for op in &ops {
        expr_rhs.push(Production::new(
            vec![t("expr"), t(op), t("atom")],
            call("binary", &[0, 2]),
        ));
    }
    let grammar = Grammar::new(
        vec![
            (Nt::new("expr"), RawNtDef::new(expr_rhs)),
            (
                Nt::new("atom"),
                RawNtDef::new(vec![Production::new(vec![t("NUM")], call("num", &[0]))]),
            ),
        ],
        None,
        ["NUM"],
        TypeSource::from(types),
    )?;

    let expr = grammar.intern_nt(Nt::new("expr"));
    let atom = grammar.intern_nt(Nt::new("atom"));
    let reduce_all = |state: State, prod: usize| {
        ops.iter()
            .fold(state, |state, op| {
                state.with_action(Term::terminal(op.as_str()), Action::Reduce(prod))
            })
            .with_action(Term::End, Action::Reduce(prod))
    };

    let mut states = vec![
        State::new(0)
            .with_action(Term::terminal("NUM"), Action::Shift(1))
            .with_goto(expr, 2)
            .with_goto(atom.clone(), 3),
        reduce_all(State::new(1), k + 1).with_traceback("NUM"),
        ops.iter()
            .enumerate()
            .fold(State::new(2), |state, (i, op)| {
                state.with_action(Term::terminal(op.as_str()), Action::Shift(4 + 2 * i))
            })
            .with_action(Term::End, Action::Accept)
            .with_traceback("expr"),
        reduce_all(State::new(3), 0).with_traceback("atom"),
    ];
    for (i, op) in ops.iter().enumerate() {
        let operand = 4 + 2 * i;
        states.push(
            State::new(operand)
                .with_action(Term::terminal("NUM"), Action::Shift(1))
                .with_goto(atom.clone(), operand + 1)
                .with_traceback(format!("expr {:?}", op)),
        );
        states.push(
            reduce_all(State::new(operand + 1), i + 1)
                .with_traceback(format!("expr {:?} atom", op)),
        );
    }
    bundle(grammar, states, "expr")
}
