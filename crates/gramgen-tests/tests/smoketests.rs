use gramgen::{
    codegen::{self, dynamic::DynamicOptions, typed::TypedOptions, CodegenError},
    esgrammar::{self, EsGrammarBuilder, Fragment, GrammarKind, NtLhs},
    grammar::{
        Element, Grammar, Nt, RawNtDef, RecoveryCode, ReduceExpr, Rhs, TypeInfo, TypeSource,
    },
    states::{Action, ParserStates, Prod, State, Term},
    types::Map,
};
use gramgen_tests::grammars;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn smoketest_states(states: &ParserStates) {
    init_tracing();
    let typed = codegen::generate_typed(states).unwrap();
    eprintln!("typed:\n---\n{}", typed);
    let dynamic = codegen::generate_dynamic(states).unwrap();
    eprintln!("dynamic:\n---\n{}", dynamic);
}

#[test]
fn smoketest_arithmetic() {
    smoketest_states(&grammars::arithmetic().unwrap());
}

#[test]
fn smoketest_statements() {
    smoketest_states(&grammars::statements().unwrap());
}

#[test]
fn smoketest_operators() {
    smoketest_states(&grammars::operators(16).unwrap());
}

#[test]
fn generation_is_deterministic() {
    init_tracing();
    for states in [
        grammars::arithmetic().unwrap(),
        grammars::statements().unwrap(),
        grammars::postfix().unwrap(),
        grammars::bracketed().unwrap(),
    ] {
        let dynamic = DynamicOptions::default();
        assert_eq!(
            dynamic.generate(&states).unwrap(),
            dynamic.generate(&states).unwrap()
        );
    }
    let states = grammars::operators(8).unwrap();
    assert_eq!(
        codegen::generate_typed(&states).unwrap(),
        codegen::generate_typed(&states).unwrap()
    );
}

#[test]
fn arithmetic_outputs() {
    let states = grammars::arithmetic().unwrap();
    let typed = codegen::generate_typed(&states).unwrap();
    assert!(typed.contains("    Num(String),\n"));
    assert!(typed.contains("    LeftParenthesis,\n"));
    assert!(typed.contains("    fn add(&self, a0: Self::Expr, a1: Self::Expr) -> Self::Expr;\n"));
    assert!(typed.contains(
        "pub fn parse_expr<H, In>(handler: &H, tokens: In) -> Result<H::Expr, rt::ParseError>\n"
    ));

    let dynamic = codegen::generate_dynamic(&states).unwrap();
    assert!(dynamic.contains("const METHOD_NAMES: &[&str] = &[\"add\", \"mul\", \"num\"];\n"));
    assert!(dynamic.contains("pub fn parse_expr(\n"));
    assert!(!dynamic.contains("rt::Row::Procedure"));
}

#[test]
fn statements_desugar_with_asi() {
    let grammar = grammars::statements_grammar().unwrap();
    assert!(grammar.is_variable_terminal("Identifier"));
    assert_eq!(grammar.goals().len(), 1);

    let stmt = &grammar.nonterminals()[&Nt::new("Statement")];
    assert_eq!(stmt.rhs_list.len(), 2);
    assert_eq!(grammar.body_to_str(&stmt.rhs_list[0].body), "Identifier \";\"");
    assert_eq!(
        stmt.rhs_list[1].body.last(),
        Some(&Element::ErrorSymbol(RecoveryCode::Asi))
    );
    for prod in &stmt.rhs_list {
        assert_eq!(prod.action.to_string(), "Statement($0)");
    }

    let script = &grammar.nonterminals()[&Nt::new("Script")];
    assert_eq!(script.rhs_list[0].action.to_string(), "Script($0)");
    let list = &grammar.nonterminals()[&Nt::new("StatementList")];
    assert_eq!(list.rhs_list[1].action.to_string(), "StatementList 1($0, $1)");
}

#[test]
fn statements_outputs() {
    let states = grammars::statements().unwrap();
    let dynamic = codegen::generate_dynamic(&states).unwrap();
    assert!(dynamic.contains("    Some(rt::ErrorCode::Asi),\n"));
    assert!(dynamic.contains("pub fn parse_script(\n"));

    let typed = codegen::generate_typed(&states).unwrap();
    assert!(typed.contains("    Identifier(String),\n"));
    assert!(typed.contains("    fn statement_list_p1(&self, a0: Self::Script, a1: Self::Stmt) -> Self::Script;\n"));
    assert!(typed.contains("        StatementListP1(Box<Script>, Box<Stmt>),\n"));
}

#[test]
fn do_while_gets_its_own_recovery_code() {
    let builder = EsGrammarBuilder::new();
    let nt = esgrammar::nonterminal;
    let def = builder.nt_def(
        None,
        NtLhs::new("IterationStatement"),
        GrammarKind::Syntactic,
        vec![
            Fragment::new(vec![
                Element::terminal("do"),
                nt("Statement"),
                Element::terminal("while"),
                Element::terminal("("),
                nt("Expression"),
                Element::terminal(")"),
                Element::terminal(";"),
            ]),
            Fragment::new(vec![
                Element::terminal("while"),
                Element::terminal("("),
                nt("Expression"),
                Element::terminal(")"),
                nt("Statement"),
            ]),
        ],
    );
    let rhs = &def.def.rhs_list;
    assert_eq!(rhs.len(), 3);
    assert_eq!(
        rhs[1].body.last(),
        Some(&Element::ErrorSymbol(RecoveryCode::DoWhileAsi))
    );
    assert_eq!(rhs[0].action.to_string(), "IterationStatement 0($0, $1, $2, $3, $4, $5)");
    assert_eq!(rhs[2].action.to_string(), "IterationStatement 1($0, $1, $2, $3, $4)");
}

#[test]
fn production_groups_forward_values() {
    let builder = EsGrammarBuilder::new();
    let nt = esgrammar::nonterminal;
    let def = builder.nt_def(
        None,
        NtLhs::new("PrimaryExpression"),
        GrammarKind::Syntactic,
        vec![
            Fragment::new(vec![nt("Literal")]),
            Fragment::new(vec![nt("IdentifierReference")]),
        ],
    );
    assert_eq!(def.def.rhs_list[0].action, ReduceExpr::Slot(0).into());
    assert_eq!(def.def.rhs_list[1].action.to_string(), "PrimaryExpression 1($0)");

    let builder = EsGrammarBuilder::new()
        .production_groups([r"Thing$"])
        .unwrap();
    let def = builder.nt_def(
        None,
        NtLhs::new("BigThing"),
        GrammarKind::Syntactic,
        vec![Fragment::new(vec![nt("SmallThing")])],
    );
    assert_eq!(def.def.rhs_list[0].action, ReduceExpr::Slot(0).into());
}

#[test]
fn procedure_states_need_the_dynamic_backend() {
    let states = grammars::postfix().unwrap();
    match TypedOptions::default().generate(&states) {
        Err(CodegenError::UnsupportedState { state, .. }) => assert_eq!(state, 2),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }

    let dynamic = codegen::generate_dynamic(&states).unwrap();
    assert!(dynamic.contains("    rt::Row::Procedure(state_2_actions),\n"));
    assert!(dynamic.contains(
        "    if lexer.saw_line_terminator() {\n\
         \x20       return Err(rt::ParseError::SyntaxError);\n\
         \x20   }\n\
         \x20   parser.epsilon(3)?;\n\
         \x20   return Ok(rt::Step::Continue);\n"
    ));
}

#[test]
fn bracketed_procedures() {
    let states = grammars::bracketed().unwrap();
    assert!(codegen::generate_typed(&states).is_err());

    let dynamic = codegen::generate_dynamic(&states).unwrap();
    assert!(dynamic.contains(
        "    let value = parser.call(0, vec![parser.stack_value(1)?])?;\n\
         \x20   parser.epsilon_push(4, value)?;\n"
    ));
    assert!(dynamic.contains(
        "    let value = parser.stack_value(1)?;\n\
         \x20   parser.replay(\"item\", value, 0, 2, lexer)?;\n"
    ));
    assert!(dynamic.contains(
        "    parser.pop_flag(0)?;\n\
         \x20   let value = parser.call(1, vec![parser.stack_value(2)?])?;\n\
         \x20   parser.replay(\"item\", value, 0, 3, lexer)?;\n"
    ));
    assert!(dynamic.contains("    parser.replay(\"list\", value, 1, 1, lexer)?;\n"));
    assert!(dynamic.contains(
        "    if parser.flag(0) == Some(false) {\n\
         \x20       parser.epsilon(11)?;\n\
         \x20       return Ok(rt::Step::Continue);\n\
         \x20   }\n\
         \x20   Err(rt::ParseError::SyntaxError)\n"
    ));
    assert!(dynamic.contains(
        "const METHOD_NAMES: &[&str] = &[\"num\", \"group\", \"single\", \"append\"];\n"
    ));
}

#[test]
fn ambiguous_spellings_are_rejected() {
    let t = Element::terminal;
    let grammar = Grammar::new(
        vec![
            (Nt::new("Foo_Bar"), RawNtDef::new(vec![Rhs::from(vec![t("x")])])),
            (Nt::new("FooBar"), RawNtDef::new(vec![Rhs::from(vec![t("y")])])),
        ],
        None,
        ["x", "y"],
        TypeSource::from(TypeInfo::default()),
    )
    .unwrap();
    let prods = Prod::enumerate(&grammar);
    let foo_bar = grammar.intern_nt(Nt::new("Foo_Bar"));
    let states = vec![
        State::new(0)
            .with_action(Term::terminal("x"), Action::Shift(1))
            .with_goto(foo_bar.clone(), 2),
        State::new(1).with_action(Term::End, Action::Reduce(0)),
        State::new(2).with_action(Term::End, Action::Accept),
    ];
    let mut init_state_map = Map::default();
    init_state_map.insert(foo_bar, 0);
    let states = ParserStates::new(grammar, states, prods, init_state_map).unwrap();

    match codegen::generate_typed(&states) {
        Err(CodegenError::AmbiguousIdentifierSpelling {
            first,
            second,
            spelling,
        }) => {
            assert_eq!(first, "Foo_Bar");
            assert_eq!(second, "FooBar");
            assert_eq!(spelling, "FooBar");
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}
