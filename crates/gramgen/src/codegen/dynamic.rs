//! The dynamically dispatched backend.
//!
//! Terminals and nonterminals are named by string in the generated tables,
//! reduce actions become functions over [`Value`] vectors that call builder
//! methods by index, and states with epsilon transitions become procedures.
//! The table of builder methods is accumulated while the reductions and
//! procedures are compiled and becomes `METHOD_NAMES`. `default_builder`
//! tags those and every other method of the grammar's type info.
//!
//! [`Value`]: gramgen_runtime::dynamic::Value

use super::{rust_str, CodegenError, Emitter};
use crate::{
    grammar::{RecoveryCode, ReduceAction, ReduceExpr},
    states::{Action, EpsilonAction, FunArg, ParserStates, Prod, State, Term},
    types::{Map, Set},
    util::is_identifier,
};
use gramgen_runtime::definition::ParseAction;

#[derive(Debug, Clone)]
pub struct DynamicOptions {
    /// The path of the runtime's `dynamic` module.
    pub runtime_path: String,
}

impl Default for DynamicOptions {
    fn default() -> Self {
        Self {
            runtime_path: "::gramgen_runtime::dynamic".into(),
        }
    }
}

impl DynamicOptions {
    pub fn generate(&self, states: &ParserStates) -> Result<String, CodegenError> {
        let span = tracing::debug_span!("codegen_dynamic");
        let _enter = span.enter();

        let mut gen = DynamicGen {
            states,
            methods: MethodTable::default(),
            special_cases: Set::default(),
        };
        let mut out = Emitter::new();
        emit!(out, 0, "// @generated by gramgen. Do not edit.")?;
        out.blank();
        emit!(out, 0, "use {} as rt;", self.runtime_path)?;
        out.blank();

        for (i, prod) in states.prods.iter().enumerate() {
            gen.reduce_fn(&mut out, i, prod)?;
        }
        let mut procedures = 0;
        for state in states.states.iter().filter(|state| state.is_inconsistent()) {
            gen.procedure(&mut out, state)?;
            procedures += 1;
        }
        gen.actions(&mut out)?;
        gen.ctns(&mut out)?;
        gen.reductions(&mut out)?;
        gen.special_cases(&mut out)?;
        gen.error_codes(&mut out)?;
        gen.entries(&mut out)?;

        tracing::debug!(
            states = states.states.len(),
            prods = states.prods.len(),
            procedures,
            methods = gen.methods.names.len(),
            "dynamic parser emitted"
        );
        Ok(out.finish())
    }
}

/// Builder methods in order of first use.
#[derive(Debug, Default)]
struct MethodTable {
    names: Set<String>,
}

impl MethodTable {
    fn index(&mut self, method: &str) -> usize {
        match self.names.get_index_of(method) {
            Some(index) => index,
            None => self.names.insert_full(method.to_owned()).0,
        }
    }
}

struct DynamicGen<'a> {
    states: &'a ParserStates,
    methods: MethodTable,
    /// `(same_line, line_break)` action words.
    special_cases: Set<(String, String)>,
}

impl DynamicGen<'_> {
    fn reduce_fn(&mut self, out: &mut Emitter, index: usize, prod: &Prod) -> Result<(), CodegenError> {
        let grammar = &self.states.grammar;
        let rendered = format!(
            "{} ::= {} => {}",
            prod.nt,
            grammar.body_to_str(&prod.body),
            prod.action
        );
        let arity = prod.concrete_len();

        let mut uses: Map<usize, usize> = Map::default();
        if let Some(expr) = prod.action.expr() {
            expr.for_each_slot(&mut |i| *uses.entry(i).or_insert(0) += 1);
        }
        if let Some(i) = uses.keys().find(|i| **i >= arity) {
            return Err(CodegenError::UnsupportedReduceShape {
                production: rendered,
                reason: format!("${} is out of range", i),
            });
        }

        let result = match &prod.action {
            ReduceAction::Accept if arity > 0 => {
                uses.insert(0, 1);
                "Ok(x0)".to_owned()
            }
            ReduceAction::Accept => "Ok(rt::Value::None)".to_owned(),
            ReduceAction::Expr(ReduceExpr::Call(call)) => {
                let index = self.methods.index(&call.method);
                let args = self.call_args(&call.args, &uses)?;
                format!("m.call({}, vec![{}])", index, args)
            }
            ReduceAction::Expr(expr) => format!("Ok({})", self.expr(expr, &uses)?),
        };
        tracing::trace!(prod = index, nt = %prod.nt, "reduction");

        emit!(out, 0, "// {}", rendered)?;
        emit!(
            out,
            0,
            "fn reduce_{}(m: &rt::Methods, x: Vec<rt::Value>) -> Result<rt::Value, rt::ParseError> {{",
            index
        )?;
        if arity == 0 {
            emit!(out, 1, "rt::take::<0>(x)?;")?;
        } else {
            let names: Vec<String> = (0..arity)
                .map(|i| {
                    if uses.contains_key(&i) {
                        format!("x{}", i)
                    } else {
                        "_".into()
                    }
                })
                .collect();
            emit!(out, 1, "let [{}] = rt::take(x)?;", names.join(", "))?;
        }
        emit!(out, 1, "{}", result)?;
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn call_args(&mut self, args: &[ReduceExpr], uses: &Map<usize, usize>) -> Result<String, CodegenError> {
        let args = args
            .iter()
            .map(|arg| self.expr(arg, uses))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(args.join(", "))
    }

    fn expr(&mut self, expr: &ReduceExpr, uses: &Map<usize, usize>) -> Result<String, CodegenError> {
        Ok(match expr {
            ReduceExpr::Slot(i) if uses.get(i).copied().unwrap_or(0) > 1 => format!("x{}.clone()", i),
            ReduceExpr::Slot(i) => format!("x{}", i),
            ReduceExpr::Call(call) => {
                let index = self.methods.index(&call.method);
                let args = self.call_args(&call.args, uses)?;
                format!("m.call({}, vec![{}])?", index, args)
            }
            // Optional values are plain values or `None` at run time.
            ReduceExpr::Some(inner) => self.expr(inner, uses)?,
            ReduceExpr::None => "rt::Value::None".into(),
        })
    }

    fn procedure(&mut self, out: &mut Emitter, state: &State) -> Result<(), CodegenError> {
        let unsupported = |reason: String| CodegenError::UnsupportedState {
            state: state.index,
            reason,
        };
        tracing::trace!(state = state.index, edges = state.epsilon.len(), "procedure");

        emit!(out, 0, "fn state_{}_actions(", state.index)?;
        emit!(out, 1, "parser: &mut rt::Parser<'_>,")?;
        emit!(out, 1, "lexer: &mut dyn rt::Lexer,")?;
        emit!(out, 0, ") -> Result<rt::Step, rt::ParseError> {{")?;
        if let Some(traceback) = &state.traceback {
            emit!(out, 1, "// {}", traceback)?;
        }
        emit!(out, 1, "let value = rt::Value::None;")?;

        let mut reachable = true;
        for (action, dest) in &state.epsilon {
            if !reachable {
                tracing::trace!(state = state.index, %action, "unreachable epsilon transition");
                break;
            }
            emit!(out, 1, "// {} -> {}", action, dest)?;
            let mut steps = vec![];
            flatten(action, &mut steps);

            let mut indent = 1;
            let mut finished = false;
            // `value` holds the result of a call made on this transition.
            let mut computed = false;
            for step in steps {
                if finished {
                    return Err(unsupported(format!("{} follows the end of a transition", step)));
                }
                match step {
                    EpsilonAction::FilterFlag { flag, value } => {
                        emit!(out, indent, "if parser.flag({}) == Some({}) {{", flag, value)?;
                        indent += 1;
                    }
                    EpsilonAction::CheckNotOnNewLine { offset: -1 } => {
                        emit!(out, indent, "if lexer.saw_line_terminator() {{")?;
                        emit!(out, indent + 1, "return Err(rt::ParseError::SyntaxError);")?;
                        emit!(out, indent, "}}")?;
                    }
                    EpsilonAction::CheckNotOnNewLine { offset } => {
                        return Err(unsupported(format!(
                            "line terminator check at offset {}",
                            offset
                        )));
                    }
                    EpsilonAction::PushFlag { flag, value } => {
                        emit!(out, indent, "parser.push_flag({}, {});", flag, value)?;
                    }
                    EpsilonAction::PopFlag { flag } => {
                        emit!(out, indent, "parser.pop_flag({})?;", flag)?;
                    }
                    EpsilonAction::FunCall {
                        method,
                        args,
                        set_to,
                        offset,
                    } => {
                        if !is_identifier(set_to) {
                            return Err(unsupported(format!("{:?} is not a variable name", set_to)));
                        }
                        let args: Vec<String> =
                            args.iter().map(|arg| fun_arg(arg, *offset)).collect();
                        match &**method {
                            "accept" => {
                                emit!(out, indent, "return Ok(rt::Step::Accept);")?;
                                finished = true;
                            }
                            "id" if args.len() == 1 => {
                                emit!(out, indent, "let {} = {};", set_to, args[0])?;
                                computed |= set_to == "value";
                            }
                            "id" => {
                                return Err(unsupported(format!(
                                    "id takes one argument but is given {}",
                                    args.len()
                                )));
                            }
                            method => {
                                let index = self.methods.index(method);
                                emit!(
                                    out,
                                    indent,
                                    "let {} = parser.call({}, vec![{}])?;",
                                    set_to,
                                    index,
                                    args.join(", ")
                                )?;
                                computed |= set_to == "value";
                            }
                        }
                    }
                    EpsilonAction::Reduce { nt, replay, pop } => {
                        emit!(
                            out,
                            indent,
                            "parser.replay({}, value, {}, {}, lexer)?;",
                            rust_str(&nt.to_string()),
                            replay,
                            pop
                        )?;
                        emit!(out, indent, "return Ok(rt::Step::Continue);")?;
                        finished = true;
                    }
                    EpsilonAction::Seq(..) => unreachable!("flattened"),
                }
            }
            if !finished && computed {
                emit!(out, indent, "parser.epsilon_push({}, value)?;", dest)?;
                emit!(out, indent, "return Ok(rt::Step::Continue);")?;
            } else if !finished {
                emit!(out, indent, "parser.epsilon({})?;", dest)?;
                emit!(out, indent, "return Ok(rt::Step::Continue);")?;
            }
            for depth in (1..indent).rev() {
                emit!(out, depth, "}}")?;
            }
            // Without a flag filter the transition is always taken.
            reachable = indent > 1;
        }
        if reachable {
            emit!(out, 1, "Err(rt::ParseError::SyntaxError)")?;
        }
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn word(&mut self, state: usize, action: &Action) -> Result<String, CodegenError> {
        match action {
            Action::IfSameLine {
                same_line,
                line_break,
            } => {
                let case = (plain_word(state, same_line)?, plain_word(state, line_break)?);
                let index = match self.special_cases.get_index_of(&case) {
                    Some(index) => index,
                    None => self.special_cases.insert_full(case).0,
                };
                Ok(ParseAction::SpecialCase(index).encode().to_string())
            }
            action => plain_word(state, action),
        }
    }

    fn actions(&mut self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "const ACTIONS: &[rt::Row] = &[")?;
        for state in &self.states.states {
            match &state.traceback {
                Some(traceback) => emit!(out, 1, "// {}. {}", state.index, traceback)?,
                None => emit!(out, 1, "// {}.", state.index)?,
            }
            if state.is_inconsistent() {
                emit!(out, 1, "rt::Row::Procedure(state_{}_actions),", state.index)?;
                continue;
            }
            let mut cells = Vec::with_capacity(state.action_row.len());
            for (term, action) in &state.action_row {
                cells.push(format!("({}, {})", term_expr(term), self.word(state.index, action)?));
            }
            emit!(out, 1, "rt::Row::Table(&[{}]),", cells.join(", "))?;
        }
        emit!(out, 0, "];")?;
        out.blank();
        Ok(())
    }

    fn ctns(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "const CTNS: &[&[(&str, usize)]] = &[")?;
        for state in &self.states.states {
            let cells: Vec<String> = state
                .ctn_row
                .iter()
                .map(|(nt, dest)| format!("({}, {})", rust_str(&nt.to_string()), dest))
                .collect();
            emit!(out, 1, "&[{}],", cells.join(", "))?;
        }
        emit!(out, 0, "];")?;
        out.blank();
        Ok(())
    }

    fn reductions(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "const REDUCTIONS: &[rt::Reduction] = &[")?;
        for (i, prod) in self.states.prods.iter().enumerate() {
            emit!(
                out,
                1,
                "rt::Reduction {{ nt: {}, arity: {}, reduce: reduce_{} }},",
                rust_str(&prod.nt.to_string()),
                prod.concrete_len(),
                i
            )?;
        }
        emit!(out, 0, "];")?;
        out.blank();
        Ok(())
    }

    fn special_cases(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "const SPECIAL_CASES: &[rt::SpecialCase] = &[")?;
        for (same_line, line_break) in &self.special_cases {
            emit!(
                out,
                1,
                "rt::SpecialCase {{ same_line: {}, line_break: {} }},",
                same_line,
                line_break
            )?;
        }
        emit!(out, 0, "];")?;
        out.blank();
        Ok(())
    }

    fn error_codes(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "const ERROR_CODES: &[Option<rt::ErrorCode>] = &[")?;
        for state in &self.states.states {
            match state.error_code {
                None => emit!(out, 1, "None,")?,
                Some(RecoveryCode::Asi) => emit!(out, 1, "Some(rt::ErrorCode::Asi),")?,
                Some(RecoveryCode::DoWhileAsi) => {
                    emit!(out, 1, "Some(rt::ErrorCode::DoWhileAsi),")?
                }
            }
        }
        emit!(out, 0, "];")?;
        out.blank();
        Ok(())
    }

    fn entries(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        let names: Vec<String> = self.methods.names.iter().map(|name| rust_str(name)).collect();
        emit!(out, 0, "const METHOD_NAMES: &[&str] = &[{}];", names.join(", "))?;
        // Typed methods no action calls still get a default.
        let unused: Vec<String> = self
            .states
            .grammar
            .type_info()
            .methods
            .keys()
            .filter(|name| !self.methods.names.contains(*name))
            .map(|name| rust_str(name))
            .collect();
        emit!(out, 0, "const UNUSED_METHOD_NAMES: &[&str] = &[{}];", unused.join(", "))?;
        out.blank();

        let goals: Vec<String> = self
            .states
            .init_state_map
            .iter()
            .map(|(goal, state)| format!("({}, {})", rust_str(&goal.to_string()), state))
            .collect();
        emit!(out, 0, "pub static GOAL_NT_TO_INIT_STATE: &[(&str, usize)] = &[{}];", goals.join(", "))?;
        out.blank();

        emit!(out, 0, "pub static TABLES: rt::Tables = rt::Tables {{")?;
        emit!(out, 1, "actions: ACTIONS,")?;
        emit!(out, 1, "ctns: CTNS,")?;
        emit!(out, 1, "reductions: REDUCTIONS,")?;
        emit!(out, 1, "special_cases: SPECIAL_CASES,")?;
        emit!(out, 1, "error_codes: ERROR_CODES,")?;
        emit!(out, 1, "method_names: METHOD_NAMES,")?;
        emit!(out, 0, "}};")?;
        out.blank();

        emit!(out, 0, "/// A builder tagging every value with the method that made it.")?;
        emit!(out, 0, "pub fn default_builder() -> rt::Builder {{")?;
        emit!(out, 1, "rt::Builder::tagging(&[METHOD_NAMES, UNUSED_METHOD_NAMES].concat())")?;
        emit!(out, 0, "}}")?;

        let cc = super::CaseConverter::new();
        for (goal, state) in &self.states.init_state_map {
            out.blank();
            emit!(out, 0, "/// Parse a `{}`, with the default builder unless `builder` is given.", goal)?;
            emit!(
                out,
                0,
                "pub fn parse_{}(",
                cc.nt_to_snake(goal)
            )?;
            emit!(out, 1, "lexer: &mut dyn rt::Lexer,")?;
            emit!(out, 1, "builder: Option<&rt::Builder>,")?;
            emit!(out, 0, ") -> Result<rt::Value, rt::ParseError> {{")?;
            emit!(out, 1, "match builder {{")?;
            emit!(out, 2, "Some(builder) => rt::parse(&TABLES, {}, lexer, builder),", state)?;
            emit!(out, 2, "None => rt::parse(&TABLES, {}, lexer, &default_builder()),", state)?;
            emit!(out, 1, "}}")?;
            emit!(out, 0, "}}")?;
        }
        Ok(())
    }
}

fn plain_word(state: usize, action: &Action) -> Result<String, CodegenError> {
    Ok(match action {
        Action::Shift(dest) => ParseAction::Shift(*dest).encode().to_string(),
        Action::Reduce(prod) => ParseAction::Reduce(*prod).encode().to_string(),
        Action::Accept => "rt::ACCEPT".into(),
        Action::IfSameLine { .. } => {
            return Err(CodegenError::UnsupportedState {
                state,
                reason: "nested line terminator conditions".into(),
            })
        }
    })
}

fn flatten<'a>(action: &'a EpsilonAction, steps: &mut Vec<&'a EpsilonAction>) {
    match action {
        EpsilonAction::Seq(actions) => actions.iter().for_each(|a| flatten(a, steps)),
        action => steps.push(action),
    }
}

/// Slots count from the top of the stack, which `stack_value` numbers 1.
fn fun_arg(arg: &FunArg, offset: usize) -> String {
    match arg {
        FunArg::Slot(depth) => format!("parser.stack_value({})?", depth + offset),
        FunArg::Var(name) => format!("{}.clone()", name),
        FunArg::Some(inner) => fun_arg(inner, offset),
        FunArg::None => "rt::Value::None".into(),
    }
}

fn term_expr(term: &Term) -> String {
    match term {
        Term::Terminal(t) => format!("rt::Term::T({})", rust_str(t)),
        Term::End => "rt::Term::End".into(),
        Term::ErrorToken => "rt::Term::ErrorToken".into(),
    }
}
