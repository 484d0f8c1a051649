//! The statically dispatched backend.
//!
//! The generated module contains, in order:
//!
//! * `TerminalId` and `Token`, one variant per action column,
//! * the flat `ACTIONS`/`GOTO` tables and their `TABLES` descriptor,
//! * `NonterminalId`, one variant per goto column,
//! * the `Handler` trait with one method per reduce-action tag,
//! * `concrete`, an enum per AST node type, and `DefaultHandler` building it,
//! * `reduce`, popping the values of a production and calling the handler,
//! * one `parse_<goal>` entry function per goal nonterminal.
//!
//! Generated code refers to the runtime only through `rt`, bound to
//! [`TypedOptions::runtime_path`], and carries no inner attributes, so the
//! includer decides which lints to allow.

use super::{
    names::{escape_keyword, CaseConverter, Spellings},
    CodegenError, Emitter,
};
use crate::{
    grammar::{Element, Grammar, MethodType, Nt, ReduceAction, ReduceExpr, Type},
    states::{Action, ParserStates, Prod, Term},
    types::{Map, Set},
};
use gramgen_runtime::definition::ParseAction;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct TypedOptions {
    /// The path of the runtime's `_private` module.
    pub runtime_path: String,
    /// Make `reduce` and the entry functions generic over any `Handler`.
    /// When unset they are specialized to `DefaultHandler`.
    pub generic: bool,
}

impl Default for TypedOptions {
    fn default() -> Self {
        Self {
            runtime_path: "::gramgen_runtime::_private".into(),
            generic: true,
        }
    }
}

impl TypedOptions {
    pub fn generate(&self, states: &ParserStates) -> Result<String, CodegenError> {
        let span = tracing::debug_span!("codegen_typed");
        let _enter = span.enter();

        let gen = TypedGen::new(self, states)?;
        let mut out = Emitter::new();
        gen.header(&mut out)?;
        gen.terminal_id(&mut out)?;
        gen.token(&mut out)?;
        gen.tables(&mut out)?;
        gen.nonterminal_id(&mut out)?;
        gen.handler_trait(&mut out)?;
        gen.concrete(&mut out)?;
        gen.default_handler(&mut out)?;
        gen.reduce(&mut out)?;
        gen.entries(&mut out)?;

        tracing::debug!(
            states = states.states.len(),
            terminals = gen.terminals.len(),
            nonterminals = gen.nonterminals.len(),
            methods = gen.methods.len(),
            "typed parser emitted"
        );
        Ok(out.finish())
    }
}

/// Where a type is spelled.
#[derive(Clone, Copy)]
enum TyCx {
    /// Inside `trait Handler` and its implementations.
    Trait,
    /// Inside `reduce` and the entry functions.
    Reduce,
    /// Inside `mod concrete`.
    Concrete,
}

struct TypedGen<'a> {
    opts: &'a TypedOptions,
    states: &'a ParserStates,
    grammar: &'a Grammar,
    cc: CaseConverter,
    /// Action columns with their variant names.
    terminals: Vec<(Term, String)>,
    /// Goto columns with their variant names.
    nonterminals: Map<Rc<Nt>, String>,
    /// Reduce-action tags with their Rust method names, in order of first
    /// use.
    methods: Map<String, String>,
    node_types: Set<String>,
}

impl<'a> TypedGen<'a> {
    fn new(opts: &'a TypedOptions, states: &'a ParserStates) -> Result<Self, CodegenError> {
        let grammar = &states.grammar;
        let cc = CaseConverter::new();

        let mut terms: Vec<Term> = states.terminals().into_iter().cloned().collect();
        if !terms.contains(&Term::End) {
            terms.push(Term::End);
        }
        let mut spellings = Spellings::default();
        let mut terminals = Vec::with_capacity(terms.len());
        for term in terms {
            let name = cc.terminal_name(&term);
            spellings.claim(term.to_string(), &name)?;
            terminals.push((term, name));
        }

        let mut spellings = Spellings::default();
        let mut nonterminals = Map::default();
        let nts = states
            .nonterminals()
            .into_iter()
            .chain(states.prods.iter().map(|prod| &prod.nt))
            .filter(|nt| !nt.is_init());
        for nt in nts {
            if nonterminals.contains_key(nt) {
                continue;
            }
            let name = escape_keyword(cc.nt_to_camel(nt));
            spellings.claim(nt.to_string(), &name)?;
            nonterminals.insert(nt.clone(), name);
        }

        let mut spellings = Spellings::default();
        let mut methods = Map::default();
        for prod in &states.prods {
            let expr = match prod.action.expr() {
                Some(expr) => expr,
                None => continue,
            };
            let mut calls = vec![];
            expr.for_each_call(&mut |call| calls.push(&call.method));
            for method in calls {
                if methods.contains_key(method) {
                    continue;
                }
                let name = cc.method_name(method);
                spellings.claim(method.clone(), &name)?;
                methods.insert(method.clone(), name);
            }
        }

        let mut node_types = Set::default();
        let nt_types = nonterminals
            .keys()
            .chain(states.init_state_map.keys())
            .filter_map(|nt| grammar.nt_type(nt));
        for ty in nt_types {
            collect_nodes(ty, &mut node_types);
        }
        for method in methods.keys() {
            if let Some(mt) = grammar.method_type(method) {
                mt.argument_types
                    .iter()
                    .chain(Some(&mt.return_type))
                    .for_each(|ty| collect_nodes(ty, &mut node_types));
            }
        }

        Ok(Self {
            opts,
            states,
            grammar,
            cc,
            terminals,
            nonterminals,
            methods,
            node_types,
        })
    }

    fn rust_type(&self, ty: &Type, cx: TyCx) -> String {
        match ty {
            Type::Unit => "()".into(),
            Type::Str => "String".into(),
            Type::Bool => "bool".into(),
            Type::Node(name) => match cx {
                TyCx::Trait => format!("Self::{}", name),
                TyCx::Reduce if self.opts.generic => format!("H::{}", name),
                TyCx::Reduce => format!("Box<concrete::{}>", name),
                TyCx::Concrete => format!("Box<{}>", name),
            },
            Type::Option(inner) => format!("Option<{}>", self.rust_type(inner, cx)),
        }
    }

    fn method_type(&self, method: &str) -> Result<&'a MethodType, CodegenError> {
        self.grammar
            .method_type(method)
            .ok_or_else(|| CodegenError::MissingType {
                name: method.into(),
            })
    }

    fn nt_type(&self, nt: &Nt) -> Result<&'a Type, CodegenError> {
        self.grammar.nt_type(nt).ok_or_else(|| CodegenError::MissingType {
            name: nt.to_string(),
        })
    }

    /// `fn name(&self, a0: T0, ...) -> R`, without the trailing `;` or body.
    fn method_signature(&self, method: &str, name: &str) -> Result<String, CodegenError> {
        let mt = self.method_type(method)?;
        let mut sig = format!("fn {}(&self", name);
        for (i, ty) in mt.argument_types.iter().enumerate() {
            if !ty.is_unit() {
                sig += &format!(", a{}: {}", i, self.rust_type(ty, TyCx::Trait));
            }
        }
        sig.push(')');
        if !mt.return_type.is_unit() {
            sig += &format!(" -> {}", self.rust_type(&mt.return_type, TyCx::Trait));
        }
        Ok(sig)
    }

    fn header(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "// @generated by gramgen. Do not edit.")?;
        out.blank();
        emit!(out, 0, "use {} as rt;", self.opts.runtime_path)?;
        out.blank();
        Ok(())
    }

    fn terminal_id(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]")?;
        emit!(out, 0, "pub enum TerminalId {{")?;
        for (i, (term, name)) in self.terminals.iter().enumerate() {
            emit!(out, 1, "{} = {}, // {}", name, i, term)?;
        }
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn token(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        let tokens: Vec<(&str, bool)> = self
            .terminals
            .iter()
            .filter_map(|(term, name)| match term {
                Term::Terminal(t) => Some((&**name, self.grammar.is_variable_terminal(t))),
                Term::End | Term::ErrorToken => None,
            })
            .collect();

        emit!(out, 0, "#[derive(Debug, Clone, PartialEq, Eq)]")?;
        emit!(out, 0, "pub enum Token {{")?;
        for (name, variable) in &tokens {
            if *variable {
                emit!(out, 1, "{}(String),", name)?;
            } else {
                emit!(out, 1, "{},", name)?;
            }
        }
        emit!(out, 0, "}}")?;
        out.blank();

        emit!(out, 0, "impl Token {{")?;
        emit!(out, 1, "pub fn get_id(&self) -> TerminalId {{")?;
        emit!(out, 2, "match *self {{")?;
        for (name, variable) in &tokens {
            let pat = if *variable { "(..)" } else { "" };
            emit!(out, 3, "Self::{}{} => TerminalId::{},", name, pat, name)?;
        }
        emit!(out, 2, "}}")?;
        emit!(out, 1, "}}")?;
        emit!(out, 0, "}}")?;
        out.blank();

        emit!(out, 0, "impl rt::Token for Token {{")?;
        emit!(out, 1, "fn terminal_index(&self) -> usize {{")?;
        emit!(out, 2, "self.get_id() as usize")?;
        emit!(out, 1, "}}")?;
        out.blank();
        emit!(out, 1, "fn into_node(self) -> rt::Node {{")?;
        emit!(out, 2, "match self {{")?;
        for (name, variable) in &tokens {
            if *variable {
                emit!(out, 3, "Self::{}(text) => Box::new(text),", name)?;
            } else {
                emit!(out, 3, "Self::{} => Box::new(()),", name)?;
            }
        }
        emit!(out, 2, "}}")?;
        emit!(out, 1, "}}")?;
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn tables(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        let nstates = self.states.states.len();
        let width = self.terminals.len();
        emit!(out, 0, "static ACTIONS: [i64; {}] = [", nstates * width)?;
        for state in &self.states.states {
            if state.is_inconsistent() {
                return Err(CodegenError::UnsupportedState {
                    state: state.index,
                    reason: "epsilon transitions need the dynamic backend".into(),
                });
            }
            match &state.traceback {
                Some(traceback) => emit!(out, 1, "// {}. {}", state.index, traceback)?,
                None => emit!(out, 1, "// {}.", state.index)?,
            }
            let mut words = Vec::with_capacity(width);
            for (term, _) in &self.terminals {
                let word = match state.action_row.get(term) {
                    None => "rt::ERROR".to_owned(),
                    Some(Action::Accept) => "rt::ACCEPT".to_owned(),
                    Some(Action::Shift(dest)) => ParseAction::Shift(*dest).encode().to_string(),
                    Some(Action::Reduce(prod)) => ParseAction::Reduce(*prod).encode().to_string(),
                    Some(Action::IfSameLine { .. }) => {
                        return Err(CodegenError::UnsupportedState {
                            state: state.index,
                            reason: format!(
                                "the action on {} depends on line terminators",
                                term
                            ),
                        })
                    }
                };
                words.push(word);
            }
            if !words.is_empty() {
                emit!(out, 1, "{},", words.join(", "))?;
            }
        }
        emit!(out, 0, "];")?;
        out.blank();

        let goto_width = self.nonterminals.len();
        emit!(out, 0, "static GOTO: [usize; {}] = [", nstates * goto_width)?;
        for state in &self.states.states {
            if goto_width == 0 {
                break;
            }
            let dests: Vec<String> = self
                .nonterminals
                .keys()
                .map(|nt| match state.ctn_row.get(nt) {
                    Some(dest) => dest.to_string(),
                    None => "usize::MAX".into(),
                })
                .collect();
            emit!(out, 1, "{}, // {}.", dests.join(", "), state.index)?;
        }
        emit!(out, 0, "];")?;
        out.blank();

        emit!(out, 0, "static TABLES: rt::ParserTables<'static> = rt::ParserTables {{")?;
        emit!(out, 1, "state_count: {},", nstates)?;
        emit!(out, 1, "action_table: &ACTIONS,")?;
        emit!(out, 1, "action_width: {},", width)?;
        emit!(out, 1, "goto_table: &GOTO,")?;
        emit!(out, 1, "goto_width: {},", goto_width)?;
        emit!(out, 1, "end_terminal: TerminalId::End as usize,")?;
        if self.terminals.iter().any(|(term, _)| *term == Term::ErrorToken) {
            emit!(out, 1, "error_terminal: Some(TerminalId::ErrorToken as usize),")?;
        } else {
            emit!(out, 1, "error_terminal: None,")?;
        }
        emit!(out, 0, "}};")?;
        out.blank();
        Ok(())
    }

    fn nonterminal_id(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]")?;
        emit!(out, 0, "pub enum NonterminalId {{")?;
        for (i, (nt, name)) in self.nonterminals.iter().enumerate() {
            emit!(out, 1, "{} = {}, // {}", name, i, nt)?;
        }
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn handler_trait(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "/// Builds the value of every reduced production.")?;
        emit!(out, 0, "pub trait Handler {{")?;
        for name in &self.node_types {
            emit!(out, 1, "type {}: 'static;", name)?;
        }
        if !self.node_types.is_empty() && !self.methods.is_empty() {
            out.blank();
        }
        for (method, name) in &self.methods {
            emit!(out, 1, "{};", self.method_signature(method, name)?)?;
        }
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn concrete(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "/// The AST built by [`DefaultHandler`].")?;
        emit!(out, 0, "pub mod concrete {{")?;
        for (i, node) in self.node_types.iter().enumerate() {
            if i > 0 {
                out.blank();
            }
            emit!(out, 1, "#[derive(Debug, Clone, PartialEq)]")?;
            emit!(out, 1, "pub enum {} {{", node)?;
            let mut spellings = Spellings::default();
            for (method, name) in &self.methods {
                let mt = self.method_type(method)?;
                if !matches!(&mt.return_type, Type::Node(ret) if ret == node) {
                    continue;
                }
                let variant = self.variant_name(name);
                spellings.claim(method.clone(), &variant)?;
                let fields: Vec<String> = mt
                    .argument_types
                    .iter()
                    .filter(|ty| !ty.is_unit())
                    .map(|ty| self.rust_type(ty, TyCx::Concrete))
                    .collect();
                if fields.is_empty() {
                    emit!(out, 2, "{},", variant)?;
                } else {
                    emit!(out, 2, "{}({}),", variant, fields.join(", "))?;
                }
            }
            emit!(out, 1, "}}")?;
        }
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn variant_name(&self, method_name: &str) -> String {
        escape_keyword(self.cc.to_camel(method_name.trim_start_matches("r#")))
    }

    fn default_handler(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        emit!(out, 0, "#[derive(Debug, Clone, Copy, Default)]")?;
        emit!(out, 0, "pub struct DefaultHandler;")?;
        out.blank();
        emit!(out, 0, "impl Handler for DefaultHandler {{")?;
        for name in &self.node_types {
            emit!(out, 1, "type {} = Box<concrete::{}>;", name, name)?;
        }
        for (method, name) in &self.methods {
            out.blank();
            let mt = self.method_type(method)?;
            let sig = self.method_signature(method, name)?;
            match &mt.return_type {
                Type::Unit => emit!(out, 1, "{} {{}}", sig)?,
                Type::Node(node) => {
                    let args: Vec<String> = mt
                        .argument_types
                        .iter()
                        .enumerate()
                        .filter(|(_, ty)| !ty.is_unit())
                        .map(|(i, _)| format!("a{}", i))
                        .collect();
                    let variant = self.variant_name(name);
                    emit!(out, 1, "{} {{", sig)?;
                    if args.is_empty() {
                        emit!(out, 2, "Box::new(concrete::{}::{})", node, variant)?;
                    } else {
                        emit!(
                            out,
                            2,
                            "Box::new(concrete::{}::{}({}))",
                            node,
                            variant,
                            args.join(", ")
                        )?;
                    }
                    emit!(out, 1, "}}")?;
                }
                ty => {
                    return Err(CodegenError::UnsupportedMethodType {
                        method: method.clone(),
                        ty: ty.to_string(),
                    })
                }
            }
        }
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn handler_param(&self) -> (&'static str, &'static str) {
        if self.opts.generic {
            ("<H: Handler>", "H")
        } else {
            ("", "DefaultHandler")
        }
    }

    fn reduce(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        let (generics, handler) = self.handler_param();
        emit!(out, 0, "fn reduce{}(", generics)?;
        emit!(out, 1, "handler: &{},", handler)?;
        emit!(out, 1, "prod: usize,")?;
        emit!(out, 1, "stack: &mut Vec<rt::Node>,")?;
        emit!(out, 0, ") -> Result<usize, rt::ParseError> {{")?;
        emit!(out, 1, "match prod {{")?;
        for (i, prod) in self.states.prods.iter().enumerate() {
            if let ReduceAction::Accept = prod.action {
                continue;
            }
            tracing::trace!(prod = i, nt = %prod.nt, "reduce arm");
            self.reduce_arm(out, i, prod)?;
        }
        emit!(out, 2, "_ => Err(rt::ParseError::NoSuchProduction(prod)),")?;
        emit!(out, 1, "}}")?;
        emit!(out, 0, "}}")?;
        out.blank();
        Ok(())
    }

    fn reduce_arm(&self, out: &mut Emitter, index: usize, prod: &Prod) -> Result<(), CodegenError> {
        let rendered = format!(
            "{} ::= {} => {}",
            prod.nt,
            self.grammar.body_to_str(&prod.body),
            prod.action
        );
        let unsupported = |reason: String| CodegenError::UnsupportedReduceShape {
            production: rendered.clone(),
            reason,
        };

        let slots = prod
            .body
            .iter()
            .filter(|e| e.is_concrete())
            .map(|e| self.element_type(e).map_err(unsupported))
            .collect::<Result<Vec<_>, _>>()?;

        let expr = prod
            .action
            .expr()
            .ok_or_else(|| unsupported("accept outside of an init nonterminal".into()))?;
        let mut compiler = ReduceCompiler {
            gen: self,
            slots: &slots,
            used: vec![],
            unsupported: &unsupported,
        };
        let code = compiler.compile(expr)?;
        let used = compiler.used;

        let nt_name = self
            .nonterminals
            .get(&prod.nt)
            .ok_or_else(|| unsupported("no goto column for this nonterminal".into()))?;
        let nt_type = self.rust_type(self.nt_type(&prod.nt)?, TyCx::Reduce);

        emit!(out, 2, "// {}", rendered)?;
        emit!(out, 2, "{} => {{", index)?;
        for (i, slot) in slots.iter().enumerate().rev() {
            match slot {
                Some(ty) if used.contains(&i) => emit!(
                    out,
                    3,
                    "let x{}: {} = rt::pop(stack)?;",
                    i,
                    self.rust_type(ty, TyCx::Reduce)
                )?,
                _ => emit!(out, 3, "rt::discard(stack)?;")?,
            }
        }
        emit!(out, 3, "let value: {} = {};", nt_type, code)?;
        emit!(out, 3, "stack.push(Box::new(value));")?;
        emit!(out, 3, "Ok(NonterminalId::{} as usize)", nt_name)?;
        emit!(out, 2, "}}")?;
        Ok(())
    }

    /// The type of the value a concrete element pushes, if known.
    fn element_type(&self, e: &Element) -> Result<Option<Type>, String> {
        match e {
            Element::Terminal(t) if self.grammar.is_variable_terminal(t) => Ok(Some(Type::Str)),
            Element::Terminal(..) => Ok(Some(Type::Unit)),
            Element::Nt(nt) => Ok(self.grammar.nt_type(nt).cloned()),
            Element::Exclude { nt, .. } => self.element_type(nt),
            Element::Optional(..) => {
                Err("optional elements must be expanded before code generation".into())
            }
            e => Err(format!(
                "{} does not push a value",
                self.grammar.element_to_str(e)
            )),
        }
    }

    fn entries(&self, out: &mut Emitter) -> Result<(), CodegenError> {
        let mut spellings = Spellings::default();
        for (i, (goal, state)) in self.states.init_state_map.iter().enumerate() {
            if i > 0 {
                out.blank();
            }
            let name = format!("parse_{}", self.cc.nt_to_snake(goal));
            spellings.claim(goal.to_string(), &name)?;
            let ty = self.rust_type(self.nt_type(goal)?, TyCx::Reduce);
            emit!(out, 0, "/// Parse a `{}` from `tokens`.", goal)?;
            if self.opts.generic {
                emit!(out, 0, "pub fn {}<H, In>(handler: &H, tokens: In) -> Result<{}, rt::ParseError>", name, ty)?;
                emit!(out, 0, "where")?;
                emit!(out, 1, "H: Handler,")?;
                emit!(out, 1, "In: rt::TokenStream<Token = Token>,")?;
                emit!(out, 0, "{{")?;
                emit!(out, 1, "let node = rt::parse(handler, tokens, {}, &TABLES, reduce::<H>)?;", state)?;
            } else {
                emit!(out, 0, "pub fn {}<In>(tokens: In) -> Result<{}, rt::ParseError>", name, ty)?;
                emit!(out, 0, "where")?;
                emit!(out, 1, "In: rt::TokenStream<Token = Token>,")?;
                emit!(out, 0, "{{")?;
                emit!(out, 1, "let node = rt::parse(&DefaultHandler, tokens, {}, &TABLES, reduce)?;", state)?;
            }
            emit!(out, 1, "rt::downcast(node)")?;
            emit!(out, 0, "}}")?;
        }
        Ok(())
    }
}

fn collect_nodes(ty: &Type, nodes: &mut Set<String>) {
    match ty {
        Type::Node(name) => {
            nodes.insert(name.clone());
        }
        Type::Option(inner) => collect_nodes(inner, nodes),
        Type::Unit | Type::Str | Type::Bool => {}
    }
}

/// Compiles one reduce expression to a Rust expression over the popped
/// values `x0, x1, ...`.
struct ReduceCompiler<'g, 'a, F> {
    gen: &'g TypedGen<'a>,
    slots: &'g [Option<Type>],
    /// Slots whose values are moved into the expression.
    used: Vec<usize>,
    unsupported: &'g F,
}

impl<F> ReduceCompiler<'_, '_, F>
where
    F: Fn(String) -> CodegenError,
{
    fn compile(&mut self, expr: &ReduceExpr) -> Result<String, CodegenError> {
        match expr {
            ReduceExpr::Slot(i) => {
                let ty = match self.slots.get(*i) {
                    Some(Some(ty)) => ty,
                    Some(None) => {
                        return Err((self.unsupported)(format!("the type of ${} is unknown", i)))
                    }
                    None => return Err((self.unsupported)(format!("${} is out of range", i))),
                };
                if ty.is_unit() {
                    return Ok("()".into());
                }
                if self.used.contains(i) {
                    return Err((self.unsupported)(format!("${} is used more than once", i)));
                }
                self.used.push(*i);
                Ok(format!("x{}", i))
            }
            ReduceExpr::Call(call) => {
                let mt = self.gen.method_type(&call.method)?;
                if mt.argument_types.len() != call.args.len() {
                    return Err((self.unsupported)(format!(
                        "{} takes {} arguments but is given {}",
                        call.method,
                        mt.argument_types.len(),
                        call.args.len()
                    )));
                }
                let mut args = Vec::with_capacity(call.args.len());
                for (arg, ty) in call.args.iter().zip(&mt.argument_types) {
                    match (arg, ty.is_unit()) {
                        (ReduceExpr::Slot(..), true) => {}
                        (_, true) => {
                            return Err((self.unsupported)(format!(
                                "unit argument {} of {} is not a plain slot",
                                arg, call.method
                            )))
                        }
                        (_, false) => args.push(self.compile(arg)?),
                    }
                }
                let name = self
                    .gen
                    .methods
                    .get(&call.method)
                    .ok_or_else(|| (self.unsupported)(format!("unknown method {}", call.method)))?;
                Ok(format!("handler.{}({})", name, args.join(", ")))
            }
            ReduceExpr::Some(inner) => Ok(format!("Some({})", self.compile(inner)?)),
            ReduceExpr::None => Ok("None".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::fixtures;

    #[test]
    fn sum_parser() {
        let states = fixtures::sum_states();
        let code = TypedOptions::default().generate(&states).unwrap();

        assert!(code.starts_with("// @generated by gramgen. Do not edit.\n"));
        assert!(code.contains("use ::gramgen_runtime::_private as rt;\n"));
        assert!(code.contains("    Num = 0, // \"NUM\"\n    PlusSign = 1, // \"+\"\n    End = 2, // $\n"));
        assert!(code.contains("    Num(String),\n    PlusSign,\n}"));
        assert!(code.contains("static ACTIONS: [i64; 18] = [\n    // 0.\n    1, rt::ERROR, rt::ERROR,\n"));
        assert!(code.contains("    // 1. NUM\n    rt::ERROR, -3, -3,\n"), "{}", code);
        assert!(code.contains("    rt::ERROR, 4, rt::ACCEPT,\n"));
        assert!(code.contains("    2, 3, // 0.\n"));
        assert!(code.contains("    type Expr: 'static;\n"));
        assert!(code.contains("    fn expr_plus(&self, a0: Self::Expr, a1: Self::Expr) -> Self::Expr;\n"));
        assert!(code.contains("    fn term_num(&self, a0: String) -> Self::Expr;\n"));
        assert!(code.contains("        ExprPlus(Box<Expr>, Box<Expr>),\n        TermNum(String),\n"));
        assert!(code.contains("        Box::new(concrete::Expr::ExprPlus(a0, a1))\n"));
        assert!(code.contains(
            "        1 => {\n\
             \x20           let x2: H::Expr = rt::pop(stack)?;\n\
             \x20           rt::discard(stack)?;\n\
             \x20           let x0: H::Expr = rt::pop(stack)?;\n\
             \x20           let value: H::Expr = handler.expr_plus(x0, x2);\n"
        ));
        assert!(code.contains("pub fn parse_expr<H, In>(handler: &H, tokens: In) -> Result<H::Expr, rt::ParseError>\n"));
        assert!(!code.contains("#!["));
    }

    #[test]
    fn deterministic() {
        let states = fixtures::sum_states();
        let a = TypedOptions::default().generate(&states).unwrap();
        let b = TypedOptions::default().generate(&states).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn specialized_to_default_handler() {
        let states = fixtures::sum_states();
        let opts = TypedOptions {
            runtime_path: "crate::rt".into(),
            generic: false,
        };
        let code = opts.generate(&states).unwrap();
        assert!(code.contains("use crate::rt as rt;\n"));
        assert!(code.contains("fn reduce(\n    handler: &DefaultHandler,\n"));
        assert!(code.contains("let x0: Box<concrete::Expr> = rt::pop(stack)?;"));
        assert!(code.contains(
            "pub fn parse_expr<In>(tokens: In) -> Result<Box<concrete::Expr>, rt::ParseError>\n"
        ));
    }

    #[test]
    fn rejects_epsilon_states() {
        let states = fixtures::flagged_states();
        let err = TypedOptions::default().generate(&states).unwrap_err();
        assert!(
            matches!(err, CodegenError::UnsupportedState { state: 2, .. }),
            "{}",
            err
        );
    }
}
