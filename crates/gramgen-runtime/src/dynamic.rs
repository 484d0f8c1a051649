//! Driver of dynamically dispatched parsers.
//!
//! Generated tables name terminals and nonterminals by string, compile each
//! reduce action to a function over a slice of [`Value`]s, and call builder
//! methods by index into a registry that is resolved once per parse. States
//! whose behavior depends on the flag stacks or on line breaks are driven by
//! generated procedures instead of table rows.

use crate::definition::ParseAction;
pub use crate::{
    definition::{ACCEPT, ERROR},
    parser::ParseError,
};
use std::{any::Any, collections::HashMap, collections::VecDeque, fmt, rc::Rc};

/// A value on the parser stack.
#[derive(Clone)]
pub enum Value {
    None,
    /// The text of a shifted token.
    Token(String),
    /// What the default builder makes of a method call.
    Node { tag: String, args: Vec<Value> },
    /// Anything a custom builder produces.
    Custom(Rc<dyn Any>),
}

impl Value {
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token(text.into())
    }

    pub fn node(tag: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Node {
            tag: tag.into(),
            args,
        }
    }

    pub fn custom<T: Any>(value: T) -> Self {
        Self::Custom(Rc::new(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(text) => Some(text),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(value) => value.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Token(text) => write!(f, "{:?}", text),
            Self::Node { tag, args } => {
                let mut t = f.debug_tuple(tag);
                for arg in args {
                    t.field(arg);
                }
                t.finish()
            }
            Self::Custom(..) => f.write_str("Custom(..)"),
        }
    }
}

/// Custom values compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Token(a), Self::Token(b)) => a == b,
            (Self::Node { tag: t1, args: a1 }, Self::Node { tag: t2, args: a2 }) => {
                t1 == t2 && a1 == a2
            }
            (Self::Custom(a), Self::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

pub type Method = Rc<dyn Fn(Vec<Value>) -> Value>;

/// A registry of builder methods keyed by reduce-action tag.
#[derive(Clone, Default)]
pub struct Builder {
    methods: HashMap<String, Method>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.methods.keys().map(|k| &**k).collect();
        tags.sort_unstable();
        f.debug_struct("Builder").field("methods", &tags).finish()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder whose every method returns `Value::Node` tagged with the
    /// method's name.
    pub fn tagging(tags: &[&'static str]) -> Self {
        let mut builder = Self::new();
        for &tag in tags {
            builder.register(tag, move |args| Value::node(tag, args));
        }
        builder
    }

    pub fn register<F>(&mut self, tag: impl Into<String>, method: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Value + 'static,
    {
        self.methods.insert(tag.into(), Rc::new(method));
        self
    }

    pub fn with<F>(mut self, tag: impl Into<String>, method: F) -> Self
    where
        F: Fn(Vec<Value>) -> Value + 'static,
    {
        self.register(tag, method);
        self
    }

    /// Look up every tag of `tags`, in order.
    pub fn resolve(&self, tags: &[&str]) -> Result<Methods, ParseError> {
        let methods = tags
            .iter()
            .map(|tag| {
                self.methods
                    .get(*tag)
                    .cloned()
                    .ok_or_else(|| ParseError::MissingMethod(tag.to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Methods { methods })
    }
}

/// Builder methods resolved against the method table of one parser.
pub struct Methods {
    methods: Vec<Method>,
}

impl Methods {
    pub fn call(&self, index: usize, args: Vec<Value>) -> Result<Value, ParseError> {
        let method = self
            .methods
            .get(index)
            .ok_or_else(|| ParseError::MissingMethod(format!("#{}", index)))?;
        Ok(method(args))
    }
}

/// Move the `N` values of a production body out of `values`.
pub fn take<const N: usize>(values: Vec<Value>) -> Result<[Value; N], ParseError> {
    <[Value; N]>::try_from(values).map_err(|_| ParseError::StackMismatch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    T(&'static str),
    End,
    ErrorToken,
}

/// The way a state can recover from a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Insert a semicolon after a line break, before `}`, or at the end.
    Asi,
    /// Insert the semicolon after `do ... while (...)` unconditionally.
    DoWhileAsi,
}

impl ErrorCode {
    fn allows(self, terminal: Option<&str>, saw_line_terminator: bool) -> bool {
        match self {
            Self::Asi => saw_line_terminator || matches!(terminal, None | Some("}")),
            Self::DoWhileAsi => true,
        }
    }
}

/// An action that depends on whether the lookahead token follows a line
/// terminator.
#[derive(Debug, Clone, Copy)]
pub struct SpecialCase {
    pub same_line: i64,
    pub line_break: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Accept,
}

pub type StateProc = fn(&mut Parser<'_>, &mut dyn Lexer) -> Result<Step, ParseError>;

#[derive(Clone, Copy)]
pub enum Row {
    Table(&'static [(Term, i64)]),
    Procedure(StateProc),
}

pub type ReduceFn = fn(&Methods, Vec<Value>) -> Result<Value, ParseError>;

#[derive(Clone, Copy)]
pub struct Reduction {
    pub nt: &'static str,
    /// The number of values the production pops.
    pub arity: usize,
    pub reduce: ReduceFn,
}

pub struct Tables {
    pub actions: &'static [Row],
    /// Goto rows, keyed by rendered nonterminal.
    pub ctns: &'static [&'static [(&'static str, usize)]],
    pub reductions: &'static [Reduction],
    pub special_cases: &'static [SpecialCase],
    pub error_codes: &'static [Option<ErrorCode>],
    /// The builder methods called by `reductions` and procedures, by index.
    pub method_names: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub terminal: String,
    pub value: Value,
}

impl Token {
    pub fn new(terminal: impl Into<String>, value: Value) -> Self {
        Self {
            terminal: terminal.into(),
            value,
        }
    }
}

pub trait Lexer {
    fn next_token(&mut self) -> Result<Option<Token>, ParseError>;

    /// Whether a line terminator precedes the current lookahead token.
    fn saw_line_terminator(&self) -> bool;
}

/// A lexer over a prepared list of tokens.
#[derive(Debug, Default)]
pub struct TokenList {
    pending: VecDeque<(Token, bool)>,
    newline: bool,
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token whose value is its own text.
    pub fn push(&mut self, terminal: &str) -> &mut Self {
        self.push_token(Token::new(terminal, Value::token(terminal)), false)
    }

    /// Append a token preceded by a line terminator.
    pub fn push_after_newline(&mut self, terminal: &str) -> &mut Self {
        self.push_token(Token::new(terminal, Value::token(terminal)), true)
    }

    pub fn push_token(&mut self, token: Token, after_newline: bool) -> &mut Self {
        self.pending.push_back((token, after_newline));
        self
    }
}

impl Lexer for TokenList {
    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        match self.pending.pop_front() {
            Some((token, newline)) => {
                self.newline = newline;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    fn saw_line_terminator(&self) -> bool {
        self.newline
    }
}

#[derive(Debug, Clone)]
enum Sym {
    Start,
    Terminal(String),
    Nt(&'static str),
    /// A value left by a procedure.
    Computed,
}

#[derive(Debug)]
struct Entry {
    state: usize,
    sym: Sym,
    value: Value,
}

struct HashRow {
    terminals: HashMap<&'static str, i64>,
    end: Option<i64>,
    error_token: Option<i64>,
}

impl HashRow {
    fn new(row: &[(Term, i64)]) -> Self {
        let mut hashed = Self {
            terminals: HashMap::with_capacity(row.len()),
            end: None,
            error_token: None,
        };
        for &(term, word) in row {
            match term {
                Term::T(t) => {
                    hashed.terminals.insert(t, word);
                }
                Term::End => hashed.end = Some(word),
                Term::ErrorToken => hashed.error_token = Some(word),
            }
        }
        hashed
    }
}

/// The state of one parse.
pub struct Parser<'t> {
    tables: &'t Tables,
    methods: Methods,
    stack: Vec<Entry>,
    flags: Vec<Vec<bool>>,
    rows: Vec<Option<HashRow>>,
    /// Looking up the `ErrorToken` column instead of the lookahead token.
    recovering: bool,
    /// An error token was already shifted before the current lookahead.
    recovered: bool,
}

impl<'t> Parser<'t> {
    fn new(tables: &'t Tables, methods: Methods, entry_state: usize) -> Self {
        Self {
            tables,
            methods,
            stack: vec![Entry {
                state: entry_state,
                sym: Sym::Start,
                value: Value::None,
            }],
            flags: vec![],
            rows: std::iter::repeat_with(|| None)
                .take(tables.actions.len())
                .collect(),
            recovering: false,
            recovered: false,
        }
    }

    fn top_state(&self) -> Result<usize, ParseError> {
        self.stack
            .last()
            .map(|e| e.state)
            .ok_or(ParseError::StackUnderflow)
    }

    /// Call builder method number `index`.
    pub fn call(&self, index: usize, args: Vec<Value>) -> Result<Value, ParseError> {
        self.methods.call(index, args)
    }

    /// The value `depth` entries below the top of the stack, counting the
    /// top as 1.
    pub fn stack_value(&self, depth: usize) -> Result<Value, ParseError> {
        let index = self
            .stack
            .len()
            .checked_sub(depth)
            .filter(|_| depth > 0)
            .ok_or(ParseError::StackUnderflow)?;
        Ok(self.stack[index].value.clone())
    }

    /// The top of flag stack `flag`.
    pub fn flag(&self, flag: usize) -> Option<bool> {
        self.flags.get(flag).and_then(|stack| stack.last().copied())
    }

    pub fn push_flag(&mut self, flag: usize, value: bool) {
        if self.flags.len() <= flag {
            self.flags.resize_with(flag + 1, Vec::new);
        }
        self.flags[flag].push(value);
    }

    pub fn pop_flag(&mut self, flag: usize) -> Result<bool, ParseError> {
        self.flags
            .get_mut(flag)
            .and_then(Vec::pop)
            .ok_or(ParseError::StackUnderflow)
    }

    /// Follow an epsilon transition: the top entry moves to `state`
    /// without consuming input.
    pub fn epsilon(&mut self, state: usize) -> Result<(), ParseError> {
        let top = self.stack.last_mut().ok_or(ParseError::StackUnderflow)?;
        top.state = state;
        Ok(())
    }

    /// Follow an epsilon transition that produced `value`. The value gets an
    /// entry of its own, which later reductions pop like any other.
    pub fn epsilon_push(&mut self, state: usize, value: Value) -> Result<(), ParseError> {
        if self.stack.is_empty() {
            return Err(ParseError::StackUnderflow);
        }
        self.stack.push(Entry {
            state,
            sym: Sym::Computed,
            value,
        });
        Ok(())
    }

    /// Reduce in place: pop `replay + pop` entries, push `nt` with `value`,
    /// then shift the `replay` topmost popped entries again.
    pub fn replay(
        &mut self,
        nt: &'static str,
        value: Value,
        replay: usize,
        pop: usize,
        lexer: &mut dyn Lexer,
    ) -> Result<(), ParseError> {
        let keep = self
            .stack
            .len()
            .checked_sub(replay + pop)
            .filter(|keep| *keep > 0)
            .ok_or(ParseError::StackUnderflow)?;
        let replayed = self.stack.split_off(keep + pop);
        self.stack.truncate(keep);
        self.shift_nt(nt, value)?;
        for entry in replayed {
            match entry.sym {
                Sym::Nt(nt) => self.shift_nt(nt, entry.value)?,
                Sym::Terminal(terminal) => {
                    let state = self.top_state()?;
                    let word = self.action_word(state, Some(&terminal))?;
                    match self.resolve(word, lexer)? {
                        ParseAction::Shift(next) => self.stack.push(Entry {
                            state: next,
                            sym: Sym::Terminal(terminal),
                            value: entry.value,
                        }),
                        _ => return Err(ParseError::SyntaxError),
                    }
                }
                Sym::Start | Sym::Computed => return Err(ParseError::StackMismatch),
            }
        }
        Ok(())
    }

    fn shift_nt(&mut self, nt: &'static str, value: Value) -> Result<(), ParseError> {
        let state = self.top_state()?;
        let next = self
            .tables
            .ctns
            .get(state)
            .and_then(|row| row.iter().find(|(name, _)| *name == nt))
            .map(|(_, next)| *next)
            .ok_or(ParseError::SyntaxError)?;
        self.stack.push(Entry {
            state: next,
            sym: Sym::Nt(nt),
            value,
        });
        Ok(())
    }

    fn action_word(&mut self, state: usize, terminal: Option<&str>) -> Result<i64, ParseError> {
        let table = match self.tables.actions.get(state) {
            Some(Row::Table(table)) => *table,
            _ => return Err(ParseError::SyntaxError),
        };
        let row = self.rows[state].get_or_insert_with(|| HashRow::new(table));
        let word = if self.recovering {
            row.error_token
        } else {
            match terminal {
                Some(t) => row.terminals.get(t).copied(),
                None => row.end,
            }
        };
        Ok(word.unwrap_or(ERROR))
    }

    fn resolve(&self, word: i64, lexer: &dyn Lexer) -> Result<ParseAction, ParseError> {
        match ParseAction::decode(word) {
            ParseAction::SpecialCase(index) => {
                let case = self
                    .tables
                    .special_cases
                    .get(index)
                    .ok_or(ParseError::SyntaxError)?;
                let word = if lexer.saw_line_terminator() {
                    case.line_break
                } else {
                    case.same_line
                };
                match ParseAction::decode(word) {
                    ParseAction::SpecialCase(..) => Err(ParseError::SyntaxError),
                    action => Ok(action),
                }
            }
            action => Ok(action),
        }
    }

    fn reduce(&mut self, prod: usize) -> Result<(), ParseError> {
        let reduction = self
            .tables
            .reductions
            .get(prod)
            .ok_or(ParseError::NoSuchProduction(prod))?;
        let start = self
            .stack
            .len()
            .checked_sub(reduction.arity)
            .filter(|start| *start > 0)
            .ok_or(ParseError::StackUnderflow)?;
        let values = self.stack.drain(start..).map(|e| e.value).collect();
        let value = (reduction.reduce)(&self.methods, values)?;
        self.shift_nt(reduction.nt, value)
    }

    /// Arrange for the error token to be tried, if the state allows it.
    fn recover(
        &mut self,
        state: usize,
        terminal: Option<&str>,
        lexer: &dyn Lexer,
    ) -> Result<(), ParseError> {
        let failure = match terminal {
            Some(..) => ParseError::SyntaxError,
            None => ParseError::UnexpectedEnd,
        };
        if self.recovering || self.recovered {
            return Err(failure);
        }
        match self.tables.error_codes.get(state).copied().flatten() {
            Some(code) if code.allows(terminal, lexer.saw_line_terminator()) => {
                self.recovering = true;
                Ok(())
            }
            _ => Err(failure),
        }
    }

    fn finish(&mut self) -> Result<Value, ParseError> {
        match self.stack.pop() {
            Some(Entry {
                sym: Sym::Start, ..
            }) => Ok(Value::None),
            Some(entry) => Ok(entry.value),
            None => Err(ParseError::StackUnderflow),
        }
    }
}

/// Parse the whole input of `lexer` starting from `entry_state`.
pub fn parse(
    tables: &Tables,
    entry_state: usize,
    lexer: &mut dyn Lexer,
    builder: &Builder,
) -> Result<Value, ParseError> {
    let methods = builder.resolve(tables.method_names)?;
    let mut parser = Parser::new(tables, methods, entry_state);
    let mut token = lexer.next_token()?;
    loop {
        let state = parser.top_state()?;
        if let Some(Row::Procedure(procedure)) = tables.actions.get(state) {
            match procedure(&mut parser, lexer)? {
                Step::Continue => continue,
                Step::Accept => return parser.finish(),
            }
        }

        let terminal = token.as_ref().map(|t| &*t.terminal);
        let word = parser.action_word(state, terminal)?;
        match parser.resolve(word, lexer)? {
            ParseAction::Shift(next) if parser.recovering => {
                // The error token carries no value.
                parser.recovering = false;
                parser.recovered = true;
                if let Some(top) = parser.stack.last_mut() {
                    top.state = next;
                }
            }
            ParseAction::Shift(next) => {
                let t = token.take().ok_or(ParseError::UnexpectedEnd)?;
                parser.stack.push(Entry {
                    state: next,
                    sym: Sym::Terminal(t.terminal),
                    value: t.value,
                });
                parser.recovered = false;
                token = lexer.next_token()?;
            }
            ParseAction::Reduce(prod) => parser.reduce(prod)?,
            ParseAction::Accept => return parser.finish(),
            ParseAction::Error | ParseAction::SpecialCase(..) => {
                parser.recover(state, terminal, lexer)?
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // list ::= "x" => item($0) | list "x" => append($0, $1)
    fn reduce_item(m: &Methods, x: Vec<Value>) -> Result<Value, ParseError> {
        let [x0] = take(x)?;
        m.call(0, vec![x0])
    }

    fn reduce_append(m: &Methods, x: Vec<Value>) -> Result<Value, ParseError> {
        let [x0, x1] = take(x)?;
        m.call(1, vec![x0, x1])
    }

    static TABLES: Tables = Tables {
        actions: &[
            Row::Table(&[(Term::T("x"), 1)]),
            Row::Table(&[(Term::T("x"), -1), (Term::T("y"), -1), (Term::End, -1)]),
            Row::Table(&[(Term::T("x"), 3), (Term::End, ACCEPT), (Term::ErrorToken, 4)]),
            Row::Table(&[(Term::T("x"), -2), (Term::End, -2)]),
            Row::Procedure(state_4_actions),
        ],
        ctns: &[&[("list", 2)], &[], &[], &[], &[]],
        reductions: &[
            Reduction {
                nt: "list",
                arity: 1,
                reduce: reduce_item,
            },
            Reduction {
                nt: "list",
                arity: 2,
                reduce: reduce_append,
            },
        ],
        special_cases: &[],
        error_codes: &[None, None, Some(ErrorCode::Asi), None, None],
        method_names: &["item", "append", "recovered"],
    };

    // After recovery, wrap the list and stop.
    fn state_4_actions(parser: &mut Parser<'_>, lexer: &mut dyn Lexer) -> Result<Step, ParseError> {
        let value = parser.call(2, vec![parser.stack_value(1)?])?;
        parser.replay("list", value, 0, 1, lexer)?;
        Ok(Step::Accept)
    }

    fn lexer(tokens: &[&str]) -> TokenList {
        let mut lexer = TokenList::new();
        for t in tokens {
            lexer.push(t);
        }
        lexer
    }

    #[test]
    fn default_builder_tags_values() {
        let builder = Builder::tagging(&["item", "append", "recovered"]);
        let value = parse(&TABLES, 0, &mut lexer(&["x", "x"]), &builder).unwrap();
        assert_eq!(
            value,
            Value::node(
                "append",
                vec![Value::node("item", vec![Value::token("x")]), Value::token("x")]
            )
        );
    }

    #[test]
    fn custom_builder() {
        let builder = Builder::new()
            .with("item", |_| Value::custom(1usize))
            .with("append", |args| {
                let n = args[0].downcast_ref::<usize>().copied().unwrap_or(0);
                Value::custom(n + 1)
            })
            .with("recovered", |args| args.into_iter().next().unwrap_or(Value::None));
        let value = parse(&TABLES, 0, &mut lexer(&["x", "x", "x"]), &builder).unwrap();
        assert_eq!(value.downcast_ref::<usize>(), Some(&3));
    }

    #[test]
    fn missing_method() {
        let builder = Builder::tagging(&["item"]);
        let err = parse(&TABLES, 0, &mut lexer(&["x"]), &builder).unwrap_err();
        assert_eq!(err, ParseError::MissingMethod("append".into()));
    }

    #[test]
    fn errors() {
        let builder = Builder::tagging(&["item", "append", "recovered"]);
        let err = parse(&TABLES, 0, &mut lexer(&[]), &builder).unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEnd);
        let err = parse(&TABLES, 0, &mut lexer(&["y"]), &builder).unwrap_err();
        assert_eq!(err, ParseError::SyntaxError);
    }

    #[test]
    fn recovery_needs_a_line_break() {
        let builder = Builder::tagging(&["item", "append", "recovered"]);
        let err = parse(&TABLES, 0, &mut lexer(&["x", "y"]), &builder).unwrap_err();
        assert_eq!(err, ParseError::SyntaxError);

        let mut tokens = lexer(&["x"]);
        tokens.push_after_newline("y");
        let value = parse(&TABLES, 0, &mut tokens, &builder).unwrap();
        assert_eq!(
            value,
            Value::node("recovered", vec![Value::node("item", vec![Value::token("x")])])
        );
    }

    #[test]
    fn flags() {
        let methods = Builder::new().resolve(&[]).unwrap();
        let mut parser = Parser::new(&TABLES, methods, 0);
        assert_eq!(parser.flag(3), None);
        parser.push_flag(3, true);
        parser.push_flag(3, false);
        assert_eq!(parser.flag(3), Some(false));
        assert_eq!(parser.pop_flag(3), Ok(false));
        assert_eq!(parser.flag(3), Some(true));
        assert_eq!(parser.pop_flag(0), Err(ParseError::StackUnderflow));
        assert_eq!(parser.stack_value(1), Ok(Value::None));
        assert_eq!(parser.stack_value(2), Err(ParseError::StackUnderflow));
    }

    #[test]
    fn computed_values_get_an_entry() {
        let methods = Builder::new().resolve(&[]).unwrap();
        let mut parser = Parser::new(&TABLES, methods, 0);
        parser.epsilon_push(3, Value::token("v")).unwrap();
        assert_eq!(parser.top_state(), Ok(3));
        assert_eq!(parser.stack_value(1), Ok(Value::token("v")));
        assert_eq!(parser.stack_value(2), Ok(Value::None));

        parser.epsilon(1).unwrap();
        assert_eq!(parser.top_state(), Ok(1));
        assert_eq!(parser.stack_value(1), Ok(Value::token("v")));

        let err = parser
            .replay("list", Value::None, 1, 0, &mut lexer(&[]))
            .unwrap_err();
        assert_eq!(err, ParseError::StackMismatch);
    }
}
