//! Driver of statically dispatched parsers.

use crate::definition::{ParseAction, ParserTables};
use std::any::Any;

/// A value on the parser stack.
pub type Node = Box<dyn Any>;

/// A token of a generated parser.
pub trait Token {
    /// The column of this token in the action table.
    fn terminal_index(&self) -> usize;

    /// The value this token pushes when shifted.
    fn into_node(self) -> Node;
}

/// A source of tokens.
pub trait TokenStream {
    type Token;

    fn next_token(&mut self) -> Result<Option<Self::Token>, ParseError>;
}

impl<I> TokenStream for I
where
    I: Iterator,
{
    type Token = I::Item;

    fn next_token(&mut self) -> Result<Option<Self::Token>, ParseError> {
        Ok(self.next())
    }
}

/// Reduces by one production: pops the values of its body from the stack,
/// pushes the value of its nonterminal, and returns the nonterminal's goto
/// column.
pub type ReduceFn<H> = fn(&H, usize, &mut Vec<Node>) -> Result<usize, ParseError>;

/// The parser driven by flat action and goto tables.
pub struct Parser<'a, H> {
    tables: &'a ParserTables<'a>,
    state_stack: Vec<usize>,
    node_stack: Vec<Node>,
    reduce: ReduceFn<H>,
    handler: &'a H,
}

impl<'a, H> Parser<'a, H> {
    pub fn new(
        tables: &'a ParserTables<'a>,
        reduce: ReduceFn<H>,
        handler: &'a H,
        entry_state: usize,
    ) -> Self {
        debug_assert!(tables.is_well_formed());
        debug_assert!(entry_state < tables.state_count);
        Self {
            tables,
            state_stack: vec![entry_state],
            node_stack: vec![],
            reduce,
            handler,
        }
    }

    fn state(&self) -> Result<usize, ParseError> {
        self.state_stack
            .last()
            .copied()
            .ok_or(ParseError::StackUnderflow)
    }

    /// Perform every reduction `terminal` triggers and return the first
    /// action that is not a reduction.
    fn reduce_all(&mut self, terminal: usize) -> Result<ParseAction, ParseError> {
        loop {
            let prod = match self.tables.action(self.state()?, terminal) {
                ParseAction::Reduce(prod) => prod,
                action => return Ok(action),
            };
            let nt = (self.reduce)(self.handler, prod, &mut self.node_stack)?;
            if self.node_stack.len() > self.state_stack.len() {
                return Err(ParseError::StackUnderflow);
            }
            // One state per node plus the entry state; the new node has no
            // state yet.
            self.state_stack.truncate(self.node_stack.len());
            let next = self
                .tables
                .goto(self.state()?, nt)
                .ok_or(ParseError::SyntaxError)?;
            self.state_stack.push(next);
        }
    }

    pub fn write_token<T>(&mut self, token: T) -> Result<(), ParseError>
    where
        T: Token,
    {
        let terminal = token.terminal_index();
        let mut recovered = false;
        loop {
            match self.reduce_all(terminal)? {
                ParseAction::Shift(next) => {
                    self.node_stack.push(token.into_node());
                    self.state_stack.push(next);
                    return Ok(());
                }
                _ if recovered => return Err(ParseError::SyntaxError),
                _ => {
                    self.try_error_handling(terminal)?;
                    recovered = true;
                }
            }
        }
    }

    /// Finish the parse and return the value of the goal nonterminal.
    pub fn close(&mut self) -> Result<Node, ParseError> {
        let end = self.tables.end_terminal;
        let mut recovered = false;
        loop {
            match self.reduce_all(end)? {
                ParseAction::Accept => {
                    if self.node_stack.len() != 1 {
                        return Err(ParseError::StackMismatch);
                    }
                    return self.node_stack.pop().ok_or(ParseError::StackUnderflow);
                }
                _ if recovered => return Err(ParseError::UnexpectedEnd),
                _ => {
                    self.try_error_handling(end)?;
                    recovered = true;
                }
            }
        }
    }

    /// Try the `ErrorToken` column once. A shift there is treated as
    /// consuming the error token: the top state is replaced and no value is
    /// pushed.
    fn try_error_handling(&mut self, terminal: usize) -> Result<(), ParseError> {
        let failure = if terminal == self.tables.end_terminal {
            ParseError::UnexpectedEnd
        } else {
            ParseError::SyntaxError
        };
        let error_terminal = match self.tables.error_terminal {
            Some(t) if t != terminal => t,
            _ => return Err(failure),
        };
        match self.reduce_all(error_terminal)? {
            ParseAction::Shift(next) => {
                let top = self
                    .state_stack
                    .last_mut()
                    .ok_or(ParseError::StackUnderflow)?;
                *top = next;
                Ok(())
            }
            _ => Err(failure),
        }
    }
}

/// Parse a whole token stream starting from `entry_state`.
pub fn parse<H, S>(
    handler: &H,
    mut tokens: S,
    entry_state: usize,
    tables: &ParserTables<'_>,
    reduce: ReduceFn<H>,
) -> Result<Node, ParseError>
where
    S: TokenStream,
    S::Token: Token,
{
    let mut parser = Parser::new(tables, reduce, handler, entry_state);
    while let Some(token) = tokens.next_token()? {
        parser.write_token(token)?;
    }
    parser.close()
}

/// Pop the top value of the stack as a `T`.
pub fn pop<T: 'static>(stack: &mut Vec<Node>) -> Result<T, ParseError> {
    let node = stack.pop().ok_or(ParseError::StackUnderflow)?;
    downcast(node)
}

/// Pop and drop the top value of the stack.
pub fn discard(stack: &mut Vec<Node>) -> Result<(), ParseError> {
    stack.pop().map(drop).ok_or(ParseError::StackUnderflow)
}

pub fn downcast<T: 'static>(node: Node) -> Result<T, ParseError> {
    node.downcast::<T>()
        .map(|value| *value)
        .map_err(|_| ParseError::StackMismatch)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error")]
    SyntaxError,

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("no builder method registered for {:?}", _0)]
    MissingMethod(String),

    #[error("a value on the parser stack has an unexpected type")]
    StackMismatch,

    #[error("parser stack underflow")]
    StackUnderflow,

    #[error("no such production: {}", _0)]
    NoSuchProduction(usize),

    #[error("from lexer: {}", _0)]
    Lexer(String),
}
