//! Runtime support for parsers generated by `gramgen`.
//!
//! Statically dispatched parsers are driven by [`parser::parse`] over the
//! flat tables of [`definition::ParserTables`]. Dynamically dispatched
//! parsers use the associative tables and method registry of [`dynamic`].

pub mod definition;
pub mod dynamic;
pub mod parser;

pub use crate::parser::ParseError;

// internally used by codegen.
#[doc(hidden)]
pub mod _private {
    pub use crate::{
        definition::{ParseAction, ParserTables, ACCEPT, ERROR},
        parser::{discard, downcast, parse, pop, Node, ParseError, Token, TokenStream},
    };
}
