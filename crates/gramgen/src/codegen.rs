//! Parser source code generation.
//!
//! Two backends read the same [`ParserStates`]:
//!
//! * [`dynamic`] emits associative tables interpreted by
//!   `gramgen_runtime::dynamic`, with reduce actions compiled to functions
//!   over runtime values and builder methods called through a registry.
//! * [`typed`] emits flat numeric tables, a `Handler` trait with one method
//!   per reduce-action tag, concrete AST types, and a statically typed
//!   `reduce` function.
//!
//! Output depends only on the iteration order of the grammar and the
//! states, so generating twice from the same input yields identical text.

/// `emit!(emitter, indent, "format", args...)`
macro_rules! emit {
    ($e:expr, $indent:expr, $($arg:tt)*) => {
        $e.line($indent, format_args!($($arg)*))
    };
}

pub mod dynamic;
mod names;
pub mod typed;

pub use self::names::CaseConverter;

use crate::states::ParserStates;
use std::fmt::Write as _;

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("{} and {} have the same spelling ({})", first, second, spelling)]
    AmbiguousIdentifierSpelling {
        first: String,
        second: String,
        spelling: String,
    },

    #[error("cannot compile the reduce action of {}: {}", production, reason)]
    UnsupportedReduceShape { production: String, reason: String },

    #[error("cannot flatten state {}: {}", state, reason)]
    UnsupportedState { state: usize, reason: String },

    #[error("no type is known for {}", name)]
    MissingType { name: String },

    #[error("method {} returns {}, which the default handler cannot build", method, ty)]
    UnsupportedMethodType { method: String, ty: String },

    #[error("formatting error")]
    Fmt(#[from] std::fmt::Error),
}

/// Generate dynamically dispatched parser source with default options.
pub fn generate_dynamic(states: &ParserStates) -> Result<String, CodegenError> {
    dynamic::DynamicOptions::default().generate(states)
}

/// Generate statically dispatched parser source with default options.
pub fn generate_typed(states: &ParserStates) -> Result<String, CodegenError> {
    typed::TypedOptions::default().generate(states)
}

/// Line-oriented writer with indentation in steps of four spaces.
struct Emitter {
    out: String,
}

impl Emitter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn line(&mut self, indent: usize, args: std::fmt::Arguments<'_>) -> Result<(), CodegenError> {
        for _ in 0..indent {
            self.out.push_str("    ");
        }
        self.out.write_fmt(args)?;
        self.out.push('\n');
        Ok(())
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Render `s` as a Rust string literal.
fn rust_str(s: &str) -> String {
    format!("{:?}", s)
}
