//! Grammar compiler toolchain.
//!
//! The pipeline runs from ECMArkup-style grammar fragments, through the
//! desugarer ([`esgrammar`]) and the validated grammar model ([`grammar`]),
//! to parser source code emitted from precomputed parser states
//! ([`states`], [`codegen`]).

pub mod codegen;
pub mod esgrammar;
pub mod grammar;
pub mod states;
pub mod types;
pub mod util;
