//! An embeddable interpreter for a small stack-based, Forth-like language.
//!
//! The host program compiles source text into an immutable instruction stream with
//! [`compile`], creates a [`ForthState`] with explicit capacities, and then runs whole
//! programs or individual named functions against that state.  The host can also push
//! and pop the data stack directly, register constants, and register native words that
//! the interpreted language can call back into.
//!
//! ```
//! use emforth::{ForthState, compile};
//!
//! let code = compile(": double 2 * ;").unwrap();
//! let mut state = ForthState::default();
//!
//! state.run(&code).unwrap();
//! state.push(21).unwrap();
//! state.run_function(&code, "double").unwrap();
//!
//! assert_eq!(state.pop().unwrap(), 42);
//! ```

/// Module for managing source code and turning it into a flat stream of tokens.
pub mod lang;

/// Module for the runtime and the data structures used by the interpreter.  As well as
/// the evaluator itself.
pub mod runtime;

pub use lang::{
    code::{ByteCode, compile},
    tokenizing::{Keyword, Token},
};

pub use runtime::{
    error::{ForthError, Result},
    evaluator::{FORTH_FALSE, FORTH_TRUE, eval},
    state::{ForthState, NativeHandler},
};
