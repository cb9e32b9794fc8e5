/// The dictionary module provides the interpreter's symbol table of named bindings.
pub mod dictionary;

/// Module for the tagged frames held on the interpreter's return stack.
pub mod control_frame;
