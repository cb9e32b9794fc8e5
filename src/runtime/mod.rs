/// All of the core data structures used by the interpreter.
pub mod data_structures;

/// Module for defining the error reporting of the interpreter.
pub mod error;

/// Module for the structural scanner that resolves control flow jump targets in a
/// compiled token stream.
pub mod control_flow;

/// Module for the mutable machine state that programs execute against.
pub mod state;

/// Module for the evaluator, the dispatch loop that executes a compiled program slice
/// against a machine state.
pub mod evaluator;
