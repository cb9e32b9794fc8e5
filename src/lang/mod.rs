/// Module for the splitting of source code into words and the classification of those
/// words into tokens.
pub mod tokenizing;

/// Module for the compiled program handle.  A compiled program is a flat, immutable
/// stream of tokens that the evaluator indexes by position.
pub mod code;
