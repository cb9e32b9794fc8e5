use crate::{
    lang::tokenizing::{self, Token},
    runtime::error,
};
use log::debug;
use std::fmt::{self, Debug, Formatter};

/// A compiled program.  Holds the flat stream of tokens produced by [`compile`] and is
/// never mutated afterwards.  The evaluator indexes the stream by position and control
/// flow is performed by scanning it for structurally matching tokens.
#[derive(Clone)]
pub struct ByteCode {
    stream: Vec<Token>,
}

impl ByteCode {
    /// The number of tokens in the stream.
    pub fn len(&self) -> usize {
        self.stream.len()
    }

    /// Is the program empty?
    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    /// Get the token at the given position, if the position is within the stream.
    pub fn token_at(&self, position: usize) -> Option<&Token> {
        self.stream.get(position)
    }

    /// The full token stream as a slice.
    pub fn tokens(&self) -> &[Token] {
        &self.stream
    }
}

impl Debug for ByteCode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (position, token) in self.stream.iter().enumerate() {
            writeln!(f, "{:4}  {:?}", position, token)?;
        }

        Ok(())
    }
}

/// Compile source text into an immutable program.
///
/// The source is split on whitespace and every word is classified into exactly one
/// token.  Fails with a lexical error if any word can't be classified, in which case no
/// program is produced.
pub fn compile(source: &str) -> error::Result<ByteCode> {
    let stream = tokenizing::tokenize(source)?;

    debug!("Compiled {} tokens.", stream.len());

    Ok(ByteCode { stream })
}
