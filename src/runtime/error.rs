use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForthError>;

/// Any error that can occur while compiling or executing a script.
///
/// Lexical and structural errors are detected at compile time and abort compilation.
/// Runtime errors abort the current evaluation call and surface to the host rather than
/// letting execution continue with a corrupted stack.
#[derive(Clone, Debug, Error)]
pub enum ForthError {
    /// A word in the source text matched no lexical classifier.
    #[error("'{word}' is not a valid word")]
    InvalidWord { word: String },

    /// A structural token has no matching counterpart before the end of its scope.
    #[error("no matching '{target}' found for '{opener}' at position {position}")]
    UnmatchedControlFlow {
        opener: &'static str,
        target: &'static str,
        position: usize,
    },

    /// A defining word wasn't followed by an identifier to bind.
    #[error("expected a name at position {position}")]
    ExpectedName { position: usize },

    /// A `."` token wasn't followed by a string literal.
    #[error("expected a string literal at position {position}")]
    ExpectedString { position: usize },

    /// An identifier was referenced that isn't in the dictionary.
    #[error("unknown word '{name}'")]
    UnknownWord { name: String },

    /// A value was popped from an empty data stack.
    #[error("data stack underflow")]
    StackUnderflow,

    /// A value was pushed onto a full data stack.
    #[error("data stack overflow")]
    StackOverflow,

    /// A frame was popped from an empty return stack.
    #[error("return stack underflow")]
    ReturnStackUnderflow,

    /// A frame was pushed onto a full return stack.
    #[error("return stack overflow")]
    ReturnStackOverflow,

    /// The top of the return stack held a different kind of frame than the control flow
    /// required.  A malformed program desynchronized the call/branch/loop discipline.
    #[error("expected a {expected} on the return stack but found a {found}")]
    ReturnStackMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The evaluator was pointed past the end of the compiled token stream.  This is a
    /// host programming error, not something a script can cause.
    #[error("token position {position} is outside the compiled program")]
    PositionOutOfBounds { position: usize },

    /// A memory access or allocation fell outside the linear memory region.
    #[error("memory address {address} is out of bounds")]
    MemoryOutOfBounds { address: i64 },

    /// The dictionary's fixed capacity was exceeded.
    #[error("the dictionary is full")]
    DictionaryFull,

    /// The native function table's fixed capacity was exceeded.
    #[error("the native function table is full")]
    NativeTableFull,

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Writing interpreter output to the host supplied sink failed.
    #[error("output error: {message}")]
    Io { message: String },
}

/// Output failures are carried as a plain message so that errors stay cloneable.
impl From<std::io::Error> for ForthError {
    fn from(error: std::io::Error) -> ForthError {
        ForthError::Io {
            message: error.to_string(),
        }
    }
}
