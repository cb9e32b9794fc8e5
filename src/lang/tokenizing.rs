use crate::runtime::error::{self, ForthError};
use lazy_static::lazy_static;
use std::fmt::{self, Debug, Display, Formatter};

/// The fixed vocabulary of the language.  Every keyword and operator that the evaluator
/// understands directly.  Any word that isn't one of these is classified as an integer
/// literal, a string literal, or an identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// Duplicate the top value of the data stack.
    Dup,

    /// Drop the top value of the data stack.
    Drop,

    /// Swap the top two values of the data stack.
    Swap,

    /// Copy the second value over the top of the stack.
    Over,

    /// Rotate the top three values of the data stack.
    Rot,

    /// Pop the top value and print it followed by a space.
    Dot,

    /// Print the string literal that follows in the instruction stream.
    DotString,

    /// Pop the top value and print it as a character.
    Emit,

    /// Print a new line.
    Cr,

    /// Pop two values and push canonical true if they are equal.
    Equal,

    /// Pop two values and push canonical true if the second popped is less.
    Less,

    /// Pop two values and push canonical true if the second popped is greater.
    Greater,

    /// Pop a value and push its bitwise inversion.
    Invert,

    /// Pop two values and push canonical true if both are canonical true.
    And,

    /// Pop two values and push canonical true if either is canonical true.
    Or,

    /// Pop two values and push their sum.
    Plus,

    /// Pop two values and push their difference.
    Minus,

    /// Pop two values and push their product.
    Star,

    /// Pop two values and push their quotient, truncated toward zero.
    Slash,

    /// Pop a condition and branch to the else/then arm when it isn't canonical true.
    If,

    /// Marks the start of the false arm of an `if`.
    Else,

    /// Marks the end of an `if`.  A no-op when reached sequentially.
    Then,

    /// Pop the loop bounds and begin a counted loop.
    Do,

    /// Push the innermost loop's current index onto the data stack.
    Index,

    /// End of a counted loop body.  Advances the index and jumps back while it is in
    /// range.
    Loop,

    /// Marks the re-entry point of an unbounded loop.
    Begin,

    /// Pop a condition and jump back to the matching `begin` while it is canonical
    /// true.
    Until,

    /// Pop an offset and reserve that many cells of linear memory.
    Allot,

    /// A no-op.  Cells are the unit of memory so the count on the stack is already in
    /// cells.
    Cells,

    /// Pop a value and bind the following identifier to it as a constant.
    Constant,

    /// Bind the following identifier to a freshly allocated memory cell.
    Variable,

    /// Pop an address and push the value of the memory cell it names.
    At,

    /// Pop an address and then a value, storing the value into the cell.
    Store,

    /// Begin a function definition.  Binds the following identifier to the body that
    /// runs when the name is later referenced.
    Colon,

    /// End of a function definition, and at run time, return from a function call.
    Semicolon,
}

lazy_static! {
    /// The vocabulary table mapping surface text to keywords.  The lexical classifier
    /// tries these entries, in this order, before any other classification.
    pub static ref VOCABULARY: Vec<(&'static str, Keyword)> = vec![
        ("dup", Keyword::Dup),
        ("drop", Keyword::Drop),
        ("swap", Keyword::Swap),
        ("over", Keyword::Over),
        ("rot", Keyword::Rot),
        (".", Keyword::Dot),
        (".\"", Keyword::DotString),
        ("emit", Keyword::Emit),
        ("cr", Keyword::Cr),
        ("=", Keyword::Equal),
        ("<", Keyword::Less),
        (">", Keyword::Greater),
        ("invert", Keyword::Invert),
        ("and", Keyword::And),
        ("or", Keyword::Or),
        ("+", Keyword::Plus),
        ("-", Keyword::Minus),
        ("*", Keyword::Star),
        ("/", Keyword::Slash),
        ("if", Keyword::If),
        ("else", Keyword::Else),
        ("then", Keyword::Then),
        ("do", Keyword::Do),
        ("i", Keyword::Index),
        ("loop", Keyword::Loop),
        ("begin", Keyword::Begin),
        ("until", Keyword::Until),
        ("allot", Keyword::Allot),
        ("cells", Keyword::Cells),
        ("constant", Keyword::Constant),
        ("variable", Keyword::Variable),
        ("@", Keyword::At),
        ("!", Keyword::Store),
        (":", Keyword::Colon),
        (";", Keyword::Semicolon),
    ];
}

/// Print the keyword as it appears in source code.
impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let text = VOCABULARY
            .iter()
            .find(|(_, keyword)| keyword == self)
            .map(|(text, _)| *text)
            .unwrap_or("<unknown>");

        write!(f, "{}", text)
    }
}

impl Debug for Keyword {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// One unit of a compiled program.  A token is either an entry in the fixed vocabulary,
/// an integer literal, a string literal, or an identifier to be resolved against the
/// dictionary at run time.
#[derive(Clone, PartialEq, Eq)]
pub enum Token {
    /// A keyword or operator from the fixed vocabulary.
    Op(Keyword),

    /// An integer literal.
    Number(i64),

    /// A string literal, only meaningful directly after a `."` token.
    Str(String),

    /// An identifier naming a constant, variable, function, or native function.
    Word(String),
}

/// Make sure that the tokens are nicely printable for error reporting.
impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Token::Op(keyword) => write!(f, "{}", keyword),
            Token::Number(value) => write!(f, "{}", value),
            Token::Str(text) => write!(f, "{}\"", text),
            Token::Word(name) => write!(f, "{}", name),
        }
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Token::Op(keyword) => write!(f, "op {}", keyword),
            Token::Number(value) => write!(f, "number {}", value),
            Token::Str(text) => write!(f, "string {:?}", text),
            Token::Word(name) => write!(f, "word {}", name),
        }
    }
}

impl Token {
    /// Get the identifier text, or error out if the token isn't an identifier.  Used
    /// where the language requires a name, directly after `constant`, `variable`,
    /// and `:`.
    pub fn word(&self, position: usize) -> error::Result<&str> {
        match self {
            Token::Word(name) => Ok(name),
            _ => Err(ForthError::ExpectedName { position }),
        }
    }

    /// Get the string literal text, or error out if the token isn't a string.  Used for
    /// the token directly after `."`.
    pub fn string(&self, position: usize) -> error::Result<&str> {
        match self {
            Token::Str(text) => Ok(text),
            _ => Err(ForthError::ExpectedString { position }),
        }
    }
}

/// Check if the given character is considered whitespace between words.
fn is_whitespace(next: char) -> bool {
    next == ' ' || next == '\t' || next == '\r' || next == '\n'
}

/// Does the whole word parse as a base-10 integer?  Partial parses are rejected, so
/// `12x` is not an integer, it falls through to the identifier classifier.
fn try_integer(word: &str) -> Option<i64> {
    word.parse::<i64>().ok()
}

/// Does the word end in a double quote?  If so it is a string literal and the literal's
/// text is the word with the trailing quote stripped.
fn try_string(word: &str) -> Option<String> {
    let text = word.strip_suffix('"')?;
    Some(text.to_string())
}

/// Classify one whitespace-free word into exactly one token.
///
/// The classifiers are tried in a fixed priority order: the vocabulary table first, in
/// table order, then integer literal, then string literal, and finally identifier.  A
/// word that contains a double quote or a backslash but doesn't classify as a string is
/// lexically invalid.
pub fn classify_word(word: &str) -> error::Result<Token> {
    for (text, keyword) in VOCABULARY.iter() {
        if *text == word {
            return Ok(Token::Op(*keyword));
        }
    }

    if let Some(value) = try_integer(word) {
        return Ok(Token::Number(value));
    }

    if let Some(text) = try_string(word) {
        return Ok(Token::Str(text));
    }

    if word.contains('"') || word.contains('\\') {
        return Err(ForthError::InvalidWord {
            word: word.to_string(),
        });
    }

    Ok(Token::Word(word.to_string()))
}

/// Split the source text into words and classify each one in encounter order.
///
/// The words are counted in a first pass to size the token stream's allocation, then a
/// second pass populates it.  Any lexically invalid word aborts the whole compilation.
pub fn tokenize(source: &str) -> error::Result<Vec<Token>> {
    let word_count = source.split(is_whitespace).filter(|w| !w.is_empty()).count();
    let mut stream = Vec::with_capacity(word_count);

    for word in source.split(is_whitespace).filter(|w| !w.is_empty()) {
        stream.push(classify_word(word)?);
    }

    debug_assert_eq!(stream.len(), word_count);

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_classify_before_everything_else() {
        assert_eq!(classify_word("dup").unwrap(), Token::Op(Keyword::Dup));
        assert_eq!(classify_word(".\"").unwrap(), Token::Op(Keyword::DotString));
        assert_eq!(classify_word(";").unwrap(), Token::Op(Keyword::Semicolon));
    }

    #[test]
    fn integers_allow_signs_but_not_partial_parses() {
        assert_eq!(classify_word("42").unwrap(), Token::Number(42));
        assert_eq!(classify_word("-7").unwrap(), Token::Number(-7));
        assert_eq!(classify_word("+5").unwrap(), Token::Number(5));

        // A partial parse is an identifier, not a number.
        assert_eq!(
            classify_word("12x").unwrap(),
            Token::Word("12x".to_string())
        );
    }

    #[test]
    fn string_literals_end_with_a_quote() {
        assert_eq!(
            classify_word("world!\"").unwrap(),
            Token::Str("world!".to_string())
        );
    }

    #[test]
    fn stray_quotes_and_backslashes_are_lexical_errors() {
        assert!(matches!(
            classify_word("bad\"word"),
            Err(ForthError::InvalidWord { .. })
        ));
        assert!(matches!(
            classify_word("bad\\word"),
            Err(ForthError::InvalidWord { .. })
        ));
    }

    #[test]
    fn tokenize_splits_on_all_whitespace() {
        let stream = tokenize("1 2\t+\n.").unwrap();

        assert_eq!(
            stream,
            vec![
                Token::Number(1),
                Token::Number(2),
                Token::Op(Keyword::Plus),
                Token::Op(Keyword::Dot),
            ]
        );
    }

    #[test]
    fn tokenize_reports_the_offending_word() {
        let result = tokenize("1 2 oh\\no +");

        match result {
            Err(ForthError::InvalidWord { word }) => assert_eq!(word, "oh\\no"),
            other => panic!("Expected a lexical error, got {:?}.", other.is_ok()),
        }
    }
}
