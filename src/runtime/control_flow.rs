use crate::{
    lang::{
        code::ByteCode,
        tokenizing::{Keyword, Token},
    },
    runtime::error::{self, ForthError},
};

/// Scan the instruction stream for the structural token matching the one at
/// `from_position`.
///
/// Scanning starts at the position directly after `from_position` and honors nesting:
/// every occurrence of `nest` raises the nesting depth, and the `target` only matches
/// at depth zero.  `nest` is `None` when locating the `;` that terminates a definition,
/// where there is nothing to nest.
///
/// Reaching a `;` before the target means the enclosing scope ended without it, which
/// is reported as `Ok(None)` so that callers can decide whether the target was optional
/// (an `if` with no `else` arm) or required.  Running off the end of the stream is
/// always an unmatched control flow error, never a silent wraparound.
pub fn find_matching(
    code: &ByteCode,
    from_position: usize,
    nest: Option<Keyword>,
    target: Keyword,
) -> error::Result<Option<usize>> {
    let mut depth = 0;
    let mut position = from_position + 1;

    while let Some(token) = code.token_at(position) {
        if let Token::Op(keyword) = token {
            if Some(*keyword) == nest {
                depth += 1;
            } else if *keyword == target {
                if depth == 0 {
                    return Ok(Some(position));
                }

                depth -= 1;
            } else if *keyword == Keyword::Semicolon {
                // The enclosing scope ended before the target was found.
                return Ok(None);
            }
        }

        position += 1;
    }

    Err(unmatched_error(code, from_position, target))
}

/// Scan for a structural token that has to exist.  An `Ok(None)` from the scan becomes
/// an unmatched control flow error.
pub fn find_required(
    code: &ByteCode,
    from_position: usize,
    nest: Option<Keyword>,
    target: Keyword,
) -> error::Result<usize> {
    find_matching(code, from_position, nest, target)?
        .ok_or_else(|| unmatched_error(code, from_position, target))
}

/// Build the error for a failed scan, naming the opening token and the missing target.
fn unmatched_error(code: &ByteCode, from_position: usize, target: Keyword) -> ForthError {
    let opener = match code.token_at(from_position) {
        Some(Token::Op(keyword)) => keyword_name(*keyword),
        _ => "<start>",
    };

    ForthError::UnmatchedControlFlow {
        opener,
        target: keyword_name(target),
        position: from_position,
    }
}

/// A static surface name for a structural keyword, for error reporting.
fn keyword_name(keyword: Keyword) -> &'static str {
    match keyword {
        Keyword::If => "if",
        Keyword::Else => "else",
        Keyword::Then => "then",
        Keyword::Do => "do",
        Keyword::Loop => "loop",
        Keyword::Begin => "begin",
        Keyword::Until => "until",
        Keyword::Colon => ":",
        Keyword::Semicolon => ";",
        _ => "<structural>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::code::compile;

    #[test]
    fn finds_the_matching_then() {
        let code = compile("if 1 2 then").unwrap();
        let position = find_required(&code, 0, Some(Keyword::If), Keyword::Then).unwrap();

        assert_eq!(position, 3);
    }

    #[test]
    fn nested_openers_are_skipped() {
        let code = compile("if 1 if 2 then 3 then").unwrap();
        let position = find_required(&code, 0, Some(Keyword::If), Keyword::Then).unwrap();

        assert_eq!(position, 6);
    }

    #[test]
    fn a_semicolon_ends_the_scope_without_a_match() {
        let code = compile("if 1 2 ; then").unwrap();
        let result = find_matching(&code, 0, Some(Keyword::If), Keyword::Then);

        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn a_required_target_missing_from_the_scope_is_an_error() {
        let code = compile("if 1 2 ; then").unwrap();
        let result = find_required(&code, 0, Some(Keyword::If), Keyword::Then);

        assert!(matches!(
            result,
            Err(ForthError::UnmatchedControlFlow { .. })
        ));
    }

    #[test]
    fn running_off_the_end_is_an_error_not_a_wraparound() {
        let code = compile("if 1 2").unwrap();
        let result = find_matching(&code, 0, Some(Keyword::If), Keyword::Then);

        assert!(matches!(
            result,
            Err(ForthError::UnmatchedControlFlow { .. })
        ));
    }

    #[test]
    fn definition_terminators_scan_without_nesting() {
        let code = compile(": name 1 2 + ;").unwrap();
        let position = find_required(&code, 0, None, Keyword::Semicolon).unwrap();

        assert_eq!(position, 6);
    }
}
