use crate::{
    lang::{
        code::ByteCode,
        tokenizing::{Keyword, Token},
    },
    runtime::{
        control_flow::{find_matching, find_required},
        data_structures::{control_frame::ControlFrame, dictionary::BindingKind},
        error::{self, ForthError},
        state::ForthState,
    },
};
use log::trace;

/// The canonical boolean encoding: logical true is the integer with all bits set.
pub const FORTH_TRUE: i64 = -1;

/// The canonical boolean encoding for logical false.
pub const FORTH_FALSE: i64 = 0;

/// Convert a host boolean into the canonical encoding.
fn as_forth_bool(value: bool) -> i64 {
    if value { FORTH_TRUE } else { FORTH_FALSE }
}

/// Duplicate the top value on the data stack.
///
/// Signature: `value -- value value`
fn word_dup(state: &mut ForthState) -> error::Result<()> {
    let value = state.pop()?;

    state.push(value)?;
    state.push(value)
}

/// Drop the top value on the data stack.
///
/// Signature: `value -- `
fn word_drop(state: &mut ForthState) -> error::Result<()> {
    let _ = state.pop()?;

    Ok(())
}

/// Swap the top 2 values on the data stack.
///
/// Signature: `a b -- b a`
fn word_swap(state: &mut ForthState) -> error::Result<()> {
    let b = state.pop()?;
    let a = state.pop()?;

    state.push(b)?;
    state.push(a)
}

/// Make a copy of the second value and place it over the top value.
///
/// Signature: `a b -- a b a`
fn word_over(state: &mut ForthState) -> error::Result<()> {
    let b = state.pop()?;
    let a = state.pop()?;

    state.push(a)?;
    state.push(b)?;
    state.push(a)
}

/// Rotate the top 3 values on the data stack.
///
/// Signature: `a b c -- b c a`
fn word_rot(state: &mut ForthState) -> error::Result<()> {
    let c = state.pop()?;
    let b = state.pop()?;
    let a = state.pop()?;

    state.push(b)?;
    state.push(c)?;
    state.push(a)
}

/// Pop the top value and print it followed by a single space.
///
/// Signature: `value -- `
fn word_dot(state: &mut ForthState) -> error::Result<()> {
    let value = state.pop()?;

    write!(state.output_mut(), "{} ", value)?;

    Ok(())
}

/// Pop the top value and print it as a character.
///
/// Signature: `value -- `
fn word_emit(state: &mut ForthState) -> error::Result<()> {
    let value = state.pop()?;

    write!(state.output_mut(), "{}", (value as u8) as char)?;

    Ok(())
}

/// Print a new line.
///
/// Signature: ` -- `
fn word_cr(state: &mut ForthState) -> error::Result<()> {
    writeln!(state.output_mut())?;

    Ok(())
}

/// Print the string literal in the next stream position, consuming that position.
///
/// Signature: ` -- `
fn word_dot_string(state: &mut ForthState, code: &ByteCode, position: usize) -> error::Result<usize> {
    let text = code
        .token_at(position + 1)
        .ok_or(ForthError::ExpectedString {
            position: position + 1,
        })?
        .string(position + 1)?;

    write!(state.output_mut(), "{}", text)?;

    Ok(position + 2)
}

/// Pop two values and push a comparison result in the canonical boolean encoding.  The
/// second popped value is the left operand.
///
/// Signature: `a b -- result`
fn word_compare(
    state: &mut ForthState,
    compare: fn(i64, i64) -> bool,
) -> error::Result<()> {
    let b = state.pop()?;
    let a = state.pop()?;

    state.push(as_forth_bool(compare(a, b)))
}

/// Pop the top value and push its bitwise inversion.  Inverting canonical true yields
/// canonical false and vice versa.
///
/// Signature: `value -- inverted`
fn word_invert(state: &mut ForthState) -> error::Result<()> {
    let value = state.pop()?;

    state.push(!value)
}

/// Pop two values and push canonical true only when both are exactly canonical true.
/// This is not a bitwise and, nor a generic nonzero test.
///
/// Signature: `a b -- result`
fn word_and(state: &mut ForthState) -> error::Result<()> {
    let b = state.pop()?;
    let a = state.pop()?;

    state.push(as_forth_bool(a == FORTH_TRUE && b == FORTH_TRUE))
}

/// Pop two values and push canonical true when either is exactly canonical true.
///
/// Signature: `a b -- result`
fn word_or(state: &mut ForthState) -> error::Result<()> {
    let b = state.pop()?;
    let a = state.pop()?;

    state.push(as_forth_bool(a == FORTH_TRUE || b == FORTH_TRUE))
}

/// Pop two values and push an arithmetic result.  The second popped value is the left
/// operand.
///
/// Signature: `a b -- result`
fn word_math(state: &mut ForthState, op: fn(i64, i64) -> i64) -> error::Result<()> {
    let b = state.pop()?;
    let a = state.pop()?;

    state.push(op(a, b))
}

/// Pop two values and push their quotient, truncated toward zero.  A zero divisor is a
/// reported error, not undefined behavior.
///
/// Signature: `a b -- quotient`
fn word_divide(state: &mut ForthState) -> error::Result<()> {
    let b = state.pop()?;
    let a = state.pop()?;

    if b == 0 {
        return Err(ForthError::DivisionByZero);
    }

    state.push(a.wrapping_div(b))
}

/// Pop an address and push the value of the memory cell it names.
///
/// Signature: `address -- value`
fn word_at(state: &mut ForthState) -> error::Result<()> {
    let address = state.pop()?;
    let value = state.memory_read(address)?;

    state.push(value)
}

/// Pop an address and then a value, storing the value into the cell.
///
/// Signature: `value address -- `
fn word_store(state: &mut ForthState) -> error::Result<()> {
    let address = state.pop()?;
    let value = state.pop()?;

    state.memory_write(address, value)
}

/// Pop an offset and move the memory high water mark by that many cells, reserving a
/// contiguous block after a variable.
///
/// Signature: `offset -- `
fn word_allot(state: &mut ForthState) -> error::Result<()> {
    let offset = state.pop()?;

    state.allot(offset)
}

/// Pop a condition and branch.
///
/// Both the `else` and `then` targets are resolved relative to the `if` before anything
/// runs, so a structurally broken conditional fails here instead of scanning out of
/// bounds mid-branch.  On canonical true the body directly after the `if` runs; when an
/// `else` arm exists, its resume point at `then` is saved on the return stack for the
/// `else` token to jump through.  On any other condition value execution jumps past the
/// `else` when there is one, or past the `then` otherwise.
///
/// Signature: `condition -- `
fn word_if(state: &mut ForthState, code: &ByteCode, position: usize) -> error::Result<usize> {
    let then_position = find_required(code, position, Some(Keyword::If), Keyword::Then)?;
    let else_position = find_matching(code, position, Some(Keyword::If), Keyword::Else)?;

    let condition = state.pop()?;

    if condition == FORTH_TRUE {
        if else_position.is_some() {
            state.return_push(ControlFrame::BranchTarget(then_position))?;
        }

        return Ok(position + 1);
    }

    match else_position {
        Some(else_position) => Ok(else_position + 1),
        None => Ok(then_position + 1),
    }
}

/// Pop the loop bounds, the end bound off the top, and start a counted loop.
///
/// When the start index is already at or past the end bound the whole body is skipped
/// by jumping past the matching `loop`.  Otherwise a loop frame is saved on the return
/// stack and execution falls through into the body.
///
/// Signature: `start end -- `
fn word_do(state: &mut ForthState, code: &ByteCode, position: usize) -> error::Result<usize> {
    let limit = state.pop()?;
    let start = state.pop()?;

    if start < limit {
        state.return_push(ControlFrame::LoopFrame {
            do_position: position,
            limit,
            index: start,
        })?;

        Ok(position + 1)
    } else {
        let loop_position = find_required(code, position, Some(Keyword::Do), Keyword::Loop)?;

        Ok(loop_position + 1)
    }
}

/// Advance the innermost loop and either jump back to the body start or fall through
/// past the `loop` when the index reaches the limit.
fn word_loop(state: &mut ForthState, position: usize) -> error::Result<usize> {
    let (do_position, limit, index) = state.pop_loop_frame()?;
    let next_index = index + 1;

    if next_index < limit {
        state.return_push(ControlFrame::LoopFrame {
            do_position,
            limit,
            index: next_index,
        })?;

        Ok(do_position + 1)
    } else {
        Ok(position + 1)
    }
}

/// Push the innermost loop's current index onto the data stack.  The loop frame stays
/// on the return stack untouched.
///
/// Signature: ` -- index`
fn word_index(state: &mut ForthState) -> error::Result<()> {
    let index = state.loop_index()?;

    state.push(index)
}

/// Pop a condition and either jump back to the matching `begin` or exit the loop.
///
/// `begin` saves its own position as the re-entry point, so a repeat re-executes the
/// `begin` and keeps the saved target balanced with each `until`.
///
/// Signature: `condition -- `
fn word_until(state: &mut ForthState, position: usize) -> error::Result<usize> {
    let condition = state.pop()?;
    let target = state.pop_branch_target()?;

    if condition == FORTH_TRUE {
        Ok(target)
    } else {
        Ok(position + 1)
    }
}

/// Bind the identifier following a `constant`, `variable`, or `:` token.
fn binding_name(code: &ByteCode, position: usize) -> error::Result<String> {
    let name_position = position + 1;

    let token = code
        .token_at(name_position)
        .ok_or(ForthError::ExpectedName {
            position: name_position,
        })?;

    Ok(token.word(name_position)?.to_string())
}

/// Pop a value and bind the following identifier to it as a constant.
///
/// Signature: `value -- `
fn word_constant(state: &mut ForthState, code: &ByteCode, position: usize) -> error::Result<usize> {
    let value = state.pop()?;
    let name = binding_name(code, position)?;

    trace!("Defining constant '{}' = {}.", name, value);
    state.define(name, BindingKind::Constant(value))?;

    Ok(position + 2)
}

/// Bind the following identifier to a freshly allocated memory cell.
///
/// Signature: ` -- `
fn word_variable(state: &mut ForthState, code: &ByteCode, position: usize) -> error::Result<usize> {
    let name = binding_name(code, position)?;
    let cell = state.allocate_cell()?;

    trace!("Defining variable '{}' at cell {}.", name, cell);
    state.define(name, BindingKind::Variable(cell))?;

    Ok(position + 2)
}

/// Bind the following identifier to a function whose body starts right after the name.
///
/// The body is never executed at definition time.  Execution skips past the terminating
/// `;`, which is also how an unterminated definition is detected.
fn word_colon(state: &mut ForthState, code: &ByteCode, position: usize) -> error::Result<usize> {
    let name = binding_name(code, position)?;
    let terminator = find_required(code, position, None, Keyword::Semicolon)?;

    trace!("Defining function '{}' at position {}.", name, position + 2);
    state.define(name, BindingKind::Function(position + 2))?;

    Ok(terminator + 1)
}

/// Resolve an identifier against the dictionary and act on its binding.
///
/// Constants push their value and variables push their cell index.  A function pushes
/// the call site on the return stack and jumps to its body.  A native function invokes
/// the registered host callback synchronously, propagating any error it returns.
fn word_reference(state: &mut ForthState, name: &str, position: usize) -> error::Result<usize> {
    let kind = state
        .dictionary()
        .lookup(name)
        .ok_or_else(|| ForthError::UnknownWord {
            name: name.to_string(),
        })?
        .kind;

    match kind {
        BindingKind::Constant(value) => {
            state.push(value)?;
            Ok(position + 1)
        }

        BindingKind::Variable(cell) => {
            state.push(cell as i64)?;
            Ok(position + 1)
        }

        BindingKind::Function(body) => {
            state.return_push(ControlFrame::ReturnAddress(position))?;
            Ok(body)
        }

        BindingKind::Native(index) => {
            let handler = state.native(index)?;
            handler(state)?;
            Ok(position + 1)
        }
    }
}

/// Execute the closed sub-range `[start, end)` of a compiled program against a machine
/// state.
///
/// The program counter steps one token at a time and is reassigned directly by the
/// control flow words.  The evaluation runs to completion or to the first error, which
/// aborts the call and surfaces to the host.  An `end` past the end of the stream is a
/// caller error and is reported as such rather than silently truncating the run.
pub fn eval(
    state: &mut ForthState,
    code: &ByteCode,
    start: usize,
    end: usize,
) -> error::Result<()> {
    let mut pc = start;

    while pc < end {
        let token = code
            .token_at(pc)
            .ok_or(ForthError::PositionOutOfBounds { position: pc })?;

        match token {
            Token::Number(value) => state.push(*value)?,

            Token::Op(Keyword::Dup) => word_dup(state)?,
            Token::Op(Keyword::Drop) => word_drop(state)?,
            Token::Op(Keyword::Swap) => word_swap(state)?,
            Token::Op(Keyword::Over) => word_over(state)?,
            Token::Op(Keyword::Rot) => word_rot(state)?,

            Token::Op(Keyword::Dot) => word_dot(state)?,
            Token::Op(Keyword::Emit) => word_emit(state)?,
            Token::Op(Keyword::Cr) => word_cr(state)?,

            Token::Op(Keyword::Equal) => word_compare(state, |a, b| a == b)?,
            Token::Op(Keyword::Less) => word_compare(state, |a, b| a < b)?,
            Token::Op(Keyword::Greater) => word_compare(state, |a, b| a > b)?,
            Token::Op(Keyword::Invert) => word_invert(state)?,
            Token::Op(Keyword::And) => word_and(state)?,
            Token::Op(Keyword::Or) => word_or(state)?,

            Token::Op(Keyword::Plus) => word_math(state, i64::wrapping_add)?,
            Token::Op(Keyword::Minus) => word_math(state, i64::wrapping_sub)?,
            Token::Op(Keyword::Star) => word_math(state, i64::wrapping_mul)?,
            Token::Op(Keyword::Slash) => word_divide(state)?,

            Token::Op(Keyword::At) => word_at(state)?,
            Token::Op(Keyword::Store) => word_store(state)?,
            Token::Op(Keyword::Allot) => word_allot(state)?,
            Token::Op(Keyword::Index) => word_index(state)?,

            Token::Op(Keyword::DotString) => {
                pc = word_dot_string(state, code, pc)?;
                continue;
            }

            Token::Op(Keyword::If) => {
                pc = word_if(state, code, pc)?;
                continue;
            }

            Token::Op(Keyword::Do) => {
                pc = word_do(state, code, pc)?;
                continue;
            }

            Token::Op(Keyword::Loop) => {
                pc = word_loop(state, pc)?;
                continue;
            }

            Token::Op(Keyword::Begin) => {
                state.return_push(ControlFrame::BranchTarget(pc))?;
            }

            Token::Op(Keyword::Until) => {
                pc = word_until(state, pc)?;
                continue;
            }

            Token::Op(Keyword::Constant) => {
                pc = word_constant(state, code, pc)?;
                continue;
            }

            Token::Op(Keyword::Variable) => {
                pc = word_variable(state, code, pc)?;
                continue;
            }

            Token::Op(Keyword::Colon) => {
                pc = word_colon(state, code, pc)?;
                continue;
            }

            // Resume at the saved `then` position, ending the true arm.
            Token::Op(Keyword::Else) => {
                pc = state.pop_branch_target()?;
                continue;
            }

            // Return from a function call to the position after the call site.
            Token::Op(Keyword::Semicolon) => {
                pc = state.pop_return_address()? + 1;
                continue;
            }

            Token::Word(name) => {
                pc = word_reference(state, name, pc)?;
                continue;
            }

            // These only have meaning through the tokens that jump to or past them.
            Token::Op(Keyword::Then) | Token::Op(Keyword::Cells) | Token::Str(_) => {}
        }

        pc += 1;
    }

    Ok(())
}

impl ForthState {
    /// Run a whole compiled program against this state.
    pub fn run(&mut self, code: &ByteCode) -> error::Result<()> {
        eval(self, code, 0, code.len())
    }

    /// Run a previously registered function by name.
    ///
    /// Returns false when the name isn't bound to a function, including when it isn't
    /// bound at all.  The defining pass has to have executed first, a function that
    /// only exists in the program text isn't callable yet.
    pub fn run_function(&mut self, code: &ByteCode, name: &str) -> error::Result<bool> {
        let body = match self.dictionary().lookup(name).map(|binding| binding.kind) {
            Some(BindingKind::Function(body)) => body,
            _ => return Ok(false),
        };

        // The body starts right after the name token, so the terminator scan begins at
        // the name.
        let end = find_required(code, body.saturating_sub(1), None, Keyword::Semicolon)?;

        eval(self, code, body, end)?;

        Ok(true)
    }
}
