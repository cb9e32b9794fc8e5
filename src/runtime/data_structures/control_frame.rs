use std::fmt::{self, Display, Formatter};

/// One frame on the interpreter's return stack.
///
/// The return stack is shared by three unrelated control structures: subroutine calls,
/// branches, and counted loops.  Well formed programs push and pop them in strict LIFO
/// nesting order.  Tagging each frame lets a malformed program produce a detectable
/// mismatch instead of silently misinterpreting a raw position as a loop index or vice
/// versa.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ControlFrame {
    /// The position of a function call site.  Popped by `;` to resume execution after
    /// the call.
    ReturnAddress(usize),

    /// A position saved for a later jump.  Pushed by `if` for its true arm to resume at
    /// `then`, and by `begin` for `until` to jump back to.
    BranchTarget(usize),

    /// The bookkeeping for one active counted loop.
    LoopFrame {
        /// The position of the `do` token that opened the loop.
        do_position: usize,

        /// The loop's exclusive end bound.
        limit: i64,

        /// The loop's current index.
        index: i64,
    },
}

impl ControlFrame {
    /// A short name for the frame's kind, used in mismatch error reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ControlFrame::ReturnAddress(_) => "return address",
            ControlFrame::BranchTarget(_) => "branch target",
            ControlFrame::LoopFrame { .. } => "loop frame",
        }
    }
}

impl Display for ControlFrame {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ControlFrame::ReturnAddress(position) => write!(f, "return -> {}", position),
            ControlFrame::BranchTarget(position) => write!(f, "branch -> {}", position),
            ControlFrame::LoopFrame {
                do_position,
                limit,
                index,
            } => write!(f, "loop at {} ({} of {})", do_position, index, limit),
        }
    }
}
