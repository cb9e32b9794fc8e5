use crate::runtime::{
    data_structures::{
        control_frame::ControlFrame,
        dictionary::{BindingKind, Dictionary},
    },
    error::{self, ForthError},
};
use log::debug;
use std::{
    io::{Write, stdout},
    rc::Rc,
};

/// A host supplied callback exposed to scripts as a callable dictionary entry.  The
/// callback runs synchronously on the evaluator's call stack and may push and pop the
/// data stack freely, or even re-enter the evaluator with the same state.  A failure
/// propagates through the evaluator to the host.
pub type NativeHandler = Rc<dyn Fn(&mut ForthState) -> error::Result<()>>;

/// The mutable machine state a program executes against.
///
/// A state owns five fixed-capacity regions: the data stack, the return stack, the
/// dictionary, the linear integer memory backing variables, and the native function
/// table.  Exceeding any region's capacity is a reported error, never silent
/// corruption.
///
/// States are fully independent of each other.  One state must not be shared across
/// threads, but separate states may be driven from separate threads freely.
pub struct ForthState {
    // Data segment.
    data_stack: Vec<i64>,
    data_capacity: usize,

    // Return segment, shared by calls, branches, and loop frames.
    return_stack: Vec<ControlFrame>,
    return_capacity: usize,

    // Dictionary segment.
    dictionary: Dictionary,

    // Memory segment.  The high water mark allocates cells for variables and `allot`.
    memory: Vec<i64>,
    high_water: usize,

    // Host supplied native functions.
    natives: Vec<NativeHandler>,
    native_capacity: usize,

    // Where `.` `."` `emit` and `cr` write their output.
    output: Box<dyn Write>,
}

impl Default for ForthState {
    /// Create a state with the default capacities: 50 data stack slots, 1000 memory
    /// cells, 40 return stack slots, 10 dictionary entries, and 10 native functions.
    fn default() -> ForthState {
        ForthState::new(50, 1000, 40, 10, 10)
    }
}

impl ForthState {
    /// Create a new state with explicit capacities for all five regions.
    pub fn new(
        data_capacity: usize,
        memory_capacity: usize,
        return_capacity: usize,
        dictionary_capacity: usize,
        native_capacity: usize,
    ) -> ForthState {
        ForthState {
            data_stack: Vec::with_capacity(data_capacity),
            data_capacity,
            return_stack: Vec::with_capacity(return_capacity),
            return_capacity,
            dictionary: Dictionary::new(dictionary_capacity),
            memory: vec![0; memory_capacity],
            high_water: 0,
            natives: Vec::with_capacity(native_capacity),
            native_capacity,
            output: Box::new(stdout()),
        }
    }

    /// Redirect the interpreter's print output.  Defaults to stdout.
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    /// The sink that print operations write to.
    pub fn output_mut(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    /// Push a value onto the data stack.
    pub fn push(&mut self, value: i64) -> error::Result<()> {
        if self.data_stack.len() >= self.data_capacity {
            return Err(ForthError::StackOverflow);
        }

        self.data_stack.push(value);

        Ok(())
    }

    /// Pop the top value from the data stack.
    pub fn pop(&mut self) -> error::Result<i64> {
        self.data_stack.pop().ok_or(ForthError::StackUnderflow)
    }

    /// The current depth of the data stack.
    pub fn depth(&self) -> usize {
        self.data_stack.len()
    }

    /// Examine the full data stack, bottom first.
    pub fn stack(&self) -> &[i64] {
        &self.data_stack
    }

    /// Push a control frame onto the return stack.
    pub fn return_push(&mut self, frame: ControlFrame) -> error::Result<()> {
        if self.return_stack.len() >= self.return_capacity {
            return Err(ForthError::ReturnStackOverflow);
        }

        self.return_stack.push(frame);

        Ok(())
    }

    /// Pop the top control frame from the return stack, whatever its kind.
    pub fn return_pop(&mut self) -> error::Result<ControlFrame> {
        self.return_stack
            .pop()
            .ok_or(ForthError::ReturnStackUnderflow)
    }

    /// Pop a return address, erroring out if the top frame is a different kind.
    pub fn pop_return_address(&mut self) -> error::Result<usize> {
        match self.return_pop()? {
            ControlFrame::ReturnAddress(position) => Ok(position),
            other => Err(ForthError::ReturnStackMismatch {
                expected: "return address",
                found: other.kind_name(),
            }),
        }
    }

    /// Pop a branch target, erroring out if the top frame is a different kind.
    pub fn pop_branch_target(&mut self) -> error::Result<usize> {
        match self.return_pop()? {
            ControlFrame::BranchTarget(position) => Ok(position),
            other => Err(ForthError::ReturnStackMismatch {
                expected: "branch target",
                found: other.kind_name(),
            }),
        }
    }

    /// Pop a loop frame, erroring out if the top frame is a different kind.
    pub fn pop_loop_frame(&mut self) -> error::Result<(usize, i64, i64)> {
        match self.return_pop()? {
            ControlFrame::LoopFrame {
                do_position,
                limit,
                index,
            } => Ok((do_position, limit, index)),
            other => Err(ForthError::ReturnStackMismatch {
                expected: "loop frame",
                found: other.kind_name(),
            }),
        }
    }

    /// Read the innermost loop's current index without consuming its frame.  Scans down
    /// from the top so that the loop is found even under an intervening call or branch
    /// frame.
    pub fn loop_index(&self) -> error::Result<i64> {
        for frame in self.return_stack.iter().rev() {
            if let ControlFrame::LoopFrame { index, .. } = frame {
                return Ok(*index);
            }
        }

        Err(ForthError::ReturnStackMismatch {
            expected: "loop frame",
            found: "no active loop",
        })
    }

    /// Read the memory cell at the given address.
    pub fn memory_read(&self, address: i64) -> error::Result<i64> {
        let cell = self.checked_address(address)?;
        Ok(self.memory[cell])
    }

    /// Store a value into the memory cell at the given address.
    pub fn memory_write(&mut self, address: i64, value: i64) -> error::Result<()> {
        let cell = self.checked_address(address)?;
        self.memory[cell] = value;

        Ok(())
    }

    /// Allocate one cell from the high water mark, as `variable` does.
    pub fn allocate_cell(&mut self) -> error::Result<usize> {
        if self.high_water >= self.memory.len() {
            return Err(ForthError::MemoryOutOfBounds {
                address: self.high_water as i64,
            });
        }

        let cell = self.high_water;
        self.high_water += 1;

        Ok(cell)
    }

    /// Move the high water mark by the given offset, as `allot` does.  The mark can
    /// never leave the memory region.
    pub fn allot(&mut self, offset: i64) -> error::Result<()> {
        let target = (self.high_water as i64)
            .checked_add(offset)
            .ok_or(ForthError::MemoryOutOfBounds { address: offset })?;

        if target < 0 || target > self.memory.len() as i64 {
            return Err(ForthError::MemoryOutOfBounds { address: target });
        }

        self.high_water = target as usize;

        Ok(())
    }

    /// The current memory high water mark, in cells.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// The state's dictionary of named bindings.
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Append a binding to the dictionary.
    pub fn define(&mut self, name: String, kind: BindingKind) -> error::Result<()> {
        self.dictionary.insert(name, kind)
    }

    /// Register a host visible constant, exactly as a script level `constant` would.
    pub fn define_constant(&mut self, name: &str, value: i64) -> error::Result<()> {
        debug!("Registering host constant '{}' = {}.", name, value);
        self.define(name.to_string(), BindingKind::Constant(value))
    }

    /// Register a native function under a name.  The handler is appended to the native
    /// table and the name bound in the dictionary, exactly as a script level definition
    /// would be.
    pub fn define_native(&mut self, name: &str, handler: NativeHandler) -> error::Result<()> {
        if self.natives.len() >= self.native_capacity {
            return Err(ForthError::NativeTableFull);
        }

        debug!("Registering native function '{}'.", name);

        let index = self.natives.len();
        self.define(name.to_string(), BindingKind::Native(index))?;
        self.natives.push(handler);

        Ok(())
    }

    /// Get the native handler at the given table index.  The handler is cloned out so
    /// that it can be invoked with the state borrowed mutably.
    pub fn native(&self, index: usize) -> error::Result<NativeHandler> {
        self.natives
            .get(index)
            .cloned()
            .ok_or(ForthError::MemoryOutOfBounds {
                address: index as i64,
            })
    }

    /// Validate a script supplied address against the memory region.
    fn checked_address(&self, address: i64) -> error::Result<usize> {
        if address < 0 || address as usize >= self.memory.len() {
            return Err(ForthError::MemoryOutOfBounds { address });
        }

        Ok(address as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_data_stack_is_lifo() {
        let mut state = ForthState::default();

        for value in [1, 2, 3] {
            state.push(value).unwrap();
        }

        assert_eq!(state.pop().unwrap(), 3);
        assert_eq!(state.pop().unwrap(), 2);
        assert_eq!(state.pop().unwrap(), 1);
        assert!(matches!(state.pop(), Err(ForthError::StackUnderflow)));
    }

    #[test]
    fn pushing_past_capacity_overflows() {
        let mut state = ForthState::new(2, 10, 4, 4, 0);

        state.push(1).unwrap();
        state.push(2).unwrap();

        assert!(matches!(state.push(3), Err(ForthError::StackOverflow)));
    }

    #[test]
    fn mismatched_return_frames_are_detected() {
        let mut state = ForthState::default();

        state
            .return_push(ControlFrame::BranchTarget(7))
            .unwrap();

        assert!(matches!(
            state.pop_return_address(),
            Err(ForthError::ReturnStackMismatch { .. })
        ));
    }

    #[test]
    fn loop_index_reads_through_other_frames() {
        let mut state = ForthState::default();

        state
            .return_push(ControlFrame::LoopFrame {
                do_position: 3,
                limit: 10,
                index: 4,
            })
            .unwrap();
        state.return_push(ControlFrame::ReturnAddress(9)).unwrap();

        assert_eq!(state.loop_index().unwrap(), 4);
        assert_eq!(state.pop_return_address().unwrap(), 9);
    }

    #[test]
    fn memory_accesses_are_bounds_checked() {
        let mut state = ForthState::new(8, 4, 4, 4, 0);

        state.memory_write(3, 42).unwrap();
        assert_eq!(state.memory_read(3).unwrap(), 42);

        assert!(matches!(
            state.memory_read(4),
            Err(ForthError::MemoryOutOfBounds { address: 4 })
        ));
        assert!(matches!(
            state.memory_write(-1, 0),
            Err(ForthError::MemoryOutOfBounds { address: -1 })
        ));
    }

    #[test]
    fn allot_cannot_leave_the_memory_region() {
        let mut state = ForthState::new(8, 4, 4, 4, 0);

        state.allot(4).unwrap();
        assert_eq!(state.high_water(), 4);

        assert!(state.allot(1).is_err());
        assert!(state.allot(-5).is_err());

        state.allot(-4).unwrap();
        assert_eq!(state.high_water(), 0);
    }

    #[test]
    fn allot_rejects_offsets_past_the_integer_range() {
        let mut state = ForthState::new(8, 4, 4, 4, 0);

        state.allot(2).unwrap();

        assert!(matches!(
            state.allot(i64::MAX),
            Err(ForthError::MemoryOutOfBounds { .. })
        ));
        assert_eq!(state.high_water(), 2);
    }

    #[test]
    fn allocated_cells_never_alias() {
        let mut state = ForthState::new(8, 4, 4, 4, 0);

        let first = state.allocate_cell().unwrap();
        let second = state.allocate_cell().unwrap();

        assert_ne!(first, second);
    }
}
