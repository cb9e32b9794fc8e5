use crate::runtime::error::{self, ForthError};
use std::fmt::{self, Display, Formatter};

/// What a dictionary name is bound to, along with the meaning of its payload.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BindingKind {
    /// A literal value pushed when the name is referenced.
    Constant(i64),

    /// The index of the memory cell backing a variable.  Referencing the name pushes
    /// the index, the script dereferences it explicitly with `@` or stores with `!`.
    Variable(usize),

    /// The instruction stream position of a function body's first token.
    Function(usize),

    /// The index of a host supplied callback in the native function table.
    Native(usize),
}

/// One entry in the dictionary.  The name text is owned by the entry itself, so a
/// binding never outlives or dangles into the program that defined it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Binding {
    /// The name the entry is looked up by.
    pub name: String,

    /// What the name is bound to.
    pub kind: BindingKind,
}

/// The interpreter's symbol table.
///
/// The dictionary is append-only and names are not required to be unique.  Lookup
/// returns the first matching entry in insertion order, so a later binding of the same
/// name never shadows an earlier one.
pub struct Dictionary {
    entries: Vec<Binding>,
    capacity: usize,
}

impl Dictionary {
    /// Create a new empty dictionary with a fixed capacity.
    pub fn new(capacity: usize) -> Dictionary {
        Dictionary {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// How many bindings have been defined?
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the dictionary empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a new binding.  Errors out if the dictionary's fixed capacity has been
    /// reached.
    pub fn insert(&mut self, name: String, kind: BindingKind) -> error::Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(ForthError::DictionaryFull);
        }

        self.entries.push(Binding { name, kind });

        Ok(())
    }

    /// Find a binding by name.  The first entry defined under the name wins.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

/// Pretty print the dictionary in insertion order for debugging.
impl Display for Dictionary {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "{} of {} bindings defined.", self.len(), self.capacity)?;

        for entry in self.entries.iter() {
            writeln!(f, "  {}  {:?}", entry.name, entry.kind)?;
        }

        Ok(())
    }
}
