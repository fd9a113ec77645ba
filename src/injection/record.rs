use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One mutation applied to a selected instruction.
pub enum MutationRecord {
    /// The instruction was removed from the executing code stream.
    Delete { address: u64 },
    /// An unconditional jump to `target` was inserted before the instruction.
    InsertBranch { address: u64, target: u64 },
}

impl MutationRecord {
    pub fn address(&self) -> u64 {
        match self {
            MutationRecord::Delete { address } => *address,
            MutationRecord::InsertBranch { address, .. } => *address,
        }
    }
}

impl fmt::Display for MutationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationRecord::Delete { address } => write!(f, "del {address:#x}"),
            MutationRecord::InsertBranch { address, target } => {
                write!(f, "ins {address:#x} {target:#x}")
            }
        }
    }
}
