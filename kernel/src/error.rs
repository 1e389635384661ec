//! Recoverable kernel errors
//!
//! Conditions that indicate a broken kernel invariant (double map, unmap of
//! an absent page, unknown trap) are not represented here; they panic.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The frame allocator has no block large enough
    OutOfMemory,
    /// Every pid in the bitmap is taken
    PidExhausted,
    /// A path did not resolve to a file
    NotFound,
    /// The descriptor is closed or out of range
    BadFileDescriptor,
    /// A user pointer does not translate in the caller's address space
    BadAddress,
    /// A per-task operation ran with no task on the processor
    NoCurrentTask,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::OutOfMemory => write!(f, "out of physical memory"),
            KernelError::PidExhausted => write!(f, "no free pid"),
            KernelError::NotFound => write!(f, "no such file"),
            KernelError::BadFileDescriptor => write!(f, "bad file descriptor"),
            KernelError::BadAddress => write!(f, "bad user address"),
            KernelError::NoCurrentTask => write!(f, "no current task"),
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
