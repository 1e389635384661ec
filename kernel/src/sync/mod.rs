//! Synchronization primitives for the single hart

mod up;

pub use up::UPSafeCell;
