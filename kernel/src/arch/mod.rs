//! Platform access
//!
//! The kernel proper only talks to the machine through the functions
//! re-exported here. On bare metal they are SBI calls, CSR writes and the
//! context-switch assembly; on any hosted target they are in-memory stand-ins
//! so the allocator, paging and process logic can be unit tested.

#[cfg(target_os = "none")]
mod cpu;
#[cfg(target_os = "none")]
mod sbi;

#[cfg(target_os = "none")]
pub use cpu::*;
#[cfg(target_os = "none")]
pub use sbi::*;

#[cfg(not(target_os = "none"))]
mod hosted;

#[cfg(not(target_os = "none"))]
pub use hosted::*;
