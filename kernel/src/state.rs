//! The kernel's single piece of global state
//!
//! Everything mutable lives in one `KernelState`. Bare-metal code reaches it
//! through `kernel()`; tests build their own instance over a host arena.

use crate::fs::RamFs;
use crate::mm::{BuddyAllocator, KernelLayout, MemorySet};
use crate::sync::UPSafeCell;
use crate::task::{Pid, PidAllocator, Processor, TaskManager};
use core::cell::RefMut;
use spin::Once;

pub struct KernelState {
    pub frames: BuddyAllocator,
    pub layout: KernelLayout,
    pub kernel_space: MemorySet,
    pub pids: PidAllocator,
    pub tasks: TaskManager,
    pub processor: Processor,
    pub fs: RamFs,
    /// Adopts orphans; its exit stops the machine
    pub root: Option<Pid>,
}

impl KernelState {
    /// Build the kernel address space inside `frames`; nothing is activated
    pub fn new(mut frames: BuddyAllocator, layout: KernelLayout, fs: RamFs) -> Self {
        let kernel_space = MemorySet::new_kernel(&mut frames, &layout);
        Self {
            frames,
            layout,
            kernel_space,
            pids: PidAllocator::new(),
            tasks: TaskManager::new(),
            processor: Processor::new(),
            fs,
            root: None,
        }
    }
}

static KERNEL: Once<UPSafeCell<KernelState>> = Once::new();

/// Install the global state; later calls are ignored
pub fn install(state: KernelState) {
    KERNEL.call_once(|| unsafe { UPSafeCell::new(state) });
}

/// Exclusive borrow of the global state.
///
/// Drop it before any context switch.
pub fn kernel() -> RefMut<'static, KernelState> {
    match KERNEL.get() {
        Some(cell) => cell.exclusive_access(),
        None => panic!("kernel state used before install"),
    }
}
