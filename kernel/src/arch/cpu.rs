//! CSR access and the assembly entry points

use crate::task::TaskContext;
use core::arch::{asm, global_asm};
use riscv::register::mtvec::TrapMode;
use riscv::register::{scause, sie, stval, stvec};

global_asm!(include_str!("../trap/trap.S"));
global_asm!(include_str!("../task/switch.S"));

extern "C" {
    fn __alltraps();
    fn __restore();
    fn __switch(current_task_cx_ptr: *mut TaskContext, next_task_cx_ptr: *const TaskContext);
}

/// Current value of the `time` CSR
pub fn get_time() -> u64 {
    let time: u64;
    unsafe {
        asm!("rdtime {}", out(reg) time);
    }
    time
}

/// Install `token` as the active page table and flush the TLB
pub fn activate(token: usize) {
    unsafe {
        asm!("csrw satp, {}", in(reg) token);
        asm!("sfence.vma");
    }
}

/// Point `stvec` at `__alltraps` and mark the hart as running in the kernel
pub fn set_trap_entry() {
    unsafe {
        asm!("csrw sscratch, zero");
        stvec::write(__alltraps as usize, TrapMode::Direct);
    }
}

pub fn enable_timer_interrupt() {
    unsafe {
        sie::set_stimer();
    }
}

/// Raw `scause` and `stval` of the trap being handled
pub fn trap_cause() -> (usize, usize) {
    (scause::read().bits(), stval::read())
}

/// Address new kernel contexts return to
pub fn restore_entry() -> usize {
    __restore as usize
}

/// Save the callee-saved registers and satp into `current` and resume `next`.
///
/// # Safety
/// Both pointers must reference live `TaskContext`s and no `UPSafeCell`
/// guard may be held across the call.
pub unsafe fn switch(current: *mut TaskContext, next: *const TaskContext) {
    __switch(current, next);
}
