//! Task (process) management module
//!
//! The bookkeeping (`KernelState` methods in `process` and `scheduler`) is
//! plain data manipulation. The functions here glue it to `__switch`: each
//! one finishes with the state borrow dropped before control leaves the
//! current kernel stack.

mod context;
mod manager;
mod pid;
mod process;
mod scheduler;
mod task;

pub use context::TaskContext;
pub use manager::TaskManager;
pub use pid::{KernelStack, Pid, PidAllocator};
pub use process::{ExitOutcome, WaitOutcome};
pub use scheduler::Processor;
pub use task::{TaskControlBlock, TaskStatus};

use crate::arch;
use crate::state::kernel;

/// Idle loop: hand the processor to ready tasks until none is left
pub fn run_tasks() -> ! {
    loop {
        let mut state = kernel();
        let Some(next) = state.schedule_next() else {
            drop(state);
            log::info!("no ready task left, shutting down");
            arch::shutdown();
        };
        let idle_task_cx_ptr = state.processor.idle_task_cx_ptr();
        let next_task_cx_ptr = state.task_cx_ptr(next);
        drop(state);
        unsafe {
            arch::switch(idle_task_cx_ptr, next_task_cx_ptr);
        }
    }
}

/// Give the processor back to the idle loop, saving the current context
fn schedule(switched_task_cx_ptr: *mut TaskContext) {
    let idle_task_cx_ptr = kernel().processor.idle_task_cx_ptr();
    unsafe {
        arch::switch(switched_task_cx_ptr, idle_task_cx_ptr);
    }
}

/// Preempt or yield: the current task goes to the tail of the ready queue
pub fn suspend_current_and_run_next() {
    let mut state = kernel();
    let pid = match state.suspend_current() {
        Ok(pid) => pid,
        Err(err) => panic!("suspend: {}", err),
    };
    let task_cx_ptr = state.task_cx_ptr(pid);
    drop(state);
    schedule(task_cx_ptr);
}

/// Exit the current task and never come back to it
pub fn exit_current_and_run_next(exit_code: i32) -> ! {
    let mut state = kernel();
    let pid = match state.current_pid() {
        Ok(pid) => pid,
        Err(err) => panic!("exit: {}", err),
    };
    if state.exit(pid, exit_code) == ExitOutcome::Shutdown {
        drop(state);
        arch::shutdown();
    }
    let task_cx_ptr = state.task_cx_ptr(pid);
    drop(state);
    schedule(task_cx_ptr);
    unreachable!("exited task pid {} was scheduled again", pid);
}
