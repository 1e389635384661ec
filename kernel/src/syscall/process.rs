//! Process management syscalls

use super::to_ret;
use crate::config::MAX_PATH_LEN;
use crate::error::KernelResult;
use crate::state::{kernel, KernelState};
use crate::task::{exit_current_and_run_next, suspend_current_and_run_next, WaitOutcome};

/// Task exits and submits an exit code
pub fn sys_exit(exit_code: i32) -> ! {
    exit_current_and_run_next(exit_code)
}

/// Current task gives up resources for other tasks
pub fn sys_yield() -> isize {
    suspend_current_and_run_next();
    0
}

pub fn sys_getpid() -> isize {
    to_ret(kernel().current_pid())
}

pub fn sys_fork() -> isize {
    let mut state = kernel();
    let result = state.current_pid().and_then(|pid| state.fork(pid));
    to_ret(result)
}

fn exec_current(state: &mut KernelState, path: usize) -> KernelResult<usize> {
    let pid = state.current_pid()?;
    let path = state
        .current_task()?
        .memory_set
        .page_table()
        .translated_str(path, MAX_PATH_LEN)?;
    state.exec(pid, &path)?;
    Ok(0)
}

/// Replace the current image; `path` is a NUL-terminated user string
pub fn sys_exec(path: usize) -> isize {
    to_ret(exec_current(&mut kernel(), path))
}

/// Reap an exited child, yielding while the children are still running
pub fn sys_wait() -> isize {
    loop {
        let outcome = {
            let mut state = kernel();
            state.current_pid().and_then(|pid| state.wait(pid))
        };
        match outcome {
            Ok(WaitOutcome::Reaped { pid, exit_code }) => {
                log::debug!("reaped pid {} (exit code {})", pid, exit_code);
                return pid as isize;
            }
            Ok(WaitOutcome::Pending) => suspend_current_and_run_next(),
            Ok(WaitOutcome::NoChild) => return -1,
            Err(err) => return to_ret(Err(err)),
        }
    }
}
