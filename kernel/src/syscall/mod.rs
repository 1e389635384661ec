//! System call dispatch
//!
//! The id arrives in `a7`, up to three arguments in `a0..a2`, and the result
//! goes back in `a0`. Failures are reported as `-1`.

mod fs;
mod process;

pub use fs::*;
pub use process::*;

use crate::error::KernelResult;

pub const SYSCALL_EXIT: usize = 0;
pub const SYSCALL_PUTCHAR: usize = 1;
pub const SYSCALL_GETPID: usize = 2;
pub const SYSCALL_FORK: usize = 3;
pub const SYSCALL_EXEC: usize = 4;
pub const SYSCALL_WAIT: usize = 5;
pub const SYSCALL_OPEN: usize = 6;
pub const SYSCALL_CLOSE: usize = 7;
pub const SYSCALL_READ: usize = 8;
pub const SYSCALL_WRITE: usize = 9;
pub const SYSCALL_YIELD: usize = 10;

/// Handle system call `syscall_id`
pub fn syscall(syscall_id: usize, args: [usize; 3]) -> isize {
    log::trace!("syscall {} {:x?}", syscall_id, args);
    match syscall_id {
        SYSCALL_EXIT => sys_exit(args[0] as i32),
        SYSCALL_PUTCHAR => sys_putchar(args[0]),
        SYSCALL_GETPID => sys_getpid(),
        SYSCALL_FORK => sys_fork(),
        SYSCALL_EXEC => sys_exec(args[0]),
        SYSCALL_WAIT => sys_wait(),
        SYSCALL_OPEN => sys_open(args[0], args[1] as u32),
        SYSCALL_CLOSE => sys_close(args[0]),
        SYSCALL_READ => sys_read(args[0], args[1], args[2]),
        SYSCALL_WRITE => sys_write(args[0], args[1], args[2]),
        SYSCALL_YIELD => sys_yield(),
        _ => {
            log::warn!("unsupported syscall id {}", syscall_id);
            -1
        }
    }
}

/// Collapse a handler result into the value returned in `a0`
fn to_ret(result: KernelResult<usize>) -> isize {
    match result {
        Ok(value) => value as isize,
        Err(err) => {
            log::debug!("syscall failed: {}", err);
            -1
        }
    }
}
