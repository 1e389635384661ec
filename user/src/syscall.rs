//! Raw system calls: id in `a7`, arguments in `a0..a2`, result in `a0`

use core::arch::asm;

const SYSCALL_EXIT: usize = 0;
const SYSCALL_PUTCHAR: usize = 1;
const SYSCALL_GETPID: usize = 2;
const SYSCALL_FORK: usize = 3;
const SYSCALL_EXEC: usize = 4;
const SYSCALL_WAIT: usize = 5;
const SYSCALL_OPEN: usize = 6;
const SYSCALL_CLOSE: usize = 7;
const SYSCALL_READ: usize = 8;
const SYSCALL_WRITE: usize = 9;
const SYSCALL_YIELD: usize = 10;

#[inline(always)]
fn syscall(id: usize, args: [usize; 3]) -> isize {
    let mut ret: isize;
    unsafe {
        asm!(
            "ecall",
            inlateout("a0") args[0] => ret,
            in("a1") args[1],
            in("a2") args[2],
            in("a7") id,
        );
    }
    ret
}

pub fn sys_exit(exit_code: i32) -> ! {
    syscall(SYSCALL_EXIT, [exit_code as usize, 0, 0]);
    unreachable!("sys_exit returned")
}

pub fn sys_putchar(ch: u8) -> isize {
    syscall(SYSCALL_PUTCHAR, [ch as usize, 0, 0])
}

pub fn sys_getpid() -> isize {
    syscall(SYSCALL_GETPID, [0; 3])
}

pub fn sys_fork() -> isize {
    syscall(SYSCALL_FORK, [0; 3])
}

/// `path` must end with a NUL byte
pub fn sys_exec(path: &str) -> isize {
    syscall(SYSCALL_EXEC, [path.as_ptr() as usize, 0, 0])
}

pub fn sys_wait() -> isize {
    syscall(SYSCALL_WAIT, [0; 3])
}

/// `path` must end with a NUL byte
pub fn sys_open(path: &str, flags: u32) -> isize {
    syscall(SYSCALL_OPEN, [path.as_ptr() as usize, flags as usize, 0])
}

pub fn sys_close(fd: usize) -> isize {
    syscall(SYSCALL_CLOSE, [fd, 0, 0])
}

pub fn sys_read(fd: usize, buf: &mut [u8]) -> isize {
    syscall(SYSCALL_READ, [fd, buf.as_mut_ptr() as usize, buf.len()])
}

pub fn sys_write(fd: usize, buf: &[u8]) -> isize {
    syscall(SYSCALL_WRITE, [fd, buf.as_ptr() as usize, buf.len()])
}

pub fn sys_yield() -> isize {
    syscall(SYSCALL_YIELD, [0; 3])
}
