#![no_std]

#[macro_use]
pub mod console;
mod lang_items;
mod syscall;

use syscall::*;

/// `open` flag: create the file when it does not exist
pub const O_CREATE: u32 = 0x200;

/// Every program defines `#[no_mangle] fn main() -> i32`
#[no_mangle]
#[link_section = ".text.entry"]
pub extern "C" fn _start() -> ! {
    extern "Rust" {
        fn main() -> i32;
    }
    exit(unsafe { main() })
}

pub fn exit(exit_code: i32) -> ! {
    sys_exit(exit_code)
}

pub fn putchar(ch: u8) -> isize {
    sys_putchar(ch)
}

pub fn getpid() -> isize {
    sys_getpid()
}

pub fn fork() -> isize {
    sys_fork()
}

/// Replace this program; `path` must end with `\0`
pub fn exec(path: &str) -> isize {
    sys_exec(path)
}

/// Pid of a reaped child, or -1 when there are no children
pub fn wait() -> isize {
    sys_wait()
}

/// Open `path` (ending with `\0`); `/\0` opens the directory listing
pub fn open(path: &str, flags: u32) -> isize {
    sys_open(path, flags)
}

pub fn close(fd: usize) -> isize {
    sys_close(fd)
}

pub fn read(fd: usize, buf: &mut [u8]) -> isize {
    sys_read(fd, buf)
}

pub fn write(fd: usize, buf: &[u8]) -> isize {
    sys_write(fd, buf)
}

pub fn yield_() -> isize {
    sys_yield()
}

/// Block until the console has a byte
pub fn getchar() -> u8 {
    let mut c = [0u8; 1];
    read(0, &mut c);
    c[0]
}
