#![no_std]
#![no_main]

#[macro_use]
extern crate user_lib;

use user_lib::{exec, exit, fork, wait};

#[no_mangle]
fn main() -> i32 {
    if fork() == 0 {
        exec("shell\0");
        println!("[initproc] cannot exec shell");
        exit(-1);
    }
    // Reap the shell and every orphan handed to us
    loop {
        let pid = wait();
        if pid < 0 {
            break;
        }
        println!("[initproc] reaped pid {}", pid);
    }
    println!("[initproc] no children left, bye");
    0
}
