#![no_std]
#![no_main]

#[macro_use]
extern crate user_lib;

use user_lib::{exit, fork, getpid, wait};

const MAX_CHILD: usize = 8;

#[no_mangle]
fn main() -> i32 {
    for i in 0..MAX_CHILD {
        let pid = fork();
        if pid == 0 {
            println!("I am child {} (pid {})", i, getpid());
            exit(0);
        }
        assert!(pid > 0, "fork failed");
    }
    for _ in 0..MAX_CHILD {
        assert!(wait() > 0, "wait stopped early");
    }
    assert_eq!(wait(), -1);
    println!("forktest passed!");
    0
}
