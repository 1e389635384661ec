#![no_std]
#![no_main]

#[macro_use]
extern crate user_lib;

use user_lib::getpid;

#[no_mangle]
fn main() -> i32 {
    println!("Hello, world from pid {}!", getpid());
    0
}
