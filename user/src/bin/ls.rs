#![no_std]
#![no_main]

extern crate user_lib;

use user_lib::{close, open, read, write};

#[no_mangle]
fn main() -> i32 {
    let fd = open("/\0", 0);
    if fd < 0 {
        return -1;
    }
    let mut buf = [0u8; 128];
    loop {
        let n = read(fd as usize, &mut buf);
        if n <= 0 {
            break;
        }
        write(1, &buf[..n as usize]);
    }
    close(fd as usize);
    0
}
