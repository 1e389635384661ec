#![no_std]
#![no_main]

#[macro_use]
extern crate user_lib;

use user_lib::{close, open, read, write, O_CREATE};

#[no_mangle]
fn main() -> i32 {
    let text = b"Hello, ramfs!";
    let fd = open("filea\0", O_CREATE);
    assert!(fd >= 2, "open for write failed");
    write(fd as usize, text);
    close(fd as usize);

    let fd = open("filea\0", 0);
    assert!(fd >= 2, "open for read failed");
    let mut buf = [0u8; 32];
    let n = read(fd as usize, &mut buf) as usize;
    close(fd as usize);
    assert_eq!(&buf[..n], &text[..]);

    assert_eq!(open("no-such-file\0", 0), -1);
    println!("filetest passed!");
    0
}
