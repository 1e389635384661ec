#![no_std]
#![no_main]

#[macro_use]
extern crate user_lib;

use user_lib::{exec, exit, fork, getchar, putchar, wait};

const LF: u8 = 0x0a;
const CR: u8 = 0x0d;
const DL: u8 = 0x7f;
const BS: u8 = 0x08;

const LINE_MAX: usize = 64;

#[no_mangle]
fn main() -> i32 {
    println!("Ember shell. Run a program by name, `exit` to quit.");
    let mut line = [0u8; LINE_MAX + 1];
    let mut len = 0;
    print!(">> ");
    loop {
        let c = getchar();
        match c {
            LF | CR => {
                println!("");
                if &line[..len] == b"exit" {
                    return 0;
                }
                if len > 0 {
                    run(&mut line, len);
                }
                len = 0;
                print!(">> ");
            }
            BS | DL => {
                if len > 0 {
                    putchar(BS);
                    putchar(b' ');
                    putchar(BS);
                    len -= 1;
                }
            }
            _ if len < LINE_MAX => {
                putchar(c);
                line[len] = c;
                len += 1;
            }
            _ => {}
        }
    }
}

fn run(line: &mut [u8], len: usize) {
    line[len] = 0;
    let Ok(path) = core::str::from_utf8(&line[..=len]) else {
        println!("not a program name");
        return;
    };
    let pid = fork();
    if pid == 0 {
        if exec(path) == -1 {
            println!("{}: command not found", &path[..len]);
            exit(-1);
        }
        unreachable!();
    }
    let reaped = wait();
    println!("[shell] pid {} finished (reaped {})", pid, reaped);
}
