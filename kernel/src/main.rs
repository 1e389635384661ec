//! Boot entry of the Ember kernel
//!
//! OpenSBI jumps to `_start` (in `entry.S`) at `0x80200000` in S-mode;
//! `_start` sets up the boot stack and calls `rust_main`.

#![no_std]
#![no_main]

use core::arch::global_asm;

global_asm!(include_str!("entry.S"));

#[no_mangle]
pub fn rust_main() -> ! {
    ember::kernel_main()
}
