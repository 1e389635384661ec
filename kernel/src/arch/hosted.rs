//! In-memory platform for host builds.
//!
//! Console and timer state is per thread so parallel tests do not observe
//! each other's output.

extern crate std;

use crate::task::TaskContext;
use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::vec::Vec;

std::thread_local! {
    static OUTPUT: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
    static INPUT: RefCell<VecDeque<u8>> = const { RefCell::new(VecDeque::new()) };
    static TIMER: Cell<Option<u64>> = const { Cell::new(None) };
    static TIME: Cell<u64> = const { Cell::new(0) };
    static ACTIVE_TOKEN: Cell<usize> = const { Cell::new(0) };
}

pub fn console_putchar(ch: u8) {
    OUTPUT.with(|out| out.borrow_mut().push(ch));
}

pub fn console_getchar() -> Option<u8> {
    INPUT.with(|input| input.borrow_mut().pop_front())
}

pub fn set_timer(stime_value: u64) {
    TIMER.with(|timer| timer.set(Some(stime_value)));
}

pub fn get_time() -> u64 {
    TIME.with(|time| time.get())
}

pub fn shutdown() -> ! {
    panic!("machine shutdown requested");
}

pub fn activate(token: usize) {
    ACTIVE_TOKEN.with(|active| active.set(token));
}

pub fn set_trap_entry() {}

pub fn enable_timer_interrupt() {}

pub fn trap_cause() -> (usize, usize) {
    panic!("no trap is being handled on the host");
}

pub fn restore_entry() -> usize {
    0
}

/// # Safety
/// Never returns normally on the host.
pub unsafe fn switch(_current: *mut TaskContext, _next: *const TaskContext) {
    panic!("kernel stacks cannot be switched on the host");
}

/// Drain everything written to the console by the current thread
pub fn take_output() -> Vec<u8> {
    OUTPUT.with(|out| core::mem::take(&mut *out.borrow_mut()))
}

/// Queue bytes for `console_getchar`
pub fn push_input(bytes: &[u8]) {
    INPUT.with(|input| input.borrow_mut().extend(bytes.iter().copied()));
}

/// Deadline passed to the last `set_timer`
pub fn last_timer() -> Option<u64> {
    TIMER.with(|timer| timer.get())
}

/// Move the fake `time` CSR forward
pub fn advance_time(ticks: u64) {
    TIME.with(|time| time.set(time.get() + ticks));
}

/// Token passed to the last `activate`
pub fn active_token() -> usize {
    ACTIVE_TOKEN.with(|active| active.get())
}
