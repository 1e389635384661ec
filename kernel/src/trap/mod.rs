//! Interrupt and trap handling module
//!
//! `__alltraps` saves a `TrapContext` on the kernel stack and calls
//! `trap_handler`, which dispatches on the cause:
//! - environment call from U-mode: system call, result in `a0`
//! - breakpoint: step over the `ebreak` / `c.ebreak`
//! - supervisor timer: rearm and preempt the running task
//!
//! Anything else is fatal.

mod context;
pub mod timer;

pub use context::{TrapContext, SSTATUS_SPIE, SSTATUS_SPP};

use crate::arch;
use crate::error::KernelResult;
use crate::state::{kernel, KernelState};
use crate::syscall::syscall;
use crate::task::suspend_current_and_run_next;

/// Top bit of `scause`: set for interrupts, clear for exceptions
const INTERRUPT_BIT: usize = 1 << (usize::BITS - 1);

const EXCEPTION_BREAKPOINT: usize = 3;
const EXCEPTION_USER_ENV_CALL: usize = 8;
const INTERRUPT_SUPERVISOR_TIMER: usize = 5;

/// Trap causes the kernel knows how to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    Breakpoint,
    UserEnvCall,
    SupervisorTimer,
    /// Raw `scause` of anything else
    Other(usize),
}

impl TrapCause {
    pub fn from_scause(bits: usize) -> Self {
        let code = bits & !INTERRUPT_BIT;
        if bits & INTERRUPT_BIT != 0 {
            match code {
                INTERRUPT_SUPERVISOR_TIMER => TrapCause::SupervisorTimer,
                _ => TrapCause::Other(bits),
            }
        } else {
            match code {
                EXCEPTION_BREAKPOINT => TrapCause::Breakpoint,
                EXCEPTION_USER_ENV_CALL => TrapCause::UserEnvCall,
                _ => TrapCause::Other(bits),
            }
        }
    }
}

/// Width in bytes of the instruction whose low halfword is `halfword`.
///
/// Standard instructions end in `0b11`; everything else is compressed.
pub fn instruction_len(halfword: u16) -> usize {
    if halfword & 0b11 == 0b11 {
        4
    } else {
        2
    }
}

/// Install the trap vector and start the preemption timer
pub fn init() {
    arch::set_trap_entry();
    arch::enable_timer_interrupt();
    timer::set_next_trigger();
    log::info!("trap: vector installed, timer every {} ticks", timer::TIME_SLICE);
}

/// Halfword at user address `va` in the current task's space
fn user_halfword(state: &KernelState, va: usize) -> KernelResult<u16> {
    let chunks = state
        .current_task()?
        .memory_set
        .page_table()
        .translated_byte_buffer(va, 2)?;
    let mut halfword = [0u8; 2];
    let mut at = 0;
    for chunk in chunks {
        halfword[at..at + chunk.len()].copy_from_slice(chunk);
        at += chunk.len();
    }
    Ok(u16::from_le_bytes(halfword))
}

/// Low halfword of the instruction at `sepc`
fn fetch_halfword(cx: &TrapContext) -> u16 {
    if !cx.from_user() {
        return unsafe { (cx.sepc as *const u16).read() };
    }
    match user_halfword(&kernel(), cx.sepc) {
        Ok(halfword) => halfword,
        Err(err) => panic!("breakpoint at unreadable sepc {:#x}: {}", cx.sepc, err),
    }
}

#[no_mangle]
pub extern "C" fn trap_handler(cx: &mut TrapContext) {
    let (scause, stval) = arch::trap_cause();
    dispatch(cx, scause, stval);
}

/// Handle one trap described by `scause`/`stval` against the saved context
fn dispatch(cx: &mut TrapContext, scause: usize, stval: usize) {
    match TrapCause::from_scause(scause) {
        TrapCause::UserEnvCall => {
            cx.sepc += 4;
            let result = syscall(cx.x[17], [cx.x[10], cx.x[11], cx.x[12]]);
            cx.x[10] = result as usize;
        }
        TrapCause::Breakpoint => {
            let len = instruction_len(fetch_halfword(cx));
            log::debug!("breakpoint at {:#x}", cx.sepc);
            cx.sepc += len;
        }
        TrapCause::SupervisorTimer => {
            timer::set_next_trigger();
            if cx.from_user() {
                suspend_current_and_run_next();
            }
        }
        TrapCause::Other(bits) => {
            panic!(
                "unsupported trap: scause = {:#x}, stval = {:#x}, sepc = {:#x}",
                bits, stval, cx.sepc
            );
        }
    }
}
