//! Console, timer and shutdown through the SBI firmware

use sbi_rt as sbi;

/// Print a single character to console (legacy)
#[allow(deprecated)]
pub fn console_putchar(ch: u8) {
    let _ = sbi::legacy::console_putchar(ch as usize);
}

/// Get a character from console (non-blocking)
#[allow(deprecated)]
pub fn console_getchar() -> Option<u8> {
    let ch = sbi::legacy::console_getchar();
    if ch == usize::MAX {
        None
    } else {
        Some(ch as u8)
    }
}

/// Set timer for next timer event
#[allow(deprecated)]
pub fn set_timer(stime_value: u64) {
    let _ = sbi::legacy::set_timer(stime_value);
}

/// Shutdown the system
pub fn shutdown() -> ! {
    let _ = sbi::system_reset(sbi::Shutdown, sbi::NoReason);

    // sbi-rt's legacy::shutdown() panics if it returns
    #[allow(deprecated)]
    let _ = sbi::legacy::shutdown();
}
