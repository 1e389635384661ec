//! Supervisor timer

use crate::arch;
use crate::config::{CLOCK_FREQ, TICKS_PER_SEC};

/// Timer ticks between two preemption points
pub const TIME_SLICE: u64 = (CLOCK_FREQ / TICKS_PER_SEC) as u64;

/// Arm the timer one time slice from now
pub fn set_next_trigger() {
    arch::set_timer(arch::get_time() + TIME_SLICE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_trigger_is_one_slice_ahead() {
        arch::advance_time(12_345);
        set_next_trigger();
        assert_eq!(arch::last_timer(), Some(12_345 + TIME_SLICE));
        arch::advance_time(TIME_SLICE);
        set_next_trigger();
        assert_eq!(arch::last_timer(), Some(12_345 + 2 * TIME_SLICE));
    }
}
