//! Process identifiers and kernel stacks

use crate::config::{KERNEL_STACK_SIZE, MAX_PID};
use crate::error::{KernelError, KernelResult};
use crate::mm::BuddyAllocator;
use crate::trap::TrapContext;

pub type Pid = usize;

const BITS: usize = u64::BITS as usize;

/// Bitmap of pids in use; pid 0 belongs to the boot context and is never handed out
pub struct PidAllocator {
    bitmap: [u64; MAX_PID / BITS],
}

impl PidAllocator {
    pub fn new() -> Self {
        let mut bitmap = [0; MAX_PID / BITS];
        bitmap[0] = 1;
        Self { bitmap }
    }

    /// Lowest free pid
    pub fn alloc(&mut self) -> KernelResult<Pid> {
        for (i, word) in self.bitmap.iter_mut().enumerate() {
            if *word != u64::MAX {
                let bit = word.trailing_ones() as usize;
                *word |= 1 << bit;
                return Ok(i * BITS + bit);
            }
        }
        Err(KernelError::PidExhausted)
    }

    pub fn dealloc(&mut self, pid: Pid) {
        assert!(self.is_allocated(pid), "pid {} dealloc before alloc", pid);
        assert!(pid != 0, "pid 0 is reserved");
        self.bitmap[pid / BITS] &= !(1 << (pid % BITS));
    }

    pub fn is_allocated(&self, pid: Pid) -> bool {
        pid < MAX_PID && self.bitmap[pid / BITS] & (1 << (pid % BITS)) != 0
    }
}

impl Default for PidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A task's kernel stack, one buddy block of `KERNEL_STACK_SIZE` bytes.
///
/// The task's `TrapContext` lives at its very top.
#[derive(Debug)]
pub struct KernelStack {
    bottom: usize,
}

impl KernelStack {
    pub fn new(frames: &mut BuddyAllocator) -> KernelResult<Self> {
        let bottom = frames.allocate(KERNEL_STACK_SIZE)?;
        Ok(Self { bottom })
    }

    pub fn top(&self) -> usize {
        self.bottom + KERNEL_STACK_SIZE
    }

    pub fn trap_cx_addr(&self) -> usize {
        self.top() - core::mem::size_of::<TrapContext>()
    }

    pub fn trap_cx(&self) -> &'static mut TrapContext {
        unsafe { &mut *(self.trap_cx_addr() as *mut TrapContext) }
    }

    pub fn release(self, frames: &mut BuddyAllocator) {
        frames.deallocate(self.bottom, KERNEL_STACK_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::Arena;

    #[test]
    fn test_pid_zero_is_reserved() {
        let mut pids = PidAllocator::new();
        assert!(pids.is_allocated(0));
        assert_eq!(pids.alloc().unwrap(), 1);
        assert_eq!(pids.alloc().unwrap(), 2);
    }

    #[test]
    fn test_pids_reused_after_release_only() {
        let mut pids = PidAllocator::new();
        let a = pids.alloc().unwrap();
        let b = pids.alloc().unwrap();
        pids.dealloc(a);
        assert!(!pids.is_allocated(a));
        assert!(pids.is_allocated(b));
        assert_eq!(pids.alloc().unwrap(), a);
        assert_eq!(pids.alloc().unwrap(), b + 1);
    }

    #[test]
    fn test_pid_exhaustion() {
        let mut pids = PidAllocator::new();
        for _ in 1..MAX_PID {
            pids.alloc().unwrap();
        }
        assert_eq!(pids.alloc(), Err(KernelError::PidExhausted));
        pids.dealloc(700);
        assert_eq!(pids.alloc().unwrap(), 700);
    }

    #[test]
    #[should_panic]
    fn test_double_release_is_fatal() {
        let mut pids = PidAllocator::new();
        let a = pids.alloc().unwrap();
        pids.dealloc(a);
        pids.dealloc(a);
    }

    #[test]
    fn test_trap_context_sits_at_stack_top() {
        let arena = Arena::new(1 << 16);
        let mut frames = BuddyAllocator::new();
        frames.add_region(arena.start(), arena.end());
        let stack = KernelStack::new(&mut frames).unwrap();
        assert_eq!(stack.top() % 16, 0);
        assert_eq!(stack.trap_cx_addr() % 16, 0);
        assert_eq!(stack.top() - stack.trap_cx_addr(), 36 * 8);
        assert_eq!(frames.allocated(), KERNEL_STACK_SIZE);
        stack.release(&mut frames);
        assert_eq!(frames.allocated(), 0);
    }
}
