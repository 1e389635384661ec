//! Task Context
//!
//! Defines the context structure for task switching

use crate::arch;

/// Kernel-side state saved by `__switch`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskContext {
    /// Return address (ra)
    ra: usize,
    /// Stack pointer (sp)
    sp: usize,
    /// Saved registers s0-s11
    s: [usize; 12],
    /// Page table active while this context runs
    pub satp: usize,
}

impl TaskContext {
    /// Context that returns through `__restore` with `kstack_ptr` as sp
    pub fn goto_restore(kstack_ptr: usize, satp: usize) -> Self {
        Self {
            ra: arch::restore_entry(),
            sp: kstack_ptr,
            s: [0; 12],
            satp,
        }
    }

    pub fn sp(&self) -> usize {
        self.sp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_context_points_at_trap_frame() {
        let cx = TaskContext::goto_restore(0x8040_0000 - 36 * 8, 8 << 60 | 0x80321);
        assert_eq!(cx.sp(), 0x8040_0000 - 36 * 8);
        assert_eq!(cx.satp, 8 << 60 | 0x80321);
        assert_eq!(cx.ra, arch::restore_entry());
        assert_ne!(cx, TaskContext::default());
    }

    #[test]
    fn test_layout_matches_switch() {
        assert_eq!(core::mem::size_of::<TaskContext>(), 15 * 8);
        assert_eq!(core::mem::offset_of!(TaskContext, satp), 14 * 8);
    }
}
