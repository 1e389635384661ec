//! Trap context for user-kernel transitions

/// `sstatus.SPIE`: interrupts are enabled after `sret`
pub const SSTATUS_SPIE: usize = 1 << 5;
/// `sstatus.SPP`: the trap came from supervisor mode
pub const SSTATUS_SPP: usize = 1 << 8;

/// Trap context saved on trap entry.
///
/// `__alltraps` reserves `36 * 8` bytes for it at the top of the kernel
/// stack; the field offsets are fixed by `trap.S`.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapContext {
    /// General registers x0..x31
    pub x: [usize; 32],
    /// Supervisor status register
    pub sstatus: usize,
    /// Supervisor exception program counter
    pub sepc: usize,
    /// Kernel stack pointer loaded into `sscratch` when returning to user mode
    pub kernel_sp: usize,
}

impl TrapContext {
    /// Initialize trap context for a new app: user mode, interrupts on after `sret`
    pub fn app_init_context(entry: usize, sp: usize, kernel_sp: usize) -> Self {
        let mut cx = Self {
            x: [0; 32],
            sstatus: SSTATUS_SPIE,
            sepc: entry,
            kernel_sp,
        };
        cx.set_sp(sp);
        cx
    }

    /// Set stack pointer (x2)
    pub fn set_sp(&mut self, sp: usize) {
        self.x[2] = sp;
    }

    pub fn from_user(&self) -> bool {
        self.sstatus & SSTATUS_SPP == 0
    }
}
