//! Kernel configuration constants

/// User stack size (8KB)
pub const USER_STACK_SIZE: usize = 4096 * 2;

/// Kernel stack size (16KB)
pub const KERNEL_STACK_SIZE: usize = 4096 * 4;

/// Kernel heap size (8MB)
pub const KERNEL_HEAP_SIZE: usize = 0x80_0000;

/// Physical memory end (128MB for QEMU virt)
pub const MEMORY_END: usize = 0x8800_0000;

/// Page size (4KB)
pub const PAGE_SIZE: usize = 0x1000;

/// Page size bits
pub const PAGE_SIZE_BITS: usize = 12;

/// Lowest address of every user stack; each address space has its own copy
pub const USER_STACK_BASE: usize = 0x1000_0000;

/// Number of pids the bitmap can hand out (pid 0 is the boot context)
pub const MAX_PID: usize = 1024;

/// Number of buddy free lists; the largest block is `1 << (MAX_ORDER - 1)` bytes
pub const MAX_ORDER: usize = 30;

/// Smallest block the buddy allocator hands out
pub const MIN_BLOCK_SIZE: usize = 64;

/// Longest path accepted by `exec` and `open`
pub const MAX_PATH_LEN: usize = 256;

/// Clock frequency (10MHz for QEMU)
pub const CLOCK_FREQ: usize = 10_000_000;

/// Timer interrupts per second
pub const TICKS_PER_SEC: usize = 100;
