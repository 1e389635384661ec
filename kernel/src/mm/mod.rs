//! Memory Management Module
//!
//! - Physical memory: the buddy frame allocator
//! - Virtual memory: Sv39 page tables and address spaces
//! - Kernel heap (bare metal only)

pub mod frame_allocator;
#[cfg(target_os = "none")]
pub mod heap;
pub mod memory_layout;
pub mod memory_set;
pub mod page_table;

pub use frame_allocator::{BuddyAllocator, FrameAllocator};
pub use memory_layout::*;
pub use memory_set::{KernelLayout, MapArea, MapPermission, MapType, MemorySet};
pub use page_table::{PTEFlags, PageTable, PageTableEntry};
