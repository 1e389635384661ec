//! Heap Allocator
//!
//! `Vec`, `BTreeMap` and friends are served from a fixed `.bss` region.
//! Page frames never come from here; they belong to the buddy frame
//! allocator.

use crate::config::KERNEL_HEAP_SIZE;
use buddy_system_allocator::LockedHeap;

#[global_allocator]
static HEAP_ALLOCATOR: LockedHeap<32> = LockedHeap::empty();

static mut HEAP_SPACE: [u8; KERNEL_HEAP_SIZE] = [0; KERNEL_HEAP_SIZE];

/// Hand the heap region to the allocator; call once, before any allocation
pub fn init_heap() {
    unsafe {
        let start = core::ptr::addr_of_mut!(HEAP_SPACE) as usize;
        HEAP_ALLOCATOR.lock().init(start, KERNEL_HEAP_SIZE);
    }
    log::info!("heap: {:#x} bytes ready", KERNEL_HEAP_SIZE);
}
