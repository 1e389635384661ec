//! Physical Frame Allocator
//!
//! Manages physical memory with a buddy system. Every block is a power of
//! two of at least `MIN_BLOCK_SIZE` bytes and is aligned to its own size, so
//! the buddy of a block at `addr` with order `k` is `addr ^ (1 << k)`.
//!
//! Free blocks are tracked in one `Vec` of start addresses per order; the
//! blocks themselves are never written to while free.

use super::memory_layout::PhysPageNum;
use crate::config::{MAX_ORDER, MIN_BLOCK_SIZE, PAGE_SIZE, PAGE_SIZE_BITS};
use crate::error::{KernelError, KernelResult};
use alloc::vec::Vec;

/// Smallest power of two that is `>= x` (`x == 0` gives 1), `None` past `1 << 63`
pub fn next_power_of_two(x: usize) -> Option<usize> {
    x.checked_next_power_of_two()
}

/// Largest power of two that is `<= x`; `x` must be non-zero
pub fn prev_power_of_two(x: usize) -> usize {
    debug_assert!(x != 0);
    1 << (usize::BITS - 1 - x.leading_zeros())
}

/// Size of the block that serves a request of `size` bytes
pub fn block_size(size: usize) -> Option<usize> {
    next_power_of_two(size).map(|size| size.max(MIN_BLOCK_SIZE))
}

fn order_of(size: usize) -> usize {
    size.trailing_zeros() as usize
}

pub struct BuddyAllocator {
    free_lists: [Vec<usize>; MAX_ORDER],
    allocated: usize,
    total: usize,
}

impl BuddyAllocator {
    pub const fn new() -> Self {
        Self {
            free_lists: [const { Vec::new() }; MAX_ORDER],
            allocated: 0,
            total: 0,
        }
    }

    /// Forget every region and empty all free lists
    pub fn init(&mut self) {
        for list in self.free_lists.iter_mut() {
            list.clear();
        }
        self.allocated = 0;
        self.total = 0;
    }

    /// Hand `[start, end)` to the allocator.
    ///
    /// The range is cut into the largest naturally aligned blocks that fit,
    /// never larger than `1 << (MAX_ORDER - 1)`.
    pub fn add_region(&mut self, start: usize, end: usize) {
        let mut current = (start + MIN_BLOCK_SIZE - 1) & !(MIN_BLOCK_SIZE - 1);
        let end = end & !(MIN_BLOCK_SIZE - 1);
        while current < end {
            let lowbit = if current == 0 {
                1 << (MAX_ORDER - 1)
            } else {
                current & current.wrapping_neg()
            };
            let size = lowbit
                .min(prev_power_of_two(end - current))
                .min(1 << (MAX_ORDER - 1));
            self.free_lists[order_of(size)].push(current);
            self.total += size;
            current += size;
        }
        log::debug!(
            "buddy: added [{:#x}, {:#x}), {} bytes managed",
            start,
            end,
            self.total
        );
    }

    /// Allocate a block for `size` bytes and return its start address
    pub fn allocate(&mut self, size: usize) -> KernelResult<usize> {
        let size = block_size(size).ok_or(KernelError::OutOfMemory)?;
        let order = order_of(size);
        if order >= MAX_ORDER {
            return Err(KernelError::OutOfMemory);
        }
        for j in order..MAX_ORDER {
            if let Some(block) = self.free_lists[j].pop() {
                // Split down to the requested order, freeing upper halves
                for k in (order..j).rev() {
                    self.free_lists[k].push(block + (1 << k));
                }
                self.allocated += size;
                return Ok(block);
            }
        }
        Err(KernelError::OutOfMemory)
    }

    /// Return a block obtained from `allocate(size)` and merge it with free buddies
    pub fn deallocate(&mut self, block: usize, size: usize) {
        let Some(size) = block_size(size) else {
            panic!("dealloc of {:#x} with impossible size {:#x}", block, size);
        };
        let mut order = order_of(size);
        let mut current = block;
        while order < MAX_ORDER - 1 {
            let buddy = current ^ (1 << order);
            let list = &mut self.free_lists[order];
            match list.iter().position(|&b| b == buddy) {
                Some(pos) => {
                    list.swap_remove(pos);
                    current = current.min(buddy);
                    order += 1;
                }
                None => break,
            }
        }
        self.free_lists[order].push(current);
        self.allocated -= size;
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Free bytes held at each order
    pub fn free_bytes_by_order(&self) -> [usize; MAX_ORDER] {
        let mut bytes = [0; MAX_ORDER];
        for (order, list) in self.free_lists.iter().enumerate() {
            bytes[order] = list.len() << order;
        }
        bytes
    }

    /// Start addresses of the free blocks of one order, sorted
    pub fn free_blocks(&self, order: usize) -> Vec<usize> {
        let mut blocks = self.free_lists[order].clone();
        blocks.sort_unstable();
        blocks
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame allocator trait for abstraction
pub trait FrameAllocator {
    /// Allocate one zeroed page frame
    fn alloc_frame(&mut self) -> KernelResult<PhysPageNum>;
    fn dealloc_frame(&mut self, ppn: PhysPageNum);
}

impl FrameAllocator for BuddyAllocator {
    fn alloc_frame(&mut self) -> KernelResult<PhysPageNum> {
        let pa = self.allocate(PAGE_SIZE)?;
        let ppn = PhysPageNum(pa >> PAGE_SIZE_BITS);
        ppn.get_bytes_array().fill(0);
        Ok(ppn)
    }

    fn dealloc_frame(&mut self, ppn: PhysPageNum) {
        self.deallocate(ppn.addr().0, PAGE_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::Arena;

    fn allocator_over(arena: &Arena) -> BuddyAllocator {
        let mut buddy = BuddyAllocator::new();
        buddy.init();
        buddy.add_region(arena.start(), arena.end());
        buddy
    }

    fn snapshot(buddy: &BuddyAllocator) -> Vec<Vec<usize>> {
        (0..MAX_ORDER).map(|order| buddy.free_blocks(order)).collect()
    }

    #[test]
    fn test_power_of_two_helpers() {
        for x in 1..5000usize {
            let next = next_power_of_two(x).unwrap();
            let prev = prev_power_of_two(x);
            assert!(prev <= x && x <= next);
            assert!(next.is_power_of_two() && prev.is_power_of_two());
            assert_eq!(next_power_of_two(next), Some(next));
        }
        assert_eq!(block_size(1), Some(64));
        assert_eq!(block_size(64), Some(64));
        assert_eq!(block_size(65), Some(128));
        assert_eq!(block_size(4096), Some(4096));
        assert_eq!(block_size(1 << (usize::BITS - 1)), Some(1 << (usize::BITS - 1)));
        assert_eq!(block_size((1 << (usize::BITS - 1)) + 1), None);
    }

    #[test]
    fn test_huge_request_is_out_of_memory() {
        let arena = Arena::new(1 << 16);
        let mut buddy = allocator_over(&arena);
        assert_eq!(buddy.allocate(usize::MAX), Err(KernelError::OutOfMemory));
        assert_eq!(buddy.allocate((1 << (usize::BITS - 1)) + 1), Err(KernelError::OutOfMemory));
        assert_eq!(buddy.allocate(1 << MAX_ORDER), Err(KernelError::OutOfMemory));
        assert_eq!(buddy.allocated(), 0);
    }

    #[test]
    fn test_add_region_decomposes_unaligned_range() {
        let mut buddy = BuddyAllocator::new();
        buddy.add_region(0x1000, 0x4000);
        assert_eq!(buddy.free_blocks(12), vec![0x1000]);
        assert_eq!(buddy.free_blocks(13), vec![0x2000]);
        assert_eq!(buddy.total(), 0x3000);

        let mut buddy = BuddyAllocator::new();
        buddy.add_region(0x1010, 0x1100);
        // 0x1010 rounds up to 0x1040
        assert_eq!(buddy.free_blocks(6), vec![0x1040]);
        assert_eq!(buddy.free_blocks(7), vec![0x1080]);
        assert_eq!(buddy.total(), 0xc0);
    }

    #[test]
    fn test_add_region_caps_block_size() {
        let mut buddy = BuddyAllocator::new();
        buddy.add_region(0, 1 << MAX_ORDER);
        assert_eq!(buddy.free_blocks(MAX_ORDER - 1), vec![0, 1 << (MAX_ORDER - 1)]);
    }

    #[test]
    fn test_allocate_returns_aligned_block() {
        let arena = Arena::new(1 << 20);
        let mut buddy = allocator_over(&arena);
        let block = buddy.allocate(100).unwrap();
        assert_eq!(block % 128, 0);
        assert_eq!(buddy.allocated(), 128);
        let page = buddy.allocate(4096).unwrap();
        assert_eq!(page % 4096, 0);
        assert_eq!(buddy.allocated(), 128 + 4096);
    }

    #[test]
    fn test_small_sequence_restores_free_lists() {
        let arena = Arena::new(1 << 20);
        let mut buddy = allocator_over(&arena);
        let initial = snapshot(&buddy);

        let sizes = [1usize, 30, 60, 100];
        let blocks: Vec<usize> = sizes.iter().map(|&s| buddy.allocate(s).unwrap()).collect();
        assert_eq!(buddy.allocated(), 64 + 64 + 64 + 128);
        for (&block, &size) in blocks.iter().zip(sizes.iter()).rev() {
            buddy.deallocate(block, size);
        }

        assert_eq!(snapshot(&buddy), initial);
        assert_eq!(buddy.allocated(), 0);
    }

    #[test]
    fn test_round_trip_in_any_free_order() {
        let arena = Arena::new(1 << 20);
        let mut buddy = allocator_over(&arena);
        let initial = buddy.free_bytes_by_order();

        let sizes = [4096usize, 64, 777, 8192, 3, 65536, 100, 4096, 2000];
        let mut blocks: Vec<(usize, usize)> = sizes
            .iter()
            .map(|&s| (buddy.allocate(s).unwrap(), s))
            .collect();
        // Interleave frees: odd positions first, then even
        let (odd, even): (Vec<_>, Vec<_>) = blocks.drain(..).enumerate().partition(|(i, _)| i % 2 == 1);
        for (_, (block, size)) in odd.into_iter().chain(even) {
            buddy.deallocate(block, size);
        }

        assert_eq!(buddy.free_bytes_by_order(), initial);
    }

    #[test]
    fn test_live_blocks_never_overlap() {
        let arena = Arena::new(1 << 20);
        let mut buddy = allocator_over(&arena);
        let mut live: Vec<(usize, usize)> = Vec::new();
        for i in 0..200usize {
            let request = (i * 37) % 3000 + 1;
            let start = buddy.allocate(request).unwrap();
            live.push((start, start + block_size(request).unwrap()));
            if i % 3 == 0 {
                let (s, e) = live.remove(i % live.len());
                buddy.deallocate(s, e - s);
            }
        }
        live.sort_unstable();
        for pair in live.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "{:x?} overlaps {:x?}", pair[0], pair[1]);
        }
        for &(s, e) in &live {
            assert!(s >= arena.start() && e <= arena.end());
        }
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let arena = Arena::new(1 << 16);
        let mut buddy = allocator_over(&arena);
        let whole = buddy.allocate(1 << 16).unwrap();
        assert_eq!(buddy.allocate(64), Err(KernelError::OutOfMemory));
        buddy.deallocate(whole, 1 << 16);
        assert!(buddy.allocate(1 << 17).is_err());
        assert!(buddy.allocate(64).is_ok());
    }

    #[test]
    fn test_alloc_frame_is_zeroed() {
        let arena = Arena::new(1 << 16);
        let mut buddy = allocator_over(&arena);
        let ppn = buddy.alloc_frame().unwrap();
        ppn.get_bytes_array().fill(0xAA);
        buddy.dealloc_frame(ppn);
        let again = buddy.alloc_frame().unwrap();
        assert_eq!(again, ppn);
        assert!(again.get_bytes_array().iter().all(|&b| b == 0));
    }
}
