//! Page Table Management
//!
//! Implements SV39 page table for RISC-V 64-bit systems.
//! SV39 uses 3-level page tables with 39-bit virtual addresses.
//!
//! Intermediate nodes are allocated lazily from the frame allocator and
//! belong to exactly one `PageTable`; they are only released by `free`.

use super::frame_allocator::FrameAllocator;
use super::memory_layout::*;
use crate::config::PAGE_SIZE;
use crate::error::{KernelError, KernelResult};
use alloc::string::String;
use alloc::vec::Vec;
use bitflags::bitflags;
use core::fmt::{self, Debug, Formatter};

bitflags! {
    /// Page Table Entry (PTE) flags
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct PTEFlags: u8 {
        const V = 1 << 0;
        const R = 1 << 1;
        const W = 1 << 2;
        const X = 1 << 3;
        const U = 1 << 4;
        const G = 1 << 5;
        const A = 1 << 6;
        const D = 1 << 7;
    }
}

/// Page Table Entry
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct PageTableEntry {
    pub bits: usize,
}

impl PageTableEntry {
    /// Create a PTE from physical page number and flags
    pub fn new(ppn: PhysPageNum, flags: PTEFlags) -> Self {
        Self {
            bits: (ppn.0 << 10) | flags.bits() as usize,
        }
    }

    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn ppn(&self) -> PhysPageNum {
        PhysPageNum((self.bits >> 10) & ((1usize << 44) - 1))
    }

    pub fn flags(&self) -> PTEFlags {
        PTEFlags::from_bits_truncate(self.bits as u8)
    }

    pub fn is_valid(&self) -> bool {
        self.flags().contains(PTEFlags::V)
    }

    /// Any of R/W/X makes the entry a leaf; V alone points to the next level
    pub fn is_leaf(&self) -> bool {
        self.flags()
            .intersects(PTEFlags::R | PTEFlags::W | PTEFlags::X)
    }

    pub fn is_zero(&self) -> bool {
        self.bits == 0
    }

    pub fn readable(&self) -> bool {
        self.flags().contains(PTEFlags::R)
    }

    pub fn writable(&self) -> bool {
        self.flags().contains(PTEFlags::W)
    }

    pub fn executable(&self) -> bool {
        self.flags().contains(PTEFlags::X)
    }
}

impl Debug for PageTableEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PTE")
            .field("ppn", &self.ppn())
            .field("flags", &self.flags())
            .finish()
    }
}

/// Handle to a root page-table frame
pub struct PageTable {
    root_ppn: PhysPageNum,
}

impl PageTable {
    /// Allocate a zeroed root table
    pub fn new(frames: &mut impl FrameAllocator) -> Self {
        let root_ppn = match frames.alloc_frame() {
            Ok(ppn) => ppn,
            Err(e) => panic!("cannot allocate root page table: {}", e),
        };
        debug_assert!(root_ppn.fits_sv39());
        Self { root_ppn }
    }

    pub fn root_ppn(&self) -> PhysPageNum {
        self.root_ppn
    }

    /// Value for `satp`: Sv39 mode plus the root ppn
    pub fn token(&self) -> usize {
        8usize << 60 | self.root_ppn.0
    }

    /// Leaf slot for `vpn`, creating missing intermediate tables
    fn walk_create(
        &mut self,
        frames: &mut impl FrameAllocator,
        vpn: VirtPageNum,
    ) -> &'static mut PageTableEntry {
        let idxs = vpn.indexes();
        let mut ppn = self.root_ppn;
        for (level, &idx) in idxs.iter().enumerate() {
            let pte = &mut ppn.get_pte_array()[idx];
            if level == 2 {
                return pte;
            }
            if pte.is_zero() {
                let frame = match frames.alloc_frame() {
                    Ok(frame) => frame,
                    Err(e) => panic!("cannot allocate page-table node for {:?}: {}", vpn, e),
                };
                *pte = PageTableEntry::new(frame, PTEFlags::V);
            }
            assert!(
                !pte.is_leaf(),
                "huge-page leaf above {:?} at level {}",
                vpn,
                level
            );
            ppn = pte.ppn();
        }
        unreachable!()
    }

    /// Leaf slot for `vpn`, or `None` if an intermediate table is missing
    fn walk(&self, vpn: VirtPageNum) -> Option<&'static mut PageTableEntry> {
        let idxs = vpn.indexes();
        let mut ppn = self.root_ppn;
        for (level, &idx) in idxs.iter().enumerate() {
            let pte = &mut ppn.get_pte_array()[idx];
            if level == 2 {
                return Some(pte);
            }
            if !pte.is_valid() || pte.is_leaf() {
                return None;
            }
            ppn = pte.ppn();
        }
        None
    }

    /// Install `vpn -> ppn`; the slot must be empty
    pub fn map(
        &mut self,
        frames: &mut impl FrameAllocator,
        vpn: VirtPageNum,
        ppn: PhysPageNum,
        flags: PTEFlags,
    ) {
        let pte = self.walk_create(frames, vpn);
        assert!(
            pte.is_zero(),
            "{:?} is already mapped to {:?}",
            vpn,
            pte.ppn()
        );
        *pte = PageTableEntry::new(ppn, flags | PTEFlags::V);
    }

    /// Clear the leaf for `vpn` and return the page it pointed to
    pub fn unmap(&mut self, vpn: VirtPageNum) -> PhysPageNum {
        match self.walk(vpn) {
            Some(pte) if pte.is_valid() => {
                let ppn = pte.ppn();
                *pte = PageTableEntry::empty();
                ppn
            }
            _ => panic!("{:?} is not mapped", vpn),
        }
    }

    pub fn translate(&self, vpn: VirtPageNum) -> Option<PageTableEntry> {
        self.walk(vpn)
            .map(|pte| *pte)
            .filter(|pte| pte.is_valid())
    }

    /// Leaf for `va` if user mode may access it
    fn translate_user(&self, va: VirtAddr) -> KernelResult<PageTableEntry> {
        self.translate(va.floor())
            .filter(|pte| pte.flags().contains(PTEFlags::U))
            .ok_or(KernelError::BadAddress)
    }

    /// Release every table frame reachable from the root, children first.
    ///
    /// Leaf pages are not touched; framed data must be unmapped beforehand.
    pub fn free(self, frames: &mut impl FrameAllocator) {
        free_table(frames, self.root_ppn);
    }

    /// Kernel-side slices covering `len` bytes of user memory at `ptr`.
    ///
    /// Every page in the range must carry `U`; the kernel's own mappings do not.
    pub fn translated_byte_buffer(
        &self,
        ptr: usize,
        len: usize,
    ) -> KernelResult<Vec<&'static mut [u8]>> {
        let mut start = ptr;
        let end = ptr
            .checked_add(len)
            .ok_or(KernelError::BadAddress)?;
        let mut buffers = Vec::new();
        while start < end {
            let va = VirtAddr(start);
            let pte = self.translate_user(va)?;
            let page_end = (va.floor().0 + 1) * PAGE_SIZE;
            let chunk_end = page_end.min(end);
            let bytes = pte.ppn().get_bytes_array();
            buffers.push(&mut bytes[va.page_offset()..va.page_offset() + (chunk_end - start)]);
            start = chunk_end;
        }
        Ok(buffers)
    }

    /// Read a NUL-terminated string of at most `max_len` bytes from user memory
    pub fn translated_str(&self, ptr: usize, max_len: usize) -> KernelResult<String> {
        let mut bytes = Vec::new();
        let mut va = ptr;
        loop {
            if bytes.len() >= max_len {
                return Err(KernelError::BadAddress);
            }
            let pte = self.translate_user(VirtAddr(va))?;
            let pa = pte.ppn().addr().0 + VirtAddr(va).page_offset();
            let ch = unsafe { *(pa as *const u8) };
            if ch == 0 {
                break;
            }
            bytes.push(ch);
            va += 1;
        }
        String::from_utf8(bytes).map_err(|_| KernelError::BadAddress)
    }
}

fn free_table(frames: &mut impl FrameAllocator, ppn: PhysPageNum) {
    for pte in ppn.get_pte_array().iter() {
        if pte.is_valid() && !pte.is_leaf() {
            free_table(frames, pte.ppn());
        }
    }
    frames.dealloc_frame(ppn);
}

impl Debug for PageTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PageTable({:#x})", self.root_ppn.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::BuddyAllocator;
    use crate::test_util::Arena;

    fn setup(arena: &Arena) -> BuddyAllocator {
        let mut frames = BuddyAllocator::new();
        frames.add_region(arena.start(), arena.end());
        frames
    }

    #[test]
    fn test_map_translate_unmap() {
        let arena = Arena::new(1 << 20);
        let mut frames = setup(&arena);
        let mut pt = PageTable::new(&mut frames);
        let data = frames.alloc_frame().unwrap();
        let vpn = VirtPageNum(0x10);

        pt.map(&mut frames, vpn, data, PTEFlags::R | PTEFlags::U);
        let pte = pt.translate(vpn).unwrap();
        assert_eq!(pte.ppn(), data);
        assert!(pte.readable() && !pte.writable() && !pte.executable());
        assert!(pte.flags().contains(PTEFlags::V | PTEFlags::U));

        let va = VirtAddr(0x10_123);
        assert_eq!(pt.translate(va.floor()).unwrap().ppn(), data);
        assert_eq!(va.page_offset(), 0x123);

        assert_eq!(pt.unmap(vpn), data);
        assert!(pt.translate(vpn).is_none());
        // The slot is reusable after unmap
        pt.map(&mut frames, vpn, data, PTEFlags::R | PTEFlags::W);
        assert!(pt.translate(vpn).unwrap().writable());
    }

    #[test]
    #[should_panic(expected = "already mapped")]
    fn test_double_map_is_fatal() {
        let arena = Arena::new(1 << 20);
        let mut frames = setup(&arena);
        let mut pt = PageTable::new(&mut frames);
        let vpn = VirtPageNum(0x42);
        pt.map(&mut frames, vpn, PhysPageNum(0x80200), PTEFlags::R);
        pt.map(&mut frames, vpn, PhysPageNum(0x80201), PTEFlags::R);
    }

    #[test]
    #[should_panic(expected = "not mapped")]
    fn test_unmap_absent_is_fatal() {
        let arena = Arena::new(1 << 20);
        let mut frames = setup(&arena);
        let mut pt = PageTable::new(&mut frames);
        pt.unmap(VirtPageNum(0x1234));
    }

    #[test]
    fn test_intermediate_nodes_hold_only_valid() {
        let arena = Arena::new(1 << 20);
        let mut frames = setup(&arena);
        let mut pt = PageTable::new(&mut frames);
        pt.map(&mut frames, VirtPageNum(0x80200), PhysPageNum(0x80200), PTEFlags::R | PTEFlags::X);
        let top = pt.root_ppn().get_pte_array()[2];
        assert_eq!(top.flags(), PTEFlags::V);
        let mid = top.ppn().get_pte_array()[1];
        assert_eq!(mid.flags(), PTEFlags::V);
    }

    #[test]
    fn test_free_releases_every_node() {
        let arena = Arena::new(1 << 20);
        let mut frames = setup(&arena);
        let before = frames.free_bytes_by_order();
        let mut pt = PageTable::new(&mut frames);
        // Two distant pages need separate level-1 and level-0 tables
        pt.map(&mut frames, VirtPageNum(0x10), PhysPageNum(0x80000), PTEFlags::R);
        pt.map(&mut frames, VirtPageNum(0x40000), PhysPageNum(0x80001), PTEFlags::R);
        assert_eq!(frames.allocated(), 5 * PAGE_SIZE);
        pt.free(&mut frames);
        assert_eq!(frames.allocated(), 0);
        assert_eq!(frames.free_bytes_by_order(), before);
    }

    #[test]
    fn test_token_encodes_sv39() {
        let arena = Arena::new(1 << 16);
        let mut frames = setup(&arena);
        let pt = PageTable::new(&mut frames);
        assert_eq!(pt.token() >> 60, 8);
        assert_eq!(pt.token() & ((1 << 44) - 1), pt.root_ppn().0);
    }

    #[test]
    fn test_translated_buffers_cross_pages() {
        let arena = Arena::new(1 << 20);
        let mut frames = setup(&arena);
        let mut pt = PageTable::new(&mut frames);
        let a = frames.alloc_frame().unwrap();
        let b = frames.alloc_frame().unwrap();
        pt.map(&mut frames, VirtPageNum(0x10), a, PTEFlags::R | PTEFlags::W | PTEFlags::U);
        pt.map(&mut frames, VirtPageNum(0x11), b, PTEFlags::R | PTEFlags::W | PTEFlags::U);

        let mut bufs = pt.translated_byte_buffer(0x10ffe, 4).unwrap();
        assert_eq!(bufs.len(), 2);
        assert_eq!(bufs[0].len(), 2);
        assert_eq!(bufs[1].len(), 2);
        bufs[1][0] = b'x';
        assert_eq!(b.get_bytes_array()[0], b'x');

        assert_eq!(
            pt.translated_byte_buffer(0x11ff0, 0x20).unwrap_err(),
            KernelError::BadAddress
        );

        a.get_bytes_array()[..4].copy_from_slice(b"sh\0\0");
        assert_eq!(pt.translated_str(0x10000, 16).unwrap(), "sh");
    }

    #[test]
    fn test_translated_access_requires_user_pages() {
        let arena = Arena::new(1 << 20);
        let mut frames = setup(&arena);
        let mut pt = PageTable::new(&mut frames);
        let user = frames.alloc_frame().unwrap();
        let kernel = frames.alloc_frame().unwrap();
        pt.map(&mut frames, VirtPageNum(0x10), user, PTEFlags::R | PTEFlags::W | PTEFlags::U);
        pt.map(&mut frames, VirtPageNum(0x11), kernel, PTEFlags::R | PTEFlags::W);
        kernel.get_bytes_array()[..3].copy_from_slice(b"sh\0");

        assert!(pt.translate(VirtPageNum(0x11)).is_some());
        assert_eq!(
            pt.translated_byte_buffer(0x11000, 8).unwrap_err(),
            KernelError::BadAddress
        );
        // A range that starts in user memory cannot run on into a kernel page
        assert_eq!(
            pt.translated_byte_buffer(0x10ff0, 0x20).unwrap_err(),
            KernelError::BadAddress
        );
        assert_eq!(pt.translated_str(0x11000, 16).unwrap_err(), KernelError::BadAddress);
        assert_eq!(pt.translated_byte_buffer(0x10ff0, 0x10).unwrap().len(), 1);
    }
}
