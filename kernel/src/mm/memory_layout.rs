//! Address and page-number types for Sv39

use super::page_table::PageTableEntry;
use crate::config::{PAGE_SIZE, PAGE_SIZE_BITS};

/// Sv39 physical page numbers are 44 bits wide
const PPN_WIDTH_SV39: usize = 44;

/// Physical address type
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug)]
pub struct PhysAddr(pub usize);

/// Physical page number type
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug)]
pub struct PhysPageNum(pub usize);

impl PhysPageNum {
    pub fn addr(&self) -> PhysAddr {
        PhysAddr(self.0 << PAGE_SIZE_BITS)
    }

    /// The frame viewed as a page-table node.
    ///
    /// Physical memory is identity mapped in every address space, so the
    /// physical address is also a usable pointer.
    pub fn get_pte_array(&self) -> &'static mut [PageTableEntry] {
        let pa = self.addr().0;
        unsafe { core::slice::from_raw_parts_mut(pa as *mut PageTableEntry, 512) }
    }

    pub fn get_bytes_array(&self) -> &'static mut [u8] {
        let pa = self.addr().0;
        unsafe { core::slice::from_raw_parts_mut(pa as *mut u8, PAGE_SIZE) }
    }

    pub fn fits_sv39(&self) -> bool {
        self.0 >> PPN_WIDTH_SV39 == 0
    }
}

/// Virtual address type
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug)]
pub struct VirtAddr(pub usize);

impl VirtAddr {
    pub fn floor(&self) -> VirtPageNum {
        VirtPageNum(self.0 >> PAGE_SIZE_BITS)
    }

    pub fn ceil(&self) -> VirtPageNum {
        VirtPageNum((self.0 + PAGE_SIZE - 1) >> PAGE_SIZE_BITS)
    }

    pub fn page_offset(&self) -> usize {
        self.0 & (PAGE_SIZE - 1)
    }
}

/// Virtual page number type
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug)]
pub struct VirtPageNum(pub usize);

impl VirtPageNum {
    /// Get indexes for 3-level page table (SV39)
    pub fn indexes(&self) -> [usize; 3] {
        let vpn = self.0;
        [
            (vpn >> 18) & 0x1FF, // Level 2
            (vpn >> 9) & 0x1FF,  // Level 1
            vpn & 0x1FF,         // Level 0
        ]
    }
}

impl core::ops::Add<usize> for VirtPageNum {
    type Output = Self;
    fn add(self, rhs: usize) -> Self {
        Self(self.0 + rhs)
    }
}

/// Half-open range of virtual pages
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VPNRange {
    start: VirtPageNum,
    end: VirtPageNum,
}

impl VPNRange {
    pub fn new(start: VirtPageNum, end: VirtPageNum) -> Self {
        assert!(start <= end, "start {:?} > end {:?}", start, end);
        Self { start, end }
    }

    pub fn start(&self) -> VirtPageNum {
        self.start
    }

    pub fn end(&self) -> VirtPageNum {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end.0 - self.start.0
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl Iterator for VPNRange {
    type Item = VirtPageNum;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start.0 < self.end.0 {
            let vpn = self.start;
            self.start.0 += 1;
            Some(vpn)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sv39_indexes() {
        let vpn = VirtAddr(0x8020_1000).floor();
        assert_eq!(vpn.indexes(), [2, 1, 1]);
        assert_eq!(VirtPageNum(0x1ff).indexes(), [0, 0, 0x1ff]);
    }

    #[test]
    fn test_floor_and_ceil() {
        assert_eq!(VirtAddr(0x1000).floor(), VirtPageNum(1));
        assert_eq!(VirtAddr(0x1000).ceil(), VirtPageNum(1));
        assert_eq!(VirtAddr(0x1001).ceil(), VirtPageNum(2));
        assert_eq!(VirtAddr(0x1fff).floor(), VirtPageNum(1));
        assert_eq!(VirtAddr(0x1234).page_offset(), 0x234);
    }

    #[test]
    fn test_vpn_range_iterates_half_open() {
        let pages: Vec<_> = VPNRange::new(VirtPageNum(3), VirtPageNum(6)).collect();
        assert_eq!(pages, vec![VirtPageNum(3), VirtPageNum(4), VirtPageNum(5)]);
        assert!(VPNRange::new(VirtPageNum(7), VirtPageNum(7)).is_empty());
    }
}
