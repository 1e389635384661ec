//! Memory Set Management
//!
//! An address space is a root page table plus the segments (`MapArea`s)
//! mapped into it. Two kinds of segment exist:
//! - **Linear**: `ppn = vpn - pv_offset`, nothing is allocated. Used for the
//!   kernel image and the rest of physical memory (offset 0).
//! - **Framed**: every page gets its own frame, released on unmap.
//!
//! Every user address space starts from a fresh copy of the kernel's linear
//! segments, so traps can run kernel code without switching `satp`.

use super::frame_allocator::FrameAllocator;
use super::memory_layout::*;
use super::page_table::{PTEFlags, PageTable, PageTableEntry};
use crate::arch;
use crate::config::{PAGE_SIZE, USER_STACK_BASE, USER_STACK_SIZE};
use crate::loader::{self, ElfError};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use bitflags::bitflags;

/// Memory area map type
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MapType {
    /// Fixed-offset mapping, `ppn = vpn - pv_offset`
    Linear { pv_offset: usize },
    /// Framed mapping (allocate frames)
    Framed,
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct MapPermission: u8 {
        const R = 1 << 1;
        const W = 1 << 2;
        const X = 1 << 3;
        const U = 1 << 4;
    }
}

/// Section boundaries of the kernel image, as placed by the linker script
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelLayout {
    pub stext: usize,
    pub etext: usize,
    pub srodata: usize,
    pub erodata: usize,
    pub sdata: usize,
    pub edata: usize,
    pub sbss_with_stack: usize,
    pub ebss: usize,
    pub ekernel: usize,
    pub memory_end: usize,
}

impl KernelLayout {
    /// Read the section symbols exported by `linker.ld`
    #[cfg(target_os = "none")]
    pub fn from_linker() -> Self {
        extern "C" {
            fn stext();
            fn etext();
            fn srodata();
            fn erodata();
            fn sdata();
            fn edata();
            fn sbss_with_stack();
            fn ebss();
            fn ekernel();
        }
        Self {
            stext: stext as usize,
            etext: etext as usize,
            srodata: srodata as usize,
            erodata: erodata as usize,
            sdata: sdata as usize,
            edata: edata as usize,
            sbss_with_stack: sbss_with_stack as usize,
            ebss: ebss as usize,
            ekernel: ekernel as usize,
            memory_end: crate::config::MEMORY_END,
        }
    }

    /// The five kernel segments with their permissions
    pub fn segments(&self) -> [(&'static str, usize, usize, MapPermission); 5] {
        [
            (".text", self.stext, self.etext, MapPermission::R | MapPermission::X),
            (".rodata", self.srodata, self.erodata, MapPermission::R),
            (".data", self.sdata, self.edata, MapPermission::R | MapPermission::W),
            (".bss", self.sbss_with_stack, self.ebss, MapPermission::R | MapPermission::W),
            ("physical memory", self.ekernel, self.memory_end, MapPermission::R | MapPermission::W),
        ]
    }
}

/// One segment of an address space
pub struct MapArea {
    vpn_range: VPNRange,
    data_frames: BTreeMap<VirtPageNum, PhysPageNum>,
    map_type: MapType,
    map_perm: MapPermission,
}

impl MapArea {
    /// Segment covering `[start_va, end_va)`; a trailing partial page is included
    pub fn new(start_va: usize, end_va: usize, map_type: MapType, map_perm: MapPermission) -> Self {
        let start_vpn = VirtAddr(start_va).floor();
        let end_vpn = if end_va <= start_va {
            start_vpn
        } else {
            VirtAddr(end_va).ceil()
        };
        Self {
            vpn_range: VPNRange::new(start_vpn, end_vpn),
            data_frames: BTreeMap::new(),
            map_type,
            map_perm,
        }
    }

    /// Same geometry, no frames
    pub fn from_another(another: &MapArea) -> Self {
        Self {
            vpn_range: another.vpn_range,
            data_frames: BTreeMap::new(),
            map_type: another.map_type,
            map_perm: another.map_perm,
        }
    }

    pub fn vpn_range(&self) -> VPNRange {
        self.vpn_range
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn map_perm(&self) -> MapPermission {
        self.map_perm
    }

    fn map_one(
        &mut self,
        page_table: &mut PageTable,
        frames: &mut impl FrameAllocator,
        vpn: VirtPageNum,
    ) {
        let ppn = match self.map_type {
            MapType::Linear { pv_offset } => PhysPageNum(vpn.0 - pv_offset),
            MapType::Framed => {
                let frame = match frames.alloc_frame() {
                    Ok(frame) => frame,
                    Err(e) => panic!("cannot back {:?}: {}", vpn, e),
                };
                self.data_frames.insert(vpn, frame);
                frame
            }
        };
        let pte_flags = PTEFlags::from_bits_truncate(self.map_perm.bits());
        page_table.map(frames, vpn, ppn, pte_flags);
    }

    fn unmap_one(
        &mut self,
        page_table: &mut PageTable,
        frames: &mut impl FrameAllocator,
        vpn: VirtPageNum,
    ) {
        let ppn = page_table.unmap(vpn);
        if self.map_type == MapType::Framed {
            self.data_frames.remove(&vpn);
            frames.dealloc_frame(ppn);
        }
    }

    /// Map all pages in this area
    pub fn map(&mut self, page_table: &mut PageTable, frames: &mut impl FrameAllocator) {
        for vpn in self.vpn_range {
            self.map_one(page_table, frames, vpn);
        }
    }

    /// Unmap every page; framed pages go back to the allocator
    pub fn unmap(&mut self, page_table: &mut PageTable, frames: &mut impl FrameAllocator) {
        if let MapType::Linear { .. } = self.map_type {
            return;
        }
        for vpn in self.vpn_range {
            self.unmap_one(page_table, frames, vpn);
        }
    }

    /// Copy `data` into the area, starting `page_offset` bytes into the first page
    pub fn copy_data(&mut self, page_table: &PageTable, data: &[u8], page_offset: usize) {
        assert_eq!(self.map_type, MapType::Framed);
        let mut start: usize = 0;
        let mut offset = page_offset;
        let mut current_vpn = self.vpn_range.start();
        let len = data.len();
        while start < len {
            let chunk = (PAGE_SIZE - offset).min(len - start);
            let dst = match page_table.translate(current_vpn) {
                Some(pte) => &mut pte.ppn().get_bytes_array()[offset..offset + chunk],
                None => panic!("copy into unmapped {:?}", current_vpn),
            };
            dst.copy_from_slice(&data[start..start + chunk]);
            start += chunk;
            offset = 0;
            current_vpn = current_vpn + 1;
        }
    }
}

/// Memory set
pub struct MemorySet {
    page_table: PageTable,
    areas: Vec<MapArea>,
}

impl MemorySet {
    /// Create a new empty memory set
    pub fn new_bare(frames: &mut impl FrameAllocator) -> Self {
        Self {
            page_table: PageTable::new(frames),
            areas: Vec::new(),
        }
    }

    pub fn token(&self) -> usize {
        self.page_table.token()
    }

    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    pub fn areas(&self) -> &[MapArea] {
        &self.areas
    }

    /// Map `map_area` and optionally fill it with `data`
    pub fn push(
        &mut self,
        frames: &mut impl FrameAllocator,
        mut map_area: MapArea,
        data: Option<(&[u8], usize)>,
    ) {
        map_area.map(&mut self.page_table, frames);
        if let Some((data, page_offset)) = data {
            map_area.copy_data(&self.page_table, data, page_offset);
        }
        self.areas.push(map_area);
    }

    pub fn insert_framed_area(
        &mut self,
        frames: &mut impl FrameAllocator,
        start_va: usize,
        end_va: usize,
        permission: MapPermission,
    ) {
        self.push(
            frames,
            MapArea::new(start_va, end_va, MapType::Framed, permission),
            None,
        );
    }

    /// Kernel address space: the five linear segments of `layout`, identity mapped.
    ///
    /// Not activated; call `activate` to install it.
    pub fn new_kernel(frames: &mut impl FrameAllocator, layout: &KernelLayout) -> Self {
        let mut memory_set = Self::new_bare(frames);
        for (name, start, end, perm) in layout.segments() {
            log::trace!("mapping {} [{:#x}, {:#x})", name, start, end);
            memory_set.push(
                frames,
                MapArea::new(start, end, MapType::Linear { pv_offset: 0 }, perm),
                None,
            );
        }
        memory_set
    }

    /// User address space from an ELF image, layered on the kernel mapping.
    ///
    /// Returns the address space and the entry point; the user stack is
    /// mapped separately by `map_user_stack`.
    pub fn from_elf(
        frames: &mut impl FrameAllocator,
        layout: &KernelLayout,
        elf_data: &[u8],
    ) -> Result<(Self, usize), ElfError> {
        let segments = loader::segments_of(elf_data)?;
        let entry_point = loader::entry_point(elf_data)?;
        let mut memory_set = Self::new_kernel(frames, layout);
        for seg in segments {
            let data = &elf_data[seg.offset..seg.offset + seg.file_size];
            memory_set.push(
                frames,
                MapArea::new(seg.start_va, seg.end_va, MapType::Framed, seg.perm),
                Some((data, VirtAddr(seg.start_va).page_offset())),
            );
        }
        Ok((memory_set, entry_point))
    }

    /// Map the user stack at `USER_STACK_BASE` and return its top
    pub fn map_user_stack(&mut self, frames: &mut impl FrameAllocator) -> usize {
        let top = USER_STACK_BASE + USER_STACK_SIZE;
        self.insert_framed_area(
            frames,
            USER_STACK_BASE,
            top,
            MapPermission::R | MapPermission::W | MapPermission::U,
        );
        top
    }

    /// Same layout with fresh frames; framed pages are copied byte for byte
    pub fn duplicate(frames: &mut impl FrameAllocator, user_space: &MemorySet) -> Self {
        let mut memory_set = Self::new_bare(frames);
        for area in user_space.areas.iter() {
            let new_area = MapArea::from_another(area);
            memory_set.push(frames, new_area, None);
            if area.map_type == MapType::Framed {
                for vpn in area.vpn_range {
                    let src_ppn = match user_space.translate(vpn) {
                        Some(pte) => pte.ppn(),
                        None => panic!("framed {:?} has no frame", vpn),
                    };
                    let dst_ppn = match memory_set.translate(vpn) {
                        Some(pte) => pte.ppn(),
                        None => panic!("framed {:?} has no frame", vpn),
                    };
                    dst_ppn
                        .get_bytes_array()
                        .copy_from_slice(src_ppn.get_bytes_array());
                }
            }
        }
        memory_set
    }

    /// Activate this memory set (write satp register)
    pub fn activate(&self) {
        arch::activate(self.token());
    }

    pub fn translate(&self, vpn: VirtPageNum) -> Option<PageTableEntry> {
        self.page_table.translate(vpn)
    }

    /// Unmap every framed segment and return its frames; linear segments stay
    pub fn recycle_data_pages(&mut self, frames: &mut impl FrameAllocator) {
        let page_table = &mut self.page_table;
        self.areas.retain_mut(|area| match area.map_type {
            MapType::Framed => {
                area.unmap(page_table, frames);
                false
            }
            MapType::Linear { .. } => true,
        });
    }

    /// Tear the address space down: data pages, then page-table nodes
    pub fn release(mut self, frames: &mut impl FrameAllocator) {
        self.recycle_data_pages(frames);
        self.areas.clear();
        self.page_table.free(frames);
    }
}
