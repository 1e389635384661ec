//! ELF program images
//!
//! Parsing is done by `xmas-elf`; this module turns the program headers into
//! the loadable segments the memory manager maps.

pub mod apps;

use crate::mm::MapPermission;
use alloc::vec::Vec;
use core::fmt;
use xmas_elf::header::Class;
use xmas_elf::program::Type;
use xmas_elf::ElfFile;

/// `e_machine` value for RISC-V
const EM_RISCV: u16 = 0xF3;

/// Offset of `e_machine` inside the ELF header
const E_MACHINE_OFFSET: usize = 18;

/// Size of one 64-bit program header
const PH_ENTRY_SIZE: usize = 56;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    /// Header rejected by the parser (bad magic, truncated header)
    Malformed(&'static str),
    NotElf64,
    WrongMachine(u16),
    /// Program header table or segment data lies outside the image
    OutOfBounds,
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElfError::Malformed(msg) => write!(f, "malformed ELF: {}", msg),
            ElfError::NotElf64 => write!(f, "not a 64-bit ELF"),
            ElfError::WrongMachine(m) => write!(f, "not a RISC-V ELF (machine {:#x})", m),
            ElfError::OutOfBounds => write!(f, "ELF data out of bounds"),
        }
    }
}

/// A `PT_LOAD` segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSegment {
    pub start_va: usize,
    /// `start_va + mem_size`
    pub end_va: usize,
    pub perm: MapPermission,
    /// File offset of the initialised bytes
    pub offset: usize,
    pub file_size: usize,
}

fn parse(image: &[u8]) -> Result<ElfFile<'_>, ElfError> {
    let elf = ElfFile::new(image).map_err(ElfError::Malformed)?;
    if !matches!(elf.header.pt1.class(), Class::SixtyFour) {
        return Err(ElfError::NotElf64);
    }
    let machine = u16::from_le_bytes([image[E_MACHINE_OFFSET], image[E_MACHINE_OFFSET + 1]]);
    if machine != EM_RISCV {
        return Err(ElfError::WrongMachine(machine));
    }
    let ph_offset = elf.header.pt2.ph_offset() as usize;
    let ph_count = elf.header.pt2.ph_count() as usize;
    let table_end = ph_count
        .checked_mul(PH_ENTRY_SIZE)
        .and_then(|size| size.checked_add(ph_offset))
        .ok_or(ElfError::OutOfBounds)?;
    if elf.header.pt2.ph_entry_size() as usize != PH_ENTRY_SIZE || table_end > image.len() {
        return Err(ElfError::OutOfBounds);
    }
    Ok(elf)
}

/// Loadable segments in program-header order, with user permissions
pub fn segments_of(image: &[u8]) -> Result<Vec<ProgramSegment>, ElfError> {
    let elf = parse(image)?;
    let mut segments = Vec::new();
    for i in 0..elf.header.pt2.ph_count() {
        let ph = elf.program_header(i).map_err(ElfError::Malformed)?;
        if ph.get_type().map_err(ElfError::Malformed)? != Type::Load {
            continue;
        }
        let start_va = ph.virtual_addr() as usize;
        let end_va = start_va
            .checked_add(ph.mem_size() as usize)
            .ok_or(ElfError::OutOfBounds)?;
        let offset = ph.offset() as usize;
        let file_size = ph.file_size() as usize;
        if offset.checked_add(file_size).map_or(true, |end| end > image.len())
            || file_size > end_va - start_va
        {
            return Err(ElfError::OutOfBounds);
        }

        let mut perm = MapPermission::U;
        let flags = ph.flags();
        if flags.is_read() {
            perm |= MapPermission::R;
        }
        if flags.is_write() {
            perm |= MapPermission::W;
        }
        if flags.is_execute() {
            perm |= MapPermission::X;
        }
        segments.push(ProgramSegment {
            start_va,
            end_va,
            perm,
            offset,
            file_size,
        });
    }
    Ok(segments)
}

pub fn entry_point(image: &[u8]) -> Result<usize, ElfError> {
    Ok(parse(image)?.header.pt2.entry_point() as usize)
}
