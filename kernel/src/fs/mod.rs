//! Flat in-memory filesystem
//!
//! One root directory of regular files, filled at boot with the embedded
//! user programs. Files created at run time live until the machine stops.

mod file;

pub use file::{Descriptor, Node, OpenFile};

use crate::error::{KernelError, KernelResult};
use alloc::string::String;
use alloc::vec::Vec;

/// `open` flag: create the file when it does not exist
pub const O_CREATE: u32 = 0x200;

/// Index of a file in the root directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode(usize);

struct RamFile {
    name: String,
    data: Vec<u8>,
}

#[derive(Default)]
pub struct RamFs {
    files: Vec<RamFile>,
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

impl RamFs {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Filesystem holding one file per `(name, contents)` pair
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Self {
        let mut fs = Self::new();
        for (name, data) in files {
            let inode = fs.create(name);
            fs.files[inode.0].data = data.to_vec();
        }
        fs
    }

    /// Resolve `path`; a leading `/` is ignored
    pub fn lookup(&self, path: &str) -> KernelResult<Inode> {
        let name = normalize(path);
        self.files
            .iter()
            .position(|f| f.name == name)
            .map(Inode)
            .ok_or(KernelError::NotFound)
    }

    /// Resolve `path`, creating an empty file when missing
    pub fn create(&mut self, path: &str) -> Inode {
        if let Ok(inode) = self.lookup(path) {
            return inode;
        }
        self.files.push(RamFile {
            name: String::from(normalize(path)),
            data: Vec::new(),
        });
        Inode(self.files.len() - 1)
    }

    pub fn size(&self, inode: Inode) -> usize {
        self.files[inode.0].data.len()
    }

    /// Copy the whole file into `dest` and return the bytes copied
    pub fn read_all(&self, inode: Inode, dest: &mut [u8]) -> usize {
        self.read_at(inode, 0, dest)
    }

    pub fn read_at(&self, inode: Inode, offset: usize, dest: &mut [u8]) -> usize {
        let data = &self.files[inode.0].data;
        if offset >= data.len() {
            return 0;
        }
        let n = dest.len().min(data.len() - offset);
        dest[..n].copy_from_slice(&data[offset..offset + n]);
        n
    }

    /// Write `src` at `offset`, growing the file as needed
    pub fn write_at(&mut self, inode: Inode, offset: usize, src: &[u8]) -> usize {
        let data = &mut self.files[inode.0].data;
        if data.len() < offset + src.len() {
            data.resize(offset + src.len(), 0);
        }
        data[offset..offset + src.len()].copy_from_slice(src);
        src.len()
    }

    /// File names in creation order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.name.as_str())
    }
}
