//! Per-task file descriptors

use super::{Inode, RamFs};
use alloc::sync::Arc;
use spin::Mutex;

/// What an open descriptor refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    File(Inode),
    /// The root directory; reading it lists file names, one per line
    Root,
}

/// An open file with its own offset, shared by every descriptor copied by `fork`
#[derive(Debug)]
pub struct OpenFile {
    node: Node,
    offset: usize,
}

impl OpenFile {
    pub fn new(node: Node) -> Self {
        Self { node, offset: 0 }
    }

    pub fn read(&mut self, fs: &RamFs, buf: &mut [u8]) -> usize {
        let n = match self.node {
            Node::File(inode) => fs.read_at(inode, self.offset, buf),
            Node::Root => {
                let mut listing = alloc::vec::Vec::new();
                for name in fs.names() {
                    listing.extend_from_slice(name.as_bytes());
                    listing.push(b'\n');
                }
                let start = self.offset.min(listing.len());
                let n = buf.len().min(listing.len() - start);
                buf[..n].copy_from_slice(&listing[start..start + n]);
                n
            }
        };
        self.offset += n;
        n
    }

    /// Write at the current offset; the root directory is read-only
    pub fn write(&mut self, fs: &mut RamFs, buf: &[u8]) -> Option<usize> {
        match self.node {
            Node::File(inode) => {
                let n = fs.write_at(inode, self.offset, buf);
                self.offset += n;
                Some(n)
            }
            Node::Root => None,
        }
    }
}

/// Entry of a task's descriptor table
#[derive(Debug, Clone)]
pub enum Descriptor {
    Stdin,
    Stdout,
    File(Arc<Mutex<OpenFile>>),
}

impl Descriptor {
    pub fn open(node: Node) -> Self {
        Descriptor::File(Arc::new(Mutex::new(OpenFile::new(node))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_shared_between_copies() {
        let fs = RamFs::with_files([("f", &b"abcdef"[..])]);
        let inode = fs.lookup("f").unwrap();
        let first = Descriptor::open(Node::File(inode));
        let second = first.clone();
        let (Descriptor::File(a), Descriptor::File(b)) = (&first, &second) else {
            panic!("expected files");
        };
        let mut buf = [0u8; 2];
        assert_eq!(a.lock().read(&fs, &mut buf), 2);
        assert_eq!(b.lock().read(&fs, &mut buf), 2);
        assert_eq!(&buf, b"cd");
    }

    #[test]
    fn test_root_lists_names() {
        let mut fs = RamFs::with_files([("hello", &b""[..])]);
        fs.create("notes");
        let mut root = OpenFile::new(Node::Root);
        let mut buf = [0u8; 64];
        let n = root.read(&fs, &mut buf);
        assert_eq!(&buf[..n], b"hello\nnotes\n");
        assert_eq!(root.read(&fs, &mut buf), 0);
        assert_eq!(root.write(&mut fs, b"x"), None);
    }
}
