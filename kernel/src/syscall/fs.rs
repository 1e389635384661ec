//! File and console syscalls

use super::to_ret;
use crate::arch;
use crate::config::MAX_PATH_LEN;
use crate::error::{KernelError, KernelResult};
use crate::fs::{Descriptor, Node, O_CREATE};
use crate::state::{kernel, KernelState};
use crate::task::{suspend_current_and_run_next, Pid};

impl KernelState {
    /// Open `path` for `pid` and return the new descriptor.
    ///
    /// `/` opens the root directory, whose contents read as a name listing.
    pub fn open(&mut self, pid: Pid, path: &str, flags: u32) -> KernelResult<usize> {
        let node = if path.trim_start_matches('/').is_empty() {
            Node::Root
        } else if flags & O_CREATE != 0 {
            Node::File(self.fs.create(path))
        } else {
            Node::File(self.fs.lookup(path)?)
        };
        let task = self.tasks.get_mut(pid).ok_or(KernelError::NoCurrentTask)?;
        Ok(task.alloc_fd(Descriptor::open(node)))
    }

    pub fn close(&mut self, pid: Pid, fd: usize) -> KernelResult<()> {
        self.tasks
            .get_mut(pid)
            .ok_or(KernelError::NoCurrentTask)?
            .close_fd(fd)
    }

    /// Read up to `len` bytes into user memory at `buf`.
    ///
    /// `None` means the console has no byte ready yet.
    pub fn read(&mut self, pid: Pid, fd: usize, buf: usize, len: usize) -> KernelResult<Option<usize>> {
        let task = self.tasks.get(pid).ok_or(KernelError::NoCurrentTask)?;
        let desc = task.fd(fd)?;
        let buffers = task.memory_set.page_table().translated_byte_buffer(buf, len)?;
        match desc {
            Descriptor::Stdin => {
                let Some(first) = buffers.into_iter().next() else {
                    return Ok(Some(0));
                };
                match arch::console_getchar() {
                    Some(ch) => {
                        first[0] = ch;
                        Ok(Some(1))
                    }
                    None => Ok(None),
                }
            }
            Descriptor::Stdout => Err(KernelError::BadFileDescriptor),
            Descriptor::File(file) => {
                let mut file = file.lock();
                let mut total = 0;
                for chunk in buffers {
                    let n = file.read(&self.fs, chunk);
                    total += n;
                    if n < chunk.len() {
                        break;
                    }
                }
                Ok(Some(total))
            }
        }
    }

    /// Write `len` bytes of user memory at `buf`
    pub fn write(&mut self, pid: Pid, fd: usize, buf: usize, len: usize) -> KernelResult<usize> {
        let task = self.tasks.get(pid).ok_or(KernelError::NoCurrentTask)?;
        let desc = task.fd(fd)?;
        let buffers = task.memory_set.page_table().translated_byte_buffer(buf, len)?;
        match desc {
            Descriptor::Stdout => {
                for chunk in buffers {
                    chunk.iter().for_each(|&ch| arch::console_putchar(ch));
                }
                Ok(len)
            }
            Descriptor::Stdin => Err(KernelError::BadFileDescriptor),
            Descriptor::File(file) => {
                let mut file = file.lock();
                let mut total = 0;
                for chunk in buffers {
                    total += file
                        .write(&mut self.fs, chunk)
                        .ok_or(KernelError::BadFileDescriptor)?;
                }
                Ok(total)
            }
        }
    }
}

pub fn sys_putchar(ch: usize) -> isize {
    arch::console_putchar(ch as u8);
    0
}

fn open_current(state: &mut KernelState, path: usize, flags: u32) -> KernelResult<usize> {
    let pid = state.current_pid()?;
    let path = state
        .current_task()?
        .memory_set
        .page_table()
        .translated_str(path, MAX_PATH_LEN)?;
    state.open(pid, &path, flags)
}

pub fn sys_open(path: usize, flags: u32) -> isize {
    to_ret(open_current(&mut kernel(), path, flags))
}

pub fn sys_close(fd: usize) -> isize {
    let mut state = kernel();
    let result = state.current_pid().and_then(|pid| state.close(pid, fd));
    to_ret(result.map(|()| 0))
}

/// Read from `fd`; console reads yield until a byte arrives
pub fn sys_read(fd: usize, buf: usize, len: usize) -> isize {
    loop {
        let result = {
            let mut state = kernel();
            state.current_pid().and_then(|pid| state.read(pid, fd, buf, len))
        };
        match result {
            Ok(Some(n)) => return n as isize,
            Ok(None) => suspend_current_and_run_next(),
            Err(err) => return to_ret(Err(err)),
        }
    }
}

pub fn sys_write(fd: usize, buf: usize, len: usize) -> isize {
    let mut state = kernel();
    let result = state.current_pid().and_then(|pid| state.write(pid, fd, buf, len));
    to_ret(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{USER_STACK_BASE, USER_STACK_SIZE};
    use crate::mm::VirtAddr;
    use crate::test_util::{test_kernel, Arena};

    const SCRATCH: usize = USER_STACK_BASE + USER_STACK_SIZE - 0x100;

    fn fill(state: &KernelState, pid: Pid, va: usize, bytes: &[u8]) {
        let task = state.tasks.get(pid).unwrap();
        let mut at = 0;
        for chunk in task.memory_set.page_table().translated_byte_buffer(va, bytes.len()).unwrap() {
            chunk.copy_from_slice(&bytes[at..at + chunk.len()]);
            at += chunk.len();
        }
    }

    fn peek(state: &KernelState, pid: Pid, va: usize, len: usize) -> alloc::vec::Vec<u8> {
        let task = state.tasks.get(pid).unwrap();
        task.memory_set
            .page_table()
            .translated_byte_buffer(va, len)
            .unwrap()
            .into_iter()
            .flat_map(|chunk| chunk.iter().copied())
            .collect()
    }

    #[test]
    fn test_write_to_stdout() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let pid = state.spawn_root("initproc").unwrap();
        fill(&state, pid, SCRATCH, b"hello\n");
        arch::take_output();
        assert_eq!(state.write(pid, 1, SCRATCH, 6), Ok(6));
        assert_eq!(arch::take_output(), b"hello\n");
        assert_eq!(state.write(pid, 0, SCRATCH, 6), Err(KernelError::BadFileDescriptor));
    }

    #[test]
    fn test_stdin_reads_one_byte_at_a_time() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let pid = state.spawn_root("initproc").unwrap();
        assert_eq!(state.read(pid, 0, SCRATCH, 4), Ok(None));
        arch::push_input(b"ls");
        assert_eq!(state.read(pid, 0, SCRATCH, 4), Ok(Some(1)));
        assert_eq!(peek(&state, pid, SCRATCH, 1), b"l");
        assert_eq!(state.read(pid, 0, SCRATCH, 4), Ok(Some(1)));
        assert_eq!(peek(&state, pid, SCRATCH, 1), b"s");
        assert_eq!(state.read(pid, 0, SCRATCH, 4), Ok(None));
    }

    #[test]
    fn test_open_missing_file() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let pid = state.spawn_root("initproc").unwrap();
        assert_eq!(state.open(pid, "missing", 0), Err(KernelError::NotFound));
        assert_eq!(state.open(pid, "missing", O_CREATE), Ok(2));
        assert_eq!(state.open(pid, "/missing", 0), Ok(3));
    }

    #[test]
    fn test_file_write_then_read_back() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let pid = state.spawn_root("initproc").unwrap();
        let fd = state.open(pid, "notes", O_CREATE).unwrap();
        fill(&state, pid, SCRATCH, b"abcdef");
        assert_eq!(state.write(pid, fd, SCRATCH, 6), Ok(6));
        state.close(pid, fd).unwrap();
        assert_eq!(state.close(pid, fd), Err(KernelError::BadFileDescriptor));

        let fd = state.open(pid, "notes", 0).unwrap();
        assert_eq!(state.read(pid, fd, SCRATCH + 0x80, 4), Ok(Some(4)));
        assert_eq!(peek(&state, pid, SCRATCH + 0x80, 4), b"abcd");
        assert_eq!(state.read(pid, fd, SCRATCH + 0x80, 4), Ok(Some(2)));
        assert_eq!(state.read(pid, fd, SCRATCH + 0x80, 4), Ok(Some(0)));
    }

    #[test]
    fn test_fork_shares_file_offset() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let root = state.spawn_root("initproc").unwrap();
        let fd = state.open(root, "initproc", 0).unwrap();
        let child = state.fork(root).unwrap();
        assert_eq!(state.read(root, fd, SCRATCH, 4), Ok(Some(4)));
        assert_eq!(state.read(child, fd, SCRATCH, 4), Ok(Some(4)));
        // The child continued where the parent stopped
        assert_eq!(peek(&state, child, SCRATCH, 4), peek_file(&state, "initproc", 4, 4));
    }

    fn peek_file(state: &KernelState, path: &str, offset: usize, len: usize) -> alloc::vec::Vec<u8> {
        let inode = state.fs.lookup(path).unwrap();
        let mut buf = alloc::vec![0u8; len];
        state.fs.read_at(inode, offset, &mut buf);
        buf
    }

    #[test]
    fn test_root_directory_lists_files() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let pid = state.spawn_root("initproc").unwrap();
        let fd = state.open(pid, "/", 0).unwrap();
        let n = state.read(pid, fd, SCRATCH, 64).unwrap().unwrap();
        assert_eq!(peek(&state, pid, SCRATCH, n), b"initproc\nhello\n");
        assert_eq!(state.write(pid, fd, SCRATCH, 1), Err(KernelError::BadFileDescriptor));
    }

    #[test]
    fn test_bad_user_buffer() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let pid = state.spawn_root("initproc").unwrap();
        assert_eq!(state.write(pid, 1, 0x4000_0000, 4), Err(KernelError::BadAddress));
        assert_eq!(state.write(pid, 9, SCRATCH, 4), Err(KernelError::BadFileDescriptor));
    }

    #[test]
    fn test_kernel_memory_is_not_a_user_buffer() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let pid = state.spawn_root("initproc").unwrap();
        let kernel_data = state.layout.sdata;
        let kernel_text = state.layout.stext;
        // Mapped in every user space, but without `U`
        assert!(state.tasks.get(pid).unwrap().memory_set.translate(VirtAddr(kernel_data).floor()).is_some());

        arch::take_output();
        assert_eq!(state.write(pid, 1, kernel_data, 8), Err(KernelError::BadAddress));
        assert!(arch::take_output().is_empty());
        let fd = state.open(pid, "initproc", 0).unwrap();
        assert_eq!(state.read(pid, fd, kernel_data, 8), Err(KernelError::BadAddress));
        assert_eq!(open_path_at(&mut state, pid, kernel_text), Err(KernelError::BadAddress));
    }

    fn open_path_at(state: &mut KernelState, pid: Pid, va: usize) -> KernelResult<usize> {
        let path = state
            .tasks
            .get(pid)
            .unwrap()
            .memory_set
            .page_table()
            .translated_str(va, MAX_PATH_LEN)?;
        state.open(pid, &path, 0)
    }
}
