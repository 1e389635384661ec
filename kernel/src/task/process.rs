//! Process lifecycle: creation, fork, exec, exit and wait
//!
//! Resource split: `exit` releases the framed pages and the descriptor
//! table right away; `wait` releases the page-table frames, the kernel stack,
//! the pid and the PCB record of the zombie it reaps.

use super::pid::{KernelStack, Pid};
use super::task::{TaskControlBlock, TaskStatus};
use crate::error::{KernelError, KernelResult};
use crate::mm::MemorySet;
use crate::state::KernelState;
use crate::trap::TrapContext;
use alloc::vec;
use alloc::vec::Vec;

/// What the caller of `exit` has to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Switch to the next ready task
    Continue,
    /// The root task is gone; stop the machine
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Reaped { pid: Pid, exit_code: i32 },
    /// Children exist but none has exited yet
    Pending,
    NoChild,
}

impl KernelState {
    fn load_image(&self, path: &str) -> KernelResult<Vec<u8>> {
        let inode = self.fs.lookup(path)?;
        let mut image = vec![0u8; self.fs.size(inode)];
        self.fs.read_all(inode, &mut image);
        Ok(image)
    }

    /// User address space with its stack; a malformed image is fatal
    fn build_user_space(&mut self, name: &str, elf: &[u8]) -> (MemorySet, usize, usize) {
        let (mut memory_set, entry) = match MemorySet::from_elf(&mut self.frames, &self.layout, elf) {
            Ok(loaded) => loaded,
            Err(err) => panic!("cannot load {}: {}", name, err),
        };
        let user_sp = memory_set.map_user_stack(&mut self.frames);
        (memory_set, entry, user_sp)
    }

    /// New parentless task running `elf` from its entry point, enqueued Ready
    pub fn create_task(&mut self, name: &str, elf: &[u8]) -> KernelResult<Pid> {
        let pid = self.pids.alloc()?;
        let kernel_stack = match KernelStack::new(&mut self.frames) {
            Ok(stack) => stack,
            Err(err) => {
                self.pids.dealloc(pid);
                return Err(err);
            }
        };
        let (memory_set, entry, user_sp) = self.build_user_space(name, elf);
        *kernel_stack.trap_cx() = TrapContext::app_init_context(entry, user_sp, kernel_stack.top());
        let task = TaskControlBlock::new(
            pid,
            kernel_stack,
            memory_set,
            None,
            TaskControlBlock::stdio(),
        );
        self.tasks.insert(task);
        self.tasks.add_ready(pid);
        log::debug!("created pid {} from {}", pid, name);
        Ok(pid)
    }

    /// `create_task` with the image read from the filesystem
    pub fn create_task_from(&mut self, path: &str) -> KernelResult<Pid> {
        let image = self.load_image(path)?;
        self.create_task(path, &image)
    }

    /// Create the permanent root task that adopts orphans
    pub fn spawn_root(&mut self, path: &str) -> KernelResult<Pid> {
        let pid = self.create_task_from(path)?;
        self.root = Some(pid);
        log::info!("root task {} is pid {}", path, pid);
        Ok(pid)
    }

    /// Copy `parent` into a new Ready child and return the child's pid.
    ///
    /// The child resumes at the same user pc with `a0 = 0`.
    pub fn fork(&mut self, parent: Pid) -> KernelResult<Pid> {
        if self.tasks.get(parent).is_none() {
            return Err(KernelError::NoCurrentTask);
        }
        let pid = self.pids.alloc()?;
        let kernel_stack = match KernelStack::new(&mut self.frames) {
            Ok(stack) => stack,
            Err(err) => {
                self.pids.dealloc(pid);
                return Err(err);
            }
        };
        let Some(parent_task) = self.tasks.get(parent) else {
            return Err(KernelError::NoCurrentTask);
        };
        let memory_set = MemorySet::duplicate(&mut self.frames, &parent_task.memory_set);

        let mut trap_cx = *parent_task.trap_cx();
        trap_cx.x[10] = 0;
        trap_cx.kernel_sp = kernel_stack.top();
        *kernel_stack.trap_cx() = trap_cx;

        let fd_table = parent_task.fd_table.clone();
        let child = TaskControlBlock::new(pid, kernel_stack, memory_set, Some(parent), fd_table);
        self.tasks.insert(child);
        if let Some(parent_task) = self.tasks.get_mut(parent) {
            parent_task.children.push(pid);
        }
        self.tasks.add_ready(pid);
        log::debug!("pid {} forked pid {}", parent, pid);
        Ok(pid)
    }

    /// Replace the image of `pid` with the program at `path`.
    ///
    /// The pid, kernel stack and stdio descriptors survive.
    pub fn exec(&mut self, pid: Pid, path: &str) -> KernelResult<()> {
        if self.tasks.get(pid).is_none() {
            return Err(KernelError::NoCurrentTask);
        }
        let image = self.load_image(path)?;
        let (memory_set, entry, user_sp) = self.build_user_space(path, &image);
        if self.processor.current() == Some(pid) {
            memory_set.activate();
        }
        let Some(task) = self.tasks.get_mut(pid) else {
            return Err(KernelError::NoCurrentTask);
        };
        let old = core::mem::replace(&mut task.memory_set, memory_set);
        old.release(&mut self.frames);
        task.task_cx.satp = task.memory_set.token();
        *task.trap_cx() = TrapContext::app_init_context(entry, user_sp, task.kernel_stack.top());
        task.fd_table.truncate(2);
        log::debug!("pid {} exec {}", pid, path);
        Ok(())
    }

    /// Turn `pid` into a zombie and hand its children to the root task
    pub fn exit(&mut self, pid: Pid, exit_code: i32) -> ExitOutcome {
        if self.root == Some(pid) {
            log::info!("root task exited with code {}", exit_code);
            return ExitOutcome::Shutdown;
        }
        let root = self.root;
        let Some(task) = self.tasks.get_mut(pid) else {
            panic!("exit of unknown pid {}", pid);
        };
        task.status = TaskStatus::Exited;
        task.exit_code = exit_code;
        task.memory_set.recycle_data_pages(&mut self.frames);
        task.fd_table.clear();
        let children = core::mem::take(&mut task.children);

        if self.processor.current() == Some(pid) {
            self.processor.take_current();
        }
        for &child in &children {
            if let Some(task) = self.tasks.get_mut(child) {
                task.parent = root;
            }
        }
        if let Some(root_task) = root.and_then(|root| self.tasks.get_mut(root)) {
            root_task.children.extend(children);
        }
        log::debug!("pid {} exited with code {}", pid, exit_code);
        ExitOutcome::Continue
    }

    /// Reap one exited child of `pid`
    pub fn wait(&mut self, pid: Pid) -> KernelResult<WaitOutcome> {
        let Some(task) = self.tasks.get(pid) else {
            return Err(KernelError::NoCurrentTask);
        };
        if task.children.is_empty() {
            return Ok(WaitOutcome::NoChild);
        }
        let zombie = task
            .children
            .iter()
            .position(|&child| self.tasks.get(child).is_some_and(|t| t.is_exited()));
        let Some(index) = zombie else {
            return Ok(WaitOutcome::Pending);
        };
        let child = match self.tasks.get_mut(pid) {
            Some(task) => task.children.remove(index),
            None => return Err(KernelError::NoCurrentTask),
        };
        let Some(zombie) = self.tasks.remove(child) else {
            panic!("child pid {} has no PCB", child);
        };
        zombie.memory_set.release(&mut self.frames);
        zombie.kernel_stack.release(&mut self.frames);
        self.pids.dealloc(child);
        log::debug!("pid {} reaped pid {}", pid, child);
        Ok(WaitOutcome::Reaped {
            pid: child,
            exit_code: zombie.exit_code,
        })
    }
}
