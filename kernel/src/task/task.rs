//! Task Control Block
//!
//! Defines the structure and operations for tasks (processes)

use super::context::TaskContext;
use super::pid::{KernelStack, Pid};
use crate::error::{KernelError, KernelResult};
use crate::fs::Descriptor;
use crate::mm::MemorySet;
use crate::trap::TrapContext;
use alloc::vec;
use alloc::vec::Vec;

/// Task State
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Ready,
    Running,
    /// Zombie waiting for its parent's `wait`
    Exited,
}

pub struct TaskControlBlock {
    pub pid: Pid,
    pub status: TaskStatus,
    pub kernel_stack: KernelStack,
    pub task_cx: TaskContext,
    pub memory_set: MemorySet,
    /// Lookup only; the task manager owns every task
    pub parent: Option<Pid>,
    pub children: Vec<Pid>,
    pub fd_table: Vec<Option<Descriptor>>,
    pub exit_code: i32,
}

impl TaskControlBlock {
    pub fn new(
        pid: Pid,
        kernel_stack: KernelStack,
        memory_set: MemorySet,
        parent: Option<Pid>,
        fd_table: Vec<Option<Descriptor>>,
    ) -> Self {
        let task_cx = TaskContext::goto_restore(kernel_stack.trap_cx_addr(), memory_set.token());
        Self {
            pid,
            status: TaskStatus::Ready,
            kernel_stack,
            task_cx,
            memory_set,
            parent,
            children: Vec::new(),
            fd_table,
            exit_code: 0,
        }
    }

    /// Descriptor table of a fresh task: console input and output
    pub fn stdio() -> Vec<Option<Descriptor>> {
        vec![Some(Descriptor::Stdin), Some(Descriptor::Stdout)]
    }

    pub fn trap_cx(&self) -> &'static mut TrapContext {
        self.kernel_stack.trap_cx()
    }

    pub fn user_token(&self) -> usize {
        self.memory_set.token()
    }

    pub fn is_exited(&self) -> bool {
        self.status == TaskStatus::Exited
    }

    /// Store `desc` in the lowest free slot and return its fd
    pub fn alloc_fd(&mut self, desc: Descriptor) -> usize {
        match self.fd_table.iter().position(|slot| slot.is_none()) {
            Some(fd) => {
                self.fd_table[fd] = Some(desc);
                fd
            }
            None => {
                self.fd_table.push(Some(desc));
                self.fd_table.len() - 1
            }
        }
    }

    pub fn fd(&self, fd: usize) -> KernelResult<Descriptor> {
        self.fd_table
            .get(fd)
            .cloned()
            .flatten()
            .ok_or(KernelError::BadFileDescriptor)
    }

    pub fn close_fd(&mut self, fd: usize) -> KernelResult<()> {
        match self.fd_table.get_mut(fd) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                Ok(())
            }
            _ => Err(KernelError::BadFileDescriptor),
        }
    }
}
