//! Scheduler
//!
//! Round-robin over the ready queue. The processor record remembers which
//! task is running and the idle context that `run_tasks` resumes between
//! tasks.

use super::context::TaskContext;
use super::pid::Pid;
use super::task::{TaskControlBlock, TaskStatus};
use crate::error::{KernelError, KernelResult};
use crate::state::KernelState;

#[derive(Default)]
pub struct Processor {
    current: Option<Pid>,
    idle_task_cx: TaskContext,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    pub fn take_current(&mut self) -> Option<Pid> {
        self.current.take()
    }

    pub fn idle_task_cx_ptr(&mut self) -> *mut TaskContext {
        &mut self.idle_task_cx as *mut _
    }
}

impl KernelState {
    pub fn current_pid(&self) -> KernelResult<Pid> {
        self.processor.current().ok_or(KernelError::NoCurrentTask)
    }

    pub fn current_task(&self) -> KernelResult<&TaskControlBlock> {
        let pid = self.current_pid()?;
        self.tasks.get(pid).ok_or(KernelError::NoCurrentTask)
    }

    /// Pick the next ready task and make it current
    pub fn schedule_next(&mut self) -> Option<Pid> {
        let pid = self.tasks.fetch()?;
        let task = match self.tasks.get_mut(pid) {
            Some(task) => task,
            None => panic!("ready queue holds unknown pid {}", pid),
        };
        assert_eq!(task.status, TaskStatus::Ready, "pid {} queued while not ready", pid);
        task.status = TaskStatus::Running;
        self.processor.current = Some(pid);
        log::trace!("schedule pid {}", pid);
        Some(pid)
    }

    /// Move the running task back to the tail of the ready queue
    pub fn suspend_current(&mut self) -> KernelResult<Pid> {
        let pid = self
            .processor
            .take_current()
            .ok_or(KernelError::NoCurrentTask)?;
        if let Some(task) = self.tasks.get_mut(pid) {
            task.status = TaskStatus::Ready;
        }
        self.tasks.add_ready(pid);
        Ok(pid)
    }

    /// Where `__switch` saves or loads the kernel context of `pid`
    pub fn task_cx_ptr(&mut self, pid: Pid) -> *mut TaskContext {
        match self.tasks.get_mut(pid) {
            Some(task) => &mut task.task_cx as *mut _,
            None => panic!("no task with pid {}", pid),
        }
    }
}
