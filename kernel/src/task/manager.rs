//! Task Manager
//!
//! Owns every task, indexed by pid, and the FIFO ready queue

use super::pid::Pid;
use super::task::TaskControlBlock;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

#[derive(Default)]
pub struct TaskManager {
    tasks: Vec<Option<TaskControlBlock>>,
    ready_queue: VecDeque<Pid>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            ready_queue: VecDeque::new(),
        }
    }

    pub fn insert(&mut self, task: TaskControlBlock) {
        let pid = task.pid;
        if self.tasks.len() <= pid {
            self.tasks.resize_with(pid + 1, || None);
        }
        assert!(self.tasks[pid].is_none(), "pid {} is already in use", pid);
        self.tasks[pid] = Some(task);
    }

    pub fn remove(&mut self, pid: Pid) -> Option<TaskControlBlock> {
        self.tasks.get_mut(pid)?.take()
    }

    pub fn get(&self, pid: Pid) -> Option<&TaskControlBlock> {
        self.tasks.get(pid)?.as_ref()
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut TaskControlBlock> {
        self.tasks.get_mut(pid)?.as_mut()
    }

    /// Append to the tail of the ready queue
    pub fn add_ready(&mut self, pid: Pid) {
        self.ready_queue.push_back(pid);
    }

    /// Take the task at the head of the ready queue
    pub fn fetch(&mut self) -> Option<Pid> {
        self.ready_queue.pop_front()
    }

    pub fn ready_len(&self) -> usize {
        self.ready_queue.len()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::{test_kernel, Arena};

    #[test]
    fn test_ready_queue_is_fifo() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let first = state.create_task_from("hello").unwrap();
        let second = state.create_task_from("initproc").unwrap();
        assert_eq!(state.tasks.task_count(), 2);
        assert_eq!(state.tasks.ready_len(), 2);
        assert_eq!(state.tasks.fetch(), Some(first));
        assert_eq!(state.tasks.fetch(), Some(second));
        assert_eq!(state.tasks.fetch(), None);
    }

    #[test]
    fn test_tasks_are_indexed_by_pid() {
        let arena = Arena::new(8 << 20);
        let mut state = test_kernel(&arena);
        let pid = state.create_task_from("hello").unwrap();
        assert_eq!(state.tasks.get(pid).map(|t| t.pid), Some(pid));
        assert!(state.tasks.get(pid + 1).is_none());
        let task = state.tasks.remove(pid).unwrap();
        assert_eq!(task.pid, pid);
        assert!(state.tasks.get(pid).is_none());
        assert!(state.tasks.remove(pid).is_none());
        assert_eq!(state.tasks.task_count(), 0);
    }
}
