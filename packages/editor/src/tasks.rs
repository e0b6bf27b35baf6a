//! Cooperative task queue.
//!
//! Work that must observe the UI state *after* the current event has been
//! handled is scheduled here and runs on the next turn.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Store the live selection as the saved range
    CaptureSelection,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Tasks queued before this call. Anything scheduled while they run
    /// waits for the next turn.
    pub fn take_turn(&mut self) -> Vec<Task> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_only_takes_queued_tasks() {
        let mut queue = TaskQueue::new();
        queue.schedule(Task::CaptureSelection);
        let turn = queue.take_turn();
        queue.schedule(Task::CaptureSelection);

        assert_eq!(turn, vec![Task::CaptureSelection]);
        assert_eq!(queue.len(), 1);
    }
}
