use crate::types::{ExpectResult, TestDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Running,
    Done,
}

/// Stack of in-progress test frames. The bottom frame is the synthetic root
/// and is never popped.
#[derive(Debug, Clone)]
pub struct TestTracker {
    stack: Vec<TestDescriptor>,
    done: bool,
}

impl Default for TestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTracker {
    pub fn new() -> Self {
        Self {
            stack: vec![TestDescriptor::root()],
            done: false,
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.done {
            TrackerState::Done
        } else if self.stack.len() > 1 {
            TrackerState::Running
        } else {
            TrackerState::Idle
        }
    }

    /// Number of user frames currently open.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn push(&mut self, descriptor: impl Into<String>) {
        self.stack.push(TestDescriptor::new(descriptor));
    }

    /// Closes the innermost frame and appends it to its parent's children.
    /// Returns `false` when only the root is left.
    pub fn pop_into_parent(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        let Some(frame) = self.stack.pop() else {
            return false;
        };
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(frame);
        }
        true
    }

    /// Drops the innermost frame without attaching it, used when its body threw.
    pub fn discard_top(&mut self) -> Option<TestDescriptor> {
        if self.stack.len() <= 1 {
            return None;
        }
        self.stack.pop()
    }

    pub fn record(&mut self, result: ExpectResult) {
        if let Some(top) = self.stack.last_mut() {
            top.expect_results.push(result);
        }
    }

    pub fn current_descriptor(&self) -> &str {
        self.stack
            .last()
            .map(|frame| frame.descriptor.as_str())
            .unwrap_or_default()
    }

    /// Unwinds any frames left open and returns the root of the tree.
    pub fn finish(&mut self) -> TestDescriptor {
        while self.pop_into_parent() {}
        self.done = true;
        self.stack.pop().unwrap_or_else(TestDescriptor::root)
    }
}
