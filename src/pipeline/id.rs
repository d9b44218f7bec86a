//! Identity types for the pipeline system.
//!
//! `TaskId` is a newtype over `u32` that doubles as the index into the
//! supervisor's task list.

use std::fmt;

/// Index into `Pipeline::tasks`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TaskId(pub u32);

impl TaskId {
    pub const INVALID: TaskId = TaskId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "TaskId(INVALID)")
        } else {
            write!(f, "TaskId({})", self.0)
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id() {
        let id = TaskId(42);
        assert!(id.is_valid());
        assert_eq!(id.index(), 42);
        assert!(!TaskId::INVALID.is_valid());
    }

    #[test]
    fn test_task_id_display() {
        assert_eq!(TaskId(3).to_string(), "TaskId(3)");
        assert_eq!(TaskId::INVALID.to_string(), "TaskId(INVALID)");
    }
}
