use std::sync::{Arc, Weak};

use pipemux_pipe::{Pipe, PipeId};

#[derive(Debug)]
struct Member {
    id: PipeId,
    pipe: Weak<dyn Pipe>,
}

/// Ordered rotation of eligible pipes plus the selector's cursor.
///
/// When the set is non-empty, `current` always indexes a member. Removal
/// keeps the rotation order of the remaining members, and a cursor that
/// pointed at the removed member moves to its successor.
#[derive(Debug, Default)]
pub(crate) struct ActiveSet {
    members: Vec<Member>,
    current: usize,
}

impl ActiveSet {
    /// Add a pipe at the end of the rotation. Returns false if already present.
    pub(crate) fn insert(&mut self, id: PipeId, pipe: Weak<dyn Pipe>) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(Member { id, pipe });
        true
    }

    /// Remove a pipe. Returns false if it was not present.
    pub(crate) fn remove(&mut self, id: PipeId) -> bool {
        let Some(index) = self.members.iter().position(|m| m.id == id) else {
            return false;
        };
        self.members.remove(index);
        if index < self.current {
            self.current -= 1;
        }
        if self.current >= self.members.len() {
            self.current = 0;
        }
        true
    }

    pub(crate) fn contains(&self, id: PipeId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The member under the cursor, with its handle if the pipe still exists.
    pub(crate) fn current(&self) -> Option<(PipeId, Option<Arc<dyn Pipe>>)> {
        self.members
            .get(self.current)
            .map(|m| (m.id, m.pipe.upgrade()))
    }

    pub(crate) fn current_id(&self) -> Option<PipeId> {
        self.members.get(self.current).map(|m| m.id)
    }

    /// Move the cursor to the next member, wrapping around.
    pub(crate) fn advance(&mut self) {
        if !self.members.is_empty() {
            self.current = (self.current + 1) % self.members.len();
        }
    }

    /// Live handles in rotation order, starting at the cursor.
    pub(crate) fn live(&self) -> impl Iterator<Item = Arc<dyn Pipe>> + '_ {
        let (tail, head) = self.members.split_at(self.current);
        head.iter()
            .chain(tail.iter())
            .filter_map(|m| m.pipe.upgrade())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::endpoint;

    #[test]
    fn insert_is_idempotent() {
        let (a, _peer) = endpoint("a");
        let mut set = ActiveSet::default();
        assert!(set.insert(a.id(), Arc::downgrade(&a)));
        assert!(!set.insert(a.id(), Arc::downgrade(&a)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn cursor_moves_to_successor_when_current_removed() {
        let pipes: Vec<_> = ["a", "b", "c"].into_iter().map(endpoint).collect();
        let mut set = ActiveSet::default();
        for (pipe, _) in &pipes {
            set.insert(pipe.id(), Arc::downgrade(pipe));
        }
        set.advance();
        assert_eq!(set.current_id(), Some(pipes[1].0.id()));

        assert!(set.remove(pipes[1].0.id()));
        assert_eq!(set.current_id(), Some(pipes[2].0.id()));
    }

    #[test]
    fn cursor_stays_on_member_when_earlier_removed() {
        let pipes: Vec<_> = ["a", "b", "c"].into_iter().map(endpoint).collect();
        let mut set = ActiveSet::default();
        for (pipe, _) in &pipes {
            set.insert(pipe.id(), Arc::downgrade(pipe));
        }
        set.advance();
        set.advance();
        assert_eq!(set.current_id(), Some(pipes[2].0.id()));

        set.remove(pipes[0].0.id());
        assert_eq!(set.current_id(), Some(pipes[2].0.id()));
    }

    #[test]
    fn cursor_wraps_when_last_removed() {
        let pipes: Vec<_> = ["a", "b"].into_iter().map(endpoint).collect();
        let mut set = ActiveSet::default();
        for (pipe, _) in &pipes {
            set.insert(pipe.id(), Arc::downgrade(pipe));
        }
        set.advance();
        set.remove(pipes[1].0.id());
        assert_eq!(set.current_id(), Some(pipes[0].0.id()));

        set.remove(pipes[0].0.id());
        assert!(set.is_empty());
        assert!(set.current().is_none());
        assert!(!set.remove(pipes[0].0.id()));
    }

    #[test]
    fn live_starts_at_cursor_and_skips_dropped() {
        let pipes: Vec<_> = ["a", "b", "c"].into_iter().map(endpoint).collect();
        let mut set = ActiveSet::default();
        for (pipe, _) in &pipes {
            set.insert(pipe.id(), Arc::downgrade(pipe));
        }
        set.advance();

        let order: Vec<PipeId> = set.live().map(|p| p.id()).collect();
        assert_eq!(
            order,
            vec![pipes[1].0.id(), pipes[2].0.id(), pipes[0].0.id()]
        );

        let mut pipes = pipes;
        pipes.remove(2);
        assert_eq!(set.live().count(), 2);
    }
}
