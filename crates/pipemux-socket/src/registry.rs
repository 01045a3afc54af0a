use std::collections::HashMap;
use std::sync::{Arc, Weak};

use pipemux_pipe::{Pipe, PipeId};

/// The pipes attached to a socket.
///
/// The transport owns each pipe; the registry only keeps a weak handle so
/// lifecycle callbacks, which carry a [`PipeId`], can be resolved back to
/// the pipe.
#[derive(Debug, Default)]
pub struct PipeRegistry {
    pipes: HashMap<PipeId, Weak<dyn Pipe>>,
}

impl PipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipe. Returns false if the id is already registered.
    pub fn attach(&mut self, pipe: &Arc<dyn Pipe>) -> bool {
        let id = pipe.id();
        if self.pipes.contains_key(&id) {
            return false;
        }
        self.pipes.insert(id, Arc::downgrade(pipe));
        true
    }

    /// Weak handle for an attached pipe.
    pub fn get(&self, id: PipeId) -> Option<Weak<dyn Pipe>> {
        self.pipes.get(&id).cloned()
    }

    /// Unregister a pipe. Returns false if it was not registered.
    pub fn detach(&mut self, id: PipeId) -> bool {
        self.pipes.remove(&id).is_some()
    }

    pub fn contains(&self, id: PipeId) -> bool {
        self.pipes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Attached pipe ids in ascending order.
    pub fn ids(&self) -> Vec<PipeId> {
        let mut ids: Vec<PipeId> = self.pipes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
