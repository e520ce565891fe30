//! Scene node lookup.
//!
//! Target ids are opaque to the input core. The only place they are turned into
//! something the application understands is a [`NodeRegistry`] lookup right
//! before a click or hover listener is called.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::event::NodeId;

pub trait NodeRegistry: Send + Sync {
    type Entity: Clone + Send + 'static;

    fn lookup(&self, id: NodeId) -> Option<Self::Entity>;
}

/// Map-backed registry for applications without their own scene graph.
#[derive(Debug)]
pub struct SceneNodes<E> {
    nodes: RwLock<HashMap<NodeId, E>>,
}

impl<E> Default for SceneNodes<E> {
    fn default() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> SceneNodes<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: NodeId, entity: E) -> Option<E> {
        self.nodes.write().insert(id, entity)
    }

    pub fn remove(&self, id: NodeId) -> Option<E> {
        self.nodes.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl<E> NodeRegistry for SceneNodes<E>
where
    E: Clone + Send + Sync + 'static,
{
    type Entity = E;

    fn lookup(&self, id: NodeId) -> Option<E> {
        self.nodes.read().get(&id).cloned()
    }
}
