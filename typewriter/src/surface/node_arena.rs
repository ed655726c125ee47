// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! [`NodeArena`] is defined here. It backs [`crate::OffscreenSurface`].

use std::collections::HashMap;

use crate::NodeId;

/// A node in the arena. It may have a parent, it can hold multiple children, and it has
/// a payload. Nodes without a parent are detached (or are the document root).
#[derive(Debug, Clone)]
pub struct ArenaNode<T> {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub payload: T,
}

/// Stores a (non-binary) tree in a flat map keyed by [`NodeId`]. Ids are never reused.
#[derive(Debug)]
pub struct NodeArena<T> {
    map: HashMap<NodeId, ArenaNode<T>>,
    counter: usize,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            counter: 0,
        }
    }
}

impl<T> NodeArena<T> {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Adds a detached node and returns its id.
    pub fn add_new_node(&mut self, payload: T) -> NodeId {
        let id = self.generate_uid();
        self.map.insert(
            id,
            ArenaNode {
                id,
                parent: None,
                children: vec![],
                payload,
            },
        );
        id
    }

    #[must_use]
    pub fn len(&self) -> usize { self.map.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    #[must_use]
    pub fn node_exists(&self, id: NodeId) -> bool { self.map.contains_key(&id) }

    #[must_use]
    pub fn get_node(&self, id: NodeId) -> Option<&ArenaNode<T>> { self.map.get(&id) }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut ArenaNode<T>> {
        self.map.get_mut(&id)
    }

    #[must_use]
    pub fn get_parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.map.get(&id).and_then(|node| node.parent)
    }

    /// If `id` can't be found, returns an empty list.
    #[must_use]
    pub fn get_children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.map
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Removes `id` from its parent's children. The node stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent_id) = self.get_parent_of(id) else {
            return;
        };
        if let Some(parent) = self.map.get_mut(&parent_id) {
            parent.children.retain(|child_id| *child_id != id);
        }
        if let Some(node) = self.map.get_mut(&id) {
            node.parent = None;
        }
    }

    /// Appends `child` as the last child of `parent`, detaching it from any previous
    /// parent. Refuses to create a cycle.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child
            || !self.node_exists(parent)
            || !self.node_exists(child)
            || self.is_ancestor(child, parent)
        {
            return false;
        }
        self.detach(child);
        if let Some(parent_node) = self.map.get_mut(&parent) {
            parent_node.children.push(child);
        }
        if let Some(child_node) = self.map.get_mut(&child) {
            child_node.parent = Some(parent);
        }
        true
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.get_parent_of(id);
        while let Some(it) = current {
            if it == ancestor {
                return true;
            }
            current = self.get_parent_of(it);
        }
        false
    }

    /// Detaches `id` and removes it along with its whole subtree. Returns the deleted
    /// ids, or `None` if `id` can't be found.
    pub fn delete_node(&mut self, id: NodeId) -> Option<Vec<NodeId>> {
        let deletion_list = self.tree_walk_dfs(id)?;
        self.detach(id);
        for it in &deletion_list {
            self.map.remove(it);
        }
        Some(deletion_list)
    }

    /// Pre-order DFS, using an explicit stack. Children are visited in document order.
    #[must_use]
    pub fn tree_walk_dfs(&self, id: NodeId) -> Option<Vec<NodeId>> {
        if !self.node_exists(id) {
            return None;
        }
        let mut collected_nodes = vec![];
        let mut stack = vec![id];

        while let Some(node_id) = stack.pop() {
            let Some(node) = self.map.get(&node_id) else {
                continue;
            };
            collected_nodes.push(node_id);
            stack.extend(node.children.iter().rev().copied());
        }

        Some(collected_nodes)
    }

    fn generate_uid(&mut self) -> NodeId {
        let id = NodeId(self.counter);
        self.counter += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_tree() -> (NodeArena<&'static str>, [NodeId; 4]) {
        let mut arena = NodeArena::new();
        let root = arena.add_new_node("root");
        let a = arena.add_new_node("a");
        let b = arena.add_new_node("b");
        let a1 = arena.add_new_node("a1");
        arena.attach(root, a);
        arena.attach(root, b);
        arena.attach(a, a1);
        (arena, [root, a, b, a1])
    }

    #[test]
    fn test_tree_walk_dfs_is_document_order() {
        let (arena, [root, a, b, a1]) = make_tree();
        assert_eq!(arena.tree_walk_dfs(root).unwrap(), vec![root, a, a1, b]);
    }

    #[test]
    fn test_attach_moves_node() {
        let (mut arena, [root, a, b, a1]) = make_tree();
        assert!(arena.attach(b, a1));
        assert_eq!(arena.get_children_of(a), vec![]);
        assert_eq!(arena.get_children_of(b), vec![a1]);
        assert_eq!(arena.get_parent_of(a1), Some(b));
        assert_eq!(arena.get_children_of(root), vec![a, b]);
    }

    #[test]
    fn test_attach_refuses_cycle() {
        let (mut arena, [root, a, _, a1]) = make_tree();
        assert!(!arena.attach(a1, a));
        assert!(!arena.attach(a1, root));
        assert_eq!(arena.get_parent_of(a), Some(root));
    }

    #[test]
    fn test_delete_node_removes_subtree() {
        let (mut arena, [root, a, b, a1]) = make_tree();
        assert_eq!(arena.delete_node(a).unwrap(), vec![a, a1]);
        assert_eq!(arena.get_children_of(root), vec![b]);
        assert!(!arena.node_exists(a1));
        assert_eq!(arena.len(), 2);
        assert!(arena.delete_node(a).is_none());
    }
}
