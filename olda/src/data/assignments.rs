//! Copy-on-write store of per-word topic assignments.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::{NodeId, Slot, Topic};

#[derive(Clone, Debug, Default)]
struct Node {
    parent: Option<NodeId>,
    overrides: HashMap<Slot, Vec<Option<Topic>>>,
}

/// Forest of topic assignments shared between particles.
///
/// Each particle owns one node holding only the assignments written through
/// it; reads fall through the parent chain. Duplicating a particle is one
/// empty child node instead of a copy of every assignment it ever made.
#[derive(Clone, Debug)]
pub struct AssignmentStore {
    capacity: usize,
    nodes: Vec<Node>,
}

impl AssignmentStore {
    /// Empty forest over reservoir slots `0..capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            nodes: Vec::new(),
        }
    }

    /// Register a new root node.
    pub fn new_root(&mut self) -> NodeId {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }

    /// Register a new node shadowing `parent`.
    pub fn new_child(&mut self, parent: NodeId) -> NodeId {
        debug_assert!(parent < self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            overrides: HashMap::new(),
        });
        self.nodes.len() - 1
    }

    /// Start a fresh document of `len` words in `slot` for `node`.
    ///
    /// Drops the node's own overrides for the slot. Ancestor entries for a
    /// previously evicted resident stay in place; they are unreachable
    /// through any live read, because every position of the new document is
    /// written before it is read.
    ///
    /// # Errors
    /// [`Error::SlotOutOfRange`] when `slot >= capacity`.
    pub fn new_document(&mut self, node: NodeId, slot: Slot, len: usize) -> Result<()> {
        self.check_slot(slot)?;
        self.nodes[node].overrides.insert(slot, vec![None; len]);
        Ok(())
    }

    /// Record the assignment of `(slot, position)` in `node`'s own table.
    ///
    /// Ancestors and descendants are unaffected.
    ///
    /// # Errors
    /// [`Error::SlotOutOfRange`] when `slot >= capacity`.
    pub fn set(&mut self, node: NodeId, slot: Slot, position: usize, topic: Topic) -> Result<()> {
        self.check_slot(slot)?;
        let table = self.nodes[node].overrides.entry(slot).or_default();
        if table.len() <= position {
            table.resize(position + 1, None);
        }
        table[position] = Some(topic);
        Ok(())
    }

    /// Resolve the assignment of `(slot, position)` as seen from `node`,
    /// walking the parent chain until some ancestor recorded it.
    ///
    /// # Errors
    /// [`Error::AssignmentMissing`] when no ancestor recorded the position:
    /// the caller broke the write-before-read discipline.
    /// [`Error::SlotOutOfRange`] when `slot >= capacity`.
    pub fn get(&self, node: NodeId, slot: Slot, position: usize) -> Result<Topic> {
        self.check_slot(slot)?;
        let mut cursor = Some(node);
        while let Some(n) = cursor {
            let local = self.nodes[n]
                .overrides
                .get(&slot)
                .and_then(|table| table.get(position))
                .copied()
                .flatten();
            if let Some(topic) = local {
                return Ok(topic);
            }
            cursor = self.nodes[n].parent;
        }
        Err(Error::AssignmentMissing {
            node,
            slot,
            position,
        })
    }

    /// Release the override tables of nodes no live particle can reach.
    ///
    /// Node ids are append-only, so pruned nodes stay in place as empty
    /// husks; only their storage is reclaimed.
    pub fn prune(&mut self, live: &[NodeId]) {
        let mut reachable = vec![false; self.nodes.len()];
        for &id in live {
            let mut cursor = Some(id);
            while let Some(n) = cursor {
                if reachable[n] {
                    break;
                }
                reachable[n] = true;
                cursor = self.nodes[n].parent;
            }
        }
        for (node, keep) in self.nodes.iter_mut().zip(&reachable) {
            if !keep {
                node.overrides = HashMap::new();
            }
        }
    }

    /// Number of reservoir slots the store accepts.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of nodes ever registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn check_slot(&self, slot: Slot) -> Result<()> {
        if slot < self.capacity {
            Ok(())
        } else {
            Err(Error::SlotOutOfRange {
                slot,
                capacity: self.capacity,
            })
        }
    }
}
