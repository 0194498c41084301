//! Fixed-capacity node table with generation-checked ids.
//!
//! Slots are handed out first-free in index order, and every scan walks the
//! slots in index order. Eviction relies on that order for its tie-break.

use crate::node::TextureNode;
use texel_core::NodeId;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<TextureNode>,
}

#[derive(Debug)]
pub(crate) struct NodeTable {
    slots: Vec<Slot>,
    live: usize,
}

impl NodeTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::default);
        Self { slots, live: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Place `node` in the first free slot.
    pub fn insert(&mut self, node: TextureNode) -> Option<NodeId> {
        let index = self.slots.iter().position(|slot| slot.node.is_none())?;
        let slot = &mut self.slots[index];
        slot.node = Some(node);
        self.live += 1;
        Some(NodeId::new(index as u32, slot.generation))
    }

    pub fn get(&self, id: NodeId) -> Option<&TextureNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TextureNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    /// Take the node out and retire its id.
    pub fn remove(&mut self, id: NodeId) -> Option<TextureNode> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        Some(node)
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TextureNode)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (NodeId::new(index as u32, slot.generation), node))
        })
    }

    /// Live nodes in slot order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut TextureNode)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.node
                .as_mut()
                .map(|node| (NodeId::new(index as u32, generation), node))
        })
    }

    /// First live node, in slot order, satisfying `pred`.
    pub fn find(&self, mut pred: impl FnMut(&TextureNode) -> bool) -> Option<NodeId> {
        self.iter().find(|(_, node)| pred(node)).map(|(id, _)| id)
    }
}
