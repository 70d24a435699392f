//! Generational node table owning every shadow node

use super::node::ShadowNode;

/// Handle to a shadow node. Stale handles (node removed, slot reused) never
/// resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<ShadowNode>,
    /// Node is temporarily out of the table while one of its hooks runs
    taken: bool,
}

#[derive(Debug, Default)]
pub struct NodeTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot and build the node with its id
    pub fn insert_with(&mut self, build: impl FnOnce(NodeId) -> ShadowNode) -> NodeId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                    taken: false,
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        let slot = &mut self.slots[id.index as usize];
        slot.node = Some(build(id));
        slot.taken = false;
        self.len += 1;
        id
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
    }

    /// Remove a node and retire its handle
    pub fn remove(&mut self, id: NodeId) -> Option<ShadowNode> {
        let slot = self.slot_mut(id)?;
        if slot.taken {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&ShadowNode> {
        self.slot(id)?.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ShadowNode> {
        self.slot_mut(id)?.node.as_mut()
    }

    /// Whether `id` names a live node, including one currently taken
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id)
            .map(|s| s.node.is_some() || s.taken)
            .unwrap_or(false)
    }

    /// Move a node out so it can be mutated while the rest of the table is
    /// read. Must be followed by [`restore`](Self::restore).
    pub fn take(&mut self, id: NodeId) -> Option<ShadowNode> {
        let slot = self.slot_mut(id)?;
        let node = slot.node.take()?;
        slot.taken = true;
        Some(node)
    }

    pub fn restore(&mut self, node: ShadowNode) {
        let id = node.id();
        match self.slot_mut(id) {
            Some(slot) if slot.taken => {
                slot.node = Some(node);
                slot.taken = false;
            }
            _ => log::error!("Restoring node {} into a slot that was not taken", id),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShadowNode> {
        self.slots.iter().filter_map(|s| s.node.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ShadowNode> {
        self.slots.iter_mut().filter_map(|s| s.node.as_mut())
    }
}
