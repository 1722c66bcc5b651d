//! The append-only block log.

mod block;
mod payload;

pub use block::{Block, BlockBuilder};
pub use payload::Payload;

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::Result;
use crate::hash::Id;

/// A DAG of blocks keyed by id.
///
/// The chain only checks structure; whether a block's payloads are honest
/// is the session's concern. Blocks may arrive in any order, including
/// before their parents: the chain holds them and reports itself
/// incomplete until the ancestry fills in.
#[derive(Clone, Debug, Default)]
pub struct Chain {
    blocks: HashMap<Id, Block>,
    roots: Vec<Id>,
    heads: Vec<Id>,
    links: HashMap<Id, Vec<Id>>,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of blocks held.
    pub fn count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the chain holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The ids of blocks with no parents.
    pub fn roots(&self) -> &[Id] {
        &self.roots
    }

    /// The ids of blocks no other block acknowledges.
    pub fn heads(&self) -> &[Id] {
        &self.heads
    }

    /// Whether all history converges on a single head.
    pub fn is_merged(&self) -> bool {
        self.heads.len() == 1
    }

    /// Whether some held block acknowledges a block the chain lacks.
    pub fn is_incomplete(&self) -> bool {
        !self.links.keys().all(|id| self.blocks.contains_key(id))
    }

    /// Fetches a block by id.
    pub fn block(&self, id: &Id) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// The ids of a block's parents.
    pub fn parents_of(&self, id: &Id) -> Option<&[Id]> {
        self.blocks.get(id).map(|b| b.parent_ids())
    }

    /// Whether the chain holds a block.
    pub fn contains(&self, id: &Id) -> bool {
        self.blocks.contains_key(id)
    }

    /// Starts a block acknowledging every current head.
    pub fn build_block(&self) -> BlockBuilder {
        let mut builder = BlockBuilder::new();
        for &head in &self.heads {
            builder.acknowledge(head);
        }
        builder
    }

    /// Adds a block.
    ///
    /// Idempotent: re-adding a block the chain already holds is a no-op.
    /// Rejects blocks with unsorted or duplicate acks.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        block.well_formed()?;
        let id = block.id();
        if self.blocks.contains_key(&id) {
            return Ok(());
        }

        for &ack in block.parent_ids() {
            self.heads.retain(|&h| h != ack);
            self.links.entry(ack).or_default().push(id);
        }
        if block.parent_ids().is_empty() {
            self.roots.push(id);
        }
        if !self.links.contains_key(&id) {
            self.heads.push(id);
        }
        debug!(block = %id, acks = block.parent_ids().len(), "block added");
        self.blocks.insert(id, block);
        Ok(())
    }

    /// Removes a block, e.g. one whose deferred validation failed.
    pub(crate) fn remove_block(&mut self, id: &Id) -> Option<Block> {
        let block = self.blocks.remove(id)?;
        for ack in block.parent_ids() {
            if let Some(children) = self.links.get_mut(ack) {
                children.retain(|c| c != id);
                if children.is_empty() {
                    self.links.remove(ack);
                }
            }
        }
        self.roots.retain(|r| r != id);
        self.heads.retain(|h| h != id);
        // parents it was the only child of become heads again
        for &ack in block.parent_ids() {
            if self.blocks.contains_key(&ack) && !self.links.contains_key(&ack) {
                self.heads.push(ack);
            }
        }
        debug!(block = %id, "block removed");
        Some(block)
    }

    /// Iterates blocks in topological order.
    ///
    /// Ties are broken by ascending id, so every party folds the same
    /// sequence and derives the same state. Blocks whose ancestry is
    /// missing are not yielded.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        Topo::new(self)
    }
}

struct Topo<'a> {
    chain: &'a Chain,
    ready: BTreeSet<Id>,
    visited: HashMap<Id, usize>,
}

impl<'a> Topo<'a> {
    fn new(chain: &'a Chain) -> Self {
        Self {
            chain,
            ready: chain.roots.iter().copied().collect(),
            visited: HashMap::new(),
        }
    }
}

impl<'a> Iterator for Topo<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.ready.iter().next()?;
        self.ready.remove(&id);

        if let Some(children) = self.chain.links.get(&id) {
            for &child in children {
                let Some(block) = self.chain.blocks.get(&child) else {
                    continue;
                };
                let missing = self
                    .visited
                    .entry(child)
                    .or_insert_with(|| block.parent_ids().len());
                *missing -= 1;
                if *missing == 0 {
                    self.ready.insert(child);
                }
            }
        }
        self.chain.blocks.get(&id)
    }
}

impl Chain {
    /// Decodes a block and adds it.
    pub fn add_block_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        use crate::serde::Proto;
        self.add_block(Block::from_bytes(bytes)?)
    }
}
