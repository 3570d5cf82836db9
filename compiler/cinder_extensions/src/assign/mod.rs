//! Synthesized Container Assignor.
//!
//! Maps grouping keys to ordinal-numbered containers per declaring type.
//! Encoding may run in parallel; assignment never does. It is one
//! sequential pass over all encoded blocks sorted by source position, so
//! container names never depend on which worker finished first.

use cinder_ir::SourceLoc;
use cinder_types::DefId;
use rustc_hash::FxHashMap;

use crate::encode::{EncodedSignature, GroupingKey};

/// One block after encoding, ready for assignment.
#[derive(Clone, Debug)]
pub struct EncodedBlock {
    /// Index of the block in the binder's declaration list.
    pub index: usize,
    pub declaring_type: DefId,
    pub loc: SourceLoc,
    pub arity: usize,
    pub signature: EncodedSignature,
}

/// A container slot: either a numbered container or a per-block error
/// container that is never emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerSlot {
    pub declaring_type: DefId,
    /// `None` for error containers.
    pub ordinal: Option<u32>,
    pub grouping_key: GroupingKey,
    pub arity: usize,
    /// Contributing blocks, in source order.
    pub blocks: Vec<usize>,
}

impl ContainerSlot {
    #[inline]
    pub fn is_error(&self) -> bool {
        self.ordinal.is_none()
    }

    /// Type name without arity suffix: `<>E__0`.
    pub fn type_name(&self) -> String {
        container_type_name(self.ordinal)
    }

    /// Metadata name: ``<>E__0`1`` for generic containers.
    pub fn metadata_name(&self) -> String {
        let mut name = self.type_name();
        if self.arity > 0 {
            name.push('`');
            name.push_str(&self.arity.to_string());
        }
        name
    }
}

/// `<>E__{ordinal}`, or `<>E__error` for error containers.
pub fn container_type_name(ordinal: Option<u32>) -> String {
    match ordinal {
        Some(ordinal) => format!("<>E__{ordinal}"),
        None => "<>E__error".to_owned(),
    }
}

/// Parse the ordinal back out of a container type name.
pub fn parse_container_ordinal(name: &str) -> Option<u32> {
    let base = name.split('`').next()?;
    base.strip_prefix("<>E__")?.parse().ok()
}

/// Result of assignment.
#[derive(Clone, Debug, Default)]
pub struct Assignment {
    slots: Vec<ContainerSlot>,
    by_block: FxHashMap<usize, usize>,
}

impl Assignment {
    /// All slots in first-occurrence order.
    pub fn slots(&self) -> &[ContainerSlot] {
        &self.slots
    }

    /// The slot a block was assigned to.
    pub fn slot_of(&self, block: usize) -> Option<&ContainerSlot> {
        self.by_block.get(&block).map(|&slot| &self.slots[slot])
    }

    /// Numbered containers of one declaring type, in ordinal order.
    pub fn containers_of(&self, declaring_type: DefId) -> impl Iterator<Item = &ContainerSlot> {
        self.slots
            .iter()
            .filter(move |s| s.declaring_type == declaring_type && !s.is_error())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Per-declaring-type table of grouping key to slot.
#[derive(Default)]
struct DeclTable {
    keys: FxHashMap<GroupingKey, usize>,
    next_ordinal: u32,
}

/// Deterministic container assignment.
#[derive(Default)]
pub struct ContainerAssignor {
    tables: FxHashMap<DefId, DeclTable>,
    assignment: Assignment,
}

impl ContainerAssignor {
    /// Assign every block to a container.
    #[tracing::instrument(level = "debug", skip_all, fields(blocks = blocks.len()))]
    pub fn assign(blocks: &[EncodedBlock]) -> Assignment {
        let mut order: Vec<&EncodedBlock> = blocks.iter().collect();
        order.sort_by_key(|b| (b.loc, b.index));

        let mut assignor = ContainerAssignor::default();
        for block in order {
            assignor.place(block);
        }
        tracing::debug!(
            containers = assignor.assignment.slots.len(),
            "assigned extension containers"
        );
        assignor.assignment
    }

    fn place(&mut self, block: &EncodedBlock) {
        let key = &block.signature.grouping_key;
        if key.is_error() {
            let slot = self.push_slot(block, None);
            tracing::trace!(block = block.index, "error container");
            self.assignment.by_block.insert(block.index, slot);
            return;
        }

        let table = self.tables.entry(block.declaring_type).or_default();
        if let Some(&slot) = table.keys.get(key) {
            self.assignment.slots[slot].blocks.push(block.index);
            self.assignment.by_block.insert(block.index, slot);
            tracing::trace!(block = block.index, slot, "merged into existing container");
            return;
        }

        let ordinal = table.next_ordinal;
        table.next_ordinal += 1;
        let slot = self.assignment.slots.len();
        table.keys.insert(key.clone(), slot);
        self.push_slot(block, Some(ordinal));
        self.assignment.by_block.insert(block.index, slot);
        tracing::trace!(block = block.index, ordinal, key = %key, "new container");
    }

    fn push_slot(&mut self, block: &EncodedBlock, ordinal: Option<u32>) -> usize {
        let slot = self.assignment.slots.len();
        self.assignment.slots.push(ContainerSlot {
            declaring_type: block.declaring_type,
            ordinal,
            grouping_key: block.signature.grouping_key.clone(),
            arity: block.arity,
            blocks: vec![block.index],
        });
        slot
    }
}

#[cfg(test)]
mod tests;
