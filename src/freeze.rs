//! Freeze/thaw (§4.3): compacting all nodes into a contiguous arena for
//! pickle-style serialization, and restoring the heap-allocated form.
//!
//! The frozen node record is a plain-old-data struct, laid out with
//! `zerocopy` the same way the teacher crate lays out its wire-level
//! prefix ids: `#[repr(C)]`, `Unaligned`, with multi-byte fields stored in
//! a fixed endianness so the byte image is itself the position-independent
//! wire format described in §6 ("Persisted state layout").

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, NetworkEndian, Unaligned,
    U32,
};

type NU32 = U32<NetworkEndian>;

use crate::error::PrefixMapError;
use crate::family::Family;
use crate::node::{Node, NodeId, Slot, NIL};
use crate::prefix::Prefix;
use crate::trie::Trie;

/// One arena-resident node, in the byte layout that gets shipped as the
/// "nodes" part of a snapshot (§6).
#[derive(
    Clone, Copy, Debug, KnownLayout, Immutable, Unaligned, IntoBytes, FromBytes,
)]
#[repr(C)]
pub struct FrozenNode {
    pub(crate) bit: u8,
    pub(crate) family: u8,
    pub(crate) bitlen: u8,
    pub(crate) has_value: u8,
    pub(crate) bytes: [u8; 16],
    left: NU32,
    right: NU32,
    parent: NU32,
}

impl FrozenNode {
    pub(crate) fn left(&self) -> NodeId {
        self.left.get()
    }
    pub(crate) fn right(&self) -> NodeId {
        self.right.get()
    }
    pub(crate) fn parent(&self) -> NodeId {
        self.parent.get()
    }

    pub(crate) fn to_prefix(&self) -> Prefix {
        let family = if self.family == 0 { Family::V4 } else { Family::V6 };
        Prefix::from_raw_unmasked(family, &self.bytes, self.bitlen)
    }
}

fn family_tag(family: Family) -> u8 {
    match family {
        Family::V4 => 0,
        Family::V6 => 1,
    }
}

impl<V> Trie<V> {
    /// Requires thawed state; idempotent if already frozen.
    pub(crate) fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        let order = self.walk_all();
        let count = order.len();

        // Map old (possibly sparse, post-removal) arena indices onto the
        // dense 0..count range the frozen arena will use.
        let mut remap = vec![NIL; self.slots.len()];
        for (new_idx, &old_id) in order.iter().enumerate() {
            remap[old_id as usize] = new_idx as NodeId;
        }
        let map = |old: NodeId| -> NodeId {
            if old == NIL {
                NIL
            } else {
                remap[old as usize]
            }
        };

        let mut nodes = Vec::with_capacity(count);
        let mut values = Vec::with_capacity(count);
        for &old_id in &order {
            let taken = std::mem::replace(
                &mut self.slots[old_id as usize],
                Slot::Free(NIL),
            );
            let node = match taken {
                Slot::Occupied(n) => n,
                Slot::Free(_) => unreachable!("walk only visits live nodes"),
            };
            let has_value = node.value.is_some();
            nodes.push(FrozenNode {
                bit: node.bit,
                family: family_tag(node.prefix.family()),
                bitlen: node.prefix.bitlen(),
                has_value: has_value as u8,
                bytes: node.prefix.to_bytes16(),
                left: map(node.left).into(),
                right: map(node.right).into(),
                parent: map(node.parent).into(),
            });
            values.push(node.value);
        }

        self.head = if count > 0 { 0 } else { NIL };
        self.frozen_nodes = Some(nodes.into_boxed_slice());
        self.frozen_values = Some(values);
        self.slots.clear();
        self.slots.shrink_to_fit();
        self.free_head = NIL;
        self.frozen = true;
    }

    /// Inverse of [`Trie::freeze`].
    pub(crate) fn thaw(&mut self) {
        if !self.frozen {
            return;
        }
        let nodes = self.frozen_nodes.take().expect("frozen implies Some");
        let mut values =
            self.frozen_values.take().expect("frozen implies Some");
        let count = nodes.len();

        let mut slots = Vec::with_capacity(count);
        for (i, fnode) in nodes.iter().enumerate() {
            slots.push(Slot::Occupied(Node {
                bit: fnode.bit,
                prefix: fnode.to_prefix(),
                value: values[i].take(),
                left: fnode.left(),
                right: fnode.right(),
                parent: fnode.parent(),
            }));
        }

        self.slots = slots;
        self.free_head = NIL;
        self.head = if count > 0 { 0 } else { NIL };
        self.frozen = false;
    }

    /// The three parts of a snapshot (§6): node byte image and ordered
    /// value list. The header (family/maxbits/options) is the caller's
    /// concern (`PrefixMap::to_snapshot`).
    pub(crate) fn snapshot_parts(&self) -> (Vec<u8>, u32, NodeId)
    where
        V: Clone,
    {
        let nodes = self
            .frozen_nodes
            .as_ref()
            .expect("snapshot_parts requires frozen state");
        (nodes.as_bytes().to_vec(), nodes.len() as u32, self.head)
    }

    pub(crate) fn cloned_values(&self) -> Vec<Option<V>>
    where
        V: Clone,
    {
        self.frozen_values
            .as_ref()
            .expect("cloned_values requires frozen state")
            .clone()
    }

    /// Rebuilds a frozen trie directly from validated snapshot parts.
    pub(crate) fn from_snapshot_parts(
        family: Family,
        maxbits: u8,
        node_bytes: &[u8],
        node_count: u32,
        head: NodeId,
        values: Vec<Option<V>>,
    ) -> Result<Self, PrefixMapError> {
        let expected_len =
            node_count as usize * std::mem::size_of::<FrozenNode>();
        if node_bytes.len() != expected_len
            || values.len() != node_count as usize
        {
            return Err(PrefixMapError::CorruptState);
        }
        let node_size = std::mem::size_of::<FrozenNode>();
        let mut nodes = Vec::with_capacity(node_count as usize);
        for chunk in node_bytes.chunks_exact(node_size) {
            let node = FrozenNode::read_from_bytes(chunk)
                .map_err(|_| PrefixMapError::CorruptState)?;
            nodes.push(node);
        }
        if head != NIL && head as usize >= nodes.len() {
            return Err(PrefixMapError::CorruptState);
        }
        let mut real_count = 0usize;
        for (i, n) in nodes.iter().enumerate() {
            let in_range = |id: NodeId| id == NIL || (id as usize) < nodes.len();
            if !in_range(n.left()) || !in_range(n.right()) || !in_range(n.parent())
            {
                return Err(PrefixMapError::CorruptState);
            }
            if (n.has_value != 0) != values[i].is_some() {
                return Err(PrefixMapError::CorruptState);
            }
            if n.has_value != 0 {
                real_count += 1;
            }
        }

        Ok(Trie {
            slots: Vec::new(),
            free_head: NIL,
            frozen_nodes: Some(nodes.into_boxed_slice()),
            frozen_values: Some(values),
            head,
            family,
            maxbits,
            real_count,
            frozen: true,
        })
    }
}
