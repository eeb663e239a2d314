//! The Patricia trie itself (§4.2): exact search, best-match search,
//! insert, remove, and the bounded-stack walks enumeration is built on.
//!
//! Structurally pure: this type knows nothing about key parsing or value
//! lifecycle hooks. [`crate::map::PrefixMap`] is the layer that wires a key
//! adapter and a [`crate::value::ValueLifecycle`] around it.

use log::trace;

use crate::error::PrefixMapError;
use crate::family::Family;
use crate::freeze::FrozenNode;
use crate::node::{Node, NodeId, Slot, NIL};
use crate::prefix::Prefix;

pub(crate) struct Trie<V> {
    pub(crate) slots: Vec<Slot<V>>,
    pub(crate) free_head: NodeId,
    pub(crate) frozen_nodes: Option<Box<[FrozenNode]>>,
    pub(crate) frozen_values: Option<Vec<Option<V>>>,
    pub(crate) head: NodeId,
    pub(crate) family: Family,
    pub(crate) maxbits: u8,
    pub(crate) real_count: usize,
    pub(crate) frozen: bool,
}

/// What [`Trie::lookup_or_create`] found or built.
pub(crate) enum Slotted {
    /// A real node already held this exact prefix; the caller decides
    /// whether/how to update its value.
    Existing(NodeId),
    /// A fresh slot for this exact prefix (new real node, or a promoted
    /// glue node); the caller must still assign a value to make it real.
    Created(NodeId),
}

impl<V> Trie<V> {
    pub(crate) fn new(family: Family, maxbits: u8) -> Self {
        Trie {
            slots: Vec::new(),
            free_head: NIL,
            frozen_nodes: None,
            frozen_values: None,
            head: NIL,
            family,
            maxbits,
            real_count: 0,
            frozen: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.real_count
    }

    // ---- accessors, valid in both thawed and frozen form ----

    fn bit_of(&self, id: NodeId) -> u8 {
        if self.frozen {
            self.frozen_nodes.as_ref().unwrap()[id as usize].bit
        } else {
            self.node(id).bit
        }
    }

    fn left_of(&self, id: NodeId) -> NodeId {
        if self.frozen {
            self.frozen_nodes.as_ref().unwrap()[id as usize].left()
        } else {
            self.node(id).left
        }
    }

    fn right_of(&self, id: NodeId) -> NodeId {
        if self.frozen {
            self.frozen_nodes.as_ref().unwrap()[id as usize].right()
        } else {
            self.node(id).right
        }
    }

    fn parent_of(&self, id: NodeId) -> NodeId {
        if self.frozen {
            self.frozen_nodes.as_ref().unwrap()[id as usize].parent()
        } else {
            self.node(id).parent
        }
    }

    fn is_real(&self, id: NodeId) -> bool {
        if self.frozen {
            self.frozen_nodes.as_ref().unwrap()[id as usize].has_value != 0
        } else {
            self.node(id).is_real()
        }
    }

    pub(crate) fn prefix_of(&self, id: NodeId) -> Prefix {
        if self.frozen {
            let fnode = &self.frozen_nodes.as_ref().unwrap()[id as usize];
            fnode.to_prefix()
        } else {
            self.node(id).prefix
        }
    }

    fn node(&self, id: NodeId) -> &Node<V> {
        match &self.slots[id as usize] {
            Slot::Occupied(n) => n,
            Slot::Free(_) => unreachable!("dangling node id"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<V> {
        match &mut self.slots[id as usize] {
            Slot::Occupied(n) => n,
            Slot::Free(_) => unreachable!("dangling node id"),
        }
    }

    pub(crate) fn value_of(&self, id: NodeId) -> Option<&V> {
        if self.frozen {
            self.frozen_values.as_ref().unwrap()[id as usize].as_ref()
        } else {
            self.node(id).value.as_ref()
        }
    }

    // ---- mutation (thawed only) ----

    fn alloc(&mut self, node: Node<V>) -> Result<NodeId, PrefixMapError> {
        if self.free_head != NIL {
            let id = self.free_head;
            self.free_head = match self.slots[id as usize] {
                Slot::Free(next) => next,
                Slot::Occupied(_) => unreachable!("free list corrupted"),
            };
            self.slots[id as usize] = Slot::Occupied(node);
            Ok(id)
        } else {
            if self.slots.len() >= NIL as usize {
                return Err(PrefixMapError::Capacity);
            }
            let id = self.slots.len() as NodeId;
            self.slots.push(Slot::Occupied(node));
            Ok(id)
        }
    }

    fn free(&mut self, id: NodeId) {
        self.slots[id as usize] = Slot::Free(self.free_head);
        self.free_head = id;
    }

    fn set_left(&mut self, id: NodeId, child: NodeId) {
        self.node_mut(id).left = child;
    }

    fn set_right(&mut self, id: NodeId, child: NodeId) {
        self.node_mut(id).right = child;
    }

    fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        self.node_mut(id).parent = parent;
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if parent == NIL {
            self.head = new;
            return;
        }
        if self.node(parent).left == old {
            self.set_left(parent, new);
        } else {
            self.set_right(parent, new);
        }
    }

    /// Takes the value out of a real node, leaving it a glue node.
    pub(crate) fn take_value(&mut self, id: NodeId) -> Option<V> {
        self.node_mut(id).value.take()
    }

    pub(crate) fn set_value(&mut self, id: NodeId, value: V) -> Option<V> {
        self.node_mut(id).value.replace(value)
    }

    // ---- exact / best-match search (§4.2) ----

    /// Descends the trie, stopping either at a null chosen child or once
    /// the current node's bit index has caught up to `bitlen`.
    fn descend_to_stop(&self, query: &Prefix) -> Option<NodeId> {
        let mut cur = self.head;
        if cur == NIL {
            return None;
        }
        loop {
            let n_bit = self.bit_of(cur);
            if n_bit >= query.bitlen() {
                return Some(cur);
            }
            let next = if query.bit(n_bit) == 1 {
                self.right_of(cur)
            } else {
                self.left_of(cur)
            };
            if next == NIL {
                return Some(cur);
            }
            cur = next;
        }
    }

    pub(crate) fn search_exact(&self, query: &Prefix) -> Option<NodeId> {
        let cur = self.descend_to_stop(query)?;
        if self.is_real(cur)
            && self.bit_of(cur) == query.bitlen()
            && Prefix::equal_to_length(
                &self.prefix_of(cur),
                query,
                query.bitlen(),
            )
        {
            Some(cur)
        } else {
            None
        }
    }

    /// Longest-prefix-match search. `inclusive` controls whether the
    /// terminating node itself is eligible as a candidate — `parent`
    /// passes `false` to exclude the query's own stored node.
    pub(crate) fn search_best(
        &self,
        query: &Prefix,
        inclusive: bool,
    ) -> Option<NodeId> {
        let mut cur = self.head;
        if cur == NIL {
            return None;
        }
        let mut candidates = Vec::new();
        loop {
            let n_bit = self.bit_of(cur);
            if n_bit >= query.bitlen() {
                if inclusive && self.is_real(cur) {
                    candidates.push(cur);
                }
                break;
            }
            let next = if query.bit(n_bit) == 1 {
                self.right_of(cur)
            } else {
                self.left_of(cur)
            };
            if next == NIL {
                if inclusive && self.is_real(cur) {
                    candidates.push(cur);
                }
                break;
            }
            if self.is_real(cur) {
                candidates.push(cur);
            }
            cur = next;
        }
        candidates.into_iter().rev().find(|&cand| {
            let cand_len = self.bit_of(cand);
            Prefix::equal_to_length(&self.prefix_of(cand), query, cand_len)
        })
    }

    // ---- insert (§4.2 "Insert (lookup-or-create)") ----

    pub(crate) fn lookup_or_create(
        &mut self,
        query: &Prefix,
    ) -> Result<Slotted, PrefixMapError> {
        if self.head == NIL {
            let id = self.alloc(Node {
                bit: query.bitlen(),
                prefix: *query,
                value: None,
                left: NIL,
                right: NIL,
                parent: NIL,
            })?;
            self.head = id;
            return Ok(Slotted::Created(id));
        }

        let mut n = self.descend_to_stop(query).expect("head is non-nil");
        let check = self.bit_of(n).min(query.bitlen());
        let mut diff = Prefix::first_diff_bit(query, &self.prefix_of(n), check);
        if diff > check {
            diff = check;
        }

        while self.parent_of(n) != NIL && self.bit_of(self.parent_of(n)) >= diff
        {
            n = self.parent_of(n);
        }
        let n_bit = self.bit_of(n);

        trace!(
            "insert: stop at node {n} (bit {n_bit}), diff={diff}, query.bitlen={}",
            query.bitlen()
        );

        // Case A: an exact slot for this prefix already exists.
        if diff == query.bitlen() && n_bit == query.bitlen() {
            if self.is_real(n) {
                return Ok(Slotted::Existing(n));
            }
            self.node_mut(n).prefix = *query;
            return Ok(Slotted::Created(n));
        }

        // Case B: extend the trie at N.
        if n_bit == diff {
            let c = self.alloc(Node {
                bit: query.bitlen(),
                prefix: *query,
                value: None,
                left: NIL,
                right: NIL,
                parent: n,
            })?;
            if query.bit(n_bit) == 1 {
                self.set_right(n, c);
            } else {
                self.set_left(n, c);
            }
            return Ok(Slotted::Created(c));
        }

        // Case C: the query is an ancestor of N.
        if diff == query.bitlen() {
            let c = self.alloc(Node {
                bit: query.bitlen(),
                prefix: *query,
                value: None,
                left: NIL,
                right: NIL,
                parent: NIL,
            })?;
            let p = self.parent_of(n);
            if self.prefix_of(n).bit(query.bitlen()) == 1 {
                self.set_right(c, n);
            } else {
                self.set_left(c, n);
            }
            self.set_parent(n, c);
            self.set_parent(c, p);
            self.replace_child(p, n, c);
            return Ok(Slotted::Created(c));
        }

        // Case D: N and the query diverge at `diff`, strictly shorter
        // than both. Pre-allocate both new nodes before splicing
        // anything, so a `Capacity` failure leaves the trie unchanged.
        let c = self.alloc(Node {
            bit: query.bitlen(),
            prefix: *query,
            value: None,
            left: NIL,
            right: NIL,
            parent: NIL,
        })?;
        let g = match self.alloc(Node {
            bit: diff,
            prefix: *query,
            value: None,
            left: NIL,
            right: NIL,
            parent: NIL,
        }) {
            Ok(id) => id,
            Err(e) => {
                self.free(c);
                return Err(e);
            }
        };
        let p = self.parent_of(n);
        if query.bit(diff) == 1 {
            self.set_right(g, c);
            self.set_left(g, n);
        } else {
            self.set_left(g, c);
            self.set_right(g, n);
        }
        self.set_parent(c, g);
        self.set_parent(n, g);
        self.set_parent(g, p);
        self.replace_child(p, n, g);
        Ok(Slotted::Created(c))
    }

    // ---- remove (§4.2 "Remove") ----

    /// Removes the value from a real node and performs the structural
    /// clean-up (re-gluing) that follows. Returns the displaced value.
    pub(crate) fn remove_real(&mut self, id: NodeId) -> V {
        let value = self.take_value(id).expect("remove_real on real node");
        self.detach(id);
        value
    }

    fn detach(&mut self, n: NodeId) {
        let left = self.node(n).left;
        let right = self.node(n).right;

        if left != NIL && right != NIL {
            // Both children remain: keep N, now a glue node.
            return;
        }

        let parent = self.node(n).parent;

        if left == NIL && right == NIL {
            self.replace_child(parent, n, NIL);
            self.free(n);
            if parent != NIL && !self.is_real(parent) {
                self.splice_out_if_redundant(parent);
            }
            return;
        }

        // Exactly one child: splice N out, its child takes N's slot.
        let child = if left != NIL { left } else { right };
        self.set_parent(child, parent);
        self.replace_child(parent, n, child);
        self.free(n);
    }

    /// A glue node left with at most one child after a detach is no
    /// longer doing any branching work; splice it out of the graph.
    fn splice_out_if_redundant(&mut self, glue: NodeId) {
        let left = self.node(glue).left;
        let right = self.node(glue).right;
        let remaining = match (left != NIL, right != NIL) {
            (true, true) => return,
            (true, false) => left,
            (false, true) => right,
            (false, false) => NIL,
        };
        let grandparent = self.node(glue).parent;
        if remaining != NIL {
            self.set_parent(remaining, grandparent);
        }
        self.replace_child(grandparent, glue, remaining);
        self.free(glue);
    }

    // ---- enumeration (§4.2 "Enumeration") ----
    //
    // Explicit-stack walk bounded by `maxbits + 1`: every entry pushed is
    // a `right` child deferred while descending `left`, and depth cannot
    // exceed the bit length.

    fn walk(&self, include_glue: bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.head == NIL {
            return out;
        }
        let mut stack = Vec::with_capacity(self.maxbits as usize + 1);
        stack.push(self.head);
        while let Some(id) = stack.pop() {
            if include_glue || self.is_real(id) {
                out.push(id);
            }
            let r = self.right_of(id);
            let l = self.left_of(id);
            if r != NIL {
                stack.push(r);
            }
            if l != NIL {
                stack.push(l);
            }
        }
        out
    }

    pub(crate) fn walk_real(&self) -> Vec<NodeId> {
        self.walk(false)
    }

    pub(crate) fn walk_all(&self) -> Vec<NodeId> {
        self.walk(true)
    }

    // ---- children / parent (§4.2) ----

    pub(crate) fn children_of(&self, base: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = Vec::with_capacity(self.maxbits as usize + 1);
        let r = self.right_of(base);
        let l = self.left_of(base);
        if r != NIL {
            stack.push(r);
        }
        if l != NIL {
            stack.push(l);
        }
        while let Some(id) = stack.pop() {
            if self.is_real(id) {
                out.push(id);
            }
            let r = self.right_of(id);
            let l = self.left_of(id);
            if r != NIL {
                stack.push(r);
            }
            if l != NIL {
                stack.push(l);
            }
        }
        out
    }
}
