// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_box_tree --heading-base-level=0

//! Understory Box Tree: a Kurbo-native box tree for hit testing retained UI scenes.
//!
//! - Represents a hierarchy of regions with local bounds, transforms, z-order, and flags.
//! - Answers "what is the topmost node under this point" for the whole tree or a single subtree.
//! - Lets a caller temporarily disable hit testing on one subtree for a single query, which is
//!   how input routing looks *through* an overlay such as a light-dismiss layer.
//!
//! ## Where this fits: three-tree model
//!
//! We’re standardizing on a simple separation of concerns for UI stacks.
//! - Widget tree: interaction/state.
//! - Box tree: geometry and picking (this crate).
//! - Render tree: display list (future crate).
//!
//! Input routing (see `understory_input`) consumes this crate through a narrow host interface:
//! parent lookup, liveness, visibility, and point hit testing.
//!
//! ## Not a layout engine
//!
//! This crate does not perform layout (measurement or arrangement).
//! Upstream code computes positions and sizes and then updates this tree with the resulting boxes,
//! transforms, and z-order.
//!
//! ## Picking order
//!
//! Hit testing walks each root in paint order: a parent is painted before its children, and
//! siblings are painted by ascending `z_index` with insertion order breaking ties.
//! The last node painted under the point wins, so children sit above their parents and later
//! siblings above earlier ones.
//!
//! ## API overview
//!
//! - [`Tree`]: container managing nodes and their links.
//! - [`LocalNode`]: per-node local data (bounds, transform, z, flags).
//! - [`NodeFlags`]: visibility and picking controls.
//! - [`NodeId`]: generational handle of a node.
//! - [`QueryFilter`]: restricts hit results (visible/pickable) and can exclude a subtree.
//!
//! ### Minimal usage
//!
//! ```
//! use understory_box_tree::{Tree, LocalNode, QueryFilter};
//! use kurbo::{Rect, Affine, Vec2, Point};
//!
//! let mut tree = Tree::new();
//!
//! let root = tree.insert(
//!     None,
//!     LocalNode { local_bounds: Rect::new(0.0, 0.0, 200.0, 200.0), ..Default::default() },
//! );
//!
//! let child = tree.insert(
//!     Some(root),
//!     LocalNode { local_bounds: Rect::new(10.0, 10.0, 60.0, 60.0), ..Default::default() },
//! );
//!
//! tree.set_local_transform(child, Affine::translate(Vec2::new(10.0, 0.0)));
//!
//! let filter = QueryFilter::pickable();
//! let hit = tree.hit_test_point(Point::new(25.0, 25.0), filter).unwrap();
//! assert_eq!(hit.node, child);
//! assert_eq!(hit.path, vec![root, child]);
//!
//! // Look through the child as if its hit testing were disabled.
//! let hit = tree
//!     .hit_test_point(Point::new(25.0, 25.0), filter.excluding(child))
//!     .unwrap();
//! assert_eq!(hit.node, root);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use bitflags::bitflags;
use kurbo::{Affine, Point, Rect};

/// Identifier for a node in the tree (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32, u32);

impl NodeId {
    fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is visible. An invisible node hides its whole subtree from queries.
        const VISIBLE  = 0b0000_0001;
        /// Node is pickable (participates in hit testing). Children are unaffected.
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// Local geometry for a node.
#[derive(Clone, Debug)]
pub struct LocalNode {
    /// Local (untransformed) bounds.
    pub local_bounds: Rect,
    /// Local transform relative to parent space.
    pub local_transform: Affine,
    /// Z-order within the parent. Higher is painted (and picked) on top.
    pub z_index: i32,
    /// Visibility and picking flags.
    ///
    /// See [`NodeFlags`] for available bits and how they interact with [`QueryFilter`].
    pub flags: NodeFlags,
}

impl Default for LocalNode {
    fn default() -> Self {
        Self {
            local_bounds: Rect::ZERO,
            local_transform: Affine::IDENTITY,
            z_index: 0,
            flags: NodeFlags::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct Node {
    generation: u32,
    // Insertion sequence number; orders roots for picking.
    order: u64,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: LocalNode,
}

impl Node {
    fn new(generation: u32, order: u64, local: LocalNode) -> Self {
        Self {
            generation,
            order,
            parent: None,
            children: Vec::new(),
            local,
        }
    }
}

/// Top-level region tree.
#[derive(Default)]
pub struct Tree {
    nodes: Vec<Option<Node>>, // generational slots
    // Generation of the last occupant of each slot, so reused slots never alias stale ids.
    generations: Vec<u32>,
    free_list: Vec<usize>,
    next_order: u64,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .finish_non_exhaustive()
    }
}

/// Results of a hit test.
#[derive(Clone, Debug)]
pub struct Hit {
    /// The matched node.
    pub node: NodeId,
    /// Path from root to node (inclusive).
    pub path: Vec<NodeId>,
}

/// Filters applied during hit testing.
///
/// Used by [`Tree::hit_test_point`] and [`Tree::hit_test_subtree`].
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryFilter {
    /// If true, only consider nodes marked [`NodeFlags::VISIBLE`].
    pub visible_only: bool,
    /// If true, only consider nodes marked [`NodeFlags::PICKABLE`] (hit-test).
    pub pickable_only: bool,
    /// A subtree whose hit testing is disabled for this query.
    pub excluded: Option<NodeId>,
}

impl QueryFilter {
    /// Visible and pickable nodes only; the filter used for input routing.
    pub const fn pickable() -> Self {
        Self {
            visible_only: true,
            pickable_only: true,
            excluded: None,
        }
    }

    /// Return a copy of this filter that skips the subtree rooted at `node`.
    pub const fn excluding(self, node: NodeId) -> Self {
        Self {
            excluded: Some(node),
            ..self
        }
    }
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new node as a child of `parent` (or as a root if `None`).
    ///
    /// A dead `parent` makes the new node a root.
    pub fn insert(&mut self, parent: Option<NodeId>, local: LocalNode) -> NodeId {
        let order = self.next_order;
        self.next_order += 1;
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generations[idx] += 1;
            self.nodes[idx] = Some(Node::new(self.generations[idx], order, local));
            idx
        } else {
            self.generations.push(1);
            self.nodes.push(Some(Node::new(1, order, local)));
            self.nodes.len() - 1
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "NodeId uses 32-bit indices by design."
        )]
        let id = NodeId::new(idx as u32, self.generations[idx]);
        if let Some(p) = parent.filter(|p| self.is_alive(*p)) {
            self.link_parent(id, p);
        }
        id
    }

    /// Remove a node (and its subtree) from the tree.
    ///
    /// Ids of removed nodes stay dead even when their slots are reused.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            self.unlink_parent(id, parent);
        }
        let mut stack = alloc::vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes[next.idx()].take() {
                stack.extend(node.children);
                self.free_list.push(next.idx());
            }
        }
    }

    /// Reparent `id` under `new_parent` (or make it a root if `None`).
    ///
    /// Returns `false` and leaves the tree untouched if either node is dead or if
    /// `new_parent` lies inside the subtree of `id`.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        if let Some(p) = new_parent
            && (!self.is_alive(p) || self.is_ancestor_or_self(id, p))
        {
            return false;
        }
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            self.unlink_parent(id, parent);
        }
        if let Some(p) = new_parent {
            self.link_parent(id, p);
        }
        true
    }

    /// Update local bounds.
    pub fn set_local_bounds(&mut self, id: NodeId, bounds: Rect) {
        if let Some(node) = self.node_mut(id) {
            node.local.local_bounds = bounds;
        }
    }

    /// Update local transform.
    pub fn set_local_transform(&mut self, id: NodeId, transform: Affine) {
        if let Some(node) = self.node_mut(id) {
            node.local.local_transform = transform;
        }
    }

    /// Update z index.
    pub fn set_z_index(&mut self, id: NodeId, z: i32) {
        if let Some(node) = self.node_mut(id) {
            node.local.z_index = z;
        }
    }

    /// Update flags.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        if let Some(node) = self.node_mut(id) {
            node.local.flags = flags;
        }
    }

    /// Flags of a live node.
    pub fn flags(&self, id: NodeId) -> Option<NodeFlags> {
        self.node(id).map(|n| n.local.flags)
    }

    /// Returns true if `id` refers to a node that has not been removed.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Parent of a live node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children of a live node in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// The root of the tree that contains `id`.
    pub fn root_of(&self, mut id: NodeId) -> Option<NodeId> {
        if !self.is_alive(id) {
            return None;
        }
        while let Some(p) = self.parent(id) {
            id = p;
        }
        Some(id)
    }

    /// Returns true if `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node).filter(|n| self.is_alive(*n));
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// World transform of a live node (product of local transforms from its root).
    pub fn world_transform(&self, id: NodeId) -> Option<Affine> {
        let mut tf = self.node(id)?.local.local_transform;
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            let node = self.node(p)?;
            tf = node.local.local_transform * tf;
            cur = node.parent;
        }
        Some(tf)
    }

    /// Returns the topmost node at a world-space point across all roots.
    ///
    /// Roots are considered in insertion order, so a later root sits above an earlier one.
    /// Honors [`QueryFilter`].
    pub fn hit_test_point(&self, pt: Point, filter: QueryFilter) -> Option<Hit> {
        let mut roots: Vec<(u64, NodeId)> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let node = slot.as_ref().filter(|n| n.parent.is_none())?;
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "NodeId uses 32-bit indices by design."
                )]
                let id = NodeId::new(i as u32, node.generation);
                Some((node.order, id))
            })
            .collect();
        roots.sort_unstable_by_key(|(order, _)| *order);
        let mut best = None;
        for (_, root) in roots {
            self.pick(root, Affine::IDENTITY, pt, filter, &mut best);
        }
        best.map(|node| self.hit_for(node))
    }

    /// Returns the topmost node at a world-space point within the subtree rooted at `root`.
    ///
    /// Transforms of `root`'s ancestors still apply. Honors [`QueryFilter`].
    pub fn hit_test_subtree(&self, root: NodeId, pt: Point, filter: QueryFilter) -> Option<Hit> {
        let parent_tf = match self.parent(root) {
            Some(p) => self.world_transform(p)?,
            None => Affine::IDENTITY,
        };
        let mut best = None;
        self.pick(root, parent_tf, pt, filter, &mut best);
        best.map(|node| self.hit_for(node))
    }

    // --- internals ---

    fn pick(
        &self,
        id: NodeId,
        parent_tf: Affine,
        pt: Point,
        filter: QueryFilter,
        best: &mut Option<NodeId>,
    ) {
        let Some(node) = self.node(id) else {
            return;
        };
        if filter.excluded == Some(id) {
            return;
        }
        if filter.visible_only && !node.local.flags.contains(NodeFlags::VISIBLE) {
            return;
        }
        let world = parent_tf * node.local.local_transform;
        let pickable = !filter.pickable_only || node.local.flags.contains(NodeFlags::PICKABLE);
        if pickable && node.local.local_bounds.contains(world.inverse() * pt) {
            *best = Some(id);
        }
        let mut order: Vec<(i32, NodeId)> = node
            .children
            .iter()
            .filter_map(|c| self.node(*c).map(|n| (n.local.z_index, *c)))
            .collect();
        // Stable: equal z keeps insertion order.
        order.sort_by_key(|(z, _)| *z);
        for (_, child) in order {
            self.pick(child, world, pt, filter, best);
        }
    }

    fn hit_for(&self, node: NodeId) -> Hit {
        let mut path = Vec::new();
        let mut cur = Some(node);
        while let Some(n) = cur {
            path.push(n);
            cur = self.parent(n);
        }
        path.reverse();
        Hit { node, path }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.idx())?
            .as_ref()
            .filter(|n| n.generation == id.1)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.idx())?
            .as_mut()
            .filter(|n| n.generation == id.1)
    }

    fn link_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = Some(parent);
        }
    }

    fn unlink_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
        }
    }
}
