// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enter/exit propagation: one path-diff walk for hover, capture-aware hover, and drag.
//!
//! ## Overview
//!
//! When the topmost node under a pointer changes from `old` to `new`, [`propagate`] fires
//! `Exit` on every node that left the ancestor chain and `Enter` on every node that joined it.
//! The walk runs in four passes over a scratch map of [`NodeMarks`]:
//!
//! 1. From `old` to the root: set *dirty*, clear *entered*.
//! 2. From `new` to the root: set *entered*.
//! 3. From `old` upward until the first node still marked *entered* (the lowest common
//!    ancestor): clear *dirty* and fire `Exit`. The sink's entered node is moved to the parent
//!    of each node before it is exited, so a handler that mutates the tree never causes a node
//!    to be exited twice. If a handler moves the entered node elsewhere, the walk resumes there.
//! 4. Over the `new` chain: fire `Enter` on nodes marked *entered* and not *dirty*.
//!
//! Handlers may detach nodes between passes. When `new` is detached during pass 3, the walk
//! settles on its deepest ancestor that is still attached. During pass 4, nodes that are no
//! longer on the entered node's chain are skipped.
//!
//! Every `Exit` fires before any `Enter`. Exits fire child to root; the order of enters is an
//! [`EnterOrder`].
//!
//! The three callers differ only in their [`CrossingSink`] (which events are raised, and
//! where the entered node is stored) and their [`Eligibility`].
//!
//! ## Minimal example
//!
//! ```
//! use understory_input::propagate::{
//!     propagate, Crossing, CrossingSink, Eligibility, PropagateOptions,
//! };
//!
//! // 1 is the root; 2 and 3 are its children.
//! struct Recorder {
//!     entered: Option<u32>,
//!     log: Vec<(Crossing, u32)>,
//! }
//!
//! impl CrossingSink<u32> for Recorder {
//!     type Error = core::convert::Infallible;
//!     fn parent_of(&self, node: u32) -> Option<u32> {
//!         (node != 1).then_some(1)
//!     }
//!     fn is_hit_test_visible(&self, _node: u32) -> bool {
//!         true
//!     }
//!     fn entered(&self) -> Option<u32> {
//!         self.entered
//!     }
//!     fn set_entered(&mut self, node: Option<u32>) {
//!         self.entered = node;
//!     }
//!     fn fire(&mut self, crossing: Crossing, node: u32) -> Result<(), Self::Error> {
//!         self.log.push((crossing, node));
//!         Ok(())
//!     }
//! }
//!
//! let mut sink = Recorder { entered: Some(2), log: Vec::new() };
//! let report = propagate(&mut sink, Some(2), Some(3), Eligibility::All, PropagateOptions::default())
//!     .unwrap();
//! assert_eq!(sink.log, [(Crossing::Exit, 2), (Crossing::Enter, 3)]);
//! assert_eq!(sink.entered, Some(3));
//! assert_eq!(report.fired(), 2);
//! ```

use bitflags::bitflags;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::config::EnterOrder;
use crate::types::NodeKey;

/// Direction of a chain crossing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Crossing {
    /// The node joined the chain.
    Enter,
    /// The node left the chain.
    Exit,
}

/// Where a propagation reads the tree and sends its events.
pub trait CrossingSink<K: NodeKey> {
    /// Error returned by [`CrossingSink::fire`]; aborts the walk.
    type Error;

    /// Parent of `node` in the live tree.
    fn parent_of(&self, node: K) -> Option<K>;

    /// Whether crossing events fire on `node`.
    fn is_hit_test_visible(&self, node: K) -> bool;

    /// The currently stored entered node.
    fn entered(&self) -> Option<K>;

    /// Store the entered node.
    fn set_entered(&mut self, node: Option<K>);

    /// Raise one crossing event.
    fn fire(&mut self, crossing: Crossing, node: K) -> Result<(), Self::Error>;

    /// Nodes of the new chain still waiting for their `Enter`, in firing order.
    ///
    /// Updated before each `Enter` fires and emptied when the walk ends. A sink that lets
    /// handlers detach nodes uses this to keep deferred exits to nodes that actually entered.
    fn set_pending_enters(&mut self, _pending: &[K]) {}
}

/// Which nodes may become entered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Eligibility<K> {
    /// Any node.
    All,
    /// Only the captured node, its descendants, and its ancestors.
    UnderCapture(K),
}

/// Options for one propagation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PropagateOptions {
    /// Treat the two chains as disjoint: exit all of `old`, then enter all of `new`.
    pub force_enter: bool,
    /// Fire `Exit` on nodes that are not hit-test visible (used when nodes leave the tree).
    pub ignore_visibility: bool,
    /// Order of `Enter` events.
    pub enter_order: EnterOrder,
}

/// How many events one propagation fired.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// `Exit` events fired.
    pub exited: usize,
    /// `Enter` events fired.
    pub entered: usize,
}

impl PropagationReport {
    /// Total events fired.
    pub fn fired(&self) -> usize {
        self.exited + self.entered
    }
}

bitflags! {
    /// Scratch state of one node during a propagation.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Mark: u8 {
        /// On the new chain.
        const ENTERED = 0b01;
        /// On the old chain and not yet settled.
        const DIRTY   = 0b10;
    }
}

/// Per-propagation scratch marks, keyed by node.
#[derive(Clone, Debug)]
pub struct NodeMarks<K> {
    marks: HashMap<K, Mark>,
}

impl<K> Default for NodeMarks<K> {
    fn default() -> Self {
        Self {
            marks: HashMap::new(),
        }
    }
}

impl<K: NodeKey> NodeMarks<K> {
    /// Marks currently recorded for `node`.
    pub fn get(&self, node: K) -> Mark {
        self.marks.get(&node).copied().unwrap_or_default()
    }

    fn insert(&mut self, node: K, mark: Mark) {
        *self.marks.entry(node).or_default() |= mark;
    }

    fn remove(&mut self, node: K, mark: Mark) {
        if let Some(m) = self.marks.get_mut(&node) {
            m.remove(mark);
        }
    }

    /// Whether no node carries any mark.
    pub fn is_clean(&self) -> bool {
        self.marks.values().all(|m| m.is_empty())
    }

    /// Drop every mark.
    pub fn clear(&mut self) {
        self.marks.clear();
    }
}

/// Run one propagation from `old` to `new` and return how many events fired.
///
/// The sink's entered node is `new` (after clamping for [`Eligibility::UnderCapture`]) on
/// success. On error the walk stops where it failed; events already fired stay fired.
pub fn propagate<K, S>(
    sink: &mut S,
    old: Option<K>,
    new: Option<K>,
    eligibility: Eligibility<K>,
    options: PropagateOptions,
) -> Result<PropagationReport, S::Error>
where
    K: NodeKey,
    S: CrossingSink<K> + ?Sized,
{
    let mut marks = NodeMarks::default();
    let result = propagate_with(&mut marks, sink, old, new, eligibility, options);
    marks.clear();
    result
}

pub(crate) fn propagate_with<K, S>(
    marks: &mut NodeMarks<K>,
    sink: &mut S,
    old: Option<K>,
    new: Option<K>,
    eligibility: Eligibility<K>,
    options: PropagateOptions,
) -> Result<PropagationReport, S::Error>
where
    K: NodeKey,
    S: CrossingSink<K> + ?Sized,
{
    let new = match eligibility {
        Eligibility::All => new,
        Eligibility::UnderCapture(captured) => clamp_to_capture(sink, captured, new),
    };
    let mut report = PropagationReport::default();

    // Pass 1.
    let mut cur = old;
    while let Some(n) = cur {
        marks.insert(n, Mark::DIRTY);
        marks.remove(n, Mark::ENTERED);
        cur = sink.parent_of(n);
    }

    if !options.force_enter {
        mark_entered(marks, sink, new);
    }
    let planned = chain_of(sink, new);

    // Pass 3.
    let result = exit_old_chain(marks, sink, old, options, &mut report);
    if let Err(e) = result {
        marks.clear();
        return Err(e);
    }
    let new = still_attached(sink, &planned);
    sink.set_entered(new);

    if options.force_enter {
        mark_entered(marks, sink, new);
    }

    // Pass 4.
    let mut chain = chain_of(sink, new);
    if options.enter_order == EnterOrder::RootToChild {
        chain.reverse();
    }
    chain.retain(|n| {
        let mark = marks.get(*n);
        mark.contains(Mark::ENTERED) && !mark.contains(Mark::DIRTY)
    });
    for (i, &n) in chain.iter().enumerate() {
        sink.set_pending_enters(&chain[i + 1..]);
        let current = sink.entered();
        let on_chain =
            current == new || current.is_some_and(|e| is_ancestor_or_self(sink, n, e));
        if !on_chain || !sink.is_hit_test_visible(n) {
            continue;
        }
        if let Err(e) = sink.fire(Crossing::Enter, n) {
            sink.set_pending_enters(&[]);
            marks.clear();
            return Err(e);
        }
        report.entered += 1;
    }
    sink.set_pending_enters(&[]);

    marks.clear();
    Ok(report)
}

fn chain_of<K, S>(sink: &S, from: Option<K>) -> SmallVec<[K; 16]>
where
    K: NodeKey,
    S: CrossingSink<K> + ?Sized,
{
    let mut chain = SmallVec::new();
    let mut cur = from;
    while let Some(n) = cur {
        chain.push(n);
        cur = sink.parent_of(n);
    }
    chain
}

/// Deepest node of `planned` (a chain captured before pass 3) whose ancestry still reaches the
/// chain's top.
fn still_attached<K, S>(sink: &S, planned: &[K]) -> Option<K>
where
    K: NodeKey,
    S: CrossingSink<K> + ?Sized,
{
    let top = *planned.last()?;
    planned
        .iter()
        .copied()
        .find(|&n| is_ancestor_or_self(sink, top, n))
}

// Pass 2.
fn mark_entered<K, S>(marks: &mut NodeMarks<K>, sink: &S, new: Option<K>)
where
    K: NodeKey,
    S: CrossingSink<K> + ?Sized,
{
    let mut cur = new;
    while let Some(n) = cur {
        marks.insert(n, Mark::ENTERED);
        cur = sink.parent_of(n);
    }
}

fn exit_old_chain<K, S>(
    marks: &mut NodeMarks<K>,
    sink: &mut S,
    old: Option<K>,
    options: PropagateOptions,
    report: &mut PropagationReport,
) -> Result<(), S::Error>
where
    K: NodeKey,
    S: CrossingSink<K> + ?Sized,
{
    let mut cur = old;
    while let Some(n) = cur {
        if marks.get(n).contains(Mark::ENTERED) {
            break;
        }
        marks.remove(n, Mark::DIRTY);
        let parent = sink.parent_of(n);
        let tracked = sink.entered() == Some(n);
        if tracked {
            sink.set_entered(parent);
        }
        if options.ignore_visibility || sink.is_hit_test_visible(n) {
            sink.fire(Crossing::Exit, n)?;
            report.exited += 1;
        }
        // A handler that detached part of the chain already moved the entered node past it.
        cur = if tracked { sink.entered() } else { parent };
    }
    Ok(())
}

/// Clamp `hit` to nodes eligible while `captured` holds capture.
fn clamp_to_capture<K, S>(sink: &S, captured: K, hit: Option<K>) -> Option<K>
where
    K: NodeKey,
    S: CrossingSink<K> + ?Sized,
{
    let mut cur = hit;
    while let Some(n) = cur {
        if n == captured {
            return hit;
        }
        cur = sink.parent_of(n);
    }
    let mut cur = hit;
    while let Some(n) = cur {
        if is_ancestor_or_self(sink, n, captured) {
            return Some(n);
        }
        cur = sink.parent_of(n);
    }
    None
}

fn is_ancestor_or_self<K, S>(sink: &S, ancestor: K, node: K) -> bool
where
    K: NodeKey,
    S: CrossingSink<K> + ?Sized,
{
    let mut cur = Some(node);
    while let Some(n) = cur {
        if n == ancestor {
            return true;
        }
        cur = sink.parent_of(n);
    }
    false
}
