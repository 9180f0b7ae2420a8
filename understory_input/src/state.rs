// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pointer state: the pointer table, deferred exits, and capture lists.
//!
//! ## Overview
//!
//! [`PointerStateTable`] exclusively owns one [`PointerRecord`] per active pointer id.
//! Records only hold node *keys*; every key is re-validated against the host before use.
//!
//! [`ExitedStates`] holds [`ExitedStateEntry`] values for nodes that left the tree while a
//! pointer still considered them entered. They are drained (fired) the next time that
//! pointer's messages are processed.

use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::Point;
use smallvec::SmallVec;

use crate::types::{DeviceType, NodeKey, PointerId};

/// State tracked for one pointer id.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerRecord<K> {
    /// Pointer identifier.
    pub id: PointerId,
    /// Device that produced the pointer.
    pub device: DeviceType,
    /// Position committed at the end of the last processed message.
    pub last_position: Point,
    /// Contact made or button held.
    pub is_down: bool,
    /// The platform canceled the pointer; `Canceled` has been raised.
    pub is_canceled: bool,
    /// Capture requests are refused (set while `CaptureLost` is being raised).
    pub capture_denied: bool,
    /// Innermost node of the hovered ancestor chain.
    pub entered: Option<K>,
    /// Node holding exclusive capture of this pointer.
    pub captured: Option<K>,
    // Nodes of an in-progress propagation whose Entered has not fired yet.
    pub(crate) pending_enters: SmallVec<[K; 4]>,
}

impl<K> PointerRecord<K> {
    /// A fresh record with nothing entered or captured.
    pub fn new(id: PointerId, device: DeviceType, position: Point) -> Self {
        Self {
            id,
            device,
            last_position: position,
            is_down: false,
            is_canceled: false,
            capture_denied: false,
            entered: None,
            captured: None,
            pending_enters: SmallVec::new(),
        }
    }
}

/// Table of active pointers keyed by id.
#[derive(Clone, Debug)]
pub struct PointerStateTable<K> {
    records: HashMap<PointerId, PointerRecord<K>>,
}

impl<K> Default for PointerStateTable<K> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<K: NodeKey> PointerStateTable<K> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `id`.
    pub fn get(&self, id: PointerId) -> Option<&PointerRecord<K>> {
        self.records.get(&id)
    }

    /// Mutable record for `id`.
    pub fn get_mut(&mut self, id: PointerId) -> Option<&mut PointerRecord<K>> {
        self.records.get_mut(&id)
    }

    /// Record for `id`, creating it on first sight. The flag reports whether it was created.
    pub fn get_or_create(
        &mut self,
        id: PointerId,
        device: DeviceType,
        position: Point,
    ) -> (&mut PointerRecord<K>, bool) {
        let mut created = false;
        let record = self.records.entry(id).or_insert_with(|| {
            created = true;
            PointerRecord::new(id, device, position)
        });
        (record, created)
    }

    /// Remove and return the record for `id`.
    pub fn remove(&mut self, id: PointerId) -> Option<PointerRecord<K>> {
        self.records.remove(&id)
    }

    /// Number of active pointers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no pointer is active.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &PointerRecord<K>> + '_ {
        self.records.values()
    }

    /// Pointers captured by `node`, or by any node when `node` is `None`, sorted by id.
    pub fn captured_pointers(&self, node: Option<K>) -> SmallVec<[PointerId; 4]> {
        let mut out: SmallVec<[PointerId; 4]> = self
            .records
            .values()
            .filter(|r| match (r.captured, node) {
                (Some(c), Some(n)) => c == n,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .map(|r| r.id)
            .collect();
        out.sort_unstable();
        out
    }
}

/// A deferred Exited notification for a node that left the tree while entered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitedStateEntry<K> {
    /// Pointer whose hover chain contained the node.
    pub pointer: PointerId,
    /// The entered node at the time of removal (the removed node or a descendant of it).
    pub exited: K,
    /// Nodes from `exited` up to and including the removed node that had received `Entered`,
    /// captured before detachment.
    pub detached_chain: SmallVec<[K; 8]>,
}

/// Pending [`ExitedStateEntry`] values, unique per `(pointer, exited)` key.
#[derive(Clone, Debug)]
pub struct ExitedStates<K> {
    entries: Vec<ExitedStateEntry<K>>,
}

impl<K> Default for ExitedStates<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: NodeKey> ExitedStates<K> {
    /// Record an entry, replacing any entry with the same key.
    pub fn insert(&mut self, entry: ExitedStateEntry<K>) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.pointer == entry.pointer && e.exited == entry.exited)
        {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    /// Remove and return all entries for `pointer`, oldest first.
    pub fn take_for(&mut self, pointer: PointerId) -> Vec<ExitedStateEntry<K>> {
        let (taken, kept) = core::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.pointer == pointer);
        self.entries = kept;
        taken
    }

    /// Whether an entry exists for `(pointer, exited)`.
    pub fn contains(&self, pointer: PointerId, exited: K) -> bool {
        self.entries
            .iter()
            .any(|e| e.pointer == pointer && e.exited == exited)
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reverse index of capture: which pointers each node currently holds.
#[derive(Clone, Debug)]
pub(crate) struct CaptureLists<K> {
    by_node: HashMap<K, SmallVec<[PointerId; 2]>>,
}

impl<K> Default for CaptureLists<K> {
    fn default() -> Self {
        Self {
            by_node: HashMap::new(),
        }
    }
}

impl<K: NodeKey> CaptureLists<K> {
    pub(crate) fn add(&mut self, node: K, pointer: PointerId) {
        let list = self.by_node.entry(node).or_default();
        if !list.contains(&pointer) {
            list.push(pointer);
        }
    }

    pub(crate) fn remove(&mut self, node: K, pointer: PointerId) {
        if let Some(list) = self.by_node.get_mut(&node) {
            list.retain(|p| *p != pointer);
            if list.is_empty() {
                self.by_node.remove(&node);
            }
        }
    }

    pub(crate) fn of(&self, node: K) -> SmallVec<[PointerId; 2]> {
        self.by_node.get(&node).cloned().unwrap_or_default()
    }
}

/// Bookkeeping that is not tied to a single pointer record.
#[derive(Clone, Debug, Default)]
pub(crate) struct Session {
    pub(crate) last_input_device: Option<DeviceType>,
    pub(crate) keep_uia_focus_state: bool,
    pub(crate) barrel_button_pressed: bool,
    // The right button flag is gone by the time the up arrives, so remember who pressed it.
    pub(crate) right_button_pointer: Option<PointerId>,
    pub(crate) primary_pointer: Option<PointerId>,
    pub(crate) primary_position_override: Option<Point>,
    pub(crate) context_menu_on_holding: bool,
    pub(crate) native_capture: Option<PointerId>,
    pub(crate) interactions: SmallVec<[PointerId; 4]>,
}

impl Session {
    pub(crate) fn note_input_device(&mut self, device: DeviceType, keep_uia_focus_state: bool) {
        self.last_input_device = Some(device);
        if !keep_uia_focus_state {
            self.keep_uia_focus_state = false;
        }
    }
}
