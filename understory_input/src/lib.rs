// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_input --heading-base-level=0

//! Understory Input: deterministic, `no_std` pointer and drag-and-drop routing for retained UI trees.
//!
//! ## Overview
//!
//! Given normalized pointer messages (down, update, up, enter, leave, wheel, capture changed,
//! suspended) and drag messages, this crate decides which node of a visual tree receives each
//! event, maintains per-pointer hover state so that `Entered`/`Exited` fire exactly once per
//! node transition, enforces exclusive pointer capture, and handles light-dismiss popups that
//! may pass certain input through to the content underneath.
//!
//! It does not own the tree, do layout, or render. The toolkit supplies all of that through
//! [`InputHost`](crate::host::InputHost).
//!
//! ## Pieces
//!
//! - [`InputManager`](crate::manager::InputManager): routing state for one content root and the
//!   per-message entry points, [`InputManager::process_pointer_message`] and
//!   [`InputManager::process_drag_drop`].
//! - [`HitTestEngine`](crate::hit_test::HitTestEngine): point to node, including the
//!   light-dismiss pass-through rules of a [`LightDismissPolicy`](crate::config::LightDismissPolicy).
//! - [`propagate`](crate::propagate::propagate): the path-diff algorithm behind every
//!   `Entered`/`Exited` and `DragEnter`/`DragLeave` sequence.
//! - [`PointerStateTable`](crate::state::PointerStateTable) and
//!   [`ExitedStates`](crate::state::ExitedStates): per-pointer records and exits deferred
//!   because their node left the tree.
//!
//! ## Guarantees
//!
//! - Within one propagation, every `Exited` fires before any `Entered`.
//! - Over a pointer's lifetime, each node gets as many `Exited` as `Entered`.
//! - At most one node holds capture of a pointer; a new grant fires `CaptureLost` on the old holder first.
//! - Exits deferred by [`InputManager::node_leaving_tree`] fire before anything else at the pointer's next message.
//! - Handlers may mutate the tree or pump nested messages; state is re-read after every callout.
//!
//! ## Minimal usage
//!
//! ```
//! use kurbo::{Point, Rect};
//! use understory_input::{
//!     DispatchFailed, InputHost, InputManager, InputMessage, MessageKind, PointerEvent,
//!     PointerEventKind, PointerInfo,
//! };
//!
//! /// Root 0 holds a button 1 at (10, 10)..(50, 50).
//! #[derive(Default)]
//! struct Host {
//!     log: Vec<(PointerEventKind, u32)>,
//! }
//!
//! impl InputHost for Host {
//!     type Node = u32;
//!     fn parent_of(&self, node: u32) -> Option<u32> {
//!         (node == 1).then_some(0)
//!     }
//!     fn is_live(&self, node: u32) -> bool {
//!         node <= 1
//!     }
//!     fn is_hit_test_visible(&self, _node: u32) -> bool {
//!         true
//!     }
//!     fn hit_test_root(&self) -> Option<u32> {
//!         Some(0)
//!     }
//!     fn hit_test(&self, pt: Point, _root: u32, excluded: Option<u32>) -> Option<u32> {
//!         let button = Rect::new(10.0, 10.0, 50.0, 50.0);
//!         (button.contains(pt) && excluded != Some(1)).then_some(1)
//!     }
//!     fn raise_pointer(&mut self, ev: &mut PointerEvent<u32>) -> Result<(), DispatchFailed> {
//!         self.log.push((ev.kind, ev.target));
//!         Ok(())
//!     }
//! }
//!
//! let manager = InputManager::new();
//! let mut host = Host::default();
//! let over = InputMessage::new(MessageKind::PointerUpdate, PointerInfo::mouse(), Point::new(20.0, 20.0));
//! let out = manager.process_pointer_message(&mut host, &over).unwrap();
//! assert_eq!(out.target, Some(1));
//! assert_eq!(
//!     host.log,
//!     [
//!         (PointerEventKind::Entered, 1),
//!         (PointerEventKind::Entered, 0),
//!         (PointerEventKind::Moved, 1),
//!     ]
//! );
//! ```
//!
//! ## Features
//!
//! - `box_tree_adapter`: `adapters::box_tree::BoxTreeHost`, a host over an
//!   `understory_box_tree::Tree` with a popup registry and an event log.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod adapters;
pub mod config;
pub mod error;
pub mod host;
pub mod manager;
pub mod propagate;
pub mod state;
pub mod types;

mod capture;
mod drag;
mod pointer;

#[cfg(test)]
mod test_host;

pub use config::{EnterOrder, InputConfig, LightDismissPolicy, ReentrancyPolicy};
pub use error::InputError;
pub use host::{DispatchFailed, InputHost, PopupClose, PopupInfo};
pub use manager::InputManager;
pub use types::{
    DeviceType, DragEvent, DragMessage, DragMessageKind, DragOperations, DragOutcome,
    InputMessage, KeyModifiers, MessageKind, NodeKey, PointerEvent, PointerEventKind, PointerId,
    PointerInfo, PointerOutcome, RoutedMessage,
};
