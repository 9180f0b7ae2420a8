// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag-and-drop message processing.
//!
//! ## Overview
//!
//! Drag messages reuse the enter/exit propagation with a sink that raises `DragEnter` and
//! `DragLeave`, and keep their own entered node (a drag is not tied to a pointer record).
//!
//! There are two entry points:
//!
//! - [`InputManager::process_drag_drop`], for in-process drag sources. Results are synchronous.
//! - [`InputManager::process_async_drag_drop`], for drag sources whose `DragOver` result may
//!   arrive later. A `DragOver` handler sets [`DragEvent::deferred`]; the message, resolved
//!   node, and accepted operation are cached, and until [`InputManager::complete_drag_deferral`]
//!   further `DragEnter`/`DragOver` messages answer from the cache without hit testing.
//!
//! `Drop` and `DragLeave` always clear the entered node and the cache, even when dispatch fails.

use kurbo::Point;
use tracing::{debug, trace, warn};

use crate::error::InputError;
use crate::hit_test::{HitQuery, HitTestEngine};
use crate::host::InputHost;
use crate::manager::InputManager;
use crate::propagate::{
    Crossing, CrossingSink, Eligibility, PropagateOptions, PropagationReport, propagate,
};
use crate::types::{
    DragEvent, DragMessage, DragMessageKind, DragOperations, DragOutcome, NodeKey, RoutedMessage,
};

/// Drag state of one content root.
#[derive(Clone, Debug)]
pub(crate) struct DragState<K> {
    pub(crate) entered: Option<K>,
    pub(crate) last_position: Option<Point>,
    pub(crate) accepted: DragOperations,
    pub(crate) cache: Option<DragCache<K>>,
}

impl<K> Default for DragState<K> {
    fn default() -> Self {
        Self {
            entered: None,
            last_position: None,
            accepted: DragOperations::empty(),
            cache: None,
        }
    }
}

/// What a deferred `DragOver` left behind.
#[derive(Copy, Clone, Debug)]
pub(crate) struct DragCache<K> {
    pub(crate) message: DragMessage,
    pub(crate) target: Option<K>,
    pub(crate) accepted: DragOperations,
}

impl<K: NodeKey> InputManager<K> {
    /// Route one drag message from an in-process drag source.
    ///
    /// With `require_move_for_over`, a `DragOver` at an unchanged position that changes no
    /// entered state is not raised again.
    pub fn process_drag_drop<H>(
        &self,
        host: &mut H,
        msg: &DragMessage,
        require_move_for_over: bool,
    ) -> Result<DragOutcome<K>, InputError>
    where
        H: InputHost<Node = K>,
    {
        self.drag_message(host, msg, false, require_move_for_over)
    }

    /// Route one drag message from a drag source that accepts deferred results.
    pub fn process_async_drag_drop<H>(
        &self,
        host: &mut H,
        msg: &DragMessage,
    ) -> Result<DragOutcome<K>, InputError>
    where
        H: InputHost<Node = K>,
    {
        self.drag_message(host, msg, true, false)
    }

    /// Whether a `DragOver` result is pending.
    pub fn is_drag_deferred(&self) -> bool {
        self.with_state(|s| s.drag.cache.is_some())
    }

    /// Innermost node of the drag's entered chain.
    pub fn drag_entered_node(&self) -> Option<K> {
        self.with_state(|s| s.drag.entered)
    }

    /// Update the accepted operation, for example from a deferred handler.
    pub fn set_drag_accepted_operation(&self, accepted: DragOperations) {
        self.with_state(|s| {
            s.drag.accepted = accepted;
            if let Some(cache) = s.drag.cache.as_mut() {
                cache.accepted = accepted;
            }
        });
    }

    /// Finish a deferred `DragOver`, returning the operation it settled on.
    pub fn complete_drag_deferral(&self) -> Option<DragOperations> {
        self.with_state(|s| {
            let cache = s.drag.cache.take()?;
            debug!(kind = ?cache.message.kind, target = ?cache.target, "drag deferral completed");
            s.drag.accepted = cache.accepted;
            Some(cache.accepted)
        })
    }

    fn drag_message<H>(
        &self,
        host: &mut H,
        msg: &DragMessage,
        async_path: bool,
        require_move_for_over: bool,
    ) -> Result<DragOutcome<K>, InputError>
    where
        H: InputHost<Node = K>,
    {
        self.enter_message(RoutedMessage::Drag(msg.kind))?;
        debug!(kind = ?msg.kind, x = msg.position.x, y = msg.position.y, "drag message");
        let result = self.route_drag(host, msg, async_path, require_move_for_over);
        if matches!(msg.kind, DragMessageKind::DragLeave | DragMessageKind::Drop) {
            self.with_state(|s| s.drag = DragState::default());
        }
        if result.is_err() {
            warn!(kind = ?msg.kind, "drag message aborted");
        }
        let superseded = self.leave_message();
        result.map(|outcome| DragOutcome {
            superseded,
            ..outcome
        })
    }

    fn route_drag<H>(
        &self,
        host: &mut H,
        msg: &DragMessage,
        async_path: bool,
        require_move_for_over: bool,
    ) -> Result<DragOutcome<K>, InputError>
    where
        H: InputHost<Node = K>,
    {
        let hovering = matches!(
            msg.kind,
            DragMessageKind::DragEnter | DragMessageKind::DragOver
        );
        if async_path
            && hovering
            && let Some(cache) = self.with_state(|s| s.drag.cache)
        {
            return Ok(DragOutcome {
                target: cache.target,
                accepted: cache.accepted,
                handled: false,
                deferred: true,
                superseded: false,
            });
        }

        let config = self.config();
        let query = HitQuery {
            point: msg.position,
            message: RoutedMessage::Drag(msg.kind),
            right_button: false,
        };
        let contact = HitTestEngine::new(&config.light_dismiss).resolve(host, &query);

        match msg.kind {
            DragMessageKind::DragEnter | DragMessageKind::DragOver => {
                let Some(contact) = contact else {
                    return Ok(DragOutcome::none());
                };
                let old = self.drag_entered_node();
                let report = self.propagate_drag(host, msg, old, Some(contact))?;
                let (moved, previous) = self.with_state(|s| {
                    let moved = s.drag.last_position != Some(msg.position);
                    s.drag.last_position = Some(msg.position);
                    (moved, s.drag.accepted)
                });
                if !async_path
                    && require_move_for_over
                    && msg.kind == DragMessageKind::DragOver
                    && !moved
                    && report.fired() == 0
                {
                    return Ok(DragOutcome {
                        target: Some(contact),
                        accepted: previous,
                        ..DragOutcome::none()
                    });
                }

                let mut ev = DragEvent::from_message(DragMessageKind::DragOver, contact, msg);
                raise_drag(host, &mut ev)?;
                let accepted = ev.accepted & msg.allowed;
                let deferred = async_path && ev.deferred;
                self.with_state(|s| {
                    s.drag.accepted = accepted;
                    if deferred {
                        s.drag.cache = Some(DragCache {
                            message: *msg,
                            target: Some(contact),
                            accepted,
                        });
                    }
                });
                Ok(DragOutcome {
                    target: Some(contact),
                    accepted,
                    handled: ev.handled,
                    deferred,
                    superseded: false,
                })
            }
            DragMessageKind::DragLeave => {
                let old = self.drag_entered_node();
                self.propagate_drag(host, msg, old, None)?;
                Ok(DragOutcome {
                    target: old,
                    ..DragOutcome::none()
                })
            }
            DragMessageKind::Drop => {
                let Some(contact) = contact else {
                    return Ok(DragOutcome::none());
                };
                let old = self.drag_entered_node();
                self.propagate_drag(host, msg, old, Some(contact))?;
                let mut ev = DragEvent::from_message(DragMessageKind::Drop, contact, msg);
                raise_drag(host, &mut ev)?;
                Ok(DragOutcome {
                    target: Some(contact),
                    accepted: ev.accepted & msg.allowed,
                    handled: ev.handled,
                    deferred: false,
                    superseded: false,
                })
            }
        }
    }

    fn propagate_drag<H>(
        &self,
        host: &mut H,
        msg: &DragMessage,
        old: Option<K>,
        new: Option<K>,
    ) -> Result<PropagationReport, InputError>
    where
        H: InputHost<Node = K>,
    {
        let options = PropagateOptions {
            enter_order: self.config().enter_order,
            ..PropagateOptions::default()
        };
        let mut sink = DragCrossings {
            manager: self,
            host,
            msg,
        };
        propagate(&mut sink, old, new, Eligibility::All, options)
    }
}

fn raise_drag<H: InputHost + ?Sized>(
    host: &mut H,
    ev: &mut DragEvent<H::Node>,
) -> Result<(), InputError> {
    host.raise_drag(ev).map_err(|_| {
        warn!(event = ev.kind.name(), target = ?ev.target, "dispatch aborted");
        InputError::Dispatch {
            event: ev.kind.name(),
        }
    })
}

struct DragCrossings<'a, H: InputHost> {
    manager: &'a InputManager<H::Node>,
    host: &'a mut H,
    msg: &'a DragMessage,
}

impl<H: InputHost> CrossingSink<H::Node> for DragCrossings<'_, H> {
    type Error = InputError;

    fn parent_of(&self, node: H::Node) -> Option<H::Node> {
        self.host.parent_of(node)
    }

    fn is_hit_test_visible(&self, node: H::Node) -> bool {
        self.host.is_hit_test_visible(node)
    }

    fn entered(&self) -> Option<H::Node> {
        self.manager.drag_entered_node()
    }

    fn set_entered(&mut self, node: Option<H::Node>) {
        self.manager.with_state(|s| s.drag.entered = node);
    }

    fn fire(&mut self, crossing: Crossing, node: H::Node) -> Result<(), InputError> {
        let kind = match crossing {
            Crossing::Enter => DragMessageKind::DragEnter,
            Crossing::Exit => DragMessageKind::DragLeave,
        };
        trace!(?node, event = kind.name());
        let mut ev = DragEvent::from_message(kind, node, self.msg);
        raise_drag(&mut *self.host, &mut ev)
    }
}
