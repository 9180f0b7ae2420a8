// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer capture: exclusive routing of one pointer to one node.
//!
//! ## Rules
//!
//! - [`InputManager::try_capture`] succeeds only while the pointer is down, capture is not
//!   denied, and no other node holds that pointer. Capturing again with the holder is a no-op
//!   that reports success.
//! - Mouse capture is also taken from the host's native capture slot. There is one slot per
//!   content root: granting it to a second mouse pointer first releases the previous holder,
//!   which receives `PointerCaptureLost` before the new grant completes.
//! - Releasing raises `PointerCaptureLost` at the pointer's last committed position, on the
//!   captured node or, if that node has left the tree, on the entered node. Capture requests
//!   are denied while that event is being raised.
//! - Releasing capture you do not hold does nothing.

use kurbo::Point;
use tracing::{debug, warn};

use crate::error::InputError;
use crate::host::InputHost;
use crate::manager::{InputManager, raise};
use crate::types::{
    DeviceType, KeyModifiers, NodeKey, PointerEvent, PointerEventKind, PointerId,
};

enum Check {
    Deny,
    Held,
    Grant(DeviceType),
}

/// What a cleared capture looked like, for raising `PointerCaptureLost`.
struct Released<K> {
    node: K,
    entered: Option<K>,
    last_position: Point,
    device: DeviceType,
}

impl<K: NodeKey> InputManager<K> {
    /// Capture `pointer` to `node`. Returns whether `node` holds the capture afterwards.
    pub fn try_capture<H>(&self, host: &mut H, node: K, pointer: PointerId) -> bool
    where
        H: InputHost<Node = K>,
    {
        if !host.is_live(node) {
            return false;
        }
        let device = match self.check_capture(node, pointer) {
            Check::Deny => return false,
            Check::Held => return true,
            Check::Grant(device) => device,
        };

        if device == DeviceType::Mouse {
            let other = self.with_state(|s| {
                s.session
                    .native_capture
                    .filter(|holder| *holder != pointer)
            });
            if let Some(other) = other {
                if let Err(error) = self.release_capture_by_id(host, other) {
                    warn!(displaced = ?other, %error, "capture lost dispatch failed");
                }
                // The CaptureLost handler may have changed everything.
                if !host.is_live(node) || !matches!(self.check_capture(node, pointer), Check::Grant(_)) {
                    return false;
                }
            }
        }

        self.with_state(|s| {
            if let Some(r) = s.pointers.get_mut(pointer) {
                r.captured = Some(node);
            }
            s.captures.add(node, pointer);
        });
        if device == DeviceType::Mouse && host.acquire_native_capture(pointer) {
            self.with_state(|s| s.session.native_capture = Some(pointer));
        }
        debug!(?pointer, ?node, "capture granted");
        true
    }

    /// Release `pointer`'s capture if `node` holds it, raising `PointerCaptureLost`.
    pub fn release_capture<H>(
        &self,
        host: &mut H,
        node: K,
        pointer: PointerId,
    ) -> Result<(), InputError>
    where
        H: InputHost<Node = K>,
    {
        if self.captured_node(pointer) != Some(node) {
            return Ok(());
        }
        self.release_capture_by_id(host, pointer)
    }

    /// Release whatever node holds `pointer`, raising `PointerCaptureLost`.
    pub fn release_capture_by_id<H>(&self, host: &mut H, pointer: PointerId) -> Result<(), InputError>
    where
        H: InputHost<Node = K>,
    {
        let Some(released) = self.take_capture(host, pointer) else {
            return Ok(());
        };
        let target = if host.is_live(released.node) {
            Some(released.node)
        } else {
            released.entered.filter(|e| host.is_live(*e))
        };
        let Some(target) = target else {
            return Ok(());
        };

        let was_denied = self.set_capture_denied(pointer, true);
        let mut ev = PointerEvent {
            kind: PointerEventKind::CaptureLost,
            target,
            position: released.last_position,
            pointer,
            device: released.device,
            modifiers: KeyModifiers::empty(),
            wheel_delta: 0,
            handled: false,
        };
        let result = raise(host, &mut ev);
        self.set_capture_denied(pointer, was_denied);
        result.map(|_| ())
    }

    /// Release every capture, or only those held by `node`.
    ///
    /// All releases are attempted; the first dispatch failure is returned.
    pub fn release_all_captures<H>(&self, host: &mut H, node: Option<K>) -> Result<(), InputError>
    where
        H: InputHost<Node = K>,
    {
        let pointers = self.with_state(|s| s.pointers.captured_pointers(node));
        let mut result = Ok(());
        for pointer in pointers {
            let r = self.release_capture_by_id(host, pointer);
            if result.is_ok() {
                result = r;
            }
        }
        result
    }

    /// Clear `pointer`'s capture without raising anything.
    pub(crate) fn release_capture_silently<H>(&self, host: &mut H, pointer: PointerId)
    where
        H: InputHost<Node = K>,
    {
        let _ = self.take_capture(host, pointer);
    }

    fn check_capture(&self, node: K, pointer: PointerId) -> Check {
        self.with_state(|s| match s.pointers.get(pointer) {
            None => Check::Deny,
            Some(r) if r.captured == Some(node) => Check::Held,
            Some(r) if r.captured.is_some() || !r.is_down || r.capture_denied => Check::Deny,
            Some(r) => Check::Grant(r.device),
        })
    }

    fn take_capture<H>(&self, host: &mut H, pointer: PointerId) -> Option<Released<K>>
    where
        H: InputHost<Node = K>,
    {
        let (released, native) = self.with_state(|s| {
            let r = s.pointers.get_mut(pointer)?;
            let node = r.captured.take()?;
            let released = Released {
                node,
                entered: r.entered,
                last_position: r.last_position,
                device: r.device,
            };
            s.captures.remove(node, pointer);
            let native = s.session.native_capture == Some(pointer);
            if native {
                s.session.native_capture = None;
            }
            Some((released, native))
        })?;
        if native {
            host.release_native_capture();
        }
        debug!(?pointer, node = ?released.node, "capture released");
        Some(released)
    }

    /// Set the capture-denied flag; returns the previous value.
    pub(crate) fn set_capture_denied(&self, pointer: PointerId, denied: bool) -> bool {
        self.with_state(|s| {
            s.pointers
                .get_mut(pointer)
                .map(|r| core::mem::replace(&mut r.capture_denied, denied))
                .unwrap_or(false)
        })
    }
}
