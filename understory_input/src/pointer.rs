// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer message processing.
//!
//! ## Per-pointer states
//!
//! The states live implicitly in [`PointerRecord`](crate::state::PointerRecord) fields:
//!
//! ```text
//! NoState → Entered → Pressed → (captured ? CapturedMoves* : Moves*)
//!         → Released / CaptureLost / Canceled → NoState
//! ```
//!
//! ## One message
//!
//! [`InputManager::process_pointer_message`] runs these steps:
//!
//! 1. Re-entrancy check against the in-flight stack.
//! 2. Device bookkeeping (skipped for replayed messages), and the pointer record.
//! 3. Deferred exits queued for this pointer fire first.
//! 4. A captured node that left the tree loses capture.
//! 5. Light-dismiss aware hit test. No node means no routing.
//! 6. Cancellation (`PointerCanceled` once per pointer). The first canceled message, a
//!    capture-changed message, and a suspended message then lose capture: the holder gets
//!    `PointerCaptureLost`, or the entered node does when nothing was captured.
//! 7. Dispatch by message kind.
//! 8. Cleanup, on success and failure alike: late deferred exits, the position commit,
//!    interaction bookkeeping, and destruction of finished records.

use tracing::debug;

use crate::config::InputConfig;
use crate::error::InputError;
use crate::hit_test::{HitQuery, HitTestEngine};
use crate::host::{InputHost, PopupClose};
use crate::manager::{InputManager, PointerCrossings, raise};
use crate::propagate::{Eligibility, PropagateOptions, PropagationReport, propagate};
use crate::types::{
    DeviceType, InputMessage, MessageKind, NodeKey, PointerEvent, PointerEventKind, PointerId,
    PointerOutcome, RoutedMessage,
};

/// Facts about the current message gathered during bookkeeping.
#[derive(Copy, Clone, Debug, Default)]
struct Bookkeeping {
    idle: bool,
    touch_like: bool,
    right_button: bool,
}

/// Whether a pointer of `device` is handled like touch.
pub(crate) fn is_touch_like(device: DeviceType, barrel_pressed: bool, config: &InputConfig) -> bool {
    match device {
        DeviceType::Touch => true,
        DeviceType::Pen => !(barrel_pressed && config.pen_barrel_button_acts_like_mouse),
        DeviceType::Mouse | DeviceType::GamepadOrRemote => false,
    }
}

impl<K: NodeKey> InputManager<K> {
    /// Route one pointer message.
    ///
    /// Returns the node the message resolved to and whether its primary event was handled.
    /// Per-message cleanup runs before an error is returned.
    pub fn process_pointer_message<H>(
        &self,
        host: &mut H,
        msg: &InputMessage,
    ) -> Result<PointerOutcome<K>, InputError>
    where
        H: InputHost<Node = K>,
    {
        self.enter_message(RoutedMessage::Pointer(msg.kind))?;
        debug!(
            kind = ?msg.kind,
            pointer = ?msg.pointer.id,
            device = ?msg.pointer.device,
            x = msg.position.x,
            y = msg.position.y,
            "pointer message"
        );
        let mut touch_like = false;
        let result = self.route_pointer(host, msg, &mut touch_like);
        self.finish_pointer(host, msg, touch_like, result.is_err());
        let superseded = self.leave_message();
        result.map(|(target, event_handled)| PointerOutcome {
            target,
            event_handled,
            superseded,
        })
    }

    fn route_pointer<H>(
        &self,
        host: &mut H,
        msg: &InputMessage,
        touch_like_out: &mut bool,
    ) -> Result<(Option<K>, bool), InputError>
    where
        H: InputHost<Node = K>,
    {
        let id = msg.pointer.id;
        let config = self.config();
        let facts = self.bookkeeping(msg, &config);
        *touch_like_out = facts.touch_like;

        self.drain_exited_states(host, msg);

        if let Some(captured) = self.captured_node(id)
            && !host.is_live(captured)
        {
            self.release_capture_by_id(host, id)?;
        }

        let query = HitQuery {
            point: msg.position,
            message: RoutedMessage::Pointer(msg.kind),
            right_button: facts.right_button,
        };
        let Some(mut contact) = HitTestEngine::new(&config.light_dismiss).resolve(host, &query)
        else {
            return Ok((None, false));
        };

        let mut handled = false;
        let mut capture_lost = matches!(
            msg.kind,
            MessageKind::PointerCaptureChanged | MessageKind::Suspended
        );

        // `is_canceled` latches, so only the first canceled message gets here.
        if msg.pointer.canceled {
            let first = self.with_state(|s| {
                s.pointers
                    .get_mut(id)
                    .is_some_and(|r| !core::mem::replace(&mut r.is_canceled, true))
            });
            if first {
                let target = self.captured_node(id).unwrap_or(contact);
                let mut ev = PointerEvent::from_message(PointerEventKind::Canceled, target, msg);
                handled |= raise(host, &mut ev)?;
                capture_lost = true;
            }
        }

        if capture_lost {
            host.stop_context_menu_timer();
            if self.captured_node(id).is_some() {
                self.release_capture_by_id(host, id)?;
                self.with_state(|s| s.session.context_menu_on_holding = false);
            } else {
                self.capture_lost_without_capture(host, msg, contact)?;
                if facts.touch_like && self.with_state(|s| s.session.context_menu_on_holding) {
                    if let Some(c) = self.dismiss_held_context_menu(host, msg, contact, &config)? {
                        contact = c;
                    }
                    self.with_state(|s| s.session.context_menu_on_holding = false);
                }
            }
        }

        match msg.kind {
            MessageKind::PointerEnter => {
                let old = self.entered_node(id);
                self.propagate_pointer(host, msg, old, Some(contact), Eligibility::All, true)?;
            }
            MessageKind::PointerDown => {
                let captured = self.captured_node(id);
                let old = self.entered_node(id);
                let eligibility = captured.map_or(Eligibility::All, Eligibility::UnderCapture);
                self.propagate_pointer(host, msg, old, Some(contact), eligibility, false)?;
                self.with_state(|s| {
                    if let Some(r) = s.pointers.get_mut(id) {
                        r.is_down = true;
                        r.is_canceled = msg.pointer.canceled;
                    }
                    s.session.primary_pointer = Some(id);
                    if msg.pointer.right_button_pressed {
                        s.session.right_button_pointer = Some(id);
                    }
                });
                host.stop_context_menu_timer();
                if facts.touch_like {
                    self.with_state(|s| {
                        if !s.session.interactions.contains(&id) {
                            s.session.interactions.push(id);
                        }
                    });
                    host.interaction_started(id, contact);
                }
                // A capture granted by an Entered handler above already owns the press.
                let target = self.captured_node(id).unwrap_or(contact);
                let mut ev = PointerEvent::from_message(PointerEventKind::Pressed, target, msg);
                handled |= raise(host, &mut ev)?;
            }
            MessageKind::PointerUpdate => {
                let captured = self.captured_node(id);
                let old = self.entered_node(id);
                let eligibility = captured.map_or(Eligibility::All, Eligibility::UnderCapture);
                let report =
                    self.propagate_pointer(host, msg, old, Some(contact), eligibility, false)?;
                let suppress =
                    facts.idle && report.fired() == 0 && config.suppress_idle_updates;
                if !suppress {
                    let target = self.captured_node(id).unwrap_or(contact);
                    let mut ev = PointerEvent::from_message(PointerEventKind::Moved, target, msg);
                    handled |= raise(host, &mut ev)?;
                }
            }
            MessageKind::PointerUp => {
                host.stop_context_menu_timer();
                let captured = self.captured_node(id);
                let target = captured.unwrap_or(contact);
                let mut ev = PointerEvent::from_message(PointerEventKind::Released, target, msg);
                let released = raise(host, &mut ev);
                self.with_state(|s| {
                    if let Some(r) = s.pointers.get_mut(id) {
                        r.is_down = false;
                    }
                });
                handled |= released?;
                if captured.is_some() {
                    self.release_capture_silently(host, id);
                }
                let old = self.entered_node(id);
                let new = (msg.pointer.device != DeviceType::Touch).then_some(contact);
                self.propagate_pointer(host, msg, old, new, Eligibility::All, false)?;
            }
            MessageKind::PointerLeave => {
                let old = self.entered_node(id);
                self.propagate_pointer(host, msg, old, None, Eligibility::All, false)?;
                self.release_capture_by_id(host, id)?;
            }
            MessageKind::PointerWheelChanged => {
                let target = self.captured_node(id).unwrap_or(contact);
                let mut ev =
                    PointerEvent::from_message(PointerEventKind::WheelChanged, target, msg);
                handled |= raise(host, &mut ev)?;
            }
            MessageKind::PointerCaptureChanged | MessageKind::Suspended => {}
        }

        Ok((Some(contact), handled))
    }

    fn bookkeeping(&self, msg: &InputMessage, config: &InputConfig) -> Bookkeeping {
        let id = msg.pointer.id;
        let device = msg.pointer.device;
        self.with_state(|s| {
            let same_spot = s
                .pointers
                .get(id)
                .is_some_and(|r| r.last_position == msg.position && r.device == device);
            if !msg.replayed {
                let keep = msg.kind == MessageKind::PointerUpdate && same_spot;
                s.session.note_input_device(device, keep);
                s.session.barrel_button_pressed = msg.pointer.barrel_button_pressed;
            }
            let barrel = s.session.barrel_button_pressed;
            let right_latched = s.session.right_button_pointer == Some(id);

            let (record, created) = s.pointers.get_or_create(id, device, msg.position);
            record.device = device;
            if created && msg.kind == MessageKind::PointerUpdate && msg.pointer.in_contact {
                record.is_down = true;
            }
            let inherit = inherits_mouse_hover(msg, record.entered.is_none());
            if inherit {
                let seed = s
                    .pointers
                    .get_mut(PointerId::MOUSE)
                    .and_then(|m| m.entered.take());
                if let Some(r) = s.pointers.get_mut(id) {
                    r.entered = seed;
                }
            }

            Bookkeeping {
                idle: msg.kind == MessageKind::PointerUpdate
                    && (msg.replayed || (!created && same_spot)),
                touch_like: is_touch_like(device, barrel, config),
                right_button: msg.pointer.right_button_pressed || right_latched,
            }
        })
    }

    fn propagate_pointer<H>(
        &self,
        host: &mut H,
        msg: &InputMessage,
        old: Option<K>,
        new: Option<K>,
        eligibility: Eligibility<K>,
        force_enter: bool,
    ) -> Result<PropagationReport, InputError>
    where
        H: InputHost<Node = K>,
    {
        let options = PropagateOptions {
            force_enter,
            ignore_visibility: false,
            enter_order: self.config().enter_order,
        };
        let mut sink = PointerCrossings {
            manager: self,
            host,
            msg,
        };
        propagate(&mut sink, old, new, eligibility, options)
    }

    /// `PointerCaptureLost` for a capture-changed message when nobody holds capture.
    fn capture_lost_without_capture<H>(
        &self,
        host: &mut H,
        msg: &InputMessage,
        contact: K,
    ) -> Result<(), InputError>
    where
        H: InputHost<Node = K>,
    {
        let id = msg.pointer.id;
        let target = self
            .entered_node(id)
            .filter(|e| host.is_live(*e))
            .unwrap_or(contact);
        let position = self
            .with_state(|s| s.pointers.get(id).map(|r| r.last_position))
            .unwrap_or(msg.position);
        let was_denied = self.set_capture_denied(id, true);
        let mut ev = PointerEvent::from_message(PointerEventKind::CaptureLost, target, msg);
        ev.position = position;
        let result = raise(host, &mut ev);
        self.set_capture_denied(id, was_denied);
        result.map(|_| ())
    }

    /// A touch press-and-hold lost capture: close the popup under it, or cancel the menu.
    ///
    /// Returns the re-resolved contact when a popup was closed.
    fn dismiss_held_context_menu<H>(
        &self,
        host: &mut H,
        msg: &InputMessage,
        contact: K,
        config: &InputConfig,
    ) -> Result<Option<K>, InputError>
    where
        H: InputHost<Node = K>,
    {
        let mut cur = Some(contact);
        let mut on_overlay = false;
        while let Some(n) = cur {
            if host.is_light_dismiss_overlay(n) {
                on_overlay = true;
                break;
            }
            cur = host.parent_of(n);
        }
        if on_overlay {
            if !config.light_dismiss.hold_dismisses_popup {
                return Ok(None);
            }
            host.close_popups(PopupClose::TopmostLightDismiss);
            let query = HitQuery {
                point: msg.position,
                message: RoutedMessage::Pointer(msg.kind),
                right_button: false,
            };
            Ok(HitTestEngine::new(&config.light_dismiss).resolve(host, &query))
        } else {
            let mut ev =
                PointerEvent::from_message(PointerEventKind::ContextCanceled, contact, msg);
            raise(host, &mut ev)?;
            Ok(None)
        }
    }

    fn finish_pointer<H>(&self, host: &mut H, msg: &InputMessage, touch_like: bool, failed: bool)
    where
        H: InputHost<Node = K>,
    {
        let id = msg.pointer.id;
        self.drain_exited_states(host, msg);

        let destroy = msg.kind == MessageKind::PointerLeave
            || (msg.kind == MessageKind::PointerUp && msg.pointer.device == DeviceType::Touch);
        if destroy {
            self.release_capture_silently(host, id);
        }

        let interaction_over = self.with_state(|s| {
            if msg.kind == MessageKind::PointerUp && s.session.right_button_pointer == Some(id) {
                s.session.right_button_pointer = None;
            }
            if let Some(r) = s.pointers.get_mut(id) {
                r.last_position = msg.position;
                if failed {
                    r.capture_denied = false;
                }
            }
            let ends = destroy || (msg.kind == MessageKind::PointerUp && touch_like);
            let tracked = s.session.interactions.contains(&id);
            if ends && tracked {
                s.session.interactions.retain(|p| *p != id);
            }
            if destroy {
                s.pointers.remove(id);
                if s.session.primary_pointer == Some(id) {
                    s.session.primary_pointer = None;
                }
            }
            ends && tracked
        });
        if interaction_over {
            host.interaction_ended(id);
        }
    }
}

/// A mouse pointer other than the system mouse, entering with nothing entered yet, takes over
/// the system mouse's hover chain.
fn inherits_mouse_hover(msg: &InputMessage, nothing_entered: bool) -> bool {
    msg.kind == MessageKind::PointerEnter
        && msg.pointer.device == DeviceType::Mouse
        && msg.pointer.id != PointerId::MOUSE
        && nothing_entered
}
