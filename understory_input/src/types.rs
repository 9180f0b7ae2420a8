// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types: pointer ids, inbound messages, and outbound routed events.
//!
//! ## Overview
//!
//! Inbound, a platform layer translates native input into [`InputMessage`] (pointer) or
//! [`DragMessage`] (drag and drop) records. Outbound, the engine hands [`PointerEvent`] and
//! [`DragEvent`] values to the host, one per target node, and reads back the `handled`
//! (and, for drags, `accepted`/`deferred`) fields the handlers set.

use core::fmt::Debug;
use core::hash::Hash;

use bitflags::bitflags;
use kurbo::Point;

/// Bound for node keys handed out by an [`InputHost`](crate::host::InputHost).
///
/// Keys are cheap handles (ids, generational indices, interned pointers). The engine never
/// owns nodes; it only stores keys and re-validates them against the host.
pub trait NodeKey: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> NodeKey for T {}

/// Identifier of a pointer (mouse, finger, pen tip).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub u32);

impl PointerId {
    /// The conventional id of the system mouse pointer.
    pub const MOUSE: Self = Self(1);
}

/// Kind of device that produced a pointer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Mouse or touchpad cursor.
    Mouse,
    /// Finger on a touch screen.
    Touch,
    /// Pen or stylus.
    Pen,
    /// Gamepad or remote driving a virtual cursor.
    GamepadOrRemote,
}

bitflags! {
    /// Keyboard modifiers held while a message was generated.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        /// Shift key.
        const SHIFT   = 0b0000_0001;
        /// Control key.
        const CONTROL = 0b0000_0010;
        /// Alt (menu) key.
        const ALT     = 0b0000_0100;
        /// Windows / command key.
        const META    = 0b0000_1000;
    }
}

/// Kind of a normalized pointer message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Pointer entered the content root.
    PointerEnter,
    /// Contact made or button pressed.
    PointerDown,
    /// Pointer moved, or its state changed.
    PointerUpdate,
    /// Contact lifted or button released.
    PointerUp,
    /// Pointer left the content root.
    PointerLeave,
    /// Mouse wheel turned.
    PointerWheelChanged,
    /// The platform took native capture away.
    PointerCaptureChanged,
    /// The platform suspended pointer delivery (for example a system gesture took over).
    Suspended,
}

/// Per-pointer data carried by an [`InputMessage`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PointerInfo {
    /// Pointer identifier.
    pub id: PointerId,
    /// Device that produced the pointer.
    pub device: DeviceType,
    /// The pointer is touching the surface (or a button is held).
    pub in_contact: bool,
    /// The platform canceled this pointer.
    pub canceled: bool,
    /// The right mouse button (or pen barrel equivalent) is pressed.
    pub right_button_pressed: bool,
    /// The pen barrel button is pressed.
    pub barrel_button_pressed: bool,
}

impl PointerInfo {
    /// Pointer info for a device with every flag cleared.
    pub const fn new(id: PointerId, device: DeviceType) -> Self {
        Self {
            id,
            device,
            in_contact: false,
            canceled: false,
            right_button_pressed: false,
            barrel_button_pressed: false,
        }
    }

    /// The system mouse.
    pub const fn mouse() -> Self {
        Self::new(PointerId::MOUSE, DeviceType::Mouse)
    }

    /// A touch contact.
    pub const fn touch(id: u32) -> Self {
        Self::new(PointerId(id), DeviceType::Touch)
    }

    /// A pen.
    pub const fn pen(id: u32) -> Self {
        Self::new(PointerId(id), DeviceType::Pen)
    }

    /// Set the contact flag.
    pub const fn in_contact(mut self, in_contact: bool) -> Self {
        self.in_contact = in_contact;
        self
    }

    /// Set the right button flag.
    pub const fn with_right_button(mut self, pressed: bool) -> Self {
        self.right_button_pressed = pressed;
        self
    }

    /// Set the pen barrel button flag.
    pub const fn with_barrel_button(mut self, pressed: bool) -> Self {
        self.barrel_button_pressed = pressed;
        self
    }

    /// Mark the pointer as canceled by the platform.
    pub const fn canceled(mut self) -> Self {
        self.canceled = true;
        self
    }
}

/// A normalized pointer message, as produced by platform translation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InputMessage {
    /// What happened.
    pub kind: MessageKind,
    /// Which pointer it happened to.
    pub pointer: PointerInfo,
    /// Position in content-root coordinates.
    pub position: Point,
    /// Keyboard modifiers held at the time.
    pub modifiers: KeyModifiers,
    /// Wheel delta for [`MessageKind::PointerWheelChanged`]; zero otherwise.
    pub wheel_delta: i32,
    /// A synthetic message replayed to refresh hover state (for example after layout).
    pub replayed: bool,
}

impl InputMessage {
    /// Create a message with no modifiers, no wheel delta, and not replayed.
    pub const fn new(kind: MessageKind, pointer: PointerInfo, position: Point) -> Self {
        Self {
            kind,
            pointer,
            position,
            modifiers: KeyModifiers::empty(),
            wheel_delta: 0,
            replayed: false,
        }
    }

    /// Set keyboard modifiers.
    pub const fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the wheel delta.
    pub const fn with_wheel_delta(mut self, delta: i32) -> Self {
        self.wheel_delta = delta;
        self
    }

    /// Mark as a replayed (synthetic) message.
    pub const fn replayed(mut self) -> Self {
        self.replayed = true;
        self
    }
}

/// Kind of a routed pointer event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// The node joined the pointer's hovered ancestor chain.
    Entered,
    /// The node left the pointer's hovered ancestor chain.
    Exited,
    /// Contact made on the node.
    Pressed,
    /// The pointer moved over (or while captured by) the node.
    Moved,
    /// Contact lifted.
    Released,
    /// The node lost pointer capture.
    CaptureLost,
    /// The platform canceled the pointer.
    Canceled,
    /// Mouse wheel turned.
    WheelChanged,
    /// A pending press-and-hold context menu was abandoned.
    ContextCanceled,
    /// Raised for the keyboard context-menu key.
    RightTapped,
}

impl PointerEventKind {
    /// Conventional event name, used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Entered => "PointerEntered",
            Self::Exited => "PointerExited",
            Self::Pressed => "PointerPressed",
            Self::Moved => "PointerMoved",
            Self::Released => "PointerReleased",
            Self::CaptureLost => "PointerCaptureLost",
            Self::Canceled => "PointerCanceled",
            Self::WheelChanged => "PointerWheelChanged",
            Self::ContextCanceled => "ContextCanceled",
            Self::RightTapped => "RightTapped",
        }
    }
}

/// A routed pointer event delivered to one node.
///
/// A fresh value is built for every delivery, so `handled` starts out `false` each time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent<K> {
    /// What happened.
    pub kind: PointerEventKind,
    /// Node receiving the event (the routed-event source).
    pub target: K,
    /// Global position.
    pub position: Point,
    /// Pointer identifier.
    pub pointer: PointerId,
    /// Device that produced the pointer.
    pub device: DeviceType,
    /// Keyboard modifiers.
    pub modifiers: KeyModifiers,
    /// Wheel delta for [`PointerEventKind::WheelChanged`]; zero otherwise.
    pub wheel_delta: i32,
    /// Set by handlers to mark the event consumed.
    pub handled: bool,
}

impl<K> PointerEvent<K> {
    /// Build an event for `target` from the message that caused it.
    pub fn from_message(kind: PointerEventKind, target: K, msg: &InputMessage) -> Self {
        Self {
            kind,
            target,
            position: msg.position,
            pointer: msg.pointer.id,
            device: msg.pointer.device,
            modifiers: msg.modifiers,
            wheel_delta: msg.wheel_delta,
            handled: false,
        }
    }
}

bitflags! {
    /// Drag-and-drop operations offered by a source or accepted by a target.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DragOperations: u8 {
        /// Copy the data.
        const COPY = 0b0000_0001;
        /// Move the data.
        const MOVE = 0b0000_0010;
        /// Link to the data.
        const LINK = 0b0000_0100;
    }
}

/// Kind of a drag-and-drop message, used both inbound and for routed drag events.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DragMessageKind {
    /// A drag entered the content root.
    DragEnter,
    /// A drag left the content root.
    DragLeave,
    /// A drag moved over the content root.
    DragOver,
    /// The data was dropped.
    Drop,
}

impl DragMessageKind {
    /// Conventional event name, used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DragEnter => "DragEnter",
            Self::DragLeave => "DragLeave",
            Self::DragOver => "DragOver",
            Self::Drop => "Drop",
        }
    }
}

/// A normalized drag-and-drop message.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DragMessage {
    /// What happened.
    pub kind: DragMessageKind,
    /// Position in content-root coordinates.
    pub position: Point,
    /// Keyboard modifiers held at the time.
    pub modifiers: KeyModifiers,
    /// Operations the drag source allows.
    pub allowed: DragOperations,
}

impl DragMessage {
    /// Create a drag message that allows every operation.
    pub const fn new(kind: DragMessageKind, position: Point) -> Self {
        Self {
            kind,
            position,
            modifiers: KeyModifiers::empty(),
            allowed: DragOperations::all(),
        }
    }

    /// Restrict the allowed operations.
    pub const fn with_allowed(mut self, allowed: DragOperations) -> Self {
        self.allowed = allowed;
        self
    }
}

/// A routed drag event delivered to one node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DragEvent<K> {
    /// Which drag event this is.
    pub kind: DragMessageKind,
    /// Node receiving the event.
    pub target: K,
    /// Global position.
    pub position: Point,
    /// Keyboard modifiers.
    pub modifiers: KeyModifiers,
    /// Operations the source allows.
    pub allowed: DragOperations,
    /// Operation the target accepts; set by handlers.
    pub accepted: DragOperations,
    /// Set by handlers to mark the event consumed.
    pub handled: bool,
    /// Set by a `DragOver` handler that will report its result asynchronously.
    pub deferred: bool,
}

impl<K> DragEvent<K> {
    /// Build an event for `target` from the message that caused it.
    pub fn from_message(kind: DragMessageKind, target: K, msg: &DragMessage) -> Self {
        Self {
            kind,
            target,
            position: msg.position,
            modifiers: msg.modifiers,
            allowed: msg.allowed,
            accepted: DragOperations::empty(),
            handled: false,
            deferred: false,
        }
    }
}

/// Any message the engine routes; used for re-entrancy reporting and light-dismiss policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoutedMessage {
    /// A pointer message.
    Pointer(MessageKind),
    /// A drag-and-drop message.
    Drag(DragMessageKind),
}

/// Result of routing one pointer message.
///
/// The message itself is always consumed; `event_handled` reports whether a handler marked the
/// primary event (pressed, moved, released, wheel, canceled) as handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PointerOutcome<K> {
    /// Node the message resolved to, if any.
    pub target: Option<K>,
    /// A handler marked the primary event handled.
    pub event_handled: bool,
    /// A nested message was processed while this one was in flight.
    pub superseded: bool,
}

/// Result of routing one drag message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DragOutcome<K> {
    /// Node the message resolved to, if any.
    pub target: Option<K>,
    /// Operation accepted by the target.
    pub accepted: DragOperations,
    /// A handler marked the event handled.
    pub handled: bool,
    /// The result is pending an asynchronous completion.
    pub deferred: bool,
    /// A nested message was processed while this one was in flight.
    pub superseded: bool,
}

impl<K> DragOutcome<K> {
    pub(crate) fn none() -> Self {
        Self {
            target: None,
            accepted: DragOperations::empty(),
            handled: false,
            deferred: false,
            superseded: false,
        }
    }
}
