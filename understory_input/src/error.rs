// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors returned by the per-message entry points.
//!
//! Geometry problems (no root, nothing hit) and capture contract violations are not errors:
//! they route nowhere or do nothing. Only the two conditions below unwind to the caller, and
//! both still run per-message cleanup first.

use crate::types::RoutedMessage;

/// Failure while routing one message.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// A message arrived while another was still being processed, and the manager is
    /// configured with [`ReentrancyPolicy::Fault`](crate::config::ReentrancyPolicy::Fault).
    #[error("{nested:?} arrived while {outer:?} was still being processed")]
    Reentrancy {
        /// Message that was in flight.
        outer: RoutedMessage,
        /// Message that arrived from inside a handler.
        nested: RoutedMessage,
    },
    /// A host handler aborted dispatch.
    #[error("handler for {event} aborted dispatch")]
    Dispatch {
        /// Name of the event whose delivery failed.
        event: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DragMessageKind, MessageKind};
    use alloc::string::ToString;

    #[test]
    fn errors_render_readable_messages() {
        let e = InputError::Reentrancy {
            outer: RoutedMessage::Pointer(MessageKind::PointerDown),
            nested: RoutedMessage::Drag(DragMessageKind::DragOver),
        };
        assert_eq!(
            e.to_string(),
            "Drag(DragOver) arrived while Pointer(PointerDown) was still being processed"
        );
        let e = InputError::Dispatch {
            event: "PointerPressed",
        };
        assert_eq!(e.to_string(), "handler for PointerPressed aborted dispatch");
    }
}
