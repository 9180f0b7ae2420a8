// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Policy knobs for an [`InputManager`](crate::InputManager).
//!
//! Platform- and version-specific behaviour is expressed as plain values here rather than as
//! branches inside the routing code. Defaults match the conventional desktop behaviour.
//!
//! ```
//! use understory_input::config::{EnterOrder, InputConfig, ReentrancyPolicy};
//!
//! let config = InputConfig::default()
//!     .with_reentrancy(ReentrancyPolicy::Fault)
//!     .with_enter_order(EnterOrder::RootToChild);
//! assert!(config.light_dismiss.right_button_passes_through);
//! ```

/// What to do when a message arrives while another is still being processed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ReentrancyPolicy {
    /// Flag the outer message as superseded and process the nested one.
    #[default]
    Tolerate,
    /// Flag the outer message and reject the nested one with
    /// [`InputError::Reentrancy`](crate::InputError::Reentrancy) before it touches any state.
    Fault,
}

/// Order of `Entered` events within one propagation.
///
/// Exited events always fire child-to-root and always before any Entered event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EnterOrder {
    /// Innermost node first.
    #[default]
    ChildToRoot,
    /// Outermost node first.
    RootToChild,
}

/// Which inputs reach through a light-dismiss layer, and what they do there.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightDismissPolicy {
    /// Pointer messages of a right-button press always pass through.
    pub right_button_passes_through: bool,
    /// Drag-and-drop messages always pass through.
    pub drag_passes_through: bool,
    /// Input over a popup's pass-through element passes through.
    pub honor_pass_through_element: bool,
    /// A pointer-down that passes through closes the flyout (or topmost popup).
    pub pointer_down_closes_flyout: bool,
    /// Passing through onto a flyout's placement target keeps it from reopening.
    pub suppress_placement_target_reopen: bool,
    /// Losing capture during a touch press-and-hold closes the light-dismiss popup under it.
    pub hold_dismisses_popup: bool,
}

impl Default for LightDismissPolicy {
    fn default() -> Self {
        Self {
            right_button_passes_through: true,
            drag_passes_through: true,
            honor_pass_through_element: true,
            pointer_down_closes_flyout: true,
            suppress_placement_target_reopen: true,
            hold_dismisses_popup: true,
        }
    }
}

/// Configuration of an [`InputManager`](crate::InputManager).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InputConfig {
    /// Re-entrancy handling.
    pub reentrancy: ReentrancyPolicy,
    /// Light-dismiss pass-through rules.
    pub light_dismiss: LightDismissPolicy,
    /// Entered event order.
    pub enter_order: EnterOrder,
    /// A pen with its barrel button held behaves like a mouse rather than touch.
    pub pen_barrel_button_acts_like_mouse: bool,
    /// Drop `Moved` for updates that neither move the pointer nor change its hover chain,
    /// including replayed updates.
    pub suppress_idle_updates: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            reentrancy: ReentrancyPolicy::Tolerate,
            light_dismiss: LightDismissPolicy::default(),
            enter_order: EnterOrder::ChildToRoot,
            pen_barrel_button_acts_like_mouse: true,
            suppress_idle_updates: true,
        }
    }
}

impl InputConfig {
    /// Set the re-entrancy policy.
    pub fn with_reentrancy(mut self, policy: ReentrancyPolicy) -> Self {
        self.reentrancy = policy;
        self
    }

    /// Set the light-dismiss policy table.
    pub fn with_light_dismiss(mut self, policy: LightDismissPolicy) -> Self {
        self.light_dismiss = policy;
        self
    }

    /// Set the Entered event order.
    pub fn with_enter_order(mut self, order: EnterOrder) -> Self {
        self.enter_order = order;
        self
    }

    /// Set whether a pen with the barrel button held counts as a mouse.
    pub fn with_pen_barrel_button_acts_like_mouse(mut self, enabled: bool) -> Self {
        self.pen_barrel_button_acts_like_mouse = enabled;
        self
    }

    /// Set whether idle and replayed updates are suppressed.
    pub fn with_suppress_idle_updates(mut self, enabled: bool) -> Self {
        self.suppress_idle_updates = enabled;
        self
    }
}
