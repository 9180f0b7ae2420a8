// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ready-made [`InputHost`](crate::host::InputHost) implementations over other Understory crates.
//!
//! Each adapter sits behind a feature flag so the core stays small and `no_std`.

#[cfg(feature = "box_tree_adapter")]
pub mod box_tree;
