// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publish/subscribe fan-out of lifecycle and message events.
//!
//! Each topic is a `tokio::sync::broadcast` channel. Publishing never blocks:
//! a subscriber that falls more than its buffer behind loses the oldest events
//! and receives a [`Delivery::Resync`] telling it to re-read current state.

pub mod bus;
pub mod dedup;
pub mod events;
pub mod topic;

pub use bus::{Delivery, EventBus, Subscription};
pub use dedup::EventDeduper;
pub use events::{BusEvent, EventKind};
pub use topic::Topic;
