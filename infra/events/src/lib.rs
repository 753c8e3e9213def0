//! # Event Bus
//!
//! Named publish/subscribe bus that decouples the runtime's producers from consumers.
//!
//! ## Overview
//!
//! Handlers are plain synchronous closures registered per event name. Emitting an event
//! runs them in registration order with each handler isolated from the others' panics.
//! Every emitted event is also:
//!
//! * copied to an async [`tap`](EventBus::tap) backed by a `tokio` broadcast channel, and
//! * relayed to the host's [`NativeChannel`] under `<namespace>:<event>`, tagged with the
//!   [`RELAY_MARKER`] so the inbound [`bridge`](EventBus::bridge) can skip its own echoes.
//!
//! ## Features
//!
//! * **Failure isolation**: a panicking handler is logged and skipped.
//! * **Open catalog**: [`WellKnownEvent`] names the events shared with the host; any other
//!   name is accepted too.
//! * **High Performance**: `FxHashMap` + `parking_lot::RwLock`, no lock held while a
//!   handler runs.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use std::sync::Arc;
//! use veneer_event_bus::{EventBus, EventBusError, LoopbackChannel, WellKnownEvent};
//!
//! fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!     let channel = Arc::new(LoopbackChannel::new());
//!     bus.bridge(channel)?;
//!
//!     bus.on(WellKnownEvent::FlagsUpdated, |payload| {
//!         assert_eq!(payload["key"], "ui:dark");
//!     });
//!
//!     // Handlers run once; the relayed echo is ignored by the bridge.
//!     assert_eq!(bus.emit(WellKnownEvent::FlagsUpdated, json!({ "key": "ui:dark" })), 1);
//!     Ok(())
//! }
//! ```

mod bus;
mod catalog;
mod error;
mod native;
mod receiver;

pub use bus::{BusEvent, EventBus, EventBusBuilder, Handler, HandlerId, Subscription};
pub use catalog::{
    CORE_READY, ERROR, MODULE_STARTED, MODULE_STOPPED, RELAY_MARKER, SETTINGS_CHANGED,
    WellKnownEvent,
};
pub use error::{EventBusError, EventBusErrorExt};
pub use native::{LoopbackChannel, NativeChannel, NativeListener};
pub use receiver::EventReceiverExt;
