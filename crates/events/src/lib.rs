//! Sync event bus and listener infrastructure.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, for async consumers.
//! - [`SyncEvent`] -- the canonical sync event envelope.
//! - [`ListenerRegistry`] -- explicit add/remove callback registration for
//!   embedders that want listener semantics instead of a channel.

pub mod bus;
pub mod listeners;

pub use bus::{EventBus, SyncEvent, SyncEventKind};
pub use listeners::{ListenerId, ListenerRegistry};
