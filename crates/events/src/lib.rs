//! Domain events and the change-notification channel.
//!
//! Session mutations and registration decisions are announced through an
//! [`EventBus`] so dependent readers re-derive their state instead of holding
//! on to stale principals.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
