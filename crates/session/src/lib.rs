//! `bizdesk-session` — lifecycle of the current principal for one client.
//!
//! The store never mutates a principal in place: every transition swaps in a
//! fresh [`SessionSnapshot`] and announces it on the session bus, so route
//! guards and tenant-scoped fetchers re-derive their decisions.

pub mod error;
pub mod events;
pub mod gateway;
pub mod storage;
pub mod store;

pub use error::SessionError;
pub use events::{SessionChangeKind, SessionChanged};
pub use gateway::{AuthGrant, IdentityGateway, LoginRequest};
pub use storage::{CredentialStorage, InMemoryCredentialStorage};
pub use store::{LoginOutcome, SessionSnapshot, SessionStore};
