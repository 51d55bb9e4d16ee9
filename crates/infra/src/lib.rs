//! Infrastructure layer: in-memory stores, account directory, identity
//! gateway and notification adapters.

pub mod accounts;
pub mod identity;
pub mod outbox;
pub mod registrations;

#[cfg(test)]
mod integration_tests;

pub use accounts::{AccountDirectory, DirectoryError, Invitation, Tenant};
pub use identity::DirectoryIdentityGateway;
pub use outbox::{InMemoryOutbox, LoggingNotifier, RecordingNotifier};
pub use registrations::InMemoryRegistrationRequestStore;
