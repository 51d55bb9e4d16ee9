//! Process-wide tracing setup shared by the binaries.

/// Install the JSON tracing subscriber (`RUST_LOG`, default `info`).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Subscriber construction (filters, formatting).
pub mod tracing;
