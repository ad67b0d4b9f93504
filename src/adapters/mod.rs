//! Adapters: concrete implementations of the domain ports.

pub mod analyst;
pub mod sqlite;

pub use analyst::FixtureAnalyst;
