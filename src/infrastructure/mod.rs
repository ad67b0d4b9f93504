//! Infrastructure: configuration loading.

pub mod config;
