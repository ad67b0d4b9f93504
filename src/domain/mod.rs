//! Domain layer: core models and ports.

pub mod models;
pub mod ports;
