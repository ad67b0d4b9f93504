//! CLI command implementations.

pub mod init;
pub mod project;
pub mod report;
pub mod run;
pub mod worker;
