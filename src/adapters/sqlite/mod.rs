//! SQLite adapters: connection pool, migrations, and repositories.

pub mod component_repository;
pub mod connection;
pub mod event_repository;
pub mod job_repository;
pub mod migrations;
pub mod project_repository;
pub mod run_repository;

pub use component_repository::SqliteComponentRepository;
pub use connection::{create_test_pool, open_pool, verify_connection, ConnectionError};
pub use event_repository::SqliteEventRepository;
pub use job_repository::SqliteJobRepository;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use project_repository::SqliteProjectRepository;
pub use run_repository::SqliteRunRepository;
