/*!
 * SQLite persistence layer.
 *
 * Jobs, chunks, cached translations and credit accounts live in a single
 * SQLite database accessed through [`DatabaseConnection`] (async-safe via
 * spawn_blocking) and the higher-level [`Repository`].
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::DatabaseConnection;
pub use models::CacheEntry;
pub use repository::Repository;
