/*!
 * Database module for the tutoring marketplace.
 *
 * This module provides SQLite-based persistence for:
 * - Users (teachers, students, admin users) with cross-table unique emails
 * - Languages and per-skill spoken-language ratings
 * - Lessons and the categories they are filed under
 * - Many-to-many associations between all of the above
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{JoinRecord, TableRecord};
pub use repository::Repository;
