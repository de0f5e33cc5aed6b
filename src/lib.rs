/*!
 * # TutorLink - persistence layer for a language-tutoring marketplace
 *
 * Teachers offer lessons in the languages they teach, students book them,
 * and admin users run the back office. Everything lives in one SQLite
 * database whose constraints (enum domains, unique emails across user
 * tables, foreign keys) are enforced by the schema itself.
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite storage:
 *   - `database::models`: Records, enums and association types
 *   - `database::schema`: Table definitions and versioning
 *   - `database::connection`: Connection setup and async access
 *   - `database::repository`: Typed queries and updates
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod language_utils;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::{DatabaseConnection, Repository};
pub use errors::{AppError, DatabaseError};
pub use language_utils::{default_language_names, resolve_language_name};
