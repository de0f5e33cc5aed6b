/*!
 * Error types for the tutorlink crate.
 *
 * Database failures are classified from SQLite result codes into
 * constraint-specific variants so callers can tell a duplicate email from a
 * dangling foreign key without parsing messages themselves.
 */

use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;

/// Prefixes SQLite uses for constraint failures; schema triggers raise the
/// same text so their aborts classify like the built-in constraints.
const UNIQUE_PREFIX: &str = "UNIQUE constraint failed";
const CHECK_PREFIX: &str = "CHECK constraint failed";

/// Errors surfaced by the persistence layer
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// A UNIQUE or PRIMARY KEY constraint rejected the write
    #[error("Uniqueness violation: {0}")]
    UniqueViolation(String),

    /// A FOREIGN KEY constraint rejected the write
    #[error("Referential integrity violation: {0}")]
    ForeignKeyViolation(String),

    /// A NOT NULL constraint rejected the write
    #[error("Not-null violation: {0}")]
    NotNullViolation(String),

    /// A CHECK constraint rejected the write (enum domain or range)
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// No row with the requested primary key
    #[error("No row in {table} with id {id}")]
    NotFound {
        /// Table that was queried
        table: &'static str,
        /// Primary key that was looked up
        id: i64,
    },

    /// A stored value could not be decoded into its Rust type
    #[error("Invalid value for {column}: {value}")]
    InvalidValue {
        /// Column holding the value
        column: String,
        /// Offending raw value
        value: String,
    },

    /// Any other SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl DatabaseError {
    /// Whether the error is one of the constraint violations
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::UniqueViolation(_)
                | Self::ForeignKeyViolation(_)
                | Self::NotNullViolation(_)
                | Self::CheckViolation(_)
        )
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(error: rusqlite::Error) -> Self {
        let (code, message) = match &error {
            rusqlite::Error::SqliteFailure(code, message) => (*code, message.clone()),
            rusqlite::Error::FromSqlConversionFailure(index, _, source) => {
                return Self::InvalidValue {
                    column: format!("column {}", index),
                    value: source.to_string(),
                };
            }
            _ => return Self::Sqlite(error),
        };

        if code.code != ErrorCode::ConstraintViolation {
            return Self::Sqlite(error);
        }

        let message = message.unwrap_or_else(|| error.to_string());

        match code.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                Self::UniqueViolation(message)
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::ForeignKeyViolation(message),
            ffi::SQLITE_CONSTRAINT_NOTNULL => Self::NotNullViolation(message),
            ffi::SQLITE_CONSTRAINT_CHECK => Self::CheckViolation(message),
            ffi::SQLITE_CONSTRAINT_TRIGGER if message.starts_with(UNIQUE_PREFIX) => {
                Self::UniqueViolation(message)
            }
            ffi::SQLITE_CONSTRAINT_TRIGGER if message.starts_with(CHECK_PREFIX) => {
                Self::CheckViolation(message)
            }
            _ => Self::Sqlite(error),
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the database layer
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<DatabaseError>() {
            Ok(db_error) => Self::Database(db_error),
            Err(other) => Self::Unknown(format!("{:#}", other)),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
