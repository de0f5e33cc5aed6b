/*!
 * Database schema definitions.
 *
 * This module contains the SQL schema for every marketplace table,
 * including the constraints that keep enum columns inside their domains
 * and the triggers that keep emails unique across all user tables and
 * JSON enum arrays inside their domains.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

use super::models::{
    CATEGORY_NAME_LENGTH, CERTIFICATE_LENGTH, DESCRIPTION_LENGTH, Duration, EMAIL_LENGTH,
    FIRST_NAME_LENGTH, LANGUAGE_NAME_LENGTH, LAST_NAME_LENGTH, LOCATION_NAME_LENGTH, Platform,
    ProficiencyLevel, Role, Tag,
};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Marketplace tables in creation order
pub const TABLES: [&str; 13] = [
    "languages",
    "spoken_languages",
    "teachers",
    "students",
    "admin_users",
    "categories",
    "lessons",
    "categories_lessons",
    "students_teachers",
    "taught_by_teachers",
    "spoken_by_teachers",
    "learnt_by_students",
    "spoken_by_students",
];

/// Tables that hold users and share the email namespace
const USER_TABLES: [&str; 3] = ["teachers", "students", "admin_users"];

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        return Err(anyhow::anyhow!(
            "Unknown schema version: {}. Cannot migrate.",
            current_version
        ));
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// `'a', 'b', 'c'` for use inside `IN (...)`
fn sql_text_list<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn skill_column(name: &str, levels: &str) -> String {
    format!("{name} TEXT NOT NULL CHECK ({name} IN ({levels}))")
}

/// Columns shared by every user table; `role_check` constrains `role`
fn user_columns(role_check: &str) -> String {
    format!(
        r#"
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE CHECK (length(email) <= {EMAIL_LENGTH}),
            first_name TEXT NOT NULL CHECK (length(first_name) <= {FIRST_NAME_LENGTH}),
            last_name TEXT NOT NULL CHECK (length(last_name) <= {LAST_NAME_LENGTH}),
            role TEXT NOT NULL CHECK ({role_check}),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))"#
    )
}

/// Triggers rejecting an email already used in another user table
fn email_triggers(table: &str) -> String {
    let others: Vec<&str> = USER_TABLES.iter().copied().filter(|t| *t != table).collect();
    let clash = others
        .iter()
        .map(|other| format!("EXISTS (SELECT 1 FROM {other} WHERE email = NEW.email)"))
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(
        r#"
        CREATE TRIGGER IF NOT EXISTS {table}_email_unique_insert
        BEFORE INSERT ON {table}
        WHEN {clash}
        BEGIN
            SELECT RAISE(ABORT, 'UNIQUE constraint failed: users.email');
        END;

        CREATE TRIGGER IF NOT EXISTS {table}_email_unique_update
        BEFORE UPDATE OF email ON {table}
        WHEN {clash}
        BEGIN
            SELECT RAISE(ABORT, 'UNIQUE constraint failed: users.email');
        END;
        "#
    )
}

/// Column must hold a JSON array; `json_type` is only reached for valid JSON
fn json_array_check(column: &str) -> String {
    format!("CASE WHEN json_valid({column}) THEN json_type({column}) = 'array' ELSE 0 END")
}

/// Triggers rejecting JSON array elements outside an enum domain
fn json_domain_triggers(table: &str, column: &str, allowed: &str) -> String {
    let violation = format!(
        "CASE WHEN json_valid(NEW.{column}) \
         THEN EXISTS (SELECT 1 FROM json_each(NEW.{column}) \
         WHERE value IS NULL OR type <> 'text' OR value NOT IN ({allowed})) \
         ELSE 0 END"
    );

    format!(
        r#"
        CREATE TRIGGER IF NOT EXISTS {table}_{column}_domain_insert
        BEFORE INSERT ON {table}
        WHEN {violation}
        BEGIN
            SELECT RAISE(ABORT, 'CHECK constraint failed: {table}.{column}');
        END;

        CREATE TRIGGER IF NOT EXISTS {table}_{column}_domain_update
        BEFORE UPDATE OF {column} ON {table}
        WHEN {violation}
        BEGIN
            SELECT RAISE(ABORT, 'CHECK constraint failed: {table}.{column}');
        END;
        "#
    )
}

/// Association table keyed by the pair of foreign ids
fn join_table(table: &str, left: (&str, &str), right: (&str, &str)) -> String {
    let (left_column, left_table) = left;
    let (right_column, right_table) = right;
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            {left_column} INTEGER NOT NULL REFERENCES {left_table}(id) ON DELETE CASCADE,
            {right_column} INTEGER NOT NULL REFERENCES {right_table}(id) ON DELETE CASCADE,
            PRIMARY KEY ({left_column}, {right_column})
        ) WITHOUT ROWID;

        CREATE INDEX IF NOT EXISTS idx_{table}_{right_column} ON {table}({right_column});
        "#
    )
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    let levels = sql_text_list(ProficiencyLevel::ALL.iter().map(|l| l.as_str()));
    let platforms = sql_text_list(Platform::ALL.iter().map(|p| p.as_str()));
    let roles = sql_text_list(Role::ALL.iter().map(|r| r.as_str()));
    let tags = sql_text_list(Tag::ALL.iter().map(|t| t.as_str()));
    let durations = Duration::ALL
        .iter()
        .map(|d| d.minutes().to_string())
        .collect::<Vec<_>>()
        .join(", ");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS languages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE CHECK (length(name) BETWEEN 1 AND {LANGUAGE_NAME_LENGTH}),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );
        "#
    ))?;

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS spoken_languages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            language_id INTEGER NOT NULL REFERENCES languages(id),
            {},
            {},
            {},
            {},
            {},
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_spoken_languages_language ON spoken_languages(language_id);
        "#,
        skill_column("speaking_skill", &levels),
        skill_column("comprehension_skill", &levels),
        skill_column("listening_skill", &levels),
        skill_column("writing_skill", &levels),
        skill_column("reading_skill", &levels),
    ))?;

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS teachers ({},
            platform TEXT NOT NULL CHECK (platform IN ({platforms})),
            location TEXT NOT NULL DEFAULT '' CHECK (length(location) <= {LOCATION_NAME_LENGTH}),
            description TEXT NOT NULL DEFAULT '' CHECK (length(description) <= {DESCRIPTION_LENGTH}),
            certificate TEXT NOT NULL DEFAULT '' CHECK (length(certificate) <= {CERTIFICATE_LENGTH}),
            number_of_lessons INTEGER NOT NULL DEFAULT 0 CHECK (number_of_lessons >= 0)
        );

        CREATE TABLE IF NOT EXISTS students ({}
        );

        CREATE TABLE IF NOT EXISTS admin_users ({},
            last_login TEXT
        );
        "#,
        user_columns("role = 'Teacher'"),
        user_columns("role = 'Student'"),
        user_columns(&format!("role IN ({roles})")),
    ))?;

    for table in USER_TABLES {
        conn.execute_batch(&email_triggers(table))?;
    }

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) <= {CATEGORY_NAME_LENGTH}),
            price INTEGER NOT NULL CHECK (price >= 0),
            description TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '[]' CHECK ({}),
            language_level TEXT NOT NULL DEFAULT '[]' CHECK ({}),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            duration INTEGER NOT NULL CHECK (duration IN ({durations})),
            teacher_id INTEGER NOT NULL REFERENCES teachers(id),
            student_id INTEGER NOT NULL REFERENCES students(id),
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_lessons_teacher ON lessons(teacher_id);
        CREATE INDEX IF NOT EXISTS idx_lessons_student ON lessons(student_id);
        "#,
        json_array_check("tags"),
        json_array_check("language_level"),
    ))?;

    conn.execute_batch(&json_domain_triggers("categories", "tags", &tags))?;
    conn.execute_batch(&json_domain_triggers("categories", "language_level", &levels))?;

    let join_tables = [
        join_table("categories_lessons", ("category_id", "categories"), ("lesson_id", "lessons")),
        join_table("students_teachers", ("student_id", "students"), ("teacher_id", "teachers")),
        join_table("taught_by_teachers", ("language_id", "languages"), ("teacher_id", "teachers")),
        join_table(
            "spoken_by_teachers",
            ("language_id", "spoken_languages"),
            ("teacher_id", "teachers"),
        ),
        join_table("learnt_by_students", ("language_id", "languages"), ("student_id", "students")),
        join_table(
            "spoken_by_students",
            ("language_id", "spoken_languages"),
            ("student_id", "students"),
        ),
    ];
    for ddl in &join_tables {
        conn.execute_batch(ddl)?;
    }

    info!("Database schema created successfully");
    Ok(())
}

/// Drop all tables (for testing purposes only)
#[cfg(test)]
pub fn drop_all_tables(conn: &Connection) -> Result<()> {
    for table in TABLES.iter().rev() {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    conn.execute_batch("DROP TABLE IF EXISTS schema_version;")?;
    Ok(())
}
