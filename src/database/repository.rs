/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 * Constraint failures come back as `DatabaseError` values wrapped in
 * `anyhow::Error`, so callers can `downcast_ref::<DatabaseError>()`.
 */

use anyhow::{Result, anyhow};
use log::{debug, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Params, params, params_from_iter};
use serde_json::{Map, Value};

use super::connection::DatabaseConnection;
use super::models::{
    AdminUser, CategoriesLessons, Category, JoinRecord, Language, LearntByStudents, Lesson,
    SpokenByStudents, SpokenByTeachers, SpokenLanguage, Student, StudentsTeachers, TableRecord,
    TaughtByTeachers, Teacher, UserRecord, timestamp_now,
};
use super::schema::TABLES;
use crate::app_config::DatabaseConfig;
use crate::errors::DatabaseError;
use crate::language_utils::resolve_language_name;

/// Positional placeholders `?1, ?2, ...`
fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `id` and `COLUMNS` of a record, each prefixed with a table alias
fn qualified_columns<R: TableRecord>(alias: &str) -> String {
    std::iter::once("id")
        .chain(R::COLUMNS.iter().copied())
        .map(|column| format!("{}.{}", alias, column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Classify a row decoding error of `R`, naming the column that failed
fn decode_error<R: TableRecord>(error: rusqlite::Error) -> DatabaseError {
    if let rusqlite::Error::FromSqlConversionFailure(index, _, source) = &error {
        let column = match index {
            0 => Some("id"),
            i => R::COLUMNS.get(i - 1).copied(),
        };
        if let Some(column) = column {
            return DatabaseError::InvalidValue {
                column: format!("{}.{}", R::TABLE, column),
                value: source.to_string(),
            };
        }
    }
    DatabaseError::from(error)
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Create a repository for the configured database
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let db = DatabaseConnection::from_config(config)?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Synchronous helpers (usable inside transactions)
    // =========================================================================

    fn insert_sync<R: TableRecord>(conn: &Connection, record: &mut R) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            R::COLUMNS.join(", "),
            placeholders(R::COLUMNS.len())
        );
        let values = record.values().map_err(DatabaseError::from)?;

        conn.execute(&sql, params_from_iter(values))
            .map_err(DatabaseError::from)?;
        record.set_id(conn.last_insert_rowid());

        debug!("Inserted {} row {}", R::TABLE, record.id());
        Ok(())
    }

    fn query_records_sync<R: TableRecord, P: Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> Result<Vec<R>> {
        let mut stmt = conn.prepare(sql).map_err(DatabaseError::from)?;
        let records = stmt
            .query_map(params, R::from_row)
            .map_err(DatabaseError::from)?
            .collect::<rusqlite::Result<Vec<R>>>()
            .map_err(decode_error::<R>)?;
        Ok(records)
    }

    fn find_where_sync<R: TableRecord>(
        conn: &Connection,
        column: &str,
        value: SqlValue,
    ) -> Result<Option<R>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            R::select_list(),
            R::TABLE,
            column
        );
        let record = conn
            .query_row(&sql, [value], R::from_row)
            .optional()
            .map_err(decode_error::<R>)?;
        Ok(record)
    }

    fn link_sync<J: JoinRecord>(conn: &Connection, left_id: i64, right_id: i64) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
            J::TABLE,
            J::LEFT_COLUMN,
            J::RIGHT_COLUMN
        );
        conn.execute(&sql, params![left_id, right_id])
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    // =========================================================================
    // Generic record operations
    // =========================================================================

    /// Insert a record and return it with its assigned id
    pub async fn insert<R: TableRecord>(&self, record: &R) -> Result<R> {
        let mut record = record.clone();

        self.db
            .execute_async(move |conn| {
                Self::insert_sync(conn, &mut record)?;
                Ok(record)
            })
            .await
    }

    /// Get a record by id
    pub async fn get<R: TableRecord>(&self, id: i64) -> Result<Option<R>> {
        self.db
            .execute_async(move |conn| Self::find_where_sync(conn, "id", SqlValue::Integer(id)))
            .await
    }

    /// Get a record by id, failing with `DatabaseError::NotFound` if absent
    pub async fn require<R: TableRecord>(&self, id: i64) -> Result<R> {
        self.get::<R>(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound { table: R::TABLE, id }.into())
    }

    /// List all records of a table ordered by id
    pub async fn list<R: TableRecord>(&self) -> Result<Vec<R>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT {} FROM {} ORDER BY id", R::select_list(), R::TABLE);
                Self::query_records_sync(conn, &sql, [])
            })
            .await
    }

    /// Overwrite every column of an existing record
    pub async fn update<R: TableRecord>(&self, record: &R) -> Result<()> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                let assignments = R::COLUMNS
                    .iter()
                    .enumerate()
                    .map(|(i, column)| format!("{} = ?{}", column, i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "UPDATE {} SET {} WHERE id = ?{}",
                    R::TABLE,
                    assignments,
                    R::COLUMNS.len() + 1
                );

                let mut values = record.values().map_err(DatabaseError::from)?;
                values.push(SqlValue::Integer(record.id()));

                let changed = conn
                    .execute(&sql, params_from_iter(values))
                    .map_err(DatabaseError::from)?;
                if changed == 0 {
                    return Err(DatabaseError::NotFound {
                        table: R::TABLE,
                        id: record.id(),
                    }
                    .into());
                }
                Ok(())
            })
            .await
    }

    /// Delete a record by id; returns whether a row was removed
    pub async fn delete<R: TableRecord>(&self, id: i64) -> Result<bool> {
        self.db
            .execute_async(move |conn| {
                let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
                let deleted = conn.execute(&sql, [id]).map_err(DatabaseError::from)?;
                Ok(deleted > 0)
            })
            .await
    }

    /// Number of rows in a table
    pub async fn count<R: TableRecord>(&self) -> Result<i64> {
        self.db
            .execute_async(move |conn| {
                let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
                let count = conn
                    .query_row(&sql, [], |row| row.get(0))
                    .map_err(DatabaseError::from)?;
                Ok(count)
            })
            .await
    }

    // =========================================================================
    // Association operations
    // =========================================================================

    /// Insert an association row
    pub async fn link<J: JoinRecord>(&self, link: &J) -> Result<()> {
        let (left_id, right_id) = (link.left_id(), link.right_id());

        self.db
            .execute_async(move |conn| Self::link_sync::<J>(conn, left_id, right_id))
            .await
    }

    /// Remove an association row; returns whether it existed
    pub async fn unlink<J: JoinRecord>(&self, left_id: i64, right_id: i64) -> Result<bool> {
        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
                    J::TABLE,
                    J::LEFT_COLUMN,
                    J::RIGHT_COLUMN
                );
                let deleted = conn
                    .execute(&sql, params![left_id, right_id])
                    .map_err(DatabaseError::from)?;
                Ok(deleted > 0)
            })
            .await
    }

    /// All rows of an association table
    pub async fn list_links<J: JoinRecord>(&self) -> Result<Vec<J>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {left}, {right} FROM {} ORDER BY {left}, {right}",
                    J::TABLE,
                    left = J::LEFT_COLUMN,
                    right = J::RIGHT_COLUMN
                );
                let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
                let links = stmt
                    .query_map([], |row| Ok(J::new(row.get(0)?, row.get(1)?)))
                    .map_err(DatabaseError::from)?
                    .collect::<rusqlite::Result<Vec<J>>>()
                    .map_err(DatabaseError::from)?;
                Ok(links)
            })
            .await
    }

    /// Right-side ids linked to a left-side id
    pub async fn links_from<J: JoinRecord>(&self, left_id: i64) -> Result<Vec<i64>> {
        self.linked_ids::<J>(J::LEFT_COLUMN, J::RIGHT_COLUMN, left_id)
            .await
    }

    /// Left-side ids linked to a right-side id
    pub async fn links_to<J: JoinRecord>(&self, right_id: i64) -> Result<Vec<i64>> {
        self.linked_ids::<J>(J::RIGHT_COLUMN, J::LEFT_COLUMN, right_id)
            .await
    }

    async fn linked_ids<J: JoinRecord>(
        &self,
        key_column: &'static str,
        id_column: &'static str,
        key: i64,
    ) -> Result<Vec<i64>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {id} FROM {} WHERE {} = ?1 ORDER BY {id}",
                    J::TABLE,
                    key_column,
                    id = id_column
                );
                let mut stmt = conn.prepare(&sql).map_err(DatabaseError::from)?;
                let ids = stmt
                    .query_map([key], |row| row.get(0))
                    .map_err(DatabaseError::from)?
                    .collect::<rusqlite::Result<Vec<i64>>>()
                    .map_err(DatabaseError::from)?;
                Ok(ids)
            })
            .await
    }

    /// Left-side records associated with a right-side id
    pub async fn lefts_of<J: JoinRecord>(&self, right_id: i64) -> Result<Vec<J::Left>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM {} r JOIN {} j ON j.{} = r.id WHERE j.{} = ?1 ORDER BY r.id",
                    qualified_columns::<J::Left>("r"),
                    J::Left::TABLE,
                    J::TABLE,
                    J::LEFT_COLUMN,
                    J::RIGHT_COLUMN
                );
                Self::query_records_sync(conn, &sql, [right_id])
            })
            .await
    }

    /// Right-side records associated with a left-side id
    pub async fn rights_of<J: JoinRecord>(&self, left_id: i64) -> Result<Vec<J::Right>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM {} r JOIN {} j ON j.{} = r.id WHERE j.{} = ?1 ORDER BY r.id",
                    qualified_columns::<J::Right>("r"),
                    J::Right::TABLE,
                    J::TABLE,
                    J::RIGHT_COLUMN,
                    J::LEFT_COLUMN
                );
                Self::query_records_sync(conn, &sql, [left_id])
            })
            .await
    }

    // =========================================================================
    // Dumping
    // =========================================================================

    /// Every row of the named table as a JSON object
    pub async fn dump_table(&self, table: &str) -> Result<Vec<Map<String, Value>>> {
        match table {
            Language::TABLE => self.dump_records::<Language>().await,
            SpokenLanguage::TABLE => self.dump_records::<SpokenLanguage>().await,
            Teacher::TABLE => self.dump_records::<Teacher>().await,
            Student::TABLE => self.dump_records::<Student>().await,
            AdminUser::TABLE => self.dump_records::<AdminUser>().await,
            Category::TABLE => self.dump_records::<Category>().await,
            Lesson::TABLE => self.dump_records::<Lesson>().await,
            StudentsTeachers::TABLE => self.dump_links::<StudentsTeachers>().await,
            TaughtByTeachers::TABLE => self.dump_links::<TaughtByTeachers>().await,
            SpokenByTeachers::TABLE => self.dump_links::<SpokenByTeachers>().await,
            LearntByStudents::TABLE => self.dump_links::<LearntByStudents>().await,
            SpokenByStudents::TABLE => self.dump_links::<SpokenByStudents>().await,
            CategoriesLessons::TABLE => self.dump_links::<CategoriesLessons>().await,
            other => Err(anyhow!(
                "Unknown table '{}'. Known tables: {}",
                other,
                TABLES.join(", ")
            )),
        }
    }

    async fn dump_records<R: TableRecord>(&self) -> Result<Vec<Map<String, Value>>> {
        let records = self.list::<R>().await?;
        Ok(records.iter().map(TableRecord::to_dict).collect())
    }

    async fn dump_links<J: JoinRecord>(&self) -> Result<Vec<Map<String, Value>>> {
        let links = self.list_links::<J>().await?;
        Ok(links.iter().map(JoinRecord::to_dict).collect())
    }

    // =========================================================================
    // Languages
    // =========================================================================

    /// Find a language by name or ISO code
    pub async fn find_language_by_name(&self, name: &str) -> Result<Option<Language>> {
        let name = resolve_language_name(name)?;

        self.db
            .execute_async(move |conn| Self::find_where_sync(conn, "name", SqlValue::Text(name)))
            .await
    }

    /// Get a language by name or ISO code, inserting it if missing
    pub async fn ensure_language(&self, name: &str) -> Result<Language> {
        let name = resolve_language_name(name)?;

        self.db
            .execute_async(move |conn| {
                if let Some(existing) =
                    Self::find_where_sync::<Language>(conn, "name", SqlValue::Text(name.clone()))?
                {
                    return Ok(existing);
                }
                let mut language = Language::new(name);
                Self::insert_sync(conn, &mut language)?;
                Ok(language)
            })
            .await
    }

    /// Insert every language not yet present; returns how many were added
    pub async fn seed_languages(&self, names: Vec<String>) -> Result<usize> {
        let names = names
            .iter()
            .map(|name| resolve_language_name(name))
            .collect::<Result<Vec<_>>>()?;
        let requested = names.len();

        let inserted = self
            .db
            .transaction_async(move |tx| {
                let mut inserted = 0;
                for name in names {
                    inserted += tx
                        .execute(
                            "INSERT OR IGNORE INTO languages (name, created_at) VALUES (?1, ?2)",
                            params![name, timestamp_now()],
                        )
                        .map_err(DatabaseError::from)?;
                }
                Ok(inserted)
            })
            .await?;

        info!("Seeded {} new languages ({} requested)", inserted, requested);
        Ok(inserted)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Find a teacher, student or admin by email (case-insensitive)
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = email.trim().to_string();

        self.db
            .execute_async(move |conn| {
                let value = || SqlValue::Text(email.clone());

                if let Some(teacher) = Self::find_where_sync::<Teacher>(conn, "email", value())? {
                    return Ok(Some(UserRecord::Teacher(teacher)));
                }
                if let Some(student) = Self::find_where_sync::<Student>(conn, "email", value())? {
                    return Ok(Some(UserRecord::Student(student)));
                }
                let admin = Self::find_where_sync::<AdminUser>(conn, "email", value())?;
                Ok(admin.map(UserRecord::Admin))
            })
            .await
    }

    /// Languages a teacher teaches
    pub async fn teacher_languages(&self, teacher_id: i64) -> Result<Vec<Language>> {
        self.lefts_of::<TaughtByTeachers>(teacher_id).await
    }

    /// Languages a student learns
    pub async fn student_languages(&self, student_id: i64) -> Result<Vec<Language>> {
        self.lefts_of::<LearntByStudents>(student_id).await
    }

    /// Students enrolled with a teacher
    pub async fn teacher_students(&self, teacher_id: i64) -> Result<Vec<Student>> {
        self.lefts_of::<StudentsTeachers>(teacher_id).await
    }

    /// Teachers a student is enrolled with
    pub async fn student_teachers(&self, student_id: i64) -> Result<Vec<Teacher>> {
        self.rights_of::<StudentsTeachers>(student_id).await
    }

    /// Spoken-language ratings of a teacher
    pub async fn teacher_spoken_languages(&self, teacher_id: i64) -> Result<Vec<SpokenLanguage>> {
        self.lefts_of::<SpokenByTeachers>(teacher_id).await
    }

    /// Spoken-language ratings of a student
    pub async fn student_spoken_languages(&self, student_id: i64) -> Result<Vec<SpokenLanguage>> {
        self.lefts_of::<SpokenByStudents>(student_id).await
    }

    /// Increment a teacher's finished-lesson counter; returns the new value
    pub async fn record_completed_lesson(&self, teacher_id: i64) -> Result<i64> {
        self.db
            .execute_async(move |conn| {
                let updated: Option<i64> = conn
                    .query_row(
                        "UPDATE teachers SET number_of_lessons = number_of_lessons + 1
                         WHERE id = ?1 RETURNING number_of_lessons",
                        [teacher_id],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(DatabaseError::from)?;

                updated.ok_or_else(|| {
                    DatabaseError::NotFound {
                        table: Teacher::TABLE,
                        id: teacher_id,
                    }
                    .into()
                })
            })
            .await
    }

    /// Stamp an admin's last login with the current time
    pub async fn touch_admin_login(&self, admin_id: i64) -> Result<String> {
        let now = timestamp_now();

        self.db
            .execute_async(move |conn| {
                let changed = conn
                    .execute(
                        "UPDATE admin_users SET last_login = ?1 WHERE id = ?2",
                        params![now, admin_id],
                    )
                    .map_err(DatabaseError::from)?;
                if changed == 0 {
                    return Err(DatabaseError::NotFound {
                        table: AdminUser::TABLE,
                        id: admin_id,
                    }
                    .into());
                }
                Ok(now)
            })
            .await
    }

    // =========================================================================
    // Lessons and categories
    // =========================================================================

    /// Insert a lesson with its categories and enroll the student with the
    /// teacher, all in one transaction
    pub async fn book_lesson(&self, lesson: &Lesson, category_ids: &[i64]) -> Result<Lesson> {
        let mut lesson = lesson.clone();
        let category_ids = category_ids.to_vec();

        self.db
            .transaction_async(move |tx| {
                Self::insert_sync(tx, &mut lesson)?;
                for category_id in category_ids {
                    Self::link_sync::<CategoriesLessons>(tx, category_id, lesson.id)?;
                }
                tx.execute(
                    "INSERT OR IGNORE INTO students_teachers (student_id, teacher_id) VALUES (?1, ?2)",
                    params![lesson.student_id, lesson.teacher_id],
                )
                .map_err(DatabaseError::from)?;

                debug!(
                    "Booked lesson {} ({} min) for teacher {} and student {}",
                    lesson.id,
                    lesson.duration.minutes(),
                    lesson.teacher_id,
                    lesson.student_id
                );
                Ok(lesson)
            })
            .await
    }

    /// Lessons given by a teacher
    pub async fn lessons_for_teacher(&self, teacher_id: i64) -> Result<Vec<Lesson>> {
        self.lessons_where("teacher_id", teacher_id).await
    }

    /// Lessons taken by a student
    pub async fn lessons_for_student(&self, student_id: i64) -> Result<Vec<Lesson>> {
        self.lessons_where("student_id", student_id).await
    }

    async fn lessons_where(&self, column: &'static str, id: i64) -> Result<Vec<Lesson>> {
        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM lessons WHERE {} = ?1 ORDER BY id",
                    Lesson::select_list(),
                    column
                );
                Self::query_records_sync(conn, &sql, [id])
            })
            .await
    }

    /// Categories a lesson belongs to
    pub async fn lesson_categories(&self, lesson_id: i64) -> Result<Vec<Category>> {
        self.lefts_of::<CategoriesLessons>(lesson_id).await
    }

    /// Lessons filed under a category
    pub async fn category_lessons(&self, category_id: i64) -> Result<Vec<Lesson>> {
        self.rights_of::<CategoriesLessons>(category_id).await
    }
}
