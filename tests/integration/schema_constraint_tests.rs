/*!
 * Raw SQL against the schema: every constraint must hold even when the
 * typed repository is bypassed
 */

use anyhow::Result;
use tutorlink::database::models::{Category, ProficiencyLevel, Tag};
use tutorlink::database::schema::{self, SCHEMA_VERSION, TABLES};
use tutorlink::{DatabaseConnection, DatabaseError, Repository};

use crate::common::db_error;

fn create_test_db() -> DatabaseConnection {
    DatabaseConnection::new_in_memory().expect("Failed to create in-memory DB")
}

/// Run one statement, classifying failures the way the repository does
fn raw(db: &DatabaseConnection, sql: &str) -> Result<usize> {
    db.execute(|conn| Ok(conn.execute(sql, []).map_err(DatabaseError::from)?))
}

fn insert_teacher(db: &DatabaseConnection, email: &str) {
    raw(
        db,
        &format!(
            "INSERT INTO teachers (email, first_name, last_name, role, platform)
             VALUES ('{email}', 'Ada', 'Lovelace', 'Teacher', 'Zoom')"
        ),
    )
    .expect("Failed to insert teacher");
}

#[test]
fn test_initialize_shouldCreateEveryTableAtCurrentVersion() {
    let db = create_test_db();

    let (version, tables) = db
        .execute(|conn| {
            let version = schema::get_schema_version(conn)?;
            let tables: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ({})",
                    TABLES.iter().map(|t| format!("'{t}'")).collect::<Vec<_>>().join(", ")
                ),
                [],
                |row| row.get(0),
            )?;
            Ok((version, tables))
        })
        .unwrap();

    assert_eq!(version, SCHEMA_VERSION);
    assert_eq!(tables, TABLES.len() as i64);
}

#[test]
fn test_spokenLanguage_withUnknownLevel_shouldFailCheck() {
    let db = create_test_db();
    raw(&db, "INSERT INTO languages (name) VALUES ('Italian')").unwrap();

    raw(
        &db,
        "INSERT INTO spoken_languages (language_id, speaking_skill, comprehension_skill,
             listening_skill, writing_skill, reading_skill)
         VALUES (1, 'native', 'native', 'native', 'native', 'native')",
    )
    .expect("Valid levels should be accepted");

    let err = raw(
        &db,
        "INSERT INTO spoken_languages (language_id, speaking_skill, comprehension_skill,
             listening_skill, writing_skill, reading_skill)
         VALUES (1, 'fluent', 'native', 'native', 'native', 'native')",
    )
    .unwrap_err();

    assert!(matches!(db_error(&err), DatabaseError::CheckViolation(_)));
}

#[test]
fn test_lesson_withUnsupportedDuration_shouldFailCheck() {
    let db = create_test_db();
    insert_teacher(&db, "t@example.com");
    raw(
        &db,
        "INSERT INTO students (email, first_name, last_name, role)
         VALUES ('s@example.com', 'Sam', 'Lee', 'Student')",
    )
    .unwrap();

    raw(&db, "INSERT INTO lessons (duration, teacher_id, student_id) VALUES (45, 1, 1)")
        .expect("45 minutes should be accepted");
    let err = raw(&db, "INSERT INTO lessons (duration, teacher_id, student_id) VALUES (50, 1, 1)")
        .unwrap_err();

    assert!(matches!(db_error(&err), DatabaseError::CheckViolation(_)));
}

#[test]
fn test_teacher_withWrongRoleOrPlatform_shouldFailCheck() {
    let db = create_test_db();

    let wrong_role = raw(
        &db,
        "INSERT INTO teachers (email, first_name, last_name, role, platform)
         VALUES ('a@example.com', 'A', 'B', 'Student', 'Zoom')",
    )
    .unwrap_err();
    let wrong_platform = raw(
        &db,
        "INSERT INTO teachers (email, first_name, last_name, role, platform)
         VALUES ('a@example.com', 'A', 'B', 'Teacher', 'Skype')",
    )
    .unwrap_err();
    let negative_lessons = raw(
        &db,
        "INSERT INTO teachers (email, first_name, last_name, role, platform, number_of_lessons)
         VALUES ('a@example.com', 'A', 'B', 'Teacher', 'Zoom', -1)",
    )
    .unwrap_err();

    for err in [wrong_role, wrong_platform, negative_lessons] {
        assert!(matches!(db_error(&err), DatabaseError::CheckViolation(_)));
    }
}

#[test]
fn test_category_withBadPriceOrJson_shouldFailCheck() {
    let db = create_test_db();

    let negative = raw(&db, "INSERT INTO categories (name, price) VALUES ('Kids', -5)").unwrap_err();
    let object_tags = raw(
        &db,
        r#"INSERT INTO categories (name, price, tags) VALUES ('Kids', 5, '{"speaking": true}')"#,
    )
    .unwrap_err();
    let broken_json = raw(
        &db,
        "INSERT INTO categories (name, price, language_level) VALUES ('Kids', 5, '[beginner')",
    )
    .unwrap_err();

    for err in [negative, object_tags, broken_json] {
        assert!(matches!(db_error(&err), DatabaseError::CheckViolation(_)));
    }
}

#[test]
fn test_language_withNullName_shouldFailNotNull() {
    let db = create_test_db();

    let err = raw(&db, "INSERT INTO languages (name) VALUES (NULL)").unwrap_err();

    assert!(matches!(db_error(&err), DatabaseError::NotNullViolation(_)));
}

#[test]
fn test_email_sharedAcrossUserTables_shouldFailUnique() {
    let db = create_test_db();
    raw(
        &db,
        "INSERT INTO admin_users (email, first_name, last_name, role)
         VALUES ('Boss@Example.com', 'Big', 'Boss', 'Teacher')",
    )
    .unwrap();

    let err = raw(
        &db,
        "INSERT INTO students (email, first_name, last_name, role)
         VALUES ('boss@example.com', 'Sam', 'Lee', 'Student')",
    )
    .unwrap_err();

    assert!(matches!(db_error(&err), DatabaseError::UniqueViolation(_)));
}

#[test]
fn test_emailUpdate_toAddressOfOtherTable_shouldFailUnique() {
    let db = create_test_db();
    insert_teacher(&db, "taken@example.com");
    raw(
        &db,
        "INSERT INTO students (email, first_name, last_name, role)
         VALUES ('free@example.com', 'Sam', 'Lee', 'Student')",
    )
    .unwrap();

    let err = raw(&db, "UPDATE students SET email = 'taken@example.com' WHERE id = 1").unwrap_err();

    assert!(matches!(db_error(&err), DatabaseError::UniqueViolation(_)));
}

#[test]
fn test_joinTable_duplicatePairOrDanglingId_shouldFail() {
    let db = create_test_db();
    insert_teacher(&db, "t@example.com");
    raw(&db, "INSERT INTO languages (name) VALUES ('Thai')").unwrap();

    raw(&db, "INSERT INTO taught_by_teachers (language_id, teacher_id) VALUES (1, 1)").unwrap();
    let duplicate =
        raw(&db, "INSERT INTO taught_by_teachers (language_id, teacher_id) VALUES (1, 1)")
            .unwrap_err();
    let dangling =
        raw(&db, "INSERT INTO taught_by_teachers (language_id, teacher_id) VALUES (2, 1)")
            .unwrap_err();

    assert!(matches!(db_error(&duplicate), DatabaseError::UniqueViolation(_)));
    assert!(matches!(db_error(&dangling), DatabaseError::ForeignKeyViolation(_)));
}

#[test]
fn test_category_withTagOutsideDomain_shouldFailCheck() {
    let db = create_test_db();
    raw(
        &db,
        r#"INSERT INTO categories (name, price, tags, language_level)
           VALUES ('Choir', 10, '["speaking"]', '["native"]')"#,
    )
    .expect("Known tags and levels should be accepted");

    let unknown_tag = raw(
        &db,
        r#"INSERT INTO categories (name, price, tags) VALUES ('Choir', 10, '["singing"]')"#,
    )
    .unwrap_err();
    let unknown_level =
        raw(&db, r#"UPDATE categories SET language_level = '["expert"]' WHERE id = 1"#)
            .unwrap_err();

    let null_tag = raw(
        &db,
        r#"INSERT INTO categories (name, price, tags, language_level)
           VALUES ('Choir', 10, '[null]', '[null, "native"]')"#,
    )
    .unwrap_err();
    let numeric_level =
        raw(&db, r#"UPDATE categories SET language_level = '[1]' WHERE id = 1"#).unwrap_err();

    assert!(matches!(db_error(&unknown_tag), DatabaseError::CheckViolation(_)));
    assert!(matches!(db_error(&unknown_level), DatabaseError::CheckViolation(_)));
    assert!(matches!(db_error(&null_tag), DatabaseError::CheckViolation(_)));
    assert!(matches!(db_error(&numeric_level), DatabaseError::CheckViolation(_)));
}

#[tokio::test]
async fn test_category_updatedThroughRepository_shouldKeepValidTags() {
    let repo = Repository::new(create_test_db());
    let mut category = repo.insert(&Category::new("Choir", 10, "")).await.unwrap();

    category.tags = vec![Tag::Pronunciation, Tag::Listening];
    category.language_level = vec![ProficiencyLevel::Beginner];
    repo.update(&category).await.unwrap();

    let stored: Category = repo.require(category.id).await.unwrap();
    assert_eq!(stored.tags, vec![Tag::Pronunciation, Tag::Listening]);
    assert_eq!(stored.language_level, vec![ProficiencyLevel::Beginner]);
}
