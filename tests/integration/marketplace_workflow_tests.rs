/*!
 * End-to-end marketplace scenarios through the repository
 */

use tutorlink::database::models::{
    AdminUser, Category, Duration, Language, LearntByStudents, Lesson, Platform, ProficiencyLevel,
    Role, SpokenByStudents, SpokenByTeachers, SpokenLanguage, Student, StudentsTeachers, TableRecord,
    Tag, TaughtByTeachers, Teacher, UserRecord,
};
use tutorlink::database::JoinRecord;
use tutorlink::{DatabaseError, Repository};

use crate::common::{self, db_error};

async fn create_test_repo() -> Repository {
    Repository::new_in_memory().expect("Failed to create test repository")
}

#[tokio::test]
async fn test_onboardingAndBooking_shouldConnectEveryTable() {
    let repo = create_test_repo().await;

    // Languages
    let seeded = repo
        .seed_languages(vec!["ko".into(), "en".into(), "ja".into()])
        .await
        .unwrap();
    assert_eq!(seeded, 3);
    let korean = repo.find_language_by_name("Korean").await.unwrap().unwrap();
    let english = repo.find_language_by_name("eng").await.unwrap().unwrap();

    // Teacher teaches Korean, speaks English natively
    let teacher = repo
        .insert(&common::sample_teacher(1).with_location("Seoul"))
        .await
        .unwrap();
    repo.link(&TaughtByTeachers::new(korean.id, teacher.id)).await.unwrap();
    let teacher_english = repo
        .insert(&SpokenLanguage::uniform(english.id, ProficiencyLevel::Native))
        .await
        .unwrap();
    repo.link(&SpokenByTeachers::new(teacher_english.id, teacher.id)).await.unwrap();

    // Student learns Korean, speaks English with a weaker writing skill
    let student = repo.insert(&common::sample_student(1)).await.unwrap();
    repo.link(&LearntByStudents::new(korean.id, student.id)).await.unwrap();
    let mut rating = SpokenLanguage::uniform(english.id, ProficiencyLevel::Advanced);
    rating.writing_skill = ProficiencyLevel::Intermediate;
    let student_english = repo.insert(&rating).await.unwrap();
    repo.link(&SpokenByStudents::new(student_english.id, student.id)).await.unwrap();

    // Category and booking
    let category = repo
        .insert(
            &Category::new("Business Korean", 3000, "Meetings and emails")
                .with_tags([Tag::Writing, Tag::Speaking])
                .with_levels([ProficiencyLevel::Intermediate, ProficiencyLevel::PreAdvanced]),
        )
        .await
        .unwrap();
    let lesson = repo
        .book_lesson(
            &Lesson::new(teacher.id, student.id, Duration::SixtyMinutes),
            &[category.id],
        )
        .await
        .unwrap();

    assert_eq!(repo.teacher_languages(teacher.id).await.unwrap(), vec![korean.clone()]);
    assert_eq!(repo.student_languages(student.id).await.unwrap(), vec![korean]);
    assert_eq!(repo.student_teachers(student.id).await.unwrap(), vec![teacher.clone()]);

    let spoken = repo.student_spoken_languages(student.id).await.unwrap();
    assert_eq!(spoken.len(), 1);
    assert!(category.suits_level(spoken[0].lowest_skill()));
    assert_eq!(
        repo.teacher_spoken_languages(teacher.id).await.unwrap()[0].lowest_skill(),
        ProficiencyLevel::Native
    );

    assert_eq!(repo.lesson_categories(lesson.id).await.unwrap(), vec![category]);
    assert_eq!(repo.lessons_for_teacher(teacher.id).await.unwrap(), vec![lesson]);

    // Finishing the lesson bumps the counter stored on the teacher
    assert_eq!(repo.record_completed_lesson(teacher.id).await.unwrap(), 1);
    let refreshed: Teacher = repo.require(teacher.id).await.unwrap();
    assert_eq!(refreshed.number_of_lessons, 1);
    assert_eq!(refreshed.location, "Seoul");
}

#[tokio::test]
async fn test_secondBooking_withSamePair_shouldNotDuplicateEnrollment() {
    let repo = create_test_repo().await;
    let teacher = repo.insert(&common::sample_teacher(1)).await.unwrap();
    let student = repo.insert(&common::sample_student(1)).await.unwrap();

    for duration in [Duration::ThirtyMinutes, Duration::NinetyMinutes] {
        repo.book_lesson(&Lesson::new(teacher.id, student.id, duration), &[])
            .await
            .unwrap();
    }

    assert_eq!(repo.count::<Lesson>().await.unwrap(), 2);
    assert_eq!(repo.list_links::<StudentsTeachers>().await.unwrap().len(), 1);
    assert_eq!(repo.lessons_for_student(student.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_emailNamespace_shouldSpanAllUserKinds() {
    let repo = create_test_repo().await;
    let admin = repo
        .insert(&AdminUser::new("staff@example.com", "Staff", "Member", Role::Teacher))
        .await
        .unwrap();

    let as_teacher = repo
        .insert(&Teacher::new("STAFF@example.com", "Other", "Person", Platform::Zoom))
        .await
        .unwrap_err();
    let as_student = repo
        .insert(&Student::new("staff@example.com", "Other", "Person"))
        .await
        .unwrap_err();

    assert!(matches!(db_error(&as_teacher), DatabaseError::UniqueViolation(_)));
    assert!(matches!(db_error(&as_student), DatabaseError::UniqueViolation(_)));
    assert_eq!(
        repo.find_user_by_email("Staff@Example.com").await.unwrap(),
        Some(UserRecord::Admin(admin))
    );
}

#[tokio::test]
async fn test_updateEmail_toTakenAddress_shouldFailWithUniqueViolation() {
    let repo = create_test_repo().await;
    repo.insert(&common::sample_teacher(1)).await.unwrap();
    let mut student = repo.insert(&common::sample_student(1)).await.unwrap();

    student.user.email = "teacher1@example.com".to_string();
    let err = repo.update(&student).await.unwrap_err();

    assert!(matches!(db_error(&err), DatabaseError::UniqueViolation(_)));
    let stored: Student = repo.require(student.id).await.unwrap();
    assert_eq!(stored.user.email, "student1@example.com");
}

#[tokio::test]
async fn test_deleteLanguage_inUseBySpokenRating_shouldFailWithForeignKeyViolation() {
    let repo = create_test_repo().await;
    let language = repo.ensure_language("Thai").await.unwrap();
    repo.insert(&SpokenLanguage::uniform(language.id, ProficiencyLevel::Beginner))
        .await
        .unwrap();

    let err = repo.delete::<Language>(language.id).await.unwrap_err();

    assert!(matches!(db_error(&err), DatabaseError::ForeignKeyViolation(_)));
    assert!(repo.get::<Language>(language.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_concurrentInserts_fromClonedRepositories_shouldAllLand() {
    let repo = create_test_repo().await;

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.insert(&common::sample_student(n)).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id());
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 16);
    assert_eq!(repo.count::<Student>().await.unwrap(), 16);
}

#[tokio::test]
async fn test_dumpTable_forEveryTable_shouldSucceed() {
    let repo = create_test_repo().await;
    let teacher = repo.insert(&common::sample_teacher(1)).await.unwrap();

    for table in tutorlink::database::schema::TABLES {
        let rows = repo.dump_table(table).await.unwrap();
        if table == "teachers" {
            assert_eq!(rows, vec![teacher.to_dict()]);
        } else {
            assert!(rows.is_empty(), "{} should be empty", table);
        }
    }
}
