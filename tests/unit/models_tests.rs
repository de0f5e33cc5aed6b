/*!
 * Tests for marketplace records built through the public API
 */

use serde_json::{Map, Value, json};
use tutorlink::database::models::{
    AdminUser, Category, CategoriesLessons, Duration, JoinRecord, Lesson, ProficiencyLevel, Role,
    SpokenLanguage, StudentsTeachers, TableRecord, Tag, Teacher, UserRecord,
};

use crate::common;

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}

#[test]
fn test_teacher_fromDict_withFlatUserFields_shouldBuildRecord() {
    let dict = as_map(json!({
        "id": 4,
        "email": "mina@example.com",
        "first_name": "Mina",
        "last_name": "Park",
        "role": "Teacher",
        "platform": "KakaoTalk",
        "location": "Busan",
        "description": "",
        "certificate": "",
        "number_of_lessons": 12,
        "created_at": "2024-05-01T09:00:00+00:00"
    }));

    let teacher = Teacher::from_dict(dict.clone()).expect("Failed to build teacher");

    assert_eq!(teacher.id, 4);
    assert_eq!(teacher.user.full_name(), "Mina Park");
    assert_eq!(teacher.to_dict(), dict);
    assert_eq!(teacher.to_string(), "<Teacher: 4 | Mina Park>");
}

#[test]
fn test_fromDict_withValueOutsideEnum_shouldFail() {
    let mut dict = common::sample_teacher(1).to_dict();
    dict.insert("platform".to_string(), json!("Skype"));
    assert!(Teacher::from_dict(dict).is_err());

    let mut dict = Lesson::new(1, 2, Duration::ThirtyMinutes).to_dict();
    dict.insert("duration".to_string(), json!(50));
    assert!(Lesson::from_dict(dict).is_err());
}

#[test]
fn test_category_suitsLevel_shouldTreatEmptyAsAny() {
    let open = Category::new("Free talk", 1000, "");
    assert!(open.suits_level(ProficiencyLevel::Beginner));
    assert!(open.suits_level(ProficiencyLevel::Native));

    let advanced = Category::new("Debate", 2500, "")
        .with_tags([Tag::Speaking, Tag::Listening])
        .with_levels([ProficiencyLevel::Advanced, ProficiencyLevel::Native]);
    assert!(advanced.suits_level(ProficiencyLevel::Native));
    assert!(!advanced.suits_level(ProficiencyLevel::Intermediate));

    let dict = advanced.to_dict();
    assert_eq!(dict["tags"], json!(["speaking", "listening"]));
    assert_eq!(dict["language_level"], json!(["advanced", "native"]));
}

#[test]
fn test_spokenLanguage_lowestSkill_shouldPickWeakest() {
    let mut spoken = SpokenLanguage::uniform(1, ProficiencyLevel::Advanced);
    spoken.writing_skill = ProficiencyLevel::PreIntermediate;
    spoken.listening_skill = ProficiencyLevel::Native;

    assert_eq!(spoken.lowest_skill(), ProficiencyLevel::PreIntermediate);
    assert_eq!(spoken.skill(Tag::Writing), Some(ProficiencyLevel::PreIntermediate));
    assert_eq!(spoken.skill(Tag::Pronunciation), None);
}

#[test]
fn test_userRecord_accessors_shouldExposeSharedFields() {
    let mut teacher = common::sample_teacher(3);
    teacher.id = 11;
    let mut admin = AdminUser::new("root@example.com", "Root", "Admin", Role::Student);
    admin.id = 2;

    let records = [UserRecord::Teacher(teacher), UserRecord::Admin(admin)];

    assert_eq!(records[0].id(), 11);
    assert_eq!(records[0].table(), "teachers");
    assert_eq!(records[0].user().role, Role::Teacher);
    assert_eq!(records[1].table(), "admin_users");
    assert_eq!(records[1].user().email, "root@example.com");
}

#[test]
fn test_joinRecords_display_shouldNameBothSides() {
    assert_eq!(StudentsTeachers::new(3, 9).to_string(), "<Student 3 ~ Teacher 9>");
    assert_eq!(CategoriesLessons::new(1, 5).to_string(), "<Category 1 ~ Lesson 5>");

    let link = CategoriesLessons::new(1, 5);
    assert_eq!(link.left_id(), 1);
    assert_eq!(link.right_id(), 5);
    assert_eq!(CategoriesLessons::LEFT_COLUMN, "category_id");
}

#[test]
fn test_newRecords_shouldStartUnsaved() {
    let student = common::sample_student(1);
    let lesson = Lesson::new(1, 1, Duration::SixtyMinutes);

    assert_eq!(student.id(), 0);
    assert_eq!(lesson.id(), 0);
    assert!(chrono::DateTime::parse_from_rfc3339(&student.created_at).is_ok());
    assert_eq!(lesson.duration.minutes(), 60);
}
