/*!
 * Database entity models and enumerations.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data. Every table record can be turned
 * into a column-name → value dictionary with `to_dict()`.
 */

use rusqlite::Row;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Type, Value as SqlValue, ValueRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Maximum length of a language name
pub const LANGUAGE_NAME_LENGTH: usize = 64;
/// Maximum length of an email address
pub const EMAIL_LENGTH: usize = 254;
/// Maximum length of a first name
pub const FIRST_NAME_LENGTH: usize = 64;
/// Maximum length of a last name
pub const LAST_NAME_LENGTH: usize = 64;
/// Maximum length of a teacher location
pub const LOCATION_NAME_LENGTH: usize = 128;
/// Maximum length of a teacher description
pub const DESCRIPTION_LENGTH: usize = 2000;
/// Maximum length of a certificate reference
pub const CERTIFICATE_LENGTH: usize = 256;
/// Maximum length of a category name
pub const CATEGORY_NAME_LENGTH: usize = 128;

/// Current UTC time as an RFC 3339 string
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn invalid_text(kind: &str, value: &str) -> anyhow::Error {
    anyhow::anyhow!("Invalid {}: {}", kind, value)
}

fn text_from_sql<T>(value: ValueRef<'_>) -> FromSqlResult<T>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    value
        .as_str()?
        .parse()
        .map_err(|e: anyhow::Error| FromSqlError::Other(e.into()))
}

// =========================================================================
// Enumerations
// =========================================================================

/// Ordered language proficiency rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProficiencyLevel {
    Beginner,
    PreIntermediate,
    Intermediate,
    PreAdvanced,
    Advanced,
    Native,
}

impl ProficiencyLevel {
    /// All levels from lowest to highest
    pub const ALL: [ProficiencyLevel; 6] = [
        ProficiencyLevel::Beginner,
        ProficiencyLevel::PreIntermediate,
        ProficiencyLevel::Intermediate,
        ProficiencyLevel::PreAdvanced,
        ProficiencyLevel::Advanced,
        ProficiencyLevel::Native,
    ];

    /// Stored text form
    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyLevel::Beginner => "beginner",
            ProficiencyLevel::PreIntermediate => "pre-intermediate",
            ProficiencyLevel::Intermediate => "intermediate",
            ProficiencyLevel::PreAdvanced => "pre-advanced",
            ProficiencyLevel::Advanced => "advanced",
            ProficiencyLevel::Native => "native",
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProficiencyLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == lowered)
            .ok_or_else(|| invalid_text("proficiency level", s))
    }
}

/// Skill tag attached to a lesson category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Pronunciation,
    Speaking,
    Comprehension,
    Listening,
    Writing,
    Reading,
}

impl Tag {
    pub const ALL: [Tag; 6] = [
        Tag::Pronunciation,
        Tag::Speaking,
        Tag::Comprehension,
        Tag::Listening,
        Tag::Writing,
        Tag::Reading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Pronunciation => "pronunciation",
            Tag::Speaking => "speaking",
            Tag::Comprehension => "comprehension",
            Tag::Listening => "listening",
            Tag::Writing => "writing",
            Tag::Reading => "reading",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str() == lowered)
            .ok_or_else(|| invalid_text("tag", s))
    }
}

/// Lesson length, stored as whole minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Duration {
    ThirtyMinutes,
    FortyFiveMinutes,
    SixtyMinutes,
    NinetyMinutes,
}

impl Duration {
    pub const ALL: [Duration; 4] = [
        Duration::ThirtyMinutes,
        Duration::FortyFiveMinutes,
        Duration::SixtyMinutes,
        Duration::NinetyMinutes,
    ];

    /// Length of the lesson in minutes
    pub fn minutes(&self) -> i64 {
        match self {
            Duration::ThirtyMinutes => 30,
            Duration::FortyFiveMinutes => 45,
            Duration::SixtyMinutes => 60,
            Duration::NinetyMinutes => 90,
        }
    }
}

impl From<Duration> for i64 {
    fn from(duration: Duration) -> Self {
        duration.minutes()
    }
}

impl TryFrom<i64> for Duration {
    type Error = anyhow::Error;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.minutes() == minutes)
            .ok_or_else(|| anyhow::anyhow!("Invalid lesson duration: {} minutes", minutes))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.minutes())
    }
}

impl std::str::FromStr for Duration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let minutes: i64 = s
            .trim()
            .parse()
            .map_err(|_| invalid_text("lesson duration", s))?;
        Self::try_from(minutes)
    }
}

/// Communication tool a teacher holds lessons on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Zoom,
    Discord,
    Telegram,
    KakaoTalk,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Zoom,
        Platform::Discord,
        Platform::Telegram,
        Platform::KakaoTalk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Zoom => "Zoom",
            Platform::Discord => "Discord",
            Platform::Telegram => "Telegram",
            Platform::KakaoTalk => "KakaoTalk",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| invalid_text("platform", s))
    }
}

/// Marketplace role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Student, Role::Teacher];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Teacher => "Teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| invalid_text("role", s))
    }
}

impl FromSql for ProficiencyLevel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

impl FromSql for Tag {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

impl FromSql for Platform {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

impl FromSql for Duration {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Duration::try_from(value.as_i64()?).map_err(|e| FromSqlError::Other(e.into()))
    }
}

impl From<ProficiencyLevel> for SqlValue {
    fn from(level: ProficiencyLevel) -> Self {
        SqlValue::Text(level.as_str().to_string())
    }
}

impl From<Platform> for SqlValue {
    fn from(platform: Platform) -> Self {
        SqlValue::Text(platform.as_str().to_string())
    }
}

impl From<Role> for SqlValue {
    fn from(role: Role) -> Self {
        SqlValue::Text(role.as_str().to_string())
    }
}

impl From<Duration> for SqlValue {
    fn from(duration: Duration) -> Self {
        SqlValue::Integer(duration.minutes())
    }
}

// =========================================================================
// Record traits
// =========================================================================

/// A row of an entity table with an integer `id` primary key.
///
/// `COLUMNS` lists every persisted column except `id`, in the order used by
/// `values()` and expected by `from_row()` (which reads `id` at index 0).
pub trait TableRecord: Clone + Serialize + DeserializeOwned + Send + 'static {
    /// Table name
    const TABLE: &'static str;
    /// Column names, excluding `id`
    const COLUMNS: &'static [&'static str];

    /// Primary key, 0 until inserted
    fn id(&self) -> i64;

    /// Set the primary key after insertion
    fn set_id(&mut self, id: i64);

    /// SQL values in `COLUMNS` order
    fn values(&self) -> rusqlite::Result<Vec<SqlValue>>;

    /// Decode a row selected as `id, COLUMNS...`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Comma separated select list: `id` followed by `COLUMNS`
    fn select_list() -> String {
        std::iter::once("id")
            .chain(Self::COLUMNS.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Map every column name to its current value
    fn to_dict(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Rebuild a record from a `to_dict()` map
    fn from_dict(dict: Map<String, Value>) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(dict))
    }
}

/// A row of a many-to-many association table keyed by two foreign ids
pub trait JoinRecord: Clone + Serialize + Send + 'static {
    /// Record referenced by the left column
    type Left: TableRecord;
    /// Record referenced by the right column
    type Right: TableRecord;

    const TABLE: &'static str;
    const LEFT_COLUMN: &'static str;
    const RIGHT_COLUMN: &'static str;

    fn new(left_id: i64, right_id: i64) -> Self;
    fn left_id(&self) -> i64;
    fn right_id(&self) -> i64;

    /// Map both key columns to their values
    fn to_dict(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(Self::LEFT_COLUMN.to_string(), Value::from(self.left_id()));
        map.insert(Self::RIGHT_COLUMN.to_string(), Value::from(self.right_id()));
        map
    }
}

fn json_to_sql<T: Serialize>(value: &T) -> rusqlite::Result<SqlValue> {
    serde_json::to_string(value)
        .map(SqlValue::Text)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn json_from_row<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// =========================================================================
// Entities
// =========================================================================

/// A language available on the marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

impl Language {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0, // Will be assigned by database
            name: name.into(),
            created_at: timestamp_now(),
        }
    }
}

impl TableRecord for Language {
    const TABLE: &'static str = "languages";
    const COLUMNS: &'static [&'static str] = &["name", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> rusqlite::Result<Vec<SqlValue>> {
        Ok(vec![self.name.clone().into(), self.created_at.clone().into()])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

/// Fields shared by every kind of user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFields {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl UserFields {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
        }
    }

    /// First and last name separated by a space
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.email.clone().into(),
            self.first_name.clone().into(),
            self.last_name.clone().into(),
            self.role.into(),
        ]
    }

    /// Decode the four user columns starting at `offset`
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            email: row.get(offset)?,
            first_name: row.get(offset + 1)?,
            last_name: row.get(offset + 2)?,
            role: row.get(offset + 3)?,
        })
    }
}

/// A tutor offering lessons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: i64,
    #[serde(flatten)]
    pub user: UserFields,
    pub platform: Platform,
    pub location: String,
    pub description: String,
    /// Free-form certificate reference
    pub certificate: String,
    pub number_of_lessons: i64,
    pub created_at: String,
}

impl Teacher {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self {
            id: 0,
            user: UserFields::new(email, first_name, last_name, Role::Teacher),
            platform,
            location: String::new(),
            description: String::new(),
            certificate: String::new(),
            number_of_lessons: 0,
            created_at: timestamp_now(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.certificate = certificate.into();
        self
    }
}

impl fmt::Display for Teacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Teacher: {} | {}>", self.id, self.user.full_name())
    }
}

impl TableRecord for Teacher {
    const TABLE: &'static str = "teachers";
    const COLUMNS: &'static [&'static str] = &[
        "email",
        "first_name",
        "last_name",
        "role",
        "platform",
        "location",
        "description",
        "certificate",
        "number_of_lessons",
        "created_at",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> rusqlite::Result<Vec<SqlValue>> {
        let mut values = self.user.values();
        let teacher_values: [SqlValue; 6] = [
            self.platform.into(),
            self.location.clone().into(),
            self.description.clone().into(),
            self.certificate.clone().into(),
            self.number_of_lessons.into(),
            self.created_at.clone().into(),
        ];
        values.extend(teacher_values);
        Ok(values)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user: UserFields::from_row(row, 1)?,
            platform: row.get(5)?,
            location: row.get(6)?,
            description: row.get(7)?,
            certificate: row.get(8)?,
            number_of_lessons: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

/// A learner booking lessons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    #[serde(flatten)]
    pub user: UserFields,
    pub created_at: String,
}

impl Student {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            user: UserFields::new(email, first_name, last_name, Role::Student),
            created_at: timestamp_now(),
        }
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Student: {} | {}>", self.id, self.user.full_name())
    }
}

impl TableRecord for Student {
    const TABLE: &'static str = "students";
    const COLUMNS: &'static [&'static str] =
        &["email", "first_name", "last_name", "role", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> rusqlite::Result<Vec<SqlValue>> {
        let mut values = self.user.values();
        values.push(self.created_at.clone().into());
        Ok(values)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user: UserFields::from_row(row, 1)?,
            created_at: row.get(5)?,
        })
    }
}

/// A back-office administrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    #[serde(flatten)]
    pub user: UserFields,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl AdminUser {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: 0,
            user: UserFields::new(email, first_name, last_name, role),
            last_login: None,
            created_at: timestamp_now(),
        }
    }
}

impl fmt::Display for AdminUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Admin User {}>", self.user.full_name())
    }
}

impl TableRecord for AdminUser {
    const TABLE: &'static str = "admin_users";
    const COLUMNS: &'static [&'static str] = &[
        "email",
        "first_name",
        "last_name",
        "role",
        "last_login",
        "created_at",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> rusqlite::Result<Vec<SqlValue>> {
        let mut values = self.user.values();
        values.push(self.last_login.clone().into());
        values.push(self.created_at.clone().into());
        Ok(values)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user: UserFields::from_row(row, 1)?,
            last_login: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

/// Any concrete user, as returned by email lookups across the user tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRecord {
    Teacher(Teacher),
    Student(Student),
    Admin(AdminUser),
}

impl UserRecord {
    /// Shared user fields
    pub fn user(&self) -> &UserFields {
        match self {
            UserRecord::Teacher(t) => &t.user,
            UserRecord::Student(s) => &s.user,
            UserRecord::Admin(a) => &a.user,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            UserRecord::Teacher(t) => t.id,
            UserRecord::Student(s) => s.id,
            UserRecord::Admin(a) => a.id,
        }
    }

    /// Table the user lives in
    pub fn table(&self) -> &'static str {
        match self {
            UserRecord::Teacher(_) => Teacher::TABLE,
            UserRecord::Student(_) => Student::TABLE,
            UserRecord::Admin(_) => AdminUser::TABLE,
        }
    }
}

/// Proficiency of one speaker in one language across five skills
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpokenLanguage {
    pub id: i64,
    pub language_id: i64,
    pub speaking_skill: ProficiencyLevel,
    pub comprehension_skill: ProficiencyLevel,
    pub listening_skill: ProficiencyLevel,
    pub writing_skill: ProficiencyLevel,
    pub reading_skill: ProficiencyLevel,
    pub created_at: String,
}

impl SpokenLanguage {
    /// Same level for every skill
    pub fn uniform(language_id: i64, level: ProficiencyLevel) -> Self {
        Self {
            id: 0,
            language_id,
            speaking_skill: level,
            comprehension_skill: level,
            listening_skill: level,
            writing_skill: level,
            reading_skill: level,
            created_at: timestamp_now(),
        }
    }

    /// Level for the skill a tag names; pronunciation has no rating
    pub fn skill(&self, tag: Tag) -> Option<ProficiencyLevel> {
        match tag {
            Tag::Speaking => Some(self.speaking_skill),
            Tag::Comprehension => Some(self.comprehension_skill),
            Tag::Listening => Some(self.listening_skill),
            Tag::Writing => Some(self.writing_skill),
            Tag::Reading => Some(self.reading_skill),
            Tag::Pronunciation => None,
        }
    }

    /// Weakest of the five skills
    pub fn lowest_skill(&self) -> ProficiencyLevel {
        [
            self.speaking_skill,
            self.comprehension_skill,
            self.listening_skill,
            self.writing_skill,
            self.reading_skill,
        ]
        .into_iter()
        .min()
        .unwrap_or(self.speaking_skill)
    }
}

impl TableRecord for SpokenLanguage {
    const TABLE: &'static str = "spoken_languages";
    const COLUMNS: &'static [&'static str] = &[
        "language_id",
        "speaking_skill",
        "comprehension_skill",
        "listening_skill",
        "writing_skill",
        "reading_skill",
        "created_at",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> rusqlite::Result<Vec<SqlValue>> {
        Ok(vec![
            self.language_id.into(),
            self.speaking_skill.into(),
            self.comprehension_skill.into(),
            self.listening_skill.into(),
            self.writing_skill.into(),
            self.reading_skill.into(),
            self.created_at.clone().into(),
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            language_id: row.get(1)?,
            speaking_skill: row.get(2)?,
            comprehension_skill: row.get(3)?,
            listening_skill: row.get(4)?,
            writing_skill: row.get(5)?,
            reading_skill: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

/// Purpose and pricing of a lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Price in the smallest currency unit
    pub price: i64,
    pub description: String,
    pub tags: Vec<Tag>,
    /// Levels the category is suitable for
    pub language_level: Vec<ProficiencyLevel>,
    pub created_at: String,
}

impl Category {
    pub fn new(name: impl Into<String>, price: i64, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            price,
            description: description.into(),
            tags: Vec::new(),
            language_level: Vec::new(),
            created_at: timestamp_now(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_levels(mut self, levels: impl IntoIterator<Item = ProficiencyLevel>) -> Self {
        self.language_level = levels.into_iter().collect();
        self
    }

    /// Whether a learner at `level` fits this category; no levels means any
    pub fn suits_level(&self, level: ProficiencyLevel) -> bool {
        self.language_level.is_empty() || self.language_level.contains(&level)
    }
}

impl TableRecord for Category {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "price",
        "description",
        "tags",
        "language_level",
        "created_at",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> rusqlite::Result<Vec<SqlValue>> {
        Ok(vec![
            self.name.clone().into(),
            self.price.into(),
            self.description.clone().into(),
            json_to_sql(&self.tags)?,
            json_to_sql(&self.language_level)?,
            self.created_at.clone().into(),
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            price: row.get(2)?,
            description: row.get(3)?,
            tags: json_from_row(row, 4)?,
            language_level: json_from_row(row, 5)?,
            created_at: row.get(6)?,
        })
    }
}

/// A reserved or finished lesson between a teacher and a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub duration: Duration,
    pub teacher_id: i64,
    pub student_id: i64,
    pub created_at: String,
}

impl Lesson {
    pub fn new(teacher_id: i64, student_id: i64, duration: Duration) -> Self {
        Self {
            id: 0,
            duration,
            teacher_id,
            student_id,
            created_at: timestamp_now(),
        }
    }
}

impl TableRecord for Lesson {
    const TABLE: &'static str = "lessons";
    const COLUMNS: &'static [&'static str] = &["duration", "teacher_id", "student_id", "created_at"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> rusqlite::Result<Vec<SqlValue>> {
        Ok(vec![
            self.duration.into(),
            self.teacher_id.into(),
            self.student_id.into(),
            self.created_at.clone().into(),
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            duration: row.get(1)?,
            teacher_id: row.get(2)?,
            student_id: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

// =========================================================================
// Association tables
// =========================================================================

macro_rules! join_record {
    (
        $(#[$meta:meta])*
        $name:ident, $table:literal,
        $left:ident: $left_ty:ty => $left_label:literal,
        $right:ident: $right_ty:ty => $right_label:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name {
            pub $left: i64,
            pub $right: i64,
        }

        impl JoinRecord for $name {
            type Left = $left_ty;
            type Right = $right_ty;

            const TABLE: &'static str = $table;
            const LEFT_COLUMN: &'static str = stringify!($left);
            const RIGHT_COLUMN: &'static str = stringify!($right);

            fn new(left_id: i64, right_id: i64) -> Self {
                Self { $left: left_id, $right: right_id }
            }

            fn left_id(&self) -> i64 {
                self.$left
            }

            fn right_id(&self) -> i64 {
                self.$right
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!("<", $left_label, " {} ~ ", $right_label, " {}>"),
                    self.$left, self.$right
                )
            }
        }
    };
}

join_record!(
    /// Students enrolled with a teacher
    StudentsTeachers, "students_teachers",
    student_id: Student => "Student",
    teacher_id: Teacher => "Teacher"
);

join_record!(
    /// Languages a teacher teaches
    TaughtByTeachers, "taught_by_teachers",
    language_id: Language => "Language",
    teacher_id: Teacher => "Teacher"
);

join_record!(
    /// Spoken-language ratings of a teacher
    SpokenByTeachers, "spoken_by_teachers",
    language_id: SpokenLanguage => "SpokenLanguage",
    teacher_id: Teacher => "Teacher"
);

join_record!(
    /// Languages a student learns
    LearntByStudents, "learnt_by_students",
    language_id: Language => "Language",
    student_id: Student => "Student"
);

join_record!(
    /// Spoken-language ratings of a student
    SpokenByStudents, "spoken_by_students",
    language_id: SpokenLanguage => "SpokenLanguage",
    student_id: Student => "Student"
);

join_record!(
    /// Categories a lesson belongs to
    CategoriesLessons, "categories_lessons",
    category_id: Category => "Category",
    lesson_id: Lesson => "Lesson"
);
