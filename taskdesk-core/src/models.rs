use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;
use crate::ids::{Identified, RecordId};
use crate::search::{names_for_ids, Named, Searchable};

/// Display format for due dates
pub const DUE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Represents the status of a task
///
/// Persisted by symbolic name (`"InProgress"`), displayed through
/// [`ItemStatus::as_display_str`] (`"In Progress..."`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 5] = [
        ItemStatus::Pending,
        ItemStatus::InProgress,
        ItemStatus::Completed,
        ItemStatus::OnHold,
        ItemStatus::Cancelled,
    ];

    /// Canonical display string
    pub fn as_display_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "Pending...",
            ItemStatus::InProgress => "In Progress...",
            ItemStatus::Completed => "Completed!",
            ItemStatus::OnHold => "On Hold...",
            ItemStatus::Cancelled => "Cancelled!",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_display_str())
    }
}

impl FromStr for ItemStatus {
    type Err = CodecError;

    /// Exact, case-sensitive match against the display strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending..." => Ok(ItemStatus::Pending),
            "In Progress..." => Ok(ItemStatus::InProgress),
            "Completed!" => Ok(ItemStatus::Completed),
            "On Hold..." => Ok(ItemStatus::OnHold),
            "Cancelled!" => Ok(ItemStatus::Cancelled),
            _ => Err(CodecError::Unrecognized {
                kind: "State",
                value: s.to_string(),
            }),
        }
    }
}

/// Represents the role of a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PersonRole {
    Admin,
    User,
    ReadOnly,
}

impl PersonRole {
    pub const ALL: [PersonRole; 3] = [PersonRole::Admin, PersonRole::User, PersonRole::ReadOnly];

    pub fn as_display_str(self) -> &'static str {
        match self {
            PersonRole::Admin => "Admin",
            PersonRole::User => "User",
            PersonRole::ReadOnly => "Read-Only",
        }
    }
}

impl fmt::Display for PersonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_display_str())
    }
}

impl FromStr for PersonRole {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(PersonRole::Admin),
            "User" => Ok(PersonRole::User),
            "Read-Only" => Ok(PersonRole::ReadOnly),
            _ => Err(CodecError::Unrecognized {
                kind: "Role",
                value: s.to_string(),
            }),
        }
    }
}

/// A single task
///
/// Relationship lists are read-only here; they change only through the
/// membership operations on [`crate::TaskStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub(crate) id: RecordId,

    /// Short title describing the task
    pub title: String,

    /// Free-text description
    pub description: String,

    /// Due date, no time component
    pub due_date: NaiveDate,

    pub status: ItemStatus,

    /// Groups this task is assigned to
    #[serde(default)]
    pub(crate) team_ids: Vec<RecordId>,

    /// Users this task is assigned to
    #[serde(default)]
    pub(crate) person_ids: Vec<RecordId>,
}

impl Item {
    pub(crate) fn new(
        id: RecordId,
        title: String,
        description: String,
        due_date: NaiveDate,
        status: ItemStatus,
    ) -> Self {
        Self {
            id,
            title,
            description,
            due_date,
            status,
            team_ids: Vec::new(),
            person_ids: Vec::new(),
        }
    }

    pub fn team_ids(&self) -> &[RecordId] {
        &self.team_ids
    }

    pub fn person_ids(&self) -> &[RecordId] {
        &self.person_ids
    }

    pub fn status_text(&self) -> &'static str {
        self.status.as_display_str()
    }

    /// Due date as `DD/MM/YYYY`
    pub fn due_date_text(&self) -> String {
        self.due_date.format(DUE_DATE_FORMAT).to_string()
    }

    /// Names of the assigned groups joined with ", "; unknown ids are skipped
    pub fn teams_text(&self, teams: &[Team]) -> String {
        names_for_ids(&self.team_ids, teams).join(", ")
    }

    /// Full names of the assigned users joined with ", "
    pub fn people_text(&self, people: &[Person]) -> String {
        names_for_ids(&self.person_ids, people).join(", ")
    }

    pub(crate) fn team_ids_mut(&mut self) -> &mut Vec<RecordId> {
        &mut self.team_ids
    }

    pub(crate) fn person_ids_mut(&mut self) -> &mut Vec<RecordId> {
        &mut self.person_ids
    }
}

impl Identified for Item {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl Named for Item {
    fn name(&self) -> &str {
        &self.title
    }
}

impl Searchable for Item {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.description.as_str()]
    }
}

/// A user of the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub(crate) id: RecordId,

    pub full_name: String,

    /// Secondary unique key used for login; changed through the store
    pub(crate) email: String,

    /// bcrypt hash, never the plain password
    #[serde(default)]
    pub(crate) password_hash: String,

    pub role: PersonRole,

    #[serde(default)]
    pub(crate) team_ids: Vec<RecordId>,

    #[serde(default)]
    pub(crate) item_ids: Vec<RecordId>,
}

impl Person {
    pub(crate) fn new(id: RecordId, full_name: String, email: String, role: PersonRole) -> Self {
        Self {
            id,
            full_name,
            email,
            password_hash: String::new(),
            role,
            team_ids: Vec::new(),
            item_ids: Vec::new(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn team_ids(&self) -> &[RecordId] {
        &self.team_ids
    }

    pub fn item_ids(&self) -> &[RecordId] {
        &self.item_ids
    }

    pub fn role_text(&self) -> &'static str {
        self.role.as_display_str()
    }

    pub fn teams_text(&self, teams: &[Team]) -> String {
        names_for_ids(&self.team_ids, teams).join(", ")
    }

    pub fn items_text(&self, items: &[Item]) -> String {
        names_for_ids(&self.item_ids, items).join(", ")
    }

    /// Replaces the stored hash with a bcrypt hash of `password`
    pub(crate) fn set_password(
        &mut self,
        password: &str,
        cost: u32,
    ) -> Result<(), bcrypt::BcryptError> {
        self.password_hash = bcrypt::hash(password, cost)?;
        Ok(())
    }

    /// Checks a login attempt. A missing or malformed hash never matches.
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub(crate) fn team_ids_mut(&mut self) -> &mut Vec<RecordId> {
        &mut self.team_ids
    }

    pub(crate) fn item_ids_mut(&mut self) -> &mut Vec<RecordId> {
        &mut self.item_ids
    }
}

impl Identified for Person {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl Named for Person {
    fn name(&self) -> &str {
        &self.full_name
    }
}

impl Searchable for Person {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.full_name.as_str(), self.email.as_str()]
    }
}

/// A group of users sharing tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub(crate) id: RecordId,

    pub name: String,

    pub description: String,

    #[serde(default)]
    pub(crate) person_ids: Vec<RecordId>,

    #[serde(default)]
    pub(crate) item_ids: Vec<RecordId>,
}

impl Team {
    pub(crate) fn new(id: RecordId, name: String, description: String) -> Self {
        Self {
            id,
            name,
            description,
            person_ids: Vec::new(),
            item_ids: Vec::new(),
        }
    }

    pub fn person_ids(&self) -> &[RecordId] {
        &self.person_ids
    }

    pub fn item_ids(&self) -> &[RecordId] {
        &self.item_ids
    }

    pub fn people_text(&self, people: &[Person]) -> String {
        names_for_ids(&self.person_ids, people).join(", ")
    }

    pub fn items_text(&self, items: &[Item]) -> String {
        names_for_ids(&self.item_ids, items).join(", ")
    }

    pub(crate) fn person_ids_mut(&mut self) -> &mut Vec<RecordId> {
        &mut self.person_ids
    }

    pub(crate) fn item_ids_mut(&mut self) -> &mut Vec<RecordId> {
        &mut self.item_ids
    }
}

impl Identified for Team {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl Named for Team {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Searchable for Team {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.description.as_str()]
    }
}

/// Application settings persisted alongside the collections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// User of the most recent successful login
    pub last_person_id: Option<RecordId>,

    /// Users offered on the login screen, in the order they were remembered
    pub remembered_person_ids: Vec<RecordId>,

    pub dark_theme: bool,
}

impl Settings {
    pub fn last_person<'a>(&self, people: &'a [Person]) -> Option<&'a Person> {
        let id = self.last_person_id?;
        people.iter().find(|p| p.id == id)
    }

    /// Emails of remembered users that still exist
    pub fn remembered_emails<'a>(&self, people: &'a [Person]) -> Vec<&'a str> {
        self.remembered_person_ids
            .iter()
            .filter_map(|id| people.iter().find(|p| p.id == *id))
            .map(|p| p.email.as_str())
            .collect()
    }

    pub fn remember(&mut self, person_id: RecordId) {
        if !self.remembered_person_ids.contains(&person_id) {
            self.remembered_person_ids.push(person_id);
        }
    }

    /// Drops every reference to a user
    pub fn forget(&mut self, person_id: RecordId) {
        self.remembered_person_ids.retain(|id| *id != person_id);
        if self.last_person_id == Some(person_id) {
            self.last_person_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn person(id: RecordId, name: &str, email: &str) -> Person {
        Person::new(id, name.into(), email.into(), PersonRole::User)
    }

    #[test]
    fn test_status_codec_round_trip() {
        for status in ItemStatus::ALL {
            let decoded: ItemStatus = status.as_display_str().parse().unwrap();
            assert_eq!(decoded, status);
        }
    }

    #[test]
    fn test_role_codec_round_trip() {
        for role in PersonRole::ALL {
            assert_eq!(role.to_string().parse::<PersonRole>().unwrap(), role);
        }
    }

    #[test]
    fn test_status_decode_is_exact() {
        for bad in ["", "pending...", "PENDING...", "Pending", " Pending...", "Unknown"] {
            let err = bad.parse::<ItemStatus>().unwrap_err();
            assert_eq!(
                err,
                CodecError::Unrecognized {
                    kind: "State",
                    value: bad.to_string()
                }
            );
        }
    }

    #[test]
    fn test_role_decode_is_exact() {
        for bad in ["", "admin", "ReadOnly", "Read-only", "ADMIN"] {
            assert!(bad.parse::<PersonRole>().is_err(), "{bad:?} should not decode");
        }
        let err = "ReadOnly".parse::<PersonRole>().unwrap_err();
        assert!(err.to_string().contains("'ReadOnly'"));
    }

    #[test]
    fn test_status_serializes_symbolic_name() {
        assert_eq!(
            serde_json::to_string(&ItemStatus::InProgress).unwrap(),
            "\"InProgress\""
        );
        assert_eq!(
            serde_json::to_string(&PersonRole::ReadOnly).unwrap(),
            "\"ReadOnly\""
        );
    }

    #[test]
    fn test_due_date_text_is_zero_padded() {
        let item = Item::new(1, "T".into(), "D".into(), date(2025, 3, 7), ItemStatus::Pending);
        assert_eq!(item.due_date_text(), "07/03/2025");
        assert_eq!(item.status_text(), "Pending...");
    }

    #[test]
    fn test_names_text_skips_unknown_ids() {
        let people = vec![person(1, "Ada", "ada@x"), person(2, "Linus", "linus@x")];
        let mut item = Item::new(1, "T".into(), "D".into(), date(2025, 1, 1), ItemStatus::Pending);
        item.person_ids = vec![2, 42, 1];
        assert_eq!(item.people_text(&people), "Linus, Ada");
    }

    #[test]
    fn test_names_text_empty_when_nothing_resolves() {
        let people = vec![person(1, "Ada", "ada@x")];
        let mut team = Team::new(1, "Core".into(), String::new());
        team.person_ids = vec![99, 100];
        assert_eq!(team.people_text(&people), "");

        let empty = Team::new(2, "Empty".into(), String::new());
        assert_eq!(empty.items_text(&[]), "");
    }

    #[test]
    fn test_verify_password() {
        let mut p = person(1, "Ada", "ada@x");
        assert!(!p.verify_password(""));

        p.set_password("secret", 4).unwrap();
        assert!(p.verify_password("secret"));
        assert!(!p.verify_password("Secret"));
        assert_ne!(p.password_hash, "secret");
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let mut p = person(1, "Ada", "ada@x");
        p.password_hash = "plaintext".into();
        assert!(!p.verify_password("plaintext"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.last_person_id, None);
        assert!(settings.remembered_person_ids.is_empty());
        assert!(!settings.dark_theme);

        let parsed: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_settings_remembered_emails_skip_missing() {
        let people = vec![person(1, "Ada", "ada@x"), person(3, "Grace", "grace@x")];
        let mut settings = Settings::default();
        settings.remember(3);
        settings.remember(2);
        settings.remember(1);
        settings.remember(3);

        assert_eq!(settings.remembered_person_ids, vec![3, 2, 1]);
        assert_eq!(settings.remembered_emails(&people), vec!["grace@x", "ada@x"]);
    }

    #[test]
    fn test_settings_forget_clears_last_person() {
        let people = vec![person(1, "Ada", "ada@x")];
        let mut settings = Settings {
            last_person_id: Some(1),
            remembered_person_ids: vec![1],
            dark_theme: true,
        };
        assert_eq!(settings.last_person(&people).unwrap().full_name, "Ada");

        settings.forget(1);
        assert!(settings.last_person(&people).is_none());
        assert!(settings.remembered_person_ids.is_empty());
        assert!(settings.dark_theme);
    }
}
