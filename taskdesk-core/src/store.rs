//! The application-wide store of tasks, users, groups and settings
//!
//! Constructed once per run (see [`crate::Storage::load_all`]), passed by
//! reference to whoever needs it and flushed with
//! [`crate::Storage::save_all`] on shutdown.

use chrono::NaiveDate;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::ids::{EntityKind, RecordId};
use crate::models::{Item, ItemStatus, Person, PersonRole, Settings, Team};
use crate::search::{self, find_by_name};

/// Fields for a new task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub status: ItemStatus,
    pub team_ids: Vec<RecordId>,
    pub person_ids: Vec<RecordId>,
}

/// Fields for a new user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub full_name: String,
    pub email: String,
    /// Plain password; only its hash is stored
    pub password: String,
    pub role: PersonRole,
    pub team_ids: Vec<RecordId>,
    pub item_ids: Vec<RecordId>,
}

/// Fields for a new group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeam {
    pub name: String,
    pub description: String,
    pub person_ids: Vec<RecordId>,
    pub item_ids: Vec<RecordId>,
}

impl From<&Item> for NewItem {
    fn from(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            due_date: item.due_date,
            status: item.status,
            team_ids: item.team_ids.clone(),
            person_ids: item.person_ids.clone(),
        }
    }
}

/// Current fields of a user, with an empty password meaning "unchanged"
impl From<&Person> for NewPerson {
    fn from(person: &Person) -> Self {
        Self {
            full_name: person.full_name.clone(),
            email: person.email.clone(),
            password: String::new(),
            role: person.role,
            team_ids: person.team_ids.clone(),
            item_ids: person.item_ids.clone(),
        }
    }
}

impl From<&Team> for NewTeam {
    fn from(team: &Team) -> Self {
        Self {
            name: team.name.clone(),
            description: team.description.clone(),
            person_ids: team.person_ids.clone(),
            item_ids: team.item_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStore {
    pub(crate) items: Collection<Item>,
    pub(crate) people: Collection<Person>,
    pub(crate) teams: Collection<Team>,
    pub settings: Settings,
    password_cost: u32,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn require(value: &str, field: &'static str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::EmptyField(field));
    }
    Ok(())
}

impl TaskStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            items: Collection::new(),
            people: Collection::new(),
            teams: Collection::new(),
            settings: Settings::default(),
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub(crate) fn from_parts(
        items: Collection<Item>,
        people: Collection<Person>,
        teams: Collection<Team>,
        settings: Settings,
    ) -> Self {
        Self {
            items,
            people,
            teams,
            settings,
            ..Self::new()
        }
    }

    /// bcrypt cost used when hashing new passwords
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub fn items(&self) -> &Collection<Item> {
        &self.items
    }

    pub fn people(&self) -> &Collection<Person> {
        &self.people
    }

    pub fn teams(&self) -> &Collection<Team> {
        &self.teams
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn item(&self, id: RecordId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn person(&self, id: RecordId) -> Option<&Person> {
        self.people.get(id)
    }

    pub fn team(&self, id: RecordId) -> Option<&Team> {
        self.teams.get(id)
    }

    /// Mutable access for scalar fields; relationship lists stay read-only
    pub fn item_mut(&mut self, id: RecordId) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    pub fn person_mut(&mut self, id: RecordId) -> Option<&mut Person> {
        self.people.get_mut(id)
    }

    pub fn team_mut(&mut self, id: RecordId) -> Option<&mut Team> {
        self.teams.get_mut(id)
    }

    /// Exact, case-sensitive email lookup
    pub fn person_by_email(&self, email: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.email == email)
    }

    pub fn person_by_full_name(&self, full_name: &str) -> Option<&Person> {
        find_by_name(self.people.as_slice(), full_name)
    }

    pub fn team_by_name(&self, name: &str) -> Option<&Team> {
        find_by_name(self.teams.as_slice(), name)
    }

    pub fn item_by_title(&self, title: &str) -> Option<&Item> {
        find_by_name(self.items.as_slice(), title)
    }

    pub fn filter_items(&self, query: &str) -> Vec<&Item> {
        search::filter(self.items.as_slice(), query)
    }

    pub fn filter_people(&self, query: &str) -> Vec<&Person> {
        search::filter(self.people.as_slice(), query)
    }

    pub fn filter_teams(&self, query: &str) -> Vec<&Team> {
        search::filter(self.teams.as_slice(), query)
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Adds a task and links it to the requested users and groups
    pub fn create_item(&mut self, new: NewItem) -> Result<RecordId, StoreError> {
        require(&new.title, "Title")?;
        require(&new.description, "Description")?;

        let id = self
            .items
            .next_id()
            .ok_or(StoreError::IdsExhausted(EntityKind::Item))?;
        self.items.push(Item::new(
            id,
            new.title,
            new.description,
            new.due_date,
            new.status,
        ));
        self.set_item_teams(id, &new.team_ids);
        self.set_item_people(id, &new.person_ids);

        log::info!("New task added: ID: {}", id);
        Ok(id)
    }

    /// Adds a user; the email must not be taken yet
    pub fn create_person(&mut self, new: NewPerson) -> Result<RecordId, StoreError> {
        require(&new.full_name, "Full name")?;
        require(&new.email, "Email")?;
        require(&new.password, "Password")?;
        if self.person_by_email(&new.email).is_some() {
            return Err(StoreError::DuplicateEmail(new.email));
        }

        let id = self
            .people
            .next_id()
            .ok_or(StoreError::IdsExhausted(EntityKind::Person))?;
        let mut person = Person::new(id, new.full_name, new.email, new.role);
        person.set_password(&new.password, self.password_cost)?;
        self.people.push(person);
        self.set_person_teams(id, &new.team_ids);
        self.set_person_items(id, &new.item_ids);

        log::info!("New user added: ID: {}", id);
        Ok(id)
    }

    pub fn create_team(&mut self, new: NewTeam) -> Result<RecordId, StoreError> {
        require(&new.name, "Name")?;

        let id = self
            .teams
            .next_id()
            .ok_or(StoreError::IdsExhausted(EntityKind::Team))?;
        self.teams.push(Team::new(id, new.name, new.description));
        self.set_team_people(id, &new.person_ids);
        self.set_team_items(id, &new.item_ids);

        log::info!("New group added: ID: {}", id);
        Ok(id)
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replaces a task's fields and memberships
    pub fn update_item(&mut self, item_id: RecordId, fields: NewItem) -> Result<(), StoreError> {
        require(&fields.title, "Title")?;
        require(&fields.description, "Description")?;
        let item = self.items.get_mut(item_id).ok_or(StoreError::NotFound {
            kind: EntityKind::Item,
            id: item_id,
        })?;
        item.title = fields.title;
        item.description = fields.description;
        item.due_date = fields.due_date;
        item.status = fields.status;
        self.set_item_teams(item_id, &fields.team_ids);
        self.set_item_people(item_id, &fields.person_ids);

        log::info!("Updated task: ID: {}", item_id);
        Ok(())
    }

    /// Replaces a user's fields and memberships
    ///
    /// An empty password leaves the current one in place.
    /// Nothing is written unless every check and the password hash succeed.
    pub fn update_person(
        &mut self,
        person_id: RecordId,
        fields: NewPerson,
    ) -> Result<(), StoreError> {
        require(&fields.full_name, "Full name")?;
        require(&fields.email, "Email")?;
        self.check_email_free(person_id, &fields.email)?;
        let password_hash = if fields.password.is_empty() {
            None
        } else {
            Some(bcrypt::hash(&fields.password, self.password_cost)?)
        };

        let person = self.people.get_mut(person_id).ok_or(StoreError::NotFound {
            kind: EntityKind::Person,
            id: person_id,
        })?;
        person.full_name = fields.full_name;
        person.email = fields.email;
        person.role = fields.role;
        if let Some(hash) = password_hash {
            person.password_hash = hash;
        }
        self.set_person_teams(person_id, &fields.team_ids);
        self.set_person_items(person_id, &fields.item_ids);

        log::info!("Updated user: ID: {}", person_id);
        Ok(())
    }

    pub fn update_team(&mut self, team_id: RecordId, fields: NewTeam) -> Result<(), StoreError> {
        require(&fields.name, "Name")?;
        let team = self.teams.get_mut(team_id).ok_or(StoreError::NotFound {
            kind: EntityKind::Team,
            id: team_id,
        })?;
        team.name = fields.name;
        team.description = fields.description;
        self.set_team_people(team_id, &fields.person_ids);
        self.set_team_items(team_id, &fields.item_ids);

        log::info!("Updated group: ID: {}", team_id);
        Ok(())
    }

    fn check_email_free(&self, person_id: RecordId, email: &str) -> Result<(), StoreError> {
        match self.person_by_email(email) {
            Some(other) if other.id != person_id => {
                Err(StoreError::DuplicateEmail(email.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Changes a user's email, keeping emails unique
    pub fn set_person_email(&mut self, person_id: RecordId, email: &str) -> Result<(), StoreError> {
        require(email, "Email")?;
        self.check_email_free(person_id, email)?;
        let person = self.people.get_mut(person_id).ok_or(StoreError::NotFound {
            kind: EntityKind::Person,
            id: person_id,
        })?;
        person.email = email.to_string();
        Ok(())
    }

    pub fn set_person_password(
        &mut self,
        person_id: RecordId,
        password: &str,
    ) -> Result<(), StoreError> {
        require(password, "Password")?;
        let cost = self.password_cost;
        let person = self.people.get_mut(person_id).ok_or(StoreError::NotFound {
            kind: EntityKind::Person,
            id: person_id,
        })?;
        person.set_password(password, cost)?;
        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Deletes a task and strips its id from every user and group
    pub fn delete_item(&mut self, item_id: RecordId) -> Option<Item> {
        if !self.items.contains(item_id) {
            return None;
        }
        self.detach_item(item_id);
        let removed = self.items.remove(item_id);
        log::info!("Deleted task: ID: {}", item_id);
        removed
    }

    /// Deletes a user, their memberships and any settings pointing at them
    pub fn delete_person(&mut self, person_id: RecordId) -> Option<Person> {
        if !self.people.contains(person_id) {
            return None;
        }
        self.detach_person(person_id);
        self.settings.forget(person_id);
        let removed = self.people.remove(person_id);
        log::info!("Deleted user: ID: {}", person_id);
        removed
    }

    pub fn delete_team(&mut self, team_id: RecordId) -> Option<Team> {
        if !self.teams.contains(team_id) {
            return None;
        }
        self.detach_team(team_id);
        let removed = self.teams.remove(team_id);
        log::info!("Deleted group: ID: {}", team_id);
        removed
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Looks up a user by email and checks the password
    pub fn authenticate(&self, email: &str, password: &str) -> Option<&Person> {
        self.person_by_email(email)
            .filter(|person| person.verify_password(password))
    }

    /// Records a successful login in the settings
    pub fn record_login(&mut self, person_id: RecordId, remember: bool) -> bool {
        if !self.people.contains(person_id) {
            return false;
        }
        if self.settings.last_person_id != Some(person_id) {
            log::info!("Set last logged in user id to: {}", person_id);
        }
        self.settings.last_person_id = Some(person_id);
        if remember {
            self.settings.remember(person_id);
        }
        true
    }

    /// User of the most recent login, if still present
    pub fn current_person(&self) -> Option<&Person> {
        self.settings.last_person(self.people.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 30).unwrap()
    }

    fn new_item(title: &str) -> NewItem {
        NewItem {
            title: title.into(),
            description: "Something to do".into(),
            due_date: date(),
            status: ItemStatus::Pending,
            team_ids: Vec::new(),
            person_ids: Vec::new(),
        }
    }

    fn new_person(name: &str, email: &str) -> NewPerson {
        NewPerson {
            full_name: name.into(),
            email: email.into(),
            password: "hunter2".into(),
            role: PersonRole::User,
            team_ids: Vec::new(),
            item_ids: Vec::new(),
        }
    }

    fn new_team(name: &str) -> NewTeam {
        NewTeam {
            name: name.into(),
            description: String::new(),
            person_ids: Vec::new(),
            item_ids: Vec::new(),
        }
    }

    fn store() -> TaskStore {
        TaskStore::new().with_password_cost(TEST_COST)
    }

    #[test]
    fn test_create_allocates_sequential_ids() {
        let mut store = store();
        assert_eq!(store.create_item(new_item("A")).unwrap(), 1);
        assert_eq!(store.create_item(new_item("B")).unwrap(), 2);
        assert_eq!(store.create_team(new_team("Core")).unwrap(), 1);
        assert_eq!(store.create_person(new_person("Ada", "ada@x")).unwrap(), 1);
    }

    #[test]
    fn test_deleting_highest_id_frees_it() {
        let mut store = store();
        store.create_item(new_item("A")).unwrap();
        store.create_item(new_item("B")).unwrap();
        store.create_item(new_item("C")).unwrap();

        store.delete_item(2);
        assert_eq!(store.create_item(new_item("D")).unwrap(), 4);
        assert_eq!(store.items().ids(), vec![1, 3, 4]);
    }

    #[test]
    fn test_create_item_links_both_sides() {
        let mut store = store();
        let team = store.create_team(new_team("Core")).unwrap();
        let ada = store.create_person(new_person("Ada", "ada@x")).unwrap();

        let mut item = new_item("Ship it");
        item.team_ids = vec![team];
        item.person_ids = vec![ada, 99];
        let id = store.create_item(item).unwrap();

        assert_eq!(store.item(id).unwrap().person_ids(), &[ada]);
        assert_eq!(store.person(ada).unwrap().item_ids(), &[id]);
        assert_eq!(store.team(team).unwrap().item_ids(), &[id]);
        assert!(store.consistency_report().is_empty());
    }

    #[test]
    fn test_create_rejects_empty_fields() {
        let mut store = store();
        let err = store.create_item(new_item("  ")).unwrap_err();
        assert!(matches!(err, StoreError::EmptyField("Title")));

        let mut person = new_person("Ada", "ada@x");
        person.password.clear();
        assert!(matches!(
            store.create_person(person),
            Err(StoreError::EmptyField("Password"))
        ));
        assert!(store.people().is_empty());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let mut store = store();
        store.create_person(new_person("Ada", "ada@x")).unwrap();
        let err = store.create_person(new_person("Other Ada", "ada@x")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(_)));

        let grace = store.create_person(new_person("Grace", "grace@x")).unwrap();
        assert!(store.set_person_email(grace, "ada@x").is_err());
        store.set_person_email(grace, "hopper@x").unwrap();
        assert_eq!(store.person(grace).unwrap().email(), "hopper@x");
    }

    #[test]
    fn test_natural_key_lookups_are_exact() {
        let mut store = store();
        store.create_person(new_person("Ada Lovelace", "ada@x")).unwrap();
        store.create_team(new_team("Core")).unwrap();

        assert!(store.person_by_email("ada@x").is_some());
        assert!(store.person_by_email("ADA@x").is_none());
        assert!(store.person_by_full_name("Ada Lovelace").is_some());
        assert!(store.person_by_full_name("ada lovelace").is_none());
        assert!(store.team_by_name("Core").is_some());
        assert!(store.item_by_title("Core").is_none());
    }

    #[test]
    fn test_delete_person_strips_all_references() {
        let mut store = store();
        let team = store.create_team(new_team("Core")).unwrap();
        let ada = store.create_person(new_person("Ada", "ada@x")).unwrap();
        let mut item = new_item("Ship it");
        item.person_ids = vec![ada];
        let item_id = store.create_item(item).unwrap();
        store.set_person_teams(ada, &[team]);
        store.record_login(ada, true);

        // one-sided reference the person never knew about
        store.teams.get_mut(team).unwrap().person_ids.push(ada);

        let removed = store.delete_person(ada).unwrap();
        assert_eq!(removed.full_name, "Ada");
        assert!(store.person(ada).is_none());
        assert!(store.team(team).unwrap().person_ids().is_empty());
        assert!(store.item(item_id).unwrap().person_ids().is_empty());
        assert_eq!(store.settings.last_person_id, None);
        assert!(store.settings.remembered_person_ids.is_empty());
        assert!(store.delete_person(ada).is_none());
    }

    #[test]
    fn test_delete_team_and_item() {
        let mut store = store();
        let team = store.create_team(new_team("Core")).unwrap();
        let mut item = new_item("Ship it");
        item.team_ids = vec![team];
        let item_id = store.create_item(item).unwrap();

        store.delete_team(team).unwrap();
        assert!(store.item(item_id).unwrap().team_ids().is_empty());

        store.delete_item(item_id).unwrap();
        assert!(store.items().is_empty());
        assert!(store.delete_item(item_id).is_none());
    }

    #[test]
    fn test_authenticate_and_record_login() {
        let mut store = store();
        let ada = store.create_person(new_person("Ada", "ada@x")).unwrap();

        assert!(store.authenticate("ada@x", "wrong").is_none());
        assert!(store.authenticate("nobody@x", "hunter2").is_none());
        assert_eq!(store.authenticate("ada@x", "hunter2").unwrap().id, ada);

        assert!(store.record_login(ada, false));
        assert_eq!(store.current_person().unwrap().id, ada);
        assert!(store.settings.remembered_person_ids.is_empty());
        assert!(!store.record_login(42, true));
    }

    #[test]
    fn test_change_password() {
        let mut store = store();
        let ada = store.create_person(new_person("Ada", "ada@x")).unwrap();
        store.set_person_password(ada, "new-secret").unwrap();
        assert!(store.authenticate("ada@x", "new-secret").is_some());
        assert!(store.authenticate("ada@x", "hunter2").is_none());
        assert!(matches!(
            store.set_person_password(9, "x"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_item_rewrites_memberships() {
        let mut store = store();
        let core = store.create_team(new_team("Core")).unwrap();
        let docs = store.create_team(new_team("Docs")).unwrap();
        let mut item = new_item("Ship it");
        item.team_ids = vec![core];
        let id = store.create_item(item).unwrap();

        let mut fields = NewItem::from(store.item(id).unwrap());
        fields.status = ItemStatus::Completed;
        fields.team_ids = vec![docs];
        store.update_item(id, fields).unwrap();

        let item = store.item(id).unwrap();
        assert_eq!(item.status, ItemStatus::Completed);
        assert_eq!(item.team_ids(), &[docs]);
        assert!(store.team(core).unwrap().item_ids().is_empty());
        assert_eq!(store.team(docs).unwrap().item_ids(), &[id]);
    }

    #[test]
    fn test_update_person_keeps_password_when_empty() {
        let mut store = store();
        let ada = store.create_person(new_person("Ada", "ada@x")).unwrap();

        let mut fields = NewPerson::from(store.person(ada).unwrap());
        assert!(fields.password.is_empty());
        fields.full_name = "Ada King".into();
        fields.role = PersonRole::ReadOnly;
        store.update_person(ada, fields).unwrap();

        let person = store.authenticate("ada@x", "hunter2").unwrap();
        assert_eq!(person.full_name, "Ada King");
        assert_eq!(person.role, PersonRole::ReadOnly);
    }

    #[test]
    fn test_failed_update_person_changes_nothing() {
        let mut store = store();
        let ada = store.create_person(new_person("Ada", "ada@x")).unwrap();
        let team = store.create_team(new_team("Core")).unwrap();
        let before = store.clone();

        // bcrypt only accepts costs from 4 to 31
        let mut store = store.with_password_cost(2);
        let mut fields = NewPerson::from(store.person(ada).unwrap());
        fields.email = "lovelace@x".into();
        fields.full_name = "Ada King".into();
        fields.password = "new-secret".into();
        fields.team_ids = vec![team];

        assert!(matches!(
            store.update_person(ada, fields),
            Err(StoreError::Password(_))
        ));
        let store = store.with_password_cost(TEST_COST);
        assert_eq!(store, before);
        assert!(store.authenticate("ada@x", "hunter2").is_some());
    }

    #[test]
    fn test_update_person_rejects_taken_email() {
        let mut store = store();
        let ada = store.create_person(new_person("Ada", "ada@x")).unwrap();
        store.create_person(new_person("Grace", "grace@x")).unwrap();

        let mut fields = NewPerson::from(store.person(ada).unwrap());
        fields.email = "grace@x".into();
        fields.full_name = "Ada King".into();
        assert!(matches!(
            store.update_person(ada, fields),
            Err(StoreError::DuplicateEmail(_))
        ));
        assert_eq!(store.person(ada).unwrap().full_name, "Ada");
    }

    #[test]
    fn test_create_fails_when_ids_exhausted() {
        let mut store = store();
        store.teams.push(Team::new(RecordId::MAX, "Last".into(), String::new()));

        assert!(matches!(
            store.create_team(new_team("Overflow")),
            Err(StoreError::IdsExhausted(EntityKind::Team))
        ));
        assert_eq!(store.teams().len(), 1);
        assert_eq!(store.create_item(new_item("Still fine")).unwrap(), 1);
    }

    #[test]
    fn test_update_missing_records() {
        let mut store = store();
        assert!(matches!(
            store.update_item(5, new_item("A")),
            Err(StoreError::NotFound { kind: EntityKind::Item, id: 5 })
        ));
        assert!(store.update_team(5, new_team("T")).is_err());
        assert!(store.update_person(5, new_person("P", "p@x")).is_err());
    }

    #[test]
    fn test_filter_people() {
        let mut store = store();
        store.create_person(new_person("Ada Lovelace", "ada@engine.org")).unwrap();
        store.create_person(new_person("Grace Hopper", "grace@navy.mil")).unwrap();

        let hits = store.filter_people("ENGINE");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_name, "Ada Lovelace");
        assert_eq!(store.filter_people(" ").len(), 2);
        assert!(store.filter_people("zzz").is_empty());
    }
}
