//! On-disk persistence for the store
//!
//! Each collection lives in its own JSON file under one data directory.
//! Loading never fails outright: a file that cannot be read or parsed is
//! logged, replaced by an empty collection and reported back to the caller.
//! A shared lock file guards against two processes writing at once.

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::collection::Collection;
use crate::config::Config;
use crate::models::{Item, Person, PersonRole, Settings, Team};
use crate::store::TaskStore;

pub const ITEMS_FILE: &str = "tasks.json";
pub const PEOPLE_FILE: &str = "users.json";
pub const TEAMS_FILE: &str = "groups.json";
pub const SETTINGS_FILE: &str = "settings.json";

const LOCK_FILE: &str = ".taskdesk.lock";
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const BOOTSTRAP_NAME: &str = "Administrator";
const BOOTSTRAP_EMAIL: &str = "admin@taskdesk.local";
const BOOTSTRAP_PASSWORD: &str = "admin";

/// Error type for storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to acquire lock on {path:?}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout waiting for file lock - another process may be writing: {0:?}")]
    LockTimeout(PathBuf),

    #[error("Failed to hash bootstrap password: {0}")]
    Bootstrap(#[from] bcrypt::BcryptError),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A loaded value together with the failure that degraded it, if any
#[derive(Debug)]
pub struct Loaded<T> {
    pub value: T,
    pub failure: Option<StorageError>,
}

impl<T> Loaded<T> {
    fn clean(value: T) -> Self {
        Self { value, failure: None }
    }

    fn degraded(value: T, failure: StorageError) -> Self {
        Self {
            value,
            failure: Some(failure),
        }
    }

    /// True when the value is an empty substitute for unreadable data
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }

    fn into_parts(self) -> (T, Option<StorageError>) {
        (self.value, self.failure)
    }
}

/// Failures collected while loading every file
#[derive(Debug, Default)]
pub struct LoadReport {
    pub failures: Vec<StorageError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, failure: Option<StorageError>) {
        self.failures.extend(failure);
    }
}

/// Failures collected while saving every file
#[derive(Debug, Default)]
pub struct SaveReport {
    pub failures: Vec<StorageError>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, result: Result<(), StorageError>) {
        if let Err(e) = result {
            self.failures.push(e);
        }
    }
}

/// Handles saving and loading the store's files with file locking
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
    lock_file_path: PathBuf,
    bootstrap_admin: bool,
    password_cost: u32,
}

impl Storage {
    /// Creates a new Storage instance over a data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let lock_file_path = data_dir.join(LOCK_FILE);
        Self {
            data_dir,
            lock_file_path,
            bootstrap_admin: false,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_dir())
            .with_bootstrap_admin(config.bootstrap_admin)
            .with_password_cost(config.password_cost)
    }

    /// Seed an Admin account when no users exist yet
    pub fn with_bootstrap_admin(mut self, enabled: bool) -> Self {
        self.bootstrap_admin = enabled;
        self
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of one of the data files
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    fn ensure_data_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| StorageError::io(&self.data_dir, e))
    }

    /// Acquire an exclusive lock for writing
    /// Returns the lock file handle which must be held during the operation
    fn acquire_write_lock(&self) -> Result<File, StorageError> {
        self.ensure_data_dir()?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .map_err(|e| StorageError::io(&self.lock_file_path, e))?;

        self.wait_for_lock(&lock_file, <File as FileExt>::try_lock_exclusive)?;
        Ok(lock_file)
    }

    /// Acquire a shared lock for reading
    fn acquire_read_lock(&self) -> Result<Option<File>, StorageError> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .map_err(|e| StorageError::io(&self.lock_file_path, e))?;

        self.wait_for_lock(&lock_file, <File as FileExt>::try_lock_shared)?;
        Ok(Some(lock_file))
    }

    fn wait_for_lock(
        &self,
        lock_file: &File,
        try_lock: fn(&File) -> std::io::Result<()>,
    ) -> Result<(), StorageError> {
        let start = Instant::now();
        loop {
            match try_lock(lock_file) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        return Err(StorageError::LockTimeout(self.data_dir.clone()));
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(StorageError::Lock {
                        path: self.lock_file_path.clone(),
                        source: e,
                    })
                }
            }
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Reads one file without locking
    ///
    /// A missing file is created empty. Missing and blank files both read as
    /// `Ok(None)`.
    fn read_file<T: DeserializeOwned>(&self, file_name: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(file_name);
        if !path.exists() {
            log::warn!("No {:?} found", path);
            self.ensure_data_dir()?;
            File::create(&path).map_err(|e| StorageError::io(&path, e))?;
            log::info!("{:?} created", path);
            return Ok(None);
        }

        let json = fs::read_to_string(&path).map_err(|e| StorageError::io(&path, e))?;
        if json.trim().is_empty() {
            return Ok(None);
        }

        let value = serde_json::from_str(&json).map_err(|source| StorageError::Parse {
            path: path.clone(),
            source,
        })?;
        log::info!("Loaded {:?}", path);
        Ok(Some(value))
    }

    fn load_unlocked<T: DeserializeOwned + Default>(&self, file_name: &str) -> Loaded<T> {
        match self.read_file(file_name) {
            Ok(value) => Loaded::clean(value.unwrap_or_default()),
            Err(e) => {
                log::error!("Error loading {}: {}", file_name, e);
                Loaded::degraded(T::default(), e)
            }
        }
    }

    fn load_locked<T: DeserializeOwned + Default>(&self, file_name: &str) -> Loaded<T> {
        let _lock = match self.acquire_read_lock() {
            Ok(lock) => lock,
            Err(e) => {
                log::error!("Error loading {}: {}", file_name, e);
                return Loaded::degraded(T::default(), e);
            }
        };
        self.load_unlocked(file_name)
    }

    pub fn load_items(&self) -> Loaded<Collection<Item>> {
        self.load_locked(ITEMS_FILE)
    }

    /// Loads users, seeding the bootstrap Admin if enabled and none exist
    pub fn load_people(&self) -> Loaded<Collection<Person>> {
        let loaded = self.load_locked(PEOPLE_FILE);
        self.seed_people(loaded)
    }

    pub fn load_teams(&self) -> Loaded<Collection<Team>> {
        self.load_locked(TEAMS_FILE)
    }

    pub fn load_settings(&self) -> Loaded<Settings> {
        self.load_locked(SETTINGS_FILE)
    }

    fn seed_people(&self, loaded: Loaded<Collection<Person>>) -> Loaded<Collection<Person>> {
        if !self.bootstrap_admin || loaded.is_degraded() || !loaded.value.is_empty() {
            return loaded;
        }

        let mut admin = Person::new(
            1,
            BOOTSTRAP_NAME.to_string(),
            BOOTSTRAP_EMAIL.to_string(),
            PersonRole::Admin,
        );
        match admin.set_password(BOOTSTRAP_PASSWORD, self.password_cost) {
            Ok(()) => {
                log::warn!(
                    "No users found, created bootstrap admin '{}' with the default password",
                    BOOTSTRAP_EMAIL
                );
                Loaded::clean(Collection::from(vec![admin]))
            }
            Err(e) => {
                let failure = StorageError::from(e);
                log::error!("Error seeding users: {}", failure);
                Loaded::degraded(loaded.value, failure)
            }
        }
    }

    /// Loads every file under one shared lock
    ///
    /// Each file is independent: a failure in one leaves the others intact.
    pub fn load_all(&self) -> (TaskStore, LoadReport) {
        let mut report = LoadReport::default();

        let _lock = match self.acquire_read_lock() {
            Ok(lock) => lock,
            Err(e) => {
                log::error!("Error loading data from {:?}: {}", self.data_dir, e);
                report.failures.push(e);
                return (self.empty_store(), report);
            }
        };

        let (items, failure) = self.load_unlocked::<Collection<Item>>(ITEMS_FILE).into_parts();
        report.record(failure);
        let (people, failure) = self.seed_people(self.load_unlocked(PEOPLE_FILE)).into_parts();
        report.record(failure);
        let (teams, failure) = self.load_unlocked::<Collection<Team>>(TEAMS_FILE).into_parts();
        report.record(failure);
        let (settings, failure) = self.load_unlocked::<Settings>(SETTINGS_FILE).into_parts();
        report.record(failure);

        let store = TaskStore::from_parts(items, people, teams, settings)
            .with_password_cost(self.password_cost);
        (store, report)
    }

    fn empty_store(&self) -> TaskStore {
        TaskStore::new().with_password_cost(self.password_cost)
    }

    // =========================================================================
    // Saving
    // =========================================================================

    fn write_file<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let path = self.path_for(file_name);
        let json = serde_json::to_string_pretty(value).map_err(|source| StorageError::Serialize {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|e| StorageError::io(&path, e))?;
        log::info!("Saved {:?}", path);
        Ok(())
    }

    fn save_unlocked<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        self.write_file(file_name, value).map_err(|e| {
            log::error!("Error saving {}: {}", file_name, e);
            e
        })
    }

    fn save_locked<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let mut lock_file = self.acquire_write_lock().map_err(|e| {
            log::error!("Error saving {}: {}", file_name, e);
            e
        })?;
        write_lock_holder(&mut lock_file);
        self.save_unlocked(file_name, value)
    }

    pub fn save_items(&self, items: &Collection<Item>) -> Result<(), StorageError> {
        self.save_locked(ITEMS_FILE, items)
    }

    pub fn save_people(&self, people: &Collection<Person>) -> Result<(), StorageError> {
        self.save_locked(PEOPLE_FILE, people)
    }

    pub fn save_teams(&self, teams: &Collection<Team>) -> Result<(), StorageError> {
        self.save_locked(TEAMS_FILE, teams)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.save_locked(SETTINGS_FILE, settings)
    }

    /// Saves every file under one exclusive lock
    pub fn save_all(&self, store: &TaskStore) -> SaveReport {
        let mut report = SaveReport::default();

        let mut lock_file = match self.acquire_write_lock() {
            Ok(lock) => lock,
            Err(e) => {
                log::error!("Error saving data to {:?}: {}", self.data_dir, e);
                report.failures.push(e);
                return report;
            }
        };
        write_lock_holder(&mut lock_file);

        report.record(self.save_unlocked(ITEMS_FILE, store.items()));
        report.record(self.save_unlocked(PEOPLE_FILE, store.people()));
        report.record(self.save_unlocked(TEAMS_FILE, store.teams()));
        report.record(self.save_unlocked(SETTINGS_FILE, &store.settings));
        report
    }
}

// Lock holder info, for debugging
fn write_lock_holder(lock_file: &mut File) {
    let _ = writeln!(
        lock_file,
        "Locked by PID {} at {}",
        std::process::id(),
        chrono::Utc::now().to_rfc3339()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemStatus;
    use crate::store::{NewItem, NewPerson, NewTeam};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const TEST_COST: u32 = 4;

    fn storage(dir: &TempDir) -> Storage {
        Storage::new(dir.path()).with_password_cost(TEST_COST)
    }

    fn populated() -> TaskStore {
        let mut store = TaskStore::new().with_password_cost(TEST_COST);
        let core = store
            .create_team(NewTeam {
                name: "Core".into(),
                description: "Engine room".into(),
                person_ids: Vec::new(),
                item_ids: Vec::new(),
            })
            .unwrap();
        let ada = store
            .create_person(NewPerson {
                full_name: "Ada Lovelace".into(),
                email: "ada@engine.org".into(),
                password: "hunter2".into(),
                role: PersonRole::Admin,
                team_ids: vec![core],
                item_ids: Vec::new(),
            })
            .unwrap();
        for title in ["Write notes", "Fix loom"] {
            store
                .create_item(NewItem {
                    title: title.into(),
                    description: "Soon".into(),
                    due_date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
                    status: ItemStatus::InProgress,
                    team_ids: vec![core],
                    person_ids: vec![ada],
                })
                .unwrap();
        }
        store.delete_item(1);
        store.record_login(ada, true);
        store.settings.dark_theme = true;
        store
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let store = populated();

        assert!(storage.save_all(&store).is_clean());
        let (loaded, report) = storage.load_all();

        assert!(report.is_clean());
        assert_eq!(loaded, store);
        assert_eq!(loaded.items().ids(), vec![2]);
    }

    #[test]
    fn test_files_use_symbolic_enums_and_iso_dates() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_all(&populated());

        let json = fs::read_to_string(storage.path_for(ITEMS_FILE)).unwrap();
        assert!(json.contains("\"InProgress\""));
        assert!(json.contains("\"2025-01-05\""));
        assert!(json.contains("\"team_ids\""));

        let json = fs::read_to_string(storage.path_for(PEOPLE_FILE)).unwrap();
        assert!(json.contains("\"Admin\""));
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_missing_files_are_created_empty() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);

        let loaded = storage.load_items();
        assert!(!loaded.is_degraded());
        assert!(loaded.value.is_empty());
        assert!(storage.path_for(ITEMS_FILE).exists());

        let settings = storage.load_settings();
        assert_eq!(settings.value, Settings::default());
        assert!(storage.path_for(SETTINGS_FILE).exists());
    }

    #[test]
    fn test_blank_file_is_empty_collection() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        fs::write(storage.path_for(TEAMS_FILE), "  \n").unwrap();

        let loaded = storage.load_teams();
        assert!(!loaded.is_degraded());
        assert!(loaded.value.is_empty());
    }

    #[test]
    fn test_malformed_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        storage.save_all(&populated());
        fs::write(storage.path_for(ITEMS_FILE), "[{\"id\": 1, ").unwrap();

        let (store, report) = storage.load_all();
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], StorageError::Parse { .. }));
        assert!(store.items().is_empty());
        assert_eq!(store.people().len(), 1);
        assert_eq!(store.teams().len(), 1);
    }

    #[test]
    fn test_unknown_enum_value_is_a_parse_failure() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let json = r#"[{"id":1,"full_name":"A","email":"a@x","role":"Owner"}]"#;
        fs::write(storage.path_for(PEOPLE_FILE), json).unwrap();

        let loaded = storage.load_people();
        assert!(loaded.is_degraded());
        assert!(loaded.value.is_empty());
    }

    #[test]
    fn test_dangling_ids_load_without_failure() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let json =
            r#"[{"id":3,"name":"Ghosts","description":"","person_ids":[42],"item_ids":[7]}]"#;
        fs::write(storage.path_for(TEAMS_FILE), json).unwrap();

        let (store, report) = storage.load_all();
        assert!(report.is_clean());
        let team = store.team(3).unwrap();
        assert_eq!(team.person_ids(), &[42]);
        assert_eq!(team.people_text(store.people().as_slice()), "");
    }

    #[test]
    fn test_missing_relationship_lists_default_to_empty() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let json = concat!(
            r#"[{"id":1,"title":"T","description":"D","#,
            r#""due_date":"2025-02-01","status":"Pending"}]"#
        );
        fs::write(storage.path_for(ITEMS_FILE), json).unwrap();

        let loaded = storage.load_items();
        assert!(!loaded.is_degraded());
        let item = loaded.value.get(1).unwrap();
        assert!(item.team_ids().is_empty());
        assert!(item.person_ids().is_empty());
    }

    #[test]
    fn test_bootstrap_admin_seeded_when_no_users() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).with_bootstrap_admin(true);

        let (store, report) = storage.load_all();
        assert!(report.is_clean());
        assert_eq!(store.people().len(), 1);
        let admin = store.authenticate(BOOTSTRAP_EMAIL, BOOTSTRAP_PASSWORD).unwrap();
        assert_eq!(admin.role, PersonRole::Admin);
    }

    #[test]
    fn test_no_bootstrap_over_unreadable_users() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).with_bootstrap_admin(true);
        fs::write(storage.path_for(PEOPLE_FILE), "not json").unwrap();

        let loaded = storage.load_people();
        assert!(loaded.is_degraded());
        assert!(loaded.value.is_empty());
    }

    #[test]
    fn test_bootstrap_disabled() {
        let dir = TempDir::new().unwrap();
        let (store, _) = storage(&dir).load_all();
        assert!(store.people().is_empty());
    }

    #[test]
    fn test_individual_saves() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let store = populated();

        storage.save_teams(store.teams()).unwrap();
        storage.save_settings(&store.settings).unwrap();

        assert_eq!(storage.load_teams().value, *store.teams());
        assert!(storage.load_settings().value.dark_theme);
    }

    #[test]
    fn test_save_into_missing_directory_reports_failure() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain-file");
        fs::write(&file, "x").unwrap();
        let storage = Storage::new(file.join("data"));

        let report = storage.save_all(&populated());
        assert!(!report.is_clean());
    }
}
