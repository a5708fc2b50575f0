pub mod collection;
pub mod config;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod relations;
pub mod search;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use collection::Collection;
pub use config::{default_data_dir, get_config_path, Config};
pub use error::{CodecError, StoreError};
pub use ids::{next_id, EntityKind, EntityRef, Identified, RecordId};
pub use logging::{init_logging, log_file_path};
pub use models::{Item, ItemStatus, Person, PersonRole, Settings, Team};
pub use relations::{LinkIssue, MembershipDelta};
pub use search::{Named, SearchView, Searchable};
pub use storage::{
    LoadReport, Loaded, SaveReport, Storage, StorageError, ITEMS_FILE, PEOPLE_FILE,
    SETTINGS_FILE, TEAMS_FILE,
};
pub use store::{NewItem, NewPerson, NewTeam, TaskStore};
