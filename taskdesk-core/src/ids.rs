//! Identifier allocation
//!
//! Identifiers are unique within one collection only; an item and a person
//! may share the same number.

use std::fmt;

/// Numeric identifier of a record within its own collection
pub type RecordId = u32;

/// A record that carries a numeric identifier
pub trait Identified {
    fn id(&self) -> RecordId;
}

/// Returns the identifier for the next record of a collection.
///
/// `1` for an empty collection, otherwise the current maximum plus one.
/// Gaps left by deletions are never filled, so `None` is returned once the
/// maximum is `RecordId::MAX`.
pub fn next_id<T: Identified>(records: &[T]) -> Option<RecordId> {
    match records.iter().map(Identified::id).max() {
        None => Some(1),
        Some(max) => max.checked_add(1),
    }
}

/// The three record kinds held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Item,
    Person,
    Team,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Item => write!(f, "Task"),
            EntityKind::Person => write!(f, "User"),
            EntityKind::Team => write!(f, "Group"),
        }
    }
}

/// Kind-qualified identifier, unique across the whole store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: RecordId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: RecordId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
