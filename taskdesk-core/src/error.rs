//! Error types shared across the store
//!
//! Lookups that find nothing are not errors and return `Option::None`.
//! Persistence failures live in [`crate::storage::StorageError`].

use thiserror::Error;

use crate::ids::{EntityKind, RecordId};

/// Raised when a display string does not decode to an enum value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{kind} '{value}' not recognized")]
    Unrecognized { kind: &'static str, value: String },
}

/// Errors from store-level create and update operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("A user with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("No {0} ids left to allocate")]
    IdsExhausted(EntityKind),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: RecordId },

    #[error("Failed to hash password: {0}")]
    Password(#[from] bcrypt::BcryptError),
}
