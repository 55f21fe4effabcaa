use std::io;

use thiserror::Error;

/// Enumerates high-level errors returned by the review workflow.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Represents a submission rejected before reaching the store.
    #[error("Invalid review: {0}")]
    ValidationFailure(#[from] ValidationError),

    /// Represents a write the store rejected or could not receive.
    #[error("Failed to save review")]
    WriteFailure { source: StoreError },

    /// Represents a read the store could not serve.
    #[error("Failed to read reviews")]
    ReadFailure { source: StoreError },
}

impl ReviewError {
    /// Returns the message to show the person using the site.
    pub fn user_message(&self) -> &'static str {
        match self {
            ReviewError::ValidationFailure(ValidationError::RatingOutOfRange(_)) => {
                "Please choose a rating between 1 and 5"
            }
            ReviewError::ValidationFailure(_) => "Please fill in all fields",
            ReviewError::WriteFailure { .. } => {
                "There was an error submitting your review. Please try again."
            }
            ReviewError::ReadFailure { .. } => "Failed to load reviews. Please refresh the page.",
        }
    }

    pub(crate) fn write(source: StoreError) -> Self {
        ReviewError::WriteFailure { source }
    }

    pub(crate) fn read(source: StoreError) -> Self {
        ReviewError::ReadFailure { source }
    }
}

/// Enumerates the ways a draft can fail validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing {0}")]
    MissingField(Field),

    #[error("rating {0} is not between 1 and 5")]
    RatingOutOfRange(i64),
}

/// A required field of a review draft.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Comment,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Comment => "comment",
        };

        f.write_str(name)
    }
}

/// Enumerates errors returned by the remote review store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents a store that could not be reached.
    #[error("Store unreachable")]
    Unreachable,

    /// Represents a stored document that does not satisfy the model.
    #[error("Corrupt document {id}: {reason}")]
    CorruptDocument { id: String, reason: String },
}

/// Enumerates errors returned by local key-value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error")]
    Io { source: io::Error },

    #[error("Storage contents could not be (de)serialized")]
    Serialization { source: serde_json::Error },

    #[error("Storage file could not be replaced")]
    Persist { source: tempfile::PersistError },

    #[error("Storage is read-only")]
    ReadOnly,
}

/// Enumerates errors encountered while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("must define {name} environment variable")]
    MissingVariable { name: String },

    #[error("could not parse {name}={value:?}")]
    InvalidVariable { name: String, value: String },
}
