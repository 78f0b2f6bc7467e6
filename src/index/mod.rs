//! Full-text index of snapshot documents, backed by SQLite FTS5.

mod schema;
mod store;

use std::path::PathBuf;

pub use store::IndexStore;

/// Searchable fields, in search priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Text,
    AuxText,
}

impl Field {
    pub const PRIORITY: [Field; 3] = [Field::Title, Field::Text, Field::AuxText];

    pub fn column(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Text => "text",
            Field::AuxText => "aux_text",
        }
    }

    /// Position of the column in the `pages` table.
    pub fn column_index(&self) -> i32 {
        match self {
            Field::Title => 2,
            Field::Text => 3,
            Field::AuxText => 4,
        }
    }

    /// Titles are short enough to never be shown elided.
    pub fn ellipsis(&self) -> &'static str {
        match self {
            Field::Title => "",
            Field::Text | Field::AuxText => "...",
        }
    }
}

/// Storage failure. Fatal to the call, nothing is retried or repaired.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("index {path} is in use by another process")]
    Locked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index lock poisoned")]
    Poisoned,
}

/// Search expression rejected by the engine. Holds the engine's message.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct QueryError(pub String);
