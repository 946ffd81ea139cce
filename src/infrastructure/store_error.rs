//! Error type shared by the relational stores

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{title} does not exist in the database")]
    NotFound { title: String },

    #[error("Invalid landmark branch name: {0:?}")]
    InvalidBranch(String),

    #[error("Malformed geometry in {table} row {id}: {source}")]
    Decode {
        table: String,
        id: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode geometry: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to open store {url}: {reason}")]
    Open { url: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(title: &str) -> Self {
        Self::NotFound { title: title.to_string() }
    }

    /// True for the "no record" case callers are expected to have ruled out
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
