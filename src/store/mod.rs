//! Storage interface shared by the Postgres, Google Sheets and memory backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{CheckIn, EntryFilter, MoodEntry, NewUser, Role, User, UserChanges};

pub mod memory;
pub mod postgres;
pub mod sheets;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use sheets::SheetsStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Google API error: {0}")]
    Remote(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Sheets,
    Memory,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Sheets => "sheets",
            StoreBackend::Memory => "memory",
        }
    }

    /// First column title of the CSV export.
    pub fn csv_student_header(self) -> &'static str {
        match self {
            StoreBackend::Sheets => "Student",
            StoreBackend::Postgres | StoreBackend::Memory => "Student Name",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "sheets" | "google-sheets" => Ok(StoreBackend::Sheets),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown STORE_BACKEND: {}", other)),
        }
    }
}

/// Identity store and mood log behind one interface.
#[async_trait]
pub trait MoodStore: Send + Sync {
    fn backend(&self) -> StoreBackend;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;

    async fn get_user(&self, username: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// All users, or only those with the given role, ordered by username.
    async fn list_users(&self, role: Option<Role>) -> StoreResult<Vec<User>>;

    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: &NewUser) -> StoreResult<User>;

    async fn update_user(&self, username: &str, changes: &UserChanges) -> StoreResult<User>;

    /// Writes the entry for (username, date), replacing any existing one.
    async fn upsert_mood_entry(&self, checkin: &CheckIn) -> StoreResult<MoodEntry>;

    /// Matching entries, newest first.
    async fn list_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<MoodEntry>>;
}
