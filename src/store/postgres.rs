use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{MoodStore, StoreBackend, StoreError, StoreResult};
use crate::models::{CheckIn, EntryFilter, MoodEntry, MoodLabel, NewUser, Role, User, UserChanges};

const USER_COLUMNS: &str = "username, email, password_hash, role, display_name, class_group";
const ENTRY_COLUMNS: &str = "username, date, mood, comment, timestamp";

#[derive(Debug, FromRow)]
struct UserRow {
    username: String,
    email: String,
    password_hash: String,
    role: Option<String>,
    display_name: String,
    class_group: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = row.role.as_deref().and_then(|r| match r.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(username = %row.username, error = %e, "Ignoring unknown role");
                None
            }
        });
        User {
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            display_name: row.display_name,
            class_group: row.class_group,
        }
    }
}

#[derive(Debug, FromRow)]
struct MoodEntryRow {
    username: String,
    date: NaiveDate,
    mood: String,
    comment: Option<String>,
    timestamp: DateTime<Utc>,
}

impl From<MoodEntryRow> for MoodEntry {
    fn from(row: MoodEntryRow) -> Self {
        MoodEntry {
            username: row.username,
            date: row.date,
            mood: MoodLabel::parse(&row.mood),
            comment: row.comment,
            timestamp: row.timestamp,
        }
    }
}

/// Maps unique-constraint violations to `Conflict`, everything else to `Database`.
fn conflict_or_database(e: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(message()),
        _ => StoreError::Database(e),
    }
}

/// Relational backend on Postgres.
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MoodStore for PgStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Postgres
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(User::from))
    }

    async fn list_users(&self, role: Option<Role>) -> StoreResult<Vec<User>> {
        let rows = match role {
            Some(role) => {
                sqlx::query_as::<_, UserRow>(&format!(
                    "SELECT {} FROM users WHERE role = $1 ORDER BY username",
                    USER_COLUMNS
                ))
                .bind(role.as_str())
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS))
                    .fetch_all(&self.db)
                    .await?
            }
        };

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, role, display_name, class_group)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.map(Role::as_str))
        .bind(&user.display_name)
        .bind(&user.class_group)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            conflict_or_database(e, || {
                format!("Username {} or email {} is already in use", user.username, user.email)
            })
        })?;

        Ok(User::from(row))
    }

    async fn update_user(&self, username: &str, changes: &UserChanges) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET display_name = COALESCE($2, display_name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash)
            WHERE username = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(&changes.display_name)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| conflict_or_database(e, || "Email is already in use".to_string()))?
        .ok_or_else(|| StoreError::NotFound(format!("User {} not found", username)))?;

        Ok(User::from(row))
    }

    async fn upsert_mood_entry(&self, checkin: &CheckIn) -> StoreResult<MoodEntry> {
        let row = sqlx::query_as::<_, MoodEntryRow>(&format!(
            r#"
            INSERT INTO mood_entries (username, date, mood, comment, timestamp)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (username, date) DO UPDATE
            SET mood = EXCLUDED.mood,
                comment = EXCLUDED.comment,
                timestamp = EXCLUDED.timestamp
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(&checkin.username)
        .bind(checkin.date)
        .bind(checkin.mood.as_str())
        .bind(&checkin.comment)
        .bind(checkin.timestamp)
        .fetch_one(&self.db)
        .await?;

        Ok(MoodEntry::from(row))
    }

    async fn list_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<MoodEntry>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM mood_entries WHERE TRUE", ENTRY_COLUMNS));

        if let Some(username) = &filter.username {
            query.push(" AND username = ").push_bind(username.clone());
        }
        if let Some(day) = filter.on {
            query.push(" AND date = ").push_bind(day);
        }
        if let Some(since) = filter.since {
            query.push(" AND date >= ").push_bind(since);
        }
        if let Some(moods) = &filter.moods {
            let labels: Vec<String> = moods.iter().map(|m| m.as_str().to_string()).collect();
            query.push(" AND lower(trim(mood)) = ANY(").push_bind(labels).push(")");
        }
        query.push(" ORDER BY date DESC, timestamp DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = query.build_query_as::<MoodEntryRow>().fetch_all(&self.db).await?;

        Ok(rows.into_iter().map(MoodEntry::from).collect())
    }
}
