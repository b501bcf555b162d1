use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{MoodStore, StoreBackend, StoreError, StoreResult};
use crate::models::{
    CheckIn, EntryFilter, MoodEntry, MoodLabel, NewUser, Role, User, UserChanges, DATE_FORMAT, TIMESTAMP_FORMAT,
};
use crate::sheets::SheetsClient;

const USERS_SHEET: &str = "Users";
const USERS_RANGE: &str = "Users!A:F";
const ENTRIES_SHEET: &str = "MoodEntries";
const ENTRIES_RANGE: &str = "MoodEntries!A:E";

/// Spreadsheet backend: worksheet "Users" (username, email, password hash,
/// role, display name, class group) and worksheet "MoodEntries" (username,
/// date, mood, comment, timestamp), each with one header row.
///
/// Writes are read-modify-write against the remote sheet. The local mutex
/// serializes writers in this process only; across processes the last write
/// wins.
pub struct SheetsStore {
    client: Arc<SheetsClient>,
    write_lock: Mutex<()>,
}

impl SheetsStore {
    pub fn new(client: Arc<SheetsClient>) -> Self {
        Self {
            client,
            write_lock: Mutex::new(()),
        }
    }

    async fn user_rows(&self) -> StoreResult<Vec<Vec<String>>> {
        self.client.get_values(USERS_RANGE).await
    }

    async fn entry_rows(&self) -> StoreResult<Vec<Vec<String>>> {
        self.client.get_values(ENTRIES_RANGE).await
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        Ok(data_rows(&self.user_rows().await?)
            .filter_map(|(_, row)| parse_user_row(row))
            .collect())
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// Rows after the header, paired with their 1-based sheet row number.
fn data_rows<'a>(rows: &'a [Vec<String>]) -> impl Iterator<Item = (usize, &'a [String])> + 'a {
    rows.iter()
        .enumerate()
        .skip(1)
        .map(|(i, row)| (i + 1, row.as_slice()))
}

pub(crate) fn parse_user_row(row: &[String]) -> Option<User> {
    let username = cell(row, 0);
    if username.is_empty() {
        return None;
    }
    Some(User {
        username: username.to_string(),
        email: cell(row, 1).to_string(),
        password_hash: cell(row, 2).to_string(),
        role: cell(row, 3).parse::<Role>().ok(),
        display_name: cell(row, 4).to_string(),
        class_group: Some(cell(row, 5)).filter(|g| !g.is_empty()).map(str::to_string),
    })
}

pub(crate) fn user_to_row(user: &User) -> Vec<String> {
    vec![
        user.username.clone(),
        user.email.clone(),
        user.password_hash.clone(),
        user.role.map(|r| r.as_str().to_string()).unwrap_or_default(),
        user.display_name.clone(),
        user.class_group.clone().unwrap_or_default(),
    ]
}

pub(crate) fn parse_entry_row(row: &[String]) -> Result<MoodEntry, String> {
    let username = cell(row, 0);
    if username.is_empty() {
        return Err("missing username".to_string());
    }
    let date = NaiveDate::parse_from_str(cell(row, 1), DATE_FORMAT)
        .map_err(|e| format!("bad date {:?}: {}", cell(row, 1), e))?;
    if cell(row, 2).is_empty() {
        return Err("missing mood".to_string());
    }
    let mood = MoodLabel::parse(cell(row, 2));
    let comment = Some(cell(row, 3)).filter(|c| !c.is_empty()).map(str::to_string);
    let timestamp = NaiveDateTime::parse_from_str(cell(row, 4), TIMESTAMP_FORMAT)
        .map_err(|e| format!("bad timestamp {:?}: {}", cell(row, 4), e))?
        .and_utc();

    Ok(MoodEntry {
        username: username.to_string(),
        date,
        mood,
        comment,
        timestamp,
    })
}

pub(crate) fn entry_to_row(entry: &MoodEntry) -> Vec<String> {
    vec![
        entry.username.clone(),
        entry.date.format(DATE_FORMAT).to_string(),
        entry.mood.as_str().to_string(),
        entry.comment_or_empty().to_string(),
        entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
    ]
}

#[async_trait]
impl MoodStore for SheetsStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sheets
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client.get_values(&format!("{}!A1:A1", USERS_SHEET)).await?;
        Ok(())
    }

    async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.all_users().await?.into_iter().find(|u| u.username == username))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .all_users()
            .await?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn list_users(&self, role: Option<Role>) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .all_users()
            .await?
            .into_iter()
            .filter(|u| role.is_none() || u.role == role)
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
        let _guard = self.write_lock.lock().await;
        let existing = self.all_users().await?;
        if existing
            .iter()
            .any(|u| u.username == user.username || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict(format!(
                "Username {} or email {} is already in use",
                user.username, user.email
            )));
        }

        let created = User::from(user.clone());
        self.client.append_row(USERS_RANGE, user_to_row(&created)).await?;
        tracing::info!(username = %created.username, "User appended to sheet");
        Ok(created)
    }

    async fn update_user(&self, username: &str, changes: &UserChanges) -> StoreResult<User> {
        let _guard = self.write_lock.lock().await;
        let rows = self.user_rows().await?;

        if let Some(email) = &changes.email {
            let taken = data_rows(&rows)
                .filter_map(|(_, row)| parse_user_row(row))
                .any(|u| u.username != username && u.email.eq_ignore_ascii_case(email));
            if taken {
                return Err(StoreError::Conflict(format!("Email {} is already in use", email)));
            }
        }

        let (row_number, mut user) = data_rows(&rows)
            .find_map(|(n, row)| parse_user_row(row).filter(|u| u.username == username).map(|u| (n, u)))
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", username)))?;

        changes.apply(&mut user);
        self.client
            .update_range(
                &format!("{}!A{}:F{}", USERS_SHEET, row_number, row_number),
                vec![user_to_row(&user)],
            )
            .await?;
        Ok(user)
    }

    async fn upsert_mood_entry(&self, checkin: &CheckIn) -> StoreResult<MoodEntry> {
        let entry = MoodEntry::from(checkin.clone());
        let row = entry_to_row(&entry);

        let _guard = self.write_lock.lock().await;
        let rows = self.entry_rows().await?;
        let date = checkin.date.format(DATE_FORMAT).to_string();
        let existing = data_rows(&rows)
            .find(|(_, r)| cell(r, 0) == checkin.username && cell(r, 1) == date)
            .map(|(n, _)| n);

        match existing {
            Some(n) => {
                self.client
                    .update_range(&format!("{}!A{}:E{}", ENTRIES_SHEET, n, n), vec![row])
                    .await?
            }
            None => self.client.append_row(ENTRIES_RANGE, row).await?,
        }
        Ok(entry)
    }

    async fn list_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<MoodEntry>> {
        let rows = self.entry_rows().await?;
        let entries = data_rows(&rows).filter_map(|(n, row)| match parse_entry_row(row) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(row = n, error = %e, "Skipping unreadable MoodEntries row");
                None
            }
        });
        Ok(filter.apply(entries))
    }
}
