use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MoodStore, StoreBackend, StoreError, StoreResult};
use crate::models::{CheckIn, EntryFilter, MoodEntry, NewUser, Role, User, UserChanges};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    entries: Vec<MoodEntry>,
}

/// In-process store for tests and local demos. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &[User], email: &str, except: Option<&str>) -> bool {
    users
        .iter()
        .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.username.as_str()) != except)
}

#[async_trait]
impl MoodStore for MemoryStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self, role: Option<Role>) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .iter()
            .filter(|u| role.is_none() || u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!("Username {} is taken", user.username)));
        }
        if email_taken(&inner.users, &user.email, None) {
            return Err(StoreError::Conflict(format!("Email {} is already in use", user.email)));
        }
        let created = User::from(user.clone());
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, username: &str, changes: &UserChanges) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if let Some(email) = &changes.email {
            if email_taken(&inner.users, email, Some(username)) {
                return Err(StoreError::Conflict(format!("Email {} is already in use", email)));
            }
        }
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", username)))?;
        changes.apply(user);
        Ok(user.clone())
    }

    async fn upsert_mood_entry(&self, checkin: &CheckIn) -> StoreResult<MoodEntry> {
        let entry = MoodEntry::from(checkin.clone());
        let mut inner = self.inner.write().await;
        match inner
            .entries
            .iter_mut()
            .find(|e| e.username == checkin.username && e.date == checkin.date)
        {
            Some(existing) => *existing = entry.clone(),
            None => inner.entries.push(entry.clone()),
        }
        Ok(entry)
    }

    async fn list_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<MoodEntry>> {
        let inner = self.inner.read().await;
        Ok(filter.apply(inner.entries.iter().cloned()))
    }
}
