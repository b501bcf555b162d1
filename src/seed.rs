//! Startup provisioning of accounts from a JSON file.

use serde::Deserialize;
use std::path::Path;

use crate::{
    auth::hash_password,
    models::{NewUser, Role},
    store::{MoodStore, StoreError},
    AppError, AppResult,
};

/// One account in the seed file. Passwords are given in plain text and
/// hashed before they reach the store.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub class_group: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

pub fn parse_seed_file(contents: &str) -> AppResult<Vec<SeedUser>> {
    serde_json::from_str(contents).map_err(|e| AppError::BadRequest(format!("Invalid seed file: {}", e)))
}

pub async fn load_seed_file(path: &Path) -> AppResult<Vec<SeedUser>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", path.display(), e)))?;
    parse_seed_file(&contents)
}

/// Creates every account whose username is not already taken.
pub async fn seed_users(store: &dyn MoodStore, users: Vec<SeedUser>) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    for seed in users {
        if store.get_user(&seed.username).await?.is_some() {
            tracing::debug!(username = %seed.username, "Seed user exists, skipping");
            report.skipped += 1;
            continue;
        }

        let new_user = NewUser {
            password_hash: hash_password(&seed.password)?,
            username: seed.username,
            email: seed.email.trim().to_string(),
            role: seed.role,
            display_name: seed.display_name,
            class_group: seed.class_group,
        };

        match store.create_user(&new_user).await {
            Ok(user) => {
                tracing::info!(username = %user.username, role = ?user.role, "Seeded user");
                report.created += 1;
            }
            Err(StoreError::Conflict(msg)) => {
                tracing::warn!(username = %new_user.username, "Seed user skipped: {}", msg);
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}
