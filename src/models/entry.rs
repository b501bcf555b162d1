use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::mood::{Mood, MoodLabel};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One student's check-in for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MoodEntry {
    pub username: String,
    pub date: NaiveDate,
    #[schema(value_type = String)]
    pub mood: MoodLabel,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl MoodEntry {
    pub fn emoji(&self) -> &'static str {
        self.mood.emoji()
    }

    pub fn comment_or_empty(&self) -> &str {
        self.comment.as_deref().unwrap_or("")
    }
}

/// A check-in submission to be upserted for (username, date).
#[derive(Debug, Clone)]
pub struct CheckIn {
    pub username: String,
    pub date: NaiveDate,
    pub mood: Mood,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<CheckIn> for MoodEntry {
    fn from(c: CheckIn) -> Self {
        MoodEntry {
            username: c.username,
            date: c.date,
            mood: c.mood.into(),
            comment: c.comment,
            timestamp: c.timestamp,
        }
    }
}

/// Selection over the mood log. Results are always ordered newest first
/// (date descending, then timestamp descending) before `limit` applies.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub username: Option<String>,
    pub on: Option<NaiveDate>,
    pub since: Option<NaiveDate>,
    pub moods: Option<Vec<Mood>>,
    pub limit: Option<usize>,
}

impl EntryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    pub fn on_day(day: NaiveDate) -> Self {
        Self {
            on: Some(day),
            ..Self::default()
        }
    }

    pub fn since(day: NaiveDate) -> Self {
        Self {
            since: Some(day),
            ..Self::default()
        }
    }

    pub fn with_moods(mut self, moods: &[Mood]) -> Self {
        self.moods = Some(moods.to_vec());
        self
    }

    pub fn on(mut self, day: NaiveDate) -> Self {
        self.on = Some(day);
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn matches(&self, entry: &MoodEntry) -> bool {
        if let Some(username) = &self.username {
            if &entry.username != username {
                return false;
            }
        }
        if let Some(day) = self.on {
            if entry.date != day {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.date < since {
                return false;
            }
        }
        if let Some(moods) = &self.moods {
            if !entry.mood.known().is_some_and(|m| moods.contains(&m)) {
                return false;
            }
        }
        true
    }

    /// Filters, sorts newest first and truncates an in-memory list of entries.
    pub fn apply(&self, entries: impl IntoIterator<Item = MoodEntry>) -> Vec<MoodEntry> {
        let mut selected: Vec<MoodEntry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        sort_newest_first(&mut selected);
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

pub fn sort_newest_first(entries: &mut [MoodEntry]) {
    entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.timestamp.cmp(&a.timestamp)));
}
