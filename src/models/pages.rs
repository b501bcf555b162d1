//! View contexts returned by the page handlers. Rendering them is the
//! presentation layer's job.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{Mood, MoodEntry, MoodLabel};
use crate::aggregation::{DailySummary, FlaggedEntry, MoodTally};

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct LoginPage {
    pub error: Option<String>,
}

impl LoginPage {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MoodOption {
    pub value: Mood,
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckinPage {
    pub already_checked: bool,
    pub success: bool,
    pub error: Option<String>,
    pub moods: Vec<MoodOption>,
}

impl CheckinPage {
    pub fn new(already_checked: bool) -> Self {
        Self {
            already_checked,
            success: false,
            error: None,
            moods: Mood::ALL
                .iter()
                .map(|m| MoodOption {
                    value: *m,
                    emoji: m.emoji().to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntryView {
    pub date: NaiveDate,
    #[schema(value_type = String)]
    pub mood: MoodLabel,
    pub emoji: String,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&MoodEntry> for EntryView {
    fn from(e: &MoodEntry) -> Self {
        Self {
            date: e.date,
            mood: e.mood.clone(),
            emoji: e.emoji().to_string(),
            comment: e.comment.clone(),
            timestamp: e.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChartPoint {
    /// Short label such as "Mar 05".
    pub date: String,
    #[schema(value_type = String)]
    pub mood: MoodLabel,
    pub emoji: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryPage {
    /// Newest first.
    pub entries: Vec<EntryView>,
    /// Oldest first, for plotting.
    pub chart_data: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardPage {
    pub total_students: usize,
    pub checked_in_today: usize,
    pub engagement_percent: u32,
    pub summary: DailySummary,
    pub low_mood_entries: Vec<FlaggedEntry>,
    pub low_mood_count: usize,
    pub weekly_moods: Vec<MoodTally>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResultRow {
    pub username: String,
    pub name: String,
    #[serde(flatten)]
    pub entry: EntryView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResultsPage {
    pub since: NaiveDate,
    pub entries: Vec<ResultRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentRow {
    pub username: String,
    pub name: String,
    pub class_group: Option<String>,
    /// Mood label, or "No data".
    pub latest_mood: String,
    pub emoji: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentsPage {
    pub students: Vec<StudentRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SettingsPage {
    pub success: bool,
    pub error: Option<String>,
    pub display_name: String,
    pub email: String,
}
