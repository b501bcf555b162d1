//! Read-only statistics over the mood log for the teacher views.
//!
//! The pure functions in this module work on slices of entries so they can be
//! tested without a store; [`AggregationEngine`] wires them to a [`MoodStore`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;

use crate::models::{EntryFilter, Mood, MoodEntry, MoodLabel, User};
use crate::store::{MoodStore, StoreResult};

/// How many moods the weekly distribution keeps.
pub const WEEKLY_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MoodCount {
    #[schema(value_type = String)]
    pub mood: MoodLabel,
    pub emoji: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailySummary {
    pub day: NaiveDate,
    pub total: usize,
    /// Only moods with at least one entry, in mood-table order. Labels outside
    /// the table follow in the order they were first seen.
    pub counts: Vec<MoodCount>,
}

impl DailySummary {
    pub fn count(&self, mood: Mood) -> usize {
        self.counts.iter().find(|c| c.mood == mood).map_or(0, |c| c.count)
    }

    pub fn percentage(&self, mood: Mood) -> f64 {
        self.counts.iter().find(|c| c.mood == mood).map_or(0.0, |c| c.percentage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MoodTally {
    #[schema(value_type = String)]
    pub mood: MoodLabel,
    pub emoji: String,
    pub count: usize,
}

/// A low-mood check-in with the student's identity attached.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FlaggedEntry {
    pub username: String,
    pub name: String,
    #[schema(value_type = String)]
    pub mood: MoodLabel,
    pub emoji: String,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LatestMood {
    NoData,
    Entry(MoodEntry),
}

impl LatestMood {
    pub fn entry(&self) -> Option<&MoodEntry> {
        match self {
            LatestMood::NoData => None,
            LatestMood::Entry(entry) => Some(entry),
        }
    }
}

/// `count / total * 100` rounded half to even to one decimal; 0 when `total` is 0.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 1000.0 / total as f64).round_ties_even() / 10.0
}

/// Whole-number percent of students who checked in; 0 when nobody is enrolled.
pub fn engagement_percent(checked_in: usize, total_students: usize) -> u32 {
    if total_students == 0 {
        return 0;
    }
    (checked_in as f64 * 100.0 / total_students as f64).round_ties_even() as u32
}

pub fn distinct_users(entries: &[MoodEntry]) -> usize {
    entries.iter().map(|e| e.username.as_str()).collect::<HashSet<_>>().len()
}

pub fn summarize_day(day: NaiveDate, entries: &[MoodEntry]) -> DailySummary {
    let mut by_mood: HashMap<&MoodLabel, usize> = HashMap::new();
    let mut others: Vec<&MoodLabel> = Vec::new();
    for entry in entries.iter().filter(|e| e.date == day) {
        let count = by_mood.entry(&entry.mood).or_default();
        if *count == 0 && entry.mood.known().is_none() {
            others.push(&entry.mood);
        }
        *count += 1;
    }
    let total: usize = by_mood.values().sum();

    let known: Vec<MoodLabel> = Mood::ALL.iter().map(|&m| MoodLabel::from(m)).collect();
    let counts = known
        .iter()
        .chain(others)
        .filter_map(|label| {
            by_mood.get(label).map(|&count| MoodCount {
                mood: label.clone(),
                emoji: label.emoji().to_string(),
                count,
                percentage: percentage(count, total),
            })
        })
        .collect();

    DailySummary { day, total, counts }
}

/// Counts per mood, descending, truncated to `n`.
///
/// Equal counts keep the order in which the moods first appear in `entries`.
pub fn top_moods(entries: &[MoodEntry], n: usize) -> Vec<MoodTally> {
    let mut tallies: Vec<MoodTally> = Vec::new();
    for entry in entries {
        match tallies.iter_mut().find(|t| t.mood == entry.mood) {
            Some(tally) => tally.count += 1,
            None => tallies.push(MoodTally {
                mood: entry.mood.clone(),
                emoji: entry.mood.emoji().to_string(),
                count: 1,
            }),
        }
    }
    // sort_by is stable, so ties stay in first-seen order
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies.truncate(n);
    tallies
}

/// Entry with the greatest date; equal dates fall back to the later timestamp.
pub fn latest_entry<'a>(entries: impl IntoIterator<Item = &'a MoodEntry>) -> LatestMood {
    entries
        .into_iter()
        .max_by(|a, b| a.date.cmp(&b.date).then(a.timestamp.cmp(&b.timestamp)))
        .cloned()
        .map_or(LatestMood::NoData, LatestMood::Entry)
}

/// Keeps the entries whose mood is in `low_moods` and attaches each student's
/// shown name, falling back to the username.
pub fn flag_low_moods(entries: &[MoodEntry], users: &[User], low_moods: &[Mood]) -> Vec<FlaggedEntry> {
    let names: HashMap<&str, &str> = users
        .iter()
        .map(|u| (u.username.as_str(), u.shown_name()))
        .collect();

    entries
        .iter()
        .filter(|e| e.mood.known().is_some_and(|m| low_moods.contains(&m)))
        .map(|e| FlaggedEntry {
            username: e.username.clone(),
            name: names.get(e.username.as_str()).copied().unwrap_or(e.username.as_str()).to_string(),
            mood: e.mood.clone(),
            emoji: e.mood.emoji().to_string(),
            comment: e.comment.clone(),
            timestamp: e.timestamp,
        })
        .collect()
}

/// Store-backed statistics. Never writes.
pub struct AggregationEngine<'a> {
    store: &'a dyn MoodStore,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(store: &'a dyn MoodStore) -> Self {
        Self { store }
    }

    pub async fn daily_summary(&self, day: NaiveDate) -> StoreResult<DailySummary> {
        let entries = self.store.list_entries(&EntryFilter::on_day(day)).await?;
        Ok(summarize_day(day, &entries))
    }

    pub async fn engagement_rate(&self, day: NaiveDate, total_student_count: usize) -> StoreResult<u32> {
        if total_student_count == 0 {
            return Ok(0);
        }
        let entries = self.store.list_entries(&EntryFilter::on_day(day)).await?;
        Ok(engagement_percent(distinct_users(&entries), total_student_count))
    }

    pub async fn low_mood_entries(&self, day: NaiveDate, low_moods: &[Mood]) -> StoreResult<Vec<FlaggedEntry>> {
        let entries = self
            .store
            .list_entries(&EntryFilter::on_day(day).with_moods(low_moods))
            .await?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let users = self.store.list_users(None).await?;
        Ok(flag_low_moods(&entries, &users, low_moods))
    }

    pub async fn weekly_mood_distribution(&self, since_day: NaiveDate) -> StoreResult<Vec<MoodTally>> {
        let mut entries = self.store.list_entries(&EntryFilter::since(since_day)).await?;
        // the store hands back newest first; tally in submission order
        entries.reverse();
        Ok(top_moods(&entries, WEEKLY_TOP_N))
    }

    pub async fn latest_mood_for_user(&self, username: &str) -> StoreResult<LatestMood> {
        let entries = self.store.list_entries(&EntryFilter::for_user(username).limit(1)).await?;
        Ok(latest_entry(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckIn, NewUser, Role};
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn entry(user: &str, d: u32, mood: Mood, minute: u32) -> MoodEntry {
        MoodEntry {
            username: user.to_string(),
            date: day(d),
            mood: mood.into(),
            comment: None,
            timestamp: Utc.with_ymd_and_hms(2024, 5, d, 8, minute, 0).unwrap(),
        }
    }

    #[test]
    fn empty_day_has_no_counts_and_zero_percent() {
        let summary = summarize_day(day(1), &[]);
        assert_eq!(summary.total, 0);
        assert!(summary.counts.is_empty());
        assert_eq!(summary.percentage(Mood::Happy), 0.0);
        assert_eq!(summary.count(Mood::Sad), 0);
    }

    #[test]
    fn one_in_three_is_thirty_three_point_three() {
        let entries = vec![
            entry("a", 1, Mood::Happy, 0),
            entry("b", 1, Mood::Sad, 1),
            entry("c", 1, Mood::Sad, 2),
        ];
        let summary = summarize_day(day(1), &entries);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.percentage(Mood::Happy), 33.3);
        assert_eq!(summary.percentage(Mood::Sad), 66.7);
    }

    #[test]
    fn summary_ignores_other_days() {
        let entries = vec![entry("a", 1, Mood::Calm, 0), entry("a", 2, Mood::Good, 0)];
        let summary = summarize_day(day(2), &entries);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.count(Mood::Good), 1);
        assert_eq!(summary.percentage(Mood::Good), 100.0);
    }

    #[test]
    fn engagement_guards_zero_students() {
        assert_eq!(engagement_percent(0, 0), 0);
        assert_eq!(engagement_percent(3, 0), 0);
        assert_eq!(engagement_percent(1, 1), 100);
        assert_eq!(engagement_percent(1, 3), 33);
        assert_eq!(engagement_percent(2, 3), 67);
    }

    #[test]
    fn halves_round_to_even() {
        assert_eq!(engagement_percent(1, 8), 12);
        assert_eq!(engagement_percent(3, 8), 38);
        assert_eq!(percentage(1, 16), 6.2);
        assert_eq!(percentage(3, 16), 18.8);
    }

    #[test]
    fn unknown_labels_are_counted_after_table_moods() {
        let mut bored = entry("b", 1, Mood::Happy, 1);
        bored.mood = MoodLabel::parse("bored");
        let entries = vec![entry("a", 1, Mood::Happy, 0), bored];

        let summary = summarize_day(day(1), &entries);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.percentage(Mood::Happy), 50.0);
        assert_eq!(summary.counts.len(), 2);
        assert_eq!(summary.counts[1].mood.as_str(), "bored");
        assert_eq!(summary.counts[1].emoji, crate::models::DEFAULT_EMOJI);
        assert_eq!(summary.counts[1].percentage, 50.0);
    }

    #[test]
    fn top_moods_truncates_and_keeps_first_seen_order_on_ties() {
        let entries = vec![
            entry("a", 1, Mood::Calm, 0),
            entry("b", 1, Mood::Sad, 1),
            entry("c", 1, Mood::Good, 2),
            entry("d", 1, Mood::Numb, 3),
            entry("e", 2, Mood::Numb, 0),
        ];
        let top = top_moods(&entries, 3);
        let moods: Vec<Option<Mood>> = top.iter().map(|t| t.mood.known()).collect();
        assert_eq!(moods, vec![Some(Mood::Numb), Some(Mood::Calm), Some(Mood::Sad)]);
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn latest_entry_prefers_date_then_timestamp() {
        assert_eq!(latest_entry(&Vec::<MoodEntry>::new()), LatestMood::NoData);

        let entries = vec![
            entry("a", 3, Mood::Sad, 5),
            entry("a", 3, Mood::Happy, 40),
            entry("a", 1, Mood::Angry, 59),
        ];
        let latest = latest_entry(&entries);
        assert_eq!(latest.entry().and_then(|e| e.mood.known()), Some(Mood::Happy));
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (username, name) in [("amy", "Amy Pond"), ("rory", "")] {
            store
                .create_user(&NewUser {
                    username: username.to_string(),
                    email: format!("{}@school.test", username),
                    password_hash: String::new(),
                    role: Some(Role::Student),
                    display_name: name.to_string(),
                    class_group: None,
                })
                .await
                .unwrap();
        }
        store
    }

    fn checkin(user: &str, d: u32, mood: Mood, minute: u32) -> CheckIn {
        CheckIn {
            username: user.to_string(),
            date: day(d),
            mood,
            comment: Some("note".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 5, d, 9, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn engine_flags_low_moods_with_names() {
        let store = seeded_store().await;
        store.upsert_mood_entry(&checkin("amy", 4, Mood::Stressed, 0)).await.unwrap();
        store.upsert_mood_entry(&checkin("rory", 4, Mood::Worried, 1)).await.unwrap();
        store.upsert_mood_entry(&checkin("rory", 3, Mood::Sad, 1)).await.unwrap();

        let engine = AggregationEngine::new(&store);
        let mut flagged = engine.low_mood_entries(day(4), &crate::models::LOW_MOODS).await.unwrap();
        flagged.sort_by(|a, b| a.username.cmp(&b.username));

        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].name, "Amy Pond");
        assert_eq!(flagged[1].name, "rory");
        assert_eq!(flagged[1].emoji, "😟");
    }

    #[tokio::test]
    async fn engine_engagement_counts_distinct_students() {
        let store = seeded_store().await;
        store.upsert_mood_entry(&checkin("amy", 4, Mood::Happy, 0)).await.unwrap();
        store.upsert_mood_entry(&checkin("amy", 4, Mood::Calm, 5)).await.unwrap();

        let engine = AggregationEngine::new(&store);
        assert_eq!(engine.engagement_rate(day(4), 2).await.unwrap(), 50);
        assert_eq!(engine.engagement_rate(day(4), 0).await.unwrap(), 0);
        assert_eq!(engine.engagement_rate(day(5), 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn engine_weekly_distribution_and_latest() {
        let store = seeded_store().await;
        store.upsert_mood_entry(&checkin("amy", 1, Mood::Angry, 0)).await.unwrap();
        store.upsert_mood_entry(&checkin("amy", 3, Mood::Calm, 0)).await.unwrap();
        store.upsert_mood_entry(&checkin("rory", 3, Mood::Calm, 2)).await.unwrap();
        store.upsert_mood_entry(&checkin("rory", 4, Mood::Good, 2)).await.unwrap();

        let engine = AggregationEngine::new(&store);
        let weekly = engine.weekly_mood_distribution(day(2)).await.unwrap();
        let moods: Vec<Option<Mood>> = weekly.iter().map(|t| t.mood.known()).collect();
        assert_eq!(moods, vec![Some(Mood::Calm), Some(Mood::Good)]);

        let latest = engine.latest_mood_for_user("amy").await.unwrap();
        assert_eq!(latest.entry().map(|e| e.date), Some(day(3)));
        assert_eq!(engine.latest_mood_for_user("nobody").await.unwrap(), LatestMood::NoData);
    }
}
