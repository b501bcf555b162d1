//! Tabular export of mood entries, shared by the CSV download and the
//! spreadsheet sync.

use std::collections::HashMap;

use crate::models::{MoodEntry, User, DATE_FORMAT, TIMESTAMP_FORMAT};

/// Columns after the student column.
const ENTRY_COLUMNS: [&str; 4] = ["Date", "Mood", "Comment", "Timestamp"];

pub const EXPORT_STUDENT_HEADER: &str = "Student Name";

pub fn header_row(student_header: &str) -> Vec<String> {
    std::iter::once(student_header)
        .chain(ENTRY_COLUMNS)
        .map(str::to_string)
        .collect()
}

/// Display names keyed by username.
pub fn shown_names(users: &[User]) -> HashMap<String, String> {
    users
        .iter()
        .map(|u| (u.username.clone(), u.shown_name().to_string()))
        .collect()
}

pub fn entry_row(entry: &MoodEntry, names: &HashMap<String, String>) -> Vec<String> {
    let student = names
        .get(&entry.username)
        .cloned()
        .unwrap_or_else(|| entry.username.clone());

    vec![
        student,
        entry.date.format(DATE_FORMAT).to_string(),
        entry.mood.as_str().to_string(),
        entry.comment_or_empty().to_string(),
        entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
    ]
}

/// Header followed by one row per entry, in the given order.
pub fn export_rows(student_header: &str, entries: &[MoodEntry], users: &[User]) -> Vec<Vec<String>> {
    let names = shown_names(users);
    std::iter::once(header_row(student_header))
        .chain(entries.iter().map(|e| entry_row(e, &names)))
        .collect()
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn render_csv(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        let line = row.iter().map(|cell| csv_quote(cell)).collect::<Vec<_>>().join(",");
        out.push_str(&line);
        out.push_str("\r\n");
    }
    out
}
