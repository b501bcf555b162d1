use axum::{extract::State, Form, Json};
use chrono::Utc;
use std::sync::Arc;

use super::today;
use crate::{
    extractors::Student,
    models::{ChartPoint, CheckIn, CheckinForm, CheckinPage, EntryFilter, EntryView, HistoryPage, Mood},
    AppResult, AppState,
};

const HISTORY_LIMIT: usize = 30;
const CHART_DATE_FORMAT: &str = "%b %d";

pub const INVALID_MOOD: &str = "Please choose one of the listed moods";

/// GET /student/checkin/
#[utoipa::path(
    get,
    path = "/student/checkin/",
    responses(
        (status = 200, description = "Check-in form", body = CheckinPage),
        (status = 303, description = "Not signed in as a student")
    ),
    tag = "student"
)]
pub async fn checkin_page(student: Student, State(state): State<Arc<AppState>>) -> AppResult<Json<CheckinPage>> {
    let todays = state
        .store
        .list_entries(&EntryFilter::for_user(student.username()).on(today()).limit(1))
        .await?;

    Ok(Json(CheckinPage::new(!todays.is_empty())))
}

/// POST /student/checkin/
///
/// Records today's mood. Submitting again the same day replaces the entry.
#[utoipa::path(
    post,
    path = "/student/checkin/",
    request_body(content = CheckinForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Check-in recorded, or form error", body = CheckinPage),
        (status = 303, description = "Not signed in as a student")
    ),
    tag = "student"
)]
pub async fn submit_checkin(
    student: Student,
    State(state): State<Arc<AppState>>,
    Form(form): Form<CheckinForm>,
) -> AppResult<Json<CheckinPage>> {
    let mood = match form.mood.parse::<Mood>() {
        Ok(mood) => mood,
        Err(e) => {
            tracing::debug!(username = %student.username(), error = %e, "Rejected check-in");
            let already_checked = !state
                .store
                .list_entries(&EntryFilter::for_user(student.username()).on(today()).limit(1))
                .await?
                .is_empty();
            let mut page = CheckinPage::new(already_checked);
            page.error = Some(INVALID_MOOD.to_string());
            return Ok(Json(page));
        }
    };

    let entry = state
        .store
        .upsert_mood_entry(&CheckIn {
            username: student.username().to_string(),
            date: today(),
            mood,
            comment: form.comment(),
            timestamp: Utc::now(),
        })
        .await?;

    metrics::counter!("checkins_total", "mood" => mood.as_str()).increment(1);
    tracing::info!(username = %entry.username, date = %entry.date, mood = %mood.as_str(), "Mood recorded");

    let mut page = CheckinPage::new(true);
    page.success = true;
    Ok(Json(page))
}

/// GET /student/history/
#[utoipa::path(
    get,
    path = "/student/history/",
    responses(
        (status = 200, description = "Recent entries and chart series", body = HistoryPage),
        (status = 303, description = "Not signed in as a student")
    ),
    tag = "student"
)]
pub async fn history(student: Student, State(state): State<Arc<AppState>>) -> AppResult<Json<HistoryPage>> {
    let entries = state
        .store
        .list_entries(&EntryFilter::for_user(student.username()).limit(HISTORY_LIMIT))
        .await?;

    let chart_data = entries
        .iter()
        .rev()
        .map(|e| ChartPoint {
            date: e.date.format(CHART_DATE_FORMAT).to_string(),
            mood: e.mood.clone(),
            emoji: e.emoji().to_string(),
        })
        .collect();

    Ok(Json(HistoryPage {
        entries: entries.iter().map(EntryView::from).collect(),
        chart_data,
    }))
}
