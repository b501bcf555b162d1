use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::{Days, NaiveDate};
use std::sync::Arc;

use super::today;
use crate::{
    aggregation::{
        distinct_users, engagement_percent, flag_low_moods, summarize_day, AggregationEngine, LatestMood, MoodTally,
    },
    auth::{hash_password, issue_session, session_cookie},
    export::shown_names,
    extractors::Teacher,
    models::{
        DashboardPage, EntryFilter, EntryView, MoodEntry, ResultRow, ResultsPage, Role, SettingsForm, SettingsPage,
        StudentRow, StudentsPage, User, UserChanges, LOW_MOODS, NO_DATA_EMOJI,
    },
    store::StoreError,
    AppError, AppResult, AppState,
};

const WEEK: Days = Days::new(7);
const NO_DATA: &str = "No data";

pub const EMAIL_TAKEN: &str = "That email is already used by another account";
pub const INVALID_EMAIL: &str = "Please enter a valid email address";

fn days_before(n: Days) -> AppResult<NaiveDate> {
    today()
        .checked_sub_days(n)
        .ok_or_else(|| AppError::Internal("Date out of range".to_string()))
}

/// GET /teacher/dashboard/
#[utoipa::path(
    get,
    path = "/teacher/dashboard/",
    responses(
        (status = 200, description = "Today's class statistics", body = DashboardPage),
        (status = 303, description = "Not signed in as a teacher")
    ),
    tag = "teacher"
)]
pub async fn dashboard(_teacher: Teacher, State(state): State<Arc<AppState>>) -> AppResult<Json<DashboardPage>> {
    let day = today();
    let engine = AggregationEngine::new(state.store.as_ref());

    let users = state.store.list_users(None).await?;
    let todays = state.store.list_entries(&EntryFilter::on_day(day)).await?;
    let weekly_moods = engine.weekly_mood_distribution(days_before(WEEK)?).await?;

    Ok(Json(dashboard_page(day, &todays, &users, weekly_moods)))
}

/// Every "today" figure comes from the same read of the day's entries.
fn dashboard_page(
    day: NaiveDate,
    todays: &[MoodEntry],
    users: &[User],
    weekly_moods: Vec<MoodTally>,
) -> DashboardPage {
    let total_students = users.iter().filter(|u| u.role == Some(Role::Student)).count();
    let checked_in_today = distinct_users(todays);
    let low_mood_entries = flag_low_moods(todays, users, &LOW_MOODS);

    DashboardPage {
        total_students,
        checked_in_today,
        engagement_percent: engagement_percent(checked_in_today, total_students),
        summary: summarize_day(day, todays),
        low_mood_count: low_mood_entries.len(),
        low_mood_entries,
        weekly_moods,
    }
}

/// GET /teacher/results/
#[utoipa::path(
    get,
    path = "/teacher/results/",
    responses(
        (status = 200, description = "Entries from the last seven days, newest first", body = ResultsPage),
        (status = 303, description = "Not signed in as a teacher")
    ),
    tag = "teacher"
)]
pub async fn results(_teacher: Teacher, State(state): State<Arc<AppState>>) -> AppResult<Json<ResultsPage>> {
    let since = days_before(WEEK)?;
    let entries = state.store.list_entries(&EntryFilter::since(since)).await?;
    let names = shown_names(&state.store.list_users(None).await?);

    let entries = entries
        .iter()
        .map(|e| ResultRow {
            username: e.username.clone(),
            name: names.get(&e.username).cloned().unwrap_or_else(|| e.username.clone()),
            entry: EntryView::from(e),
        })
        .collect();

    Ok(Json(ResultsPage { since, entries }))
}

/// GET /teacher/students/
#[utoipa::path(
    get,
    path = "/teacher/students/",
    responses(
        (status = 200, description = "Each student's most recent mood", body = StudentsPage),
        (status = 303, description = "Not signed in as a teacher")
    ),
    tag = "teacher"
)]
pub async fn students(_teacher: Teacher, State(state): State<Arc<AppState>>) -> AppResult<Json<StudentsPage>> {
    let engine = AggregationEngine::new(state.store.as_ref());
    let mut students = Vec::new();

    for student in state.store.list_users(Some(Role::Student)).await? {
        let row = match engine.latest_mood_for_user(&student.username).await? {
            LatestMood::Entry(entry) => StudentRow {
                username: student.username.clone(),
                name: student.shown_name().to_string(),
                class_group: student.class_group.clone(),
                latest_mood: entry.mood.as_str().to_string(),
                emoji: entry.emoji().to_string(),
                date: Some(entry.date),
            },
            LatestMood::NoData => StudentRow {
                username: student.username.clone(),
                name: student.shown_name().to_string(),
                class_group: student.class_group.clone(),
                latest_mood: NO_DATA.to_string(),
                emoji: NO_DATA_EMOJI.to_string(),
                date: None,
            },
        };
        students.push(row);
    }

    Ok(Json(StudentsPage { students }))
}

/// GET /teacher/settings/
#[utoipa::path(
    get,
    path = "/teacher/settings/",
    responses(
        (status = 200, description = "Current profile", body = SettingsPage),
        (status = 303, description = "Not signed in as a teacher")
    ),
    tag = "teacher"
)]
pub async fn settings_page(teacher: Teacher) -> Json<SettingsPage> {
    let user = teacher.user();
    Json(SettingsPage {
        success: false,
        error: None,
        display_name: user.display_name.clone(),
        email: user.email.clone(),
    })
}

fn filled(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// POST /teacher/settings/
///
/// Blank fields keep their current value. The session cookie is reissued so
/// that a new display name shows up immediately.
#[utoipa::path(
    post,
    path = "/teacher/settings/",
    request_body(content = SettingsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Profile updated, or form error", body = SettingsPage),
        (status = 303, description = "Not signed in as a teacher")
    ),
    tag = "teacher"
)]
pub async fn update_settings(
    teacher: Teacher,
    State(state): State<Arc<AppState>>,
    Form(form): Form<SettingsForm>,
) -> AppResult<Response> {
    let current = teacher.user();
    let rejected = |message: &str| {
        Json(SettingsPage {
            success: false,
            error: Some(message.to_string()),
            display_name: current.display_name.clone(),
            email: current.email.clone(),
        })
        .into_response()
    };

    let email = filled(&form.email);
    if email.as_deref().is_some_and(|e| !e.contains('@')) {
        return Ok(rejected(INVALID_EMAIL));
    }

    let password_hash = match filled(&form.new_password) {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    let changes = UserChanges {
        display_name: filled(&form.first_name),
        email,
        password_hash,
    };

    let user = match state.store.update_user(teacher.username(), &changes).await {
        Ok(user) => user,
        Err(StoreError::Conflict(msg)) => {
            tracing::info!(username = %teacher.username(), "Settings rejected: {}", msg);
            return Ok(rejected(EMAIL_TAKEN));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        username = %user.username,
        name_changed = changes.display_name.is_some(),
        email_changed = changes.email.is_some(),
        password_changed = changes.password_hash.is_some(),
        "Teacher settings updated"
    );

    let token = issue_session(
        &user.username,
        teacher.session.role,
        &user.display_name,
        state.config.session_ttl_secs,
        state.config.session_secret.as_bytes(),
    )?;
    let cookie = session_cookie(&token, state.config.session_ttl_secs, state.config.cookie_secure);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SettingsPage {
            success: true,
            error: None,
            display_name: user.display_name,
            email: user.email,
        }),
    )
        .into_response())
}
