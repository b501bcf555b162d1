// Router-level tests against the in-memory store.
// Run with: cargo test --test dashboard_flow

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Days, Local, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use wellbeing_dashboard::{
    aggregation::AggregationEngine,
    auth::{hash_password, issue_session, SESSION_COOKIE},
    extractors::PROFILE_MISSING,
    handlers::setup_metrics_recorder,
    models::{CheckIn, EntryFilter, Mood, NewUser, Role},
    startup::build_router,
    store::{MemoryStore, MoodStore},
    AppConfig, AppState,
};

const SECRET: &str = "integration-test-secret";

async fn add_user(store: &dyn MoodStore, username: &str, role: Option<Role>, display_name: &str) {
    store
        .create_user(&NewUser {
            username: username.to_string(),
            email: format!("{}@school.test", username),
            password_hash: hash_password("secret").unwrap(),
            role,
            display_name: display_name.to_string(),
            class_group: Some("7B".to_string()),
        })
        .await
        .unwrap();
}

/// One student "amy", one teacher "smith" and a profile-less "orphan".
async fn create_test_app() -> (Router, Arc<AppState>) {
    let store = MemoryStore::new();
    add_user(&store, "amy", Some(Role::Student), "Amy Pond").await;
    add_user(&store, "smith", Some(Role::Teacher), "Mr Smith").await;
    add_user(&store, "orphan", None, "").await;

    let state = Arc::new(AppState {
        store: Arc::new(store),
        sheets: None,
        config: AppConfig::in_memory(SECRET),
        metrics: Arc::new(setup_metrics_recorder().unwrap()),
    });

    (build_router(state.clone()), state)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

/// `name=value` part of the Set-Cookie header.
fn session_cookie(response: &Response) -> String {
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

async fn login(app: &Router, username: &str, user_type: &str) -> (Response, String) {
    let body = format!("email={}%40school.test&password=secret&user_type={}", username, user_type);
    let response = send(app, post_form("/", &body, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER, "login for {} failed", username);
    let cookie = session_cookie(&response);
    (response, cookie)
}

#[tokio::test]
async fn checkin_shows_up_on_teacher_dashboard() {
    let (app, state) = create_test_app().await;

    let (response, student) = login(&app, "amy", "student").await;
    assert_eq!(location(&response), "/student/checkin/");

    let page = body_json(send(&app, get("/student/checkin/", Some(&student))).await).await;
    assert_eq!(page["already_checked"], false);
    assert_eq!(page["moods"].as_array().unwrap().len(), 12);

    let response = send(&app, post_form("/student/checkin/", "mood=happy&comment=ok", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["success"], true);

    let today = Local::now().date_naive();
    let engine = AggregationEngine::new(state.store.as_ref());
    let summary = engine.daily_summary(today).await.unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.count(Mood::Happy), 1);
    assert_eq!(summary.percentage(Mood::Happy), 100.0);
    assert_eq!(engine.engagement_rate(today, 1).await.unwrap(), 100);

    let (_, teacher) = login(&app, "smith", "teacher").await;
    let dashboard = body_json(send(&app, get("/teacher/dashboard/", Some(&teacher))).await).await;
    assert_eq!(dashboard["total_students"], 1);
    assert_eq!(dashboard["checked_in_today"], 1);
    assert_eq!(dashboard["engagement_percent"], 100);
    assert_eq!(dashboard["summary"]["counts"][0]["mood"], "happy");
    assert_eq!(dashboard["summary"]["counts"][0]["count"], 1);
    assert_eq!(dashboard["low_mood_count"], 0);
    assert_eq!(dashboard["weekly_moods"][0]["mood"], "happy");
}

#[tokio::test]
async fn second_checkin_replaces_the_first() {
    let (app, state) = create_test_app().await;
    let (_, student) = login(&app, "amy", "student").await;

    send(&app, post_form("/student/checkin/", "mood=happy&comment=first", Some(&student))).await;
    send(&app, post_form("/student/checkin/", "mood=sad&comment=second", Some(&student))).await;

    let today = Local::now().date_naive();
    let entries = state
        .store
        .list_entries(&EntryFilter::for_user("amy").on(today))
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mood, Mood::Sad);
    assert_eq!(entries[0].comment.as_deref(), Some("second"));

    let page = body_json(send(&app, get("/student/checkin/", Some(&student))).await).await;
    assert_eq!(page["already_checked"], true);

    let (_, teacher) = login(&app, "smith", "teacher").await;
    let dashboard = body_json(send(&app, get("/teacher/dashboard/", Some(&teacher))).await).await;
    assert_eq!(dashboard["low_mood_count"], 1);
    assert_eq!(dashboard["low_mood_entries"][0]["name"], "Amy Pond");
    assert_eq!(dashboard["low_mood_entries"][0]["comment"], "second");
}

#[tokio::test]
async fn unknown_mood_is_a_form_error() {
    let (app, state) = create_test_app().await;
    let (_, student) = login(&app, "amy", "student").await;

    let response = send(&app, post_form("/student/checkin/", "mood=elated", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["success"], false);
    assert!(page["error"].is_string());

    let entries = state.store.list_entries(&EntryFilter::for_user("amy")).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn unauthenticated_requests_go_to_login() {
    let (app, _) = create_test_app().await;

    for uri in ["/student/checkin/", "/student/history/", "/teacher/dashboard/", "/teacher/download-csv/"] {
        let response = send(&app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/");
    }

    let forged = format!("{}=bogus.token", SESSION_COOKIE);
    let response = send(&app, get("/teacher/dashboard/", Some(&forged))).await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn role_mismatch_redirects_to_own_landing_page() {
    let (app, _) = create_test_app().await;

    let (_, student) = login(&app, "amy", "student").await;
    let response = send(&app, get("/teacher/results/", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/student/checkin/");

    let (_, teacher) = login(&app, "smith", "teacher").await;
    let response = send(&app, get("/student/history/", Some(&teacher))).await;
    assert_eq!(location(&response), "/teacher/dashboard/");
}

#[tokio::test]
async fn login_uses_the_account_role_over_the_form() {
    let (app, _) = create_test_app().await;

    let (response, student) = login(&app, "amy", "teacher").await;
    assert_eq!(location(&response), "/student/checkin/");

    let response = send(&app, get("/student/checkin/", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_form_errors() {
    let (app, _) = create_test_app().await;

    let cases = [
        ("email=not-an-email&password=secret&user_type=student", "Please enter a valid email address"),
        ("email=nobody%40school.test&password=secret&user_type=student", "No account found with this email"),
        ("email=amy%40school.test&password=wrong&user_type=student", "Invalid password"),
        ("email=orphan%40school.test&password=secret&user_type=student", PROFILE_MISSING),
    ];

    for (body, expected) in cases {
        let response = send(&app, post_form("/", body, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_json(response).await["error"], expected);
    }
}

#[tokio::test]
async fn profile_less_session_is_forbidden() {
    let (app, _) = create_test_app().await;

    let token = issue_session("orphan", Role::Student, "", 3600, SECRET.as_bytes()).unwrap();
    let cookie = format!("{}={}", SESSION_COOKIE, token);

    let response = send(&app, get("/student/checkin/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], PROFILE_MISSING);
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let (app, _) = create_test_app().await;

    let response = send(&app, get("/logout/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn history_chart_runs_oldest_first() {
    let (app, state) = create_test_app().await;
    let today = Local::now().date_naive();

    for (days_ago, mood) in [(2, Mood::Calm), (1, Mood::Numb), (0, Mood::Ecstatic)] {
        state
            .store
            .upsert_mood_entry(&CheckIn {
                username: "amy".to_string(),
                date: today - Days::new(days_ago),
                mood,
                comment: None,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
    }

    let (_, student) = login(&app, "amy", "student").await;
    let history = body_json(send(&app, get("/student/history/", Some(&student))).await).await;

    assert_eq!(history["entries"][0]["mood"], "ecstatic");
    assert_eq!(history["chart_data"][0]["mood"], "calm");
    assert_eq!(history["chart_data"][2]["mood"], "ecstatic");
    assert_eq!(
        history["chart_data"][2]["date"],
        today.format("%b %d").to_string()
    );
}

#[tokio::test]
async fn results_and_students_pages() {
    let (app, state) = create_test_app().await;
    add_user(state.store.as_ref(), "rory", Some(Role::Student), "").await;
    let today = Local::now().date_naive();

    for (days_ago, mood) in [(10, Mood::Angry), (3, Mood::Worried), (0, Mood::Happy)] {
        state
            .store
            .upsert_mood_entry(&CheckIn {
                username: "amy".to_string(),
                date: today - Days::new(days_ago),
                mood,
                comment: None,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
    }

    let (_, teacher) = login(&app, "smith", "teacher").await;

    let results = body_json(send(&app, get("/teacher/results/", Some(&teacher))).await).await;
    let rows = results["entries"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["mood"], "happy");
    assert_eq!(rows[0]["name"], "Amy Pond");
    assert_eq!(rows[1]["mood"], "worried");

    let students = body_json(send(&app, get("/teacher/students/", Some(&teacher))).await).await;
    let students = students["students"].as_array().unwrap();
    let amy = students.iter().find(|s| s["username"] == "amy").unwrap();
    assert_eq!(amy["latest_mood"], "happy");
    let rory = students.iter().find(|s| s["username"] == "rory").unwrap();
    assert_eq!(rory["name"], "rory");
    assert_eq!(rory["latest_mood"], "No data");
    assert_eq!(rory["emoji"], "❓");
    assert!(rory["date"].is_null());
}

#[tokio::test]
async fn csv_export_lists_recent_entries() {
    let (app, state) = create_test_app().await;
    state
        .store
        .upsert_mood_entry(&CheckIn {
            username: "amy".to_string(),
            date: Local::now().date_naive(),
            mood: Mood::Inspired,
            comment: Some("thanks, all".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap(),
        })
        .await
        .unwrap();

    let (_, teacher) = login(&app, "smith", "teacher").await;
    let response = send(&app, get("/teacher/download-csv/", Some(&teacher))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/csv"));
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_some());

    let csv = body_text(response).await;
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Student Name,Date,Mood,Comment,Timestamp"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("Amy Pond,"));
    assert!(row.contains(",inspired,\"thanks, all\",2024-03-05 08:30:00"));
}

#[tokio::test]
async fn sync_sheet_without_credentials_reports_error() {
    let (app, _) = create_test_app().await;
    let (_, teacher) = login(&app, "smith", "teacher").await;

    let response = send(&app, get("/teacher/sync-sheet/", Some(&teacher))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.starts_with("Error updating sheet: Credentials error"));
}

#[tokio::test]
async fn settings_update_and_email_collision() {
    let (app, state) = create_test_app().await;
    let (_, teacher) = login(&app, "smith", "teacher").await;

    let page = body_json(send(&app, get("/teacher/settings/", Some(&teacher))).await).await;
    assert_eq!(page["display_name"], "Mr Smith");

    let response = send(
        &app,
        post_form("/teacher/settings/", "first_name=Ms+Jones&email=&new_password=", Some(&teacher)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    let page = body_json(response).await;
    assert_eq!(page["success"], true);
    assert_eq!(page["display_name"], "Ms Jones");
    assert_eq!(page["email"], "smith@school.test");

    let response = send(
        &app,
        post_form("/teacher/settings/", "email=amy%40school.test", Some(&teacher)),
    )
    .await;
    let page = body_json(response).await;
    assert_eq!(page["success"], false);
    assert!(page["error"].is_string());

    let smith = state.store.get_user("smith").await.unwrap().unwrap();
    assert_eq!(smith.email, "smith@school.test");
    assert_eq!(smith.display_name, "Ms Jones");
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let (app, _) = create_test_app().await;

    let response = send(&app, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    let health = body_json(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["store"], "memory");

    let response = send(&app, get("/metrics", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
