use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::Modify;
use utoipa::OpenApi;

use crate::auth::SESSION_COOKIE;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wellbeing Dashboard API",
        version = "1.0.0",
        description = "Daily mood check-ins for students and class statistics for teachers"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        // Health
        crate::handlers::health::health_check,

        // Auth
        crate::handlers::login_handler::login_page,
        crate::handlers::login_handler::login,
        crate::handlers::login_handler::logout,

        // Student
        crate::handlers::student_handler::checkin_page,
        crate::handlers::student_handler::submit_checkin,
        crate::handlers::student_handler::history,

        // Teacher
        crate::handlers::teacher_handler::dashboard,
        crate::handlers::teacher_handler::results,
        crate::handlers::teacher_handler::students,
        crate::handlers::teacher_handler::settings_page,
        crate::handlers::teacher_handler::update_settings,
        crate::handlers::export_handler::download_csv,
        crate::handlers::export_handler::sync_sheet,
    ),
    components(
        schemas(
            crate::models::Mood,
            crate::models::Role,

            // Forms
            crate::models::LoginForm,
            crate::models::CheckinForm,
            crate::models::SettingsForm,

            // Pages
            crate::models::LoginPage,
            crate::models::CheckinPage,
            crate::models::MoodOption,
            crate::models::HistoryPage,
            crate::models::EntryView,
            crate::models::ChartPoint,
            crate::models::DashboardPage,
            crate::models::ResultsPage,
            crate::models::ResultRow,
            crate::models::StudentsPage,
            crate::models::StudentRow,
            crate::models::SettingsPage,

            // Statistics
            crate::aggregation::DailySummary,
            crate::aggregation::MoodCount,
            crate::aggregation::MoodTally,
            crate::aggregation::FlaggedEntry,
        )
    ),
    tags(
        (name = "health", description = "Health check"),
        (name = "auth", description = "Login and logout"),
        (name = "student", description = "Daily check-in and history"),
        (name = "teacher", description = "Class dashboard, results and exports"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            )
        }
    }
}
