use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use std::sync::Arc;

use crate::{
    auth::{clear_session_cookie, issue_session, session_cookie, verify_password},
    extractors::PROFILE_MISSING,
    models::{LoginForm, LoginPage, Role},
    AppResult, AppState,
};

pub const INVALID_EMAIL: &str = "Please enter a valid email address";
pub const UNKNOWN_EMAIL: &str = "No account found with this email";
pub const INVALID_PASSWORD: &str = "Invalid password";

fn form_error(message: &str) -> Response {
    Json(LoginPage::error(message)).into_response()
}

/// GET /
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Empty login form", body = LoginPage)
    ),
    tag = "auth"
)]
pub async fn login_page() -> Json<LoginPage> {
    Json(LoginPage::default())
}

/// POST /
///
/// Failed logins come back as a login page carrying the error. A successful
/// login sets the session cookie and redirects to the landing page of the
/// account's role, which wins over the role picked on the form.
#[utoipa::path(
    post,
    path = "/",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login rejected, page carries the error", body = LoginPage),
        (status = 303, description = "Logged in, redirect to landing page")
    ),
    tag = "auth"
)]
pub async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> AppResult<Response> {
    let email = form.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Ok(form_error(INVALID_EMAIL));
    }

    let Some(user) = state.store.find_user_by_email(email).await? else {
        tracing::info!(email = %email, "Login for unknown email");
        return Ok(form_error(UNKNOWN_EMAIL));
    };

    if !verify_password(&form.password, &user.password_hash) {
        tracing::info!(username = %user.username, "Login with wrong password");
        return Ok(form_error(INVALID_PASSWORD));
    }

    let Some(role) = user.role else {
        tracing::warn!(username = %user.username, "Login for account without profile");
        return Ok(form_error(PROFILE_MISSING));
    };

    match form.user_type.parse::<Role>() {
        Ok(requested) if requested == role => {}
        _ => tracing::debug!(
            username = %user.username,
            requested = %form.user_type,
            actual = %role,
            "Login role differs from the account, using the account role"
        ),
    }

    let token = issue_session(
        &user.username,
        role,
        &user.display_name,
        state.config.session_ttl_secs,
        state.config.session_secret.as_bytes(),
    )?;
    let cookie = session_cookie(&token, state.config.session_ttl_secs, state.config.cookie_secure);

    tracing::info!(username = %user.username, role = %role, "User logged in");

    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(role.landing_path())).into_response())
}

/// GET /logout/
#[utoipa::path(
    get,
    path = "/logout/",
    responses(
        (status = 303, description = "Session cleared, redirect to login")
    ),
    tag = "auth"
)]
pub async fn logout() -> impl IntoResponse {
    ([(header::SET_COOKIE, clear_session_cookie())], Redirect::to("/"))
}
