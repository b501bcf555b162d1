use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::headers::{Cookie, HeaderMapExt};
use std::future::Future;
use std::sync::Arc;

use crate::{
    auth::{self, SessionClaims, SESSION_COOKIE},
    models::{Role, User},
    store::StoreError,
    AppError, AppState,
};

pub const PROFILE_MISSING: &str = "Account profile not found. Please contact admin.";

/// Reads the session token from the `Cookie` header.
fn session_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .typed_get::<Cookie>()
        .and_then(|cookies| cookies.get(SESSION_COOKIE).map(str::to_string))
}

/// Why a request did not get past the session or role check.
#[derive(Debug)]
pub enum GateRejection {
    /// No valid session: back to the login page.
    Unauthenticated,
    /// Signed in with a different role: send to that role's landing page.
    WrongRole(Role),
    /// The account has no profile (role) attached.
    ProfileMissing,
    Store(StoreError),
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            GateRejection::Unauthenticated => Redirect::to("/").into_response(),
            GateRejection::WrongRole(role) => Redirect::to(role.landing_path()).into_response(),
            GateRejection::ProfileMissing => AppError::Forbidden(PROFILE_MISSING.to_string()).into_response(),
            GateRejection::Store(e) => AppError::from(e).into_response(),
        }
    }
}

/// A signed-in user, re-read from the store on every request so that role
/// and profile changes take effect without a new login.
#[derive(Debug, Clone)]
pub struct Session {
    pub claims: SessionClaims,
    pub user: User,
    pub role: Role,
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = GateRejection;

    fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = session_token(parts);
        let state = state.clone();

        async move {
            let token = token.ok_or(GateRejection::Unauthenticated)?;
            let claims = auth::verify_session(&token, state.config.session_secret.as_bytes())
                .ok_or(GateRejection::Unauthenticated)?;

            let user = state
                .store
                .get_user(&claims.username)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, username = %claims.username, "Session user lookup failed");
                    GateRejection::Store(e)
                })?
                .ok_or_else(|| {
                    tracing::warn!(username = %claims.username, "Session for unknown user");
                    GateRejection::Unauthenticated
                })?;

            let role = user.role.ok_or_else(|| {
                tracing::warn!(username = %user.username, "User has no profile");
                GateRejection::ProfileMissing
            })?;

            if role != claims.role {
                tracing::debug!(username = %user.username, from = %claims.role, to = %role, "Role changed since login");
            }

            Ok(Session { claims, user, role })
        }
    }
}
