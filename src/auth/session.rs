use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{models::Role, AppError};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "wellbeing_session";

/// What the signed session cookie carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub username: String,
    pub role: Role,
    pub display_name: String,
    pub exp: i64,
}

/// Issue a session token valid for `ttl_secs`.
/// Token format: base64url(json claims).hex(hmac_sha256)
pub fn issue_session(
    username: &str,
    role: Role,
    display_name: &str,
    ttl_secs: i64,
    secret: &[u8],
) -> Result<String, AppError> {
    let claims = SessionClaims {
        username: username.to_string(),
        role,
        display_name: display_name.to_string(),
        exp: chrono::Utc::now().timestamp() + ttl_secs,
    };

    let json = serde_json::to_vec(&claims)
        .map_err(|e| AppError::Internal(format!("Session encoding error: {}", e)))?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let signature = sign(&payload, secret)?;

    Ok(format!("{}.{}", payload, hex::encode(signature)))
}

/// Validate a session token and return its claims.
/// Returns `None` for anything malformed, forged or expired.
pub fn verify_session(token: &str, secret: &[u8]) -> Option<SessionClaims> {
    let (payload, signature_hex) = token.split_once('.')?;
    let provided = hex::decode(signature_hex).ok()?;
    let expected = sign(payload, secret).ok()?;

    if !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        tracing::debug!("Session signature mismatch");
        return None;
    }

    let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: SessionClaims = serde_json::from_slice(&json).ok()?;

    if chrono::Utc::now().timestamp() > claims.exp {
        tracing::debug!(username = %claims.username, "Session expired");
        return None;
    }

    Some(claims)
}

fn sign(data: &str, secret: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(format!("HMAC initialization error: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret_key_for_testing_purposes";

    #[test]
    fn issued_session_verifies() {
        let token = issue_session("amy", Role::Student, "Amy Pond", 3600, SECRET).unwrap();
        let claims = verify_session(&token, SECRET).unwrap();

        assert_eq!(claims.username, "amy");
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.display_name, "Amy Pond");
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(verify_session("invalid_token", SECRET).is_none());
        assert!(verify_session("abc.zz", SECRET).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_session("amy", Role::Student, "", 3600, SECRET).unwrap();
        assert!(verify_session(&token, b"wrong_secret_key").is_none());
    }

    #[test]
    fn tampered_role_is_rejected() {
        let token = issue_session("amy", Role::Student, "", 3600, SECRET).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged_claims = serde_json::json!({
            "username": "amy", "role": "teacher", "display_name": "", "exp": i64::MAX
        });
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(forged_claims.to_string()), sig);
        assert!(verify_session(&forged, SECRET).is_none());
    }

    #[test]
    fn expired_session_is_rejected() {
        let token = issue_session("amy", Role::Teacher, "", -10, SECRET).unwrap();
        assert!(verify_session(&token, SECRET).is_none());
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("tok", 86400, true);
        assert!(cookie.starts_with("wellbeing_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("; Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
