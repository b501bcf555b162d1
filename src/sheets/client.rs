use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use moka::future::Cache;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::credentials::ServiceAccountKey;
use crate::store::{StoreError, StoreResult};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_CACHE_KEY: &str = "access_token";

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Authenticated client for one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    key: ServiceAccountKey,
    sheet_id: String,
    tokens: Cache<&'static str, String>,
}

impl SheetsClient {
    pub fn new(key: ServiceAccountKey, sheet_id: impl Into<String>) -> Self {
        // refresh well before Google's one-hour expiry
        let tokens = Cache::builder()
            .time_to_live(Duration::from_secs(50 * 60))
            .max_capacity(1)
            .build();

        Self {
            http: reqwest::Client::new(),
            key,
            sheet_id: sheet_id.into(),
            tokens,
        }
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    async fn access_token(&self) -> StoreResult<String> {
        if let Some(token) = self.tokens.get(TOKEN_CACHE_KEY).await {
            return Ok(token);
        }

        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| StoreError::Credentials(format!("Invalid service account private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| StoreError::Credentials(format!("Failed to sign token request: {}", e)))?;

        tracing::debug!(client_email = %self.key.client_email, "Requesting Google access token");

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Token request failed");
                StoreError::Remote(format!("Token request failed: {}", e))
            })?;

        let token: TokenResponse = Self::read_json(response).await?;
        self.tokens.insert(TOKEN_CACHE_KEY, token.access_token.clone()).await;
        Ok(token.access_token)
    }

    fn values_url(&self, range_segment: &str) -> StoreResult<Url> {
        let mut url = Url::parse(SHEETS_API).map_err(|e| StoreError::Remote(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Remote("Sheets API URL cannot be a base".to_string()))?
            .push(&self.sheet_id)
            .push("values")
            .push(range_segment);
        Ok(url)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> StoreResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Google API returned error");
            return Err(StoreError::Remote(format!("{} - {}", status, body)));
        }
        response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Google API response");
            StoreError::Remote(format!("Failed to parse response: {}", e))
        })
    }

    fn send_error(e: reqwest::Error) -> StoreError {
        tracing::error!(error = %e, "Google API request failed");
        StoreError::Remote(e.to_string())
    }

    /// Every row in `range`, each cell rendered as text.
    pub async fn get_values(&self, range: &str) -> StoreResult<Vec<Vec<String>>> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.values_url(range)?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(Self::send_error)?;

        let body: ValueRange = Self::read_json(response).await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    pub async fn append_row(&self, range: &str, row: Vec<String>) -> StoreResult<()> {
        let token = self.access_token().await?;
        let mut url = self.values_url(&format!("{}:append", range))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .map_err(Self::send_error)?;

        let _: Value = Self::read_json(response).await?;
        Ok(())
    }

    pub async fn update_range(&self, range: &str, rows: Vec<Vec<String>>) -> StoreResult<()> {
        let token = self.access_token().await?;
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&json!({ "range": range, "values": rows }))
            .send()
            .await
            .map_err(Self::send_error)?;

        let _: Value = Self::read_json(response).await?;
        Ok(())
    }

    pub async fn clear(&self, range: &str) -> StoreResult<()> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.values_url(&format!("{}:clear", range))?)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .map_err(Self::send_error)?;

        let _: Value = Self::read_json(response).await?;
        Ok(())
    }

    /// Clears `worksheet` and writes `rows` starting at A1.
    pub async fn replace_worksheet(&self, worksheet: &str, rows: Vec<Vec<String>>) -> StoreResult<()> {
        self.clear(worksheet).await?;
        self.update_range(&format!("{}!A1", worksheet), rows).await
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
