use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::debug;

use super::SheetsError;
use super::types::{AssertionClaims, ServiceAccountKey, TokenError, TokenResponse};

const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets.readonly https://www.googleapis.com/auth/drive.readonly";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);
/// Tokens are dropped this long before Google says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Service-account OAuth2 via the JWT bearer grant, with the last token cached.
pub struct ServiceAccountAuth {
    credentials_path: std::path::PathBuf,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceAccountAuth {
    pub fn new(credentials_path: impl AsRef<Path>) -> Self {
        Self {
            credentials_path: credentials_path.as_ref().to_path_buf(),
            cached: Mutex::new(None),
        }
    }

    /// A valid bearer token, reusing the cached one while it has time left.
    pub async fn token(&self, http: &Client) -> Result<String, SheetsError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.value.clone());
        }

        let key = read_key(&self.credentials_path).await?;
        let token = exchange(http, &key).await?;
        debug!(client = %key.client_email, "obtained access token");
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }
}

async fn read_key(path: &Path) -> Result<ServiceAccountKey, SheetsError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SheetsError::Credentials(format!("{}: {e}", path.display())))?;
    let key: ServiceAccountKey = serde_json::from_str(&raw)
        .map_err(|e| SheetsError::Credentials(format!("{}: {e}", path.display())))?;
    url::Url::parse(&key.token_uri)
        .map_err(|e| SheetsError::Credentials(format!("invalid token_uri: {e}")))?;
    Ok(key)
}

fn sign_assertion(key: &ServiceAccountKey, now: u64) -> Result<String, SheetsError> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME.as_secs(),
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(jsonwebtoken::encode(&header, &claims, &encoding_key)?)
}

async fn exchange(http: &Client, key: &ServiceAccountKey) -> Result<AccessToken, SheetsError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let assertion = sign_assertion(key, now)?;
    let requested_at = Instant::now();

    let response = http
        .post(&key.token_uri)
        .header("User-Agent", crate::USER_AGENT)
        .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<TokenError>(&text)
            .ok()
            .and_then(|e| e.error_description.or(e.error))
            .unwrap_or_else(|| text.chars().take(200).collect());
        return Err(SheetsError::Auth {
            code: status.as_u16(),
            message,
        });
    }

    let body: TokenResponse = response.json().await?;
    let lifetime = Duration::from_secs(body.expires_in.unwrap_or(ASSERTION_LIFETIME.as_secs()));
    Ok(AccessToken {
        value: body.access_token,
        expires_at: requested_at + lifetime.saturating_sub(EXPIRY_MARGIN),
    })
}
