//! Credential vault: per-provider token acquisition, caching and removal
//!
//! Tokens are persisted as JSON files under the configured token directory
//! so restarts do not force a new authorization. `is_authenticated` is a
//! presence check only; a stale token still reports as authenticated. That
//! is a documented limitation of the vault, not something callers should
//! work around.

use super::{google, microsoft, Provider};
use crate::config::Config;
use crate::error::{auth_error, execution_error, CalResult, Error};
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Manages OAuth credentials for the remote calendar providers
pub struct CredentialVault {
    config: Arc<RwLock<Config>>,
    client: Client,
}

impl CredentialVault {
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Get a usable Google access token, refreshing silently when expired
    pub async fn get_google_access_token(&self) -> CalResult<String> {
        let path = self.google_token_path().await;
        let raw = fs::read_to_string(&path).map_err(|_| {
            Error::MissingClientConfig(
                "No stored Google credentials. Run oauth_login for provider 'google' first."
                    .to_string(),
            )
        })?;
        let token: Value = serde_json::from_str(&raw)?;

        let now = Utc::now().timestamp();
        let fresh = token
            .get("expires_at")
            .and_then(|v| v.as_i64())
            .map(|t| t > now)
            .unwrap_or(false);
        if fresh {
            if let Some(access) = token.get("access_token").and_then(|v| v.as_str()) {
                return Ok(access.to_string());
            }
        }

        // Expired or incomplete; try a silent refresh
        let refresh = token
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::MissingClientConfig(
                    "Stored Google credentials have no refresh token. Run oauth_login again."
                        .to_string(),
                )
            })?;

        let (client_id, client_secret, endpoint) = {
            let config = self.config.read().await;
            (
                config.google_client_id.clone(),
                config.google_client_secret.clone(),
                config.google_token_endpoint.clone(),
            )
        };
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::MissingClientConfig(
                "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set".to_string(),
            ));
        }

        debug!("Refreshing expired Google access token");
        let new_token =
            google::refresh_token(&self.client, &endpoint, &client_id, &client_secret, refresh)
                .await?;
        persist(&path, &new_token)?;

        new_token
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| auth_error("Refreshed token is missing 'access_token'"))
    }

    /// Get a Microsoft access token: cached file first, then the silent
    /// account cache, then the interactive consent flow
    pub async fn get_microsoft_access_token(&self) -> CalResult<String> {
        let path = self.microsoft_token_path().await;
        if let Ok(raw) = fs::read_to_string(&path) {
            // Cached responses are served as-is; presence counts as validity
            let token: Value = serde_json::from_str(&raw)?;
            if let Some(access) = token.get("access_token").and_then(|v| v.as_str()) {
                return Ok(access.to_string());
            }
        }

        if let Some(token) = self.microsoft_silent().await? {
            persist(&path, &token)?;
            if let Some(access) = token.get("access_token").and_then(|v| v.as_str()) {
                return Ok(access.to_string());
            }
        }

        let token = self.microsoft_interactive().await?;
        token
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| auth_error("Acquired token is missing 'access_token'"))
    }

    /// Run the interactive authorization flow for the provider
    pub async fn login(&self, provider: Provider) -> CalResult<String> {
        match provider {
            Provider::Google => self.login_google().await,
            Provider::Microsoft => {
                self.microsoft_interactive().await?;
                Ok("Microsoft authorization complete. Credentials stored.".to_string())
            }
            Provider::LocalExport => Err(Error::Unsupported("ics".to_string())),
        }
    }

    /// Remove stored credentials; returns whether anything was removed
    pub async fn logout(&self, provider: Provider) -> CalResult<bool> {
        let mut removed = false;
        match provider {
            Provider::Google => {
                removed |= remove_if_exists(&self.google_token_path().await)?;
            }
            Provider::Microsoft => {
                removed |= remove_if_exists(&self.microsoft_token_path().await)?;
                removed |= remove_if_exists(&self.microsoft_cache_path().await)?;
            }
            Provider::LocalExport => return Err(Error::Unsupported("ics".to_string())),
        }
        Ok(removed)
    }

    /// Whether durable credentials exist for the provider
    ///
    /// Checks file presence only; token freshness is not validated.
    pub async fn is_authenticated(&self, provider: Provider) -> bool {
        match provider {
            Provider::Google => self.google_token_path().await.exists(),
            Provider::Microsoft => self.microsoft_token_path().await.exists(),
            Provider::LocalExport => false,
        }
    }

    async fn login_google(&self) -> CalResult<String> {
        let (client_id, client_secret, endpoint, port) = {
            let config = self.config.read().await;
            (
                config.google_client_id.clone(),
                config.google_client_secret.clone(),
                config.google_token_endpoint.clone(),
                config.oauth_callback_port,
            )
        };
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::MissingClientConfig(
                "GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set".to_string(),
            ));
        }

        let redirect_uri = format!("http://localhost:{}", port);
        let state = Uuid::new_v4().to_string();

        let mut auth_url = Url::parse(GOOGLE_AUTH_ENDPOINT)
            .map_err(|e| auth_error(&format!("Invalid authorization URL: {}", e)))?;
        auth_url
            .query_pairs_mut()
            .append_pair("client_id", &client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("scope", GOOGLE_SCOPE)
            .append_pair("state", &state);

        let code = receive_auth_code(auth_url.to_string(), port, state).await?;

        let mut token = google::exchange_code(
            &self.client,
            &endpoint,
            &client_id,
            &client_secret,
            &code,
            &redirect_uri,
        )
        .await?;
        stamp_expiry(&mut token);
        persist(&self.google_token_path().await, &token)?;

        Ok("Google authorization complete. Credentials stored.".to_string())
    }

    // Look for a usable token in the local account-keyed cache
    async fn microsoft_silent(&self) -> CalResult<Option<Value>> {
        let path = self.microsoft_cache_path().await;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Ok(None),
        };
        let cache: Value = serde_json::from_str(&raw)?;
        let Some(accounts) = cache.as_object() else {
            return Ok(None);
        };
        for (account, token) in accounts {
            if token.get("access_token").and_then(|v| v.as_str()).is_some() {
                debug!("Using cached Microsoft token for account '{}'", account);
                return Ok(Some(token.clone()));
            }
        }
        Ok(None)
    }

    async fn microsoft_interactive(&self) -> CalResult<Value> {
        let (client_id, client_secret, tenant, port) = {
            let config = self.config.read().await;
            (
                config.microsoft_client_id.clone(),
                config.microsoft_client_secret.clone(),
                config.microsoft_tenant_id.clone(),
                config.oauth_callback_port,
            )
        };
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::MissingClientConfig(
                "MICROSOFT_CLIENT_ID and MICROSOFT_CLIENT_SECRET must be set".to_string(),
            ));
        }

        let redirect_uri = format!("http://localhost:{}", port);
        let state = Uuid::new_v4().to_string();

        let mut auth_url = Url::parse(&microsoft::authorize_endpoint(&tenant))
            .map_err(|e| auth_error(&format!("Invalid authorization URL: {}", e)))?;
        auth_url
            .query_pairs_mut()
            .append_pair("client_id", &client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_mode", "query")
            .append_pair("scope", microsoft::SCOPES)
            .append_pair("prompt", "select_account")
            .append_pair("state", &state);

        let code = receive_auth_code(auth_url.to_string(), port, state).await?;

        let mut token = microsoft::exchange_code(
            &self.client,
            &tenant,
            &client_id,
            &client_secret,
            &code,
            &redirect_uri,
        )
        .await?;
        stamp_expiry(&mut token);

        persist(&self.microsoft_token_path().await, &token)?;
        self.cache_store(&token).await?;
        Ok(token)
    }

    // Record the token in the account cache so later silent lookups succeed
    async fn cache_store(&self, token: &Value) -> CalResult<()> {
        let path = self.microsoft_cache_path().await;
        let mut cache = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        cache.insert("default".to_string(), token.clone());
        persist(&path, &Value::Object(cache))
    }

    async fn token_dir(&self) -> PathBuf {
        self.config.read().await.token_dir.clone()
    }

    async fn google_token_path(&self) -> PathBuf {
        self.token_dir().await.join("google_token.json")
    }

    async fn microsoft_token_path(&self) -> PathBuf {
        self.token_dir().await.join("microsoft_token.json")
    }

    async fn microsoft_cache_path(&self) -> PathBuf {
        self.token_dir().await.join("microsoft_cache.json")
    }
}

fn persist(path: &Path, token: &Value) -> CalResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(token)?)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> CalResult<bool> {
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn stamp_expiry(token: &mut Value) {
    let expires_in = token
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(3600);
    if let Some(obj) = token.as_object_mut() {
        obj.insert(
            "expires_at".to_string(),
            json!(Utc::now().timestamp() + expires_in),
        );
    }
}

/// Open the browser on the authorization URL and wait for the redirect on a
/// local callback server
async fn receive_auth_code(auth_url: String, port: u16, expected_state: String) -> CalResult<String> {
    tokio::task::spawn_blocking(move || receive_auth_code_blocking(&auth_url, port, &expected_state))
        .await
        .map_err(|e| execution_error(&format!("Authorization task failed: {}", e)))?
}

fn receive_auth_code_blocking(auth_url: &str, port: u16, expected_state: &str) -> CalResult<String> {
    info!("Opening browser for authorization");
    webbrowser::open(auth_url)?;

    let server = tiny_http::Server::http(("0.0.0.0", port))
        .map_err(|e| auth_error(&format!("Failed to start callback server: {}", e)))?;
    info!("Waiting for authorization callback on port {}", port);

    let request = server.recv()?;
    let url = request.url().to_string();

    let code = query_param(&url, "code")
        .ok_or_else(|| auth_error("No authorization code found in callback"))?;
    if query_param(&url, "state").as_deref() != Some(expected_state) {
        return Err(auth_error("State mismatch in authorization callback"));
    }

    let response =
        tiny_http::Response::from_string("Authorization successful! You can close this window.");
    request.respond(response)?;

    Ok(code)
}

fn query_param(raw_url: &str, key: &str) -> Option<String> {
    let full = Url::parse(&format!("http://localhost{}", raw_url)).ok()?;
    full.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashMap;

    fn test_config(token_dir: PathBuf) -> Arc<RwLock<Config>> {
        Arc::new(RwLock::new(Config {
            bind_address: "127.0.0.1:0".to_string(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            microsoft_client_id: String::new(),
            microsoft_client_secret: String::new(),
            microsoft_tenant_id: "common".to_string(),
            token_dir,
            ics_output_dir: PathBuf::from("/tmp/calendar_events"),
            default_timezone: "UTC".to_string(),
            oauth_callback_port: 8080,
            google_api_base: "https://www.googleapis.com".to_string(),
            google_token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            microsoft_api_base: "https://graph.microsoft.com".to_string(),
            providers: HashMap::new(),
        }))
    }

    #[test]
    fn test_query_param() {
        assert_eq!(
            query_param("/?code=abc123&state=xyz", "code").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            query_param("/?code=abc123&state=xyz", "state").as_deref(),
            Some("xyz")
        );
        assert_eq!(query_param("/?code=abc123", "state"), None);
        assert_eq!(query_param("/", "code"), None);
    }

    #[test]
    fn test_stamp_expiry() {
        let mut token = json!({"access_token": "t", "expires_in": 100});
        stamp_expiry(&mut token);
        let expires_at = token.get("expires_at").and_then(|v| v.as_i64()).unwrap();
        assert!(expires_at > Utc::now().timestamp());
    }

    #[tokio::test]
    async fn test_authentication_presence_and_logout() {
        let dir = tempfile::tempdir().unwrap();
        let vault = CredentialVault::new(test_config(dir.path().to_path_buf()));

        assert!(!vault.is_authenticated(Provider::Google).await);
        assert!(!vault.logout(Provider::Google).await.unwrap());

        // A stored token, stale or not, reports as authenticated
        persist(
            &dir.path().join("google_token.json"),
            &json!({"access_token": "t", "expires_at": 0}),
        )
        .unwrap();
        assert!(vault.is_authenticated(Provider::Google).await);

        assert!(vault.logout(Provider::Google).await.unwrap());
        assert!(!vault.is_authenticated(Provider::Google).await);
        assert!(!vault.logout(Provider::Google).await.unwrap());
    }

    #[tokio::test]
    async fn test_microsoft_cached_token_served_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let vault = CredentialVault::new(test_config(dir.path().to_path_buf()));

        persist(
            &dir.path().join("microsoft_token.json"),
            &json!({"access_token": "cached-token"}),
        )
        .unwrap();

        let token = vault.get_microsoft_access_token().await.unwrap();
        assert_eq!(token, "cached-token");
    }

    #[tokio::test]
    async fn test_microsoft_silent_cache_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let vault = CredentialVault::new(test_config(dir.path().to_path_buf()));

        persist(
            &dir.path().join("microsoft_cache.json"),
            &json!({"user@example.com": {"access_token": "silent-token"}}),
        )
        .unwrap();

        let token = vault.get_microsoft_access_token().await.unwrap();
        assert_eq!(token, "silent-token");
        // The silent hit is promoted to the token file
        assert!(vault.is_authenticated(Provider::Microsoft).await);
    }
}
