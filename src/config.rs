use crate::error::{config_error, CalResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Default address the tool server binds to
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

/// Default directory for exported .ics files
pub const DEFAULT_ICS_OUTPUT_DIR: &str = "/tmp/calendar_events";

/// Main configuration structure for the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP transport listens on
    pub bind_address: String,
    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Microsoft application (client) ID
    pub microsoft_client_id: String,
    /// Microsoft client secret
    pub microsoft_client_secret: String,
    /// Microsoft tenant, "common" for multi-tenant apps
    pub microsoft_tenant_id: String,
    /// Directory where OAuth tokens are persisted
    pub token_dir: PathBuf,
    /// Directory where exported .ics files are written
    pub ics_output_dir: PathBuf,
    /// Timezone identifier passed through to providers when none is given
    pub default_timezone: String,
    /// Local port the interactive OAuth callback server listens on
    pub oauth_callback_port: u16,
    /// Base URL of the Google Calendar API
    pub google_api_base: String,
    /// Google OAuth token endpoint
    pub google_token_endpoint: String,
    /// Base URL of the Microsoft Graph API
    pub microsoft_api_base: String,
    /// Map of provider names to their enabled status
    pub providers: HashMap<String, bool>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> CalResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| String::from(DEFAULT_BIND_ADDRESS));

        // Provider credentials are optional at startup. A missing client ID only
        // surfaces as MissingClientConfig when the provider is actually used.
        let google_client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        let google_client_secret = env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let microsoft_client_id = env::var("MICROSOFT_CLIENT_ID").unwrap_or_default();
        let microsoft_client_secret = env::var("MICROSOFT_CLIENT_SECRET").unwrap_or_default();
        let microsoft_tenant_id =
            env::var("MICROSOFT_TENANT_ID").unwrap_or_else(|_| String::from("common"));

        let token_dir = match env::var("TOKEN_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .ok_or_else(|| config_error("Could not determine home directory for TOKEN_DIR"))?
                .join(".calagent_tokens"),
        };

        let ics_output_dir = env::var("ICS_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ICS_OUTPUT_DIR));

        let default_timezone = env::var("TIMEZONE").unwrap_or_else(|_| String::from("UTC"));

        let oauth_callback_port = match env::var("OAUTH_CALLBACK_PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|_| config_error("Invalid OAUTH_CALLBACK_PORT format"))?,
            Err(_) => 8080,
        };

        // Initialize default providers
        let mut providers = HashMap::new();
        providers.insert("google".to_string(), true);
        providers.insert("microsoft".to_string(), true);
        providers.insert("ics".to_string(), true);

        // Load provider configuration from file if it exists
        if let Ok(content) = fs::read_to_string("config/providers.toml") {
            if let Ok(file_providers) = toml::from_str::<HashMap<String, bool>>(&content) {
                // Merge with defaults
                for (key, value) in file_providers {
                    providers.insert(key, value);
                }
            }
        }

        Ok(Config {
            bind_address,
            google_client_id,
            google_client_secret,
            microsoft_client_id,
            microsoft_client_secret,
            microsoft_tenant_id,
            token_dir,
            ics_output_dir,
            default_timezone,
            oauth_callback_port,
            google_api_base: String::from("https://www.googleapis.com"),
            google_token_endpoint: String::from("https://oauth2.googleapis.com/token"),
            microsoft_api_base: String::from("https://graph.microsoft.com"),
            providers,
        })
    }

    /// Check if a provider is enabled
    pub fn is_provider_enabled(&self, name: &str) -> bool {
        *self.providers.get(name).unwrap_or(&false)
    }
}
