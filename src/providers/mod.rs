use crate::config::Config;
use crate::error::{CalResult, Error};
use crate::models::Event;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod google;
pub mod ics;
pub mod microsoft;
pub mod vault;

pub use ics::IcsExporter;
pub use vault::CredentialVault;

/// Calendar backend an event can be created against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Microsoft,
    LocalExport,
}

impl Provider {
    /// Parse a provider name from tool input
    pub fn parse(name: &str) -> CalResult<Self> {
        match name.to_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "microsoft" => Ok(Provider::Microsoft),
            "ics" | "local" => Ok(Provider::LocalExport),
            other => Err(Error::Unsupported(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Microsoft => "microsoft",
            Provider::LocalExport => "ics",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform result shape for event creation, regardless of backend
#[derive(Debug, Clone, Serialize)]
pub struct CreateEventOutcome {
    pub provider: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateEventOutcome {
    pub fn created(provider: Provider, event_id: Option<String>, link: Option<String>) -> Self {
        Self {
            provider: provider.as_str().to_string(),
            success: true,
            event_id,
            link,
            error: None,
        }
    }

    pub fn failed(provider: Provider, error: impl Into<String>) -> Self {
        Self {
            provider: provider.as_str().to_string(),
            success: false,
            event_id: None,
            link: None,
            error: Some(error.into()),
        }
    }
}

/// Normalizes event creation across the remote providers and the local
/// file-export fallback
///
/// Failures never escape as errors; every call resolves to a
/// `CreateEventOutcome` so callers can report a single shape.
pub struct ProviderAdapter {
    client: Client,
    config: Arc<RwLock<Config>>,
    exporter: IcsExporter,
}

impl ProviderAdapter {
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            client: Client::new(),
            exporter: IcsExporter::new(Arc::clone(&config)),
            config,
        }
    }

    /// Create an event on the given backend
    ///
    /// The access token is ignored for the local export backend.
    pub async fn create_event(
        &self,
        provider: Provider,
        access_token: &str,
        event: &Event,
    ) -> CreateEventOutcome {
        match provider {
            Provider::Google => {
                let api_base = self.config.read().await.google_api_base.clone();
                google::create_event(&self.client, &api_base, access_token, event).await
            }
            Provider::Microsoft => {
                let api_base = self.config.read().await.microsoft_api_base.clone();
                microsoft::create_event(&self.client, &api_base, access_token, event).await
            }
            Provider::LocalExport => match self.exporter.export(event).await {
                Ok(path) => CreateEventOutcome::created(
                    Provider::LocalExport,
                    None,
                    Some(path.display().to_string()),
                ),
                Err(e) => CreateEventOutcome::failed(Provider::LocalExport, e.to_string()),
            },
        }
    }

    /// Write the event to an .ics file and return its path
    pub async fn export_ics(&self, event: &Event) -> CalResult<PathBuf> {
        self.exporter.export(event).await
    }
}
