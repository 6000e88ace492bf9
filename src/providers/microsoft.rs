//! Microsoft Graph backend: token exchange and event creation

use super::{CreateEventOutcome, Provider};
use crate::error::{auth_error, CalResult};
use crate::models::Event;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

/// Scopes requested from the Microsoft identity platform
pub(crate) const SCOPES: &str = "https://graph.microsoft.com/Calendars.ReadWrite offline_access";

/// Authority endpoints for the given tenant
pub(crate) fn authorize_endpoint(tenant: &str) -> String {
    format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/authorize",
        tenant
    )
}

pub(crate) fn token_endpoint(tenant: &str) -> String {
    format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
        tenant
    )
}

/// Create an event in the user's Outlook calendar via Microsoft Graph
///
/// Never returns an error; any failure is folded into the outcome.
pub(crate) async fn create_event(
    client: &Client,
    api_base: &str,
    access_token: &str,
    event: &Event,
) -> CreateEventOutcome {
    let url = match Url::parse(api_base).and_then(|base| base.join("/v1.0/me/events")) {
        Ok(url) => url,
        Err(e) => {
            return CreateEventOutcome::failed(
                Provider::Microsoft,
                format!("Invalid API URL: {}", e),
            )
        }
    };

    let date = event.date.format("%Y-%m-%d");
    let body = json!({
        "subject": event.title,
        "body": {
            "contentType": "Text",
            "content": event.description,
        },
        "start": {
            "dateTime": format!("{}T{}:00", date, event.start_time),
            "timeZone": event.timezone,
        },
        "end": {
            "dateTime": format!("{}T{}:00", date, event.end_time),
            "timeZone": event.timezone,
        },
    });

    let response = match client
        .post(url)
        .bearer_auth(access_token)
        .json(&body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            return CreateEventOutcome::failed(
                Provider::Microsoft,
                format!("Failed to reach Microsoft Graph: {}", e),
            )
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        return CreateEventOutcome::failed(
            Provider::Microsoft,
            format!("HTTP {} - {}", status, error_body),
        );
    }

    let created: Value = match response.json().await {
        Ok(value) => value,
        Err(e) => {
            return CreateEventOutcome::failed(
                Provider::Microsoft,
                format!("Failed to parse event response: {}", e),
            )
        }
    };

    CreateEventOutcome::created(
        Provider::Microsoft,
        created
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from),
        created
            .get("webLink")
            .and_then(|v| v.as_str())
            .map(String::from),
    )
}

/// Exchange an authorization code for a token response
pub(crate) async fn exchange_code(
    client: &Client,
    tenant: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> CalResult<Value> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("grant_type", "authorization_code"),
        ("scope", SCOPES),
    ];

    let endpoint = token_endpoint(tenant);
    let response = client
        .post(&endpoint)
        .form(&params)
        .send()
        .await
        .map_err(|e| auth_error(&format!("Token request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        return Err(auth_error(&format!(
            "Token request failed: HTTP {} - {}",
            status, error_body
        )));
    }

    let token: Value = response
        .json()
        .await
        .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))?;

    if token.get("access_token").is_none() {
        let description = token
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error");
        return Err(auth_error(&format!(
            "Failed to acquire Microsoft token: {}",
            description
        )));
    }

    Ok(token)
}
