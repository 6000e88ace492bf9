//! Google Calendar backend: token exchange, refresh and event creation

use super::{CreateEventOutcome, Provider};
use crate::error::{auth_error, CalResult};
use crate::models::Event;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

/// Create an event in the user's primary Google calendar
///
/// Never returns an error; any failure is folded into the outcome.
pub(crate) async fn create_event(
    client: &Client,
    api_base: &str,
    access_token: &str,
    event: &Event,
) -> CreateEventOutcome {
    let url = match Url::parse(api_base)
        .and_then(|base| base.join("/calendar/v3/calendars/primary/events"))
    {
        Ok(url) => url,
        Err(e) => {
            return CreateEventOutcome::failed(Provider::Google, format!("Invalid API URL: {}", e))
        }
    };

    // Date and time are combined verbatim; the timezone rides along as
    // metadata for the remote API to interpret.
    let date = event.date.format("%Y-%m-%d");
    let body = json!({
        "summary": event.title,
        "description": event.description,
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
                Provider::Google,
                format!("Failed to reach Google Calendar: {}", e),
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
            Provider::Google,
            format!("HTTP {} - {}", status, error_body),
        );
    }

    let created: Value = match response.json().await {
        Ok(value) => value,
        Err(e) => {
            return CreateEventOutcome::failed(
                Provider::Google,
                format!("Failed to parse event response: {}", e),
            )
        }
    };

    CreateEventOutcome::created(
        Provider::Google,
        created
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from),
        created
            .get("htmlLink")
            .and_then(|v| v.as_str())
            .map(String::from),
    )
}

/// Exchange an authorization code for a token response
pub(crate) async fn exchange_code(
    client: &Client,
    token_endpoint: &str,
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
    ];

    request_token(client, token_endpoint, &params).await
}

/// Refresh an expired token, keeping the existing refresh token
pub(crate) async fn refresh_token(
    client: &Client,
    token_endpoint: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> CalResult<Value> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let new_token = request_token(client, token_endpoint, &params).await?;

    // Google omits the refresh token from refresh responses; carry the old
    // one forward so the next refresh still works.
    let mut token_data = serde_json::Map::new();
    token_data.insert(
        "access_token".to_string(),
        new_token.get("access_token").cloned().unwrap_or(Value::Null),
    );
    token_data.insert("refresh_token".to_string(), json!(refresh_token));

    let expires_in = new_token
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(3600);
    token_data.insert(
        "expires_at".to_string(),
        json!(Utc::now().timestamp() + expires_in),
    );

    Ok(Value::Object(token_data))
}

async fn request_token(
    client: &Client,
    token_endpoint: &str,
    params: &[(&str, &str)],
) -> CalResult<Value> {
    let response = client
        .post(token_endpoint)
        .form(params)
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
        return Err(auth_error("Token response missing 'access_token' field"));
    }

    Ok(token)
}
