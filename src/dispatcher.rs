//! Tool dispatcher: the boundary between the transport and the components
//!
//! Operations are registered in an explicit table built at startup; dispatch
//! is a lookup plus a uniform required-argument check. Component failures
//! that have a user-facing meaning are rendered as text results here, and
//! anything genuinely unexpected is converted to `ExecutionFailed` so no
//! error ever escapes to the transport layer.

use crate::config::Config;
use crate::error::{CalResult, Error};
use crate::interpreter::{parse_message, Intent};
use crate::models::{default_end_time, default_start_time, Event};
use crate::providers::{CreateEventOutcome, CredentialVault, Provider, ProviderAdapter};
use crate::store::EventStore;
use crate::utils::time::{parse_date, parse_time};
use chrono::Local;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Reply for messages the interpreter cannot place
pub const HELP_MESSAGE: &str = "I didn't understand that. Try one of:\n\
- \"Add Launch on 2026-05-04 about Rocket day\"\n\
- \"add:Launch|2026-05-04|Rocket day\"\n\
- \"Add Standup tomorrow\"\n\
- \"List events for 2026-05-04\"\n\
- \"Delete the event Launch\"\n\
- \"Summarize my upcoming events\"";

/// Consent text shown before connecting a calendar account
const CONSENT_PROMPT: &str = "This application would like to access your calendar account.\n\n\
Permissions requested:\n\
- Read and manage your calendar events\n\n\
Do you accept the connection to your calendar account?";

/// The operations the dispatcher can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    AddEvent,
    ViewEvents,
    DeleteEvent,
    SummarizeEvents,
    OauthLogin,
    CheckAuthStatus,
    CreateCalendarEvent,
    ExportIcs,
    OauthLogout,
    HandleMessage,
    GetConsentPrompt,
}

/// One registry entry: an operation name, what it does and which arguments
/// must be present
pub struct ToolSpec {
    pub name: &'static str,
    pub kind: ToolKind,
    pub required: &'static [&'static str],
}

/// The full tool surface, in the order it is presented to callers
pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "add_event",
        kind: ToolKind::AddEvent,
        required: &["title", "date"],
    },
    ToolSpec {
        name: "view_events",
        kind: ToolKind::ViewEvents,
        required: &[],
    },
    ToolSpec {
        name: "delete_event",
        kind: ToolKind::DeleteEvent,
        required: &["title"],
    },
    ToolSpec {
        name: "summarize_events",
        kind: ToolKind::SummarizeEvents,
        required: &[],
    },
    ToolSpec {
        name: "oauth_login",
        kind: ToolKind::OauthLogin,
        required: &["provider"],
    },
    ToolSpec {
        name: "check_auth_status",
        kind: ToolKind::CheckAuthStatus,
        required: &["provider"],
    },
    ToolSpec {
        name: "create_calendar_event",
        kind: ToolKind::CreateCalendarEvent,
        required: &["provider", "title", "date"],
    },
    ToolSpec {
        name: "export_ics",
        kind: ToolKind::ExportIcs,
        required: &["title", "date"],
    },
    ToolSpec {
        name: "oauth_logout",
        kind: ToolKind::OauthLogout,
        required: &["provider"],
    },
    ToolSpec {
        name: "handle_message",
        kind: ToolKind::HandleMessage,
        required: &["message"],
    },
    ToolSpec {
        name: "get_consent_prompt",
        kind: ToolKind::GetConsentPrompt,
        required: &[],
    },
];

/// Routes named operations to the store, vault and provider adapter
pub struct ToolDispatcher {
    registry: HashMap<&'static str, &'static ToolSpec>,
    store: Arc<RwLock<EventStore>>,
    vault: CredentialVault,
    adapter: ProviderAdapter,
    config: Arc<RwLock<Config>>,
}

impl ToolDispatcher {
    /// Build the dispatcher and its operation registry
    pub fn new(store: Arc<RwLock<EventStore>>, config: Arc<RwLock<Config>>) -> Self {
        let mut registry = HashMap::new();
        for spec in TOOLS {
            registry.insert(spec.name, spec);
        }
        Self {
            registry,
            store,
            vault: CredentialVault::new(Arc::clone(&config)),
            adapter: ProviderAdapter::new(Arc::clone(&config)),
            config,
        }
    }

    /// Execute a named operation against a JSON argument mapping
    pub async fn dispatch(&self, name: &str, input: &Value) -> CalResult<String> {
        let spec = self
            .registry
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))?;

        for arg in spec.required {
            if arg_str(input, arg).is_none() {
                return Err(Error::MissingArgument((*arg).to_string()));
            }
        }

        debug!("Dispatching tool '{}'", name);
        match self.execute(spec.kind, input).await {
            Ok(value) => Ok(unwrap_payload(&value)),
            Err(e) => Err(Error::ExecutionFailed(e.to_string())),
        }
    }

    async fn execute(&self, kind: ToolKind, input: &Value) -> CalResult<Value> {
        match kind {
            ToolKind::AddEvent => {
                let title = arg_str(input, "title").unwrap_or_default();
                let date = arg_str(input, "date").unwrap_or_default();
                let description = arg_str(input, "description").unwrap_or_default();
                let message = match self.store.write().await.add(title, date, description) {
                    Ok(message) => message,
                    Err(e @ Error::InvalidDate) => e.to_string(),
                    Err(e) => return Err(e),
                };
                Ok(Value::String(message))
            }
            ToolKind::ViewEvents => Ok(Value::String(self.store.read().await.list())),
            ToolKind::DeleteEvent => {
                let title = arg_str(input, "title").unwrap_or_default();
                Ok(Value::String(self.store.write().await.delete(title)))
            }
            ToolKind::SummarizeEvents => Ok(Value::String(self.store.read().await.summarize())),
            ToolKind::OauthLogin => {
                let provider = match self.parse_enabled_provider(input).await {
                    Ok(provider) => provider,
                    Err(message) => return Ok(Value::String(message)),
                };
                let message = match self.vault.login(provider).await {
                    Ok(message) => message,
                    Err(
                        e @ (Error::MissingClientConfig(_)
                        | Error::AuthExchangeFailed(_)
                        | Error::Unsupported(_)),
                    ) => e.to_string(),
                    Err(e) => return Err(e),
                };
                Ok(Value::String(message))
            }
            ToolKind::CheckAuthStatus => {
                let raw = arg_str(input, "provider").unwrap_or_default();
                let message = if raw.eq_ignore_ascii_case("all") {
                    let google = self.auth_status_line(Provider::Google).await;
                    let microsoft = self.auth_status_line(Provider::Microsoft).await;
                    format!("{}\n{}", google, microsoft)
                } else {
                    match Provider::parse(raw) {
                        Ok(Provider::LocalExport) => {
                            Error::Unsupported(raw.to_string()).to_string()
                        }
                        Ok(provider) => self.auth_status_line(provider).await,
                        Err(e) => e.to_string(),
                    }
                };
                Ok(Value::String(message))
            }
            ToolKind::CreateCalendarEvent => {
                let provider = match self.parse_enabled_provider(input).await {
                    Ok(provider) => provider,
                    Err(message) => return Ok(Value::String(message)),
                };
                let event = match self.event_from_input(input).await {
                    Ok(event) => event,
                    Err(e @ (Error::InvalidDate | Error::InvalidTime)) => {
                        return Ok(Value::String(e.to_string()))
                    }
                    Err(e) => return Err(e),
                };

                let access_token = match provider {
                    Provider::Google => match self.vault.get_google_access_token().await {
                        Ok(token) => token,
                        Err(
                            e @ (Error::MissingClientConfig(_) | Error::AuthExchangeFailed(_)),
                        ) => return Ok(Value::String(e.to_string())),
                        Err(e) => return Err(e),
                    },
                    Provider::Microsoft => match self.vault.get_microsoft_access_token().await {
                        Ok(token) => token,
                        Err(
                            e @ (Error::MissingClientConfig(_) | Error::AuthExchangeFailed(_)),
                        ) => return Ok(Value::String(e.to_string())),
                        Err(e) => return Err(e),
                    },
                    Provider::LocalExport => String::new(),
                };

                let outcome = self.adapter.create_event(provider, &access_token, &event).await;
                Ok(json!({
                    "result": outcome_message(&outcome),
                    "provider": outcome.provider,
                    "success": outcome.success,
                }))
            }
            ToolKind::ExportIcs => {
                let event = match self.event_from_input(input).await {
                    Ok(event) => event,
                    Err(e @ (Error::InvalidDate | Error::InvalidTime)) => {
                        return Ok(Value::String(e.to_string()))
                    }
                    Err(e) => return Err(e),
                };
                let path = self.adapter.export_ics(&event).await?;
                Ok(json!({
                    "result": format!("ICS file created: {}", path.display()),
                    "file_path": path.display().to_string(),
                }))
            }
            ToolKind::OauthLogout => {
                let raw = arg_str(input, "provider").unwrap_or_default();
                let message = match Provider::parse(raw) {
                    Ok(Provider::LocalExport) => Error::Unsupported(raw.to_string()).to_string(),
                    Ok(provider) => {
                        if self.vault.logout(provider).await? {
                            format!("Logged out of {}. Stored credentials removed.", provider)
                        } else {
                            format!("No stored credentials for {}.", provider)
                        }
                    }
                    Err(e) => e.to_string(),
                };
                Ok(Value::String(message))
            }
            ToolKind::HandleMessage => {
                let message = arg_str(input, "message").unwrap_or_default();
                Ok(Value::String(self.handle_message(message).await))
            }
            ToolKind::GetConsentPrompt => Ok(Value::String(CONSENT_PROMPT.to_string())),
        }
    }

    /// Route a free-text message through the interpreter to the store
    async fn handle_message(&self, message: &str) -> String {
        let today = Local::now().date_naive();
        let command = match parse_message(message, today) {
            Ok(command) => command,
            // Interpreter failures are user errors, reported as plain text
            Err(e) => return e.to_string(),
        };

        match command.intent {
            Intent::Add => {
                let title = command.title.unwrap_or_default();
                let date = command
                    .date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                let description = command.description.unwrap_or_default();
                match self.store.write().await.add(&title, &date, &description) {
                    Ok(message) => message,
                    Err(e) => e.to_string(),
                }
            }
            Intent::List => self.store.read().await.list(),
            Intent::ListByDate => {
                let date = command
                    .date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                match self.store.read().await.list_by_date(&date) {
                    Ok(message) => message,
                    Err(e) => e.to_string(),
                }
            }
            Intent::Delete => {
                let title = command.title.unwrap_or_default();
                self.store.write().await.delete(&title)
            }
            Intent::Summarize => self.store.read().await.summarize(),
            Intent::Unknown => HELP_MESSAGE.to_string(),
        }
    }

    // Parse the provider argument and check it against the enabled map.
    // Failures come back as ready-to-return user text.
    async fn parse_enabled_provider(&self, input: &Value) -> Result<Provider, String> {
        let raw = arg_str(input, "provider").unwrap_or_default();
        let provider = match Provider::parse(raw) {
            Ok(provider) => provider,
            Err(e) => return Err(e.to_string()),
        };
        if !self
            .config
            .read()
            .await
            .is_provider_enabled(provider.as_str())
        {
            return Err(format!("Provider '{}' is disabled in configuration.", provider));
        }
        Ok(provider)
    }

    async fn auth_status_line(&self, provider: Provider) -> String {
        if self.vault.is_authenticated(provider).await {
            format!("{}: authenticated", provider)
        } else {
            format!("{}: not authenticated", provider)
        }
    }

    // Build an event from tool input, validating date and time formats
    async fn event_from_input(&self, input: &Value) -> CalResult<Event> {
        let title = arg_str(input, "title").unwrap_or_default();
        let date =
            parse_date(arg_str(input, "date").unwrap_or_default()).ok_or(Error::InvalidDate)?;
        let description = arg_str(input, "description").unwrap_or_default();

        let start_time = arg_str(input, "start_time")
            .map(str::to_string)
            .unwrap_or_else(default_start_time);
        let end_time = arg_str(input, "end_time")
            .map(str::to_string)
            .unwrap_or_else(default_end_time);
        parse_time(&start_time).ok_or(Error::InvalidTime)?;
        parse_time(&end_time).ok_or(Error::InvalidTime)?;

        let timezone = match arg_str(input, "timezone") {
            Some(tz) => tz.to_string(),
            None => self.config.read().await.default_timezone.clone(),
        };

        Ok(Event {
            title: title.to_string(),
            date,
            description: description.to_string(),
            start_time,
            end_time,
            timezone,
        })
    }
}

/// Render a creation outcome as a single user-facing line
fn outcome_message(outcome: &CreateEventOutcome) -> String {
    if outcome.success {
        match (&outcome.link, &outcome.event_id) {
            (Some(link), _) if outcome.provider == "ics" => {
                format!("ICS file created: {}", link)
            }
            (Some(link), _) => format!("Event created in {} calendar: {}", outcome.provider, link),
            (None, Some(id)) => format!("Event created in {} calendar (id {}).", outcome.provider, id),
            (None, None) => format!("Event created in {} calendar.", outcome.provider),
        }
    } else {
        format!(
            "Failed to create event with {}: {}",
            outcome.provider,
            outcome.error.as_deref().unwrap_or("unknown error")
        )
    }
}

fn arg_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Normalize a component payload into response text
///
/// Handles plain text, a mapping carrying a `result` key, and sequences of
/// either. For a sequence the first text-bearing element wins; failing that,
/// every element's string form is joined with single spaces.
pub fn unwrap_payload(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("result") {
            Some(inner) => unwrap_payload(inner),
            None => value.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .find_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => map
                    .get("result")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .unwrap_or_else(|| {
                items
                    .iter()
                    .map(text_form)
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
        other => other.to_string(),
    }
}

fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_plain_text() {
        assert_eq!(unwrap_payload(&json!("hello")), "hello");
    }

    #[test]
    fn unwrap_result_mapping() {
        assert_eq!(unwrap_payload(&json!({"result": "done"})), "done");
        assert_eq!(
            unwrap_payload(&json!({"result": {"result": "nested"}})),
            "nested"
        );
    }

    #[test]
    fn unwrap_sequence_prefers_first_text() {
        assert_eq!(unwrap_payload(&json!([42, "first", "second"])), "first");
        assert_eq!(
            unwrap_payload(&json!([{"result": "mapped"}, "later"])),
            "mapped"
        );
    }

    #[test]
    fn unwrap_sequence_joins_as_last_resort() {
        assert_eq!(unwrap_payload(&json!([1, 2, true])), "1 2 true");
    }

    #[test]
    fn registry_covers_every_tool_name() {
        let names: Vec<&str> = TOOLS.iter().map(|t| t.name).collect();
        for name in [
            "add_event",
            "view_events",
            "delete_event",
            "summarize_events",
            "oauth_login",
            "check_auth_status",
            "create_calendar_event",
            "export_ics",
            "oauth_logout",
            "handle_message",
            "get_consent_prompt",
        ] {
            assert!(names.contains(&name), "missing tool {}", name);
        }
    }
}
