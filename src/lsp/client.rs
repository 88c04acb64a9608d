//! Client-facing communication: capability checks and log forwarding.

use serde_json::Value;
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{ClientCapabilities, MessageType};

use crate::language::{LanguageEvent, LanguageLogLevel};
use crate::lsp::{SettingsEvent, SettingsEventKind};

/// Key under `capabilities.experimental` naming the client's
/// show-references command.
pub(crate) const SHOW_REFERENCES_COMMAND_KEY: &str = "showReferencesCommandId";

/// Command id the client runs when a reference-count lens is clicked.
///
/// A missing, non-string or empty value means the client cannot show
/// references, and no lenses are produced.
pub(crate) fn show_references_command_id(caps: &ClientCapabilities) -> Option<String> {
    caps.experimental
        .as_ref()
        .and_then(|experimental| experimental.get(SHOW_REFERENCES_COMMAND_KEY))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Wrapper around the LSP client for forwarding log events.
#[derive(Clone, Debug)]
pub(crate) struct ClientNotifier {
    client: Client,
}

impl ClientNotifier {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    pub(crate) async fn log_info(&self, message: impl Into<String>) {
        self.client
            .log_message(MessageType::INFO, message.into())
            .await;
    }

    pub(crate) async fn log_warning(&self, message: impl Into<String>) {
        self.client
            .log_message(MessageType::WARNING, message.into())
            .await;
    }

    pub(crate) async fn log_language_events(&self, events: &[LanguageEvent]) {
        for event in events {
            let message_type = match event.level {
                LanguageLogLevel::Error => MessageType::ERROR,
                LanguageLogLevel::Warning => MessageType::WARNING,
                LanguageLogLevel::Info => MessageType::INFO,
            };
            self.client
                .log_message(message_type, event.message.clone())
                .await;
        }
    }

    pub(crate) async fn log_settings_events(&self, events: &[SettingsEvent]) {
        for event in events {
            let message_type = match event.kind {
                SettingsEventKind::Info => MessageType::INFO,
                SettingsEventKind::Warning => MessageType::WARNING,
            };
            self.client
                .log_message(message_type, event.message.clone())
                .await;
        }
    }
}
