/// Outcome messages from loading configured languages, forwarded to the client log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageEvent {
    pub level: LanguageLogLevel,
    pub message: String,
}

/// Log levels abstracted from LSP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageLogLevel {
    Error,
    Warning,
    Info,
}

impl LanguageEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LanguageLogLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: LanguageLogLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LanguageLogLevel::Error,
            message: message.into(),
        }
    }
}
