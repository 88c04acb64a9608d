//! Programmed defaults, the lowest configuration layer.

use super::settings::{CodeLensConfig, ReflensSettings};

/// Returns the default settings.
pub fn default_settings() -> ReflensSettings {
    ReflensSettings {
        search_paths: Some(default_search_paths()),
        languages: Default::default(),
        code_lens: Some(CodeLensConfig {
            reference_count: Some(true),
        }),
    }
}

/// Platform data directory for parsers and queries
/// (`~/.local/share/reflens` on Linux). Empty when it cannot be determined.
pub fn default_search_paths() -> Vec<String> {
    dirs::data_dir()
        .map(|dir| vec![dir.join("reflens").to_string_lossy().into_owned()])
        .unwrap_or_default()
}
