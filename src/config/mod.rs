pub mod defaults;
pub mod settings;
pub mod user;

pub use settings::{CodeLensConfig, LanguageConfig, QueryItem, ReflensSettings, WorkspaceSettings};
pub use user::{UserConfigError, UserConfigResult, load_user_config, user_config_path};

use std::collections::HashMap;

/// Merge configuration layers in order; later layers take precedence.
///
/// `merge_all(&[defaults, user, project, session])`
pub fn merge_all(configs: &[Option<ReflensSettings>]) -> Option<ReflensSettings> {
    configs.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two layers, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<ReflensSettings>,
    primary: Option<ReflensSettings>,
) -> Option<ReflensSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) | (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(ReflensSettings {
            search_paths: primary.search_paths.or(fallback.search_paths),
            languages: merge_languages(fallback.languages, primary.languages),
            code_lens: match (fallback.code_lens, primary.code_lens) {
                (Some(fallback), Some(primary)) => Some(CodeLensConfig {
                    reference_count: primary.reference_count.or(fallback.reference_count),
                }),
                (fallback, primary) => primary.or(fallback),
            },
        }),
    }
}

fn merge_languages(
    mut fallback: HashMap<String, LanguageConfig>,
    primary: HashMap<String, LanguageConfig>,
) -> HashMap<String, LanguageConfig> {
    for (key, primary_config) in primary {
        fallback
            .entry(key)
            .and_modify(|fallback_config| {
                fallback_config.library = primary_config
                    .library
                    .clone()
                    .or(fallback_config.library.take());
                fallback_config.filetypes = primary_config
                    .filetypes
                    .clone()
                    .or(fallback_config.filetypes.take());
                fallback_config.locals = primary_config
                    .locals
                    .clone()
                    .or(fallback_config.locals.take());
            })
            .or_insert(primary_config);
    }
    fallback
}
