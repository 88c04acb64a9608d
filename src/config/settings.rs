use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A locals query source: a file on disk or inline query text
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum QueryItem {
    Path { path: String },
    Query { query: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfig {
    /// Parser library; when absent `<searchPath>/parser/<lang>.<ext>` is tried
    pub library: Option<String>,
    /// File extensions handled by this language
    pub filetypes: Option<Vec<String>>,
    /// Locals queries; when absent `<searchPath>/queries/<lang>/locals.scm` is tried
    pub locals: Option<Vec<QueryItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeLensConfig {
    pub reference_count: Option<bool>,
}

/// One configuration layer as written in `reflens.toml` or sent by the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflensSettings {
    pub search_paths: Option<Vec<String>>,
    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,
    pub code_lens: Option<CodeLensConfig>,
}

/// Settings after all layers are merged, with defaults filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSettings {
    pub search_paths: Vec<String>,
    pub languages: HashMap<String, LanguageConfig>,
    pub reference_count_lens: bool,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            languages: HashMap::new(),
            reference_count_lens: true,
        }
    }
}

impl From<ReflensSettings> for WorkspaceSettings {
    fn from(settings: ReflensSettings) -> Self {
        Self {
            search_paths: settings.search_paths.unwrap_or_default(),
            languages: settings.languages,
            reference_count_lens: settings
                .code_lens
                .and_then(|code_lens| code_lens.reference_count)
                .unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_settings() {
        let toml_str = r#"
            searchPaths = ["/runtime"]

            [languages.rust]
            library = "/parsers/rust.so"
            filetypes = ["rs"]
            locals = [
                { path = "/queries/rust/locals.scm" },
                { query = "(identifier) @local.reference" },
            ]

            [codeLens]
            referenceCount = false
        "#;

        let settings: ReflensSettings = toml::from_str(toml_str).unwrap();

        assert_eq!(settings.search_paths, Some(vec!["/runtime".to_string()]));
        let rust = &settings.languages["rust"];
        assert_eq!(rust.library.as_deref(), Some("/parsers/rust.so"));
        assert_eq!(rust.filetypes, Some(vec!["rs".to_string()]));
        assert_eq!(
            rust.locals,
            Some(vec![
                QueryItem::Path {
                    path: "/queries/rust/locals.scm".to_string()
                },
                QueryItem::Query {
                    query: "(identifier) @local.reference".to_string()
                },
            ])
        );
        assert_eq!(
            settings.code_lens.and_then(|c| c.reference_count),
            Some(false)
        );
    }

    #[test]
    fn test_parse_json_initialization_options() {
        let value = serde_json::json!({
            "languages": { "lua": { "filetypes": ["lua"] } },
            "codeLens": { "referenceCount": true }
        });

        let settings: ReflensSettings = serde_json::from_value(value).unwrap();

        assert!(settings.search_paths.is_none());
        assert_eq!(
            settings.languages["lua"].filetypes,
            Some(vec!["lua".to_string()])
        );
    }

    #[test]
    fn test_workspace_settings_defaults() {
        let workspace = WorkspaceSettings::from(ReflensSettings::default());
        assert!(workspace.search_paths.is_empty());
        assert!(workspace.reference_count_lens);
    }
}
