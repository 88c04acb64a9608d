use crate::config::{
    ReflensSettings, WorkspaceSettings, defaults::default_settings, load_user_config, merge_all,
    user::CONFIG_FILE_NAME,
};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEventKind {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsEvent {
    pub kind: SettingsEventKind,
    pub message: String,
}

impl SettingsEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Warning,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsSource {
    InitializationOptions,
}

impl SettingsSource {
    fn description(self) -> &'static str {
        match self {
            SettingsSource::InitializationOptions => "initialization options",
        }
    }
}

#[derive(Default, Debug)]
pub struct SettingsLoadOutcome {
    pub settings: Option<WorkspaceSettings>,
    pub events: Vec<SettingsEvent>,
}

/// Load settings from every layer: defaults < user < project < client override
pub fn load_settings(
    root_path: Option<&Path>,
    override_settings: Option<(SettingsSource, Value)>,
) -> SettingsLoadOutcome {
    let mut events = Vec::new();

    let defaults = Some(default_settings());
    let user_config = load_user_config_with_events(&mut events);
    let project_settings = load_project_settings(root_path, &mut events);
    let override_settings = override_settings
        .and_then(|(source, value)| parse_override_settings(source, value, &mut events));

    let merged = merge_all(&[defaults, user_config, project_settings, override_settings]);
    let settings = merged.map(WorkspaceSettings::from);

    SettingsLoadOutcome { settings, events }
}

fn load_user_config_with_events(events: &mut Vec<SettingsEvent>) -> Option<ReflensSettings> {
    match load_user_config() {
        Ok(Some(settings)) => {
            events.push(SettingsEvent::info("Loaded user config"));
            Some(settings)
        }
        Ok(None) => None,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to load user config: {err}"
            )));
            None
        }
    }
}

fn load_project_settings(
    root_path: Option<&Path>,
    events: &mut Vec<SettingsEvent>,
) -> Option<ReflensSettings> {
    let config_path = root_path?.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return None;
    }

    events.push(SettingsEvent::info(format!(
        "Found config file: {}",
        config_path.display()
    )));

    let contents = match fs::read_to_string(&config_path) {
        Ok(contents) => contents,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to read {CONFIG_FILE_NAME}: {err}"
            )));
            return None;
        }
    };

    match toml::from_str::<ReflensSettings>(&contents) {
        Ok(settings) => {
            events.push(SettingsEvent::info(format!(
                "Successfully loaded {CONFIG_FILE_NAME}"
            )));
            Some(settings)
        }
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to parse {CONFIG_FILE_NAME}: {err}"
            )));
            None
        }
    }
}

fn parse_override_settings(
    source: SettingsSource,
    value: Value,
    events: &mut Vec<SettingsEvent>,
) -> Option<ReflensSettings> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<ReflensSettings>(value) {
        Ok(settings) => {
            events.push(SettingsEvent::info(format!(
                "Parsed {} as reflens settings",
                source.description()
            )));
            Some(settings)
        }
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to parse {}: {err}",
                source.description()
            )));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    /// Point XDG_CONFIG_HOME at `dir` for the duration of `f`
    fn with_user_config_dir<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
        let original_xdg = env::var_os("XDG_CONFIG_HOME");
        // SAFETY: #[serial(xdg_env)] prevents concurrent modification of XDG_CONFIG_HOME
        unsafe {
            env::set_var("XDG_CONFIG_HOME", dir);
        }
        let result = f();
        // SAFETY: #[serial(xdg_env)] prevents concurrent modification of XDG_CONFIG_HOME
        unsafe {
            match original_xdg {
                Some(val) => env::set_var("XDG_CONFIG_HOME", val),
                None => env::remove_var("XDG_CONFIG_HOME"),
            }
        }
        result
    }

    fn write_user_config(dir: &TempDir, contents: &str) {
        let config_dir = dir.path().join("reflens");
        fs::create_dir_all(&config_dir).expect("failed to create config dir");
        fs::write(config_dir.join(CONFIG_FILE_NAME), contents).expect("failed to write user config");
    }

    #[test]
    #[serial(xdg_env)]
    fn test_load_settings_merges_user_and_project() {
        let user_config_dir = TempDir::new().expect("failed to create user config temp dir");
        let project_dir = TempDir::new().expect("failed to create project temp dir");

        write_user_config(
            &user_config_dir,
            r#"
            searchPaths = ["/user/search/path"]
            [codeLens]
            referenceCount = true
            "#,
        );
        fs::write(
            project_dir.path().join(CONFIG_FILE_NAME),
            "[codeLens]\nreferenceCount = false\n",
        )
        .expect("failed to write project config");

        let outcome = with_user_config_dir(user_config_dir.path(), || {
            load_settings(Some(project_dir.path()), None)
        });

        let settings = outcome.settings.expect("settings should be loaded");
        assert_eq!(settings.search_paths, vec!["/user/search/path".to_string()]);
        assert!(
            !settings.reference_count_lens,
            "project config should override user config"
        );
        assert!(
            outcome
                .events
                .iter()
                .any(|e| e.kind == SettingsEventKind::Info && e.message.contains("user config"))
        );
    }

    #[test]
    #[serial(xdg_env)]
    fn test_load_settings_override_has_highest_precedence() {
        let user_config_dir = TempDir::new().expect("failed to create user config temp dir");
        let project_dir = TempDir::new().expect("failed to create project temp dir");
        fs::write(
            project_dir.path().join(CONFIG_FILE_NAME),
            "[codeLens]\nreferenceCount = false\n",
        )
        .expect("failed to write project config");

        let override_json = serde_json::json!({ "codeLens": { "referenceCount": true } });
        let outcome = with_user_config_dir(user_config_dir.path(), || {
            load_settings(
                Some(project_dir.path()),
                Some((SettingsSource::InitializationOptions, override_json)),
            )
        });

        let settings = outcome.settings.expect("settings should be loaded");
        assert!(settings.reference_count_lens);
    }

    #[test]
    #[serial(xdg_env)]
    fn test_load_settings_reports_invalid_project_config() {
        let user_config_dir = TempDir::new().expect("failed to create user config temp dir");
        let project_dir = TempDir::new().expect("failed to create project temp dir");
        fs::write(project_dir.path().join(CONFIG_FILE_NAME), "searchPaths = 1\n")
            .expect("failed to write project config");

        let outcome = with_user_config_dir(user_config_dir.path(), || {
            load_settings(Some(project_dir.path()), None)
        });

        assert!(outcome.events.iter().any(|e| {
            e.kind == SettingsEventKind::Warning
                && e.message.starts_with("Failed to parse reflens.toml")
        }));
        let settings = outcome.settings.expect("defaults still apply");
        assert!(settings.reference_count_lens);
    }

    #[test]
    #[serial(xdg_env)]
    fn test_load_settings_reports_invalid_initialization_options() {
        let user_config_dir = TempDir::new().expect("failed to create user config temp dir");

        let outcome = with_user_config_dir(user_config_dir.path(), || {
            load_settings(
                None,
                Some((
                    SettingsSource::InitializationOptions,
                    serde_json::json!({ "searchPaths": "not-a-list" }),
                )),
            )
        });

        assert!(outcome.events.iter().any(|e| {
            e.kind == SettingsEventKind::Warning
                && e.message.contains("initialization options")
        }));
    }
}
