use super::events::LanguageEvent;
use super::parser_loader::ParserLoader;
use super::query_loader::QueryLoader;
use crate::config::{LanguageConfig, WorkspaceSettings};
use crate::error::{LockResultExt, LspResult};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tree_sitter::{Language, Parser, Query};
use url::Url;

/// A loaded grammar and its compiled locals query
#[derive(Clone)]
pub struct LanguageEntry {
    pub language: Language,
    /// `None` when the language has no locals query; such documents get no lenses
    pub locals: Option<Arc<Query>>,
}

/// Registry of loaded tree-sitter languages, keyed by language name
#[derive(Default)]
pub struct LanguageRegistry {
    languages: Mutex<HashMap<String, LanguageEntry>>,
    filetypes: Mutex<HashMap<String, String>>,
    parser_loader: Mutex<ParserLoader>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already loaded language, compiling its locals query
    pub fn register_language(
        &self,
        name: &str,
        language: Language,
        locals_source: Option<&str>,
    ) -> LspResult<()> {
        let locals = locals_source
            .map(|source| QueryLoader::parse_query(&language, source).map(Arc::new))
            .transpose()?;

        self.languages
            .lock()
            .recover_poison("LanguageRegistry::register_language")
            .insert(name.to_string(), LanguageEntry { language, locals });
        Ok(())
    }

    /// Route files with extension `filetype` to `language`
    pub fn register_filetype(&self, filetype: &str, language: &str) {
        self.filetypes
            .lock()
            .recover_poison("LanguageRegistry::register_filetype")
            .insert(filetype.to_string(), language.to_string());
    }

    /// Load every configured language; failures only skip that language
    pub fn apply_settings(&self, settings: &WorkspaceSettings) -> Vec<LanguageEvent> {
        let mut names: Vec<&String> = settings.languages.keys().collect();
        names.sort();

        let mut events = Vec::new();
        for name in names {
            let config = &settings.languages[name];
            self.load_language(name, config, &settings.search_paths, &mut events);
        }
        events
    }

    fn load_language(
        &self,
        name: &str,
        config: &LanguageConfig,
        search_paths: &[String],
        events: &mut Vec<LanguageEvent>,
    ) {
        for filetype in config.filetypes.iter().flatten() {
            self.register_filetype(filetype, name);
        }

        let Some(library) =
            QueryLoader::resolve_library_path(config.library.as_deref(), name, search_paths)
        else {
            events.push(LanguageEvent::warning(format!(
                "No parser library found for {name}"
            )));
            return;
        };

        let language = match self
            .parser_loader
            .lock()
            .recover_poison("LanguageRegistry::load_language")
            .load_language(&library, name)
        {
            Ok(language) => language,
            Err(err) => {
                warn!(target: "reflens::language", "{err}");
                events.push(LanguageEvent::error(format!(
                    "Failed to load parser for {name}: {err}"
                )));
                return;
            }
        };

        let source = match QueryLoader::locals_source(config.locals.as_deref(), search_paths, name)
        {
            Ok(source) => source,
            Err(err) => {
                events.push(LanguageEvent::warning(format!(
                    "Failed to load locals query for {name}: {err}"
                )));
                None
            }
        };
        if source.is_none() {
            events.push(LanguageEvent::warning(format!(
                "No locals query for {name}; reference lenses disabled"
            )));
        }

        self.register_or_keep_grammar(name, language, source.as_deref(), &library, events);
    }

    /// Register `language`; an invalid locals query drops only the query
    fn register_or_keep_grammar(
        &self,
        name: &str,
        language: Language,
        source: Option<&str>,
        library: &Path,
        events: &mut Vec<LanguageEvent>,
    ) {
        match self.register_language(name, language.clone(), source) {
            Ok(()) => events.push(LanguageEvent::info(format!(
                "Loaded language {name} from {}",
                library.display()
            ))),
            Err(err) => {
                // Keep the grammar so documents still parse.
                events.push(LanguageEvent::warning(format!(
                    "Invalid locals query for {name}: {err}"
                )));
                if let Err(err) = self.register_language(name, language, None) {
                    warn!(target: "reflens::language", "Failed to register {name}: {err}");
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<LanguageEntry> {
        self.languages
            .lock()
            .recover_poison("LanguageRegistry::get")
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.languages
            .lock()
            .recover_poison("LanguageRegistry::contains")
            .contains_key(name)
    }

    /// Language for a document: file extension first, then the client's languageId
    pub fn language_for(&self, uri: &Url, language_id: Option<&str>) -> Option<String> {
        let by_extension = Path::new(uri.path())
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| {
                self.filetypes
                    .lock()
                    .recover_poison("LanguageRegistry::language_for")
                    .get(ext)
                    .cloned()
            });

        let detected = by_extension
            .or_else(|| language_id.map(str::to_string))
            .filter(|name| self.contains(name));
        if detected.is_none() {
            debug!(target: "reflens::language", "No language registered for {uri}");
        }
        detected
    }

    pub fn create_parser(&self, name: &str) -> Option<Parser> {
        let entry = self.get(name)?;
        let mut parser = Parser::new();
        match parser.set_language(&entry.language) {
            Ok(()) => Some(parser),
            Err(err) => {
                warn!(target: "reflens::language", "Incompatible grammar for {name}: {err}");
                None
            }
        }
    }

    pub fn locals_query(&self, name: &str) -> Option<Arc<Query>> {
        self.get(name)?.locals
    }
}
