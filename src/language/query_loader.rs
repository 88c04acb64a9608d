use crate::config::QueryItem;
use crate::error::{LspError, LspResult};
use path_clean::PathClean;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Language, Query};

pub const LOCALS_QUERY_FILE: &str = "locals.scm";

const LIBRARY_EXTENSIONS: [&str; 3] = ["so", "dylib", "dll"];

/// Loads tree-sitter queries from configuration and search paths
pub struct QueryLoader;

impl QueryLoader {
    /// Concatenate query items in order, reading `path` items from disk
    pub fn load_query_items(items: &[QueryItem]) -> LspResult<String> {
        let mut combined_query = String::new();

        for item in items {
            match item {
                QueryItem::Path { path } => {
                    let normalized_path = PathBuf::from(path).clean();
                    let content = fs::read_to_string(&normalized_path).map_err(|e| {
                        LspError::query(format!(
                            "Failed to read query file {}: {e}",
                            normalized_path.display()
                        ))
                    })?;
                    combined_query.push_str(&content);
                }
                QueryItem::Query { query } => combined_query.push_str(query),
            }
            combined_query.push('\n');
        }

        Ok(combined_query)
    }

    /// Find `<base>/queries/<lang>/<file_name>` in the first search path that has it
    pub fn find_query_file(
        search_paths: &[String],
        lang_name: &str,
        file_name: &str,
    ) -> Option<PathBuf> {
        search_paths
            .iter()
            .map(|base| {
                Path::new(base)
                    .join("queries")
                    .join(lang_name)
                    .join(file_name)
                    .clean()
            })
            .find(|candidate| candidate.exists())
    }

    /// Locals query source for a language
    ///
    /// Configured items win; otherwise `locals.scm` is looked up in the
    /// search paths. `Ok(None)` means the language has no locals query.
    pub fn locals_source(
        items: Option<&[QueryItem]>,
        search_paths: &[String],
        lang_name: &str,
    ) -> LspResult<Option<String>> {
        if let Some(items) = items {
            return Self::load_query_items(items).map(Some);
        }

        match Self::find_query_file(search_paths, lang_name, LOCALS_QUERY_FILE) {
            Some(path) => fs::read_to_string(&path).map(Some).map_err(|e| {
                LspError::query(format!(
                    "Failed to read query file {}: {e}",
                    path.display()
                ))
            }),
            None => Ok(None),
        }
    }

    pub fn parse_query(language: &Language, query_str: &str) -> LspResult<Query> {
        Query::new(language, query_str)
            .map_err(|e| LspError::query(format!("Failed to parse query: {e}")))
    }

    /// Resolve the parser library for a language
    ///
    /// An explicit `library` is used as is (normalized); otherwise the first
    /// existing `<base>/parser/<lang>.{so,dylib,dll}` wins.
    pub fn resolve_library_path(
        library: Option<&str>,
        language: &str,
        search_paths: &[String],
    ) -> Option<PathBuf> {
        if let Some(lib) = library {
            return Some(PathBuf::from(lib).clean());
        }

        search_paths.iter().find_map(|base| {
            LIBRARY_EXTENSIONS
                .iter()
                .map(|ext| {
                    Path::new(base)
                        .join("parser")
                        .join(format!("{language}.{ext}"))
                        .clean()
                })
                .find(|candidate| candidate.exists())
        })
    }
}
