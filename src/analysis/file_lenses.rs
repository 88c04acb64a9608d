//! Reference lenses for a file on disk, outside of an editor session.

use std::fs;
use std::path::Path;

use tower_lsp_server::ls_types::CodeLens;
use url::Url;

use crate::analysis::code_lens::reference_count_annotations;
use crate::error::{LspError, LspResult};
use crate::language::LanguageRegistry;
use crate::references::LocalsIndex;

/// Parse `path` with its registered language and compute its reference lenses.
///
/// `language` overrides detection by file extension.
pub fn lenses_for_file(
    registry: &LanguageRegistry,
    path: &Path,
    language: Option<&str>,
    command_id: &str,
) -> LspResult<Vec<CodeLens>> {
    let path = fs::canonicalize(path)?;
    let text = fs::read_to_string(&path)?;
    let uri = Url::from_file_path(&path)
        .map_err(|()| LspError::internal(format!("Not a file path: {}", path.display())))?;

    let language_name = match language {
        Some(name) if registry.contains(name) => name.to_string(),
        Some(name) => return Err(LspError::language_not_found(name)),
        None => registry
            .language_for(&uri, None)
            .ok_or_else(|| LspError::language_not_found(path.display().to_string()))?,
    };

    let mut parser = registry
        .create_parser(&language_name)
        .ok_or_else(|| LspError::parser_not_found(&language_name))?;
    let locals = registry
        .locals_query(&language_name)
        .ok_or_else(|| LspError::query(format!("No locals query for {language_name}")))?;
    let tree = parser
        .parse(&text, None)
        .ok_or_else(|| LspError::internal(format!("Failed to parse {}", path.display())))?;

    let index = LocalsIndex::build(uri.clone(), &text, &tree, &locals);
    Ok(reference_count_annotations(&index, &uri, Some(command_id))
        .into_iter()
        .map(CodeLens::from)
        .collect())
}
