use libloading::{Library, Symbol};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tree_sitter::Language;

/// Loads tree-sitter grammars from shared libraries
///
/// Loaded libraries are kept for the lifetime of the loader; a `Language`
/// obtained from one must not outlive it.
#[derive(Default)]
pub struct ParserLoader {
    loaded_libraries: HashMap<PathBuf, Library>,
}

#[derive(Debug, Error)]
pub enum ParserLoadError {
    #[error("Failed to load library {}: {source}", .path.display())]
    Library {
        path: PathBuf,
        source: libloading::Error,
    },

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
}

impl ParserLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `tree_sitter_<lang_name>` from the library at `path`
    ///
    /// Dashes in the language name map to underscores (`c-sharp` resolves
    /// `tree_sitter_c_sharp`).
    pub fn load_language(
        &mut self,
        path: &Path,
        lang_name: &str,
    ) -> Result<Language, ParserLoadError> {
        let func_name = symbol_name(lang_name);

        let library = match self.loaded_libraries.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                // SAFETY: loading a tree-sitter grammar runs no initialisation
                // code beyond the dynamic linker's.
                let library =
                    unsafe { Library::new(path) }.map_err(|source| ParserLoadError::Library {
                        path: path.to_path_buf(),
                        source,
                    })?;
                entry.insert(library)
            }
        };

        // SAFETY: tree-sitter grammars export `const TSLanguage *tree_sitter_<lang>(void)`,
        // and `Language` is a transparent wrapper over that pointer.
        let language_fn: Symbol<unsafe extern "C" fn() -> Language> =
            unsafe { library.get(func_name.as_bytes()) }
                .map_err(|_| ParserLoadError::SymbolNotFound(func_name.clone()))?;

        Ok(unsafe { language_fn() })
    }

    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded_libraries.contains_key(path)
    }
}

fn symbol_name(lang_name: &str) -> String {
    format!("tree_sitter_{}", lang_name.replace('-', "_"))
}
