use crate::document::Document;
use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use std::ops::Deref;
use tree_sitter::{InputEdit, Tree};
use url::Url;

// The central store for all open documents.
pub struct DocumentStore {
    documents: DashMap<Url, Document>,
}

pub struct DocumentHandle<'a> {
    inner: Ref<'a, Url, Document>,
}

impl<'a> Deref for DocumentHandle<'a> {
    type Target = Document;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, uri: Url, text: String, version: i32, language_id: Option<String>) {
        self.documents
            .insert(uri, Document::open(text, version, language_id));
    }

    pub fn get(&self, uri: &Url) -> Option<DocumentHandle<'_>> {
        self.documents
            .get(uri)
            .map(|inner| DocumentHandle { inner })
    }

    /// Store new text, and the tree parsed from it when parsing succeeded.
    ///
    /// Unknown documents are ignored: a change can race with `didClose`.
    pub fn update_document(&self, uri: &Url, text: String, version: Option<i32>, tree: Option<Tree>) {
        let Some(mut doc) = self.documents.get_mut(uri) else {
            log::debug!(target: "reflens::document", "Ignoring update for closed document {}", uri);
            return;
        };
        match tree {
            Some(tree) => doc.update_tree_and_text(tree, text),
            None => doc.update_text(text),
        }
        if version.is_some() {
            doc.set_version(version);
        }
    }

    /// Get the existing tree with edits applied, for incremental parsing.
    /// The store itself is not modified.
    pub fn get_edited_tree(&self, uri: &Url, edits: &[InputEdit]) -> Option<Tree> {
        self.documents.get(uri).and_then(|doc| {
            doc.tree().map(|tree| {
                let mut tree = tree.clone();
                for edit in edits {
                    tree.edit(edit);
                }
                tree
            })
        })
    }

    pub fn remove(&self, uri: &Url) -> Option<Document> {
        self.documents.remove(uri).map(|(_, doc)| doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_rust(text: &str, old: Option<&Tree>) -> Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        parser.parse(text, old).unwrap()
    }

    #[test]
    fn test_open_and_get_document() {
        let store = DocumentStore::new();
        let uri = Url::parse("file:///test.rs").unwrap();
        store.open(uri.clone(), "fn main() {}".to_string(), 1, Some("rust".to_string()));

        let doc = store.get(&uri).unwrap();
        assert_eq!(doc.text(), "fn main() {}");
        assert_eq!(doc.version(), Some(1));
        assert_eq!(doc.language_id(), Some("rust"));
    }

    #[test]
    fn test_snapshot_after_parse() {
        let store = DocumentStore::new();
        let uri = Url::parse("file:///test.rs").unwrap();
        store.open(uri.clone(), "let x = 1;".to_string(), 1, None);
        assert!(store.get(&uri).unwrap().snapshot().is_none());

        let tree = parse_rust("let x = 2;", None);
        store.update_document(&uri, "let x = 2;".to_string(), Some(2), Some(tree));

        let snapshot = store.get(&uri).and_then(|doc| doc.snapshot()).unwrap();
        assert_eq!(snapshot.text, "let x = 2;");
        assert_eq!(store.get(&uri).unwrap().version(), Some(2));
    }

    #[test]
    fn test_update_unknown_document_is_ignored() {
        let store = DocumentStore::new();
        let uri = Url::parse("file:///gone.rs").unwrap();
        store.update_document(&uri, "x".to_string(), Some(3), None);
        assert!(store.get(&uri).is_none());
    }

    #[test]
    fn test_remove_document() {
        let store = DocumentStore::new();
        let uri = Url::parse("file:///test.rs").unwrap();
        store.open(uri.clone(), String::new(), 1, None);
        assert!(store.remove(&uri).is_some());
        assert!(store.get(&uri).is_none());
    }
}
