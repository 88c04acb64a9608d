use tree_sitter::Tree;

/// An open document: text, LSP version, language and latest syntax tree
pub struct Document {
    text: String,
    version: Option<i32>,
    language_id: Option<String>,
    tree: Option<Tree>,
}

/// Immutable copy of a document taken at request start.
///
/// Holding a snapshot never blocks writers on the document store.
#[derive(Clone)]
pub struct DocumentSnapshot {
    pub text: String,
    pub language_id: Option<String>,
    pub tree: Tree,
}

impl Document {
    /// Create a new document with version and language
    pub fn open(text: String, version: i32, language_id: Option<String>) -> Self {
        Self {
            text,
            version: Some(version),
            language_id,
            tree: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> Option<i32> {
        self.version
    }

    pub fn set_version(&mut self, version: Option<i32>) {
        self.version = version;
    }

    pub fn language_id(&self) -> Option<&str> {
        self.language_id.as_deref()
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Replace the text. The tree is dropped until the caller reparses.
    pub fn update_text(&mut self, text: String) {
        self.text = text;
        self.tree = None;
    }

    /// Replace text and tree together after a successful parse
    pub fn update_tree_and_text(&mut self, tree: Tree, text: String) {
        self.text = text;
        self.tree = Some(tree);
    }

    /// Copy out what a request needs. `None` until the document has been parsed.
    pub fn snapshot(&self) -> Option<DocumentSnapshot> {
        Some(DocumentSnapshot {
            text: self.text.clone(),
            language_id: self.language_id.clone(),
            tree: self.tree.clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_rust(text: &str) -> Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        parser.parse(text, None).unwrap()
    }

    #[test]
    fn test_document_creation() {
        let doc = Document::open("hello world".to_string(), 3, None);
        assert_eq!(doc.text(), "hello world");
        assert_eq!(doc.version(), Some(3));
        assert!(doc.tree().is_none());
    }

    #[test]
    fn test_snapshot_requires_tree() {
        let mut doc = Document::open("fn main() {}".to_string(), 1, Some("rust".to_string()));
        assert!(doc.snapshot().is_none());

        doc.update_tree_and_text(parse_rust("fn main() {}"), "fn main() {}".to_string());
        let snapshot = doc.snapshot().expect("parsed document has a snapshot");
        assert_eq!(snapshot.text, "fn main() {}");
        assert_eq!(snapshot.language_id.as_deref(), Some("rust"));
    }

    #[test]
    fn test_update_text_drops_tree() {
        let mut doc = Document::open("fn a() {}".to_string(), 1, None);
        doc.update_tree_and_text(parse_rust("fn a() {}"), "fn a() {}".to_string());
        doc.update_text("fn b() {}".to_string());
        assert_eq!(doc.text(), "fn b() {}");
        assert!(doc.tree().is_none());
    }
}
