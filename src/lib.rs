pub mod analysis;
pub mod config;
pub mod document;
pub mod domain;
pub mod error;
pub mod language;
pub mod lsp;
pub mod references;

pub use analysis::{Annotation, reference_count_annotations};
pub use references::{IndexError, ReferenceIndex, ReferenceOrigin, ReferenceTarget};

// Re-export the main server implementation
pub use lsp::RefLens;
