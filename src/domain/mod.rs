pub mod position;

pub use position::{SourcePos, SourceRange};
