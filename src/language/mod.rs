pub mod events;
pub mod parser_loader;
pub mod query_loader;
pub mod registry;

pub use events::{LanguageEvent, LanguageLogLevel};
pub use parser_loader::{ParserLoadError, ParserLoader};
pub use query_loader::QueryLoader;
pub use registry::{LanguageEntry, LanguageRegistry};
