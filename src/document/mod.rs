pub mod coordinates;
pub mod model;
pub mod store;

pub use coordinates::{PositionMapper, compute_line_starts};
pub use model::{Document, DocumentSnapshot};
pub use store::{DocumentHandle, DocumentStore};
