pub mod factory;
pub mod local;
pub mod remote;
pub mod types;

pub use factory::{SearchBackend, SearchIndexFactory};
pub use types::{SearchDocument, SearchError, SearchHit, SearchIndex, SearchKind, SearchQuery};
