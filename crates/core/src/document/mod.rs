pub mod collection;
pub mod id;
pub mod model;
pub mod validate;

pub use collection::Collection;
pub use id::DocumentId;
pub use model::ContentDocument;
