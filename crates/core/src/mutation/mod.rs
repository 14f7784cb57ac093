pub mod types;

pub use types::{CreateRequest, MutationAction, MutationResult, UpdateRequest};
