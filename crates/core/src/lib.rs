//! Domain core for the advocacy content service.
//!
//! Content items live in an external document database and their media in
//! external object storage. This crate holds the content model, form
//! validation, the search and YouTube helpers, and [`service::ContentService`],
//! which runs the create/edit/delete flows against the [`store`] and
//! [`storage`] adapters.

pub mod document;
pub mod events;
pub mod media;
pub mod mutation;
pub mod pagination;
pub mod search;
pub mod service;
pub mod storage;
pub mod store;
pub mod youtube;
