//! # CRUD Dispatcher
//!
//! Validates requests against the inferred schema, performs them through the
//! storage driver and normalizes results: the store's native id field is
//! surfaced as `id`, and store errors are classified into the gateway's
//! error kinds.

mod dispatcher;
mod pager;
mod params;
mod response;

pub use dispatcher::CrudDispatcher;
pub use pager::{DocumentPager, Page};
pub use params::{ListParams, DEFAULT_LIMIT, MAX_LIMIT};
pub use response::{CollectionsResponse, DeleteResponse, ListResponse};
