//! # Response Formatting
//!
//! Response bodies for the gateway's HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::pager::Page;

/// List response with pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub data: Vec<Map<String, Value>>,
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
    /// Offset of the next page; `null` on the last page
    pub next_offset: Option<usize>,
}

impl From<Page> for ListResponse {
    fn from(page: Page) -> Self {
        Self {
            count: page.documents.len(),
            data: page.documents,
            limit: page.limit,
            offset: page.offset,
            next_offset: page.next_offset,
        }
    }
}

/// Delete response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: String,
}

impl DeleteResponse {
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            deleted: true,
            id: id.into(),
        }
    }
}

/// Collection listing response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsResponse {
    pub database: String,
    pub collections: Vec<String>,
}
