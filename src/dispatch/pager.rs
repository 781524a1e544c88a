//! Lazy, restartable paging over a collection listing

use serde_json::{Map, Value};

use super::dispatcher::CrudDispatcher;
use super::params::ListParams;
use crate::context::RequestContext;
use crate::errors::GatewayResult;

/// One window of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub documents: Vec<Map<String, Value>>,
    pub limit: usize,
    pub offset: usize,
    /// Offset of the next page, `None` once the listing is exhausted
    pub next_offset: Option<usize>,
}

/// Walks a listing one page at a time.
///
/// Only the current page is held in memory. The pager is finite: it stops
/// once the store returns a short page. `restart` rewinds to the first
/// offset, re-reading the collection as it is at that time.
pub struct DocumentPager<'a> {
    dispatcher: &'a CrudDispatcher,
    db: String,
    collection: String,
    params: ListParams,
    start: usize,
    next: Option<usize>,
}

impl<'a> DocumentPager<'a> {
    pub(crate) fn new(
        dispatcher: &'a CrudDispatcher,
        db: &str,
        collection: &str,
        params: ListParams,
    ) -> Self {
        let start = params.offset;
        Self {
            dispatcher,
            db: db.to_string(),
            collection: collection.to_string(),
            params,
            start,
            next: Some(start),
        }
    }

    /// Fetch the next page; `Ok(None)` once exhausted
    pub async fn next_page(&mut self, ctx: &RequestContext) -> GatewayResult<Option<Page>> {
        let Some(offset) = self.next else {
            return Ok(None);
        };
        let params = self.params.clone().with_offset(offset);
        let page = self
            .dispatcher
            .list(&self.db, &self.collection, &params, ctx)
            .await?;
        self.next = page.next_offset;
        Ok(Some(page))
    }

    /// Rewind to the first page
    pub fn restart(&mut self) {
        self.next = Some(self.start);
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}
