//! Sequential page walking.
//!
//! Pages are requested one after another, starting at [`Query::page`], until a page
//! comes back with fewer records than [`Query::page_size`]. That short page (which may
//! be empty) is the last one.

use tracing::{debug, info, warn};

use crate::error::{AggregateError, Error};
use crate::query::Query;
use crate::response::Record;

/// Something that can turn a page URL into that page's records.
///
/// [`Client`](crate::Client) implements this over HTTP.
pub trait PageSource {
    fn fetch_page(&self, url: &str) -> Result<Vec<Record>, Error>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn fetch_page(&self, url: &str) -> Result<Vec<Record>, Error> {
        (**self).fetch_page(url)
    }
}

pub(crate) fn is_last_page(records: usize, page_size: u32) -> bool {
    records < page_size as usize
}

/// Fetches every page of `query` from `source` and concatenates the records in fetch
/// order.
///
/// The first failing request ends the run; the error carries what was collected so far.
pub fn aggregate<S: PageSource + ?Sized>(
    source: &S,
    base_url: &str,
    query: &Query,
) -> Result<Vec<Record>, AggregateError> {
    query
        .validate()
        .map_err(|e| AggregateError::new(query.page, e, Vec::new()))?;

    let mut records: Vec<Record> = Vec::new();
    let mut page = query.page;
    let mut fetched = 0u32;

    loop {
        let url = query.url_for_page(base_url, page);
        debug!(%url, page, "requesting page");

        let batch = match source.fetch_page(&url) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(
                    page,
                    partial = records.len(),
                    error = %e,
                    "aborting {} query",
                    query.endpoint
                );
                return Err(AggregateError::new(page, e, records));
            }
        };

        let count = batch.len();
        records.extend(batch);
        fetched += 1;
        debug!(page, count, total = records.len(), "page received");

        if is_last_page(count, query.page_size) {
            info!(
                pages = fetched,
                records = records.len(),
                "finished {} query",
                query.endpoint
            );
            return Ok(records);
        }

        page = match page.checked_add(1) {
            Some(next) => next,
            None => {
                let e = Error::InvalidQuery {
                    message: "page number overflow".to_string(),
                };
                return Err(AggregateError::new(page, e, records));
            }
        };
    }
}
