//! Listing paginator
//!
//! Turns the page-at-a-time [`IRemoteStore::list`] call into one finite
//! sequence of descriptors.
//!
//! ## Design Notes
//!
//! - Each request carries the continuation token of the previous response.
//!   A missing or empty token ends the sequence.
//! - A failed page is not retried within the same cycle. The paginator logs
//!   it, stops, and hands back what it already accumulated together with the
//!   failure, so the caller decides whether the error is fatal.
//! - A token that comes back twice would loop forever; it is treated like
//!   a failed page.

use std::collections::HashSet;

use picsync_core::config::MAX_PAGE_SIZE;
use picsync_core::domain::{ListQuery, RemoteFileDescriptor, RemoteId};
use picsync_core::ports::IRemoteStore;
use tracing::{debug, warn};

/// Page that ended a listing early
#[derive(Debug)]
pub struct PageFailure {
    /// 1-based number of the page that failed
    pub page: u32,
    pub error: anyhow::Error,
}

/// Result of an exhaustive listing
#[derive(Debug, Default)]
pub struct Listing {
    /// Entries in the order the remote returned them
    pub entries: Vec<RemoteFileDescriptor>,
    /// Number of pages fetched successfully
    pub pages: u32,
    /// False when the listing stopped before the last page
    pub complete: bool,
    /// Set when a page request failed
    pub failure: Option<PageFailure>,
}

/// Walks all pages of a listing with a bounded page size
pub struct ListingPaginator<'a> {
    store: &'a dyn IRemoteStore,
    page_size: u32,
}

impl<'a> ListingPaginator<'a> {
    /// Creates a paginator; `page_size` is clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(store: &'a dyn IRemoteStore, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Lists every entry of `container_id` matching `query`
    #[tracing::instrument(skip(self, query), fields(container = %container_id, page_size = self.page_size))]
    pub async fn list_all(&self, container_id: &RemoteId, query: &ListQuery) -> Listing {
        let mut listing = Listing {
            complete: true,
            ..Listing::default()
        };
        let mut token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let page_number = listing.pages + 1;
            let page = match self
                .store
                .list(container_id, query, self.page_size, token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    warn!(
                        page = page_number,
                        error = %format!("{error:#}"),
                        "Listing page failed, continuing with partial results"
                    );
                    listing.complete = false;
                    listing.failure = Some(PageFailure {
                        page: page_number,
                        error,
                    });
                    break;
                }
            };

            let next = page.continuation().map(str::to_owned);
            debug!(page = page_number, entries = page.entries.len(), "Fetched listing page");
            listing.pages = page_number;
            listing.entries.extend(page.entries);

            match next {
                None => break,
                Some(next) => {
                    if !seen_tokens.insert(next.clone()) {
                        warn!(page = page_number, "Remote repeated a page token, stopping listing");
                        listing.complete = false;
                        listing.failure = Some(PageFailure {
                            page: page_number + 1,
                            error: anyhow::anyhow!("repeated page token '{next}'"),
                        });
                        break;
                    }
                    token = Some(next);
                }
            }
        }

        debug!(
            entries = listing.entries.len(),
            pages = listing.pages,
            complete = listing.complete,
            "Listing finished"
        );
        listing
    }
}
