//! Lazy offset/limit pagination.
//!
//! List and get endpoints return at most `limit` items starting at
//! `offset`. [`paginate`] wraps such a fetch so that a page which came back
//! full carries a continuation for the next page, and [`Page::expand`]
//! turns the first page into a lazy iterator over the complete result.
//!
//! A page is considered final only when it holds fewer than `limit` items.
//! Server-reported totals are never consulted, so a result whose size is
//! an exact multiple of `limit` costs one extra (empty) fetch.
//!
//! Pages are strictly sequential: the continuation for page N+1 exists
//! only once page N has resolved, and it is invoked only when the consumer
//! walks past page N's last item.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use quiver_core::{Error, Result};
use tracing::debug;

use crate::deferred::{Deferred, Resolvable};

/// Offset/limit window of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Index of the first item
    pub offset: usize,
    /// Maximum number of items
    pub limit: usize,
}

impl PageRequest {
    /// Window starting at `offset`.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// First window of size `limit`.
    pub fn first(limit: usize) -> Self {
        Self::new(0, limit)
    }

    /// The window directly after this one.
    pub fn next(&self) -> Self {
        Self::new(self.offset + self.limit, self.limit)
    }
}

type Continuation<T> = Arc<dyn Fn() -> Deferred<Page<T>> + Send + Sync>;

/// One fetched page: its items, plus a continuation when more may follow.
pub struct Page<T> {
    items: Vec<T>,
    request: Option<PageRequest>,
    next: Option<Continuation<T>>,
}

impl<T: Clone> Clone for Page<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            request: self.request,
            next: self.next.clone(),
        }
    }
}

impl<T: Resolvable> Page<T> {
    /// A page with no continuation (e.g. an unpaginated read).
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            request: None,
            next: None,
        }
    }

    /// Items on this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, keeping only its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The window this page was fetched with, if it was paginated.
    pub fn request(&self) -> Option<PageRequest> {
        self.request
    }

    /// Whether a continuation is attached.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Fetch the next page, if any. Each call issues a new fetch.
    pub fn next_page(&self) -> Option<Deferred<Page<T>>> {
        self.next.as_ref().map(|next| next())
    }

    /// Lazy iterator over this page's items followed by every later page.
    pub fn expand(self) -> PageIter<T> {
        PageIter {
            buffer: self.items.into_iter(),
            next: self.next,
            pages_loaded: 1,
        }
    }
}

impl<T> fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("len", &self.items.len())
            .field("request", &self.request)
            .field("has_more", &self.next.is_some())
            .finish()
    }
}

/// Wrap a paged fetch so full pages carry a continuation.
///
/// `fetch_page` receives only the window; every other request parameter
/// is whatever the closure captured.
///
/// # Errors
///
/// The returned deferred fails with `InvalidInput` when `limit` is 0.
pub fn paginate<T, F>(fetch_page: F, request: PageRequest) -> Deferred<Page<T>>
where
    T: Resolvable,
    F: Fn(PageRequest) -> Deferred<Vec<T>> + Send + Sync + 'static,
{
    if request.limit == 0 {
        return Deferred::failed(Error::invalid_input("page limit must be at least 1"));
    }
    fetch_shared(Arc::new(fetch_page), request)
}

fn fetch_shared<T, F>(fetch: Arc<F>, request: PageRequest) -> Deferred<Page<T>>
where
    T: Resolvable,
    F: Fn(PageRequest) -> Deferred<Vec<T>> + Send + Sync + 'static,
{
    let shared = Arc::clone(&fetch);
    (*fetch)(request).map(move |items| {
        let next = if items.len() == request.limit {
            let fetch = Arc::clone(&shared);
            let continuation: Continuation<T> = Arc::new(move || {
                let window = request.next();
                debug!(
                    target: "quiver::paginate",
                    offset = window.offset,
                    limit = window.limit,
                    "Fetching next page"
                );
                fetch_shared(Arc::clone(&fetch), window)
            });
            Some(continuation)
        } else {
            None
        };
        Page {
            items,
            request: Some(request),
            next,
        }
    })
}

/// Wait for the first page and expand it.
pub fn expand<T: Resolvable>(first: &Deferred<Page<T>>) -> Result<PageIter<T>> {
    Ok(first.wait()?.expand())
}

/// Wait for every page and collect all items.
pub fn collect_all<T: Resolvable>(first: &Deferred<Page<T>>) -> Result<Vec<T>> {
    expand(first)?.collect()
}

/// One-shot forward iterator over all pages.
///
/// Yields `Err` once if a later page fails, then ends.
pub struct PageIter<T> {
    buffer: std::vec::IntoIter<T>,
    next: Option<Continuation<T>>,
    pages_loaded: usize,
}

impl<T> PageIter<T> {
    /// Pages fetched so far, including the first.
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }
}

impl<T: Resolvable> Iterator for PageIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            let continuation = self.next.take()?;
            match continuation().wait() {
                Ok(page) => {
                    self.pages_loaded += 1;
                    self.buffer = page.items.into_iter();
                    self.next = page.next;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<T: Resolvable> FusedIterator for PageIter<T> {}
