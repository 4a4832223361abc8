//! Forward-only cursor pagination for ledger listings.
//!
//! Review queues are read oldest-first, so only `first`/`after` is supported.
//! The cursor is the base64-encoded id of the last entry on the previous page;
//! stores resolve it back to that entry's `(created_at, id)` position.
//!
//! # Usage
//!
//! ```rust,ignore
//! let page = PageRequest { first: Some(10), after: None }.validate()?;
//! let (items, has_more) = trim_results(store.fetch(page.fetch_limit()).await?, page.limit);
//! let page = Page::from_trimmed(items, has_more, |event| event.id.into_uuid());
//! ```

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i32 = 100;

/// Page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: i32 = 25;

// ============================================================================
// Cursor
// ============================================================================

/// Opaque cursor for pagination (base64-encoded UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(Uuid);

impl Cursor {
    pub fn new(id: Uuid) -> Self {
        Cursor(id)
    }

    /// Encode the cursor as a URL-safe base64 string.
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0.as_bytes())
    }

    /// Decode a cursor string back to a Cursor.
    pub fn decode(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .context("Invalid cursor: not valid base64")?;
        let uuid = Uuid::from_slice(&bytes).context("Invalid cursor: not a valid UUID")?;
        Ok(Cursor(uuid))
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Pagination arguments as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRequest {
    /// Returns the first n elements from the list.
    pub first: Option<i32>,
    /// Returns elements that come after the specified cursor.
    pub after: Option<String>,
}

impl PageRequest {
    pub fn first(first: i32) -> Self {
        PageRequest {
            first: Some(first),
            after: None,
        }
    }

    pub fn after(first: i32, cursor: impl Into<String>) -> Self {
        PageRequest {
            first: Some(first),
            after: Some(cursor.into()),
        }
    }

    /// Apply defaults and bounds, and decode the cursor.
    pub fn validate(&self) -> Result<ValidatedPage, &'static str> {
        let limit = self
            .first
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let cursor = self
            .after
            .as_deref()
            .map(Cursor::decode)
            .transpose()
            .map_err(|_| "Invalid cursor")?
            .map(Cursor::into_uuid);

        Ok(ValidatedPage { limit, cursor })
    }
}

/// Validated and normalized pagination arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedPage {
    /// Number of items to return (1-100).
    pub limit: i32,
    /// Id of the last item already seen.
    pub cursor: Option<Uuid>,
}

impl ValidatedPage {
    /// The first page with the default size.
    pub fn first_page() -> Self {
        ValidatedPage {
            limit: DEFAULT_PAGE_SIZE,
            cursor: None,
        }
    }

    /// SQL LIMIT value (limit + 1 to detect has_more).
    pub fn fetch_limit(&self) -> i64 {
        (self.limit + 1) as i64
    }
}

impl Default for ValidatedPage {
    fn default() -> Self {
        Self::first_page()
    }
}

// ============================================================================
// Results
// ============================================================================

/// A page of results with the cursor needed to fetch the next one.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page from already-trimmed results.
    pub fn from_trimmed<F>(items: Vec<T>, has_more: bool, id_of: F) -> Self
    where
        F: Fn(&T) -> Uuid,
    {
        let end_cursor = items.last().map(|item| Cursor::new(id_of(item)).encode());
        Page {
            items,
            has_next_page: has_more,
            end_cursor,
        }
    }

    /// Transform the items while keeping the page position.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            has_next_page: self.has_next_page,
            end_cursor: self.end_cursor,
        }
    }
}

/// Trim results to the requested limit and determine if there are more.
///
/// Queries should fetch `limit + 1` items.
pub fn trim_results<T>(mut results: Vec<T>, limit: i32) -> (Vec<T>, bool) {
    let has_more = results.len() > limit as usize;
    results.truncate(limit as usize);
    (results, has_more)
}
