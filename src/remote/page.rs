//! Forward-only pagination over a user's books ordered by push key.
//!
//! The range query is inclusive of its start key, so a continued page asks
//! for one extra record and drops the boundary record it already returned.
//! One more record beyond the page size tells whether another page exists.

use super::RemoteStore;
use crate::error::{FieldErrors, ShelfError};
use crate::types::{BookPage, RemoteEntry};
use tracing::debug;

/// Number of records to request for a page of `page_size`.
pub fn query_limit(page_size: usize, start_after: Option<&str>) -> usize {
    page_size + 1 + usize::from(start_after.is_some())
}

/// Cut one page out of the records returned by the range query.
pub fn window(
    mut fetched: Vec<RemoteEntry>,
    page_size: usize,
    start_after: Option<&str>,
) -> BookPage {
    if let Some(boundary) = start_after
        && fetched.first().is_some_and(|e| e.key == boundary)
    {
        fetched.remove(0);
    }

    let next_key = if fetched.len() > page_size {
        fetched.truncate(page_size);
        fetched.last().map(|e| e.key.clone())
    } else {
        None
    };

    BookPage {
        books: fetched,
        next_key,
    }
}

/// Fetch the page of `uid`'s books following `start_after`.
pub async fn fetch_page(
    remote: &dyn RemoteStore,
    uid: &str,
    page_size: usize,
    start_after: Option<&str>,
) -> Result<BookPage, ShelfError> {
    if page_size == 0 {
        return Err(ShelfError::Validation(FieldErrors::single(
            "page_size",
            "Page size must be at least 1",
        )));
    }
    let limit = query_limit(page_size, start_after);
    let fetched = remote.books_range(uid, start_after, limit).await?;
    let page = window(fetched, page_size, start_after);
    debug!(
        uid,
        page_size,
        returned = page.books.len(),
        has_next = page.next_key.is_some(),
        "fetched book page"
    );
    Ok(page)
}
