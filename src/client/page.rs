//! Cursor pagination primitives shared by every list-like operation.
//!
//! The upstream returns bounded pages with an opaque continuation token.
//! [`Paging`] selects between fetching one page and draining every page, and the
//! drain loop enforces a caller-supplied page cap so a misbehaving upstream that
//! keeps reporting `has_more` can never spin the client forever.

// self
use crate::_prelude::*;

/// Page cap applied when [`Paging::all`] is used without an explicit override.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// One page of results with its continuation cursor.
///
/// Invariant: `has_more` holds exactly when `next_page_token` is present; the
/// constructor reconciles whatever combination the wire reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
	/// Items in upstream order.
	pub items: Vec<T>,
	/// Opaque token for the next page, if one exists.
	pub next_page_token: Option<String>,
	/// Whether another page exists.
	pub has_more: bool,
}
impl<T> Page<T> {
	/// Builds a page from raw wire fields, normalizing the cursor invariant.
	pub fn from_wire(items: Vec<T>, page_token: Option<String>, has_more: bool) -> Self {
		let next_page_token =
			if has_more { page_token.filter(|token| !token.is_empty()) } else { None };

		Self { items, has_more: next_page_token.is_some(), next_page_token }
	}

	/// Builds a terminal page with no continuation.
	pub fn complete(items: Vec<T>) -> Self {
		Self { items, next_page_token: None, has_more: false }
	}

	/// Returns the number of items on this page.
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Returns `true` when the page carries no items.
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}

/// Whether an operation fetches one page or drains the whole cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageMode {
	/// Fetch exactly one page and return its cursor to the caller.
	Single,
	/// Follow the cursor until exhausted or the page cap is hit.
	All {
		/// Upper bound on fetched pages before surfacing
		/// [`Error::PaginationLimitExceeded`].
		max_pages: u32,
	},
}

/// Caller-chosen pagination parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paging {
	/// Requested page size; operations clamp to their endpoint maximum.
	pub page_size: Option<u32>,
	/// Starting cursor, absent for the first page.
	pub page_token: Option<String>,
	/// Single-page or drain-all behavior.
	pub mode: PageMode,
}
impl Paging {
	/// Fetches a single page.
	pub fn single() -> Self {
		Self { page_size: None, page_token: None, mode: PageMode::Single }
	}

	/// Drains every page up to [`DEFAULT_MAX_PAGES`].
	pub fn all() -> Self {
		Self { page_size: None, page_token: None, mode: PageMode::All { max_pages: DEFAULT_MAX_PAGES } }
	}

	/// Overrides the page cap, switching into drain-all mode if needed.
	pub fn with_max_pages(mut self, max_pages: u32) -> Self {
		self.mode = PageMode::All { max_pages };

		self
	}

	/// Overrides the requested page size.
	pub fn with_page_size(mut self, page_size: u32) -> Self {
		self.page_size = Some(page_size);

		self
	}

	/// Starts pagination from a previously returned cursor.
	pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
		self.page_token = Some(page_token.into());

		self
	}
}
impl Default for Paging {
	fn default() -> Self {
		Self::single()
	}
}

/// Runs `fetch` according to the paging mode, accumulating items in order.
///
/// `fetch` receives the cursor for the page it must load. Drain-all mode stops
/// when the upstream reports no continuation; hitting the page cap surfaces
/// [`Error::PaginationLimitExceeded`] without issuing another fetch.
pub(crate) async fn drain<T>(
	paging: &Paging,
	mut fetch: impl AsyncFnMut(Option<String>) -> Result<Page<T>>,
) -> Result<Page<T>> {
	match paging.mode {
		PageMode::Single => fetch(paging.page_token.clone()).await,
		PageMode::All { max_pages } => {
			let mut items = Vec::new();
			let mut token = paging.page_token.clone();
			let mut fetched = 0_u32;

			loop {
				if fetched >= max_pages {
					return Err(Error::PaginationLimitExceeded { max_pages });
				}

				let page = fetch(token).await?;

				fetched += 1;

				items.extend(page.items);

				if !page.has_more {
					return Ok(Page::complete(items));
				}

				token = page.next_page_token;
			}
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn from_wire_reconciles_the_cursor_invariant() {
		let with_token = Page::from_wire(vec![1, 2], Some("next".into()), true);

		assert!(with_token.has_more);
		assert_eq!(with_token.next_page_token.as_deref(), Some("next"));

		let finished = Page::from_wire(vec![3], Some("stale".into()), false);

		assert!(!finished.has_more);
		assert!(finished.next_page_token.is_none());

		let empty_token = Page::<i32>::from_wire(Vec::new(), Some(String::new()), true);

		assert!(!empty_token.has_more);
		assert!(empty_token.next_page_token.is_none());
	}

	#[tokio::test]
	async fn drain_all_preserves_order_across_pages() {
		let paging = Paging::all();
		let pages = vec![
			Page::from_wire(vec![1, 2], Some("p2".into()), true),
			Page::from_wire(vec![3, 4], Some("p3".into()), true),
			Page::from_wire(vec![5, 6], None, false),
		];
		let mut served = pages.into_iter();
		let result = drain(&paging, async |_token| {
			Ok(served.next().expect("Fetch should not be called past the final page."))
		})
		.await
		.expect("Drain should collect every page.");

		assert_eq!(result.items, vec![1, 2, 3, 4, 5, 6]);
		assert!(!result.has_more);
		assert!(result.next_page_token.is_none());
	}

	#[tokio::test]
	async fn drain_stops_after_exactly_the_page_cap() {
		let paging = Paging::all().with_max_pages(5);
		let mut fetches = 0_u32;
		let err = drain(&paging, async |_token| {
			fetches += 1;

			Ok(Page::from_wire(vec![fetches], Some(format!("p{fetches}")), true))
		})
		.await
		.expect_err("An endless cursor should hit the page cap.");

		assert_eq!(fetches, 5);
		assert!(matches!(err, Error::PaginationLimitExceeded { max_pages: 5 }));
	}

	#[tokio::test]
	async fn single_mode_passes_the_starting_cursor_through() {
		let paging = Paging::single().with_page_token("resume");
		let page = drain(&paging, async |token| {
			assert_eq!(token.as_deref(), Some("resume"));

			Ok(Page::from_wire(vec![9], Some("next".into()), true))
		})
		.await
		.expect("Single-page fetch should succeed.");

		assert_eq!(page.items, vec![9]);
		assert_eq!(page.next_page_token.as_deref(), Some("next"));
	}
}
