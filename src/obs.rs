//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `feishu_docs.call` with the `operation` and
//!   `stage` (call site) fields.
//! - Enable `metrics` to increment the `feishu_docs_call_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// App access token exchange.
	AppToken,
	/// Authorization code exchange.
	Exchange,
	/// Refresh token exchange.
	Refresh,
	/// Drive file listing.
	ListDocuments,
	/// Document content fetch.
	GetDocument,
	/// Document metadata fetch.
	GetDocumentInfo,
	/// Document block listing.
	GetDocumentBlocks,
	/// Document search.
	SearchDocuments,
	/// Document block batch update.
	UpdateDocument,
	/// Document block creation.
	CreateBlocks,
	/// Document block deletion.
	DeleteBlocks,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::AppToken => "app_token",
			CallKind::Exchange => "exchange",
			CallKind::Refresh => "refresh",
			CallKind::ListDocuments => "list_documents",
			CallKind::GetDocument => "get_document",
			CallKind::GetDocumentInfo => "get_document_info",
			CallKind::GetDocumentBlocks => "get_document_blocks",
			CallKind::SearchDocuments => "search_documents",
			CallKind::UpdateDocument => "update_document",
			CallKind::CreateBlocks => "create_blocks",
			CallKind::DeleteBlocks => "delete_blocks",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a client helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
