//! Document operations over the authenticated, rate-limited request path.
//!
//! Every operation follows the same bounded state machine: obtain a fresh
//! credential, execute through the rate-limited transport, and on an
//! authentication-rejected response force one refresh and retry exactly once.
//! A second rejection surfaces [`AuthError::RefreshRejected`] instead of looping.
//! List-like operations share the cursor-draining loop in [`page`].

pub mod page;
pub mod wire;

pub use page::{Page, PageMode, Paging};
pub use wire::{
	Block, Cover, CreatedBlocks, DeleteOutcome, DisplaySetting, DocumentContent, DocumentInfo,
	DriveFile, SearchEntity, UpdateOutcome,
};

// self
use crate::{
	_prelude::*,
	authority::TokenAuthority,
	error::{AuthError, ConfigError},
	http::{self, ApiMethod, ApiRequest, ApiResponse, RateLimitedTransport, RetryPolicy},
	obs::{self, CallKind, CallOutcome, CallSpan},
};

const DEFAULT_LIST_PAGE_SIZE: u32 = 50;
const DEFAULT_SEARCH_PAGE_SIZE: u32 = 20;
const MAX_SEARCH_PAGE_SIZE: u32 = 50;
const DEFAULT_BLOCK_PAGE_SIZE: u32 = 500;
const MAX_BLOCK_PAGE_SIZE: u32 = 500;

/// Vendor codes reported when the bearer token is no longer accepted.
const AUTH_REJECTED_CODES: [i64; 2] = [99991668, 99991677];

/// User identifier namespace accepted by the block endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserIdType {
	/// User identity within an app.
	#[default]
	OpenId,
	/// User identity under an app developer.
	UnionId,
	/// User identity within a tenant.
	UserId,
}
impl UserIdType {
	/// Returns the wire value.
	pub const fn as_str(self) -> &'static str {
		match self {
			UserIdType::OpenId => "open_id",
			UserIdType::UnionId => "union_id",
			UserIdType::UserId => "user_id",
		}
	}
}
impl Display for UserIdType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Read options for the block listing endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReadOptions {
	/// Document revision to read; `-1` selects the latest.
	pub document_revision_id: i64,
	/// User identifier namespace for user references inside blocks.
	pub user_id_type: UserIdType,
}
impl Default for BlockReadOptions {
	fn default() -> Self {
		Self { document_revision_id: -1, user_id_type: UserIdType::default() }
	}
}

/// Write options shared by the mutating block endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
	/// Document revision to mutate; `-1` selects the latest.
	pub document_revision_id: Option<i64>,
	/// Idempotency token forwarded to the service.
	pub client_token: Option<String>,
	/// User identifier namespace for user references inside blocks.
	pub user_id_type: UserIdType,
}
impl WriteOptions {
	/// Targets a specific document revision.
	pub fn with_revision(mut self, document_revision_id: i64) -> Self {
		self.document_revision_id = Some(document_revision_id);

		self
	}

	/// Attaches an idempotency token.
	pub fn with_client_token(mut self, client_token: impl Into<String>) -> Self {
		self.client_token = Some(client_token.into());

		self
	}

	fn revision(&self) -> i64 {
		self.document_revision_id.unwrap_or(-1)
	}
}

/// Payload for [`DocumentClient::update_document`].
#[derive(Clone, Debug)]
pub enum UpdateRequest {
	/// Replace the text elements of one block.
	Text {
		/// Block to rewrite.
		block_id: String,
		/// New text content.
		content: String,
	},
	/// Raw `update_block_request` objects passed through verbatim.
	Raw {
		/// Request objects in service wire format.
		requests: Vec<serde_json::Value>,
	},
}

/// Optional filters for [`DocumentClient::search_documents`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchFilter {
	/// Restrict hits to documents owned by these open ids.
	pub owner_ids: Vec<String>,
	/// Restrict hits to documents shared in these chats.
	pub chat_ids: Vec<String>,
	/// Restrict hits to these document kinds (`doc`, `sheet`, ...).
	pub docs_types: Vec<String>,
}

/// Authenticated, rate-limited client for the document endpoints.
#[derive(Clone, Debug)]
pub struct DocumentClient {
	authority: Arc<TokenAuthority>,
	transport: RateLimitedTransport,
	api_base: Url,
}
impl DocumentClient {
	/// Creates a client sharing the authority's transport, with default retry policy.
	pub fn new(authority: Arc<TokenAuthority>) -> Self {
		let transport =
			RateLimitedTransport::new(authority.transport().clone(), RetryPolicy::default());
		let api_base = authority.descriptor().endpoints.api_base.clone();

		Self { authority, transport, api_base }
	}

	/// Overrides the rate-limit retry policy.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.transport = RateLimitedTransport::new(self.authority.transport().clone(), policy);

		self
	}

	/// Returns the token authority backing this client.
	pub fn authority(&self) -> &Arc<TokenAuthority> {
		&self.authority
	}

	/// Lists drive entries, optionally inside a folder.
	pub async fn list_documents(
		&self,
		folder_token: Option<&str>,
		paging: Paging,
	) -> Result<Page<DriveFile>> {
		self.traced(CallKind::ListDocuments, "list_documents", async {
			let url = self.endpoint("drive/v1/files")?;
			let page_size = paging.page_size.unwrap_or(DEFAULT_LIST_PAGE_SIZE);

			page::drain(&paging, async |token| {
				let mut url = url.clone();

				{
					let mut pairs = url.query_pairs_mut();

					pairs.append_pair("page_size", &page_size.to_string());

					if let Some(folder) = folder_token {
						pairs.append_pair("folder_token", folder);
					}
					if let Some(token) = &token {
						pairs.append_pair("page_token", token);
					}
				}

				let response =
					self.execute_authenticated(ApiRequest::new(ApiMethod::Get, url)).await?;
				let data: wire::FilesData = wire::decode_envelope(&response)?;

				Ok(Page::from_wire(data.files, data.page_token, data.has_more))
			})
			.await
		})
		.await
	}

	/// Fetches a document's title and plain-text content.
	///
	/// `lang` selects how user mentions are rendered in the raw content (0 = default
	/// names, 1 = English names).
	pub async fn get_document(&self, document_id: &str, lang: i64) -> Result<DocumentContent> {
		self.traced(CallKind::GetDocument, "get_document", async {
			let info = self.fetch_document_info(document_id).await?;
			let mut url = self.endpoint(&format!("docx/v1/documents/{document_id}/raw_content"))?;

			url.query_pairs_mut().append_pair("lang", &lang.to_string());

			let response =
				self.execute_authenticated(ApiRequest::new(ApiMethod::Get, url)).await?;
			let data: wire::RawContentData = wire::decode_envelope(&response)?;

			Ok(DocumentContent {
				document_id: document_id.to_owned(),
				title: info.title,
				raw_content: data.content,
			})
		})
		.await
	}

	/// Fetches document metadata (revision, title, display settings, cover).
	pub async fn get_document_info(&self, document_id: &str) -> Result<DocumentInfo> {
		self.traced(CallKind::GetDocumentInfo, "get_document_info", async {
			self.fetch_document_info(document_id).await
		})
		.await
	}

	/// Lists the content blocks of a document.
	pub async fn get_document_blocks(
		&self,
		document_id: &str,
		paging: Paging,
		options: BlockReadOptions,
	) -> Result<Page<Block>> {
		self.traced(CallKind::GetDocumentBlocks, "get_document_blocks", async {
			let url = self.endpoint(&format!("docx/v1/documents/{document_id}/blocks"))?;
			let page_size =
				paging.page_size.unwrap_or(DEFAULT_BLOCK_PAGE_SIZE).min(MAX_BLOCK_PAGE_SIZE);

			page::drain(&paging, async |token| {
				let mut url = url.clone();

				{
					let mut pairs = url.query_pairs_mut();

					pairs
						.append_pair("page_size", &page_size.to_string())
						.append_pair(
							"document_revision_id",
							&options.document_revision_id.to_string(),
						)
						.append_pair("user_id_type", options.user_id_type.as_str());

					if let Some(token) = &token {
						pairs.append_pair("page_token", token);
					}
				}

				let response =
					self.execute_authenticated(ApiRequest::new(ApiMethod::Get, url)).await?;
				let data: wire::BlocksData = wire::decode_envelope(&response)?;

				Ok(Page::from_wire(data.items, data.page_token, data.has_more))
			})
			.await
		})
		.await
	}

	/// Searches documents by keyword.
	///
	/// The upstream paginates this endpoint with an integer offset; the returned
	/// cursor is the stringified next offset so callers see the same opaque-token
	/// contract as every other list operation.
	pub async fn search_documents(
		&self,
		query: &str,
		paging: Paging,
		filter: SearchFilter,
	) -> Result<Page<SearchEntity>> {
		self.traced(CallKind::SearchDocuments, "search_documents", async {
			let url = self.endpoint("suite/docs-api/search/object")?;
			let count =
				paging.page_size.unwrap_or(DEFAULT_SEARCH_PAGE_SIZE).min(MAX_SEARCH_PAGE_SIZE);

			page::drain(&paging, async |token| {
				let offset =
					token.as_deref().and_then(|value| value.parse::<u64>().ok()).unwrap_or(0);
				let mut body = serde_json::json!({
					"search_key": query,
					"count": count,
					"offset": offset,
				});

				if !filter.owner_ids.is_empty() {
					body["owner_ids"] = serde_json::json!(filter.owner_ids);
				}
				if !filter.chat_ids.is_empty() {
					body["chat_ids"] = serde_json::json!(filter.chat_ids);
				}
				if !filter.docs_types.is_empty() {
					body["docs_types"] = serde_json::json!(filter.docs_types);
				}

				let response = self
					.execute_authenticated(
						ApiRequest::new(ApiMethod::Post, url.clone()).with_body(body),
					)
					.await?;
				let data: wire::SearchData = wire::decode_envelope(&response)?;
				let next = if data.has_more {
					Some((offset + data.docs_entities.len() as u64).to_string())
				} else {
					None
				};

				Ok(Page::from_wire(data.docs_entities, next, data.has_more))
			})
			.await
		})
		.await
	}

	/// Updates document blocks through the batch-update endpoint.
	///
	/// The call is not idempotent; it is never auto-retried beyond the explicit
	/// rate-limit and single auth-refresh paths. Pass a `client_token` in
	/// [`WriteOptions`] when the hosting system needs stronger guarantees.
	pub async fn update_document(
		&self,
		document_id: &str,
		request: UpdateRequest,
		options: WriteOptions,
	) -> Result<UpdateOutcome> {
		self.traced(CallKind::UpdateDocument, "update_document", async {
			let requests = match request {
				UpdateRequest::Text { block_id, content } => vec![serde_json::json!({
					"block_id": block_id,
					"update_text_elements": {
						"elements": [{ "text_run": { "content": content } }],
					},
				})],
				UpdateRequest::Raw { requests } => requests,
			};
			let mut url =
				self.endpoint(&format!("docx/v1/documents/{document_id}/blocks/batch_update"))?;

			{
				let mut pairs = url.query_pairs_mut();

				pairs
					.append_pair("document_revision_id", &options.revision().to_string())
					.append_pair("user_id_type", options.user_id_type.as_str());

				if let Some(client_token) = &options.client_token {
					pairs.append_pair("client_token", client_token);
				}
			}

			let response = self
				.execute_authenticated(
					ApiRequest::new(ApiMethod::Patch, url)
						.with_body(serde_json::json!({ "requests": requests })),
				)
				.await?;

			wire::decode_envelope(&response)
		})
		.await
	}

	/// Creates blocks under a parent block (use the document id for the root).
	///
	/// `index` selects the insertion position; `-1` appends at the end.
	pub async fn create_blocks(
		&self,
		document_id: &str,
		block_id: &str,
		children: Vec<serde_json::Value>,
		index: i64,
		options: WriteOptions,
	) -> Result<CreatedBlocks> {
		self.traced(CallKind::CreateBlocks, "create_blocks", async {
			let mut url = self.endpoint(&format!(
				"docx/v1/documents/{document_id}/blocks/{block_id}/children"
			))?;

			{
				let mut pairs = url.query_pairs_mut();

				pairs
					.append_pair("document_revision_id", &options.revision().to_string())
					.append_pair("user_id_type", options.user_id_type.as_str());

				if let Some(client_token) = &options.client_token {
					pairs.append_pair("client_token", client_token);
				}
			}

			let response = self
				.execute_authenticated(
					ApiRequest::new(ApiMethod::Post, url)
						.with_body(serde_json::json!({ "index": index, "children": children })),
				)
				.await?;

			wire::decode_envelope(&response)
		})
		.await
	}

	/// Deletes the child blocks of `block_id` in `[start_index, end_index)`.
	pub async fn delete_blocks(
		&self,
		document_id: &str,
		block_id: &str,
		start_index: u32,
		end_index: u32,
		options: WriteOptions,
	) -> Result<DeleteOutcome> {
		self.traced(CallKind::DeleteBlocks, "delete_blocks", async {
			let mut url = self.endpoint(&format!(
				"docx/v1/documents/{document_id}/blocks/{block_id}/children/batch_delete"
			))?;

			{
				let mut pairs = url.query_pairs_mut();

				pairs.append_pair("document_revision_id", &options.revision().to_string());

				if let Some(client_token) = &options.client_token {
					pairs.append_pair("client_token", client_token);
				}
			}

			let response = self
				.execute_authenticated(ApiRequest::new(ApiMethod::Delete, url).with_body(
					serde_json::json!({ "start_index": start_index, "end_index": end_index }),
				))
				.await?;

			wire::decode_envelope(&response)
		})
		.await
	}

	/// Executes one authenticated request with the bounded refresh-retry-once path.
	async fn execute_authenticated(&self, request: ApiRequest) -> Result<ApiResponse> {
		let credential = self.authority.valid_token().await?;
		let response =
			self.transport.execute(request.clone().with_bearer(credential.bearer())).await?;

		if !is_auth_rejected(&response) {
			return Ok(response);
		}

		// The local expiry estimate disagreed with the server; rotate once and retry.
		let refreshed = self.authority.refresh(credential.access_token.expose()).await?;
		let retried = self.transport.execute(request.with_bearer(refreshed.bearer())).await?;

		if is_auth_rejected(&retried) {
			return Err(AuthError::RefreshRejected.into());
		}

		Ok(retried)
	}

	async fn fetch_document_info(&self, document_id: &str) -> Result<DocumentInfo> {
		let url = self.endpoint(&format!("docx/v1/documents/{document_id}"))?;
		let response = self.execute_authenticated(ApiRequest::new(ApiMethod::Get, url)).await?;
		let data: wire::DocumentData = wire::decode_envelope(&response)?;

		wire::require_document(data, response.status)
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		self.api_base.join(path).map_err(|source| {
			ConfigError::InvalidApiPath { path: path.to_owned(), source }.into()
		})
	}

	async fn traced<T>(
		&self,
		kind: CallKind,
		stage: &'static str,
		fut: impl Future<Output = Result<T>>,
	) -> Result<T> {
		let span = CallSpan::new(kind, stage);

		obs::record_call_outcome(kind, CallOutcome::Attempt);

		let result = span.instrument(fut).await;

		match &result {
			Ok(_) => obs::record_call_outcome(kind, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(kind, CallOutcome::Failure),
		}

		result
	}
}

/// Returns `true` when the response means the bearer token was not accepted.
fn is_auth_rejected(response: &ApiResponse) -> bool {
	if response.status == 401 {
		return true;
	}
	if response.is_success() {
		return false;
	}

	http::probe_vendor_code(response)
		.is_some_and(|code| AUTH_REJECTED_CODES.contains(&code))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, body: &str) -> ApiResponse {
		ApiResponse { status, body: body.as_bytes().to_vec() }
	}

	#[test]
	fn auth_rejection_matches_status_and_vendor_codes() {
		assert!(is_auth_rejected(&response(401, "{}")));
		assert!(is_auth_rejected(&response(400, r#"{"code":99991668,"msg":"token expired"}"#)));
		assert!(is_auth_rejected(&response(400, r#"{"code":99991677,"msg":"token invalid"}"#)));
		assert!(!is_auth_rejected(&response(400, r#"{"code":1254005,"msg":"bad id"}"#)));
		assert!(!is_auth_rejected(&response(200, r#"{"code":0,"msg":"ok"}"#)));
	}

	#[test]
	fn write_options_default_to_latest_revision() {
		let options = WriteOptions::default();

		assert_eq!(options.revision(), -1);
		assert_eq!(options.user_id_type, UserIdType::OpenId);

		let pinned = WriteOptions::default().with_revision(12).with_client_token("idem-1");

		assert_eq!(pinned.revision(), 12);
		assert_eq!(pinned.client_token.as_deref(), Some("idem-1"));
	}
}
