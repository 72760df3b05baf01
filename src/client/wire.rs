//! Typed wire payloads for the document endpoints.
//!
//! Every endpoint answers inside the `code`/`msg`/`data` envelope. Payload structs
//! default-fill absent fields and silently ignore unknown ones; the vendor adds
//! fields between API versions and the client only depends on the subset below.

// self
use crate::{
	_prelude::*,
	error::{ApiError, DecodeError},
	http::{self, ApiResponse},
};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
	#[serde(default)]
	pub code: i64,
	#[serde(default)]
	pub msg: String,
	#[serde(default)]
	pub data: Option<T>,
}

/// Decodes the response envelope, surfacing vendor errors with their code.
pub(crate) fn decode_envelope<T>(response: &ApiResponse) -> Result<T>
where
	T: serde::de::DeserializeOwned + Default,
{
	let envelope: Envelope<T> = http::decode_json(response)?;

	if envelope.code != 0 {
		return Err(ApiError {
			status: response.status,
			code: envelope.code,
			message: envelope.msg,
		}
		.into());
	}

	Ok(envelope.data.unwrap_or_default())
}

/// One drive entry returned by the file listing endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
	/// Opaque file token used by every document endpoint.
	#[serde(default)]
	pub token: String,
	/// Display name.
	#[serde(default)]
	pub name: String,
	/// Entry kind reported by the drive (`docx`, `sheet`, `folder`, ...).
	#[serde(default, rename = "type")]
	pub kind: String,
	/// Token of the containing folder, when known.
	#[serde(default)]
	pub parent_token: Option<String>,
	/// Browser URL of the entry, when known.
	#[serde(default)]
	pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FilesData {
	#[serde(default)]
	pub files: Vec<DriveFile>,
	#[serde(default)]
	pub page_token: Option<String>,
	#[serde(default)]
	pub has_more: bool,
}

/// Per-document display toggles configured by the document owner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySetting {
	/// Whether author names are shown.
	#[serde(default)]
	pub show_authors: bool,
	/// Whether the creation time is shown.
	#[serde(default)]
	pub show_create_time: bool,
	/// Whether the view count is shown.
	#[serde(default)]
	pub show_pv: bool,
	/// Whether the distinct-visitor count is shown.
	#[serde(default)]
	pub show_uv: bool,
	/// Whether the like count is shown.
	#[serde(default)]
	pub show_like_count: bool,
	/// Whether the comment count is shown.
	#[serde(default)]
	pub show_comment_count: bool,
	/// Whether related matters are shown.
	#[serde(default)]
	pub show_related_matters: bool,
}

/// Cover image configuration for a document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cover {
	/// Token of the cover image asset.
	#[serde(default)]
	pub token: String,
	/// Horizontal crop offset ratio.
	#[serde(default)]
	pub offset_ratio_x: f64,
	/// Vertical crop offset ratio.
	#[serde(default)]
	pub offset_ratio_y: f64,
}

/// Document metadata returned by the document-get endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
	/// Document unique identifier.
	#[serde(default)]
	pub document_id: String,
	/// Latest revision identifier, starting from 1.
	#[serde(default)]
	pub revision_id: i64,
	/// Document title.
	#[serde(default)]
	pub title: String,
	/// Display toggles, when the document configures any.
	#[serde(default)]
	pub display_setting: Option<DisplaySetting>,
	/// Cover configuration, when the document has one.
	#[serde(default)]
	pub cover: Option<Cover>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DocumentData {
	#[serde(default)]
	pub document: Option<DocumentInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawContentData {
	#[serde(default)]
	pub content: String,
}

/// Document content assembled from the metadata and raw-content endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DocumentContent {
	/// Document unique identifier.
	pub document_id: String,
	/// Document title.
	pub title: String,
	/// Plain-text rendering produced by the service.
	pub raw_content: String,
}

/// One content block of a document.
///
/// The block tree itself is opaque to this client; only the identifiers needed to
/// address blocks for updates are modeled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	/// Block unique identifier.
	#[serde(default)]
	pub block_id: String,
	/// Numeric block type tag.
	#[serde(default)]
	pub block_type: i64,
	/// Identifier of the parent block, absent for the root.
	#[serde(default)]
	pub parent_id: Option<String>,
	/// Identifiers of child blocks in document order.
	#[serde(default)]
	pub children: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BlocksData {
	#[serde(default)]
	pub items: Vec<Block>,
	#[serde(default)]
	pub page_token: Option<String>,
	#[serde(default)]
	pub has_more: bool,
}

/// One search hit returned by the document search endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntity {
	/// Opaque document token.
	#[serde(default, rename = "docs_token")]
	pub token: String,
	/// Document title.
	#[serde(default)]
	pub title: String,
	/// Document kind (`doc`, `docx`, `sheet`, ...).
	#[serde(default, rename = "docs_type")]
	pub kind: String,
	/// Open id of the document owner.
	#[serde(default)]
	pub owner_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchData {
	#[serde(default)]
	pub docs_entities: Vec<SearchEntity>,
	#[serde(default)]
	pub has_more: bool,
}

/// Result of a block batch update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateOutcome {
	/// Updated blocks as echoed by the service.
	#[serde(default, rename = "responses")]
	pub updated: Vec<Block>,
	/// Revision after the update, when reported.
	#[serde(default)]
	pub document_revision_id: Option<i64>,
	/// Idempotency token echoed back, when reported.
	#[serde(default)]
	pub client_token: Option<String>,
}

/// Result of a block creation call.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreatedBlocks {
	/// Blocks created by the call, in insertion order.
	#[serde(default)]
	pub children: Vec<Block>,
	/// Revision after the creation, when reported.
	#[serde(default)]
	pub document_revision_id: Option<i64>,
	/// Idempotency token echoed back, when reported.
	#[serde(default)]
	pub client_token: Option<String>,
}

/// Result of a block deletion call.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeleteOutcome {
	/// Revision after the deletion, when reported.
	#[serde(default)]
	pub document_revision_id: Option<i64>,
	/// Idempotency token echoed back, when reported.
	#[serde(default)]
	pub client_token: Option<String>,
}

/// Extracts the document payload or reports the envelope as incomplete.
pub(crate) fn require_document(
	data: DocumentData,
	status: u16,
) -> Result<DocumentInfo> {
	data.document.ok_or_else(|| DecodeError::MissingData { status }.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, body: &str) -> ApiResponse {
		ApiResponse { status, body: body.as_bytes().to_vec() }
	}

	#[test]
	fn envelope_success_yields_payload() {
		let data: FilesData = decode_envelope(&response(
			200,
			r#"{"code":0,"msg":"success","data":{"files":[{"token":"doccn1","name":"Budget","type":"docx"}],"page_token":"p2","has_more":true}}"#,
		))
		.expect("Well-formed envelope should decode.");

		assert_eq!(data.files.len(), 1);
		assert_eq!(data.files[0].name, "Budget");
		assert!(data.has_more);
	}

	#[test]
	fn envelope_vendor_error_surfaces_code_and_message() {
		let err = decode_envelope::<FilesData>(&response(
			400,
			r#"{"code":1254005,"msg":"invalid document id"}"#,
		))
		.expect_err("Vendor error envelope should surface as an error.");

		match err {
			Error::Api(api) => {
				assert_eq!(api.code, 1254005);
				assert_eq!(api.message, "invalid document id");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn envelope_tolerates_unknown_fields() {
		let data: BlocksData = decode_envelope(&response(
			200,
			r#"{"code":0,"msg":"ok","data":{"items":[{"block_id":"b1","block_type":2,"brand_new_field":{}}],"has_more":false},"trace_id":"xyz"}"#,
		))
		.expect("Unknown fields should be ignored, not propagated.");

		assert_eq!(data.items[0].block_id, "b1");
	}

	#[test]
	fn malformed_envelope_reports_decode_error() {
		let err = decode_envelope::<FilesData>(&response(200, "<html>bad gateway</html>"))
			.expect_err("Non-JSON body should fail decoding.");

		assert!(matches!(err, Error::Decode(DecodeError::Envelope { status: 200, .. })));
	}
}
