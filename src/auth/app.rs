//! Strongly typed app identity shared read-only across the client.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::{_prelude::*, auth::secret::TokenSecret};

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("App identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("App identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier exceeded the allowed character count.
	#[error("App identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Unique identifier for the application registered with the docs service.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppId(String);
impl AppId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for AppId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for AppId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<AppId> for String {
	fn from(value: AppId) -> Self {
		value.0
	}
}
impl TryFrom<String> for AppId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for AppId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for AppId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "AppId({})", self.0)
	}
}
impl Display for AppId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for AppId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// Redacted app secret used for credential-acquiring exchanges.
pub type AppSecret = TokenSecret;

/// Long-lived application identity, immutable for the process lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct AppIdentity {
	/// App identifier issued by the service console.
	pub app_id: AppId,
	/// App secret issued alongside the identifier.
	pub app_secret: AppSecret,
}
impl AppIdentity {
	/// Creates an identity after validating the identifier.
	pub fn new(
		app_id: impl AsRef<str>,
		app_secret: impl Into<String>,
	) -> Result<Self, IdentifierError> {
		Ok(Self { app_id: AppId::new(app_id)?, app_secret: AppSecret::new(app_secret) })
	}
}
impl Debug for AppIdentity {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppIdentity")
			.field("app_id", &self.app_id)
			.field("app_secret", &"<redacted>")
			.finish()
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
