//! Service descriptor defining the OAuth and API endpoints the client talks to.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ServiceDescriptorError {
	/// Authorization endpoint is required for the interactive flow.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is mandatory for every credential exchange.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// API base URL is mandatory for document operations.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Endpoint set the client needs to operate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoints {
	/// Interactive consent URL presented to the user.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
	/// Base URL every document endpoint path is joined onto.
	pub api_base: Url,
}

/// Validated endpoint configuration for one docs service deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDescriptor {
	/// Endpoint set for the deployment.
	pub endpoints: ServiceEndpoints,
}
impl ServiceDescriptor {
	/// Returns a builder seeded with no endpoints.
	pub fn builder() -> ServiceDescriptorBuilder {
		ServiceDescriptorBuilder::new()
	}

	/// Returns the production Feishu deployment.
	pub fn feishu() -> Self {
		let parse = |value: &str| {
			Url::parse(value).unwrap_or_else(|e| panic!("Built-in endpoint {value} must parse: {e}."))
		};

		Self {
			endpoints: ServiceEndpoints {
				authorization: parse("https://accounts.feishu.cn/open-apis/authen/v1/authorize"),
				token: parse("https://open.feishu.cn/open-apis/authen/v2/oauth/token"),
				api_base: parse("https://open.feishu.cn/open-apis/"),
			},
		}
	}

	fn validate(&self) -> Result<(), ServiceDescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("API base", &self.endpoints.api_base)?;

		Ok(())
	}
}

/// Builder for [`ServiceDescriptor`] values.
#[derive(Debug, Default)]
pub struct ServiceDescriptorBuilder {
	/// Optional authorization endpoint (required to build).
	pub authorization_endpoint: Option<Url>,
	/// Optional token endpoint (required to build).
	pub token_endpoint: Option<Url>,
	/// Optional API base URL (required to build).
	pub api_base: Option<Url>,
}
impl ServiceDescriptorBuilder {
	fn new() -> Self {
		Self::default()
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ServiceDescriptor, ServiceDescriptorError> {
		let authorization = self
			.authorization_endpoint
			.ok_or(ServiceDescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(ServiceDescriptorError::MissingTokenEndpoint)?;
		let api_base = self.api_base.ok_or(ServiceDescriptorError::MissingApiBase)?;
		let descriptor =
			ServiceDescriptor { endpoints: ServiceEndpoints { authorization, token, api_base } };

		descriptor.validate()?;

		Ok(descriptor)
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ServiceDescriptorError> {
	if url.scheme() != "https" {
		Err(ServiceDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Test URL should parse.")
	}

	#[test]
	fn builder_requires_every_endpoint() {
		let err = ServiceDescriptor::builder()
			.token_endpoint(url("https://example.com/token"))
			.api_base(url("https://example.com/api/"))
			.build()
			.expect_err("Descriptor builder should reject a missing authorization endpoint.");

		assert!(matches!(err, ServiceDescriptorError::MissingAuthorizationEndpoint));
	}

	#[test]
	fn builder_rejects_insecure_endpoints() {
		let err = ServiceDescriptor::builder()
			.authorization_endpoint(url("http://example.com/authorize"))
			.token_endpoint(url("https://example.com/token"))
			.api_base(url("https://example.com/api/"))
			.build()
			.expect_err("Descriptor builder should reject insecure endpoints.");

		assert!(matches!(
			err,
			ServiceDescriptorError::InsecureEndpoint { endpoint: "authorization", .. }
		));
	}

	#[test]
	fn production_default_is_valid() {
		let descriptor = ServiceDescriptor::feishu();

		assert!(descriptor.validate().is_ok());
		assert!(descriptor.endpoints.api_base.as_str().ends_with('/'));
	}
}
