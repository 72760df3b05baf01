//! Token authority orchestrating the credential lifecycle with singleflight guards.
//!
//! Every caller that needs a bearer token asks [`TokenAuthority::valid_token`] and
//! receives a credential that will not expire before use. Reads of a still-valid
//! credential never block; when the credential is stale the first caller performs
//! the refresh exchange while every concurrent caller waits on the same guard and
//! observes the swapped-in result. Rejected refresh tokens clear the cached
//! credential (cell and store) and surface [`AuthError::RefreshRejected`] so the
//! hosting system can re-run the interactive flow.

pub mod exchange;

mod metrics;

pub use exchange::{AppToken, AuthorizationRequest};
pub use metrics::AuthorityMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AppIdentity, Credential},
	error::{AuthError, ConfigError},
	http::{ApiTransport, RateLimitedTransport, RetryPolicy},
	obs::{self, CallKind, CallOutcome, CallSpan},
	service::ServiceDescriptor,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

const REFRESH_ATTEMPTS: u32 = 3;
const REFRESH_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(200);

/// Owns the credential and guarantees freshness to every concurrent caller.
pub struct TokenAuthority {
	identity: AppIdentity,
	descriptor: ServiceDescriptor,
	store: Arc<dyn CredentialStore>,
	transport: Arc<dyn ApiTransport>,
	exchange_transport: RateLimitedTransport,
	credential: RwLock<Option<Arc<Credential>>>,
	refresh_guard: AsyncMutex<()>,
	metrics: AuthorityMetrics,
	redirect_uri: Option<Url>,
	scope: Option<String>,
}
impl TokenAuthority {
	/// Creates an authority that reuses the caller-provided transport.
	pub fn new(
		identity: AppIdentity,
		descriptor: ServiceDescriptor,
		store: Arc<dyn CredentialStore>,
		transport: Arc<dyn ApiTransport>,
	) -> Self {
		// Token endpoints share the service's rate limit with every other endpoint.
		let exchange_transport =
			RateLimitedTransport::new(transport.clone(), RetryPolicy::default());

		Self {
			identity,
			descriptor,
			store,
			transport,
			exchange_transport,
			credential: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
			metrics: AuthorityMetrics::default(),
			redirect_uri: None,
			scope: None,
		}
	}

	/// Sets the redirect URI required by the interactive authorization flow.
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	/// Sets the scope string requested during authorization.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Returns the service descriptor the authority talks to.
	pub fn descriptor(&self) -> &ServiceDescriptor {
		&self.descriptor
	}

	/// Returns the application identity.
	pub fn identity(&self) -> &AppIdentity {
		&self.identity
	}

	/// Returns the raw transport so composed clients can share it.
	pub fn transport(&self) -> &Arc<dyn ApiTransport> {
		&self.transport
	}

	/// Returns the lifecycle counters.
	pub fn metrics(&self) -> &AuthorityMetrics {
		&self.metrics
	}

	/// Returns a credential guaranteed to be fresh at the time of return.
	///
	/// The fast path is a lock-free-in-spirit read of the credential cell; the slow
	/// path singleflights the refresh exchange so N concurrent stale observers
	/// produce exactly one network call and share its outcome.
	pub async fn valid_token(&self) -> Result<Arc<Credential>> {
		if let Some(current) = self.fresh_credential(OffsetDateTime::now_utc()) {
			self.metrics.record_cache_hit();

			return Ok(current);
		}

		let _singleflight = self.refresh_guard.lock().await;
		let now = OffsetDateTime::now_utc();

		// A waiter that queued behind an in-flight refresh sees the swapped cell here.
		if let Some(current) = self.fresh_credential(now) {
			self.metrics.record_cache_hit();

			return Ok(current);
		}
		if self.credential.read().is_none() {
			if let Some(persisted) =
				self.store.load(&self.identity.app_id).await.map_err(Error::from)?
			{
				let shared = self.install(persisted);

				if shared.fresh_at(now) {
					return Ok(shared);
				}
			}
		}

		self.refresh_locked().await
	}

	/// Forces a refresh after an upstream 401 disagreed with the local expiry estimate.
	///
	/// `observed_access` is the access token the caller sent; if the cell already
	/// holds a different credential another caller rotated it first and that
	/// credential is returned without a second exchange.
	pub async fn refresh(&self, observed_access: &str) -> Result<Arc<Credential>> {
		let _singleflight = self.refresh_guard.lock().await;

		if let Some(current) = self.current_credential() {
			if current.access_token.expose() != observed_access {
				return Ok(current);
			}
		}

		self.refresh_locked().await
	}

	/// Constructs the interactive consent URL the hosting system must present.
	pub fn begin_authorization(&self) -> Result<AuthorizationRequest> {
		let redirect_uri = self.redirect_uri.as_ref().ok_or(ConfigError::MissingRedirectUri)?;

		Ok(exchange::build_authorization_request(
			&self.descriptor,
			&self.identity.app_id,
			redirect_uri,
			self.scope.as_deref(),
		))
	}

	/// Exchanges an authorization code for the initial credential and stores it.
	pub async fn complete_authorization(&self, code: &str) -> Result<Arc<Credential>> {
		const KIND: CallKind = CallKind::Exchange;

		let span = CallSpan::new(KIND, "complete_authorization");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let redirect_uri =
					self.redirect_uri.as_ref().ok_or(ConfigError::MissingRedirectUri)?;
				let credential = exchange::exchange_authorization_code(
					&self.exchange_transport,
					&self.descriptor,
					&self.identity,
					code,
					redirect_uri,
				)
				.await?;
				let _singleflight = self.refresh_guard.lock().await;
				let shared = self.install(credential);

				self.persist(&shared).await?;
				self.metrics.record_exchange();

				Ok(shared)
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Mints a short-lived app-level token from the app identity.
	///
	/// App tokens authenticate tenant-less endpoints and are never cached; the
	/// lifetime is short enough that callers fetch one per batch of work.
	pub async fn app_access_token(&self) -> Result<AppToken> {
		const KIND: CallKind = CallKind::AppToken;

		let span = CallSpan::new(KIND, "app_access_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let token = exchange::app_access_token(
					&self.exchange_transport,
					&self.descriptor,
					&self.identity,
				)
				.await?;

				self.metrics.record_exchange();

				Ok(token)
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	/// Clears the cached credential locally and in the store.
	pub async fn clear(&self) -> Result<()> {
		let _singleflight = self.refresh_guard.lock().await;

		self.clear_local();
		self.store.clear(&self.identity.app_id).await.map_err(Error::from)
	}

	/// Performs the refresh exchange; the singleflight guard must already be held.
	async fn refresh_locked(&self) -> Result<Arc<Credential>> {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "refresh");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let refresh_secret = self
					.current_credential()
					.and_then(|credential| credential.refresh_token.clone())
					.ok_or(AuthError::Expired)?;
				let mut attempt = 0_u32;
				let credential = loop {
					match exchange::refresh_token(
						&self.exchange_transport,
						&self.descriptor,
						&self.identity,
						refresh_secret.expose(),
					)
					.await
					{
						Ok(credential) => break credential,
						Err(Error::Transport(_)) if attempt + 1 < REFRESH_ATTEMPTS => {
							tokio::time::sleep(REFRESH_RETRY_DELAY * 2_u32.pow(attempt)).await;

							attempt += 1;
						},
						Err(Error::Transport(_)) =>
							return Err(AuthError::Unreachable { attempts: attempt + 1 }.into()),
						Err(Error::Api(_)) => {
							// A rejected refresh token is terminal; only the interactive flow can recover.
							self.clear_local();

							let _ = self.store.clear(&self.identity.app_id).await;

							return Err(AuthError::RefreshRejected.into());
						},
						Err(other) => return Err(other),
					}
				};
				let shared = self.install(credential);

				self.persist(&shared).await?;
				self.metrics.record_refresh();

				Ok(shared)
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => {
				self.metrics.record_failure();
				obs::record_call_outcome(KIND, CallOutcome::Failure);
			},
		}

		result
	}

	fn fresh_credential(&self, now: OffsetDateTime) -> Option<Arc<Credential>> {
		self.credential.read().as_ref().filter(|credential| credential.fresh_at(now)).cloned()
	}

	fn current_credential(&self) -> Option<Arc<Credential>> {
		self.credential.read().clone()
	}

	fn install(&self, credential: Credential) -> Arc<Credential> {
		let shared = Arc::new(credential);

		*self.credential.write() = Some(shared.clone());

		shared
	}

	fn clear_local(&self) {
		*self.credential.write() = None;
	}

	async fn persist(&self, credential: &Credential) -> Result<()> {
		self.store
			.save(self.identity.app_id.clone(), credential.clone())
			.await
			.map_err(Error::from)
	}
}
#[cfg(feature = "reqwest")]
impl TokenAuthority {
	/// Creates an authority backed by the crate's default reqwest transport.
	pub fn reqwest(
		identity: AppIdentity,
		descriptor: ServiceDescriptor,
		store: Arc<dyn CredentialStore>,
	) -> Self {
		Self::new(identity, descriptor, store, Arc::new(ReqwestTransport::default()))
	}
}
impl Debug for TokenAuthority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenAuthority")
			.field("identity", &self.identity)
			.field("descriptor", &self.descriptor)
			.field("credential_cached", &self.credential.read().is_some())
			.finish()
	}
}
