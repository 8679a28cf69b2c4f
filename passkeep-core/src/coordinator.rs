//! Login, signup and logout orchestration.
//!
//! [`SessionCoordinator`] drives the multi-step session protocol and reports
//! it as a stream of [`SessionEvent`]s: `Pending` first, then exactly one
//! terminal event, then the stream ends.
//!
//! ```text
//! login:   credential -> registration check -> exchange -> persist -> cache refresh -> LoggedIn
//! signup:  backend signup -> persist -> cache refresh -> LoggedIn
//! logout:  backend logout -> provider logout -> cache invalidate -> store clear -> LoggedOut
//! ```
//!
//! The coordinator does not serialize operations. Callers must not run a
//! login and a logout for the same session at the same time.

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

use crate::api::{ApiError, SessionApi};
use crate::model::{Provider, ProviderCredential, Session, SessionKey, SocialCredential};
use crate::provider::{CredentialProvider, ProviderRegistry};
use crate::store::{SessionStore, StoreError};
use crate::token_cache::TokenCache;

/// Reason reported when either side of a logout fails.
pub const LOGOUT_FAILED_MESSAGE: &str = "logout failed";

/// Progress of a login, signup or logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The operation has started.
    Pending,

    /// A session was established and the token cache refreshed.
    LoggedIn,

    /// The provider identity has no account yet.
    ///
    /// Carries the credential so [`SessionCoordinator::signup`] can reuse it
    /// without prompting the provider again.
    SignupRequired { credential: ProviderCredential },

    /// The session was ended (or none existed).
    LoggedOut,

    /// The operation failed; nothing further happens.
    Failed { reason: String },
}

impl SessionEvent {
    fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether this event ends its sequence.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Orchestrates the session protocol across providers, backend, store and cache.
///
/// Cheap to clone; clones share the same collaborators.
///
/// # Example
///
/// ```rust,ignore
/// use futures::StreamExt;
/// use passkeep_core::{Provider, SessionCoordinator, SessionEvent};
///
/// let mut events = coordinator.login(Provider::Google);
/// while let Some(event) = events.next().await {
///     match event {
///         SessionEvent::Pending => show_spinner(),
///         SessionEvent::LoggedIn => open_library(),
///         SessionEvent::SignupRequired { credential } => ask_for_name(credential),
///         SessionEvent::Failed { reason } => show_error(&reason),
///         SessionEvent::LoggedOut => {}
///     }
/// }
/// ```
#[derive(Clone)]
pub struct SessionCoordinator {
    providers: Arc<ProviderRegistry>,
    api: Arc<dyn SessionApi>,
    store: Arc<dyn SessionStore>,
    cache: Arc<TokenCache>,
}

impl SessionCoordinator {
    pub fn new(
        providers: ProviderRegistry,
        api: Arc<dyn SessionApi>,
        store: Arc<dyn SessionStore>,
        cache: Arc<TokenCache>,
    ) -> Self {
        Self {
            providers: Arc::new(providers),
            api,
            store,
            cache,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Log in with `provider`.
    ///
    /// Terminal events: `LoggedIn`, `SignupRequired`, `Failed`.
    pub fn login(&self, provider: Provider) -> BoxStream<'static, SessionEvent> {
        let this = self.clone();
        let span = tracing::info_span!("login", %provider);
        event_stream(async move { this.run_login(provider).await }.instrument(span))
    }

    /// Create an account for a credential that came back with `SignupRequired`.
    ///
    /// Terminal events: `LoggedIn`, `Failed`.
    pub fn signup(
        &self,
        credential: ProviderCredential,
        display_name: impl Into<String>,
    ) -> BoxStream<'static, SessionEvent> {
        let this = self.clone();
        let display_name = display_name.into();
        let span = tracing::info_span!("signup", provider = %credential.provider);
        event_stream(async move { this.run_signup(credential, display_name).await }.instrument(span))
    }

    /// Log out of the current session, which was opened with `provider`.
    ///
    /// The provider-side logout goes to the provider recorded in the stored
    /// session; a mismatching `provider` is logged and otherwise ignored.
    ///
    /// Terminal events: `LoggedOut`, `Failed`.
    pub fn logout(&self, provider: Provider) -> BoxStream<'static, SessionEvent> {
        let this = self.clone();
        let span = tracing::info_span!("logout", %provider);
        event_stream(async move { this.run_logout(provider).await }.instrument(span))
    }

    /// The stored session, if any.
    pub async fn current_session(&self) -> Result<Option<Session>, StoreError> {
        self.store.load_session().await
    }

    /// Watch whether a session exists, for "logged in" indicators.
    pub fn logged_in(&self) -> BoxStream<'static, bool> {
        self.store
            .observe(SessionKey::Authorization)
            .map(|token| token.is_some())
            .boxed()
    }

    async fn run_login(&self, provider: Provider) -> SessionEvent {
        let credential_provider = match self.credential_provider(provider) {
            Ok(p) => p,
            Err(event) => return event,
        };

        let credential = match credential_provider.login().await {
            SocialCredential::Success(credential) => credential,
            SocialCredential::Failure { message } => {
                tracing::info!("Provider login did not complete: {}", message);
                return SessionEvent::failed(message);
            }
        };

        match self.api.check_registration(&credential).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("Identity is not registered, signup required");
                return SessionEvent::SignupRequired { credential };
            }
            Err(e) => return api_failure("registration check", e),
        }

        match self.api.exchange(&credential).await {
            Ok(session) => self.establish(session).await,
            Err(e) => api_failure("credential exchange", e),
        }
    }

    async fn run_signup(&self, credential: ProviderCredential, display_name: String) -> SessionEvent {
        match self.api.signup(&credential, &display_name).await {
            Ok(session) => self.establish(session).await,
            Err(e) => api_failure("signup", e),
        }
    }

    async fn run_logout(&self, provider: Provider) -> SessionEvent {
        let session = match self.store.load_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::info!("No session stored, nothing to log out");
                self.cache.invalidate();
                return SessionEvent::LoggedOut;
            }
            Err(e) => return storage_failure(e),
        };

        // The provider that opened the session is the one to log out of
        if session.provider != provider {
            tracing::warn!(
                "Logout requested for {} but the session was opened with {}",
                provider,
                session.provider
            );
        }
        let credential_provider = match self.credential_provider(session.provider) {
            Ok(p) => p,
            Err(event) => return event,
        };

        // The local session survives a failed backend logout so client and
        // server stay in agreement.
        if let Err(e) = self.api.logout().await {
            return api_failure("backend logout", e);
        }

        if !credential_provider.logout().await {
            tracing::warn!("Provider-side logout failed, keeping local session");
            return SessionEvent::failed(LOGOUT_FAILED_MESSAGE);
        }

        self.cache.invalidate();
        if let Err(e) = self.store.clear().await {
            // Session is still stored; put its token back in the cache
            if let Err(refresh_error) = self.cache.refresh().await {
                tracing::warn!("Could not restore token cache: {}", refresh_error);
            }
            return storage_failure(e);
        }

        tracing::info!("Logged out");
        SessionEvent::LoggedOut
    }

    /// Persist a fresh session and point the token cache at it.
    async fn establish(&self, session: Session) -> SessionEvent {
        if let Err(e) = self.store.save_session(&session).await {
            return storage_failure(e);
        }
        if let Err(e) = self.cache.refresh().await {
            return storage_failure(e);
        }

        tracing::info!("Logged in as {}", session.display_name);
        SessionEvent::LoggedIn
    }

    fn credential_provider(
        &self,
        provider: Provider,
    ) -> Result<Arc<dyn CredentialProvider>, SessionEvent> {
        self.providers.get(provider).ok_or_else(|| {
            tracing::error!("No credential provider registered for {}", provider);
            SessionEvent::failed(format!("provider not configured: {}", provider))
        })
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("providers", &self.providers)
            .field("cache", &self.cache)
            .finish()
    }
}

/// `Pending`, then the single terminal event produced by `operation`.
fn event_stream<F>(operation: F) -> BoxStream<'static, SessionEvent>
where
    F: Future<Output = SessionEvent> + Send + 'static,
{
    stream::once(async { SessionEvent::Pending })
        .chain(stream::once(operation))
        .boxed()
}

fn api_failure(step: &str, e: ApiError) -> SessionEvent {
    tracing::warn!("{} failed: {:?}", step, e);
    SessionEvent::failed(e.user_message())
}

fn storage_failure(e: StoreError) -> SessionEvent {
    tracing::error!("Session storage failed: {}", e);
    SessionEvent::failed(format!("storage error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySessionStore, Secret, SessionSnapshot};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Provider returning a fixed login result.
    struct StubProvider {
        provider: Provider,
        login: SocialCredential,
        logout: bool,
    }

    impl StubProvider {
        fn ok(provider: Provider) -> Self {
            Self {
                provider,
                login: SocialCredential::Success(ProviderCredential::new(
                    provider,
                    "id-1",
                    "provider-token",
                )),
                logout: true,
            }
        }
    }

    #[async_trait]
    impl CredentialProvider for StubProvider {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn login(&self) -> SocialCredential {
            self.login.clone()
        }

        async fn logout(&self) -> bool {
            self.logout
        }
    }

    /// Backend double recording the calls it receives.
    #[derive(Default)]
    struct StubApi {
        unregistered: bool,
        exchange_error: Option<fn() -> ApiError>,
        logout_error: Option<fn() -> ApiError>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl StubApi {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl SessionApi for StubApi {
        async fn check_registration(&self, _: &ProviderCredential) -> Result<bool, ApiError> {
            self.calls.lock().push("check");
            Ok(!self.unregistered)
        }

        async fn exchange(&self, credential: &ProviderCredential) -> Result<Session, ApiError> {
            self.calls.lock().push("exchange");
            match self.exchange_error {
                Some(error) => Err(error()),
                None => Ok(Session::new(credential.provider, "T1", "R1", "alice")),
            }
        }

        async fn signup(
            &self,
            credential: &ProviderCredential,
            display_name: &str,
        ) -> Result<Session, ApiError> {
            self.calls.lock().push("signup");
            Ok(Session::new(credential.provider, "T2", "R2", display_name))
        }

        async fn logout(&self) -> Result<(), ApiError> {
            self.calls.lock().push("logout");
            match self.logout_error {
                Some(error) => Err(error()),
                None => Ok(()),
            }
        }
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl SessionStore for BrokenStore {
        async fn snapshot(&self) -> Result<SessionSnapshot, StoreError> {
            Ok(SessionSnapshot::new())
        }

        async fn set_all(&self, _: Vec<(SessionKey, String)>) -> Result<(), StoreError> {
            Err(StoreError::BackendError {
                message: "disk full".to_string(),
            })
        }

        async fn clear(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn observe(&self, _: SessionKey) -> BoxStream<'static, Option<String>> {
            stream::empty().boxed()
        }
    }

    /// Memory store whose `clear` always fails.
    struct LockedStore {
        inner: MemorySessionStore,
    }

    #[async_trait]
    impl SessionStore for LockedStore {
        async fn snapshot(&self) -> Result<SessionSnapshot, StoreError> {
            self.inner.snapshot().await
        }

        async fn set_all(&self, entries: Vec<(SessionKey, String)>) -> Result<(), StoreError> {
            self.inner.set_all(entries).await
        }

        async fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::BackendError {
                message: "locked".to_string(),
            })
        }

        fn observe(&self, key: SessionKey) -> BoxStream<'static, Option<String>> {
            self.inner.observe(key)
        }
    }

    struct Fixture {
        coordinator: SessionCoordinator,
        api: Arc<StubApi>,
        store: Arc<MemorySessionStore>,
        cache: Arc<TokenCache>,
    }

    fn fixture(provider: StubProvider, api: StubApi, store: MemorySessionStore) -> Fixture {
        let api = Arc::new(api);
        let store = Arc::new(store);
        let cache = Arc::new(TokenCache::new(store.clone()));
        let coordinator = SessionCoordinator::new(
            ProviderRegistry::new().with(Arc::new(provider)),
            api.clone(),
            store.clone(),
            cache.clone(),
        );
        Fixture {
            coordinator,
            api,
            store,
            cache,
        }
    }

    fn existing_session() -> Session {
        Session::new(Provider::Google, "OLD", "R0", "alice")
    }

    #[tokio::test]
    async fn test_login_success() {
        let f = fixture(
            StubProvider::ok(Provider::Google),
            StubApi::default(),
            MemorySessionStore::new(),
        );

        let events: Vec<_> = f.coordinator.login(Provider::Google).collect().await;

        assert_eq!(events, vec![SessionEvent::Pending, SessionEvent::LoggedIn]);
        assert_eq!(f.cache.get_token(), Some(Secret::new("T1")));
        assert_eq!(f.api.calls(), vec!["check", "exchange"]);
    }

    #[tokio::test]
    async fn test_login_refreshes_sticky_absent_token() {
        let f = fixture(
            StubProvider::ok(Provider::Google),
            StubApi::default(),
            MemorySessionStore::new(),
        );
        assert!(f.cache.get_token().is_none());

        let _: Vec<_> = f.coordinator.login(Provider::Google).collect().await;

        assert_eq!(f.cache.get_token(), Some(Secret::new("T1")));
    }

    #[tokio::test]
    async fn test_login_provider_failure_leaves_store_untouched() {
        let mut provider = StubProvider::ok(Provider::Kakao);
        provider.login = SocialCredential::failure("cancelled");
        let f = fixture(provider, StubApi::default(), MemorySessionStore::new());

        let events: Vec<_> = f.coordinator.login(Provider::Kakao).collect().await;

        assert_eq!(
            events,
            vec![SessionEvent::Pending, SessionEvent::failed("cancelled")]
        );
        assert!(f.api.calls().is_empty());
        assert!(f.store.load_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_unregistered_requires_signup_without_exchange() {
        let api = StubApi {
            unregistered: true,
            ..StubApi::default()
        };
        let f = fixture(StubProvider::ok(Provider::Naver), api, MemorySessionStore::new());

        let events: Vec<_> = f.coordinator.login(Provider::Naver).collect().await;

        let expected = ProviderCredential::new(Provider::Naver, "id-1", "provider-token");
        assert_eq!(
            events,
            vec![
                SessionEvent::Pending,
                SessionEvent::SignupRequired {
                    credential: expected
                }
            ]
        );
        assert_eq!(f.api.calls(), vec!["check"]);
    }

    #[tokio::test]
    async fn test_signup_reuses_credential() {
        let f = fixture(
            StubProvider::ok(Provider::Naver),
            StubApi::default(),
            MemorySessionStore::new(),
        );
        let credential = ProviderCredential::new(Provider::Naver, "id-1", "provider-token");

        let events: Vec<_> = f.coordinator.signup(credential, "bob").collect().await;

        assert_eq!(events, vec![SessionEvent::Pending, SessionEvent::LoggedIn]);
        let session = f.store.load_session().await.unwrap().unwrap();
        assert_eq!(session.display_name, "bob");
        assert_eq!(f.cache.get_token(), Some(Secret::new("T2")));
    }

    #[tokio::test]
    async fn test_login_exchange_unauthorized() {
        let api = StubApi {
            exchange_error: Some(|| ApiError::Unauthorized),
            ..StubApi::default()
        };
        let f = fixture(StubProvider::ok(Provider::Google), api, MemorySessionStore::new());

        let events: Vec<_> = f.coordinator.login(Provider::Google).collect().await;

        assert_eq!(
            events,
            vec![SessionEvent::Pending, SessionEvent::failed("unauthorized")]
        );
    }

    #[tokio::test]
    async fn test_login_storage_failure_is_reported() {
        let api = Arc::new(StubApi::default());
        let store: Arc<dyn SessionStore> = Arc::new(BrokenStore);
        let cache = Arc::new(TokenCache::new(store.clone()));
        let coordinator = SessionCoordinator::new(
            ProviderRegistry::new().with(Arc::new(StubProvider::ok(Provider::Google))),
            api,
            store,
            cache,
        );

        let events: Vec<_> = coordinator.login(Provider::Google).collect().await;

        match &events[..] {
            [SessionEvent::Pending, SessionEvent::Failed { reason }] => {
                assert!(reason.starts_with("storage error"), "{}", reason);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_unregistered_provider() {
        let f = fixture(
            StubProvider::ok(Provider::Google),
            StubApi::default(),
            MemorySessionStore::new(),
        );

        let events: Vec<_> = f.coordinator.login(Provider::Kakao).collect().await;

        assert_eq!(
            events,
            vec![
                SessionEvent::Pending,
                SessionEvent::failed("provider not configured: kakao")
            ]
        );
    }

    #[tokio::test]
    async fn test_logout_success() {
        let f = fixture(
            StubProvider::ok(Provider::Google),
            StubApi::default(),
            MemorySessionStore::with_session(&existing_session()),
        );
        f.cache.refresh().await.unwrap();

        let events: Vec<_> = f.coordinator.logout(Provider::Google).collect().await;

        assert_eq!(events, vec![SessionEvent::Pending, SessionEvent::LoggedOut]);
        assert!(f.store.load_session().await.unwrap().is_none());
        assert!(f.cache.get_token().is_none());
    }

    #[tokio::test]
    async fn test_logout_backend_failure_keeps_session() {
        let api = StubApi {
            logout_error: Some(|| ApiError::Server { status: 500 }),
            ..StubApi::default()
        };
        let f = fixture(
            StubProvider::ok(Provider::Google),
            api,
            MemorySessionStore::with_session(&existing_session()),
        );
        f.cache.refresh().await.unwrap();

        let events: Vec<_> = f.coordinator.logout(Provider::Google).collect().await;

        assert_eq!(
            events,
            vec![SessionEvent::Pending, SessionEvent::failed("server error")]
        );
        assert_eq!(
            f.store.load_session().await.unwrap(),
            Some(existing_session())
        );
        assert_eq!(f.cache.get_token(), Some(Secret::new("OLD")));
    }

    #[tokio::test]
    async fn test_logout_provider_failure_keeps_session() {
        let mut provider = StubProvider::ok(Provider::Google);
        provider.logout = false;
        let f = fixture(
            provider,
            StubApi::default(),
            MemorySessionStore::with_session(&existing_session()),
        );

        let events: Vec<_> = f.coordinator.logout(Provider::Google).collect().await;

        assert_eq!(
            events,
            vec![
                SessionEvent::Pending,
                SessionEvent::failed(LOGOUT_FAILED_MESSAGE)
            ]
        );
        assert!(f.store.load_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout_clear_failure_keeps_cached_token() {
        let store: Arc<dyn SessionStore> = Arc::new(LockedStore {
            inner: MemorySessionStore::with_session(&existing_session()),
        });
        let cache = Arc::new(TokenCache::new(store.clone()));
        cache.refresh().await.unwrap();
        let coordinator = SessionCoordinator::new(
            ProviderRegistry::new().with(Arc::new(StubProvider::ok(Provider::Google))),
            Arc::new(StubApi::default()),
            store.clone(),
            cache.clone(),
        );

        let events: Vec<_> = coordinator.logout(Provider::Google).collect().await;

        match &events[..] {
            [SessionEvent::Pending, SessionEvent::Failed { reason }] => {
                assert!(reason.starts_with("storage error"), "{}", reason);
            }
            other => panic!("unexpected events: {:?}", other),
        }
        assert!(store.load_session().await.unwrap().is_some());
        assert_eq!(cache.get_token(), Some(Secret::new("OLD")));
    }

    #[tokio::test]
    async fn test_logout_uses_provider_of_stored_session() {
        let mut kakao = StubProvider::ok(Provider::Kakao);
        kakao.logout = false;
        let api = Arc::new(StubApi::default());
        let store = Arc::new(MemorySessionStore::with_session(&existing_session()));
        let cache = Arc::new(TokenCache::new(store.clone()));
        let coordinator = SessionCoordinator::new(
            ProviderRegistry::new()
                .with(Arc::new(StubProvider::ok(Provider::Google)))
                .with(Arc::new(kakao)),
            api.clone(),
            store.clone(),
            cache,
        );

        // Kakao would refuse; the session belongs to Google
        let events: Vec<_> = coordinator.logout(Provider::Kakao).collect().await;

        assert_eq!(events, vec![SessionEvent::Pending, SessionEvent::LoggedOut]);
        assert_eq!(api.calls(), vec!["logout"]);
        assert!(store.load_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop_success() {
        let f = fixture(
            StubProvider::ok(Provider::Google),
            StubApi::default(),
            MemorySessionStore::new(),
        );

        let events: Vec<_> = f.coordinator.logout(Provider::Google).collect().await;

        assert_eq!(events, vec![SessionEvent::Pending, SessionEvent::LoggedOut]);
        assert!(f.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_every_sequence_has_one_trailing_terminal() {
        let f = fixture(
            StubProvider::ok(Provider::Google),
            StubApi::default(),
            MemorySessionStore::new(),
        );

        let sequences = vec![
            f.coordinator.login(Provider::Google).collect::<Vec<_>>().await,
            f.coordinator.logout(Provider::Google).collect::<Vec<_>>().await,
            f.coordinator.logout(Provider::Naver).collect::<Vec<_>>().await,
        ];

        for events in sequences {
            assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
            assert!(events.last().unwrap().is_terminal());
            assert_eq!(events[0], SessionEvent::Pending);
        }
    }

    #[tokio::test]
    async fn test_logged_in_indicator_follows_session() {
        let f = fixture(
            StubProvider::ok(Provider::Google),
            StubApi::default(),
            MemorySessionStore::new(),
        );
        let mut logged_in = f.coordinator.logged_in();
        assert_eq!(logged_in.next().await, Some(false));

        let _: Vec<_> = f.coordinator.login(Provider::Google).collect().await;
        assert_eq!(logged_in.next().await, Some(true));
    }
}
