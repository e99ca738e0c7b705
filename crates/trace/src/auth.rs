//! Account authentication and session tracking.
//!
//! [`AuthProvider`] is the seam to an external identity service. The
//! bundled [`LocalAuthProvider`] keeps argon2id password hashes in an
//! `accounts` collection of the same document store that holds profiles,
//! and issues opaque bearer tokens held in memory until they expire.
//!
//! Sign-in state is published on a `tokio::sync::watch` channel. The
//! identity arrives before the profile is fetched, so consumers must
//! tolerate a signed-in identity whose profile is not yet (or never) known;
//! see [`current_profile`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use krishi_core::{Actor, Role, ValidationError};
use krishi_storage::{get_profile, put_profile, DocumentStore, StorageError};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{watch, RwLock};

use crate::error::TraceError;

/// Collection holding credential records, keyed by normalized email.
pub const ACCOUNTS: &str = "accounts";

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// How long a bearer session stays valid after sign-in.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

const UID_LEN: usize = 15;
const TOKEN_LEN: usize = 32;

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// A signed-in session. The token is presented as a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
}

/// Profile fields collected at signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupProfile {
    pub role: Role,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// External identity provider.
///
/// ## Sign-in state
///
/// `subscribe` yields the identity of the most recently started session
/// that is still live, or `None` once no session remains. Receivers see
/// only the latest value.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// Create an account and its profile. Does not sign in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: SignupProfile,
    ) -> Result<Actor, TraceError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, TraceError>;

    /// End the session. Unknown tokens are ignored.
    async fn sign_out(&self, token: &str) -> Result<(), TraceError>;

    /// The identity behind a bearer token, if the session is live.
    async fn identity(&self, token: &str) -> Option<Identity>;

    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// Stored credential record. `password_hash` is a PHC string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    uid: String,
    email: String,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct LiveSession {
    identity: Identity,
    started_at: Instant,
    expires_at: Instant,
}

/// Password authentication over a [`DocumentStore`].
#[derive(Debug)]
pub struct LocalAuthProvider<D> {
    documents: D,
    sessions: RwLock<HashMap<String, LiveSession>>,
    session_ttl: Duration,
    state: watch::Sender<Option<Identity>>,
}

impl<D: DocumentStore> LocalAuthProvider<D> {
    pub fn new(documents: D) -> Self {
        let (state, _) = watch::channel(None);
        LocalAuthProvider {
            documents,
            sessions: RwLock::new(HashMap::new()),
            session_ttl: DEFAULT_SESSION_TTL,
            state,
        }
    }

    /// Replace the session lifetime for sessions started from now on.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// The document store holding accounts and profiles.
    pub fn documents(&self) -> &D {
        &self.documents
    }

    async fn account(&self, email: &str) -> Result<Option<Account>, TraceError> {
        match self.documents.get(ACCOUNTS, email).await? {
            Some(doc) => serde_json::from_value(doc)
                .map(Some)
                .map_err(|e| TraceError::Authentication(format!("unreadable account: {}", e))),
            None => Ok(None),
        }
    }

    /// Drop expired sessions and republish the sign-in state if it changed.
    fn prune(&self, sessions: &mut HashMap<String, LiveSession>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        if sessions.len() != before {
            tracing::debug!(expired = before - sessions.len(), "pruned sessions");
            self.publish(sessions);
        }
    }

    /// Publish the newest live session's identity, or `None`.
    fn publish(&self, sessions: &HashMap<String, LiveSession>) {
        let latest = sessions
            .values()
            .max_by_key(|s| s.started_at)
            .map(|s| s.identity.clone());
        self.state.send_if_modified(|current| {
            if *current == latest {
                return false;
            }
            *current = latest;
            true
        });
    }
}

#[async_trait]
impl<D: DocumentStore> AuthProvider for LocalAuthProvider<D> {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: SignupProfile,
    ) -> Result<Actor, TraceError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(TraceError::Authentication(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if profile.name.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "name" }.into());
        }
        let taken = || TraceError::Authentication(format!("an account already exists for {}", email));
        if self.account(&email).await?.is_some() {
            return Err(taken());
        }

        let account = Account {
            uid: URL_SAFE_NO_PAD.encode(random_bytes(UID_LEN)),
            email: email.clone(),
            password_hash: hash_password(password)?,
        };
        let now = OffsetDateTime::now_utc();
        let actor = Actor {
            uid: account.uid.clone(),
            email: email.clone(),
            role: profile.role,
            name: profile.name.trim().to_string(),
            phone: profile.phone,
            address: profile.address,
            created_at: now,
            updated_at: now,
        };

        let document = serde_json::to_value(&account)
            .map_err(|e| TraceError::Authentication(format!("failed to encode account: {}", e)))?;
        match self.documents.insert(ACCOUNTS, &email, document).await {
            Ok(()) => {}
            Err(StorageError::DuplicateRecord { .. }) => return Err(taken()),
            Err(e) => return Err(e.into()),
        }
        put_profile(&self.documents, &actor).await?;

        tracing::info!(uid = %actor.uid, role = %actor.role, "account created");
        Ok(actor)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, TraceError> {
        let email = normalize_email(email)?;
        let rejected = || TraceError::Authentication("invalid email or password".to_string());

        let account = self.account(&email).await?.ok_or_else(rejected)?;
        if !verify_password(password, &account.password_hash)? {
            tracing::warn!(email = %email, "sign-in rejected");
            return Err(rejected());
        }

        let identity = Identity {
            uid: account.uid,
            email: account.email,
        };
        let token = URL_SAFE_NO_PAD.encode(random_bytes(TOKEN_LEN));
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions, now);
        sessions.insert(
            token.clone(),
            LiveSession {
                identity: identity.clone(),
                started_at: now,
                expires_at: now + self.session_ttl,
            },
        );
        self.publish(&sessions);
        drop(sessions);

        tracing::info!(uid = %identity.uid, "signed in");
        Ok(Session { token, identity })
    }

    async fn sign_out(&self, token: &str) -> Result<(), TraceError> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.remove(token) {
            self.publish(&sessions);
            tracing::info!(uid = %session.identity.uid, "signed out");
        }
        Ok(())
    }

    async fn identity(&self, token: &str) -> Option<Identity> {
        let now = Instant::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(s) if s.expires_at > now => return Some(s.identity.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.prune(&mut *self.sessions.write().await, now);
        None
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}

/// The profile of whoever `state` says is signed in.
///
/// `Ok(None)` when nobody is signed in or the signed-in account has no
/// profile yet.
pub async fn current_profile<D: DocumentStore + ?Sized>(
    state: &watch::Receiver<Option<Identity>>,
    profiles: &D,
) -> Result<Option<Actor>, TraceError> {
    let identity = state.borrow().clone();
    match identity {
        Some(identity) => Ok(get_profile(profiles, &identity.uid).await?),
        None => Ok(None),
    }
}

fn normalize_email(raw: &str) -> Result<String, TraceError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::MissingField { field: "email" }.into());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(TraceError::Authentication(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}

/// Argon2id hash of `password` as a PHC string, salt and parameters included.
fn hash_password(password: &str) -> Result<String, TraceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TraceError::Authentication(format!("failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, TraceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| TraceError::Authentication(format!("unreadable account: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishi_storage::MemoryDocumentStore;

    fn raj() -> SignupProfile {
        SignupProfile {
            role: Role::Farmer,
            name: "Raj Kumar".to_string(),
            phone: Some("+91 98765 43210".to_string()),
            address: Some("Village A, State X".to_string()),
        }
    }

    fn provider() -> LocalAuthProvider<MemoryDocumentStore> {
        LocalAuthProvider::new(MemoryDocumentStore::new())
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = provider();
        let actor = auth
            .sign_up(" Raj@Example.com ", "secret1", raj())
            .await
            .unwrap();
        assert_eq!(actor.email, "raj@example.com");
        assert_eq!(actor.role, Role::Farmer);

        let session = auth.sign_in("raj@example.com", "secret1").await.unwrap();
        assert_eq!(session.identity.uid, actor.uid);
        assert_eq!(auth.identity(&session.token).await, Some(session.identity));

        let profile = get_profile(auth.documents(), &actor.uid).await.unwrap();
        assert_eq!(profile, Some(actor));
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let auth = provider();
        auth.sign_up("raj@example.com", "secret1", raj()).await.unwrap();
        assert!(matches!(
            auth.sign_in("raj@example.com", "secret2").await,
            Err(TraceError::Authentication(_))
        ));
        assert!(matches!(
            auth.sign_in("nobody@example.com", "secret1").await,
            Err(TraceError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn short_password_and_duplicate_email_rejected() {
        let auth = provider();
        assert!(matches!(
            auth.sign_up("raj@example.com", "12345", raj()).await,
            Err(TraceError::Authentication(_))
        ));
        auth.sign_up("raj@example.com", "123456", raj()).await.unwrap();
        assert!(matches!(
            auth.sign_up("RAJ@example.com", "123456", raj()).await,
            Err(TraceError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn invalid_email_rejected() {
        let auth = provider();
        assert!(matches!(
            auth.sign_up("not-an-email", "secret1", raj()).await,
            Err(TraceError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn sign_out_ends_session_and_publishes_none() {
        let auth = provider();
        let mut state = auth.subscribe();
        auth.sign_up("raj@example.com", "secret1", raj()).await.unwrap();
        let session = auth.sign_in("raj@example.com", "secret1").await.unwrap();

        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), Some(session.identity.clone()));

        auth.sign_out(&session.token).await.unwrap();
        assert_eq!(auth.identity(&session.token).await, None);
        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), None);
    }

    #[tokio::test]
    async fn sign_out_publishes_remaining_session() {
        let auth = provider();
        let state = auth.subscribe();
        auth.sign_up("raj@example.com", "secret1", raj()).await.unwrap();
        let mut priya = raj();
        priya.name = "Priya Sharma".to_string();
        auth.sign_up("priya@example.com", "secret1", priya).await.unwrap();

        let first = auth.sign_in("raj@example.com", "secret1").await.unwrap();
        let second = auth.sign_in("priya@example.com", "secret1").await.unwrap();
        assert_eq!(*state.borrow(), Some(second.identity.clone()));

        auth.sign_out(&second.token).await.unwrap();
        assert_eq!(*state.borrow(), Some(first.identity.clone()));
        assert_eq!(auth.identity(&first.token).await, Some(first.identity));

        auth.sign_out(&first.token).await.unwrap();
        assert_eq!(*state.borrow(), None);
    }

    #[tokio::test]
    async fn expired_session_is_rejected_and_pruned() {
        let auth = provider().with_session_ttl(Duration::ZERO);
        let state = auth.subscribe();
        auth.sign_up("raj@example.com", "secret1", raj()).await.unwrap();
        let session = auth.sign_in("raj@example.com", "secret1").await.unwrap();

        assert_eq!(auth.identity(&session.token).await, None);
        assert!(auth.sessions.read().await.is_empty());
        assert_eq!(*state.borrow(), None);
    }

    #[tokio::test]
    async fn password_stored_as_argon2_hash() {
        let auth = provider();
        auth.sign_up("raj@example.com", "secret1", raj()).await.unwrap();
        let doc = auth
            .documents()
            .get(ACCOUNTS, "raj@example.com")
            .await
            .unwrap()
            .unwrap();
        let hash = doc["password_hash"].as_str().unwrap();
        assert!(hash.starts_with("$argon2id$"), "{hash}");
        assert!(!hash.contains("secret1"));
        assert!(verify_password("secret1", hash).unwrap());
        assert!(!verify_password("secret2", hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("secret1", "not-a-phc-string"),
            Err(TraceError::Authentication(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sign_ups_for_one_email() {
        let auth = std::sync::Arc::new(provider());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let auth = auth.clone();
            handles.push(tokio::spawn(async move {
                auth.sign_up("raj@example.com", "secret1", raj()).await
            }));
        }
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert!(matches!(e, TraceError::Authentication(_)), "{e}"),
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn current_profile_tolerates_missing_profile() {
        let auth = provider();
        let state = auth.subscribe();
        assert_eq!(current_profile(&state, auth.documents()).await.unwrap(), None);

        let actor = auth.sign_up("raj@example.com", "secret1", raj()).await.unwrap();
        auth.sign_in("raj@example.com", "secret1").await.unwrap();
        assert_eq!(
            current_profile(&state, auth.documents()).await.unwrap(),
            Some(actor)
        );

        let other = provider();
        let other_state = auth.subscribe();
        assert_eq!(
            current_profile(&other_state, other.documents()).await.unwrap(),
            None
        );
    }
}
