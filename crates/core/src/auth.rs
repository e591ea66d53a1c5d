//! Authentication session and the signed-in user's search history.

use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    api::{ApiClient, ApiRequest, Transport},
    cache::ResponseCache,
    config::AppConfig,
    error::{FetchError, FetchResult},
    models::{json_kind, HistoryEntry, User},
    validation::{LoginForm, RegisterForm},
};

/// Current bearer token and user, shared by handle.
///
/// Token storage beyond the process lifetime is left to the front end.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    inner: Arc<RwLock<Option<SessionState>>>,
}

#[derive(Debug, Clone)]
struct SessionState {
    token: String,
    user: User,
}

impl AuthSession {
    /// Signed-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bearer token, if signed in.
    pub fn token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|state| state.token.clone())
    }

    /// Signed-in user, if any.
    pub fn user(&self) -> Option<User> {
        self.inner.read().as_ref().map(|state| state.user.clone())
    }

    /// Whether a token is held.
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().is_some()
    }

    pub(crate) fn sign_in(&self, token: String, user: User) {
        *self.inner.write() = Some(SessionState { token, user });
    }

    pub(crate) fn sign_out(&self) {
        *self.inner.write() = None;
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    user: User,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    user: Option<User>,
}

/// Sign-in, registration, logout and history retrieval.
pub struct AuthService<T> {
    client: ApiClient<T>,
    cache: ResponseCache,
    history_retries: u32,
    history_stale_after: Duration,
}

impl<T> Clone for AuthService<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            cache: self.cache.clone(),
            history_retries: self.history_retries,
            history_stale_after: self.history_stale_after,
        }
    }
}

impl<T: Transport> AuthService<T> {
    /// Service sharing `client`'s session and the response cache.
    pub fn new(client: ApiClient<T>, cache: ResponseCache, config: &AppConfig) -> Self {
        Self {
            client,
            cache,
            history_retries: config.history_retries,
            history_stale_after: config.history_stale_after(),
        }
    }

    /// The session this service signs in and out.
    pub fn session(&self) -> &AuthSession {
        self.client.session()
    }

    /// Validate `form`, sign in, and start a fresh history cache.
    pub async fn login(&self, form: &LoginForm) -> FetchResult<User> {
        form.validate()?;
        let body = json!({
            "email": form.email.trim(),
            "password": form.password,
        });
        let response = self
            .client
            .send(ApiRequest::post("/auth/login", body))
            .await?;
        let LoginResponse { token, user } = serde_json::from_value(response)?;
        if token.is_empty() {
            return Err(FetchError::Decode("login response carried no token".into()));
        }

        info!(email = %user.email, "Signed in");
        self.session().sign_in(token, user.clone());
        self.cache.invalidate_history();
        Ok(user)
    }

    /// Validate `form`, create the account, then sign in with the same credentials.
    pub async fn register(&self, form: &RegisterForm) -> FetchResult<User> {
        form.validate()?;
        let body = json!({
            "name": form.name.trim(),
            "email": form.email.trim(),
            "password": form.password,
        });
        let response = self
            .client
            .send(ApiRequest::post("/auth/register", body))
            .await?;
        let registered: RegisterResponse = serde_json::from_value(response)?;
        info!(
            email = registered.user.as_ref().map(|u| u.email.as_str()).unwrap_or(""),
            "Account registered"
        );
        self.login(&form.login_form()).await
    }

    /// Forget the session and everything cached during it.
    pub fn logout(&self) {
        self.session().sign_out();
        self.cache.clear();
        info!("Signed out");
    }

    /// Past searches of the signed-in user.
    ///
    /// Signed-out sessions get an empty list without a request. Results are
    /// cached for the staleness window unless `force` is set. Failed requests
    /// are retried a bounded number of times.
    pub async fn fetch_history(&self, force: bool) -> FetchResult<Vec<HistoryEntry>> {
        if !self.session().is_authenticated() {
            warn!("History requested without a session");
            return Ok(Vec::new());
        }
        if !force {
            if let Some(entries) = self.cache.history(self.history_stale_after) {
                return Ok(entries);
            }
        }

        let mut attempt = 0;
        let body = loop {
            match self.client.send(ApiRequest::get("/user/history")).await {
                Ok(body) => break body,
                Err(err) if attempt < self.history_retries && !is_final(&err) => {
                    attempt += 1;
                    warn!(%err, attempt, "History request failed; retrying");
                }
                Err(err) => return Err(err),
            }
        };

        let entries = decode_history(body)?;
        info!(total = entries.len(), "History loaded");
        self.cache.store_history(entries.clone());
        Ok(entries)
    }
}

/// Decode a history listing entry by entry, skipping entries that do not decode.
fn decode_history(body: Value) -> FetchResult<Vec<HistoryEntry>> {
    let items = match body {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(FetchError::Decode(format!(
                "expected history array, got {}",
                json_kind(&other)
            )))
        }
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<HistoryEntry>(item) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(index, %err, "Skipping malformed history entry");
                None
            }
        })
        .collect())
}

fn is_final(err: &FetchError) -> bool {
    matches!(err, FetchError::Unauthorized(_) | FetchError::Validation(_))
}
