//! Remote data access: transport seam, authenticated client and game service.

mod game;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde_json::Value;

use crate::{auth::AuthSession, error::FetchResult};

pub use game::{decode_tags, GameService};
pub use transport::{ApiRequest, HttpTransport, Method, Transport};

/// Shared handle that sends requests through a [`Transport`] with the session's bearer token.
pub struct ApiClient<T> {
    transport: Arc<T>,
    session: AuthSession,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            session: self.session.clone(),
        }
    }
}

impl<T: Transport> ApiClient<T> {
    /// Wrap `transport`, attaching tokens from `session` to every request.
    pub fn new(transport: Arc<T>, session: AuthSession) -> Self {
        Self { transport, session }
    }

    /// The session whose token is attached.
    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// Send `request`, attaching the current bearer token if signed in.
    pub async fn send(&self, mut request: ApiRequest) -> FetchResult<Value> {
        request.bearer = self.session.token();
        if request.bearer.is_none() {
            tracing::trace!(path = %request.path, "Sending request without token");
        }
        self.transport.send(request).await
    }
}
