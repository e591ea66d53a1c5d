//! Wiring of the services around one transport, session and cache.

use std::sync::Arc;

use crate::{
    api::{ApiClient, GameService, HttpTransport, Transport},
    auth::{AuthService, AuthSession},
    cache::ResponseCache,
    config::AppConfig,
    detail::DetailResolver,
    error::FetchResult,
};

/// Every service a front end needs, sharing a single session and cache.
pub struct GameFinder<T> {
    /// Tags, searches, results and details.
    pub games: GameService<T>,
    /// Sign-in and history.
    pub auth: AuthService<T>,
    /// Detail view resolution.
    pub details: DetailResolver<T>,
}

impl<T> Clone for GameFinder<T> {
    fn clone(&self) -> Self {
        Self {
            games: self.games.clone(),
            auth: self.auth.clone(),
            details: self.details.clone(),
        }
    }
}

impl<T: Transport> GameFinder<T> {
    /// Build the services on top of `transport`.
    pub fn new(transport: Arc<T>, config: &AppConfig) -> Self {
        let client = ApiClient::new(transport, AuthSession::new());
        let cache = ResponseCache::new();
        let games = GameService::new(client.clone(), cache.clone());
        let auth = AuthService::new(client, cache, config);
        let details = DetailResolver::new(games.clone());
        Self {
            games,
            auth,
            details,
        }
    }

    /// The shared session.
    pub fn session(&self) -> &AuthSession {
        self.auth.session()
    }

    /// The shared cache.
    pub fn cache(&self) -> &ResponseCache {
        self.games.cache()
    }
}

impl GameFinder<HttpTransport> {
    /// Services talking HTTP to the configured backend.
    pub fn connect(config: &AppConfig) -> FetchResult<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{api::testing::ScriptedTransport, detail::DetailState, models::SearchRequest};

    #[tokio::test]
    async fn search_result_details_open_from_cache() -> FetchResult<()> {
        let transport = Arc::new(ScriptedTransport::new());
        let finder = GameFinder::new(Arc::clone(&transport), &AppConfig::default());
        transport.reply_ok(json!({
            "_id": "r1",
            "recommendedGame": {"name": "Hades", "rawgId": 1234},
            "gameDetails": {"name": "Hades", "rawgId": "1234", "releaseYear": 2020, "boxArt": "hades.png"}
        }));

        let result = finder
            .games
            .submit_search(&SearchRequest {
                tags: vec!["Roguelike".into()],
            })
            .await?;
        let target = crate::detail::auto_navigation_target(&result).map(|t| t.id);
        assert_eq!(target.as_deref(), Some("1234"));

        match finder.details.load("1234").await {
            DetailState::Full(details) => {
                assert_eq!(details.name, "Hades");
                assert_eq!(details.released, "2020-01-01");
                assert_eq!(details.hero_image, "hades.png");
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(transport.request_count(), 1);
        Ok(())
    }
}
