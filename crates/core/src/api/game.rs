use serde_json::Value;
use tracing::{debug, info, warn};

use super::{ApiClient, ApiRequest, Transport};
use crate::{
    cache::ResponseCache,
    error::{FetchError, FetchResult},
    models::{CanonicalResult, GameDetails, SearchRequest, Tag},
    reconcile::{convert_details_to_game_details, reconcile, RawResult},
};

/// Tag listing, search submission and result/detail lookups backed by the shared cache.
pub struct GameService<T> {
    client: ApiClient<T>,
    cache: ResponseCache,
}

impl<T> Clone for GameService<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<T: Transport> GameService<T> {
    /// Service writing into `cache`.
    pub fn new(client: ApiClient<T>, cache: ResponseCache) -> Self {
        Self { client, cache }
    }

    /// Read-only view of the shared cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Available genre tags, cached per `count`. `refresh` bypasses the cache.
    pub async fn fetch_available_tags(
        &self,
        count: Option<usize>,
        refresh: bool,
    ) -> FetchResult<Vec<Tag>> {
        if !refresh {
            if let Some(tags) = self.cache.tags(count) {
                debug!(?count, "Tag list served from cache");
                return Ok(tags);
            }
        }

        let mut request = ApiRequest::get("/game/tags");
        if let Some(count) = count {
            request = request.with_query("count", count);
        }
        let tags = decode_tags(self.client.send(request).await?);
        info!(?count, total = tags.len(), refresh, "Tags loaded");
        self.cache.store_tags(count, tags.clone());
        Ok(tags)
    }

    /// Submit a search. Never served from cache.
    ///
    /// On success every earlier result is invalidated, the new result is
    /// cached, and its details (if they carry an external id) pre-populate
    /// the details cache.
    pub async fn submit_search(&self, request: &SearchRequest) -> FetchResult<CanonicalResult> {
        if request.tags.is_empty() {
            return Err(FetchError::Validation(
                "select at least one tag before searching".into(),
            ));
        }

        let body = serde_json::to_value(request)?;
        let response = self
            .client
            .send(ApiRequest::post("/game/search", body))
            .await?;
        let decoded = RawResult::decode(response)?;
        let fallback = decoded.game_id.clone().unwrap_or_default();
        let result = reconcile(&decoded.raw, &fallback);
        info!(
            result_id = %result.internal_id,
            name = %result.display_name,
            tags = request.tags.len(),
            "Search completed"
        );

        self.cache.invalidate_results();
        self.remember(&result);
        Ok(result)
    }

    /// Result stored under `result_id`, fetched from the backend on a cache miss.
    pub async fn fetch_result_by_id(&self, result_id: &str) -> FetchResult<CanonicalResult> {
        let result_id = require_id(result_id, "result")?;
        if let Some(result) = self.cache.result(result_id) {
            debug!(result_id, "Result served from cache");
            return Ok(result);
        }

        let response = self.client.send(game_request(result_id)).await?;
        let decoded = RawResult::decode(response)?;
        let result = reconcile(&decoded.raw, result_id);
        info!(result_id, "Result loaded");
        self.remember(&result);
        Ok(result)
    }

    /// Catalog details for `id`.
    ///
    /// `Ok(None)` means the backend answered without a catalog entity. No
    /// secondary resolution happens here.
    pub async fn fetch_game_details(&self, id: &str) -> FetchResult<Option<GameDetails>> {
        let id = require_id(id, "game")?;
        if let Some(details) = self.cache.details(id) {
            debug!(id, "Game details served from cache");
            return Ok(Some(details));
        }

        let response = self.client.send(game_request(id)).await?;
        let details = GameDetails::from_payload(response)?;
        match &details {
            Some(found) => {
                info!(id, name = %found.name, "Game details loaded");
                self.cache.store_details(id, found.clone());
            }
            None => debug!(id, "No catalog entity for id"),
        }
        Ok(details)
    }

    /// Secondary lookup of `id` in the backend's own record store.
    ///
    /// Yields only the recommended game's name, if the record has one.
    pub async fn lookup_record_name(&self, id: &str) -> FetchResult<Option<String>> {
        let id = require_id(id, "record")?;
        let response = self.client.send(game_request(id)).await?;
        let decoded = RawResult::decode(response)?;
        Ok(decoded.raw.record_name())
    }

    fn remember(&self, result: &CanonicalResult) {
        if let Some(details) = &result.details {
            if let Some(external_id) = details.external_id.as_deref() {
                self.cache
                    .store_details(external_id, convert_details_to_game_details(details));
            }
        }
        if result.internal_id.is_empty() {
            warn!("Result has no id; not caching it");
            return;
        }
        self.cache.store_result(result.clone());
    }
}

fn game_request(id: &str) -> ApiRequest {
    ApiRequest::get(format!("/game/{id}"))
}

fn require_id<'a>(id: &'a str, kind: &str) -> FetchResult<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(FetchError::Validation(format!("missing {kind} id")));
    }
    Ok(id)
}

/// Decode a tag listing in either of its shapes.
///
/// An array of `{id, name}` objects is taken as-is; `{"tags": [names]}` gets
/// positional ids. Anything else yields an empty list.
pub fn decode_tags(body: Value) -> Vec<Tag> {
    match body {
        Value::Array(items) => decode_tag_items(items),
        Value::Object(mut object) => match object.remove("tags") {
            Some(Value::Array(items)) => decode_tag_items(items),
            _ => {
                warn!("Tag listing object without a tags array");
                Vec::new()
            }
        },
        Value::Null => Vec::new(),
        other => {
            warn!(body = %other, "Unrecognised tag listing");
            Vec::new()
        }
    }
}

fn decode_tag_items(items: Vec<Value>) -> Vec<Tag> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match item {
            Value::String(name) => Some(Tag::new(index.to_string(), name)),
            object @ Value::Object(_) => match serde_json::from_value::<Tag>(object) {
                Ok(tag) => Some(tag),
                Err(err) => {
                    warn!(index, %err, "Skipping malformed tag");
                    None
                }
            },
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        api::{testing::ScriptedTransport, Method},
        auth::AuthSession,
        models::User,
    };

    fn service() -> (Arc<ScriptedTransport>, GameService<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let client = ApiClient::new(Arc::clone(&transport), AuthSession::new());
        (transport, GameService::new(client, ResponseCache::new()))
    }

    #[test]
    fn decodes_both_tag_shapes() {
        let tags = decode_tags(json!([{"id": 4, "name": "RPG"}, {"id": "7", "name": "Indie"}]));
        assert_eq!(tags, vec![Tag::new("4", "RPG"), Tag::new("7", "Indie")]);

        let tags = decode_tags(json!({"tags": ["Action", "Puzzle"]}));
        assert_eq!(tags, vec![Tag::new("0", "Action"), Tag::new("1", "Puzzle")]);

        assert!(decode_tags(json!({"other": 1})).is_empty());
        assert!(decode_tags(json!("nope")).is_empty());
    }

    #[tokio::test]
    async fn tags_are_cached_per_count_until_refresh() -> FetchResult<()> {
        let (transport, games) = service();
        transport
            .reply_ok(json!({"tags": ["Action"]}))
            .reply_ok(json!({"tags": ["Puzzle", "Racing"]}));

        let first = games.fetch_available_tags(Some(10), false).await?;
        let cached = games.fetch_available_tags(Some(10), false).await?;
        assert_eq!(first, cached);
        assert_eq!(transport.request_count(), 1);

        let refreshed = games.fetch_available_tags(Some(10), true).await?;
        assert_eq!(refreshed.len(), 2);
        assert_eq!(games.cache().tags(Some(10)).unwrap(), refreshed);

        let requests = transport.requests();
        assert_eq!(requests[0].path, "/game/tags");
        assert_eq!(requests[0].query, vec![("count".to_string(), "10".to_string())]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_search_is_rejected_without_network() {
        let (transport, games) = service();
        let err = games
            .submit_search(&SearchRequest { tags: Vec::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Validation(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn search_caches_result_and_prepopulates_details() -> FetchResult<()> {
        let (transport, games) = service();
        games.client.session().sign_in("tok-1".into(), User::default());
        transport.reply_ok(json!({
            "gameId": "g-1",
            "recommendedGame": {"name": "Hades", "rawgId": "12"}
        }));

        let request = SearchRequest {
            tags: vec!["Roguelike".into(), "Action".into()],
        };
        let result = games.submit_search(&request).await?;
        assert_eq!(result.internal_id, "g-1");
        assert_eq!(result.external_id.as_deref(), Some("12"));

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.path, "/game/search");
        assert_eq!(sent.body, Some(json!({"tags": ["Roguelike", "Action"]})));
        assert_eq!(sent.bearer.as_deref(), Some("tok-1"));

        // Both follow-up lookups are answered from cache.
        assert_eq!(games.fetch_result_by_id("g-1").await?, result);
        let details = games.fetch_game_details("12").await?.expect("pre-populated");
        assert_eq!(details.name, "Hades");
        assert_eq!(details.id, "12");
        assert_eq!(transport.request_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn search_tolerates_null_detail_name() -> FetchResult<()> {
        let (transport, games) = service();
        transport.reply_ok(json!({
            "_id": "r1",
            "recommendedGame": {"name": "Hades", "rawgId": "12"},
            "gameDetails": {"name": null, "rawgId": "12", "boxArt": null}
        }));

        let result = games
            .submit_search(&SearchRequest {
                tags: vec!["Roguelike".into()],
            })
            .await?;
        assert_eq!(result.display_name, "Hades");
        assert_eq!(result.external_id.as_deref(), Some("12"));
        assert_eq!(result.presentation(), crate::models::ResultPresentation::FullDetail);
        Ok(())
    }

    #[tokio::test]
    async fn new_search_invalidates_earlier_results() -> FetchResult<()> {
        let (transport, games) = service();
        transport
            .reply_ok(json!({"_id": "a", "recommendedGame": {"name": "Hades"}}))
            .reply_ok(json!({"_id": "b", "recommendedGame": {"name": "Celeste"}}));
        let request = SearchRequest {
            tags: vec!["Indie".into()],
        };

        games.submit_search(&request).await?;
        games.submit_search(&request).await?;
        assert!(games.cache().result("a").is_none());
        assert_eq!(games.cache().result("b").unwrap().display_name, "Celeste");
        Ok(())
    }

    #[tokio::test]
    async fn result_fetch_uses_requested_id_as_fallback() -> FetchResult<()> {
        let (transport, games) = service();
        transport.reply_ok(json!({"gameDetails": {"name": "Celeste", "rawgId": 99}}));

        let result = games.fetch_result_by_id("search-9").await?;
        assert_eq!(result.internal_id, "search-9");
        assert_eq!(transport.requests()[0].path, "/game/search-9");
        assert!(games.cache().details("99").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn missing_ids_fail_validation() {
        let (transport, games) = service();
        assert!(matches!(
            games.fetch_result_by_id("  ").await,
            Err(FetchError::Validation(_))
        ));
        assert!(matches!(
            games.fetch_game_details("").await,
            Err(FetchError::Validation(_))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn network_failures_propagate() {
        let (transport, games) = service();
        transport.reply(Err(FetchError::Network("connection refused".into())));
        let err = games.fetch_game_details("5").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(games.cache().details("5").is_none());
    }

    #[tokio::test]
    async fn last_response_wins_for_concurrent_fetches() -> FetchResult<()> {
        let (transport, games) = service();
        let first_reply = transport.reply_later();
        let second_reply = transport.reply_later();

        let first = games.fetch_result_by_id("X");
        let second = games.fetch_result_by_id("X");
        let driver = async {
            second_reply
                .send(Ok(json!({"recommendedGame": {"name": "from second call"}})))
                .unwrap();
            while games.cache().result("X").is_none() {
                tokio::task::yield_now().await;
            }
            first_reply
                .send(Ok(json!({"recommendedGame": {"name": "from first call"}})))
                .unwrap();
        };

        let (first, second, ()) = tokio::join!(first, second, driver);
        assert_eq!(second?.display_name, "from second call");
        assert_eq!(first?.display_name, "from first call");
        // The first call's response arrived last, so it is the cached value.
        assert_eq!(
            games.cache().result("X").unwrap().display_name,
            "from first call"
        );
        Ok(())
    }
}
