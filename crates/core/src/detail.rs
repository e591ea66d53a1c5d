//! Choosing which id opens a detail view, and resolving that view's contents.

use tracing::{debug, warn};

use crate::{
    api::{GameService, Transport},
    error::FetchError,
    models::{CanonicalResult, GameDetails},
};

/// Namespace an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdOrigin {
    /// Third-party catalog id, the richer source.
    External,
    /// Backend record id (or a summary entry's id).
    Internal,
}

/// Where a "view details" action navigates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTarget {
    /// Id to open.
    pub id: String,
    /// Namespace of `id`.
    pub origin: IdOrigin,
}

impl DetailTarget {
    fn new(id: &str, origin: IdOrigin) -> Option<Self> {
        let id = id.trim();
        (!id.is_empty()).then(|| Self {
            id: id.to_string(),
            origin,
        })
    }
}

/// Pick the detail id for `result`.
///
/// The external id wins; otherwise the clicked summary entry's id, then the
/// result's own internal id.
pub fn resolve_detail_target(
    result: &CanonicalResult,
    clicked: Option<&str>,
) -> Option<DetailTarget> {
    result
        .details
        .as_ref()
        .and_then(|details| details.external_id.as_deref())
        .and_then(|id| DetailTarget::new(id, IdOrigin::External))
        .or_else(|| clicked.and_then(|id| DetailTarget::new(id, IdOrigin::Internal)))
        .or_else(|| DetailTarget::new(&result.internal_id, IdOrigin::Internal))
}

/// Target to open straight after a search, only when it has an external id.
pub fn auto_navigation_target(result: &CanonicalResult) -> Option<DetailTarget> {
    resolve_detail_target(result, None).filter(|target| target.origin == IdOrigin::External)
}

/// Contents of the detail view.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    /// Waiting for the lookups to finish.
    Loading,
    /// Catalog details were found.
    Full(GameDetails),
    /// Only a name could be recovered from the record store.
    Degraded {
        /// Recovered game name.
        name: String,
    },
    /// Nothing could be loaded.
    Error {
        /// Message for the user.
        message: String,
        /// Whether a manual retry is offered.
        retryable: bool,
    },
}

impl DetailState {
    /// Whether this state is final until the user navigates or retries.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DetailState::Loading)
    }
}

/// State machine of one opened detail view.
///
/// `Loading` moves to exactly one terminal state; a retryable `Error` may go
/// back to `Loading`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    id: String,
    state: DetailState,
}

impl DetailView {
    /// Open the view for `id` in the loading state.
    pub fn open(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: DetailState::Loading,
        }
    }

    /// Id being shown.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state.
    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// Apply a resolution outcome. Ignored unless currently loading.
    pub fn resolve(&mut self, outcome: DetailState) -> bool {
        if self.state.is_terminal() || !outcome.is_terminal() {
            return false;
        }
        self.state = outcome;
        true
    }

    /// Return to loading after a retryable error. Returns whether a retry should start.
    pub fn retry(&mut self) -> bool {
        match self.state {
            DetailState::Error {
                retryable: true, ..
            } => {
                self.state = DetailState::Loading;
                true
            }
            _ => false,
        }
    }
}

/// Runs the primary catalog lookup and the record-store fallback.
pub struct DetailResolver<T> {
    games: GameService<T>,
}

impl<T> Clone for DetailResolver<T> {
    fn clone(&self) -> Self {
        Self {
            games: self.games.clone(),
        }
    }
}

impl<T: Transport> DetailResolver<T> {
    /// Resolver using `games` for both lookups.
    pub fn new(games: GameService<T>) -> Self {
        Self { games }
    }

    /// Resolve the terminal state for `id`.
    ///
    /// A catalog hit yields [`DetailState::Full`]. Otherwise the record store
    /// is consulted; a name there yields [`DetailState::Degraded`]. When both
    /// come back empty or fail, the result is [`DetailState::Error`].
    pub async fn load(&self, id: &str) -> DetailState {
        let primary_error = match self.games.fetch_game_details(id).await {
            Ok(Some(details)) => return DetailState::Full(details),
            Ok(None) => None,
            Err(FetchError::Validation(message)) => {
                return DetailState::Error {
                    message,
                    retryable: false,
                }
            }
            Err(err) if err.is_not_found() => None,
            Err(err) => {
                warn!(id, %err, "Catalog lookup failed; trying record store");
                Some(err)
            }
        };

        match self.games.lookup_record_name(id).await {
            Ok(Some(name)) => {
                debug!(id, %name, "Showing degraded details");
                DetailState::Degraded { name }
            }
            Ok(None) => failure(primary_error, "Game not found"),
            Err(err) if err.is_not_found() => failure(primary_error, "Game not found"),
            Err(err) => {
                warn!(id, %err, "Record lookup failed");
                DetailState::Error {
                    message: format!("Could not load game details: {err}"),
                    retryable: err.is_retryable()
                        || primary_error.as_ref().is_some_and(FetchError::is_retryable),
                }
            }
        }
    }
}

fn failure(primary_error: Option<FetchError>, not_found: &str) -> DetailState {
    match primary_error {
        Some(err) => DetailState::Error {
            message: format!("Could not load game details: {err}"),
            retryable: err.is_retryable(),
        },
        None => DetailState::Error {
            message: not_found.to_string(),
            retryable: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        api::{testing::ScriptedTransport, ApiClient},
        auth::AuthSession,
        cache::ResponseCache,
        models::{GameSummary, ResultDetails},
    };

    fn resolver() -> (Arc<ScriptedTransport>, DetailResolver<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let client = ApiClient::new(Arc::clone(&transport), AuthSession::new());
        let games = GameService::new(client, ResponseCache::new());
        (transport, DetailResolver::new(games))
    }

    fn result(external: Option<&str>) -> CanonicalResult {
        CanonicalResult {
            display_name: "Hades".into(),
            internal_id: "rec-1".into(),
            external_id: external.map(str::to_string),
            summary_list: vec![GameSummary {
                id: "sum-3".into(),
                title: "Hades".into(),
                description: String::new(),
                image: None,
            }],
            details: external.map(|id| ResultDetails {
                name: "Hades".into(),
                external_id: Some(id.to_string()),
                ..ResultDetails::default()
            }),
        }
    }

    #[test]
    fn external_id_takes_precedence() {
        let target = resolve_detail_target(&result(Some("12")), Some("sum-3")).unwrap();
        assert_eq!(target.id, "12");
        assert_eq!(target.origin, IdOrigin::External);
        assert_eq!(auto_navigation_target(&result(Some("12"))), Some(target));
    }

    #[test]
    fn falls_back_to_clicked_then_internal_id() {
        let no_external = result(None);
        let clicked = resolve_detail_target(&no_external, Some("sum-3")).unwrap();
        assert_eq!(clicked.id, "sum-3");
        assert_eq!(clicked.origin, IdOrigin::Internal);

        let internal = resolve_detail_target(&no_external, None).unwrap();
        assert_eq!(internal.id, "rec-1");
        assert_eq!(auto_navigation_target(&no_external), None);

        let mut anonymous = no_external;
        anonymous.internal_id.clear();
        assert_eq!(resolve_detail_target(&anonymous, Some(" ")), None);
    }

    #[tokio::test]
    async fn catalog_hit_is_full() {
        let (transport, resolver) = resolver();
        transport.reply_ok(json!({"id": 99, "name": "Celeste", "metacritic": 94}));
        match resolver.load("99").await {
            DetailState::Full(details) => assert_eq!(details.critic_score, Some(94)),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn null_catalog_fields_still_show_full_details() {
        let (transport, resolver) = resolver();
        transport.reply_ok(json!({
            "id": 5,
            "name": "Unreleased Game",
            "released": null,
            "background_image": null
        }));
        match resolver.load("5").await {
            DetailState::Full(details) => {
                assert_eq!(details.name, "Unreleased Game");
                assert!(details.released.is_empty());
                assert!(details.hero_image.is_empty());
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_then_name_only_record_is_degraded() {
        let (transport, resolver) = resolver();
        transport
            .reply(Err(FetchError::NotFound("/game/99".into())))
            .reply_ok(json!({"recommendedGame": {"name": "Celeste"}}));

        let mut view = DetailView::open("99");
        assert!(view.resolve(resolver.load(view.id()).await));
        assert_eq!(
            view.state(),
            &DetailState::Degraded {
                name: "Celeste".into()
            }
        );
        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/game/99", "/game/99"]);
    }

    #[tokio::test]
    async fn both_lookups_failing_is_a_retryable_error() {
        let (transport, resolver) = resolver();
        transport
            .reply(Err(FetchError::Network("offline".into())))
            .reply(Err(FetchError::Network("offline".into())));

        let mut view = DetailView::open("7");
        view.resolve(resolver.load("7").await);
        assert!(matches!(
            view.state(),
            DetailState::Error {
                retryable: true,
                ..
            }
        ));
        assert!(view.retry());
        assert_eq!(view.state(), &DetailState::Loading);
    }

    #[tokio::test]
    async fn empty_everywhere_is_a_final_error() {
        let (transport, resolver) = resolver();
        transport.reply_ok(json!(null)).reply_ok(json!({"_id": "7"}));

        let mut view = DetailView::open("7");
        view.resolve(resolver.load("7").await);
        assert_eq!(
            view.state(),
            &DetailState::Error {
                message: "Game not found".into(),
                retryable: false
            }
        );
        assert!(!view.retry());
    }

    #[tokio::test]
    async fn missing_id_fails_without_requests() {
        let (transport, resolver) = resolver();
        assert!(matches!(
            resolver.load("").await,
            DetailState::Error {
                retryable: false,
                ..
            }
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn terminal_states_ignore_late_outcomes() {
        let mut view = DetailView::open("1");
        assert!(!view.resolve(DetailState::Loading));
        assert!(view.resolve(DetailState::Degraded { name: "A".into() }));
        assert!(!view.resolve(DetailState::Full(GameDetails::default())));
        assert!(!view.retry());
    }
}
