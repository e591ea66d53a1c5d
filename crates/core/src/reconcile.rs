//! Decoding of backend result payloads and their reconciliation into one view model.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::{
    error::{FetchError, FetchResult},
    models::{
        json_kind,
        payload::{lenient_id, null_as_default, ApiGameDetails, NamedEntry, RecommendedGame},
        CanonicalResult, GameDetails, GameSummary, ResultDetails, FALLBACK_GAME_NAME,
    },
};

/// Backend result in one of its historical shapes, decoded once at the network boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// Current shape: a recommended game and/or a nested details object.
    Recommendation(RecommendationPayload),
    /// Legacy shape: a flat list of summary entries.
    SummaryList(SummaryListPayload),
    /// Neither field present.
    Empty {
        /// Backend record id, if any.
        record_id: Option<String>,
        /// Legacy `gameSummary` entry, if any.
        game_summary: Option<NamedEntry>,
    },
}

/// Fields of the current response shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationPayload {
    /// Backend record id (`_id`).
    pub record_id: Option<String>,
    /// Recommended game, when sent.
    pub recommended_game: Option<RecommendedGame>,
    /// Nested details, when sent.
    pub game_details: Option<ApiGameDetails>,
    /// Legacy summary list sent alongside, if any.
    pub summary: Vec<GameSummary>,
}

/// Fields of the legacy response shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryListPayload {
    /// Backend record id (`_id` or `searchId`).
    pub record_id: Option<String>,
    /// Summary entries in backend order.
    pub summary: Vec<GameSummary>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    #[serde(default, rename = "_id", alias = "searchId", deserialize_with = "lenient_id")]
    record_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    game_id: Option<String>,
    #[serde(default)]
    recommended_game: Option<RecommendedGame>,
    #[serde(default)]
    game_details: Option<ApiGameDetails>,
    #[serde(default)]
    game_summary: Option<NamedEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    summary: Vec<GameSummary>,
}

/// A decoded payload plus the backend's own id for the created result.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResult {
    /// The classified payload.
    pub raw: RawResult,
    /// `gameId` echoed by the search endpoint.
    pub game_id: Option<String>,
}

impl RawResult {
    /// Classify a JSON body. `null` decodes as [`RawResult::Empty`].
    pub fn decode(value: Value) -> FetchResult<DecodedResult> {
        match &value {
            Value::Null => {
                return Ok(DecodedResult {
                    raw: RawResult::Empty {
                        record_id: None,
                        game_summary: None,
                    },
                    game_id: None,
                })
            }
            Value::Object(_) => {}
            other => {
                return Err(FetchError::Decode(format!(
                    "expected result object, got {}",
                    json_kind(other)
                )))
            }
        }

        let wire: WireResult = serde_json::from_value(value)?;
        let game_id = wire.game_id;
        let raw = if wire.recommended_game.is_some() || wire.game_details.is_some() {
            RawResult::Recommendation(RecommendationPayload {
                record_id: wire.record_id,
                recommended_game: wire.recommended_game,
                game_details: wire.game_details,
                summary: wire.summary,
            })
        } else if !wire.summary.is_empty() {
            RawResult::SummaryList(SummaryListPayload {
                record_id: wire.record_id,
                summary: wire.summary,
            })
        } else {
            RawResult::Empty {
                record_id: wire.record_id,
                game_summary: wire.game_summary,
            }
        };
        Ok(DecodedResult { raw, game_id })
    }

    /// Backend record id carried by the payload.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            RawResult::Recommendation(payload) => payload.record_id.as_deref(),
            RawResult::SummaryList(payload) => payload.record_id.as_deref(),
            RawResult::Empty { record_id, .. } => record_id.as_deref(),
        }
    }

    /// Name recoverable from an internal record, used by the degraded detail view.
    ///
    /// Falls back to a generic label when the matching object exists but is unnamed.
    pub fn record_name(&self) -> Option<String> {
        match self {
            RawResult::Recommendation(RecommendationPayload {
                recommended_game: Some(game),
                ..
            }) => Some(non_empty_or_fallback(game.name.as_deref())),
            RawResult::Empty {
                game_summary: Some(summary),
                ..
            } => Some(non_empty_or_fallback(summary.name.as_deref())),
            _ => None,
        }
    }
}

/// Normalise a backend payload. `fallback_id` is used when the payload has no record id.
pub fn reconcile(raw: &RawResult, fallback_id: &str) -> CanonicalResult {
    let internal_id = raw
        .record_id()
        .filter(|id| !id.is_empty())
        .unwrap_or(fallback_id)
        .to_string();

    match raw {
        RawResult::Recommendation(payload) => {
            let display_name = payload
                .recommended_game
                .as_ref()
                .and_then(|game| game.name.clone())
                .unwrap_or_default();
            let details = match (&payload.game_details, &payload.recommended_game) {
                (Some(details), _) => Some(ResultDetails::from(details.clone())),
                (None, Some(game)) if game.rawg_id.is_some() => Some(ResultDetails {
                    name: game.name.clone().unwrap_or_default(),
                    external_id: game.rawg_id.clone(),
                    ..ResultDetails::default()
                }),
                (None, Some(_)) | (None, None) => None,
            };
            CanonicalResult {
                display_name,
                internal_id,
                external_id: details.as_ref().and_then(|d| d.external_id.clone()),
                summary_list: payload.summary.clone(),
                details,
            }
        }
        RawResult::SummaryList(payload) => CanonicalResult {
            display_name: String::new(),
            internal_id,
            external_id: None,
            summary_list: payload.summary.clone(),
            details: None,
        },
        RawResult::Empty { .. } => {
            warn!(result_id = %internal_id, "Result carried neither a recommendation nor a summary list");
            CanonicalResult {
                display_name: String::new(),
                internal_id,
                external_id: None,
                summary_list: Vec::new(),
                details: None,
            }
        }
    }
}

/// Convert result details into the full detail view model.
pub fn convert_details_to_game_details(details: &ResultDetails) -> GameDetails {
    let hero_image = details
        .box_art
        .clone()
        .filter(|art| !art.is_empty())
        .or_else(|| details.images.first().cloned())
        .unwrap_or_default();
    GameDetails {
        id: details.external_id.clone().unwrap_or_default(),
        name: details.name.clone(),
        released: details
            .release_year
            .map(|year| format!("{year:04}-01-01"))
            .unwrap_or_default(),
        hero_image,
        description_html: details.summary.clone().unwrap_or_default(),
        platforms: details.platforms.clone(),
        genres: Vec::new(),
        critic_score: None,
        screenshots: details.images.clone(),
    }
}

fn non_empty_or_fallback(name: Option<&str>) -> String {
    name.filter(|name| !name.trim().is_empty())
        .unwrap_or(FALLBACK_GAME_NAME)
        .to_string()
}
