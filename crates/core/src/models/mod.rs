#![allow(missing_docs)]

//! Shared domain models.

pub mod payload;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FetchError, FetchResult};

use payload::{id_string, null_as_default, ApiGameDetails, RecommendedGame};

/// Name shown when a recommendation carries no usable name.
pub const FALLBACK_GAME_NAME: &str = "Recommended game";

/// A selectable genre label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
}

impl Tag {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Body of `POST /game/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Tag names in selection order.
    pub tags: Vec<String>,
}

impl SearchRequest {
    /// Build a request from selected tags, preserving their order.
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> Self {
        Self {
            tags: tags.into_iter().map(|tag| tag.name.clone()).collect(),
        }
    }
}

/// Entry of the legacy flat summary list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, rename = "background_image")]
    pub image: Option<String>,
}

/// Details attached to a reconciled result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultDetails {
    pub name: String,
    pub external_id: Option<String>,
    pub release_year: Option<i32>,
    pub platforms: Vec<String>,
    pub images: Vec<String>,
    pub box_art: Option<String>,
    pub summary: Option<String>,
}

impl From<ApiGameDetails> for ResultDetails {
    fn from(details: ApiGameDetails) -> Self {
        Self {
            name: details.name,
            external_id: details.rawg_id,
            release_year: details.release_year,
            platforms: details
                .platforms
                .into_iter()
                .map(|platform| platform.name)
                .collect(),
            images: details.images,
            box_art: details.box_art,
            summary: details.summary,
        }
    }
}

/// How a result should be presented, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultPresentation {
    /// A details object is present.
    FullDetail,
    /// No details, but the legacy summary list is non-empty.
    SummaryGrid,
    /// Only the display name is known (possibly empty).
    NameOnly,
}

/// Normalised view model derived from any backend result shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResult {
    pub display_name: String,
    pub internal_id: String,
    pub external_id: Option<String>,
    pub summary_list: Vec<GameSummary>,
    pub details: Option<ResultDetails>,
}

impl CanonicalResult {
    /// Rendering precedence: details, then summary grid, then name only.
    pub fn presentation(&self) -> ResultPresentation {
        if self.details.is_some() {
            ResultPresentation::FullDetail
        } else if !self.summary_list.is_empty() {
            ResultPresentation::SummaryGrid
        } else {
            ResultPresentation::NameOnly
        }
    }

    /// Whether the backend recommended anything at all.
    pub fn has_recommendation(&self) -> bool {
        !self.display_name.is_empty() || self.presentation() != ResultPresentation::NameOnly
    }
}

/// Full detail view of a single game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDetails {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// ISO date (`YYYY-MM-DD`) or empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub released: String,
    #[serde(default, rename = "background_image", deserialize_with = "null_as_default")]
    pub hero_image: String,
    #[serde(default, rename = "description", deserialize_with = "null_as_default")]
    pub description_html: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    #[serde(default, rename = "metacritic")]
    pub critic_score: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screenshots: Vec<String>,
}

/// Keys that identify an internal record rather than a catalog entity.
const RECORD_KEYS: [&str; 4] = ["recommendedGame", "gameDetails", "gameSummary", "summary"];

impl GameDetails {
    /// Decode a `/game/{id}` body as catalog details.
    ///
    /// `None` means the body carried no catalog entity (null, empty, or an
    /// internal record shape).
    pub fn from_payload(value: Value) -> FetchResult<Option<Self>> {
        let object = match &value {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            other => {
                return Err(FetchError::Decode(format!(
                    "expected game details object, got {}",
                    json_kind(other)
                )))
            }
        };
        if RECORD_KEYS.iter().any(|key| object.contains_key(*key)) {
            return Ok(None);
        }
        let has_name = object
            .get("name")
            .and_then(Value::as_str)
            .map(|name| !name.trim().is_empty())
            .unwrap_or(false);
        if !has_name {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    /// Parsed release date, if the `released` field holds one.
    pub fn release_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.released.trim(), "%Y-%m-%d").ok()
    }

    /// Release date formatted as `dd/mm/yyyy`.
    pub fn release_label(&self) -> Option<String> {
        self.release_date()
            .map(|date| date.format("%d/%m/%Y").to_string())
    }

    /// Description with markup tags stripped for plain-text display.
    pub fn description_text(&self) -> String {
        strip_markup(&self.description_html)
    }
}

/// A signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nickname: String,
}

/// One past search of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, rename = "_id", alias = "id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub recommended_game: Option<RecommendedGame>,
    #[serde(default)]
    pub game_details: Option<ApiGameDetails>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    /// Details name, then recommendation name, then a generic label.
    pub fn display_name(&self) -> String {
        self.game_details
            .as_ref()
            .map(|details| details.name.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.recommended_game
                    .as_ref()
                    .and_then(|game| game.name.clone())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| FALLBACK_GAME_NAME.to_string())
    }

    /// First image of the attached details.
    pub fn thumbnail(&self) -> Option<&str> {
        self.game_details
            .as_ref()
            .and_then(|details| details.images.first())
            .map(String::as_str)
    }

    /// Summary text of the attached details.
    pub fn summary(&self) -> Option<&str> {
        self.game_details
            .as_ref()
            .and_then(|details| details.summary.as_deref())
            .filter(|summary| !summary.is_empty())
    }

    /// Identifier used to open the detail view for this entry.
    pub fn detail_target_id(&self) -> &str {
        self.recommended_game
            .as_ref()
            .and_then(|game| game.rawg_id.as_deref())
            .or_else(|| {
                self.game_details
                    .as_ref()
                    .and_then(|details| details.rawg_id.as_deref())
            })
            .unwrap_or(&self.id)
    }

    /// Creation date formatted as `dd/mm/yyyy`.
    pub fn created_label(&self) -> Option<String> {
        self.created_at
            .map(|at| at.format("%d/%m/%Y").to_string())
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("invalid markup regex"));

fn strip_markup(html: &str) -> String {
    TAG_RE
        .replace_all(html, " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
