#![allow(missing_docs)]

//! Backend payload fragments shared by search results and history entries.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The single game the backend recommended for a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedGame {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub rawg_id: Option<String>,
}

/// Platform object as nested inside `gameDetails`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// `gameDetails` object embedded in search responses and history entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGameDetails {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_id")]
    pub rawg_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub release_year: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: Vec<Platform>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default)]
    pub box_art: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Any object of which only the name matters (legacy `gameSummary`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedEntry {
    #[serde(default)]
    pub name: Option<String>,
}

/// Accepts a string or a number and yields a non-empty string.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Like [`lenient_id`] but missing values collapse to an empty string.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_id(deserializer)?.unwrap_or_default())
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|year| i32::try_from(year).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Treats `null` like an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_strings_and_numbers() {
        let game: RecommendedGame =
            serde_json::from_value(json!({"name": "Hades", "rawgId": 12})).unwrap();
        assert_eq!(game.rawg_id.as_deref(), Some("12"));

        let game: RecommendedGame =
            serde_json::from_value(json!({"name": "Hades", "rawgId": "  "})).unwrap();
        assert_eq!(game.rawg_id, None);
    }

    #[test]
    fn null_collections_decode_empty() {
        let details: ApiGameDetails = serde_json::from_value(json!({
            "name": "Celeste",
            "releaseYear": "2018",
            "platforms": null,
            "images": null
        }))
        .unwrap();
        assert_eq!(details.release_year, Some(2018));
        assert!(details.platforms.is_empty());
        assert!(details.images.is_empty());
    }

    #[test]
    fn null_name_decodes_empty() {
        let details: ApiGameDetails =
            serde_json::from_value(json!({"name": null, "rawgId": "12"})).unwrap();
        assert_eq!(details.name, "");
        assert_eq!(details.rawg_id.as_deref(), Some("12"));

        let platform: Platform = serde_json::from_value(json!({"name": null})).unwrap();
        assert_eq!(platform, Platform::default());
    }
}
