//! Data models for the R1 Movies catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treat an explicit JSON `null` the same as a missing column.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single movie (table `movies`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub trailer_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_year: i32,
    /// Runtime in minutes
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta_keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub featured: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a series. Unknown labels from the store are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SeriesStatus {
    #[default]
    Ongoing,
    Completed,
    Cancelled,
    Other(String),
}

impl SeriesStatus {
    pub const ALL: [SeriesStatus; 3] = [
        SeriesStatus::Ongoing,
        SeriesStatus::Completed,
        SeriesStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            SeriesStatus::Ongoing => "ongoing",
            SeriesStatus::Completed => "completed",
            SeriesStatus::Cancelled => "cancelled",
            SeriesStatus::Other(s) => s,
        }
    }
}

impl From<String> for SeriesStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "ongoing" => SeriesStatus::Ongoing,
            "completed" => SeriesStatus::Completed,
            "cancelled" | "canceled" => SeriesStatus::Cancelled,
            _ => SeriesStatus::Other(s),
        }
    }
}

impl From<SeriesStatus> for String {
    fn from(status: SeriesStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A multi-episode show (table `series`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_year: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta_keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub featured: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: SeriesStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One episode of a series (table `episodes`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub series_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub season_number: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub episode_number: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Episode {
    /// "S1E4 - Title"
    pub fn label(&self) -> String {
        format!("S{}E{} - {}", self.season_number, self.episode_number, self.title)
    }
}

/// One playable encoding of a movie or episode (tables `movie_videos` and
/// `episode_videos` share this shape)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quality: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub video_url: String,
    #[serde(default)]
    pub file_size: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// What a set of variants belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantOwner {
    Movie(String),
    Episode(String),
}

impl VariantOwner {
    pub fn table(&self) -> &'static str {
        match self {
            VariantOwner::Movie(_) => "movie_videos",
            VariantOwner::Episode(_) => "episode_videos",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            VariantOwner::Movie(_) => "movie_id",
            VariantOwner::Episode(_) => "episode_id",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            VariantOwner::Movie(id) | VariantOwner::Episode(id) => id,
        }
    }
}

/// Admin notification (table `notifications`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The signed-in admin identity (persisted to session.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) when the access token stops being valid
    pub expires_at: i64,
}

impl Principal {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
