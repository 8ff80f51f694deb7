//! Core types for StreamLens

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Fallback artist label when no artist field is present
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Fallback track label when no track field is present
pub const UNKNOWN_TRACK: &str = "Unknown Track";

/// One raw play record as found in a Spotify export file.
///
/// Two export dialects exist and a single record may use either: the
/// extended streaming history (`ts`, `ms_played`,
/// `master_metadata_album_artist_name`, ...) and the account-data export
/// (`endTime`, `msPlayed`, `artistName`, `trackName`). Podcast plays carry
/// `episode_show_name` / `episode_name` instead of artist/track metadata.
/// Every field is optional; [`RawPlay::normalize`] applies the fallback
/// chains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlay {
    // Timestamp variants, in fallback order
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default, rename = "endTime")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub time: Option<String>,

    // Milliseconds-played variants, in fallback order
    #[serde(default, deserialize_with = "de_opt_ms")]
    pub ms_played: Option<f64>,
    #[serde(default, rename = "msPlayed", deserialize_with = "de_opt_ms")]
    pub ms_played_compat: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_ms")]
    pub ms: Option<f64>,

    // Artist variants, in fallback order
    #[serde(default)]
    pub master_metadata_album_artist_name: Option<String>,
    #[serde(default, rename = "artistName")]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub episode_show_name: Option<String>,

    // Track variants, in fallback order
    #[serde(default)]
    pub master_metadata_track_name: Option<String>,
    #[serde(default, rename = "trackName")]
    pub track_name: Option<String>,
    #[serde(default)]
    pub episode_name: Option<String>,
    #[serde(default)]
    pub track: Option<String>,
}

/// Exports are inconsistent about numeric types; accept both numbers and
/// numeric strings for the milliseconds fields.
fn de_opt_ms<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MsField {
        Num(f64),
        Str(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<MsField>::deserialize(deserializer)? {
        Some(MsField::Num(n)) => Some(n),
        Some(MsField::Str(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

impl RawPlay {
    /// Normalize this record into a [`Play`], applying the dialect
    /// fallback chains.
    pub fn normalize(&self) -> Play {
        let ts = self
            .ts
            .as_deref()
            .or(self.end_time.as_deref())
            .or(self.time.as_deref())
            .and_then(parse_timestamp);

        let ms = self
            .ms_played
            .or(self.ms_played_compat)
            .or(self.ms)
            .unwrap_or(0.0);

        let artist = first_non_empty(&[
            self.master_metadata_album_artist_name.as_deref(),
            self.artist_name.as_deref(),
            self.artist.as_deref(),
            self.episode_show_name.as_deref(),
        ])
        .unwrap_or(UNKNOWN_ARTIST)
        .trim()
        .to_string();

        let track = first_non_empty(&[
            self.master_metadata_track_name.as_deref(),
            self.track_name.as_deref(),
            self.episode_name.as_deref(),
            self.track.as_deref(),
        ])
        .unwrap_or(UNKNOWN_TRACK)
        .trim()
        .to_string();

        Play {
            ts,
            minutes: ms / 1000.0 / 60.0,
            artist,
            track,
        }
    }
}

fn first_non_empty<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.trim().is_empty())
}

/// Parse the timestamp formats seen in the wild: RFC 3339 from the extended
/// history ("2021-03-01T22:15:00Z") and the account export's naive
/// "2021-03-01 22:15". Unparseable values mean the play keeps counting
/// toward totals but is excluded from time-based aggregation.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}

/// A normalized play
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Play {
    /// When the play ended, if the record carried a usable timestamp
    pub ts: Option<DateTime<Utc>>,
    /// Minutes listened
    pub minutes: f64,
    pub artist: String,
    pub track: String,
}

impl Play {
    /// Identity used for track rankings. Identically named songs by
    /// different artists must rank separately.
    pub fn track_key(&self) -> String {
        format!("{} — {}", self.track, self.artist)
    }
}
