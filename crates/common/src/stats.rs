//! Dashboard aggregation
//!
//! Computes the statistics the dashboard renders from a set of normalized
//! plays: the totals summary, the hours-per-month series, and the top-50
//! artist and track rankings with first-played dates.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Play, RawPlay};

/// Rankings are capped at this many entries
pub const TOP_LIMIT: usize = 50;

/// Everything the dashboard shows for one ingested history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub summary: Summary,
    pub monthly: Vec<MonthlyPoint>,
    pub top_artists: Vec<RankedEntry>,
    pub top_tracks: Vec<RankedEntry>,
}

/// Headline totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_plays: usize,
    pub total_minutes: u64,
    pub total_hours: u64,
    pub unique_artists: usize,
    pub unique_tracks: usize,
}

/// One month of listening, keyed `YYYY-MM`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub hours: f64,
}

/// One row of a top-artists or top-tracks ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub minutes: u64,
    /// Earliest timestamped play, when any play of this entry had one
    pub first_played: Option<DateTime<Utc>>,
}

impl DashboardStats {
    /// Aggregate raw export records into dashboard statistics.
    pub fn from_records(records: &[RawPlay]) -> Self {
        let plays: Vec<Play> = records.iter().map(RawPlay::normalize).collect();
        Self::from_plays(&plays)
    }

    /// Aggregate normalized plays into dashboard statistics.
    pub fn from_plays(plays: &[Play]) -> Self {
        let total_minutes: f64 = plays.iter().map(|p| p.minutes).sum();
        let unique_artists: HashSet<&str> = plays.iter().map(|p| p.artist.as_str()).collect();
        let unique_tracks: HashSet<&str> = plays.iter().map(|p| p.track.as_str()).collect();

        let summary = Summary {
            total_plays: plays.len(),
            total_minutes: total_minutes.round() as u64,
            total_hours: (total_minutes / 60.0).round() as u64,
            unique_artists: unique_artists.len(),
            unique_tracks: unique_tracks.len(),
        };

        // Hours per month; plays without a timestamp are excluded here.
        // BTreeMap keeps the zero-padded YYYY-MM keys chronological.
        let mut monthly_minutes: BTreeMap<String, f64> = BTreeMap::new();
        for play in plays {
            if let Some(ts) = play.ts {
                let key = format!("{:04}-{:02}", ts.year(), ts.month());
                *monthly_minutes.entry(key).or_insert(0.0) += play.minutes;
            }
        }
        let monthly = monthly_minutes
            .into_iter()
            .map(|(month, minutes)| MonthlyPoint {
                month,
                hours: minutes / 60.0,
            })
            .collect();

        let top_artists = rank(plays.iter().map(|p| (p.artist.clone(), p)));
        let top_tracks = rank(plays.iter().map(|p| (p.track_key(), p)));

        Self {
            summary,
            monthly,
            top_artists,
            top_tracks,
        }
    }
}

fn rank<'a, I>(keyed: I) -> Vec<RankedEntry>
where
    I: Iterator<Item = (String, &'a Play)>,
{
    let mut minutes: HashMap<String, f64> = HashMap::new();
    let mut first: HashMap<String, DateTime<Utc>> = HashMap::new();

    for (key, play) in keyed {
        *minutes.entry(key.clone()).or_insert(0.0) += play.minutes;
        if let Some(ts) = play.ts {
            first
                .entry(key)
                .and_modify(|seen| {
                    if ts < *seen {
                        *seen = ts;
                    }
                })
                .or_insert(ts);
        }
    }

    let mut entries: Vec<(String, f64)> = minutes.into_iter().collect();
    // Minutes descending; name ascending keeps ties deterministic
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    entries.truncate(TOP_LIMIT);

    entries
        .into_iter()
        .map(|(name, mins)| RankedEntry {
            first_played: first.get(&name).copied(),
            minutes: mins.round() as u64,
            name,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn play(artist: &str, track: &str, minutes: f64, ts: Option<&str>) -> Play {
        Play {
            ts: ts.map(|t| {
                DateTime::parse_from_rfc3339(t)
                    .unwrap()
                    .with_timezone(&Utc)
            }),
            minutes,
            artist: artist.to_string(),
            track: track.to_string(),
        }
    }

    #[test]
    fn summary_totals() {
        let plays = vec![
            play("A", "x", 30.0, Some("2021-01-10T10:00:00Z")),
            play("A", "y", 45.0, Some("2021-02-10T10:00:00Z")),
            play("B", "x", 15.2, None),
        ];
        let stats = DashboardStats::from_plays(&plays);

        assert_eq!(stats.summary.total_plays, 3);
        assert_eq!(stats.summary.total_minutes, 90);
        assert_eq!(stats.summary.total_hours, 2);
        assert_eq!(stats.summary.unique_artists, 2);
        // "x" by A and "x" by B are the same title
        assert_eq!(stats.summary.unique_tracks, 2);
    }

    #[test]
    fn monthly_is_chronological_and_skips_untimestamped() {
        let plays = vec![
            play("A", "x", 60.0, Some("2021-02-01T00:00:00Z")),
            play("A", "x", 120.0, Some("2021-01-15T00:00:00Z")),
            play("A", "x", 30.0, Some("2021-01-20T00:00:00Z")),
            play("A", "x", 999.0, None),
        ];
        let stats = DashboardStats::from_plays(&plays);

        let months: Vec<&str> = stats.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2021-01", "2021-02"]);
        assert!((stats.monthly[0].hours - 2.5).abs() < 1e-9);
        assert!((stats.monthly[1].hours - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rankings_order_and_first_played() {
        let plays = vec![
            play("Less", "a", 10.0, Some("2020-06-01T00:00:00Z")),
            play("More", "b", 20.0, Some("2021-01-01T00:00:00Z")),
            play("More", "b", 5.0, Some("2019-05-01T00:00:00Z")),
        ];
        let stats = DashboardStats::from_plays(&plays);

        assert_eq!(stats.top_artists[0].name, "More");
        assert_eq!(stats.top_artists[0].minutes, 25);
        assert_eq!(
            stats.top_artists[0].first_played,
            Some(Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(stats.top_artists[1].name, "Less");
    }

    #[test]
    fn rankings_are_capped() {
        let plays: Vec<Play> = (0..60)
            .map(|i| play(&format!("artist-{i:02}"), "t", (i + 1) as f64, None))
            .collect();
        let stats = DashboardStats::from_plays(&plays);

        assert_eq!(stats.top_artists.len(), TOP_LIMIT);
        assert_eq!(stats.top_artists[0].name, "artist-59");
        assert!(stats.top_artists[0].first_played.is_none());
    }

    #[test]
    fn same_title_different_artist_ranks_separately() {
        let plays = vec![
            play("A", "Intro", 10.0, None),
            play("B", "Intro", 4.0, None),
        ];
        let stats = DashboardStats::from_plays(&plays);

        assert_eq!(stats.top_tracks.len(), 2);
        assert_eq!(stats.top_tracks[0].name, "Intro — A");
        assert_eq!(stats.top_tracks[1].name, "Intro — B");
    }

    #[test]
    fn from_records_normalizes_first() {
        let records: Vec<RawPlay> = serde_json::from_str(
            r#"[
                {"endTime": "2021-03-01 22:15", "msPlayed": 60000,
                 "artistName": "Autechre", "trackName": "Bike"}
            ]"#,
        )
        .unwrap();
        let stats = DashboardStats::from_records(&records);

        assert_eq!(stats.summary.total_plays, 1);
        assert_eq!(stats.top_artists[0].name, "Autechre");
        assert_eq!(stats.monthly[0].month, "2021-03");
    }
}
