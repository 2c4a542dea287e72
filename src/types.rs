// src/types.rs
//! Data model shared by the engine, the history store and the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Where a candidate was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Rss,
    #[serde(alias = "news_api")]
    NewsApi,
    Twitter,
}

impl Source {
    /// Case-insensitive name lookup; accepts `news_api` and `news-api` spellings.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rss" => Some(Source::Rss),
            "newsapi" | "news_api" | "news-api" => Some(Source::NewsApi),
            "twitter" => Some(Source::Twitter),
            _ => None,
        }
    }
}

/// RFC 3339 first, then RFC 2822 (what RSS feeds emit). `None` if neither parses.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Wire shape accepted for one batch entry before it becomes a [`CandidateItem`].
#[derive(Deserialize)]
struct RawCandidate {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<Value>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, alias = "shares")]
    share_count: Option<u64>,
    #[serde(default, alias = "retweets")]
    retweet_count: Option<u64>,
    #[serde(default)]
    upvotes: Option<u64>,
}

/// A raw news item as handed over by the fetch stage. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Unique key within a run. Empty means malformed.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub source: Source,
    #[serde(default, alias = "shares", skip_serializing_if = "Option::is_none")]
    pub share_count: Option<u64>,
    #[serde(default, alias = "retweets", skip_serializing_if = "Option::is_none")]
    pub retweet_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<u64>,
}

impl CandidateItem {
    pub fn new(title: &str, summary: &str, url: &str, source: Source) -> Self {
        Self {
            title: title.to_string(),
            summary: summary.to_string(),
            url: url.to_string(),
            published_at: None,
            source,
            share_count: None,
            retweet_count: None,
            upvotes: None,
        }
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn shares(mut self, n: u64) -> Self {
        self.share_count = Some(n);
        self
    }

    pub fn retweets(mut self, n: u64) -> Self {
        self.retweet_count = Some(n);
        self
    }

    /// Lenient decoding of one batch entry. Null text fields read as empty and
    /// an unparseable `published_at` reads as missing; a missing or unknown
    /// `source` or a wrongly typed field is an error describing the problem.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let raw = RawCandidate::deserialize(value).map_err(|e| e.to_string())?;
        let source = match raw.source.as_deref() {
            Some(name) => Source::parse(name).ok_or_else(|| format!("unknown source `{name}`"))?,
            None => return Err("missing field `source`".to_string()),
        };
        let published_at = match &raw.published_at {
            Some(Value::String(s)) => parse_timestamp(s),
            _ => None,
        };
        Ok(Self {
            title: raw.title.unwrap_or_default(),
            summary: raw.summary.unwrap_or_default(),
            url: raw.url.unwrap_or_default(),
            published_at,
            source,
            share_count: raw.share_count,
            retweet_count: raw.retweet_count,
            upvotes: raw.upvotes,
        })
    }

    /// Text used for embeddings, keyword matching and sentiment: `title + " " + summary`.
    pub fn text(&self) -> String {
        let title = self.title.trim();
        let summary = self.summary.trim();
        match (title.is_empty(), summary.is_empty()) {
            (false, false) => format!("{title} {summary}"),
            (false, true) => title.to_string(),
            (true, false) => summary.to_string(),
            (true, true) => String::new(),
        }
    }

    /// Total engagement across the counters that are present; `None` if none are.
    pub fn engagement(&self) -> Option<u64> {
        let counters = [self.share_count, self.retweet_count, self.upvotes];
        if counters.iter().all(Option::is_none) {
            return None;
        }
        Some(
            counters
                .iter()
                .flatten()
                .fold(0u64, |acc, n| acc.saturating_add(*n)),
        )
    }
}

/// The subject a run curates for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicProfile {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_embedding: Option<Vec<f32>>,
}

impl TopicProfile {
    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            topic_embedding: None,
        }
    }

    /// Keywords with blanks removed, in their original order.
    pub fn clean_keywords(&self) -> Vec<&str> {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// One entry of the append-only publication log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedRecord {
    pub url: String,
    pub embedding: Vec<f32>,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The five signals feeding the hotness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Freshness,
    Virality,
    Relevance,
    Sentiment,
    Uniqueness,
}

impl SignalKind {
    pub const ALL: [SignalKind; 5] = [
        SignalKind::Freshness,
        SignalKind::Virality,
        SignalKind::Relevance,
        SignalKind::Sentiment,
        SignalKind::Uniqueness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Freshness => "freshness",
            SignalKind::Virality => "virality",
            SignalKind::Relevance => "relevance",
            SignalKind::Sentiment => "sentiment",
            SignalKind::Uniqueness => "uniqueness",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        SignalKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate with its signal breakdown and aggregated score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: CandidateItem,
    pub signals: BTreeMap<SignalKind, f64>,
    pub hot_score: f64,
    /// Signals computed by a fallback heuristic rather than from embeddings or data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<SignalKind>,
}

impl ScoredItem {
    pub fn signal(&self, kind: SignalKind) -> f64 {
        self.signals.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn is_degraded(&self, kind: SignalKind) -> bool {
        self.degraded.contains(&kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingUrl,
    DuplicateUrl,
    EmptyText,
    InvalidField,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingUrl => "missing url",
            SkipReason::DuplicateUrl => "duplicate url in batch",
            SkipReason::EmptyText => "empty title and summary",
            SkipReason::InvalidField => "invalid field",
        };
        f.write_str(s)
    }
}

/// Diagnostic for a candidate excluded before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// Position in the input batch.
    pub index: usize,
    pub url: String,
    pub reason: SkipReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn text_joins_title_and_summary() {
        let it = CandidateItem::new(" Bike theft up ", "Insurers react.", "u", Source::Rss);
        assert_eq!(it.text(), "Bike theft up Insurers react.");
        let only_title = CandidateItem::new("Title", "  ", "u", Source::Rss);
        assert_eq!(only_title.text(), "Title");
    }

    #[test]
    fn engagement_sums_present_counters() {
        let none = CandidateItem::new("t", "s", "u", Source::Rss);
        assert_eq!(none.engagement(), None);

        let some = CandidateItem::new("t", "s", "u", Source::Twitter)
            .shares(10)
            .retweets(5);
        assert_eq!(some.engagement(), Some(15));
    }

    #[test]
    fn candidate_accepts_legacy_counter_names() {
        let raw = r#"{"title":"t","summary":"s","url":"u","source":"newsapi","shares":7,"retweets":3}"#;
        let it: CandidateItem = serde_json::from_str(raw).unwrap();
        assert_eq!(it.source, Source::NewsApi);
        assert_eq!(it.share_count, Some(7));
        assert_eq!(it.retweet_count, Some(3));
        assert_eq!(it.published_at, None);
    }

    #[test]
    fn lenient_decoding_tolerates_feed_quirks() {
        let raw = serde_json::json!({
            "title": null,
            "summary": "Storm hits the coast",
            "url": "https://news.example/storm",
            "published_at": "Sat, 01 Mar 2025 10:00:00 +0100",
            "source": "Twitter"
        });
        let it = CandidateItem::from_json(&raw).unwrap();
        assert_eq!(it.title, "");
        assert_eq!(it.source, Source::Twitter);
        assert_eq!(
            it.published_at,
            Some(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
        );

        let garbled = serde_json::json!({ "url": "u", "source": "rss", "published_at": "yesterday" });
        assert_eq!(CandidateItem::from_json(&garbled).unwrap().published_at, None);
    }

    #[test]
    fn lenient_decoding_rejects_unknown_or_missing_source() {
        let unknown = serde_json::json!({ "title": "t", "url": "u", "source": "mastodon" });
        assert!(CandidateItem::from_json(&unknown)
            .unwrap_err()
            .contains("mastodon"));
        let missing = serde_json::json!({ "title": "t", "url": "u" });
        assert!(CandidateItem::from_json(&missing).is_err());
        let bad_counter = serde_json::json!({ "title": "t", "url": "u", "source": "rss", "shares": "many" });
        assert!(CandidateItem::from_json(&bad_counter).is_err());
    }

    #[test]
    fn timestamps_accept_rfc3339_and_rfc2822() {
        let a = parse_timestamp("2025-03-01T09:00:00Z");
        let b = parse_timestamp("Sat, 01 Mar 2025 09:00:00 GMT");
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(parse_timestamp("01/03/2025"), None);
    }

    #[test]
    fn signal_kind_parses_case_insensitively() {
        assert_eq!(SignalKind::parse("Relevance"), Some(SignalKind::Relevance));
        assert_eq!(SignalKind::parse("trend"), None);
    }
}
