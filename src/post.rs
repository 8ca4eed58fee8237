//! Post record model.
//!
//! Only the fields the analytics read are typed; every other source field is kept in a
//! flattened map so a stored record carries the original document untouched.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::sentiment::Sentiment;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub screen_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hashtag {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub screen_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub hashtags: Vec<Hashtag>,
    #[serde(default)]
    pub user_mentions: Vec<Mention>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a truncated post (`extended_tweet`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedBody {
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub entities: Entities,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub id_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_tweet: Option<ExtendedBody>,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub entities: Entities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retweeted_status: Option<Box<Post>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_status: Option<Box<Post>>,
    #[serde(default)]
    pub in_reply_to_screen_name: Option<String>,
    #[serde(default)]
    pub in_reply_to_status_id: Option<u64>,
    #[serde(default)]
    pub is_quote_status: bool,
    #[serde(default)]
    pub retweet_count: u64,

    /// RFC 3339 rendering of `created_at`, added on crawl ingest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Derived polarity label (-1, 0, 1), added by the sentiment job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<i8>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Post {
    pub fn from_value(v: Value) -> Result<Self> {
        Ok(serde_json::from_value(v)?)
    }

    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Unique record key: `id_str` when present, else the numeric id.
    pub fn key(&self) -> String {
        match self.id_str.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => self.id.to_string(),
        }
    }

    /// Whether the document carries an id to key it by.
    pub fn has_key(&self) -> bool {
        self.id != 0 || self.id_str.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// The post whose content counts: the retweeted post for retweets, else this one.
    pub fn effective(&self) -> &Post {
        self.retweeted_status.as_deref().unwrap_or(self)
    }

    /// Entities of the effective body (extended body when truncated).
    pub fn body_entities(&self) -> &Entities {
        let post = self.effective();
        if post.truncated {
            if let Some(ext) = &post.extended_tweet {
                return &ext.entities;
            }
        }
        &post.entities
    }

    /// Text of the effective body: extended `full_text` when truncated, else `full_text`, else `text`.
    pub fn body_text(&self) -> &str {
        let post = self.effective();
        if post.truncated {
            if let Some(t) = post.extended_tweet.as_ref().and_then(|e| e.full_text.as_deref()) {
                return t;
            }
        }
        post.full_text.as_deref().or(post.text.as_deref()).unwrap_or("")
    }

    /// Case-folded hashtags of the effective body, sorted and deduplicated.
    pub fn hashtag_set(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .body_entities()
            .hashtags
            .iter()
            .map(|h| h.text.to_lowercase())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    pub fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some()
    }

    pub fn is_reply(&self) -> bool {
        self.in_reply_to_status_id.is_some() && !self.is_quote_status
    }

    pub fn label(&self) -> Option<Sentiment> {
        self.sentiment.and_then(Sentiment::from_i8)
    }

    /// Fill `timestamp` from `created_at` when it parses.
    pub fn stamp_timestamp(&mut self) {
        if let Some(raw) = self.extra.get("created_at").and_then(|v| v.as_str()) {
            if let Some(ts) = parse_created_at(raw) {
                self.timestamp = Some(ts);
            }
        }
    }
}

/// Parse `Wed Oct 10 20:19:24 +0000 2018` into RFC 3339.
pub fn parse_created_at(raw: &str) -> Option<String> {
    let fmt = format_description!(
        "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] +0000 [year]"
    );
    let dt = PrimitiveDateTime::parse(raw.trim(), &fmt).ok()?;
    dt.assume_utc().format(&Rfc3339).ok()
}
