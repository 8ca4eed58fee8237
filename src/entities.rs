//! Entity extractor: mention, retweet and hashtag tallies plus the term-frequency corpus,
//! and the per-bucket post counters used by the statistics report.

use serde::Serialize;

use crate::counting::{tally, top_n, Tally};
use crate::filters::{filtered, SentimentFilter};
use crate::post::Post;
use crate::text::tokenize;

#[derive(Debug, Default, Clone)]
pub struct TopEntities {
    pub mentions: Tally,
    pub retweets: Tally,
    pub hashtags: Tally,
    /// Most frequent normalized tokens, count descending.
    pub top_terms: Vec<(String, u64)>,
}

/// Walk the posts passing `filter` and tally entities.
///
/// Retweet tallies are keyed by the retweeted author. The first sighting seeds the tally
/// with the embedded post's own `retweet_count`; later sightings add one each. A seeded
/// zero counts as unseen, so the next sighting seeds again.
pub fn extract_top_entities<'a, I>(posts: I, filter: SentimentFilter, n: usize) -> TopEntities
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut out = TopEntities::default();
    let mut corpus = Tally::default();

    for post in filtered(posts, filter) {
        for token in tokenize(post.body_text()) {
            tally(&mut corpus, &token);
        }

        if let Some(rt) = post.retweeted_status.as_deref() {
            match out.retweets.get_mut(&rt.user.screen_name) {
                Some(c) if *c > 0 => *c += 1,
                _ => {
                    out.retweets.insert(rt.user.screen_name.clone(), rt.retweet_count);
                }
            }
        }

        let body = post.body_entities();
        if !body.user_mentions.is_empty() {
            for m in &body.user_mentions {
                tally(&mut out.mentions, &m.screen_name);
            }
            // the author is counted alongside the users they mention
            tally(&mut out.mentions, &post.user.screen_name);
        }

        for h in &body.hashtags {
            tally(&mut out.hashtags, &h.text.to_lowercase());
        }
    }

    out.top_terms = top_n(&corpus, n);
    out
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostKindCounts {
    pub total: u64,
    pub retweets: u64,
    pub quotes: u64,
    pub replies: u64,
}

pub fn count_post_kinds<'a, I>(posts: I, filter: SentimentFilter) -> PostKindCounts
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut c = PostKindCounts::default();
    for post in filtered(posts, filter) {
        c.total += 1;
        if post.is_retweet() { c.retweets += 1; }
        if post.is_quote_status { c.quotes += 1; }
        if post.is_reply() { c.replies += 1; }
    }
    c
}

/// Integer-floor mean body length in characters; 0 for an empty selection.
pub fn average_char_count<'a, I>(posts: I, filter: SentimentFilter) -> usize
where
    I: IntoIterator<Item = &'a Post>,
{
    let (chars, count) = filtered(posts, filter)
        .fold((0usize, 0usize), |(chars, n), p| (chars + p.body_text().chars().count(), n + 1));
    if count == 0 { 0 } else { chars / count }
}
