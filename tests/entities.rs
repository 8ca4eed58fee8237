#[path = "common/mod.rs"]
mod common;

use common::*;
use postgraph::{
    average_char_count, count_post_kinds, extract_top_entities, top_n_items, PostKindCounts, SentimentFilter,
};
use serde_json::json;

/// First sighting of a retweeted author seeds the tally with the embedded post's own
/// `retweet_count`; later sightings add one.
#[test]
fn retweet_tally_seeds_then_increments() {
    let mut original = post_json(1, "bob", "hello", &[], &[]);
    original["retweet_count"] = json!(5);
    let posts = to_posts(vec![
        retweet_json(10, "carol", original.clone()),
        retweet_json(11, "dave", original),
    ]);
    let top = extract_top_entities(&posts, SentimentFilter::Everything, 10);
    assert_eq!(top.retweets["bob"], 6);
}

/// A seeded zero looks unseen, so the next sighting seeds again instead of adding one.
#[test]
fn zero_seed_is_reseeded() {
    let original = post_json(1, "bob", "hello", &[], &[]);
    let posts = to_posts(vec![
        retweet_json(10, "carol", original.clone()),
        retweet_json(11, "dave", original),
    ]);
    let top = extract_top_entities(&posts, SentimentFilter::Everything, 10);
    assert_eq!(top.retweets["bob"], 0);
}

/// Mentioned users each get one, and so does the author of a post that mentions anyone.
#[test]
fn mentions_count_author_too() {
    let posts = to_posts(vec![
        post_json(1, "alice", "hi @bob @carol", &[], &["bob", "carol"]),
        post_json(2, "alice", "no mentions here", &[], &[]),
    ]);
    let top = extract_top_entities(&posts, SentimentFilter::Everything, 10);
    assert_eq!(top.mentions["bob"], 1);
    assert_eq!(top.mentions["carol"], 1);
    assert_eq!(top.mentions["alice"], 1);
    assert_eq!(top.mentions.len(), 3);
}

/// Truncated posts are read from their extended body, text and entities alike.
#[test]
fn truncated_posts_use_extended_body() {
    let mut v = post_json(1, "alice", "Short version…", &[], &[]);
    v["truncated"] = json!(true);
    v["extended_tweet"] = json!({
        "full_text": "Short version of a longer lockdown story #Lockdown",
        "entities": { "hashtags": [{ "text": "Lockdown" }], "user_mentions": [] }
    });
    let posts = to_posts(vec![v]);
    let top = extract_top_entities(&posts, SentimentFilter::Everything, 10);
    assert_eq!(top.hashtags["lockdown"], 1);
    assert!(top.top_terms.iter().any(|(t, _)| t == "story"));
    assert_eq!(
        average_char_count(&posts, SentimentFilter::Everything),
        "Short version of a longer lockdown story #Lockdown".chars().count()
    );
}

/// Hashtags fold case; top terms break count ties alphabetically.
#[test]
fn hashtags_and_top_terms() {
    let posts = to_posts(sample_corpus());
    let top = extract_top_entities(&posts, SentimentFilter::Everything, 3);
    assert_eq!(top.hashtags["covid"], 2);
    assert_eq!(top.hashtags["vaccine"], 2);
    assert_eq!(top.top_terms.len(), 3);
    assert!(top.top_terms.windows(2).all(|w| w[0].1 > w[1].1 || (w[0].1 == w[1].1 && w[0].0 < w[1].0)));

    let items = top_n_items(&top.hashtags, 2);
    assert_eq!(items, vec!["covid: 2", "vaccine: 2"]);
}

/// Kind counters: a retweet, a quote and a reply among seven posts.
#[test]
fn post_kinds() {
    let posts = to_posts(sample_corpus());
    let c = count_post_kinds(&posts, SentimentFilter::Everything);
    assert_eq!(c, PostKindCounts { total: 7, retweets: 1, quotes: 1, replies: 1 });
}

/// The sentiment filter restricts every pass; an empty selection averages to zero.
#[test]
fn filters_and_empty_selection() {
    let mut labelled = post_json(1, "alice", "abcd", &["x"], &[]);
    labelled["sentiment"] = json!(1);
    let posts = to_posts(vec![labelled, post_json(2, "bob", "abcdefgh", &["y"], &[])]);

    assert_eq!(count_post_kinds(&posts, SentimentFilter::Labelled).total, 1);
    assert_eq!(average_char_count(&posts, SentimentFilter::Labelled), 4);
    assert_eq!(average_char_count(&posts, SentimentFilter::Everything), 6);
    assert_eq!(
        average_char_count(&posts, SentimentFilter::Only(postgraph::Sentiment::Negative)),
        0
    );
    let top = extract_top_entities(&posts, SentimentFilter::Labelled, 10);
    assert!(top.hashtags.contains_key("x"));
    assert!(!top.hashtags.contains_key("y"));
}
