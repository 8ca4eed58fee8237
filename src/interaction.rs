//! Interaction tallies: who retweets, quotes, replies to and mentions whom, and which
//! hashtags share a post.

use crate::counting::{tally_pair, CountMap};
use crate::filters::{filtered, SentimentFilter};
use crate::post::Post;

/// The three directed user networks of one corpus selection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UserNetworks {
    /// author -> mentioned user
    pub mentions: CountMap,
    /// author -> retweeted author
    pub retweets: CountMap,
    /// author -> quoted author, and author -> replied-to user
    pub quotes: CountMap,
}

pub fn user_interaction<'a, I>(posts: I, filter: SentimentFilter) -> UserNetworks
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut nets = UserNetworks::default();
    for post in filtered(posts, filter) {
        let author = post.user.screen_name.as_str();

        if let Some(rt) = post.retweeted_status.as_deref() {
            tally_pair(&mut nets.retweets, author, &rt.user.screen_name);
        }
        if let Some(q) = post.quoted_status.as_deref() {
            tally_pair(&mut nets.quotes, author, &q.user.screen_name);
        }
        if let Some(replied) = post.in_reply_to_screen_name.as_deref() {
            tally_pair(&mut nets.quotes, author, replied);
        }
        for m in &post.body_entities().user_mentions {
            tally_pair(&mut nets.mentions, author, &m.screen_name);
        }
    }
    nets
}

/// One sorted, deduplicated, case-folded hashtag set per post that has hashtags.
pub fn hashtag_interaction<'a, I>(posts: I, filter: SentimentFilter) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = &'a Post>,
{
    filtered(posts, filter)
        .map(Post::hashtag_set)
        .filter(|set| !set.is_empty())
        .collect()
}
