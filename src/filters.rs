//! Sentiment-bucket filter applied to every analysis pass.

use crate::post::Post;
use crate::sentiment::Sentiment;

/// Which posts an analysis pass sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SentimentFilter {
    /// Every post, labelled or not.
    Everything,
    /// Posts carrying any sentiment label.
    Labelled,
    /// Posts carrying exactly this label.
    Only(Sentiment),
}

impl SentimentFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            SentimentFilter::Everything => true,
            SentimentFilter::Labelled => post.label().is_some(),
            SentimentFilter::Only(s) => post.label() == Some(*s),
        }
    }

    /// Report buckets in output order: `all`, `negative`, `neutral`, `positive`.
    pub fn buckets() -> [(&'static str, SentimentFilter); 4] {
        [
            ("all", SentimentFilter::Labelled),
            ("negative", SentimentFilter::Only(Sentiment::Negative)),
            ("neutral", SentimentFilter::Only(Sentiment::Neutral)),
            ("positive", SentimentFilter::Only(Sentiment::Positive)),
        ]
    }
}

/// Iterate the posts of `posts` that pass `filter`.
pub fn filtered<'a, I>(posts: I, filter: SentimentFilter) -> impl Iterator<Item = &'a Post>
where
    I: IntoIterator<Item = &'a Post>,
{
    posts.into_iter().filter(move |p| filter.matches(p))
}
