//! Sentiment job: polarity scoring of the normalized corpus and the ternary label mapping.

use ahash::AHashMap;
use rayon::prelude::*;
use serde::Serialize;

use crate::post::Post;
use crate::text::normalize;

/// Ternary polarity label persisted as an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// `< 0` negative, `[0, 0.2)` neutral, `>= 0.2` positive. Anything else
    /// (NaN) falls through to negative.
    pub fn from_score(score: f64) -> Self {
        if (0.0..0.2).contains(&score) {
            Sentiment::Neutral
        } else if score >= 0.2 {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Sentiment::Negative => -1,
            Sentiment::Neutral => 0,
            Sentiment::Positive => 1,
        }
    }

    pub fn from_i8(v: i8) -> Option<Self> {
        match v {
            -1 => Some(Sentiment::Negative),
            0 => Some(Sentiment::Neutral),
            1 => Some(Sentiment::Positive),
            _ => None,
        }
    }
}

/// Maps a normalized text to a polarity in `[-1, 1]`.
pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// Averaged word-polarity scorer.
///
/// Each token found in the lexicon contributes its polarity; a preceding negator flips
/// and halves it. The score is the mean over contributing tokens, 0.0 when none match.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: AHashMap<String, f64>,
}

const NEGATORS: &[&str] = &["not", "no", "never", "nor", "without"];

impl LexiconScorer {
    pub fn with_lexicon<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self { lexicon: entries.into_iter().map(|(w, s)| (w.into(), s)).collect() }
    }

    pub fn lexicon_size(&self) -> usize {
        self.lexicon.len()
    }

    fn default_lexicon() -> Vec<(&'static str, f64)> {
        vec![
            ("good", 0.7), ("great", 0.8), ("excellent", 1.0), ("amazing", 0.6),
            ("awesome", 1.0), ("best", 1.0), ("better", 0.5), ("love", 0.5),
            ("loved", 0.7), ("lovely", 0.5), ("happy", 0.8), ("glad", 0.5),
            ("nice", 0.6), ("wonderful", 1.0), ("fantastic", 0.4), ("beautiful", 0.85),
            ("safe", 0.5), ("hope", 0.3), ("thank", 0.4), ("thanks", 0.2),
            ("strong", 0.43), ("well", 0.3), ("positive", 0.23), ("win", 0.8),
            ("recovered", 0.3), ("recovery", 0.3), ("support", 0.3), ("proud", 0.8),
            ("free", 0.4), ("healthy", 0.5), ("helpful", 0.5), ("fun", 0.3),
            ("cool", 0.35), ("interesting", 0.5), ("important", 0.4), ("true", 0.35),
            ("bad", -0.7), ("worse", -0.4), ("worst", -1.0), ("terrible", -1.0),
            ("awful", -1.0), ("horrible", -1.0), ("hate", -0.8), ("sad", -0.5),
            ("angry", -0.5), ("fear", -0.5), ("scared", -0.6), ("panic", -0.5),
            ("sick", -0.71), ("dead", -0.2), ("death", -0.3), ("die", -0.4),
            ("dying", -0.4), ("crisis", -0.4), ("stupid", -0.8), ("wrong", -0.5),
            ("poor", -0.4), ("negative", -0.3), ("fake", -0.5), ("lie", -0.5),
            ("lies", -0.5), ("disaster", -0.6), ("dangerous", -0.6), ("serious", -0.33),
            ("crazy", -0.6), ("shit", -0.2), ("ridiculous", -0.33), ("tired", -0.4),
            ("lost", -0.3), ("alone", -0.2), ("hard", -0.3), ("difficult", -0.5),
        ]
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::with_lexicon(Self::default_lexicon())
    }
}

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let mut total = 0.0;
        let mut hits = 0usize;
        let mut negate = false;
        for token in text.split_whitespace() {
            if NEGATORS.contains(&token) {
                negate = true;
                continue;
            }
            if let Some(&p) = self.lexicon.get(token) {
                total += if negate { -0.5 * p } else { p };
                hits += 1;
            }
            negate = false;
        }
        if hits == 0 { 0.0 } else { (total / hits as f64).clamp(-1.0, 1.0) }
    }
}

/// Label distribution of one sentiment pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub negative: u64,
    pub neutral: u64,
    pub positive: u64,
}

impl SentimentCounts {
    pub fn tally(labels: &[(String, Sentiment)]) -> Self {
        let mut c = Self::default();
        for (_, s) in labels {
            match s {
                Sentiment::Negative => c.negative += 1,
                Sentiment::Neutral => c.neutral += 1,
                Sentiment::Positive => c.positive += 1,
            }
        }
        c
    }

    pub fn total(&self) -> u64 {
        self.negative + self.neutral + self.positive
    }
}

/// Score every post's normalized body text. Output order follows input order.
pub fn sentiment_analysis(posts: &[Post], scorer: &dyn PolarityScorer) -> Vec<(String, Sentiment)> {
    let labels: Vec<(String, Sentiment)> = posts
        .par_iter()
        .map(|p| {
            let score = scorer.polarity(&normalize(p.body_text()));
            (p.key(), Sentiment::from_score(score))
        })
        .collect();
    tracing::debug!("scored {} posts", labels.len());
    labels
}
