//! Text normalizer: strips URLs, mentions, emoji and punctuation, then tokenizes and
//! drops stopwords. The output feeds both the term-frequency tallies and the
//! sentiment/topic jobs.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// English stopwords plus the crawl-specific noise words.
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
    // placeholders left behind by URL/mention scrubbing, and tweet noise
    "at", "user", "url", "amp", "im",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"(www\.\S+)|(https?://\S+)")
}

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"[:_]+")
}

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"@\S+")
}

fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"#(\S+)")
}

fn non_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"[^a-z ]+")
}

/// Lowercase and scrub a post body down to ASCII letters and spaces.
///
/// Order matters: URLs go first (they contain `:` and `_`), separators are spaced out
/// before mentions so `@alice:` loses its colon, and the `#` marker is dropped while the
/// hashtag word is kept.
pub fn clean_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let no_urls = url_re().replace_all(&lower, " ");
    // emoji and every other non-ASCII char
    let ascii: String = no_urls
        .chars()
        .map(|c| if c.is_ascii() { c } else { ' ' })
        .collect();
    let spaced = separator_re().replace_all(&ascii, " ");
    let no_mentions = mention_re().replace_all(&spaced, " ");
    let no_marker = hashtag_re().replace_all(&no_mentions, "$1");
    let letters = non_letter_re().replace_all(&no_marker, " ");
    letters.trim().to_string()
}

/// Clean, split on whitespace and drop stopwords.
pub fn tokenize(text: &str) -> Vec<String> {
    let stop = stopwords();
    clean_text(text)
        .split_whitespace()
        .filter(|t| !stop.contains(t))
        .map(str::to_string)
        .collect()
}

/// Tokens joined by single spaces: one line of the normalized corpus.
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

pub fn is_stopword(token: &str) -> bool {
    stopwords().contains(token)
}
