use postgraph::{clean_text, is_stopword, normalize, tokenize};

/// The canonical crawl example: retweet marker kept, mention, URL, punctuation and
/// emoji removed, hashtag word kept without its marker.
#[test]
fn tokenize_scrubs_a_typical_post() {
    let tokens = tokenize("RT @alice: Check http://x.co #Great day! 😀");
    assert_eq!(tokens, vec!["rt", "check", "great", "day"]);
}

/// `www.` links go the same way as `http(s)://` ones, and digits become separators.
#[test]
fn clean_text_drops_www_links_and_digits() {
    assert_eq!(clean_text("see www.example.com/a_b"), "see");
    assert_eq!(tokenize("see www.example.com/a_b now"), vec!["see"]);
    assert_eq!(tokenize("covid19 cases up 20%"), vec!["covid", "cases"]);
}

/// Underscores and colons split words; non-ASCII letters are not kept half-way.
#[test]
fn separators_and_non_ascii_become_spaces() {
    assert_eq!(tokenize("stay_home:now"), vec!["stay", "home"]);
    assert_eq!(tokenize("café déjà vu"), vec!["caf", "j", "vu"]);
}

/// English stopwords and the crawl noise words never survive tokenisation.
#[test]
fn stopwords_are_removed() {
    for w in ["the", "and", "amp", "im", "user", "url", "at"] {
        assert!(is_stopword(w), "{} should be a stopword", w);
    }
    assert!(!is_stopword("vaccine"));
    assert_eq!(tokenize("The vaccine and the trial &amp; more"), vec!["vaccine", "trial"]);
}

/// The corpus line is the token list joined by single spaces; blank input stays blank.
#[test]
fn normalize_joins_tokens() {
    assert_eq!(normalize("  Great   news,   everyone!! "), "great news everyone");
    assert_eq!(normalize(""), "");
    assert!(tokenize("@someone https://t.co/x").is_empty());
}
