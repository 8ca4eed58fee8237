#![allow(dead_code)]

use postgraph::Post;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Stable numeric id for a screen name so fixtures can refer to users by name.
pub fn user_id(name: &str) -> u64 {
    name.bytes().fold(7u64, |h, b| h.wrapping_mul(31).wrapping_add(b as u64)) % 1_000_000_000 + 1
}

pub fn user(name: &str) -> Value {
    json!({ "id": user_id(name), "screen_name": name, "followers_count": 10 })
}

/// A plain post by `author` with the given hashtags and mentions in its entities.
pub fn post_json(id: u64, author: &str, text: &str, hashtags: &[&str], mentions: &[&str]) -> Value {
    json!({
        "id": id,
        "id_str": id.to_string(),
        "created_at": "Wed Mar 18 10:15:00 +0000 2020",
        "text": text,
        "truncated": false,
        "user": user(author),
        "entities": {
            "hashtags": hashtags.iter().map(|h| json!({ "text": h, "indices": [0, 1] })).collect::<Vec<_>>(),
            "user_mentions": mentions.iter().map(|m| json!({ "screen_name": m, "id": user_id(m) })).collect::<Vec<_>>(),
            "urls": []
        },
        "is_quote_status": false,
        "retweet_count": 0,
        "lang": "en"
    })
}

/// `author` retweeting `original`; the embedded post keeps its own `retweet_count`.
pub fn retweet_json(id: u64, author: &str, original: Value) -> Value {
    let author_of = original["user"]["screen_name"].as_str().unwrap_or("").to_string();
    let text = format!("RT @{}: {}", author_of, original["text"].as_str().unwrap_or(""));
    let mut v = post_json(id, author, &text, &[], &[&author_of]);
    v["retweeted_status"] = original;
    v
}

pub fn quote_json(id: u64, author: &str, text: &str, quoted: Value) -> Value {
    let mut v = post_json(id, author, text, &[], &[]);
    v["is_quote_status"] = json!(true);
    v["quoted_status"] = quoted;
    v
}

pub fn reply_json(id: u64, author: &str, text: &str, to: &str, to_status: u64) -> Value {
    let mut v = post_json(id, author, text, &[], &[to]);
    v["in_reply_to_screen_name"] = json!(to);
    v["in_reply_to_status_id"] = json!(to_status);
    v
}

pub fn to_post(v: Value) -> Post {
    Post::from_value(v).unwrap()
}

pub fn to_posts(vs: Vec<Value>) -> Vec<Post> {
    vs.into_iter().map(to_post).collect()
}

/// A small mixed corpus: plain posts, a retweet, a quote and a reply, with overlapping
/// hashtags and a reciprocal mention pair (alice <-> bob).
pub fn sample_corpus() -> Vec<Value> {
    let original = {
        let mut v = post_json(1, "bob", "Great news on the vaccine trial", &["Vaccine"], &[]);
        v["retweet_count"] = json!(4);
        v
    };
    vec![
        original.clone(),
        post_json(2, "alice", "Terrible day, awful queues @bob #covid #lockdown", &["covid", "lockdown"], &["bob"]),
        post_json(3, "bob", "Stay safe @alice #Covid #StayHome", &["Covid", "StayHome"], &["alice"]),
        retweet_json(4, "carol", original),
        quote_json(5, "dave", "Interesting read #vaccine", post_json(6, "erin", "Trial data out", &[], &[])),
        reply_json(7, "erin", "@dave I agree", "dave", 5),
        post_json(8, "frank", "Lovely walk in the park", &[], &[]),
    ]
}

pub fn temp_root() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    dir.into_path()
}

/// Write a compressed `.zst` file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

pub fn write_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

/// Read a text file line-by-line into strings (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

pub fn read_jsonl_values(path: &Path) -> Vec<Value> {
    read_lines(path).iter().map(|s| serde_json::from_str(s).unwrap()).collect()
}
