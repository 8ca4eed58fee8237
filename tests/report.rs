#[path = "common/mod.rs"]
mod common;

use common::*;
use postgraph::{sentiment_chart, Analysis, AnalysisOptions, Collection, SentimentCounts, SentimentFilter};
use std::fs;

fn analysed_collection() -> (std::path::PathBuf, Collection) {
    let root = temp_root();
    let c = Collection::open(root.join("data"), "sample_tweets").unwrap();
    for v in sample_corpus() {
        c.insert(&to_post(v)).unwrap();
    }
    (root, c)
}

/// A full run writes the topic list, the chart and three reports per bucket, and leaves
/// every record labelled.
#[test]
fn analysis_writes_all_reports() {
    let (root, c) = analysed_collection();
    let results = root.join("results");
    let opts = AnalysisOptions::default()
        .with_results_dir(&results)
        .with_max_topics(4)
        .with_progress(false);

    let report = Analysis::new(&c).with_options(opts).run().unwrap();
    assert_eq!(report.files.len(), 2 + 4 * 3);
    for f in &report.files {
        assert!(f.exists(), "{} missing", f.display());
    }
    for tag in ["all", "negative", "neutral", "positive"] {
        for prefix in ["top_entities", "tweet_statistics", "network_information"] {
            assert!(results.join(format!("{}_{}.txt", prefix, tag)).exists());
        }
    }

    assert_eq!(report.sentiment.total(), 7);
    assert_eq!(c.count(SentimentFilter::Labelled).unwrap(), 7);
    // the corpus is too small for any term to reach the document-frequency floor
    assert!(report.topics.is_empty());
    assert_eq!(fs::read_to_string(results.join("topics.txt")).unwrap(), "");
}

/// Post statistics and network sections carry the expected counts and labels.
#[test]
fn bucket_reports_content() {
    let (root, c) = analysed_collection();
    let results = root.join("results");
    Analysis::new(&c)
        .with_options(AnalysisOptions::default().with_results_dir(&results).with_progress(false))
        .run()
        .unwrap();

    let stats = fs::read_to_string(results.join("tweet_statistics_all.txt")).unwrap();
    assert!(stats.starts_with("Collection: all\n"));
    assert!(stats.contains("Total posts in collection: 7\n"));
    assert!(stats.contains("1 retweets\n1 quotes\n1 replies\n"));
    assert!(stats.contains("Average character length is: "));

    let net = fs::read_to_string(results.join("network_information_all.txt")).unwrap();
    for section in ["General network", "Retweet network", "Quote network", "Hashtag network"] {
        assert!(net.contains(section), "missing {}", section);
    }
    // alice <-> bob mention each other
    let general = &net[net.find("General network").unwrap()..net.find("Retweet network").unwrap()];
    assert!(general.contains("Loops: 1\n"));
    assert!(general.contains("Links: 3\n"));
    let hashtag = &net[net.find("Hashtag network").unwrap()..];
    assert!(hashtag.contains("Ties: 2\n"));
    assert!(hashtag.contains("Triads: 1\n"));
    assert!(!hashtag.contains("Loops"));

    let top = fs::read_to_string(results.join("top_entities_all.txt")).unwrap();
    assert!(top.starts_with("Top Mentions\n"));
    assert!(top.contains("Top Retweets\nbob: 4\n"));
    assert!(top.contains("Top concepts\n"));
}

#[test]
fn chart_is_svg_with_counts() {
    let svg = sentiment_chart(&SentimentCounts { negative: 3, neutral: 0, positive: 12 });
    assert!(svg.starts_with("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
    for label in ["Negative", "Neutral", "Positive", ">3<", ">12<", ">0<"] {
        assert!(svg.contains(label), "missing {}", label);
    }
}
