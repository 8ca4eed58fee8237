//! Analysis run over one collection: topics, sentiment labels and chart, then entity,
//! post-count and network reports for each sentiment bucket.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::AnalysisOptions;
use crate::counting::top_n_items;
use crate::entities::{average_char_count, count_post_kinds, extract_top_entities};
use crate::filters::SentimentFilter;
use crate::graph::{InteractionGraph, NetworkSummary};
use crate::interaction::{hashtag_interaction, user_interaction};
use crate::post::Post;
use crate::progress::ProgressScope;
use crate::sentiment::{sentiment_analysis, LexiconScorer, PolarityScorer, SentimentCounts};
use crate::stats::{hashtag_network_statistics, user_network_statistics};
use crate::store::Collection;
use crate::util::create_with_backoff;

#[derive(Clone, Debug, Default)]
pub struct AnalysisReport {
    pub topics: Vec<String>,
    pub sentiment: SentimentCounts,
    /// Every file written, in write order.
    pub files: Vec<PathBuf>,
}

pub struct Analysis<'a> {
    collection: &'a Collection,
    opts: AnalysisOptions,
    scorer: Box<dyn PolarityScorer>,
}

impl<'a> Analysis<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        Self { collection, opts: AnalysisOptions::default(), scorer: Box::new(LexiconScorer::default()) }
    }

    pub fn with_options(mut self, opts: AnalysisOptions) -> Self {
        self.opts = opts;
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn PolarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn run(&self) -> Result<AnalysisReport> {
        let dir = &self.opts.results_dir;
        fs::create_dir_all(dir).with_context(|| format!("create results dir {}", dir.display()))?;
        let mut report = AnalysisReport::default();

        let posts = self.collection.load(SentimentFilter::Everything)?;
        tracing::info!("analysing {} posts from {}", posts.len(), self.collection.name());

        tracing::info!("running topic extraction -> {}", dir.join("topics.txt").display());
        report.topics = crate::topics::topic_extraction(&posts, self.opts.max_topics);
        let mut topics = String::new();
        for line in &report.topics {
            let _ = writeln!(topics, "{}", line);
        }
        report.files.push(write_report(&dir.join("topics.txt"), &topics)?);

        tracing::info!("running sentiment analysis -> {}", dir.join("sentiment.svg").display());
        let labels = sentiment_analysis(&posts, self.scorer.as_ref());
        report.sentiment = SentimentCounts::tally(&labels);
        report.files.push(write_report(&dir.join("sentiment.svg"), &sentiment_chart(&report.sentiment))?);
        self.collection.set_sentiments(&labels)?;
        drop(posts);

        // reload so every bucket sees the stored labels
        let posts = self.collection.load(SentimentFilter::Everything)?;
        let buckets = SentimentFilter::buckets();
        let pb = self.opts.progress.then(|| ProgressScope::count("buckets", buckets.len() as u64));
        for (tag, filter) in buckets {
            tracing::info!("running post analysis for {} posts", tag);
            report.files.push(write_report(
                &dir.join(format!("top_entities_{}.txt", tag)),
                &self.top_entities_report(&posts, filter),
            )?);
            report.files.push(write_report(
                &dir.join(format!("tweet_statistics_{}.txt", tag)),
                &post_statistics_report(tag, &posts, filter),
            )?);
            report.files.push(write_report(
                &dir.join(format!("network_information_{}.txt", tag)),
                &network_report(tag, &posts, filter),
            )?);
            if let Some(pb) = &pb {
                pb.inc_items(1);
            }
        }
        if let Some(pb) = &pb {
            pb.finish("analysis done");
        }

        Ok(report)
    }

    fn top_entities_report(&self, posts: &[Post], filter: SentimentFilter) -> String {
        let n = self.opts.top_items;
        let top = extract_top_entities(posts, filter, self.opts.top_terms.max(n));
        let concepts: Vec<String> = top
            .top_terms
            .iter()
            .take(n)
            .map(|(t, c)| format!("{}: {}", t, c))
            .collect();
        let sections = [
            ("Top Mentions", top_n_items(&top.mentions, n)),
            ("Top Retweets", top_n_items(&top.retweets, n)),
            ("Top Hashtags", top_n_items(&top.hashtags, n)),
            ("Top concepts", concepts),
        ];

        let mut out = String::new();
        for (title, items) in sections {
            let _ = write!(out, "{}\n{}\n\n", title, items.join(", "));
        }
        out
    }
}

fn post_statistics_report(tag: &str, posts: &[Post], filter: SentimentFilter) -> String {
    let kinds = count_post_kinds(posts, filter);
    let avg = average_char_count(posts, filter);
    let mut out = String::new();
    let _ = writeln!(out, "Collection: {}", tag);
    let _ = writeln!(out, "Total posts in collection: {}", kinds.total);
    let _ = writeln!(out, "{} retweets", kinds.retweets);
    let _ = writeln!(out, "{} quotes", kinds.quotes);
    let _ = writeln!(out, "{} replies", kinds.replies);
    let _ = write!(out, "Average character length is: {}", avg);
    out
}

fn write_summary(out: &mut String, title: &str, summary: &NetworkSummary, stats: &[(&str, u64)]) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "Number of nodes: {}", summary.nodes);
    let _ = writeln!(out, "Number of edges: {}", summary.edges);
    let _ = writeln!(out, "Number of subgraphs: {}", summary.components);
    let _ = writeln!(out, "Average group size: {}", summary.average_component_size);
    out.push('\n');
    for (label, value) in stats {
        let _ = writeln!(out, "{}: {}", label, value);
    }
    out.push('\n');
}

fn network_report(tag: &str, posts: &[Post], filter: SentimentFilter) -> String {
    let nets = user_interaction(posts, filter);
    let hashtags = hashtag_interaction(posts, filter);

    let mut out = String::new();
    let _ = writeln!(out, "Collection: {}", tag);
    for (title, counts) in [
        ("General network", &nets.mentions),
        ("Retweet network", &nets.retweets),
        ("Quote network", &nets.quotes),
    ] {
        let summary = NetworkSummary::of(&InteractionGraph::from_counts(counts));
        let s = user_network_statistics(counts);
        write_summary(
            &mut out,
            title,
            &summary,
            &[("Triads", s.triads), ("Loops", s.loops), ("Links", s.links), ("Transitive", s.transitive)],
        );
    }

    let summary = NetworkSummary::of(&InteractionGraph::from_hashtag_sets(&hashtags));
    let s = hashtag_network_statistics(&hashtags);
    write_summary(&mut out, "Hashtag network", &summary, &[("Triads", s.triads), ("Ties", s.ties)]);
    out
}

/// Bar chart of the three sentiment counts as a standalone SVG document.
pub fn sentiment_chart(counts: &SentimentCounts) -> String {
    const W: u64 = 480;
    const H: u64 = 360;
    const TOP: u64 = 50;
    const BASE: u64 = 310;
    const BAR: u64 = 100;

    let bars = [
        ("Negative", counts.negative, "#d62728"),
        ("Neutral", counts.neutral, "#1f77b4"),
        ("Positive", counts.positive, "#2ca02c"),
    ];
    let max = bars.iter().map(|b| b.1).max().unwrap_or(0).max(1);

    let mut svg = String::new();
    let _ = writeln!(svg, r#"<svg xmlns="http://www.w3.org/2000/svg" width="{W}" height="{H}" viewBox="0 0 {W} {H}">"#);
    let _ = writeln!(svg, r#"<rect width="{W}" height="{H}" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle" font-family="sans-serif" font-size="18">Number of posts by sentiment</text>"#,
        W / 2
    );
    for (i, (label, value, color)) in bars.iter().enumerate() {
        let height = value * (BASE - TOP) / max;
        let x = 50 + i as u64 * (BAR + 40);
        let y = BASE - height;
        let mid = x + BAR / 2;
        let _ = writeln!(svg, r#"<rect x="{x}" y="{y}" width="{BAR}" height="{height}" fill="{color}"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{mid}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="13">{value}</text>"#,
            y.saturating_sub(6)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{mid}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="13">{label}</text>"#,
            BASE + 22
        );
    }
    let _ = writeln!(svg, r#"<line x1="40" y1="{BASE}" x2="{}" y2="{BASE}" stroke="black"/>"#, W - 20);
    svg.push_str("</svg>\n");
    svg
}

fn write_report(path: &Path, contents: &str) -> Result<PathBuf> {
    let mut f = create_with_backoff(path).with_context(|| format!("create {}", path.display()))?;
    f.write_all(contents.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    tracing::debug!("wrote {}", path.display());
    Ok(path.to_path_buf())
}
