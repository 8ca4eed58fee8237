#[path = "common/mod.rs"]
mod common;

use anyhow::Result;
use common::*;
use parking_lot::Mutex;
use postgraph::{
    ApiConfig, Collection, CrawlOptions, Crawler, DedupQueue, HttpApi, Post, RateLimits, SearchQuery,
    SocialApi, StopSignal, StreamFilter,
};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// In-memory API: a fixed stream, canned search/timeline results and call records.
#[derive(Default)]
struct FakeApi {
    stream_posts: Vec<Post>,
    limits: RateLimits,
    followers: HashMap<u64, Vec<u64>>,
    friends: HashMap<u64, Vec<u64>>,
    timelines: HashMap<u64, Vec<Post>>,
    searches: Mutex<Vec<SearchQuery>>,
    timeline_calls: Mutex<Vec<(u64, bool)>>,
    stream_filters: Mutex<Vec<StreamFilter>>,
}

impl SocialApi for FakeApi {
    fn search(&self, query: &SearchQuery) -> Result<Vec<Post>> {
        self.searches.lock().push(query.clone());
        let id = 5000 + self.searches.lock().len() as u64;
        Ok(vec![to_post(post_json(id, "searcher", &format!("about {}", query.q), &[], &[]))])
    }

    fn user_timeline(&self, user_id: u64, exclude_replies: bool) -> Result<Vec<Post>> {
        self.timeline_calls.lock().push((user_id, exclude_replies));
        Ok(self.timelines.get(&user_id).cloned().unwrap_or_default())
    }

    fn followers_ids(&self, user_id: u64) -> Result<Vec<u64>> {
        Ok(self.followers.get(&user_id).cloned().unwrap_or_default())
    }

    fn friends_ids(&self, user_id: u64) -> Result<Vec<u64>> {
        Ok(self.friends.get(&user_id).cloned().unwrap_or_default())
    }

    fn rate_limits(&self) -> Result<RateLimits> {
        Ok(self.limits)
    }

    fn stream(&self, filter: &StreamFilter, stop: &StopSignal, on_post: &mut dyn FnMut(Post) -> Result<()>) -> Result<()> {
        self.stream_filters.lock().push(filter.clone());
        for p in &self.stream_posts {
            on_post(p.clone())?;
        }
        while stop.sleep(Duration::from_millis(10)) {}
        Ok(())
    }
}

fn quick_opts(ms: u64) -> CrawlOptions {
    CrawlOptions::default()
        .with_duration(Duration::from_millis(ms))
        .with_poll_interval(Duration::from_millis(50))
        .with_idle_backoff(Duration::from_millis(10))
}

fn open(root: &std::path::Path) -> Arc<Collection> {
    Arc::new(Collection::open(root, "crawl").unwrap())
}

/// The sample crawler stores every streamed post once, stamps timestamps and tallies duplicates.
#[test]
fn sample_crawl_stores_and_counts_duplicates() {
    let root = temp_root();
    let p1 = to_post(post_json(1, "alice", "one", &[], &[]));
    let p2 = to_post(post_json(2, "bob", "two", &[], &[]));
    let api = Arc::new(FakeApi { stream_posts: vec![p1.clone(), p2, p1], ..FakeApi::default() });
    let store = open(&root);

    let summary = Crawler::new(api.clone(), store.clone(), quick_opts(200)).run_sample();
    assert_eq!(summary.received, 3);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(store.len(), 2);

    let filters = api.stream_filters.lock();
    assert!(filters[0].track.is_empty());
    assert_eq!(filters[0].languages, vec!["en"]);

    let stored = read_jsonl_values(&root.join("crawl.jsonl"));
    assert_eq!(stored[0]["timestamp"], "2020-03-18T10:15:00Z");
    assert_eq!(stored[0]["created_at"], "Wed Mar 18 10:15:00 +0000 2020");
}

/// Streamed hashtags and authors feed the search and timeline workers, each key once.
#[test]
fn hybrid_crawl_follows_queues() {
    let root = temp_root();
    let star = user_id("star");
    let friends: Vec<u64> = (100..112).collect();
    let mut api = FakeApi {
        stream_posts: vec![
            to_post(post_json(1, "star", "big news", &["Covid", "covid"], &[])),
            to_post(post_json(2, "star", "more news", &["COVID", "masks"], &[])),
        ],
        limits: RateLimits { search: 100, user_timeline: 100, followers: 100, rate_status: 100 },
        ..FakeApi::default()
    };
    api.followers.insert(star, (0..15_000).collect());
    api.friends.insert(star, friends.clone());
    api.timelines.insert(star, vec![to_post(post_json(50, "star", "timeline post", &[], &[]))]);
    let api = Arc::new(api);
    let store = open(&root);

    let summary = Crawler::new(api.clone(), store.clone(), quick_opts(1500)).run_hybrid();

    let filters = api.stream_filters.lock();
    assert!(filters[0].track.iter().any(|k| k == "covid"));

    // hashtag searches carry no geocode; each distinct lower-cased tag is searched once
    let searches = api.searches.lock();
    let mut tags: Vec<&str> = searches.iter().filter(|q| q.geocode.is_none()).map(|q| q.q.as_str()).collect();
    tags.sort();
    assert_eq!(tags, vec!["covid", "masks"]);
    assert!(searches.iter().filter(|q| q.geocode.is_some()).all(|q| q.q == "covid"));

    // the big account is crawled with replies, its friends are queued and probed
    let calls = api.timeline_calls.lock();
    assert!(calls.contains(&(star, false)));
    assert!(store.contains("50"));
    assert_eq!(summary.users_seen, 1 + friends.len());
    // friends have no friends of their own, so none of them is crawled
    assert!(calls.iter().all(|(u, _)| *u == star));

    assert_eq!(summary.hashtags_seen, 2);
    assert!(summary.received >= 3);
}

/// Without request budget the REST workers stay idle; the stream still stores posts.
#[test]
fn hybrid_crawl_respects_empty_budgets() {
    let root = temp_root();
    let api = Arc::new(FakeApi {
        stream_posts: vec![to_post(post_json(1, "alice", "hello", &["tag"], &[]))],
        ..FakeApi::default()
    });
    let store = open(&root);

    let summary = Crawler::new(api.clone(), store.clone(), quick_opts(300)).run_hybrid();
    assert!(api.searches.lock().is_empty());
    assert!(api.timeline_calls.lock().is_empty());
    assert_eq!(summary.received, 1);
    assert_eq!(store.len(), 1);
}

/// Cancelling the stop signal ends a long crawl promptly.
#[test]
fn cancellation_ends_crawl_early() {
    let root = temp_root();
    let api = Arc::new(FakeApi::default());
    let crawler = Crawler::new(api, open(&root), quick_opts(60_000));
    let stop = crawler.stop_signal();

    let started = Instant::now();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        stop.cancel();
    });
    let summary = crawler.run_hybrid();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(summary.received, 0);
}

/// Each key enters the queue once per crawl, even after it was popped.
#[test]
fn dedup_queue_accepts_each_key_once() {
    let q = DedupQueue::new();
    assert!(q.push("covid".to_string()));
    assert!(!q.push("covid".to_string()));
    assert!(q.push("masks".to_string()));
    assert_eq!(q.len(), 2);

    assert_eq!(q.pop().as_deref(), Some("covid"));
    assert!(!q.push("covid".to_string()));
    assert_eq!(q.pop().as_deref(), Some("masks"));
    assert!(q.is_empty());
    assert_eq!(q.seen(), 2);
}

/// A cancelled signal cuts sleeps short and reports it.
#[test]
fn stop_signal_interrupts_sleep() {
    let s = StopSignal::new();
    assert!(s.sleep(Duration::from_millis(5)));
    let t = s.clone();
    t.cancel();
    let started = Instant::now();
    assert!(!s.sleep(Duration::from_secs(5)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

/// Local server that answers every connection with stream headers and then sends nothing.
fn silent_stream_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for conn in listener.incoming() {
            let Ok(mut conn) = conn else { continue };
            let mut buf = [0u8; 8192];
            let _ = conn.read(&mut buf);
            let _ = conn.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\n\r\n",
            );
            let _ = conn.flush();
            thread::spawn(move || {
                thread::sleep(Duration::from_secs(60));
                drop(conn);
            });
        }
    });
    format!("http://{}", addr)
}

fn silent_api(stall: Duration) -> HttpApi {
    let cfg = ApiConfig::default()
        .with_bearer_token("test-token")
        .with_stream_base(silent_stream_server())
        .with_stream_stall(stall);
    HttpApi::new(&cfg).unwrap()
}

/// A connected but silent stream does not hold the crawl past its time limit.
#[test]
fn silent_stream_does_not_outlive_crawl() {
    let root = temp_root();
    let api = Arc::new(silent_api(Duration::from_secs(90)));
    let store = open(&root);

    let started = Instant::now();
    let summary = Crawler::new(api, store.clone(), quick_opts(300)).run_sample();

    assert!(started.elapsed() < Duration::from_secs(3), "crawl took {:?}", started.elapsed());
    assert_eq!(summary.received, 0);
    assert!(store.is_empty());
}

/// A stream that sends nothing, keep-alives included, for the stall window is dropped with an error.
#[test]
fn stalled_stream_reports_error() {
    let api = silent_api(Duration::from_millis(300));
    let stop = StopSignal::new();
    let mut seen = 0;

    let started = Instant::now();
    let res = api.stream(&StreamFilter::default(), &stop, &mut |_: Post| {
        seen += 1;
        Ok(())
    });

    let err = res.unwrap_err();
    assert!(format!("{:#}", err).contains("stalled"), "unexpected error: {:#}", err);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(seen, 0);
}

/// Stream implementation that ignores the stop signal entirely.
struct DeafStream;

impl SocialApi for DeafStream {
    fn search(&self, _: &SearchQuery) -> Result<Vec<Post>> {
        Ok(Vec::new())
    }
    fn user_timeline(&self, _: u64, _: bool) -> Result<Vec<Post>> {
        Ok(Vec::new())
    }
    fn followers_ids(&self, _: u64) -> Result<Vec<u64>> {
        Ok(Vec::new())
    }
    fn friends_ids(&self, _: u64) -> Result<Vec<u64>> {
        Ok(Vec::new())
    }
    fn rate_limits(&self) -> Result<RateLimits> {
        Ok(RateLimits::default())
    }
    fn stream(&self, _: &StreamFilter, _: &StopSignal, _: &mut dyn FnMut(Post) -> Result<()>) -> Result<()> {
        thread::sleep(Duration::from_secs(30));
        Ok(())
    }
}

/// Workers still busy after the shutdown grace are left behind instead of awaited.
#[test]
fn crawl_ends_within_shutdown_grace() {
    let root = temp_root();
    let opts = quick_opts(200).with_shutdown_grace(Duration::from_millis(200));

    let started = Instant::now();
    Crawler::new(Arc::new(DeafStream), open(&root), opts.clone()).run_sample();
    assert!(started.elapsed() < Duration::from_secs(3));

    let started = Instant::now();
    Crawler::new(Arc::new(DeafStream), open(&temp_root()), opts).run_hybrid();
    assert!(started.elapsed() < Duration::from_secs(3));
}
