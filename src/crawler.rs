//! Sample and hybrid crawlers.
//!
//! The hybrid crawl runs the keyword stream plus three REST workers (hashtag search,
//! location search, user timelines) that share two deduplicating queues and a request
//! budget table. The calling thread polls the budgets until the deadline, then cancels
//! and joins everything.

use rand::seq::IndexedRandom;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

use crate::api::{SearchQuery, SocialApi, StreamFilter};
use crate::concurrency::{join_within, spawn_worker};
use crate::config::CrawlOptions;
use crate::crawl_state::{CrawlState, RateBudget, StopSignal};
use crate::post::Post;
use crate::queue::DedupQueue;
use crate::store::{Collection, InsertOutcome};

#[derive(Clone, Debug)]
pub struct CrawlSummary {
    pub collection: String,
    pub started: OffsetDateTime,
    pub ended: OffsetDateTime,
    /// Posts handed to the store, duplicates included.
    pub received: u64,
    pub duplicates: u64,
    /// Distinct hashtags and users queued during the crawl.
    pub hashtags_seen: usize,
    pub users_seen: usize,
}

struct Shared {
    api: Arc<dyn SocialApi>,
    store: Arc<Collection>,
    opts: CrawlOptions,
    state: CrawlState,
    budget: RateBudget,
    hashtags: DedupQueue<String>,
    users: DedupQueue<u64>,
    stop: StopSignal,
}

impl Shared {
    fn ingest(&self, mut post: Post) {
        post.stamp_timestamp();
        match self.store.insert(&post) {
            Ok(InsertOutcome::Inserted) => self.state.record(false),
            Ok(InsertOutcome::Duplicate) => self.state.record(true),
            Err(e) => tracing::warn!(key=%post.key(), error=%format!("{:#}", e), "failed to store post"),
        }
    }

    fn ingest_all(&self, posts: Vec<Post>) {
        for p in posts {
            self.ingest(p);
        }
    }

    /// Queue the author and every hashtag of a streamed post.
    fn harvest(&self, post: &Post) {
        if post.user.id != 0 {
            self.users.push(post.user.id);
        }
        for h in &post.entities.hashtags {
            self.hashtags.push(h.text.to_lowercase());
        }
    }

    fn lang(&self) -> Option<&str> {
        self.opts.languages.first().map(String::as_str)
    }

    fn idle(&self) -> bool {
        self.stop.sleep(self.opts.idle_backoff)
    }
}

/// Crawler over one API and one collection. Use `run_sample` or `run_hybrid`.
pub struct Crawler {
    shared: Arc<Shared>,
}

impl Crawler {
    pub fn new(api: Arc<dyn SocialApi>, store: Arc<Collection>, opts: CrawlOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                store,
                opts,
                state: CrawlState::default(),
                budget: RateBudget::default(),
                hashtags: DedupQueue::new(),
                users: DedupQueue::new(),
                stop: StopSignal::new(),
            }),
        }
    }

    /// Token that ends the crawl early when cancelled.
    pub fn stop_signal(&self) -> StopSignal {
        self.shared.stop.clone()
    }

    /// Store the unfiltered sample stream for the configured duration.
    pub fn run_sample(&self) -> CrawlSummary {
        let started = OffsetDateTime::now_utc();
        let sh = &self.shared;
        tracing::info!(
            "streaming sample posts into {} for {} minutes",
            sh.store.name(),
            minutes(sh.opts.duration)
        );

        let filter = StreamFilter { track: Vec::new(), languages: sh.opts.languages.clone() };
        let handles: Vec<_> = spawn_stream(sh.clone(), filter, false).into_iter().collect();

        sh.stop.sleep(sh.opts.duration);
        sh.stop.cancel();
        join_within(handles, sh.opts.shutdown_grace);
        self.summary(started)
    }

    /// Keyword stream plus the three REST workers, with budget polling on this thread.
    pub fn run_hybrid(&self) -> CrawlSummary {
        let started = OffsetDateTime::now_utc();
        let sh = &self.shared;
        let deadline = Instant::now() + sh.opts.duration;
        tracing::info!(
            "looking for posts until {} ({} minutes) into {}",
            started + sh.opts.duration,
            minutes(sh.opts.duration),
            sh.store.name()
        );

        let filter = StreamFilter { track: sh.opts.track.clone(), languages: sh.opts.languages.clone() };
        let mut handles = Vec::new();
        handles.extend(spawn_stream(sh.clone(), filter, true));
        let workers: [(&str, fn(&Shared)); 3] = [
            ("hashtag", hashtag_worker),
            ("location", location_worker),
            ("user", user_worker),
        ];
        for (name, work) in workers {
            let shared = sh.clone();
            handles.extend(spawn_worker(name, move || work(&shared)));
        }

        loop {
            poll_budget(sh);
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if !sh.stop.sleep(sh.opts.poll_interval.min(deadline - now)) {
                break;
            }
        }

        sh.stop.cancel();
        join_within(handles, sh.opts.shutdown_grace);
        self.summary(started)
    }

    fn summary(&self, started: OffsetDateTime) -> CrawlSummary {
        let counts = self.shared.state.snapshot();
        let summary = CrawlSummary {
            collection: self.shared.store.name().to_string(),
            started,
            ended: OffsetDateTime::now_utc(),
            received: counts.received,
            duplicates: counts.duplicates,
            hashtags_seen: self.shared.hashtags.seen(),
            users_seen: self.shared.users.seen(),
        };
        tracing::info!(
            "{} posts were received from {} to {} in {}",
            summary.received,
            summary.started,
            summary.ended,
            summary.collection
        );
        tracing::info!("{} duplicates were detected", summary.duplicates);
        summary
    }
}

fn spawn_stream(sh: Arc<Shared>, filter: StreamFilter, harvest: bool) -> Option<std::thread::JoinHandle<()>> {
    spawn_worker("stream", move || {
        let res = sh.api.stream(&filter, &sh.stop, &mut |post: Post| {
            if harvest {
                sh.harvest(&post);
            }
            sh.ingest(post);
            Ok(())
        });
        if let Err(e) = res {
            tracing::warn!("stream ended: {:#}", e);
        }
    })
}

fn poll_budget(sh: &Shared) {
    match sh.api.rate_limits() {
        Ok(limits) => {
            sh.budget.update(&limits);
            if sh.opts.verbose {
                tracing::info!(
                    "requests left: rates {}, timeline {}, followers {}, search {}",
                    limits.rate_status,
                    limits.user_timeline,
                    limits.followers,
                    limits.search
                );
            } else {
                tracing::debug!("budgets refreshed: {:?}", limits);
            }
        }
        Err(e) => tracing::warn!("rate limit poll failed: {:#}", e),
    }
}

fn hashtag_worker(sh: &Shared) {
    while !sh.stop.is_cancelled() {
        if sh.budget.search() > 0 {
            if let Some(tag) = sh.hashtags.pop() {
                let mut q = SearchQuery::new(tag.as_str());
                if let Some(lang) = sh.lang() {
                    q = q.with_lang(lang);
                }
                match sh.api.search(&q) {
                    Ok(posts) => {
                        tracing::debug!("hashtag {}: {} posts", tag, posts.len());
                        sh.ingest_all(posts);
                    }
                    Err(e) => tracing::warn!(tag=%tag, error=%format!("{:#}", e), "hashtag search failed"),
                }
                continue;
            }
        }
        if !sh.idle() {
            break;
        }
    }
}

fn location_worker(sh: &Shared) {
    while !sh.stop.is_cancelled() {
        if sh.budget.search() > 0 {
            if let Some(geocode) = sh.opts.locations.choose(&mut rand::rng()) {
                let mut q = SearchQuery::new(sh.opts.geo_query.as_str()).with_geocode(geocode.as_str());
                if let Some(lang) = sh.lang() {
                    q = q.with_lang(lang);
                }
                match sh.api.search(&q) {
                    Ok(posts) => {
                        tracing::debug!("location {}: {} posts", geocode, posts.len());
                        sh.ingest_all(posts);
                    }
                    Err(e) => tracing::warn!(geocode=%geocode, error=%format!("{:#}", e), "location search failed"),
                }
            }
        }
        if !sh.idle() {
            break;
        }
    }
}

/// Followers/friends probe for one account: `(legit, exclude_replies)`. Without a
/// followers budget the account is not crawled.
fn probe_network(sh: &Shared, user_id: u64) -> anyhow::Result<(bool, bool)> {
    if sh.budget.followers() == 0 {
        return Ok((false, true));
    }
    let followers = sh.api.followers_ids(user_id)?;
    let friends = sh.api.friends_ids(user_id)?;
    let legit = friends.len() > sh.opts.min_friends;

    if followers.len() >= sh.opts.big_account_followers {
        for friend in friends {
            sh.users.push(friend);
        }
        Ok((legit, false))
    } else {
        Ok((legit, true))
    }
}

fn user_worker(sh: &Shared) {
    while !sh.stop.is_cancelled() {
        if sh.budget.user_timeline() > 0 {
            if let Some(user_id) = sh.users.pop() {
                match probe_network(sh, user_id) {
                    Ok((true, exclude_replies)) => match sh.api.user_timeline(user_id, exclude_replies) {
                        Ok(posts) => {
                            tracing::debug!("user {}: {} posts", user_id, posts.len());
                            sh.ingest_all(posts);
                        }
                        Err(e) => tracing::warn!("timeline of {} failed: {:#}", user_id, e),
                    },
                    Ok((false, _)) => tracing::debug!("user {} skipped", user_id),
                    Err(e) => tracing::warn!("network probe of {} failed: {:#}", user_id, e),
                }
                continue;
            }
        }
        if !sh.idle() {
            break;
        }
    }
}

fn minutes(d: Duration) -> u64 {
    d.as_secs() / 60
}
