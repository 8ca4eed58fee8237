//! Social-media API seam.
//!
//! Crawler threads only talk to [`SocialApi`]; [`HttpApi`] is the blocking HTTP client
//! for the v1.1-style JSON endpoints (app-only bearer auth).

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::time::{Duration, Instant};

use crate::concurrency::spawn_worker;
use crate::config::ApiConfig;
use crate::crawl_state::StopSignal;
use crate::ndjson::NdjsonReader;
use crate::post::Post;

const SEARCH_PAGE: u32 = 100;
const TIMELINE_PAGE: u32 = 100;
const IDS_PAGE: u32 = 5000;
const STREAM_BUF: usize = 64 * 1024;
const STREAM_BACKLOG: usize = 1024;
/// Longest wait between stop-signal checks while the stream is quiet.
const STREAM_POLL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub q: String,
    pub lang: Option<String>,
    /// `"lat,long,radius"`, e.g. `"51.5287352,-0.3817825,100km"`.
    pub geocode: Option<String>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self { q: q.into(), ..Self::default() }
    }
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
    pub fn with_geocode(mut self, geocode: impl Into<String>) -> Self {
        self.geocode = Some(geocode.into());
        self
    }
}

/// Stream selection. No track keywords means the unfiltered sample stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamFilter {
    pub track: Vec<String>,
    pub languages: Vec<String>,
}

/// Requests left in the current window per endpoint family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimits {
    pub search: u64,
    pub user_timeline: u64,
    pub followers: u64,
    /// The rate-limit endpoint's own budget.
    pub rate_status: u64,
}

pub trait SocialApi: Send + Sync {
    fn search(&self, query: &SearchQuery) -> Result<Vec<Post>>;
    fn user_timeline(&self, user_id: u64, exclude_replies: bool) -> Result<Vec<Post>>;
    fn followers_ids(&self, user_id: u64) -> Result<Vec<u64>>;
    fn friends_ids(&self, user_id: u64) -> Result<Vec<u64>>;
    fn rate_limits(&self) -> Result<RateLimits>;
    /// Deliver stream posts to `on_post` until `stop` is cancelled, the server closes the
    /// connection, or `on_post` fails.
    fn stream(&self, filter: &StreamFilter, stop: &StopSignal, on_post: &mut dyn FnMut(Post) -> Result<()>) -> Result<()>;
}

pub struct HttpApi {
    client: Client,
    stream_client: Client,
    token: String,
    api_base: String,
    stream_base: String,
    max_pages: usize,
    stream_stall: Duration,
}

fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        bail!("{} returned {}: {}", what, status, body);
    }
    Ok(resp)
}

fn posts_of(items: &[Value]) -> Vec<Post> {
    items
        .iter()
        .filter_map(|v| match Post::from_value(v.clone()) {
            Ok(p) if p.has_key() => Some(p),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("skipping unparseable post: {}", e);
                None
            }
        })
        .collect()
}

impl HttpApi {
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let Some(token) = cfg.bearer_token.clone() else {
            bail!("no API credentials: set POSTGRAPH_BEARER_TOKEN");
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build HTTP client")?;
        let stream_client = Client::builder()
            .timeout(None::<Duration>)
            .connect_timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build stream client")?;
        Ok(Self {
            client,
            stream_client,
            token,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            stream_base: cfg.stream_base.trim_end_matches('/').to_string(),
            max_pages: cfg.max_pages.max(1),
            stream_stall: cfg.stream_stall,
        })
    }

    fn get(&self, endpoint: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/{}", self.api_base, endpoint))
            .bearer_auth(&self.token)
    }

    fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let resp = self
            .get(endpoint)
            .query(query)
            .send()
            .with_context(|| format!("GET {}", endpoint))?;
        let resp = check(resp, endpoint)?;
        resp.json::<Value>().with_context(|| format!("decode {}", endpoint))
    }

    /// Walk a `max_id`-paginated timeline endpoint; `statuses_of` picks the post array
    /// out of each page.
    fn paged_posts(
        &self,
        endpoint: &str,
        base_query: Vec<(&str, String)>,
        statuses_of: impl Fn(&Value) -> Option<&Vec<Value>>,
    ) -> Result<Vec<Post>> {
        let mut out = Vec::new();
        let mut max_id: Option<u64> = None;
        for _ in 0..self.max_pages {
            let mut query = base_query.clone();
            if let Some(id) = max_id {
                query.push(("max_id", id.to_string()));
            }
            let page = self.get_json(endpoint, &query)?;
            let Some(items) = statuses_of(&page) else { break };
            let posts = posts_of(items);
            if posts.is_empty() {
                break;
            }
            let oldest = posts.iter().map(|p| p.id).filter(|&id| id > 0).min();
            out.extend(posts);
            match oldest {
                Some(id) if id > 1 => max_id = Some(id - 1),
                _ => break,
            }
        }
        Ok(out)
    }

    fn paged_ids(&self, endpoint: &str, user_id: u64) -> Result<Vec<u64>> {
        let mut out = Vec::new();
        let mut cursor: i64 = -1;
        for _ in 0..self.max_pages {
            let page = self.get_json(
                endpoint,
                &[
                    ("user_id", user_id.to_string()),
                    ("cursor", cursor.to_string()),
                    ("count", IDS_PAGE.to_string()),
                ],
            )?;
            if let Some(ids) = page.get("ids").and_then(Value::as_array) {
                out.extend(ids.iter().filter_map(Value::as_u64));
            }
            cursor = page.get("next_cursor").and_then(Value::as_i64).unwrap_or(0);
            if cursor == 0 {
                break;
            }
        }
        Ok(out)
    }
}

enum StreamEvent {
    Connected,
    Line(String),
}

fn open_stream(req: RequestBuilder) -> Result<Response> {
    let resp = req.send().context("connect stream")?;
    if resp.status().as_u16() == 420 {
        bail!("stream rate limited (420), disconnecting");
    }
    check(resp, "stream")
}

/// Socket side of the stream: connect, then forward raw lines until the server closes
/// the connection or the receiving end is gone. Blocked reads are never interrupted, so
/// this thread is left to die with the process when the stream goes quiet.
fn read_stream(req: RequestBuilder, tx: SyncSender<Result<StreamEvent>>) {
    let resp = match open_stream(req) {
        Ok(resp) => resp,
        Err(e) => {
            let _ = tx.send(Err(e));
            return;
        }
    };
    if tx.send(Ok(StreamEvent::Connected)).is_err() {
        return;
    }
    let mut rdr = NdjsonReader::new(resp, STREAM_BUF);
    loop {
        let mut line = String::new();
        let event = match rdr.read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => Ok(StreamEvent::Line(line)),
            Err(e) => Err(anyhow::Error::new(e).context("read stream")),
        };
        let failed = event.is_err();
        if tx.send(event).is_err() || failed {
            return;
        }
    }
}

fn remaining(limits: &Value, pointer: &str) -> u64 {
    limits.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}

impl SocialApi for HttpApi {
    fn search(&self, query: &SearchQuery) -> Result<Vec<Post>> {
        let mut q = vec![
            ("q", query.q.clone()),
            ("count", SEARCH_PAGE.to_string()),
            ("tweet_mode", "extended".to_string()),
        ];
        if let Some(lang) = &query.lang {
            q.push(("lang", lang.clone()));
        }
        if let Some(geo) = &query.geocode {
            q.push(("geocode", geo.clone()));
        }
        self.paged_posts("search/tweets.json", q, |page| page.get("statuses").and_then(Value::as_array))
    }

    fn user_timeline(&self, user_id: u64, exclude_replies: bool) -> Result<Vec<Post>> {
        let q = vec![
            ("user_id", user_id.to_string()),
            ("count", TIMELINE_PAGE.to_string()),
            ("include_entities", "true".to_string()),
            ("exclude_replies", exclude_replies.to_string()),
            ("tweet_mode", "extended".to_string()),
        ];
        self.paged_posts("statuses/user_timeline.json", q, Value::as_array)
    }

    fn followers_ids(&self, user_id: u64) -> Result<Vec<u64>> {
        self.paged_ids("followers/ids.json", user_id)
    }

    fn friends_ids(&self, user_id: u64) -> Result<Vec<u64>> {
        self.paged_ids("friends/ids.json", user_id)
    }

    fn rate_limits(&self) -> Result<RateLimits> {
        let v = self.get_json(
            "application/rate_limit_status.json",
            &[("resources", "application,statuses,followers,search".to_string())],
        )?;
        Ok(RateLimits {
            search: remaining(&v, "/resources/search/~1search~1tweets/remaining"),
            user_timeline: remaining(&v, "/resources/statuses/~1statuses~1user_timeline/remaining"),
            followers: remaining(&v, "/resources/followers/~1followers~1ids/remaining"),
            rate_status: remaining(&v, "/resources/application/~1application~1rate_limit_status/remaining"),
        })
    }

    fn stream(&self, filter: &StreamFilter, stop: &StopSignal, on_post: &mut dyn FnMut(Post) -> Result<()>) -> Result<()> {
        let languages = filter.languages.join(",");
        let req = if filter.track.is_empty() {
            let mut q = Vec::new();
            if !languages.is_empty() {
                q.push(("language", languages));
            }
            self.stream_client
                .get(format!("{}/statuses/sample.json", self.stream_base))
                .query(&q)
        } else {
            let mut form = vec![("track", filter.track.join(","))];
            if !languages.is_empty() {
                form.push(("language", languages));
            }
            self.stream_client
                .post(format!("{}/statuses/filter.json", self.stream_base))
                .form(&form)
        };
        let req = req.bearer_auth(&self.token);

        let (tx, rx) = mpsc::sync_channel(STREAM_BACKLOG);
        if spawn_worker("stream-reader", move || read_stream(req, tx)).is_none() {
            bail!("could not launch the stream reader");
        }

        let mut last_seen = Instant::now();
        loop {
            if stop.is_cancelled() {
                tracing::info!("disconnecting stream");
                break;
            }
            let line = match rx.recv_timeout(STREAM_POLL) {
                Ok(event) => {
                    last_seen = Instant::now();
                    match event? {
                        StreamEvent::Connected => {
                            tracing::info!("stream connected");
                            continue;
                        }
                        StreamEvent::Line(line) => line,
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if last_seen.elapsed() >= self.stream_stall {
                        bail!("stream stalled: nothing received for {:?}", self.stream_stall);
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("stream closed by server");
                    break;
                }
            };
            // keep-alive
            if line.trim().is_empty() {
                continue;
            }
            match Post::from_line(&line) {
                Ok(post) if post.has_key() => on_post(post)?,
                // delete notices, limit notices and the like
                Ok(_) => tracing::debug!("stream notice: {}", line),
                Err(e) => tracing::warn!("unparseable stream message: {}", e),
            }
        }
        Ok(())
    }
}
