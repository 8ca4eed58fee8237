use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BEARER_TOKEN: &str = "POSTGRAPH_BEARER_TOKEN";
pub const ENV_API_BASE: &str = "POSTGRAPH_API_BASE";
pub const ENV_STREAM_BASE: &str = "POSTGRAPH_STREAM_BASE";

/// Geocodes for the location search probe: London, Geneva, Washington DC, Wuhan.
pub const DEFAULT_LOCATIONS: [&str; 4] = [
    "51.5287352,-0.3817825,100km",
    "46.204391,6.143158,100km",
    "38.907192,-77.036873,100km",
    "30.592850,114.305542,100km",
];

pub const DEFAULT_TRACK: [&str; 9] = [
    "coronavirus",
    "covid-19",
    "covid19",
    "SARS-COV-2",
    "SARS-COV2",
    "2019-nCov",
    "covid",
    "cov19",
    "SARSCov2",
];

/// HTTP endpoint settings. Credentials only ever come from the environment.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub bearer_token: Option<String>,
    pub api_base: String,
    pub stream_base: String,
    pub timeout_secs: u64,
    /// Page limit for paginated REST calls.
    pub max_pages: usize,
    /// Longest silence (no bytes, keep-alives included) tolerated on the stream.
    pub stream_stall: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            api_base: "https://api.twitter.com/1.1".to_string(),
            stream_base: "https://stream.twitter.com/1.1".to_string(),
            timeout_secs: 30,
            max_pages: 10,
            stream_stall: Duration::from_secs(90),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.bearer_token = std::env::var(ENV_BEARER_TOKEN).ok().filter(|t| !t.trim().is_empty());
        if let Ok(base) = std::env::var(ENV_API_BASE) {
            cfg.api_base = base;
        }
        if let Ok(base) = std::env::var(ENV_STREAM_BASE) {
            cfg.stream_base = base;
        }
        cfg
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages.max(1);
        self
    }
    pub fn with_stream_base(mut self, base: impl Into<String>) -> Self {
        self.stream_base = base.into();
        self
    }
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
    pub fn with_stream_stall(mut self, d: Duration) -> Self {
        self.stream_stall = d;
        self
    }
}

/// Crawler options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CrawlOptions {
    pub duration: Duration,
    /// Interval between rate-limit polls.
    pub poll_interval: Duration,
    /// How long a worker waits when it has no queued work or no budget.
    pub idle_backoff: Duration,
    /// Log every budget poll at info level.
    pub verbose: bool,
    pub locations: Vec<String>,
    pub geo_query: String,
    pub track: Vec<String>,
    pub languages: Vec<String>,
    /// Friends count above which an account is crawled.
    pub min_friends: usize,
    /// Follower count from which an account's friends are queued and its replies kept.
    pub big_account_followers: usize,
    /// How long a finished crawl waits for its threads before leaving them behind.
    pub shutdown_grace: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(60 * 60),
            poll_interval: Duration::from_secs(30),
            idle_backoff: Duration::from_millis(500),
            verbose: false,
            locations: DEFAULT_LOCATIONS.iter().map(|s| s.to_string()).collect(),
            geo_query: "covid".to_string(),
            track: DEFAULT_TRACK.iter().map(|s| s.to_string()).collect(),
            languages: vec!["en".to_string()],
            min_friends: 10,
            big_account_followers: 15_000,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl CrawlOptions {
    pub fn with_minutes(mut self, minutes: u64) -> Self {
        self.duration = Duration::from_secs(minutes * 60);
        self
    }
    pub fn with_duration(mut self, d: Duration) -> Self {
        self.duration = d;
        self
    }
    pub fn with_poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }
    pub fn with_idle_backoff(mut self, d: Duration) -> Self {
        self.idle_backoff = d;
        self
    }
    pub fn with_verbose(mut self, yes: bool) -> Self {
        self.verbose = yes;
        self
    }
    pub fn with_shutdown_grace(mut self, d: Duration) -> Self {
        self.shutdown_grace = d;
        self
    }
    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_geo_query(mut self, q: impl Into<String>) -> Self {
        self.geo_query = q.into();
        self
    }
    pub fn with_track<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.track = keywords.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }
}

/// Analysis options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct AnalysisOptions {
    pub results_dir: PathBuf,
    /// Largest cluster count tried by the topic search.
    pub max_topics: usize,
    pub top_items: usize,
    pub top_terms: usize,
    pub progress: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("./results"),
            max_topics: 100,
            top_items: 10,
            top_terms: 10,
            progress: true,
        }
    }
}

impl AnalysisOptions {
    pub fn with_results_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.results_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_max_topics(mut self, k: usize) -> Self {
        self.max_topics = k;
        self
    }
    pub fn with_top_items(mut self, n: usize) -> Self {
        self.top_items = n.max(1);
        self
    }
    pub fn with_top_terms(mut self, n: usize) -> Self {
        self.top_terms = n.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}
