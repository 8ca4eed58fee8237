mod config;
mod post;
mod text;

mod filters;
mod progress;
mod concurrency;
mod counting;
mod util;

mod entities;
mod interaction;
mod graph;
mod stats;
mod sentiment;
mod topics;

mod ndjson;
mod dump;
mod store;

mod api;
mod queue;
mod crawl_state;
mod crawler;
mod report;

pub use crate::config::{AnalysisOptions, ApiConfig, CrawlOptions, DEFAULT_LOCATIONS, DEFAULT_TRACK};
pub use crate::post::{parse_created_at, Entities, ExtendedBody, Hashtag, Mention, Post, User};
pub use crate::text::{clean_text, is_stopword, normalize, tokenize};

pub use crate::filters::SentimentFilter;
pub use crate::counting::{tally, tally_pair, top_n, top_n_items, CountMap, Tally};

pub use crate::entities::{average_char_count, count_post_kinds, extract_top_entities, PostKindCounts, TopEntities};
pub use crate::interaction::{hashtag_interaction, user_interaction, UserNetworks};
pub use crate::graph::{InteractionGraph, NetworkSummary};
pub use crate::stats::{hashtag_network_statistics, user_network_statistics, HashtagStats, UserStats};
pub use crate::sentiment::{sentiment_analysis, LexiconScorer, PolarityScorer, Sentiment, SentimentCounts};
pub use crate::topics::{find_optimal_k, topic_extraction, topic_extraction_with, KMeans, KMeansFit, SparseRow, TfIdfMatrix, TfIdfVectorizer};

// Expose progress helpers.
pub use crate::progress::{make_count_progress, ProgressScope};

//export robust file ops from util so binaries can import from crate root.
pub use crate::util::{init_tracing_once, open_with_backoff, create_with_backoff, remove_with_backoff, replace_file_atomic};

// export NDJSON helpers
pub use crate::ndjson::{NdjsonReader, NdjsonWriter};

pub use crate::dump::{dump_files, read_dump, DumpFormat};
pub use crate::store::{Collection, ImportSummary, InsertOutcome, DEFAULT_COLLECTION};

pub use crate::api::{HttpApi, RateLimits, SearchQuery, SocialApi, StreamFilter};
pub use crate::queue::DedupQueue;
pub use crate::crawl_state::{CrawlCounts, CrawlState, RateBudget, StopSignal};
pub use crate::concurrency::{join_all, join_within, spawn_worker};
pub use crate::crawler::{CrawlSummary, Crawler};
pub use crate::report::{sentiment_chart, Analysis, AnalysisReport};
