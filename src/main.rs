use anyhow::Result;
use clap::{Parser, Subcommand};
use postgraph::{
    init_tracing_once, Analysis, AnalysisOptions, ApiConfig, Collection, CrawlOptions, Crawler, HttpApi,
    DEFAULT_COLLECTION,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "postgraph", about = "Crawl social posts and analyse their interaction networks")]
struct Cli {
    /// Directory holding the collections
    #[arg(long, global = true, env = "POSTGRAPH_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Log every rate-limit poll
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store the sample stream for a while.
    Stream {
        /// Collection to store posts in
        #[arg(long, short = 'c')]
        collection: String,
        /// How long to run, in minutes
        #[arg(long, short = 't', default_value_t = 60)]
        time: u64,
    },

    /// Keyword stream plus hashtag, location and user-timeline searches.
    Crawl {
        #[arg(long, short = 'c')]
        collection: String,
        #[arg(long, short = 't', default_value_t = 60)]
        time: u64,
        /// Seconds between rate-limit polls
        #[arg(long, default_value_t = 30)]
        poll_secs: u64,
    },

    /// Load a JSON / NDJSON / zstd dump (file or directory) into a collection.
    Import {
        #[arg(long, short = 'f')]
        file: PathBuf,
        #[arg(long, short = 'c', default_value = DEFAULT_COLLECTION)]
        collection: String,
    },

    /// Topics, sentiment, entity and network reports for a collection.
    Analyze {
        #[arg(long, short = 'c')]
        collection: String,
        /// Output directory for the report files
        #[arg(long, default_value = "./results")]
        results: PathBuf,
        /// Largest cluster count tried by the topic search
        #[arg(long, default_value_t = 100)]
        max_topics: usize,
    },
}

fn main() -> Result<()> {
    init_tracing_once();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stream { collection, time } => {
            let store = Arc::new(Collection::open(&cli.data_dir, &collection)?);
            let api = Arc::new(HttpApi::new(&ApiConfig::from_env())?);
            let opts = CrawlOptions::default().with_minutes(time).with_verbose(cli.verbose);
            let summary = Crawler::new(api, store, opts).run_sample();
            println!("{} posts were streamed into {}", summary.received, summary.collection);
        }
        Commands::Crawl { collection, time, poll_secs } => {
            let store = Arc::new(Collection::open(&cli.data_dir, &collection)?);
            let api = Arc::new(HttpApi::new(&ApiConfig::from_env())?);
            let opts = CrawlOptions::default()
                .with_minutes(time)
                .with_poll_interval(Duration::from_secs(poll_secs.max(1)))
                .with_verbose(cli.verbose);
            let summary = Crawler::new(api, store, opts).run_hybrid();
            println!(
                "{} posts were received into {}, {} duplicates",
                summary.received, summary.collection, summary.duplicates
            );
        }
        Commands::Import { file, collection } => {
            let store = Collection::open(&cli.data_dir, &collection)?;
            let s = store.import_path(&file, true)?;
            println!(
                "{} inserted, {} duplicates, {} skipped from {} files",
                s.inserted, s.duplicates, s.skipped, s.files
            );
        }
        Commands::Analyze { collection, results, max_topics } => {
            let store = Collection::open(&cli.data_dir, &collection)?;
            let opts = AnalysisOptions::default()
                .with_results_dir(&results)
                .with_max_topics(max_topics);
            let report = Analysis::new(&store).with_options(opts).run()?;
            println!(
                "{} topics, sentiment {}/{}/{} (negative/neutral/positive), {} files in {}",
                report.topics.len(),
                report.sentiment.negative,
                report.sentiment.neutral,
                report.sentiment.positive,
                report.files.len(),
                results.display()
            );
        }
    }

    Ok(())
}
