//! File-backed document collections.
//!
//! A collection is one NDJSON file under the data root, `<root>/<name>.jsonl`, with the
//! record keys held in memory so duplicate inserts are refused without touching disk.
//! Updates rewrite the file through a temp file and an atomic replace.

use ahash::{AHashMap, AHashSet};
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::dump::{dump_files, read_dump};
use crate::filters::SentimentFilter;
use crate::ndjson::{NdjsonReader, NdjsonWriter};
use crate::post::Post;
use crate::progress::ProgressScope;
use crate::sentiment::Sentiment;
use crate::util::{open_with_backoff, remove_with_backoff};

pub const DEFAULT_COLLECTION: &str = "sample_tweets";

const READ_BUF: usize = 256 * 1024;
const WRITE_BUF: usize = 64 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files: u64,
    pub inserted: u64,
    pub duplicates: u64,
    /// Malformed lines plus documents that are not posts.
    pub skipped: u64,
}

/// Just enough of a stored line to rebuild the key index.
#[derive(Deserialize)]
struct KeyOnly {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    id_str: Option<String>,
}

impl KeyOnly {
    fn key(self) -> String {
        match self.id_str {
            Some(s) if !s.is_empty() => s,
            _ => self.id.to_string(),
        }
    }
}

fn value_key(v: &Value) -> Option<String> {
    match v.get("id_str").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Some(s.to_string()),
        _ => v.get("id").and_then(Value::as_u64).map(|id| id.to_string()),
    }
}

/// Whether `path` is missing, empty, or ends with a newline.
fn ends_cleanly(path: &Path) -> io::Result<bool> {
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e),
    };
    if f.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    f.seek(SeekFrom::End(-1))?;
    f.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

struct Inner {
    keys: AHashSet<String>,
    writer: Option<NdjsonWriter>,
}

pub struct Collection {
    name: String,
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl Collection {
    /// Open (or start) the collection `name` under `root`, loading its key index.
    pub fn open(root: impl AsRef<Path>, name: &str) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).with_context(|| format!("create data dir {}", root.display()))?;
        let path = root.join(format!("{}.jsonl", name));

        let mut keys = AHashSet::new();
        if path.exists() {
            let mut bad = 0u64;
            let mut rdr = NdjsonReader::open(&path, READ_BUF).with_context(|| format!("open {}", path.display()))?;
            rdr.for_each_line(|line| {
                match serde_json::from_str::<KeyOnly>(line) {
                    Ok(k) => {
                        keys.insert(k.key());
                    }
                    Err(_) => bad += 1,
                }
                Ok(())
            })?;
            if bad > 0 {
                tracing::warn!("{}: {} unreadable records ignored", path.display(), bad);
            }
        }
        tracing::debug!("opened collection {} ({} records)", name, keys.len());

        Ok(Self {
            name: name.to_string(),
            path,
            inner: Mutex::new(Inner { keys, writer: None }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct records.
    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().keys.contains(key)
    }

    /// Append `post` unless a record with its key is already stored.
    pub fn insert(&self, post: &Post) -> Result<InsertOutcome> {
        let key = post.key();
        let mut inner = self.inner.lock();
        if inner.keys.contains(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        let mut w = match inner.writer.take() {
            Some(w) => w,
            None => self.open_appender()?,
        };
        // on failure the writer is dropped, so the next insert reopens and repairs the tail
        w.write_json(post)?;
        w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        inner.writer = Some(w);
        inner.keys.insert(key);
        Ok(InsertOutcome::Inserted)
    }

    fn open_appender(&self) -> Result<NdjsonWriter> {
        let mut w = NdjsonWriter::append(&self.path, WRITE_BUF)
            .with_context(|| format!("open {} for append", self.path.display()))?;
        if !ends_cleanly(&self.path).with_context(|| format!("inspect {}", self.path.display()))? {
            tracing::warn!(path=%self.path.display(), "closing torn last record");
            w.write_line("")?;
        }
        Ok(w)
    }

    /// Visit every stored post passing `filter`. Unreadable lines are skipped.
    ///
    /// Sees the records stored when the call starts. `on_post` runs without the
    /// collection lock held, so it may insert into this same collection.
    pub fn for_each(&self, filter: SentimentFilter, mut on_post: impl FnMut(Post) -> Result<()>) -> Result<()> {
        // inserts flush whole lines under the lock, so this length ends on a record boundary
        let snapshot = {
            let _guard = self.inner.lock();
            if !self.path.exists() {
                return Ok(());
            }
            let file = open_with_backoff(&self.path).with_context(|| format!("open {}", self.path.display()))?;
            let len = file.metadata().with_context(|| format!("stat {}", self.path.display()))?.len();
            file.take(len)
        };
        let mut rdr = NdjsonReader::new(snapshot, READ_BUF);
        let mut line_no = 0u64;
        rdr.for_each_line(|line| {
            line_no += 1;
            match Post::from_line(line) {
                Ok(post) if filter.matches(&post) => on_post(post),
                Ok(_) => Ok(()),
                Err(e) => {
                    tracing::warn!(path=%self.path.display(), line=line_no, error=%e, "skipping unreadable record");
                    Ok(())
                }
            }
        })
    }

    pub fn load(&self, filter: SentimentFilter) -> Result<Vec<Post>> {
        let mut out = Vec::new();
        self.for_each(filter, |p| {
            out.push(p);
            Ok(())
        })?;
        Ok(out)
    }

    pub fn count(&self, filter: SentimentFilter) -> Result<u64> {
        let mut n = 0u64;
        self.for_each(filter, |_| {
            n += 1;
            Ok(())
        })?;
        Ok(n)
    }

    /// Attach a sentiment label to each keyed record. Fails, leaving the collection
    /// untouched, unless every labelled key matched a stored record.
    pub fn set_sentiments(&self, labels: &[(String, Sentiment)]) -> Result<usize> {
        let wanted: AHashMap<&str, i8> = labels.iter().map(|(k, s)| (k.as_str(), s.as_i8())).collect();

        let mut inner = self.inner.lock();
        if let Some(w) = inner.writer.take() {
            w.finish().with_context(|| format!("flush {}", self.path.display()))?;
        }
        if wanted.is_empty() {
            return Ok(0);
        }
        if !self.path.exists() {
            bail!("collection {} is empty; {} labels have no record", self.name, wanted.len());
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        let mut out = NdjsonWriter::create(&tmp, WRITE_BUF).with_context(|| format!("create {}", tmp.display()))?;
        let mut updated: AHashSet<&str> = AHashSet::new();
        let mut rdr = NdjsonReader::open(&self.path, READ_BUF).with_context(|| format!("open {}", self.path.display()))?;
        rdr.for_each_line(|line| {
            let Ok(mut v) = serde_json::from_str::<Value>(line) else {
                // keep unreadable lines as they are
                out.write_line(line)?;
                return Ok(());
            };
            if let Some(key) = value_key(&v) {
                if let Some((&k, &label)) = wanted.get_key_value(key.as_str()) {
                    if let Some(obj) = v.as_object_mut() {
                        obj.insert("sentiment".to_string(), Value::from(label));
                        updated.insert(k);
                    }
                }
            }
            out.write_json(&v)
        })?;

        if updated.len() != wanted.len() {
            drop(out);
            remove_with_backoff(&tmp)?;
            bail!(
                "sentiment update matched {} of {} labelled records in {}",
                updated.len(),
                wanted.len(),
                self.name
            );
        }
        tracing::debug!(lines = out.lines(), path=%tmp.display(), "sentiment rewrite complete");
        out.finish_atomic(&self.path)?;
        tracing::info!("stored {} sentiment labels in {}", updated.len(), self.name);
        Ok(updated.len())
    }

    /// Import a dump file, or every dump file below a directory.
    pub fn import_path(&self, path: impl AsRef<Path>, progress: bool) -> Result<ImportSummary> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("import source {} does not exist", path.display());
        }
        let files = dump_files(path)?;
        let mut summary = ImportSummary::default();
        let pb = progress.then(|| ProgressScope::count(format!("import {}", self.name), files.len() as u64));

        for file in &files {
            let skipped = read_dump(file, READ_BUF, |v| {
                match Post::from_value(v) {
                    Ok(post) if post.has_key() => match self.insert(&post)? {
                        InsertOutcome::Inserted => summary.inserted += 1,
                        InsertOutcome::Duplicate => summary.duplicates += 1,
                    },
                    Ok(_) => {
                        tracing::debug!("{}: document without an id", file.display());
                        summary.skipped += 1;
                    }
                    Err(e) => {
                        tracing::debug!("{}: not a post: {}", file.display(), e);
                        summary.skipped += 1;
                    }
                }
                Ok(())
            })?;
            summary.skipped += skipped;
            summary.files += 1;
            if let Some(pb) = &pb {
                pb.inc_items(1);
            }
        }

        if let Some(pb) = &pb {
            pb.finish(format!("{} inserted", summary.inserted));
        }
        tracing::info!(
            "imported {} files into {}: {} inserted, {} duplicates, {} skipped",
            summary.files,
            self.name,
            summary.inserted,
            summary.duplicates,
            summary.skipped
        );
        Ok(summary)
    }
}
