//! Topic job: TF-IDF vectors over the normalized corpus, a K search over even cluster
//! counts, and the top terms of each cluster.

use ahash::AHashMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::post::Post;
use crate::text::normalize;

/// Sparse, l2-normalised document row: `(term index, weight)` sorted by index.
pub type SparseRow = Vec<(usize, f64)>;

pub const KMEANS_SEED: u64 = 2211;
const TERMS_PER_CLUSTER: usize = 10;

#[derive(Clone, Debug)]
pub struct TfIdfVectorizer {
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// Maximum share of documents a term may appear in.
    pub max_df: f64,
    pub max_features: usize,
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self { min_df: 5, max_df: 0.95, max_features: 8000 }
    }
}

/// Fitted vocabulary plus the document rows it produced.
#[derive(Clone, Debug, Default)]
pub struct TfIdfMatrix {
    /// Alphabetical; a row index refers into this list.
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    pub rows: Vec<SparseRow>,
}

fn terms(doc: &str) -> impl Iterator<Item = &str> {
    doc.split_whitespace().filter(|t| t.chars().count() >= 2)
}

impl TfIdfVectorizer {
    pub fn with_min_df(mut self, n: usize) -> Self {
        self.min_df = n;
        self
    }
    pub fn with_max_df(mut self, share: f64) -> Self {
        self.max_df = share;
        self
    }
    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = n;
        self
    }

    pub fn fit_transform<S: AsRef<str>>(&self, docs: &[S]) -> TfIdfMatrix {
        let n_docs = docs.len();
        let mut df: AHashMap<&str, usize> = AHashMap::new();
        let mut tf: AHashMap<&str, u64> = AHashMap::new();
        for doc in docs {
            let mut seen: Vec<&str> = terms(doc.as_ref()).collect();
            for &t in &seen {
                *tf.entry(t).or_insert(0) += 1;
            }
            seen.sort_unstable();
            seen.dedup();
            for t in seen {
                *df.entry(t).or_insert(0) += 1;
            }
        }

        let max_docs = self.max_df * n_docs as f64;
        let mut kept: Vec<(&str, u64)> = df
            .iter()
            .filter(|(_, d)| **d >= self.min_df && **d as f64 <= max_docs)
            .map(|(t, _)| (*t, tf.get(t).copied().unwrap_or(0)))
            .collect();
        if kept.len() > self.max_features {
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            kept.truncate(self.max_features);
        }
        let mut vocabulary: Vec<String> = kept.into_iter().map(|(t, _)| t.to_string()).collect();
        vocabulary.sort();

        let index: AHashMap<&str, usize> = vocabulary.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();
        let idf: Vec<f64> = vocabulary
            .iter()
            .map(|t| {
                let d = df.get(t.as_str()).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs as f64) / (1.0 + d)).ln() + 1.0
            })
            .collect();

        let rows = docs
            .iter()
            .map(|doc| {
                let mut counts: AHashMap<usize, f64> = AHashMap::new();
                for t in terms(doc.as_ref()) {
                    if let Some(&i) = index.get(t) {
                        *counts.entry(i).or_insert(0.0) += 1.0;
                    }
                }
                let mut row: SparseRow = counts.into_iter().map(|(i, c)| (i, c * idf[i])).collect();
                row.sort_by_key(|&(i, _)| i);
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in row.iter_mut() {
                        *w /= norm;
                    }
                }
                row
            })
            .collect();

        TfIdfMatrix { vocabulary, idf, rows }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct KMeans {
    pub k: usize,
    pub max_iter: usize,
    pub seed: u64,
}

#[derive(Clone, Debug)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances of each row to its centroid.
    pub inertia: f64,
}

fn sq_norm(row: &SparseRow) -> f64 {
    row.iter().map(|(_, w)| w * w).sum()
}

/// Squared euclidean distance between a sparse row and a dense centroid.
fn sq_distance(row: &SparseRow, row_norm: f64, centroid: &[f64], centroid_norm: f64) -> f64 {
    let dot: f64 = row.iter().map(|&(i, w)| w * centroid[i]).sum();
    (row_norm - 2.0 * dot + centroid_norm).max(0.0)
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self { k, max_iter: 100, seed: KMEANS_SEED }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Lloyd iterations from `k` distinct rows picked by the seeded shuffle. Requires
    /// `1 <= k <= rows.len()`; an empty cluster keeps its previous centroid.
    pub fn fit(&self, rows: &[SparseRow], dim: usize) -> KMeansFit {
        let k = self.k.clamp(1, rows.len().max(1));
        let mut order: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        let mut centroids: Vec<Vec<f64>> = order
            .iter()
            .take(k)
            .map(|&r| {
                let mut c = vec![0.0; dim];
                for &(i, w) in &rows[r] {
                    c[i] = w;
                }
                c
            })
            .collect();
        while centroids.len() < k {
            centroids.push(vec![0.0; dim]);
        }

        let row_norms: Vec<f64> = rows.iter().map(sq_norm).collect();
        let mut labels = vec![usize::MAX; rows.len()];
        let mut inertia = 0.0f64;

        for _ in 0..self.max_iter.max(1) {
            let centroid_norms: Vec<f64> = centroids.iter().map(|c| c.iter().map(|x| x * x).sum::<f64>()).collect();
            let assigned: Vec<(usize, f64)> = rows
                .par_iter()
                .zip(row_norms.par_iter())
                .map(|(row, &rn)| {
                    let mut best = (0usize, f64::INFINITY);
                    for (j, c) in centroids.iter().enumerate() {
                        let d = sq_distance(row, rn, c, centroid_norms[j]);
                        if d < best.1 {
                            best = (j, d);
                        }
                    }
                    best
                })
                .collect();

            let changed = assigned.iter().zip(&labels).any(|((j, _), l)| j != l);
            inertia = assigned.iter().map(|(_, d)| d).sum::<f64>();
            for (l, (j, _)) in labels.iter_mut().zip(&assigned) {
                *l = *j;
            }
            if !changed {
                break;
            }

            let mut sums = vec![vec![0.0; dim]; k];
            let mut sizes = vec![0usize; k];
            for (row, &j) in rows.iter().zip(&labels) {
                sizes[j] += 1;
                for &(i, w) in row {
                    sums[j][i] += w;
                }
            }
            for (j, sum) in sums.into_iter().enumerate() {
                if sizes[j] > 0 {
                    centroids[j] = sum.into_iter().map(|x| x / sizes[j] as f64).collect();
                }
            }
        }

        KMeansFit { labels, centroids, inertia }
    }
}

/// Try k = 2, 4, … up to `max_k` (and the row count) and return the k with the lowest
/// inertia; the smaller k wins a tie. 0 when no k is feasible.
pub fn find_optimal_k(rows: &[SparseRow], dim: usize, max_k: usize) -> usize {
    let candidates: Vec<usize> = (2..=max_k).step_by(2).filter(|&k| k <= rows.len()).collect();
    let inertias: Vec<(usize, f64)> = candidates
        .par_iter()
        .map(|&k| (k, KMeans::new(k).fit(rows, dim).inertia))
        .collect();

    let mut best = (0usize, f64::INFINITY);
    for (k, sse) in inertias {
        if sse < best.1 {
            best = (k, sse);
            tracing::info!("Found new optimal K: {}", k);
        }
    }
    best.0
}

/// Cluster the posts' normalized text and describe each non-empty cluster by the ten
/// terms with the highest mean weight, highest first. Terms absent from a cluster are
/// never listed for it.
pub fn topic_extraction(posts: &[Post], max_k: usize) -> Vec<String> {
    topic_extraction_with(posts, max_k, &TfIdfVectorizer::default())
}

pub fn topic_extraction_with(posts: &[Post], max_k: usize, vectorizer: &TfIdfVectorizer) -> Vec<String> {
    let corpus: Vec<String> = posts.par_iter().map(|p| normalize(p.body_text())).collect();
    let m = vectorizer.fit_transform(&corpus);
    let dim = m.vocabulary.len();
    if dim == 0 {
        tracing::warn!("topic extraction: empty vocabulary over {} posts", posts.len());
        return Vec::new();
    }

    let k = find_optimal_k(&m.rows, dim, max_k);
    if k == 0 {
        tracing::warn!("topic extraction: too few posts ({}) to cluster", posts.len());
        return Vec::new();
    }
    let fit = KMeans::new(k).fit(&m.rows, dim);

    let mut sums = vec![vec![0.0; dim]; k];
    let mut sizes = vec![0usize; k];
    for (row, &j) in m.rows.iter().zip(&fit.labels) {
        sizes[j] += 1;
        for &(i, w) in row {
            sums[j][i] += w;
        }
    }

    let mut out = Vec::new();
    for (j, sum) in sums.into_iter().enumerate() {
        if sizes[j] == 0 {
            continue;
        }
        let mut ranked: Vec<(usize, f64)> = sum.into_iter().map(|s| s / sizes[j] as f64).enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| m.vocabulary[a.0].cmp(&m.vocabulary[b.0])));
        let top: Vec<&str> = ranked
            .iter()
            .filter(|&&(_, w)| w > 0.0)
            .take(TERMS_PER_CLUSTER)
            .map(|&(i, _)| m.vocabulary[i].as_str())
            .collect();
        out.push(format!("Cluster {}: {}", j, top.join(", ")));
    }
    tracing::info!("extracted {} topics (k = {})", out.len(), k);
    out
}
