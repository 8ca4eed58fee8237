//! Tally primitives shared by the entity extractor and the interaction builders.

use ahash::AHashMap;
use std::collections::BTreeMap;

/// actor -> {co-actor -> tally}. Ordered so every pass over it is deterministic.
pub type CountMap = BTreeMap<String, BTreeMap<String, u64>>;

/// Flat key -> tally.
pub type Tally = AHashMap<String, u64>;

#[inline]
pub fn tally(t: &mut Tally, key: &str) {
    *t.entry(key.to_string()).or_insert(0) += 1;
}

/// One more interaction from `actor` to `co_actor`.
#[inline]
pub fn tally_pair(m: &mut CountMap, actor: &str, co_actor: &str) {
    *m.entry(actor.to_string())
        .or_default()
        .entry(co_actor.to_string())
        .or_insert(0) += 1;
}

/// The `n` highest tallies, count descending then key ascending.
pub fn top_n<'a, I>(items: I, n: usize) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = (&'a String, &'a u64)>,
{
    let mut v: Vec<(String, u64)> = items.into_iter().map(|(k, c)| (k.clone(), *c)).collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v.truncate(n);
    v
}

/// `"key: count"` strings for the `n` highest tallies.
pub fn top_n_items<'a, I>(items: I, n: usize) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a u64)>,
{
    top_n(items, n)
        .into_iter()
        .map(|(k, c)| format!("{}: {}", k, c))
        .collect()
}
