//! Graph statistics engine: ties, triads, loops and transitive counts over the tallied
//! interaction networks.
//!
//! The triad rules here are this tool's own counting conventions, not a graph-theory
//! triad census; the numbers are kept comparable with earlier reports.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;

use crate::counting::CountMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HashtagStats {
    pub triads: u64,
    pub ties: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub triads: u64,
    pub loops: u64,
    pub links: u64,
    pub transitive: u64,
}

#[inline]
fn pairs(n: u64) -> u64 {
    if n < 2 { 0 } else { n * (n - 1) / 2 }
}

#[inline]
fn triples(n: u64) -> u64 {
    if n < 3 { 0 } else { n * (n - 1) * (n - 2) / 6 }
}

/// Ties and triads of a hashtag co-occurrence collection.
///
/// Each distinct set of two or more hashtags is counted once: C(n,2) ties and, above two
/// members, C(n,3) triads. On top of that, for every ordered pair `(h, other)` of distinct
/// members, every earlier set containing `other` adds `len - 1` triads (A and B share a
/// post, B and X share another: A-B-X).
pub fn hashtag_network_statistics<S: AsRef<[String]>>(sets: &[S]) -> HashtagStats {
    let mut stats = HashtagStats::default();
    let mut visited: AHashSet<Vec<String>> = AHashSet::new();
    // hashtag -> sum of (len - 1) over the visited sets containing it
    let mut reach: AHashMap<String, u64> = AHashMap::new();

    for set in sets {
        let mut members = set.as_ref().to_vec();
        members.sort();
        members.dedup();
        let n = members.len() as u64;
        if n < 2 || visited.contains(&members) {
            continue;
        }

        stats.ties += pairs(n);
        stats.triads += triples(n);

        // each `other` is paired with the n - 1 remaining members as `h`
        for other in &members {
            if let Some(&r) = reach.get(other) {
                stats.triads += (n - 1) * r;
            }
        }

        for h in &members {
            *reach.entry(h.clone()).or_insert(0) += n - 1;
        }
        visited.insert(members);
    }

    stats
}

/// Triads, loops, links and transitive count of a directed user network.
///
/// An actor with exactly two co-actors forms one triad; with more, every pair of its
/// out-edges counts (C(n,2)). Every directed edge is a link. A reciprocated pair is one
/// loop, and adds the friend's co-actor count to both `transitive` and `triads`; both
/// orderings of each processed edge are marked so reciprocation counts once.
pub fn user_network_statistics(users: &CountMap) -> UserStats {
    let mut stats = UserStats::default();
    let mut visited: AHashSet<(&str, &str)> = AHashSet::new();

    for (user, friends) in users {
        let n = friends.len() as u64;
        if n == 2 {
            stats.triads += 1;
        } else if n > 2 {
            stats.triads += pairs(n);
        }

        for friend in friends.keys() {
            stats.links += 1;
            let reciprocated = users
                .get(friend)
                .filter(|theirs| !theirs.is_empty())
                .filter(|theirs| theirs.get(user).is_some_and(|&c| c > 0));
            if let Some(theirs) = reciprocated {
                if !visited.contains(&(user.as_str(), friend.as_str())) {
                    stats.loops += 1;
                    stats.transitive += theirs.len() as u64;
                    stats.triads += theirs.len() as u64;
                }
            }
            visited.insert((user.as_str(), friend.as_str()));
            visited.insert((friend.as_str(), user.as_str()));
        }
    }

    stats
}
