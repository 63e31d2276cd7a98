//! Near-duplicate headline detection.
//!
//! Syndicated outlets republish the same wire story with cosmetic changes to
//! the headline. [`SeenSet`] keeps every accepted normalized headline for the
//! run and flags a new one as a duplicate when it scores at least
//! [`DUPLICATE_THRESHOLD`] against any of them under [`similarity`].

use indexmap::IndexMap;

/// Minimum similarity (0-100) at which two headlines are the same story.
pub const DUPLICATE_THRESHOLD: f64 = 95.0;

/// Similarity of two strings on a 0-100 scale.
///
/// `100 * (1 - indel / (len_a + len_b))`, where `indel` is the number of
/// single-character insertions and deletions turning one string into the
/// other and lengths count Unicode scalar values. Two empty strings score 100.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let indel = total - 2 * lcs_len(&a, &b);
    100.0 * (1.0 - indel as f64 / total as f64)
}

/// Length of the longest common subsequence, two-row dynamic programming.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];
    for &lc in long {
        for (j, &sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// Upper bound on [`similarity`] from lengths alone.
///
/// The indel distance is at least the length difference, so pairs whose
/// lengths differ too much are rejected without running the LCS.
fn similarity_upper_bound(len_a: usize, len_b: usize) -> f64 {
    let total = len_a + len_b;
    if total == 0 {
        return 100.0;
    }
    100.0 * (1.0 - len_a.abs_diff(len_b) as f64 / total as f64)
}

#[derive(Debug)]
struct SeenTitle {
    original: String,
    chars: usize,
}

/// Headlines accepted so far in this run: normalized title → original title.
///
/// Entries are only ever added, in acceptance order. Not persisted across runs.
#[derive(Debug, Default)]
pub struct SeenSet {
    entries: IndexMap<String, SeenTitle>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `normalized_title` is a near-duplicate of any seen headline.
    /// On `false` the caller decides whether to [`insert`](Self::insert) it.
    pub fn is_duplicate(&self, normalized_title: &str) -> bool {
        self.find_duplicate(normalized_title).is_some()
    }

    /// Original title of the earliest seen headline that `normalized_title`
    /// duplicates, if any.
    pub fn find_duplicate(&self, normalized_title: &str) -> Option<&str> {
        let chars = normalized_title.chars().count();
        self.entries
            .iter()
            .find(|(seen, entry)| {
                similarity_upper_bound(chars, entry.chars) >= DUPLICATE_THRESHOLD
                    && similarity(normalized_title, seen) >= DUPLICATE_THRESHOLD
            })
            .map(|(_, entry)| entry.original.as_str())
    }

    /// Record an accepted headline. Re-inserting an existing key keeps the first original.
    pub fn insert(&mut self, normalized_title: &str, title: &str) {
        self.entries
            .entry(normalized_title.to_string())
            .or_insert_with(|| SeenTitle {
                original: title.to_string(),
                chars: normalized_title.chars().count(),
            });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
