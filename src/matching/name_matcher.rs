// ============================================================================
// Doctrine Name Matcher
// Decides whether a free-text listing title refers to a configured doctrine
// ============================================================================

use std::collections::{HashMap, HashSet};

/// Default minimum similarity for the fuzzy stage.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.80;

/// Two-stage name matcher
///
/// 1. Token subset: every whitespace-separated token of the required name
///    (case-insensitive) appears in the candidate. Handles reordering and
///    trailing extras such as a pricing suffix.
/// 2. Fallback: Jaccard similarity over character bigrams of both full
///    strings, for punctuation variants the token stage misses.
///
/// # Example
/// ```text
/// "v1 Shield Drake"      vs "v1 drake shield"        -> tokens match
/// "v11 Heavy DPS 3 Gyro" vs "v11 Heavy DPS (3 Gyro)" -> similarity 0.82
/// "v11 Heavy Legion"     vs "v11 Heavy Leshak"       -> similarity 0.58, no match
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameMatcher {
    threshold: f64,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl NameMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// True when `candidate` refers to the doctrine named `required`.
    pub fn matches(&self, required: &str, candidate: &str) -> bool {
        let required_tokens: Vec<String> =
            required.split_whitespace().map(str::to_lowercase).collect();
        // An empty name would trivially satisfy the subset check.
        if required_tokens.is_empty() {
            return false;
        }

        let candidate_tokens: HashSet<String> =
            candidate.split_whitespace().map(str::to_lowercase).collect();
        if required_tokens
            .iter()
            .all(|token| candidate_tokens.contains(token))
        {
            return true;
        }

        jaccard_similarity(required, candidate) >= self.threshold
    }
}

/// Case-insensitive Jaccard similarity of the character bigram multisets.
///
/// Returns `common / (total_a + total_b - common)`, 1.0 for equal strings.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a == b {
        return 1.0;
    }

    let grams_a = bigrams(&a);
    let grams_b = bigrams(&b);
    let total_a: usize = grams_a.values().sum();
    let total_b: usize = grams_b.values().sum();

    let common: usize = grams_a
        .iter()
        .map(|(gram, count)| (*count).min(grams_b.get(gram).copied().unwrap_or(0)))
        .sum();

    let union = total_a + total_b - common;
    if union == 0 {
        return 0.0;
    }
    common as f64 / union as f64
}

fn bigrams(chars: &[char]) -> HashMap<&[char], usize> {
    let mut grams = HashMap::new();
    if chars.is_empty() {
        return grams;
    }
    if chars.len() < 2 {
        grams.insert(chars, 1);
        return grams;
    }
    for window in chars.windows(2) {
        *grams.entry(window).or_insert(0) += 1;
    }
    grams
}
