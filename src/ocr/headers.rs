/// Default: a header line must have more than this many whitespace-separated tokens.
pub const DEFAULT_MIN_TOKENS_EXCLUSIVE: usize = 2;
/// Default: stop after collecting this many header lines.
pub const DEFAULT_MAX_CANDIDATES: usize = 2;

/// Thresholds for the table-header line heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPolicy {
    pub min_tokens_exclusive: usize,
    pub max_candidates: usize,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self {
            min_tokens_exclusive: DEFAULT_MIN_TOKENS_EXCLUSIVE,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

/// Pick the first lines of OCR output that look like table headers.
///
/// Greedy: the first `max_candidates` lines with enough tokens win, whatever follows.
pub fn classify_headers(text: &str, policy: &HeaderPolicy) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| line.split_whitespace().count() > policy.min_tokens_exclusive)
        .take(policy.max_candidates)
        .map(str::to_string)
        .collect()
}
