//! Token estimation for budgeting model calls.
//!
//! The same estimator instance is injected into both the chunker and the
//! summarizer so that chunk budgeting and usage accounting agree with each
//! other. Estimates only need to be conservative and consistent, not exact:
//! the reserved margin in the summarization settings absorbs the slack.

/// Maps text to an estimated token count.
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of model tokens `text` will occupy.
    fn estimate(&self, text: &str) -> usize;
}

/// Character-class based estimator.
///
/// CJK ideographs tokenize to roughly one token per character, while Latin
/// text averages about four characters per token. Mixed transcripts are
/// scored per character and rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub fn new() -> Self {
        Self
    }

    fn is_cjk(c: char) -> bool {
        matches!(c,
            '\u{4e00}'..='\u{9fff}'     // CJK Unified Ideographs
            | '\u{3400}'..='\u{4dbf}'   // Extension A
            | '\u{3040}'..='\u{30ff}'   // Hiragana + Katakana
            | '\u{ac00}'..='\u{d7af}'   // Hangul syllables
            | '\u{ff00}'..='\u{ffef}'   // Fullwidth forms
        )
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let mut weight = 0u64;
        for c in text.chars() {
            // Fixed-point quarters so the estimate is deterministic.
            weight += if Self::is_cjk(c) { 4 } else { 1 };
        }

        (weight as usize).div_ceil(4).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_zero() {
        assert_eq!(HeuristicEstimator::new().estimate(""), 0);
    }

    #[test]
    fn test_latin_text_roughly_four_chars_per_token() {
        let est = HeuristicEstimator::new();
        assert_eq!(est.estimate("abcd"), 1);
        assert_eq!(est.estimate("abcdefgh"), 2);
        // Partial groups round up
        assert_eq!(est.estimate("abcde"), 2);
    }

    #[test]
    fn test_cjk_chars_count_as_one_token_each() {
        let est = HeuristicEstimator::new();
        assert_eq!(est.estimate("會議紀錄"), 4);
    }

    #[test]
    fn test_mixed_text() {
        let est = HeuristicEstimator::new();
        // 2 CJK chars (8 quarters) + 4 latin chars (4 quarters) = 3 tokens
        assert_eq!(est.estimate("會議abcd"), 3);
    }

    #[test]
    fn test_single_char_is_at_least_one() {
        assert_eq!(HeuristicEstimator::new().estimate("a"), 1);
    }
}
