//! Transcript chunking under a token budget.
//!
//! Splits a transcript into the fewest ordered chunks whose estimated token
//! counts stay within a configured maximum, preferring sentence and
//! paragraph boundaries for the cut points. Concatenating the chunks in
//! order reproduces the transcript exactly.

use crate::error::{ReferatError, Result};
use crate::tokens::TokenEstimator;

/// A contiguous piece of a transcript, sized to fit one model call.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Text content of this chunk.
    pub text: String,
    /// Estimated token count for the content.
    pub tokens: usize,
    /// Position of this chunk in the transcript.
    pub order: usize,
}

/// Characters treated as sentence or paragraph boundaries.
///
/// Covers Latin and CJK sentence punctuation; newlines double as paragraph
/// boundaries for transcripts that put one utterance per line.
fn is_boundary(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n' | '。' | '！' | '？' | '；')
}

/// Split a transcript into ordered chunks of at most `max_tokens` each.
///
/// Cut points prefer the sentence boundary nearest the budget; a sentence
/// that alone exceeds the budget is hard-cut at the largest character
/// prefix that still fits, so the size invariant holds unconditionally.
///
/// Fails with `InvalidInput` for an empty transcript or a zero budget.
pub fn chunk_transcript(
    transcript: &str,
    max_tokens: usize,
    estimator: &dyn TokenEstimator,
) -> Result<Vec<Chunk>> {
    if transcript.is_empty() {
        return Err(ReferatError::InvalidInput(
            "transcript is empty".to_string(),
        ));
    }
    if max_tokens == 0 {
        return Err(ReferatError::InvalidInput(
            "maximum tokens per chunk must be positive".to_string(),
        ));
    }

    // Common case: the whole transcript fits in one call.
    let total = estimator.estimate(transcript);
    if total <= max_tokens {
        return Ok(vec![Chunk {
            text: transcript.to_string(),
            tokens: total,
            order: 0,
        }]);
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();
    // Running sum of per-sentence estimates. The sum of piecewise estimates
    // never undercounts the estimate of the concatenation, so comparing it
    // against the budget keeps every emitted chunk within limits.
    let mut current_tokens = 0usize;

    let flush = |current: &mut String, current_tokens: &mut usize, chunks: &mut Vec<Chunk>| {
        if current.is_empty() {
            return;
        }
        let text = std::mem::take(current);
        let tokens = estimator.estimate(&text);
        chunks.push(Chunk {
            text,
            tokens,
            order: chunks.len(),
        });
        *current_tokens = 0;
    };

    for sentence in split_sentences(transcript) {
        let sentence_tokens = estimator.estimate(sentence);

        if sentence_tokens > max_tokens {
            // No boundary before the limit: hard-cut the sentence itself.
            flush(&mut current, &mut current_tokens, &mut chunks);
            let mut rest = sentence;
            while !rest.is_empty() {
                let cut = hard_cut_len(rest, max_tokens, estimator);
                let (piece, tail) = rest.split_at(cut);
                if estimator.estimate(tail) <= max_tokens && !tail.is_empty() {
                    // Tail fits: let it seed the next chunk instead of
                    // forcing another cut.
                    current.push_str(piece);
                    flush(&mut current, &mut current_tokens, &mut chunks);
                    current.push_str(tail);
                    current_tokens = estimator.estimate(tail);
                    rest = "";
                } else {
                    current.push_str(piece);
                    flush(&mut current, &mut current_tokens, &mut chunks);
                    rest = tail;
                }
            }
            continue;
        }

        if current_tokens + sentence_tokens > max_tokens {
            flush(&mut current, &mut current_tokens, &mut chunks);
        }
        current.push_str(sentence);
        current_tokens += sentence_tokens;
    }

    flush(&mut current, &mut current_tokens, &mut chunks);

    Ok(chunks)
}

/// Greedily pack consecutive units into groups whose combined token count
/// stays within `max_tokens`.
///
/// Used by the reduce pass to regroup partial summaries: accumulate units
/// left to right until adding the next would exceed the budget, then close
/// the group. Order is preserved and the result is deterministic. A single
/// unit that alone exceeds the budget forms its own group.
pub fn pack_units(token_counts: &[usize], max_tokens: usize) -> Vec<std::ops::Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut group_tokens = 0usize;

    for (i, &tokens) in token_counts.iter().enumerate() {
        if i > start && group_tokens + tokens > max_tokens {
            groups.push(start..i);
            start = i;
            group_tokens = 0;
        }
        group_tokens += tokens;
    }

    if start < token_counts.len() {
        groups.push(start..token_counts.len());
    }

    groups
}

/// Iterate over sentences, each ending just after its boundary character.
/// The pieces partition the input exactly.
fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .find(|(_, c)| is_boundary(*c))
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(rest.len());
        let (sentence, tail) = rest.split_at(end);
        rest = tail;
        Some(sentence)
    })
}

/// Byte length of the largest character prefix of `text` whose estimate
/// fits `max_tokens`. Always at least one character, so callers make
/// progress even under a pathologically small budget.
fn hard_cut_len(text: &str, max_tokens: usize, estimator: &dyn TokenEstimator) -> usize {
    let starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let byte_end = |chars: usize| {
        if chars == starts.len() {
            text.len()
        } else {
            starts[chars]
        }
    };

    let mut lo = 1usize;
    let mut hi = starts.len();
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if estimator.estimate(&text[..byte_end(mid)]) <= max_tokens {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    byte_end(lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::HeuristicEstimator;

    fn chunks(text: &str, budget: usize) -> Vec<Chunk> {
        chunk_transcript(text, budget, &HeuristicEstimator::new()).unwrap()
    }

    #[test]
    fn test_short_transcript_is_single_chunk() {
        let text = "Alice: Let's ship v2. Bob: I'll write tests.";
        let result = chunks(text, 1000);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].text, text);
        assert_eq!(result[0].order, 0);
    }

    #[test]
    fn test_concatenation_reproduces_transcript() {
        let text = "First sentence. Second sentence! Third one? Fourth.\nFifth paragraph here.";
        for budget in [2, 3, 5, 8, 100] {
            let result = chunks(text, budget);
            let joined: String = result.iter().map(|c| c.text.as_str()).collect();
            assert_eq!(joined, text, "budget {}", budget);
        }
    }

    #[test]
    fn test_all_chunks_within_budget() {
        let text = "One two three four. Five six seven eight. Nine ten eleven twelve.";
        let est = HeuristicEstimator::new();
        for budget in [1, 2, 4, 6] {
            for chunk in chunks(text, budget) {
                assert!(chunk.tokens <= budget);
                assert!(est.estimate(&chunk.text) <= budget);
            }
        }
    }

    #[test]
    fn test_splits_at_sentence_boundaries() {
        // Sentences are 5-6 tokens each; a budget of 12 should pair them up.
        let text = "aaaaaaaaaaaaaaaaaaa. bbbbbbbbbbbbbbbbbbb. ccccccccccccccccccc. ddddddddddddddddddd.";
        let result = chunks(text, 12);
        assert_eq!(result.len(), 2);
        assert!(result[0].text.ends_with("bbbbbbbbbbbbbbbbbbb."));
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        // 40 chars, no punctuation: 10 tokens, must split under budget 4.
        let text = "a".repeat(40);
        let result = chunks(&text, 4);
        assert!(result.len() >= 3);
        let joined: String = result.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
        for chunk in &result {
            assert!(chunk.tokens <= 4);
        }
    }

    #[test]
    fn test_cjk_boundaries() {
        let text = "今天討論發布計畫。測試由鮑伯負責。下週五上線。";
        let result = chunks(text, 10);
        let joined: String = result.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
        assert!(result.len() > 1);
        for chunk in &result {
            assert!(chunk.tokens <= 10);
        }
    }

    #[test]
    fn test_orders_are_sequential() {
        let text = "One two three four. Five six seven eight. Nine ten eleven twelve.";
        let result = chunks(text, 3);
        for (i, chunk) in result.iter().enumerate() {
            assert_eq!(chunk.order, i);
        }
    }

    #[test]
    fn test_empty_transcript_is_invalid() {
        let err = chunk_transcript("", 100, &HeuristicEstimator::new()).unwrap_err();
        assert!(matches!(err, ReferatError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_budget_is_invalid() {
        let err = chunk_transcript("text", 0, &HeuristicEstimator::new()).unwrap_err();
        assert!(matches!(err, ReferatError::InvalidInput(_)));
    }

    #[test]
    fn test_pack_units_greedy_grouping() {
        // Five summaries of 10 tokens with room for three per group: 3 + 2.
        let groups = pack_units(&[10, 10, 10, 10, 10], 30);
        assert_eq!(groups, vec![0..3, 3..5]);
    }

    #[test]
    fn test_pack_units_oversized_unit_gets_own_group() {
        let groups = pack_units(&[50, 10, 10], 30);
        assert_eq!(groups, vec![0..1, 1..3]);
    }

    #[test]
    fn test_pack_units_single_group_when_everything_fits() {
        let groups = pack_units(&[5, 5, 5], 30);
        assert_eq!(groups, vec![0..3]);
    }

    #[test]
    fn test_pack_units_empty_input() {
        assert!(pack_units(&[], 30).is_empty());
    }
}
