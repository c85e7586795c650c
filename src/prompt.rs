//! Synthetic prompt generation.
//!
//! Probes need inputs of a known approximate size. Token counts here come from
//! a cheap `chars / 4` estimator; the server's own `prompt_eval_count` is the
//! ground truth, and the classifier thresholds absorb the difference.

use crate::constants::{CHARS_PER_TOKEN, FILLER_PHRASE, SUMMARY_PREAMBLE, SUMMARY_SUFFIX};

/// Approximate token count of `text` (characters / 4).
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / CHARS_PER_TOKEN) as u64
}

/// Build a summarization prompt whose estimated size is close to `target` tokens.
///
/// The filler phrase is repeated enough times to cover the target once the
/// fixed preamble and suffix are accounted for. At least one repetition is
/// always included, so tiny targets overshoot.
pub fn synthesize(target: u64) -> String {
    let overhead = SUMMARY_PREAMBLE.chars().count() + SUMMARY_SUFFIX.chars().count();
    let phrase_len = FILLER_PHRASE.chars().count();
    let wanted_chars = (target as usize).saturating_mul(CHARS_PER_TOKEN);
    let padding_chars = wanted_chars.saturating_sub(overhead);
    // Round to the nearest whole repetition.
    let repeats = ((padding_chars + phrase_len / 2) / phrase_len).max(1);

    let mut prompt =
        String::with_capacity(overhead + phrase_len.saturating_mul(repeats));
    prompt.push_str(SUMMARY_PREAMBLE);
    for _ in 0..repeats {
        prompt.push_str(FILLER_PHRASE);
    }
    prompt.push_str(SUMMARY_SUFFIX);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relative_error(estimated: u64, target: u64) -> f64 {
        (estimated as f64 - target as f64).abs() / target as f64
    }

    #[test]
    fn estimate_is_chars_over_four() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
    }

    #[test]
    fn synthesized_size_tracks_target() {
        for target in [500, 2_000, 3_686, 16_000, 117_964] {
            let prompt = synthesize(target);
            let estimated = estimate_tokens(&prompt);
            assert!(
                relative_error(estimated, target) < 0.05,
                "target {target} estimated {estimated}"
            );
        }
    }

    #[test]
    fn same_target_gives_same_prompt() {
        let a = synthesize(8_000);
        let b = synthesize(8_000);
        assert_eq!(a, b);
        assert!(relative_error(estimate_tokens(&a), estimate_tokens(&b)) < 0.05);
    }

    #[test]
    fn tiny_target_still_has_filler() {
        let prompt = synthesize(0);
        assert!(prompt.contains(FILLER_PHRASE));
        assert!(prompt.starts_with(SUMMARY_PREAMBLE));
        assert!(prompt.ends_with(SUMMARY_SUFFIX));
    }

    #[test]
    fn larger_targets_give_longer_prompts() {
        assert!(synthesize(4_000).len() < synthesize(8_000).len());
    }
}
