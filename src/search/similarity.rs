//! Ranking strategies applied on top of the engine score

use std::fmt::Debug;

/// Length normalisation applied to a hit's score.
///
/// The executor multiplies the engine score of every candidate by
/// `length_norm(n)`, where `n` is the number of tokens in the hit's `term`.
pub trait Similarity: Send + Sync + Debug {
    fn length_norm(&self, field_length: u32) -> f32;
}

/// Scores shorter matching labels higher than longer ones.
///
/// Synonyms of one concept differ mostly in verbosity, and the concise,
/// commonly used label should come first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortTermSimilarity;

impl Similarity for ShortTermSimilarity {
    fn length_norm(&self, field_length: u32) -> f32 {
        1.0 / field_length.max(1) as f32
    }
}

/// Leaves engine scores untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralSimilarity;

impl Similarity for NeutralSimilarity {
    fn length_norm(&self, _field_length: u32) -> f32 {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_term_prefers_fewer_tokens() {
        let sim = ShortTermSimilarity;
        assert_eq!(sim.length_norm(1), 1.0);
        assert_eq!(sim.length_norm(4), 0.25);
        assert!(sim.length_norm(2) > sim.length_norm(3));
    }

    #[test]
    fn test_zero_length_does_not_divide_by_zero() {
        assert_eq!(ShortTermSimilarity.length_norm(0), 1.0);
    }

    #[test]
    fn test_neutral_is_constant() {
        assert_eq!(NeutralSimilarity.length_norm(1), NeutralSimilarity.length_norm(50));
    }
}
