use rand::Rng;

use crate::phrasebook::Phrasebook;
use crate::settings::{GameSettings, MAX_BOUND};

/// One round's question. Built fresh per round and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub left_count: u32,
    pub right_count: u32,
    pub total: u32,
    pub prompt_text: String,
}

impl Question {
    pub fn new(left_count: u32, right_count: u32, phrasebook: &dyn Phrasebook) -> Self {
        Self {
            left_count,
            right_count,
            total: left_count.saturating_add(right_count),
            prompt_text: phrasebook.prompt(left_count, right_count),
        }
    }

    /// Number of digits an answer must have before it is checked.
    pub fn digit_len(&self) -> usize {
        self.total.to_string().len()
    }

    pub fn header(&self) -> String {
        format!("{} + {}", self.left_count, self.right_count)
    }
}

/// Draws questions from the configured operand bounds.
pub struct QuestionGenerator;

impl QuestionGenerator {
    pub fn generate<R: Rng + ?Sized>(
        settings: &GameSettings,
        rng: &mut R,
        phrasebook: &dyn Phrasebook,
    ) -> Question {
        let left = rng.gen_range(1..=settings.left_bound.clamp(1, MAX_BOUND));
        let right = rng.gen_range(1..=settings.right_bound.clamp(1, MAX_BOUND));
        Question::new(left, right, phrasebook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrasebook::{Chinese, English};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn counts_stay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for (l, r) in [(1, 1), (1, 5), (3, 2), (5, 5), (10, 10), (20, 3)] {
            let settings = GameSettings {
                left_bound: l,
                right_bound: r,
                ..GameSettings::default()
            };
            for _ in 0..200 {
                let q = QuestionGenerator::generate(&settings, &mut rng, &English);
                assert!((1..=l).contains(&q.left_count));
                assert!((1..=r).contains(&q.right_count));
                assert_eq!(q.total, q.left_count + q.right_count);
            }
        }
    }

    #[test]
    fn every_value_in_range_is_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let settings = GameSettings {
            left_bound: 4,
            right_bound: 2,
            ..GameSettings::default()
        };
        let mut seen_left = [false; 4];
        let mut seen_right = [false; 2];
        for _ in 0..500 {
            let q = QuestionGenerator::generate(&settings, &mut rng, &English);
            seen_left[(q.left_count - 1) as usize] = true;
            seen_right[(q.right_count - 1) as usize] = true;
        }
        assert!(seen_left.iter().all(|s| *s));
        assert!(seen_right.iter().all(|s| *s));
    }

    #[test]
    fn zero_bound_is_treated_as_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let settings = GameSettings {
            left_bound: 0,
            right_bound: 0,
            ..GameSettings::default()
        };
        let q = QuestionGenerator::generate(&settings, &mut rng, &English);
        assert_eq!((q.left_count, q.right_count, q.total), (1, 1, 2));
    }

    #[test]
    fn oversized_bounds_are_capped() {
        let mut rng = StdRng::seed_from_u64(3);
        let settings = GameSettings {
            left_bound: u32::MAX,
            right_bound: u32::MAX,
            ..GameSettings::default()
        };
        for _ in 0..100 {
            let q = QuestionGenerator::generate(&settings, &mut rng, &English);
            assert!(q.left_count <= MAX_BOUND && q.right_count <= MAX_BOUND);
            assert_eq!(q.total, q.left_count + q.right_count);
        }
    }

    #[test]
    fn digit_len_follows_total() {
        assert_eq!(Question::new(2, 1, &English).digit_len(), 1);
        assert_eq!(Question::new(5, 4, &English).digit_len(), 1);
        assert_eq!(Question::new(5, 5, &English).digit_len(), 2);
        assert_eq!(Question::new(60, 50, &English).digit_len(), 3);
    }

    #[test]
    fn prompt_comes_from_phrasebook() {
        let q = Question::new(2, 1, &English);
        assert!(q.prompt_text.contains("2 fingers"));
        assert!(q.prompt_text.contains("1 finger "));
        assert_eq!(q.header(), "2 + 1");

        let q = Question::new(2, 1, &Chinese);
        assert!(q.prompt_text.contains('二'));
    }
}
