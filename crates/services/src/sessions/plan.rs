use rand::Rng;
use rand::seq::SliceRandom;

use study_core::model::Question;

/// How a session walks its questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceOrder {
    #[default]
    Sequential,
    Shuffled,
}

impl SequenceOrder {
    #[must_use]
    pub fn from_random(random: bool) -> Self {
        if random { Self::Shuffled } else { Self::Sequential }
    }

    #[must_use]
    pub fn is_random(self) -> bool {
        self == Self::Shuffled
    }
}

/// Indices `0..len`, in order or as a uniform random permutation.
pub fn build_sequence<R: Rng + ?Sized>(len: usize, order: SequenceOrder, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    if order.is_random() {
        indices.as_mut_slice().shuffle(rng);
    }
    indices
}

/// Draw up to `count` questions for an exam.
///
/// With `random` the whole pool is shuffled and the first `count` taken;
/// otherwise the first `count` in set order.
pub fn draw_exam<R: Rng + ?Sized>(
    pool: &[Question],
    count: usize,
    random: bool,
    rng: &mut R,
) -> Vec<Question> {
    let mut drawn = pool.to_vec();
    if random {
        drawn.as_mut_slice().shuffle(rng);
    }
    drawn.truncate(count);
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use study_core::model::QuestionId;

    fn pool(n: u64) -> Vec<Question> {
        (1..=n)
            .map(|id| Question::new(QuestionId::new(id), "", "", format!("Q{id}")))
            .collect()
    }

    #[test]
    fn sequential_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(build_sequence(4, SequenceOrder::Sequential, &mut rng), vec![0, 1, 2, 3]);
        assert!(build_sequence(0, SequenceOrder::Shuffled, &mut rng).is_empty());
    }

    #[test]
    fn shuffles_are_permutations() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut seq = build_sequence(25, SequenceOrder::Shuffled, &mut rng);
            seq.sort_unstable();
            assert_eq!(seq, (0..25).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffle_depends_on_seed_only() {
        let a = build_sequence(30, SequenceOrder::Shuffled, &mut StdRng::seed_from_u64(7));
        let b = build_sequence(30, SequenceOrder::Shuffled, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_ne!(a, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn exam_draw_without_shuffle_takes_prefix() {
        let mut rng = StdRng::seed_from_u64(3);
        let drawn = draw_exam(&pool(10), 3, false, &mut rng);
        let ids: Vec<u64> = drawn.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn exam_draw_is_bounded_and_distinct() {
        let mut rng = StdRng::seed_from_u64(3);
        let drawn = draw_exam(&pool(4), 10, true, &mut rng);
        let mut ids: Vec<u64> = drawn.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids.len(), 4);
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
