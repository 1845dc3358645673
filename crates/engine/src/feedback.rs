//! Like/dislike adjustment of content similarities

use crate::types::{Feedback, FeedbackKind, ScoredMovie};
use std::collections::HashMap;

const LIKE_MULTIPLIER: f32 = 1.5;
const DISLIKE_MULTIPLIER: f32 = 0.5;

impl FeedbackKind {
    pub fn multiplier(self) -> f32 {
        match self {
            FeedbackKind::Like => LIKE_MULTIPLIER,
            FeedbackKind::Dislike => DISLIKE_MULTIPLIER,
        }
    }
}

/// Rescales similarity scores with a user's feedback
#[derive(Debug, Clone, Default)]
pub struct FeedbackAdjuster {
    by_movie: HashMap<i64, FeedbackKind>,
}

impl FeedbackAdjuster {
    /// Index feedback by movie; a later entry for the same movie replaces an earlier one
    pub fn new(feedback: &[Feedback]) -> Self {
        let by_movie = feedback.iter().map(|f| (f.movie_id, f.kind)).collect();
        Self { by_movie }
    }

    pub fn len(&self) -> usize {
        self.by_movie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_movie.is_empty()
    }

    /// Multiply each matching similarity once by its feedback multiplier
    pub fn apply(&self, scored: &mut [ScoredMovie]) {
        if self.by_movie.is_empty() {
            return;
        }

        for movie in scored.iter_mut() {
            if let Some(kind) = self.by_movie.get(&movie.movie_id) {
                movie.similarity *= kind.multiplier();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback(movie_id: i64, kind: FeedbackKind) -> Feedback {
        Feedback {
            user_id: 1,
            movie_id,
            kind,
        }
    }

    fn scored() -> Vec<ScoredMovie> {
        vec![
            ScoredMovie { movie_id: 1, similarity: 0.4 },
            ScoredMovie { movie_id: 2, similarity: 0.8 },
            ScoredMovie { movie_id: 3, similarity: 0.6 },
        ]
    }

    #[test]
    fn test_like_and_dislike_multipliers() {
        let adjuster = FeedbackAdjuster::new(&[
            feedback(1, FeedbackKind::Like),
            feedback(2, FeedbackKind::Dislike),
        ]);
        let mut movies = scored();
        adjuster.apply(&mut movies);

        assert!((movies[0].similarity - 0.6).abs() < 1e-6);
        assert!((movies[1].similarity - 0.4).abs() < 1e-6);
        assert!((movies[2].similarity - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_feedback_does_not_compound() {
        let adjuster = FeedbackAdjuster::new(&[
            feedback(2, FeedbackKind::Like),
            feedback(2, FeedbackKind::Like),
            feedback(2, FeedbackKind::Dislike),
        ]);
        assert_eq!(adjuster.len(), 1);

        let mut movies = scored();
        adjuster.apply(&mut movies);
        assert!((movies[1].similarity - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_feedback_for_unscored_movie_is_ignored() {
        let adjuster = FeedbackAdjuster::new(&[feedback(99, FeedbackKind::Like)]);
        let mut movies = scored();
        adjuster.apply(&mut movies);
        assert_eq!(movies, scored());
    }
}
