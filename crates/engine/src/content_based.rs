//! Content-based filtering
//!
//! Scores catalogue movies by cosine similarity between their genre vectors
//! and a user profile.

use crate::error::Result;
use crate::features::FeatureMatrix;
use crate::profile::UserProfile;
use crate::types::ScoredMovie;
use ndarray::ArrayView1;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Cosine similarity; zero when either vector has zero norm
pub fn cosine_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    a.dot(&b) / (norm_a * norm_b)
}

/// Ranks movies against a profile
pub struct ContentScorer<'a> {
    features: &'a FeatureMatrix,
}

impl<'a> ContentScorer<'a> {
    pub fn new(features: &'a FeatureMatrix) -> Self {
        Self { features }
    }

    /// Similarity of every catalogue movie to the profile, in data order
    pub fn similarities(&self, profile: &UserProfile) -> Result<Vec<ScoredMovie>> {
        self.features.ensure_dimension(&profile.vector)?;

        Ok(self
            .features
            .movies()
            .iter()
            .zip(self.features.vectors().rows())
            .map(|(movie, vector)| ScoredMovie {
                movie_id: movie.movie_id,
                similarity: cosine_similarity(profile.vector.view(), vector),
            })
            .collect())
    }

    /// Drop excluded ids, sort by descending similarity and keep the first `top_n`
    ///
    /// The sort is stable so equal scores keep data order.
    pub fn rank(
        mut scored: Vec<ScoredMovie>,
        exclude: &HashSet<i64>,
        top_n: usize,
    ) -> Vec<ScoredMovie> {
        scored.retain(|s| !exclude.contains(&s.movie_id));
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        scored.truncate(top_n);
        scored
    }

    pub fn recommend(
        &self,
        profile: &UserProfile,
        exclude: &HashSet<i64>,
        top_n: usize,
    ) -> Result<Vec<ScoredMovie>> {
        let scored = self.similarities(profile)?;
        Ok(Self::rank(scored, exclude, top_n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Genre, MovieRow, GENRE_COUNT};
    use ndarray::{arr1, Array1};

    #[test]
    fn test_cosine_similarity() {
        let a = arr1(&[1.0f32, 2.0, 0.0]);
        let b = arr1(&[0.0f32, 0.0, 3.0]);
        let zero = Array1::<f32>::zeros(3);

        assert!((cosine_similarity(a.view(), a.view()) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(a.view(), b.view()), 0.0);
        assert_eq!(cosine_similarity(a.view(), zero.view()), 0.0);
        assert_eq!(cosine_similarity(zero.view(), zero.view()), 0.0);
    }

    #[test]
    fn test_recommend_excludes_and_orders() {
        let features = FeatureMatrix::build(&[
            MovieRow::with_genres(1, "Action", &[Genre::Action]),
            MovieRow::with_genres(2, "Comedy", &[Genre::Comedy]),
            MovieRow::with_genres(3, "Action Comedy", &[Genre::Action, Genre::Comedy]),
            MovieRow::with_genres(4, "Action Two", &[Genre::Action]),
        ])
        .unwrap();
        let scorer = ContentScorer::new(&features);
        let profile = UserProfile {
            user_id: 1,
            vector: features.vector(1).unwrap().to_owned(),
        };

        let exclude: HashSet<i64> = [1].into_iter().collect();
        let ranked = scorer.recommend(&profile, &exclude, 2).unwrap();

        let ids: Vec<i64> = ranked.iter().map(|s| s.movie_id).collect();
        assert_eq!(ids, vec![4, 3]);
        assert!((ranked[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let scored = vec![
            ScoredMovie { movie_id: 10, similarity: 0.5 },
            ScoredMovie { movie_id: 11, similarity: 0.9 },
            ScoredMovie { movie_id: 12, similarity: 0.5 },
            ScoredMovie { movie_id: 13, similarity: 0.5 },
        ];

        let ranked = ContentScorer::rank(scored, &HashSet::new(), 10);
        let ids: Vec<i64> = ranked.iter().map(|s| s.movie_id).collect();
        assert_eq!(ids, vec![11, 10, 12, 13]);
    }

    #[test]
    fn test_profile_width_is_checked() {
        let features = FeatureMatrix::build(&[MovieRow::with_genres(1, "A", &[])]).unwrap();
        let scorer = ContentScorer::new(&features);
        let profile = UserProfile {
            user_id: 1,
            vector: Array1::zeros(GENRE_COUNT + 1),
        };

        assert!(scorer.similarities(&profile).is_err());
    }
}
