//! User profile construction
//!
//! Builds a user's preference vector in genre space from ratings, optional
//! implicit interactions, stated genre preferences and favorite movies.

use crate::features::FeatureMatrix;
use crate::types::{Genre, Interaction, Rating, UserPreference, GENRE_COUNT};
use ndarray::Array1;
use std::collections::HashSet;

/// Weight given to the accumulated profile when blending in preferences
const BLEND_WEIGHT: f32 = 0.5;

/// A user's preference vector, same width as the movie feature vectors
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: i64,
    pub vector: Array1<f32>,
}

/// Builds profiles against a fixed feature matrix
pub struct UserProfileBuilder<'a> {
    features: &'a FeatureMatrix,
}

impl<'a> UserProfileBuilder<'a> {
    pub fn new(features: &'a FeatureMatrix) -> Self {
        Self { features }
    }

    /// Build the profile, or `None` when no rating matches a known movie
    pub fn build(
        &self,
        user_id: i64,
        ratings: &[Rating],
        preferences: &UserPreference,
        interactions: Option<&[Interaction]>,
    ) -> Option<UserProfile> {
        let mut vector = match self.rating_profile(ratings) {
            Some(vector) => vector,
            None => {
                tracing::debug!(user_id, "No ratings align with the catalogue");
                return None;
            }
        };

        if let Some(interactions) = interactions.filter(|i| !i.is_empty()) {
            for interaction in interactions {
                if let Some(features) = self.features.vector(interaction.movie_id) {
                    vector.scaled_add(interaction.weight(), &features);
                }
            }
            vector /= (interactions.len() + 1) as f32;
        }

        if let Some(genres) = genre_vector(&preferences.preferred_genres) {
            vector = blend(&vector, &genres);
        } else if !preferences.preferred_genres.is_empty() {
            tracing::debug!(user_id, "No preferred genre recognised, skipping genre blend");
        }

        if let Some(favorites) = self.favorites_vector(&preferences.favorite_movies) {
            vector = blend(&vector, &favorites);
        }

        Some(UserProfile { user_id, vector })
    }

    /// Rating-weighted average of rated movies
    fn rating_profile(&self, ratings: &[Rating]) -> Option<Array1<f32>> {
        let mut seen = HashSet::new();
        let aligned: Vec<_> = ratings
            .iter()
            .filter(|r| seen.insert(r.movie_id))
            .filter_map(|r| self.features.vector(r.movie_id).map(|v| (r.rating, v)))
            .collect();

        match aligned.as_slice() {
            [] => None,
            [(_, vector)] => Some(vector.to_owned()),
            _ => {
                let total: f32 = aligned.iter().map(|(rating, _)| rating).sum();
                if total <= 0.0 {
                    return None;
                }

                let mut profile = Array1::<f32>::zeros(GENRE_COUNT);
                for (rating, vector) in &aligned {
                    profile.scaled_add(*rating, vector);
                }
                Some(profile / total)
            }
        }
    }

    /// Mean vector of the distinct favorites that resolve to known movies
    fn favorites_vector(&self, favorites: &[i64]) -> Option<Array1<f32>> {
        let distinct: HashSet<i64> = favorites.iter().copied().collect();
        let vectors: Vec<_> = distinct
            .iter()
            .filter_map(|id| self.features.vector(*id))
            .collect();

        if vectors.is_empty() {
            return None;
        }

        let mut mean = Array1::<f32>::zeros(GENRE_COUNT);
        for vector in &vectors {
            mean += vector;
        }
        Some(mean / vectors.len() as f32)
    }
}

/// One-hot over recognised genres, normalized to sum to one
fn genre_vector(preferred: &[String]) -> Option<Array1<f32>> {
    let mut vector = Array1::<f32>::zeros(GENRE_COUNT);
    for genre in preferred.iter().filter_map(|name| Genre::from_name(name)) {
        vector[genre.index()] = 1.0;
    }

    let total = vector.sum();
    if total > 0.0 {
        Some(vector / total)
    } else {
        None
    }
}

fn blend(profile: &Array1<f32>, other: &Array1<f32>) -> Array1<f32> {
    profile * BLEND_WEIGHT + other * (1.0 - BLEND_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InteractionKind, MovieRow};

    fn catalogue() -> FeatureMatrix {
        FeatureMatrix::build(&[
            MovieRow::with_genres(1, "Action One", &[Genre::Action]),
            MovieRow::with_genres(2, "Comedy One", &[Genre::Comedy]),
            MovieRow::with_genres(3, "Action Comedy", &[Genre::Action, Genre::Comedy]),
            MovieRow::with_genres(4, "Drama One", &[Genre::Drama]),
        ])
        .unwrap()
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_single_rating_uses_raw_vector() {
        let features = catalogue();
        let builder = UserProfileBuilder::new(&features);

        let profile = builder
            .build(9, &[Rating::new(9, 3, 2.0)], &UserPreference::default(), None)
            .unwrap();
        assert_eq!(profile.vector, features.vector(3).unwrap().to_owned());
    }

    #[test]
    fn test_weighted_average_and_keep_first_dedupe() {
        let features = catalogue();
        let builder = UserProfileBuilder::new(&features);
        let ratings = vec![
            Rating::new(9, 1, 9.0),
            Rating::new(9, 2, 3.0),
            Rating::new(9, 1, 1.0),
        ];

        let profile = builder
            .build(9, &ratings, &UserPreference::default(), None)
            .unwrap();
        assert!(approx(profile.vector[Genre::Action.index()], 0.75));
        assert!(approx(profile.vector[Genre::Comedy.index()], 0.25));
    }

    #[test]
    fn test_unmatched_ratings_yield_no_profile() {
        let features = catalogue();
        let builder = UserProfileBuilder::new(&features);

        assert!(builder
            .build(9, &[Rating::new(9, 99, 8.0)], &UserPreference::default(), None)
            .is_none());
        assert!(builder
            .build(9, &[], &UserPreference::default(), None)
            .is_none());
    }

    #[test]
    fn test_interactions_are_weighted_and_averaged() {
        let features = catalogue();
        let builder = UserProfileBuilder::new(&features);
        let interactions = vec![
            Interaction {
                user_id: 9,
                movie_id: 2,
                kind: InteractionKind::View,
                duration_secs: 120.0,
            },
            Interaction {
                user_id: 9,
                movie_id: 42,
                kind: InteractionKind::Click,
                duration_secs: 0.0,
            },
        ];

        let profile = builder
            .build(
                9,
                &[Rating::new(9, 1, 5.0)],
                &UserPreference::default(),
                Some(&interactions),
            )
            .unwrap();

        // (action + 2 * comedy) / 3, the unknown movie still counts
        assert!(approx(profile.vector[Genre::Action.index()], 1.0 / 3.0));
        assert!(approx(profile.vector[Genre::Comedy.index()], 2.0 / 3.0));
    }

    #[test]
    fn test_genre_preferences_blend_half_and_half() {
        let features = catalogue();
        let builder = UserProfileBuilder::new(&features);
        let prefs = UserPreference {
            user_id: 9,
            preferred_genres: vec!["Drama".to_string(), "Comedy".to_string()],
            favorite_movies: vec![],
        };

        let profile = builder
            .build(9, &[Rating::new(9, 1, 5.0)], &prefs, None)
            .unwrap();
        assert!(approx(profile.vector[Genre::Action.index()], 0.5));
        assert!(approx(profile.vector[Genre::Drama.index()], 0.25));
        assert!(approx(profile.vector[Genre::Comedy.index()], 0.25));
    }

    #[test]
    fn test_unrecognised_genres_are_skipped() {
        let features = catalogue();
        let builder = UserProfileBuilder::new(&features);
        let prefs = UserPreference {
            user_id: 9,
            preferred_genres: vec!["Space Opera".to_string()],
            favorite_movies: vec![],
        };

        let profile = builder
            .build(9, &[Rating::new(9, 1, 5.0)], &prefs, None)
            .unwrap();
        assert!(profile.vector.iter().all(|v| v.is_finite()));
        assert_eq!(profile.vector[Genre::Action.index()], 1.0);
    }

    #[test]
    fn test_favorites_blend_is_order_independent() {
        let features = catalogue();
        let builder = UserProfileBuilder::new(&features);
        let ratings = vec![Rating::new(9, 1, 7.0), Rating::new(9, 4, 4.0)];

        let forward = UserPreference {
            user_id: 9,
            preferred_genres: vec![],
            favorite_movies: vec![2, 3, 2, 77],
        };
        let reversed = UserPreference {
            favorite_movies: vec![77, 3, 2],
            ..forward.clone()
        };

        let a = builder.build(9, &ratings, &forward, None).unwrap();
        let b = builder.build(9, &ratings, &reversed, None).unwrap();
        for (x, y) in a.vector.iter().zip(b.vector.iter()) {
            assert!(approx(*x, *y));
        }
    }

    #[test]
    fn test_unknown_favorites_leave_profile_unchanged() {
        let features = catalogue();
        let builder = UserProfileBuilder::new(&features);
        let prefs = UserPreference {
            user_id: 9,
            preferred_genres: vec![],
            favorite_movies: vec![500, 501],
        };

        let profile = builder
            .build(9, &[Rating::new(9, 2, 5.0)], &prefs, None)
            .unwrap();
        assert_eq!(profile.vector, features.vector(2).unwrap().to_owned());
    }
}
