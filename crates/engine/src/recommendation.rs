//! Hybrid Recommendation Engine
//!
//! Runs the content-only and hybrid pipelines for one user. The hybrid
//! pipeline scores the catalogue against the user's profile, adjusts the
//! scores with explicit feedback, trains a latent factor model on every
//! rating and fuses both rankings into one list.

use crate::content_based::ContentScorer;
use crate::error::Result;
use crate::feedback::FeedbackAdjuster;
use crate::features::FeatureMatrix;
use crate::matrix_factorization::{train_test_split, MatrixFactorization};
use crate::profile::UserProfileBuilder;
use crate::store::{RecommendationStore, RecommendationTimeLog};
use crate::types::{
    Feedback, Interaction, MovieRow, Rating, RecommendationOutcome, RecommendedMovie, ScoredMovie,
    UserPreference,
};
use crate::EngineConfig;
use hybridrec_core::pipeline_span;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, Span};

/// Everything the hybrid pipeline reads for one request
#[derive(Debug, Clone, Default)]
pub struct HybridSnapshot {
    pub movies: Vec<MovieRow>,
    pub user_ratings: Vec<Rating>,
    pub preferences: UserPreference,
    pub feedback: Vec<Feedback>,
    pub interactions: Vec<Interaction>,
    pub all_ratings: Vec<Rating>,
}

/// Entry point for recommendation requests
pub struct HybridRecommender {
    store: Arc<dyn RecommendationStore>,
    time_log: Arc<dyn RecommendationTimeLog>,
    config: EngineConfig,
}

impl HybridRecommender {
    pub fn new(
        store: Arc<dyn RecommendationStore>,
        time_log: Arc<dyn RecommendationTimeLog>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            time_log,
            config,
        }
    }

    /// Content-only recommendations: no interactions, no feedback, no timing record
    pub async fn content_based_recommendation(
        &self,
        user_id: i64,
    ) -> Result<RecommendationOutcome> {
        self.run_content(user_id)
            .instrument(pipeline_span("content", user_id))
            .await
    }

    /// Fused content and latent recommendations
    ///
    /// The wall-clock duration of a ranked response is appended to the timing
    /// log; a failed write is logged and does not fail the request.
    pub async fn hybrid_recommendation(&self, user_id: i64) -> Result<RecommendationOutcome> {
        self.run_hybrid(user_id)
            .instrument(pipeline_span("hybrid", user_id))
            .await
    }

    async fn run_content(&self, user_id: i64) -> Result<RecommendationOutcome> {
        let (movies, ratings, preferences) = tokio::try_join!(
            self.store.movies(),
            self.store.user_ratings(user_id),
            self.store.user_preferences(user_id),
        )?;

        let top_n = self.config.content_top_n;
        let span = Span::current();
        let outcome = tokio::task::spawn_blocking(move || {
            span.in_scope(|| content_pipeline(user_id, &movies, &ratings, &preferences, top_n))
        })
        .await??;

        tracing::info!(
            count = outcome.recommendations().len(),
            "Content recommendation complete"
        );
        Ok(outcome)
    }

    async fn run_hybrid(&self, user_id: i64) -> Result<RecommendationOutcome> {
        let started = Instant::now();

        let (movies, user_ratings, preferences, feedback, interactions, all_ratings) = tokio::try_join!(
            self.store.movies(),
            self.store.user_ratings(user_id),
            self.store.user_preferences(user_id),
            self.store.user_feedback(user_id),
            self.store.user_interactions(user_id),
            self.store.all_ratings(),
        )?;
        let snapshot = HybridSnapshot {
            movies,
            user_ratings,
            preferences,
            feedback,
            interactions,
            all_ratings,
        };

        let config = self.config.clone();
        let span = Span::current();
        let outcome = tokio::task::spawn_blocking(move || {
            span.in_scope(|| hybrid_pipeline(user_id, &snapshot, &config))
        })
        .await??;

        if let RecommendationOutcome::Ranked(movies) = &outcome {
            let duration_secs = round_seconds(started.elapsed());
            tracing::info!(
                duration_secs,
                count = movies.len(),
                "Hybrid recommendation complete"
            );

            if let Err(e) = self.time_log.record_duration(user_id, duration_secs).await {
                tracing::warn!(error = %e, "Failed to record recommendation time");
            }
        }

        Ok(outcome)
    }
}

/// Content-only pipeline over an in-memory snapshot
pub fn content_pipeline(
    user_id: i64,
    movies: &[MovieRow],
    ratings: &[Rating],
    preferences: &UserPreference,
    top_n: usize,
) -> Result<RecommendationOutcome> {
    let features = FeatureMatrix::build(movies)?;
    let builder = UserProfileBuilder::new(&features);
    let Some(profile) = builder.build(user_id, ratings, preferences, None) else {
        return Ok(RecommendationOutcome::NoRatings);
    };

    let ranked = ContentScorer::new(&features).recommend(&profile, &rated_ids(ratings), top_n)?;
    Ok(RecommendationOutcome::Ranked(to_recommended(&features, &ranked)))
}

/// Hybrid pipeline over an in-memory snapshot
pub fn hybrid_pipeline(
    user_id: i64,
    snapshot: &HybridSnapshot,
    config: &EngineConfig,
) -> Result<RecommendationOutcome> {
    let features = FeatureMatrix::build(&snapshot.movies)?;
    let Some(profile) = UserProfileBuilder::new(&features).build(
        user_id,
        &snapshot.user_ratings,
        &snapshot.preferences,
        Some(snapshot.interactions.as_slice()),
    ) else {
        return Ok(RecommendationOutcome::NoRatings);
    };

    let mut scored = ContentScorer::new(&features).similarities(&profile)?;
    FeedbackAdjuster::new(&snapshot.feedback).apply(&mut scored);
    let content = ContentScorer::rank(
        scored,
        &rated_ids(&snapshot.user_ratings),
        config.hybrid_top_n,
    );

    let latent_ids = latent_recommendations(user_id, &snapshot.all_ratings, config)?;

    Ok(RecommendationOutcome::Ranked(fuse(
        to_recommended(&features, &content),
        &latent_ids,
        &features,
        config.hybrid_top_n,
    )))
}

/// Train a fresh latent model and return its top movie ids for the user
///
/// With a positive `holdout_fraction` the model sees only the training share of
/// the ratings; a user whose ratings were all held out gets no latent ids.
fn latent_recommendations(
    user_id: i64,
    ratings: &[Rating],
    config: &EngineConfig,
) -> Result<Vec<i64>> {
    let (train, test) = if config.holdout_fraction > 0.0 {
        let mut rng = match config.als.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        train_test_split(ratings, config.holdout_fraction, &mut rng)
    } else {
        (ratings.to_vec(), Vec::new())
    };

    let mut model = MatrixFactorization::new(config.als.clone());
    model.fit(&train)?;

    if !test.is_empty() {
        match model.rmse(&test) {
            Some(rmse) => tracing::info!(rmse, held_out = test.len(), "Latent model evaluated"),
            None => tracing::debug!("No held-out rating overlaps the training set"),
        }
    }

    Ok(model.recommend(user_id, config.latent_top_n))
}

/// Merge content and latent rankings
///
/// Content entries come first. Latent ids are restricted to catalogue movies,
/// taken in catalogue order and capped at `top_n`. The first occurrence of a
/// movie id wins and the result holds at most `top_n` entries.
pub fn fuse(
    content: Vec<RecommendedMovie>,
    latent_ids: &[i64],
    features: &FeatureMatrix,
    top_n: usize,
) -> Vec<RecommendedMovie> {
    let latent: HashSet<i64> = latent_ids.iter().copied().collect();
    let latent_movies = features
        .movies()
        .iter()
        .filter(|m| latent.contains(&m.movie_id))
        .take(top_n)
        .map(|m| RecommendedMovie {
            movie_id: m.movie_id,
            movie_title: m.movie_title.clone(),
            poster_url: m.metadata.poster_url.clone(),
            similarity: None,
        });

    let mut seen = HashSet::new();
    content
        .into_iter()
        .chain(latent_movies)
        .filter(|m| seen.insert(m.movie_id))
        .take(top_n)
        .collect()
}

fn rated_ids(ratings: &[Rating]) -> HashSet<i64> {
    ratings.iter().map(|r| r.movie_id).collect()
}

fn to_recommended(features: &FeatureMatrix, scored: &[ScoredMovie]) -> Vec<RecommendedMovie> {
    scored
        .iter()
        .filter_map(|s| {
            features.movie(s.movie_id).map(|m| RecommendedMovie {
                movie_id: m.movie_id,
                movie_title: m.movie_title.clone(),
                poster_url: m.metadata.poster_url.clone(),
                similarity: Some(s.similarity),
            })
        })
        .collect()
}

fn round_seconds(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
