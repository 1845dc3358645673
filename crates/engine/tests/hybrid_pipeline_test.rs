//! End-to-end tests of the recommendation pipelines over the in-memory store

use hybridrec_engine::{
    AlsConfig, EngineConfig, FeatureMatrix, Feedback, FeedbackKind, Genre, HybridRecommender,
    InMemoryStore, MatrixFactorization, MovieRow, Rating, RecommendationOutcome,
    RecommendationStore, RecommendationTimeLog, UserPreference, UserProfileBuilder,
};
use std::collections::HashSet;
use std::sync::Arc;

const ACTION_ONE: i64 = 1;
const COMEDY_ONE: i64 = 2;
const ACTION_TWO: i64 = 3;
const COMEDY_TWO: i64 = 4;
const ACTION_ADVENTURE: i64 = 5;
const DRAMA: i64 = 6;

fn catalogue() -> Vec<MovieRow> {
    vec![
        MovieRow::with_genres(ACTION_ONE, "Action One", &[Genre::Action]),
        MovieRow::with_genres(COMEDY_ONE, "Comedy One", &[Genre::Comedy]),
        MovieRow::with_genres(ACTION_TWO, "Action Two", &[Genre::Action]),
        MovieRow::with_genres(COMEDY_TWO, "Comedy Two", &[Genre::Comedy]),
        MovieRow::with_genres(
            ACTION_ADVENTURE,
            "Action Adventure",
            &[Genre::Action, Genre::Adventure],
        ),
        MovieRow::with_genres(DRAMA, "Drama", &[Genre::Drama]),
    ]
}

fn ratings() -> Vec<Rating> {
    vec![
        Rating::new(1, ACTION_ONE, 9.0),
        Rating::new(1, COMEDY_ONE, 3.0),
        Rating::new(2, ACTION_ONE, 8.0),
        Rating::new(2, ACTION_TWO, 9.0),
        Rating::new(2, DRAMA, 4.0),
        Rating::new(3, COMEDY_ONE, 9.0),
        Rating::new(3, COMEDY_TWO, 8.0),
        Rating::new(3, ACTION_ADVENTURE, 5.0),
    ]
}

fn test_config() -> EngineConfig {
    EngineConfig {
        als: AlsConfig {
            rank: 3,
            iterations: 5,
            seed: Some(7),
            ..AlsConfig::default()
        },
        holdout_fraction: 0.0,
        ..EngineConfig::default()
    }
}

fn recommender(
    store: InMemoryStore,
    config: EngineConfig,
) -> (HybridRecommender, Arc<InMemoryStore>) {
    let store = Arc::new(store);
    (
        HybridRecommender::new(store.clone(), store.clone(), config),
        store,
    )
}

fn seeded_store() -> InMemoryStore {
    InMemoryStore::new()
        .with_movies(catalogue())
        .with_ratings(ratings())
}

#[tokio::test]
async fn test_action_fan_gets_action_first() {
    let (engine, _) = recommender(seeded_store(), test_config());

    let outcome = engine.content_based_recommendation(1).await.unwrap();
    let recs = outcome.recommendations();

    assert!(!recs.is_empty());
    assert!(recs.len() <= 6);
    assert_eq!(recs[0].movie_id, ACTION_TWO);
    assert!(recs
        .iter()
        .all(|m| m.movie_id != ACTION_ONE && m.movie_id != COMEDY_ONE));

    let similarities: Vec<f32> = recs.iter().map(|m| m.similarity.unwrap()).collect();
    assert!(similarities.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_action_preference_and_ratings_agree() {
    let movies = vec![
        MovieRow::with_genres(1, "A", &[Genre::Action]),
        MovieRow::with_genres(2, "B", &[Genre::Comedy]),
        MovieRow::with_genres(3, "C", &[Genre::Comedy]),
        MovieRow::with_genres(4, "D", &[Genre::Action]),
    ];
    let ratings = vec![Rating::new(1, 1, 10.0), Rating::new(1, 2, 2.0)];
    let preferences = UserPreference::from_columns(1, Some("Action"), None);

    let features = FeatureMatrix::build(&movies).unwrap();
    let profile = UserProfileBuilder::new(&features)
        .build(1, &ratings, &preferences, None)
        .unwrap();
    assert!(profile.vector[Genre::Action.index()] > profile.vector[Genre::Comedy.index()]);

    let store = InMemoryStore::new()
        .with_movies(movies)
        .with_ratings(ratings)
        .with_preferences(preferences);
    let (engine, _) = recommender(store, test_config());

    let outcome = engine.content_based_recommendation(1).await.unwrap();
    let recs = outcome.recommendations();
    let ids: Vec<i64> = recs.iter().map(|m| m.movie_id).collect();

    assert_eq!(ids, vec![4, 3]);
    assert!((recs[0].similarity.unwrap() - 0.9959).abs() < 1e-3);
    assert!((recs[1].similarity.unwrap() - 0.0905).abs() < 1e-3);
}

#[tokio::test]
async fn test_user_without_ratings_gets_sentinel() {
    let (engine, store) = recommender(seeded_store(), test_config());

    assert_eq!(
        engine.content_based_recommendation(42).await.unwrap(),
        RecommendationOutcome::NoRatings
    );
    assert_eq!(
        engine.hybrid_recommendation(42).await.unwrap(),
        RecommendationOutcome::NoRatings
    );
    assert!(store.recorded_durations().await.is_empty());
}

#[tokio::test]
async fn test_hybrid_list_is_unique_and_bounded() {
    let config = EngineConfig {
        hybrid_top_n: 3,
        ..test_config()
    };
    let (engine, _) = recommender(seeded_store(), config);

    let outcome = engine.hybrid_recommendation(1).await.unwrap();
    let ids: Vec<i64> = outcome.recommendations().iter().map(|m| m.movie_id).collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();

    assert_eq!(ids.len(), 3);
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test]
async fn test_hybrid_fills_with_latent_candidates() {
    let (engine, _) = recommender(seeded_store(), test_config());

    let outcome = engine.hybrid_recommendation(1).await.unwrap();
    let recs = outcome.recommendations();

    // Four unrated movies come from content scoring, the latent model adds rated ones
    assert!(recs.len() > 4);
    assert!(recs[..4].iter().all(|m| m.similarity.is_some()));
    assert!(recs[4..].iter().all(|m| m.similarity.is_none()));
}

#[tokio::test]
async fn test_dislike_demotes_movie() {
    let store = seeded_store().with_feedback(vec![Feedback {
        user_id: 1,
        movie_id: ACTION_TWO,
        kind: FeedbackKind::Dislike,
    }]);
    let (engine, _) = recommender(store, test_config());

    let outcome = engine.hybrid_recommendation(1).await.unwrap();
    let recs = outcome.recommendations();

    assert_eq!(recs[0].movie_id, ACTION_ADVENTURE);
    let demoted = recs.iter().find(|m| m.movie_id == ACTION_TWO).unwrap();
    assert!((demoted.similarity.unwrap() - 0.474_341_6).abs() < 1e-4);
}

#[tokio::test]
async fn test_like_boosts_movie() {
    let store = seeded_store().with_feedback(vec![Feedback {
        user_id: 1,
        movie_id: COMEDY_TWO,
        kind: FeedbackKind::Like,
    }]);
    let (engine, _) = recommender(store, test_config());

    let outcome = engine.hybrid_recommendation(1).await.unwrap();
    let boosted = outcome
        .recommendations()
        .iter()
        .find(|m| m.movie_id == COMEDY_TWO)
        .unwrap();

    // cos = 0.25 / sqrt(0.625), times 1.5
    assert!((boosted.similarity.unwrap() - 0.474_341_6).abs() < 1e-4);
}

#[tokio::test]
async fn test_timing_failure_does_not_fail_request() {
    let (engine, store) = recommender(seeded_store().with_failing_time_log(), test_config());

    let outcome = engine.hybrid_recommendation(1).await.unwrap();
    assert!(!outcome.recommendations().is_empty());
    assert!(store.recorded_durations().await.is_empty());
}

#[tokio::test]
async fn test_hybrid_records_rounded_duration() {
    let (engine, store) = recommender(seeded_store(), test_config());

    engine.hybrid_recommendation(1).await.unwrap();
    engine.content_based_recommendation(1).await.unwrap();

    let durations = store.recorded_durations().await;
    assert_eq!(durations.len(), 1);
    let (user_id, seconds) = durations[0];
    assert_eq!(user_id, 1);
    assert_eq!((seconds * 100.0).round() / 100.0, seconds);

    let summary = store.summary().await.unwrap();
    assert_eq!(summary.count, 1);
}

#[tokio::test]
async fn test_preferences_shift_content_ranking() {
    let store = seeded_store().with_preferences(UserPreference {
        user_id: 1,
        preferred_genres: vec!["Drama".to_string()],
        favorite_movies: vec![],
    });
    let (engine, _) = recommender(store, test_config());

    let outcome = engine.content_based_recommendation(1).await.unwrap();
    let drama = outcome
        .recommendations()
        .iter()
        .find(|m| m.movie_id == DRAMA)
        .unwrap();
    assert!(drama.similarity.unwrap() > 0.0);
}

#[tokio::test]
async fn test_new_rating_changes_profile() {
    let (engine, store) = recommender(seeded_store(), test_config());

    store.record_rating(&Rating::new(9, DRAMA, 10.0)).await.unwrap();
    let outcome = engine.content_based_recommendation(9).await.unwrap();
    assert!(matches!(outcome, RecommendationOutcome::Ranked(_)));
    assert!(outcome.recommendations().iter().all(|m| m.movie_id != DRAMA));
}

#[test]
fn test_latent_model_ignores_unknown_user() {
    let mut model = MatrixFactorization::new(test_config().als);
    model.fit(&ratings()).unwrap();

    assert!(model.recommend(999, 5).is_empty());
    assert!(model.predict(999, ACTION_ONE).is_none());
    assert_eq!(model.recommend(1, 3).len(), 3);
}
