//! Data access for the recommendation engine
//!
//! `RecommendationStore` reads the per-request snapshot and accepts the user
//! signal writes (ratings, feedback, interactions, stated preferences).
//! `RecommendationTimeLog` is the append-only latency log.

use crate::error::{EngineError, Result};
use crate::types::{
    Feedback, FeedbackKind, Genre, Interaction, InteractionKind, MovieMetadata, MovieRow, Rating,
    TimingSummary, UserPreference,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hybridrec_core::validation::{validate_duration, validate_rating};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Ratings of one user, oldest first
    async fn user_ratings(&self, user_id: i64) -> Result<Vec<Rating>>;

    /// Every rating, used to train the latent model
    async fn all_ratings(&self) -> Result<Vec<Rating>>;

    async fn movies(&self) -> Result<Vec<MovieRow>>;

    /// Stated preferences; empty when the user has none on record
    async fn user_preferences(&self, user_id: i64) -> Result<UserPreference>;

    async fn user_feedback(&self, user_id: i64) -> Result<Vec<Feedback>>;

    async fn user_interactions(&self, user_id: i64) -> Result<Vec<Interaction>>;

    /// Append a rating after checking it lies in the accepted range
    async fn record_rating(&self, rating: &Rating) -> Result<()>;

    /// Insert or replace the feedback for a (user, movie) pair
    async fn record_feedback(&self, feedback: &Feedback) -> Result<()>;

    /// Append an interaction; view durations must be non-negative
    async fn record_interaction(&self, interaction: &Interaction) -> Result<()>;

    /// Replace the user's preferred genres
    async fn set_preferred_genres(&self, user_id: i64, genres: &[String]) -> Result<()>;

    /// Replace the user's favorite movies
    async fn set_favorite_movies(&self, user_id: i64, movie_ids: &[i64]) -> Result<()>;

    /// Drop one movie from the favorites; a no-op when it is not listed
    async fn remove_favorite_movie(&self, user_id: i64, movie_id: i64) -> Result<()>;
}

#[async_trait]
pub trait RecommendationTimeLog: Send + Sync {
    async fn record_duration(&self, user_id: i64, duration_secs: f64) -> Result<()>;

    async fn summary(&self) -> Result<TimingSummary>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn rating_from_row(row: &PgRow) -> std::result::Result<Rating, sqlx::Error> {
        Ok(Rating {
            user_id: row.try_get("user_id")?,
            movie_id: row.try_get("movie_id")?,
            rating: row.try_get("rating")?,
            timestamp: row.try_get::<Option<DateTime<Utc>>, _>("timestamp")?,
        })
    }

    fn movie_from_row(row: &PgRow) -> std::result::Result<MovieRow, sqlx::Error> {
        let mut genre_columns = HashMap::with_capacity(Genre::ALL.len());
        for genre in Genre::ALL {
            let name = genre.column_name();
            let underscored = name.replace(' ', "_");
            let value = row
                .try_get::<i32, _>(name)
                .or_else(|_| row.try_get::<i32, _>(underscored.as_str()));

            // An absent column is reported by the feature builder
            if let Ok(value) = value {
                genre_columns.insert(name.to_string(), value);
            }
        }

        Ok(MovieRow {
            movie_id: row.try_get("movie_id")?,
            movie_title: row.try_get("movie_title")?,
            genre_columns,
            metadata: MovieMetadata {
                release_date: row.try_get::<Option<NaiveDate>, _>("release_date")?,
                imdb_url: row.try_get("imdb_url")?,
                poster_url: row.try_get("poster_url")?,
                overview: row.try_get("overview")?,
                director: row.try_get("director")?,
                cast: row.try_get("cast")?,
            },
        })
    }
}

#[async_trait]
impl RecommendationStore for PostgresStore {
    async fn user_ratings(&self, user_id: i64) -> Result<Vec<Rating>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, movie_id, rating, "timestamp"
            FROM ratings
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(Self::rating_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(EngineError::from)
    }

    async fn all_ratings(&self) -> Result<Vec<Rating>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, movie_id, rating, "timestamp"
            FROM ratings
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(Self::rating_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(EngineError::from)
    }

    async fn movies(&self) -> Result<Vec<MovieRow>> {
        let rows = sqlx::query("SELECT * FROM movies ORDER BY movie_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(Self::movie_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(EngineError::from)
    }

    async fn user_preferences(&self, user_id: i64) -> Result<UserPreference> {
        let row = sqlx::query(
            r#"
            SELECT preferred_genres, favorite_movies
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(UserPreference {
                user_id,
                ..UserPreference::default()
            });
        };

        let genres: Option<String> = row.try_get("preferred_genres")?;
        let favorites: Option<String> = row.try_get("favorite_movies")?;
        Ok(UserPreference::from_columns(
            user_id,
            genres.as_deref(),
            favorites.as_deref(),
        ))
    }

    async fn user_feedback(&self, user_id: i64) -> Result<Vec<Feedback>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, movie_id, feedback_type
            FROM feedback
            WHERE user_id = $1
            ORDER BY updated_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut feedback = Vec::with_capacity(rows.len());
        for row in &rows {
            let kind: String = row.try_get("feedback_type")?;
            match kind.parse::<FeedbackKind>() {
                Ok(kind) => feedback.push(Feedback {
                    user_id: row.try_get("user_id")?,
                    movie_id: row.try_get("movie_id")?,
                    kind,
                }),
                Err(e) => tracing::warn!(user_id, error = %e, "Skipping feedback row"),
            }
        }
        Ok(feedback)
    }

    async fn user_interactions(&self, user_id: i64) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, movie_id, interaction_type, duration
            FROM interactions
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut interactions = Vec::with_capacity(rows.len());
        for row in &rows {
            let kind: String = row.try_get("interaction_type")?;
            match kind.parse::<InteractionKind>() {
                Ok(kind) => interactions.push(Interaction {
                    user_id: row.try_get("user_id")?,
                    movie_id: row.try_get("movie_id")?,
                    kind,
                    duration_secs: row.try_get::<Option<f64>, _>("duration")?.unwrap_or(0.0),
                }),
                Err(e) => tracing::warn!(user_id, error = %e, "Skipping interaction row"),
            }
        }
        Ok(interactions)
    }

    async fn record_rating(&self, rating: &Rating) -> Result<()> {
        validate_rating(rating.rating)?;

        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, movie_id, rating, "timestamp")
            VALUES ($1, $2, $3, COALESCE($4, NOW()))
            "#,
        )
        .bind(rating.user_id)
        .bind(rating.movie_id)
        .bind(rating.rating)
        .bind(rating.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_feedback(&self, feedback: &Feedback) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback (user_id, movie_id, feedback_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, movie_id)
            DO UPDATE SET feedback_type = EXCLUDED.feedback_type, updated_at = NOW()
            "#,
        )
        .bind(feedback.user_id)
        .bind(feedback.movie_id)
        .bind(feedback.kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_interaction(&self, interaction: &Interaction) -> Result<()> {
        validate_duration(interaction.duration_secs)?;

        sqlx::query(
            r#"
            INSERT INTO interactions (user_id, movie_id, interaction_type, duration)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(interaction.user_id)
        .bind(interaction.movie_id)
        .bind(interaction.kind.as_str())
        .bind(interaction.duration_secs)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_preferred_genres(&self, user_id: i64, genres: &[String]) -> Result<()> {
        let column = UserPreference {
            user_id,
            preferred_genres: genres.to_vec(),
            ..UserPreference::default()
        }
        .genres_column();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, preferred_genres)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET preferred_genres = EXCLUDED.preferred_genres
            "#,
        )
        .bind(user_id)
        .bind(column)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_favorite_movies(&self, user_id: i64, movie_ids: &[i64]) -> Result<()> {
        let column = UserPreference {
            user_id,
            favorite_movies: movie_ids.to_vec(),
            ..UserPreference::default()
        }
        .favorites_column();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, favorite_movies)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET favorite_movies = EXCLUDED.favorite_movies
            "#,
        )
        .bind(user_id)
        .bind(column)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_favorite_movie(&self, user_id: i64, movie_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT favorite_movies FROM users WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(());
        };

        let favorites: Option<String> = row.try_get("favorite_movies")?;
        let mut prefs = UserPreference::from_columns(user_id, None, favorites.as_deref());
        let before = prefs.favorite_movies.len();
        prefs.favorite_movies.retain(|&id| id != movie_id);

        if prefs.favorite_movies.len() != before {
            sqlx::query("UPDATE users SET favorite_movies = $2 WHERE user_id = $1")
                .bind(user_id)
                .bind(prefs.favorites_column())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl RecommendationTimeLog for PostgresStore {
    async fn record_duration(&self, user_id: i64, duration_secs: f64) -> Result<()> {
        validate_duration(duration_secs)?;

        sqlx::query(
            r#"
            INSERT INTO recommendation_times (user_id, duration_seconds)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id)
        .bind(duration_secs)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn summary(&self) -> Result<TimingSummary> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count, AVG(duration_seconds) AS average_seconds
            FROM recommendation_times
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TimingSummary {
            count: row.try_get("count")?,
            average_seconds: row.try_get("average_seconds")?,
        })
    }
}

#[derive(Debug, Default)]
struct InMemoryData {
    movies: Vec<MovieRow>,
    ratings: Vec<Rating>,
    preferences: HashMap<i64, UserPreference>,
    feedback: Vec<Feedback>,
    interactions: Vec<Interaction>,
    durations: Vec<(i64, f64)>,
}

/// In-process store for tests and local experiments
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<InMemoryData>,
    fail_time_log: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movies(mut self, movies: Vec<MovieRow>) -> Self {
        self.data.get_mut().movies = movies;
        self
    }

    pub fn with_ratings(mut self, ratings: Vec<Rating>) -> Self {
        self.data.get_mut().ratings = ratings;
        self
    }

    pub fn with_preferences(mut self, preferences: UserPreference) -> Self {
        self.data
            .get_mut()
            .preferences
            .insert(preferences.user_id, preferences);
        self
    }

    pub fn with_feedback(mut self, feedback: Vec<Feedback>) -> Self {
        self.data.get_mut().feedback = feedback;
        self
    }

    pub fn with_interactions(mut self, interactions: Vec<Interaction>) -> Self {
        self.data.get_mut().interactions = interactions;
        self
    }

    /// Make every timing log write fail
    pub fn with_failing_time_log(mut self) -> Self {
        self.fail_time_log = true;
        self
    }

    /// Durations recorded so far, in write order
    pub async fn recorded_durations(&self) -> Vec<(i64, f64)> {
        self.data.read().await.durations.clone()
    }
}

#[async_trait]
impl RecommendationStore for InMemoryStore {
    async fn user_ratings(&self, user_id: i64) -> Result<Vec<Rating>> {
        let data = self.data.read().await;
        Ok(data
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_ratings(&self) -> Result<Vec<Rating>> {
        Ok(self.data.read().await.ratings.clone())
    }

    async fn movies(&self) -> Result<Vec<MovieRow>> {
        Ok(self.data.read().await.movies.clone())
    }

    async fn user_preferences(&self, user_id: i64) -> Result<UserPreference> {
        let data = self.data.read().await;
        Ok(data
            .preferences
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| UserPreference {
                user_id,
                ..UserPreference::default()
            }))
    }

    async fn user_feedback(&self, user_id: i64) -> Result<Vec<Feedback>> {
        let data = self.data.read().await;
        Ok(data
            .feedback
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn user_interactions(&self, user_id: i64) -> Result<Vec<Interaction>> {
        let data = self.data.read().await;
        Ok(data
            .interactions
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn record_rating(&self, rating: &Rating) -> Result<()> {
        validate_rating(rating.rating)?;

        let mut rating = rating.clone();
        rating.timestamp.get_or_insert_with(Utc::now);
        self.data.write().await.ratings.push(rating);
        Ok(())
    }

    async fn record_feedback(&self, feedback: &Feedback) -> Result<()> {
        let mut data = self.data.write().await;
        data.feedback
            .retain(|f| !(f.user_id == feedback.user_id && f.movie_id == feedback.movie_id));
        data.feedback.push(feedback.clone());
        Ok(())
    }

    async fn record_interaction(&self, interaction: &Interaction) -> Result<()> {
        validate_duration(interaction.duration_secs)?;

        self.data.write().await.interactions.push(interaction.clone());
        Ok(())
    }

    async fn set_preferred_genres(&self, user_id: i64, genres: &[String]) -> Result<()> {
        let mut data = self.data.write().await;
        data.preferences
            .entry(user_id)
            .or_insert_with(|| UserPreference {
                user_id,
                ..UserPreference::default()
            })
            .preferred_genres = genres.to_vec();
        Ok(())
    }

    async fn set_favorite_movies(&self, user_id: i64, movie_ids: &[i64]) -> Result<()> {
        let mut data = self.data.write().await;
        data.preferences
            .entry(user_id)
            .or_insert_with(|| UserPreference {
                user_id,
                ..UserPreference::default()
            })
            .favorite_movies = movie_ids.to_vec();
        Ok(())
    }

    async fn remove_favorite_movie(&self, user_id: i64, movie_id: i64) -> Result<()> {
        if let Some(prefs) = self.data.write().await.preferences.get_mut(&user_id) {
            prefs.favorite_movies.retain(|&id| id != movie_id);
        }
        Ok(())
    }
}

#[async_trait]
impl RecommendationTimeLog for InMemoryStore {
    async fn record_duration(&self, user_id: i64, duration_secs: f64) -> Result<()> {
        if self.fail_time_log {
            return Err(EngineError::Store("timing log unavailable".to_string()));
        }
        validate_duration(duration_secs)?;

        self.data.write().await.durations.push((user_id, duration_secs));
        Ok(())
    }

    async fn summary(&self) -> Result<TimingSummary> {
        let data = self.data.read().await;
        let count = data.durations.len();
        let average_seconds = if count == 0 {
            None
        } else {
            Some(data.durations.iter().map(|(_, d)| d).sum::<f64>() / count as f64)
        };

        Ok(TimingSummary {
            count: count as i64,
            average_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rating_outside_range_is_rejected() {
        let store = InMemoryStore::new();

        assert!(matches!(
            store.record_rating(&Rating::new(1, 2, 0.0)).await,
            Err(EngineError::Validation(_))
        ));
        assert!(store.record_rating(&Rating::new(1, 2, 11.0)).await.is_err());
        assert!(store.record_rating(&Rating::new(1, 2, 1.0)).await.is_ok());
        assert!(store.record_rating(&Rating::new(1, 3, 10.0)).await.is_ok());

        let ratings = store.user_ratings(1).await.unwrap();
        assert_eq!(ratings.len(), 2);
        assert!(ratings.iter().all(|r| r.timestamp.is_some()));
    }

    #[tokio::test]
    async fn test_feedback_upsert_replaces() {
        let store = InMemoryStore::new();
        let like = Feedback {
            user_id: 1,
            movie_id: 5,
            kind: FeedbackKind::Like,
        };
        store.record_feedback(&like).await.unwrap();
        store
            .record_feedback(&Feedback {
                kind: FeedbackKind::Dislike,
                ..like.clone()
            })
            .await
            .unwrap();

        let feedback = store.user_feedback(1).await.unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].kind, FeedbackKind::Dislike);
    }

    #[tokio::test]
    async fn test_missing_preferences_are_empty() {
        let store = InMemoryStore::new();
        let prefs = store.user_preferences(42).await.unwrap();
        assert_eq!(prefs.user_id, 42);
        assert!(prefs.preferred_genres.is_empty());
        assert!(prefs.favorite_movies.is_empty());
    }

    #[tokio::test]
    async fn test_interactions_are_appended() {
        let store = InMemoryStore::new();
        let view = Interaction {
            user_id: 4,
            movie_id: 9,
            kind: InteractionKind::View,
            duration_secs: 120.0,
        };
        store.record_interaction(&view).await.unwrap();
        store
            .record_interaction(&Interaction {
                kind: InteractionKind::Click,
                duration_secs: 0.0,
                ..view.clone()
            })
            .await
            .unwrap();

        let interactions = store.user_interactions(4).await.unwrap();
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[0], view);
        assert!(store.user_interactions(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_view_duration_is_rejected() {
        let store = InMemoryStore::new();
        let result = store
            .record_interaction(&Interaction {
                user_id: 4,
                movie_id: 9,
                kind: InteractionKind::View,
                duration_secs: -3.0,
            })
            .await;

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert!(store.user_interactions(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preference_updates() {
        let store = InMemoryStore::new();
        store
            .set_preferred_genres(8, &["Drama".to_string(), "War".to_string()])
            .await
            .unwrap();
        store.set_favorite_movies(8, &[3, 5, 7]).await.unwrap();
        store.remove_favorite_movie(8, 5).await.unwrap();
        store.remove_favorite_movie(8, 99).await.unwrap();
        store.remove_favorite_movie(9, 3).await.unwrap();

        let prefs = store.user_preferences(8).await.unwrap();
        assert_eq!(prefs.preferred_genres, vec!["Drama", "War"]);
        assert_eq!(prefs.favorite_movies, vec![3, 7]);
        assert!(store.user_preferences(9).await.unwrap().favorite_movies.is_empty());
    }

    #[tokio::test]
    async fn test_timing_summary() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.summary().await.unwrap(),
            TimingSummary {
                count: 0,
                average_seconds: None
            }
        );

        store.record_duration(1, 0.5).await.unwrap();
        store.record_duration(2, 1.5).await.unwrap();

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average_seconds, Some(1.0));
    }

    #[tokio::test]
    async fn test_failing_time_log() {
        let store = InMemoryStore::new().with_failing_time_log();
        assert!(store.record_duration(1, 0.5).await.is_err());
        assert!(store.recorded_durations().await.is_empty());
    }
}
