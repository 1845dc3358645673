//! HTTP handlers for the recommendation service

use crate::error::{EngineError, Result};
use crate::recommendation::HybridRecommender;
use crate::store::{RecommendationStore, RecommendationTimeLog};
use crate::types::{
    Feedback, FeedbackKind, Interaction, InteractionKind, Rating, RecommendationOutcome,
    RecommendedMovie,
};
use actix_web::{web, HttpResponse};
use hybridrec_core::HybridRecError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Shared state of the HTTP workers
pub struct AppState {
    pub recommender: Arc<HybridRecommender>,
    pub store: Arc<dyn RecommendationStore>,
    pub time_log: Arc<dyn RecommendationTimeLog>,
    /// Upper bound on one recommendation request
    pub request_timeout: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub recommendations: Vec<RecommendedMovie>,
}

impl RecommendationResponse {
    fn from_outcome(user_id: i64, outcome: RecommendationOutcome) -> Self {
        match outcome {
            RecommendationOutcome::Ranked(recommendations) => Self {
                user_id,
                message: None,
                recommendations,
            },
            RecommendationOutcome::NoRatings => Self {
                user_id,
                message: Some(RecommendationOutcome::NO_RATINGS_MESSAGE.to_string()),
                recommendations: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: i64,
    pub movie_id: i64,
    /// "like" or "dislike"
    pub feedback: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingRequest {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InteractionRequest {
    pub user_id: i64,
    pub movie_id: i64,
    /// "click" or "view"
    pub interaction_type: String,
    /// Seconds watched; only meaningful for views
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenresRequest {
    pub preferred_genres: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteMoviesRequest {
    pub favorite_movies: Vec<i64>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/api/v1")
            .route(
                "/users/{user_id}/recommendations/content",
                web::get().to(content_recommendations),
            )
            .route(
                "/users/{user_id}/recommendations/hybrid",
                web::get().to(hybrid_recommendations),
            )
            .route("/feedback", web::post().to(submit_feedback))
            .route("/ratings", web::post().to(submit_rating))
            .route("/interactions", web::post().to(submit_interaction))
            .route("/users/{user_id}/genres", web::put().to(update_genres))
            .route(
                "/users/{user_id}/favorite-movies",
                web::put().to(update_favorite_movies),
            )
            .route(
                "/users/{user_id}/favorite-movies/{movie_id}",
                web::delete().to(remove_favorite_movie),
            )
            .route(
                "/recommendation-times/summary",
                web::get().to(recommendation_time_summary),
            ),
    );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "hybridrec-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn with_timeout<F>(limit: Duration, future: F) -> Result<RecommendationOutcome>
where
    F: Future<Output = Result<RecommendationOutcome>>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| EngineError::Timeout(limit))?
}

async fn content_recommendations(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let outcome = with_timeout(
        state.request_timeout,
        state.recommender.content_based_recommendation(user_id),
    )
    .await?;

    Ok(HttpResponse::Ok().json(RecommendationResponse::from_outcome(user_id, outcome)))
}

async fn hybrid_recommendations(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let outcome = with_timeout(
        state.request_timeout,
        state.recommender.hybrid_recommendation(user_id),
    )
    .await?;

    Ok(HttpResponse::Ok().json(RecommendationResponse::from_outcome(user_id, outcome)))
}

async fn submit_feedback(
    state: web::Data<AppState>,
    request: web::Json<FeedbackRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    let feedback = Feedback {
        user_id: request.user_id,
        movie_id: request.movie_id,
        kind: request.feedback.parse::<FeedbackKind>()?,
    };

    state.store.record_feedback(&feedback).await?;
    tracing::info!(
        user_id = feedback.user_id,
        movie_id = feedback.movie_id,
        feedback = feedback.kind.as_str(),
        "Feedback recorded"
    );

    Ok(HttpResponse::Ok().json(feedback))
}

async fn submit_rating(
    state: web::Data<AppState>,
    request: web::Json<RatingRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    let rating = Rating::new(request.user_id, request.movie_id, request.rating);

    state.store.record_rating(&rating).await?;
    tracing::info!(
        user_id = rating.user_id,
        movie_id = rating.movie_id,
        rating = rating.rating,
        "Rating recorded"
    );

    Ok(HttpResponse::Created().json(rating))
}

async fn submit_interaction(
    state: web::Data<AppState>,
    request: web::Json<InteractionRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    let interaction = Interaction {
        user_id: request.user_id,
        movie_id: request.movie_id,
        kind: request.interaction_type.parse::<InteractionKind>()?,
        duration_secs: request.duration.unwrap_or(0.0),
    };

    state.store.record_interaction(&interaction).await?;
    tracing::info!(
        user_id = interaction.user_id,
        movie_id = interaction.movie_id,
        interaction = interaction.kind.as_str(),
        duration_secs = interaction.duration_secs,
        "Interaction recorded"
    );

    Ok(HttpResponse::Created().json(interaction))
}

async fn update_genres(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    request: web::Json<GenresRequest>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let genres: Vec<String> = request
        .into_inner()
        .preferred_genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();

    if genres.is_empty() {
        return Err(
            HybridRecError::validation_field("At least one genre is required", "preferred_genres")
                .into(),
        );
    }

    state.store.set_preferred_genres(user_id, &genres).await?;
    tracing::info!(user_id, count = genres.len(), "Preferred genres updated");

    Ok(HttpResponse::Ok().json(state.store.user_preferences(user_id).await?))
}

async fn update_favorite_movies(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    request: web::Json<FavoriteMoviesRequest>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let favorites = request.into_inner().favorite_movies;

    state.store.set_favorite_movies(user_id, &favorites).await?;
    tracing::info!(user_id, count = favorites.len(), "Favorite movies updated");

    Ok(HttpResponse::Ok().json(state.store.user_preferences(user_id).await?))
}

async fn remove_favorite_movie(
    state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (user_id, movie_id) = path.into_inner();

    state.store.remove_favorite_movie(user_id, movie_id).await?;
    tracing::info!(user_id, movie_id, "Favorite movie removed");

    Ok(HttpResponse::NoContent().finish())
}

async fn recommendation_time_summary(state: web::Data<AppState>) -> Result<HttpResponse> {
    let summary = state.time_log.summary().await?;
    Ok(HttpResponse::Ok().json(summary))
}
