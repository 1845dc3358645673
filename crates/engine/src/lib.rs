//! HybridRec recommendation engine
//!
//! Content-based scoring over genre vectors combined with an ALS latent
//! factor model, plus the HTTP handlers of the `hybridrec-service` binary.

pub mod content_based;
pub mod error;
pub mod features;
pub mod feedback;
pub mod handlers;
pub mod matrix_factorization;
pub mod profile;
pub mod recommendation;
pub mod store;
pub mod types;

// Re-export key types
pub use content_based::{cosine_similarity, ContentScorer};
pub use error::{EngineError, Result};
pub use features::FeatureMatrix;
pub use feedback::FeedbackAdjuster;
pub use handlers::{configure_routes, AppState};
pub use matrix_factorization::{train_test_split, AlsConfig, MatrixFactorization, TrainingReport};
pub use profile::{UserProfile, UserProfileBuilder};
pub use recommendation::{fuse, HybridRecommender, HybridSnapshot};
pub use store::{InMemoryStore, PostgresStore, RecommendationStore, RecommendationTimeLog};
pub use types::*;

use hybridrec_core::{parse_env_var, ConfigLoader, HybridRecError};

/// Engine configuration
///
/// # Environment Variables
///
/// - `HYBRIDREC_ALS_RANK` (default: 10)
/// - `HYBRIDREC_ALS_ITERATIONS` (default: 10)
/// - `HYBRIDREC_ALS_REGULARIZATION` (default: 0.1)
/// - `HYBRIDREC_ALS_LEARNING_RATE` (default: 0.005)
/// - `HYBRIDREC_ALS_TOLERANCE` (default: 1e-4)
/// - `HYBRIDREC_ALS_SEED` (optional): fixed seed for initialisation and the holdout split
/// - `HYBRIDREC_ALS_HOLDOUT_FRACTION` (default: 0.2): share of ratings held out for RMSE
/// - `HYBRIDREC_CONTENT_TOP_N` (default: 6)
/// - `HYBRIDREC_HYBRID_TOP_N` (default: 16)
/// - `HYBRIDREC_LATENT_TOP_N` (default: 16)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub als: AlsConfig,
    pub holdout_fraction: f32,
    /// Length of the content-only list
    pub content_top_n: usize,
    /// Length of the fused list and of its content part
    pub hybrid_top_n: usize,
    /// Number of latent candidates requested from the model
    pub latent_top_n: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            als: AlsConfig::default(),
            holdout_fraction: 0.2,
            content_top_n: 6,
            hybrid_top_n: 16,
            latent_top_n: 16,
        }
    }
}

impl ConfigLoader for EngineConfig {
    fn from_env() -> std::result::Result<Self, HybridRecError> {
        let defaults = EngineConfig::default();

        let seed = match std::env::var("HYBRIDREC_ALS_SEED") {
            Ok(value) => Some(value.parse::<u64>().map_err(|e| {
                HybridRecError::configuration(
                    format!("Failed to parse HYBRIDREC_ALS_SEED: {}", e),
                    "HYBRIDREC_ALS_SEED",
                )
            })?),
            Err(_) => None,
        };

        let als = AlsConfig {
            rank: parse_env_var("HYBRIDREC_ALS_RANK", defaults.als.rank)?,
            iterations: parse_env_var("HYBRIDREC_ALS_ITERATIONS", defaults.als.iterations)?,
            regularization: parse_env_var(
                "HYBRIDREC_ALS_REGULARIZATION",
                defaults.als.regularization,
            )?,
            learning_rate: parse_env_var(
                "HYBRIDREC_ALS_LEARNING_RATE",
                defaults.als.learning_rate,
            )?,
            tolerance: parse_env_var("HYBRIDREC_ALS_TOLERANCE", defaults.als.tolerance)?,
            seed,
        };

        Ok(Self {
            als,
            holdout_fraction: parse_env_var(
                "HYBRIDREC_ALS_HOLDOUT_FRACTION",
                defaults.holdout_fraction,
            )?,
            content_top_n: parse_env_var("HYBRIDREC_CONTENT_TOP_N", defaults.content_top_n)?,
            hybrid_top_n: parse_env_var("HYBRIDREC_HYBRID_TOP_N", defaults.hybrid_top_n)?,
            latent_top_n: parse_env_var("HYBRIDREC_LATENT_TOP_N", defaults.latent_top_n)?,
        })
    }

    fn validate(&self) -> std::result::Result<(), HybridRecError> {
        self.als.validate().map_err(|e| {
            HybridRecError::ConfigurationError {
                message: e.to_string(),
                key: None,
            }
        })?;

        if !(0.0..1.0).contains(&self.holdout_fraction) {
            return Err(HybridRecError::configuration(
                format!(
                    "holdout_fraction must be in [0, 1), got {}",
                    self.holdout_fraction
                ),
                "HYBRIDREC_ALS_HOLDOUT_FRACTION",
            ));
        }

        for (value, key) in [
            (self.content_top_n, "HYBRIDREC_CONTENT_TOP_N"),
            (self.hybrid_top_n, "HYBRIDREC_HYBRID_TOP_N"),
            (self.latent_top_n, "HYBRIDREC_LATENT_TOP_N"),
        ] {
            hybridrec_core::validation::validate_top_n(value)
                .map_err(|e| HybridRecError::configuration(e.to_string(), key))?;
        }

        Ok(())
    }
}
