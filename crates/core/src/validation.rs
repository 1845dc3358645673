//! Validation utilities for values crossing the service boundary

use crate::error::HybridRecError;

/// Lowest accepted rating value
pub const MIN_RATING: f32 = 1.0;

/// Highest accepted rating value
pub const MAX_RATING: f32 = 10.0;

/// Largest `top_n` a caller may request
pub const MAX_TOP_N: usize = 100;

/// Validate rating is within the canonical 1.0 to 10.0 range
///
/// # Examples
///
/// ```
/// use hybridrec_core::validation::validate_rating;
///
/// assert!(validate_rating(7.5).is_ok());
/// assert!(validate_rating(1.0).is_ok());
/// assert!(validate_rating(10.0).is_ok());
/// assert!(validate_rating(0.0).is_err());
/// assert!(validate_rating(11.0).is_err());
/// ```
pub fn validate_rating(rating: f32) -> Result<(), HybridRecError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(HybridRecError::validation_field(
            format!(
                "Rating must be between {} and {}, got {}",
                MIN_RATING, MAX_RATING, rating
            ),
            "rating",
        ))
    }
}

/// Validate a requested result size
///
/// # Examples
///
/// ```
/// use hybridrec_core::validation::validate_top_n;
///
/// assert!(validate_top_n(16).is_ok());
/// assert!(validate_top_n(0).is_err());
/// ```
pub fn validate_top_n(top_n: usize) -> Result<(), HybridRecError> {
    if (1..=MAX_TOP_N).contains(&top_n) {
        Ok(())
    } else {
        Err(HybridRecError::validation_field(
            format!("top_n must be between 1 and {}, got {}", MAX_TOP_N, top_n),
            "top_n",
        ))
    }
}

/// Validate a duration in seconds (view time or recommendation latency)
pub fn validate_duration(seconds: f64) -> Result<(), HybridRecError> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(HybridRecError::validation_field(
            format!("Duration must be a non-negative number, got {}", seconds),
            "duration",
        ))
    }
}
