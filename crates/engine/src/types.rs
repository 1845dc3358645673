//! Domain types shared by the engine components

use crate::error::EngineError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Dimensionality of the genre feature space
pub const GENRE_COUNT: usize = 19;

/// Movie genres, in feature-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Family,
    Fantasy,
    History,
    Horror,
    Music,
    Mystery,
    Romance,
    ScienceFiction,
    TvMovie,
    Thriller,
    War,
    Western,
}

impl Genre {
    pub const ALL: [Genre; GENRE_COUNT] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Family,
        Genre::Fantasy,
        Genre::History,
        Genre::Horror,
        Genre::Music,
        Genre::Mystery,
        Genre::Romance,
        Genre::ScienceFiction,
        Genre::TvMovie,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    /// Position of this genre in a feature vector
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name in the movies table
    pub fn column_name(self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Family => "Family",
            Genre::Fantasy => "Fantasy",
            Genre::History => "History",
            Genre::Horror => "Horror",
            Genre::Music => "Music",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::ScienceFiction => "Science Fiction",
            Genre::TvMovie => "TV Movie",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
        }
    }

    /// Resolve a genre from a user-supplied or column name
    ///
    /// Case-insensitive; underscores and spaces are interchangeable.
    pub fn from_name(name: &str) -> Option<Genre> {
        let normalized = name.trim().replace('_', " ");
        Genre::ALL
            .iter()
            .copied()
            .find(|g| g.column_name().eq_ignore_ascii_case(&normalized))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Descriptive movie metadata carried through to responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub release_date: Option<NaiveDate>,
    pub imdb_url: Option<String>,
    pub poster_url: Option<String>,
    pub overview: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
}

/// Movie row as read from the store, genre flags still keyed by column name
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRow {
    pub movie_id: i64,
    pub movie_title: String,
    pub genre_columns: HashMap<String, i32>,
    pub metadata: MovieMetadata,
}

impl MovieRow {
    /// Build a row with every genre column present, flagging `genres`
    pub fn with_genres(movie_id: i64, movie_title: impl Into<String>, genres: &[Genre]) -> Self {
        let genre_columns = Genre::ALL
            .iter()
            .map(|g| (g.column_name().to_string(), i32::from(genres.contains(g))))
            .collect();

        Self {
            movie_id,
            movie_title: movie_title.into(),
            genre_columns,
            metadata: MovieMetadata::default(),
        }
    }
}

/// A catalogue entry after feature extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub movie_id: i64,
    pub movie_title: String,
    pub metadata: MovieMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f32,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Rating {
    pub fn new(user_id: i64, movie_id: i64, rating: f32) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
            timestamp: None,
        }
    }
}

/// Stated user preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: i64,
    /// Genre names in the order the user listed them
    pub preferred_genres: Vec<String>,
    /// Favorite movie ids in the order the user listed them
    pub favorite_movies: Vec<i64>,
}

impl UserPreference {
    /// Parse the comma-separated columns stored on the users table
    ///
    /// Blank tokens are dropped; unparseable movie ids are skipped with a warning.
    pub fn from_columns(
        user_id: i64,
        preferred_genres: Option<&str>,
        favorite_movies: Option<&str>,
    ) -> Self {
        let preferred_genres = preferred_genres
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();

        let favorite_movies = favorite_movies
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter_map(|id| match id.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(user_id, token = %id, "Skipping unparseable favorite movie id");
                    None
                }
            })
            .collect();

        Self {
            user_id,
            preferred_genres,
            favorite_movies,
        }
    }

    /// Comma-separated form of `preferred_genres`
    pub fn genres_column(&self) -> String {
        self.preferred_genres.join(",")
    }

    /// Comma-separated form of `favorite_movies`
    pub fn favorites_column(&self) -> String {
        self.favorite_movies
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Explicit like/dislike signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Like,
    Dislike,
}

impl FeedbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::Like => "like",
            FeedbackKind::Dislike => "dislike",
        }
    }
}

impl FromStr for FeedbackKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "like" => Ok(FeedbackKind::Like),
            "dislike" => Ok(FeedbackKind::Dislike),
            other => Err(EngineError::InvalidFeedback(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub user_id: i64,
    pub movie_id: i64,
    pub kind: FeedbackKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Click,
    View,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionKind::Click => "click",
            InteractionKind::View => "view",
        }
    }
}

impl FromStr for InteractionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "click" => Ok(InteractionKind::Click),
            "view" => Ok(InteractionKind::View),
            other => Err(EngineError::InvalidInteraction(other.to_string())),
        }
    }
}

/// Implicit engagement with a movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: i64,
    pub movie_id: i64,
    pub kind: InteractionKind,
    /// Viewing time in seconds; ignored for clicks
    pub duration_secs: f64,
}

impl Interaction {
    /// Weight applied to the movie's feature vector in the profile
    pub fn weight(&self) -> f32 {
        match self.kind {
            InteractionKind::Click => 1.0,
            InteractionKind::View => (self.duration_secs / 60.0) as f32,
        }
    }
}

/// Movie id with its content similarity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredMovie {
    pub movie_id: i64,
    pub similarity: f32,
}

/// One entry of a recommendation response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedMovie {
    pub movie_id: i64,
    pub movie_title: String,
    pub poster_url: Option<String>,
    /// Absent for entries contributed only by the latent model
    pub similarity: Option<f32>,
}

/// Result of a recommendation pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationOutcome {
    Ranked(Vec<RecommendedMovie>),
    /// The user has no ratings that match the catalogue
    NoRatings,
}

impl RecommendationOutcome {
    pub const NO_RATINGS_MESSAGE: &'static str = "No ratings available for this user.";

    pub fn recommendations(&self) -> &[RecommendedMovie] {
        match self {
            RecommendationOutcome::Ranked(movies) => movies,
            RecommendationOutcome::NoRatings => &[],
        }
    }
}

/// Aggregate over the recommendation timing log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub count: i64,
    pub average_seconds: Option<f64>,
}
