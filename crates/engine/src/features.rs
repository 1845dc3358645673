//! Genre feature extraction
//!
//! Turns raw movie rows into a fixed-width matrix of genre flags, one row per
//! distinct movie id, in the order the rows were read.

use crate::error::{EngineError, Result};
use crate::types::{Genre, Movie, MovieRow, GENRE_COUNT};
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::HashMap;

/// Deduplicated catalogue with its genre feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    movies: Vec<Movie>,
    vectors: Array2<f32>,
    index: HashMap<i64, usize>,
}

impl FeatureMatrix {
    /// Build features from movie rows
    ///
    /// The first row for a movie id wins. Every row must carry all genre
    /// columns; column names match with spaces or underscores.
    pub fn build(rows: &[MovieRow]) -> Result<Self> {
        let mut movies = Vec::with_capacity(rows.len());
        let mut flags = Vec::with_capacity(rows.len() * GENRE_COUNT);
        let mut index = HashMap::with_capacity(rows.len());

        for row in rows {
            if index.contains_key(&row.movie_id) {
                continue;
            }

            let columns: HashMap<String, i32> = row
                .genre_columns
                .iter()
                .map(|(name, value)| (name.replace('_', " "), *value))
                .collect();

            for genre in Genre::ALL {
                let value = columns.get(genre.column_name()).ok_or_else(|| {
                    EngineError::MissingGenreColumn {
                        movie_id: row.movie_id,
                        column: genre.column_name().to_string(),
                    }
                })?;
                flags.push(if *value != 0 { 1.0 } else { 0.0 });
            }

            index.insert(row.movie_id, movies.len());
            movies.push(Movie {
                movie_id: row.movie_id,
                movie_title: row.movie_title.clone(),
                metadata: row.metadata.clone(),
            });
        }

        let vectors = Array2::from_shape_vec((movies.len(), GENRE_COUNT), flags)
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        tracing::debug!(movies = movies.len(), "Built genre feature matrix");

        Ok(Self {
            movies,
            vectors,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Movies in data order
    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn movie(&self, movie_id: i64) -> Option<&Movie> {
        self.index.get(&movie_id).map(|&row| &self.movies[row])
    }

    /// Feature vector for a movie, if known
    pub fn vector(&self, movie_id: i64) -> Option<ArrayView1<'_, f32>> {
        self.index.get(&movie_id).map(|&row| self.vectors.row(row))
    }

    /// The full `n x GENRE_COUNT` matrix, rows in data order
    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    /// Vector width, always `GENRE_COUNT`
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// Check a vector lives in this feature space
    pub fn ensure_dimension(&self, vector: &Array1<f32>) -> Result<()> {
        if vector.len() != self.dimension() {
            return Err(EngineError::DimensionMismatch {
                expected: self.dimension(),
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
