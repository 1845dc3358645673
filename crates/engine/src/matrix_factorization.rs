//! Matrix Factorization using Alternating Least Squares (ALS)
//!
//! Explicit-rating ALS with a gradient refinement pass per iteration.
//! Decomposes the user-movie rating matrix into user and movie latent factors.

use crate::error::{EngineError, Result};
use crate::types::Rating;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// ALS configuration parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AlsConfig {
    /// Number of latent factors per user and movie
    pub rank: usize,
    /// Maximum number of iterations
    pub iterations: usize,
    /// Regularization parameter (lambda), must be positive
    pub regularization: f32,
    /// Step size of the gradient refinement
    pub learning_rate: f32,
    /// Training stops once the loss falls below this value
    pub tolerance: f32,
    /// Seed for factor initialisation; entropy when unset
    pub seed: Option<u64>,
}

impl Default for AlsConfig {
    fn default() -> Self {
        Self {
            rank: 10,
            iterations: 10,
            regularization: 0.1,
            learning_rate: 0.005,
            tolerance: 1e-4,
            seed: None,
        }
    }
}

impl AlsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(EngineError::InvalidConfig("rank must be at least 1".into()));
        }
        if !(self.regularization.is_finite() && self.regularization > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "regularization must be positive, got {}",
                self.regularization
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "learning_rate must be non-negative, got {}",
                self.learning_rate
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReport {
    pub iterations: usize,
    pub final_loss: f32,
    /// Whether the loss fell below the tolerance before the iteration cap
    pub converged: bool,
}

/// Observed ratings keyed by dense indices
#[derive(Debug, Clone, Default)]
struct RatingMatrix {
    entries: Vec<(usize, usize, f32)>,
    by_user: Vec<Vec<(usize, f32)>>,
    by_item: Vec<Vec<(usize, f32)>>,
}

enum ModelState {
    Untrained,
    Training,
    Trained {
        user_factors: Array2<f32>,
        item_factors: Array2<f32>,
    },
}

/// ALS-based matrix factorization
///
/// A model is trained once; build a fresh instance to retrain.
pub struct MatrixFactorization {
    config: AlsConfig,
    state: ModelState,
    user_index: HashMap<i64, usize>,
    item_index: HashMap<i64, usize>,
    user_ids: Vec<i64>,
    item_ids: Vec<i64>,
}

impl MatrixFactorization {
    pub fn new(config: AlsConfig) -> Self {
        Self {
            config,
            state: ModelState::Untrained,
            user_index: HashMap::new(),
            item_index: HashMap::new(),
            user_ids: Vec::new(),
            item_ids: Vec::new(),
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ModelState::Trained { .. })
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_ids.len()
    }

    /// Train on the given ratings
    ///
    /// A failed run leaves the model untrained, so `fit` may be retried.
    pub fn fit(&mut self, ratings: &[Rating]) -> Result<TrainingReport> {
        if !matches!(self.state, ModelState::Untrained) {
            return Err(EngineError::ModelAlreadyTrained);
        }
        self.config.validate()?;
        self.state = ModelState::Training;

        let matrix = self.build_matrix(ratings);
        match self.train(&matrix) {
            Ok((report, user_factors, item_factors)) => {
                tracing::info!(
                    users = self.user_ids.len(),
                    items = self.item_ids.len(),
                    ratings = matrix.entries.len(),
                    iterations = report.iterations,
                    final_loss = report.final_loss,
                    converged = report.converged,
                    "Matrix factorization trained"
                );

                self.state = ModelState::Trained {
                    user_factors,
                    item_factors,
                };
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Matrix factorization failed");
                self.state = ModelState::Untrained;
                self.user_index.clear();
                self.item_index.clear();
                self.user_ids.clear();
                self.item_ids.clear();
                Err(e)
            }
        }
    }

    fn train(&self, matrix: &RatingMatrix) -> Result<(TrainingReport, Array2<f32>, Array2<f32>)> {
        let k = self.config.rank;
        let lambda = self.config.regularization;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut user_factors =
            Array2::<f32>::from_shape_fn((self.user_ids.len(), k), |_| rng.gen_range(-0.1..0.1));
        let mut item_factors =
            Array2::<f32>::from_shape_fn((self.item_ids.len(), k), |_| rng.gen_range(-0.1..0.1));

        let mut report = TrainingReport {
            iterations: 0,
            final_loss: f32::INFINITY,
            converged: false,
        };

        for iteration in 0..self.config.iterations {
            // ALS half-step
            for (u, observed) in matrix.by_user.iter().enumerate() {
                let solved = Self::solve_factor(observed, &item_factors, lambda)
                    .map_err(|e| EngineError::Solver(format!("user factors: {}", e)))?;
                user_factors.row_mut(u).assign(&solved);
            }
            for (i, observed) in matrix.by_item.iter().enumerate() {
                let solved = Self::solve_factor(observed, &user_factors, lambda)
                    .map_err(|e| EngineError::Solver(format!("item factors: {}", e)))?;
                item_factors.row_mut(i).assign(&solved);
            }

            // Gradient half-step
            let alpha = self.config.learning_rate;
            for &(u, i, rating) in &matrix.entries {
                let user_vec = user_factors.row(u).to_owned();
                let item_vec = item_factors.row(i).to_owned();
                let error = rating - user_vec.dot(&item_vec);

                user_factors.row_mut(u).scaled_add(alpha * error, &item_vec);
                item_factors.row_mut(i).scaled_add(alpha * error, &user_vec);
            }

            let loss = Self::compute_loss(matrix, &user_factors, &item_factors, lambda);
            tracing::debug!(iteration, loss, "ALS iteration complete");

            report.iterations = iteration + 1;
            report.final_loss = loss;
            if loss < self.config.tolerance {
                report.converged = true;
                break;
            }
        }

        Ok((report, user_factors, item_factors))
    }

    /// Map ids to dense indices; repeated (user, movie) pairs keep the first rating
    fn build_matrix(&mut self, ratings: &[Rating]) -> RatingMatrix {
        let mut matrix = RatingMatrix::default();
        let mut seen = HashSet::new();

        for rating in ratings {
            if !seen.insert((rating.user_id, rating.movie_id)) {
                continue;
            }

            let user_idx = *self.user_index.entry(rating.user_id).or_insert_with(|| {
                self.user_ids.push(rating.user_id);
                matrix.by_user.push(Vec::new());
                self.user_ids.len() - 1
            });
            let item_idx = *self.item_index.entry(rating.movie_id).or_insert_with(|| {
                self.item_ids.push(rating.movie_id);
                matrix.by_item.push(Vec::new());
                self.item_ids.len() - 1
            });

            matrix.entries.push((user_idx, item_idx, rating.rating));
            matrix.by_user[user_idx].push((item_idx, rating.rating));
            matrix.by_item[item_idx].push((user_idx, rating.rating));
        }

        matrix
    }

    /// Solve (sum v v^T + lambda I) x = sum r v for one row of factors
    fn solve_factor(
        observed: &[(usize, f32)],
        fixed: &Array2<f32>,
        lambda: f32,
    ) -> std::result::Result<Array1<f32>, String> {
        let k = fixed.ncols();
        let mut a = Array2::<f64>::zeros((k, k));
        let mut b = Array1::<f64>::zeros(k);

        for &(idx, rating) in observed {
            let v = fixed.row(idx);
            for i in 0..k {
                for j in 0..k {
                    a[[i, j]] += (v[i] * v[j]) as f64;
                }
                b[i] += (rating * v[i]) as f64;
            }
        }

        for i in 0..k {
            a[[i, i]] += lambda as f64;
        }

        let x = Self::solve_least_squares(&a, &b)?;
        Ok(x.mapv(|v| v as f32))
    }

    /// Solve A * x = b by Cholesky decomposition, A symmetric positive definite
    fn solve_least_squares(
        a: &Array2<f64>,
        b: &Array1<f64>,
    ) -> std::result::Result<Array1<f64>, String> {
        let n = a.nrows();

        // A = L * L^T
        let mut l = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += l[[i, k]] * l[[j, k]];
                }

                if i == j {
                    let diag = a[[i, i]] - sum;
                    if diag <= 0.0 || diag.is_nan() {
                        return Err("matrix is not positive definite".to_string());
                    }
                    l[[i, j]] = diag.sqrt();
                } else {
                    l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
                }
            }
        }

        // L * y = b
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[[i, j]] * y[j];
            }
            y[i] = (b[i] - sum) / l[[i, i]];
        }

        // L^T * x = y
        let mut x = Array1::<f64>::zeros(n);
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += l[[j, i]] * x[j];
            }
            x[i] = (y[i] - sum) / l[[i, i]];
        }

        Ok(x)
    }

    /// Squared error over observed ratings plus L2 penalty on both factor matrices
    fn compute_loss(
        matrix: &RatingMatrix,
        user_factors: &Array2<f32>,
        item_factors: &Array2<f32>,
        lambda: f32,
    ) -> f32 {
        let squared_error: f32 = matrix
            .entries
            .iter()
            .map(|&(u, i, rating)| (rating - user_factors.row(u).dot(&item_factors.row(i))).powi(2))
            .sum();
        let penalty = user_factors.iter().map(|v| v * v).sum::<f32>()
            + item_factors.iter().map(|v| v * v).sum::<f32>();

        squared_error + lambda * penalty
    }

    fn factors(&self) -> Option<(&Array2<f32>, &Array2<f32>)> {
        match &self.state {
            ModelState::Trained {
                user_factors,
                item_factors,
            } => Some((user_factors, item_factors)),
            _ => None,
        }
    }

    /// Predicted rating, `None` if the model is untrained or either id is unseen
    pub fn predict(&self, user_id: i64, movie_id: i64) -> Option<f32> {
        let (user_factors, item_factors) = self.factors()?;
        let user_idx = self.user_index.get(&user_id)?;
        let item_idx = self.item_index.get(&movie_id)?;

        Some(user_factors.row(*user_idx).dot(&item_factors.row(*item_idx)))
    }

    /// Top `n` movie ids for a user by predicted score, best first
    ///
    /// Unknown users get an empty list.
    pub fn recommend(&self, user_id: i64, n: usize) -> Vec<i64> {
        let Some((user_factors, item_factors)) = self.factors() else {
            return Vec::new();
        };
        let Some(&user_idx) = self.user_index.get(&user_id) else {
            return Vec::new();
        };
        if n == 0 || self.item_ids.is_empty() {
            return Vec::new();
        }

        let scores = item_factors.dot(&user_factors.row(user_idx));
        let by_score_desc =
            |a: &usize, b: &usize| scores[*b].partial_cmp(&scores[*a]).unwrap_or(Ordering::Equal);

        let mut indices: Vec<usize> = (0..scores.len()).collect();
        let n = n.min(indices.len());
        if n < indices.len() {
            indices.select_nth_unstable_by(n - 1, by_score_desc);
            indices.truncate(n);
        }
        indices.sort_unstable_by(by_score_desc);

        indices.into_iter().map(|i| self.item_ids[i]).collect()
    }

    /// Root mean squared error over the ratings whose user and movie the model knows
    pub fn rmse(&self, ratings: &[Rating]) -> Option<f32> {
        let (sum, count) = ratings
            .iter()
            .filter_map(|r| self.predict(r.user_id, r.movie_id).map(|p| (r.rating - p).powi(2)))
            .fold((0.0f32, 0usize), |(sum, count), e| (sum + e, count + 1));

        if count == 0 {
            None
        } else {
            Some((sum / count as f32).sqrt())
        }
    }

    pub fn user_embedding(&self, user_id: i64) -> Option<ArrayView1<'_, f32>> {
        let (user_factors, _) = self.factors()?;
        self.user_index.get(&user_id).map(|&idx| user_factors.row(idx))
    }

    pub fn item_embedding(&self, movie_id: i64) -> Option<ArrayView1<'_, f32>> {
        let (_, item_factors) = self.factors()?;
        self.item_index.get(&movie_id).map(|&idx| item_factors.row(idx))
    }
}

/// Shuffle ratings and split off `holdout_fraction` of them for evaluation
pub fn train_test_split<R: Rng + ?Sized>(
    ratings: &[Rating],
    holdout_fraction: f32,
    rng: &mut R,
) -> (Vec<Rating>, Vec<Rating>) {
    let mut shuffled = ratings.to_vec();
    shuffled.shuffle(rng);

    let holdout = (shuffled.len() as f32 * holdout_fraction.clamp(0.0, 1.0)).round() as usize;
    let test = shuffled.split_off(shuffled.len() - holdout);
    (shuffled, test)
}
