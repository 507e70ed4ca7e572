use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Lowest rating a user may submit
pub const MIN_RATING: f64 = 0.5;

/// Highest rating a user may submit
pub const MAX_RATING: f64 = 5.0;

/// A rating submitted by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewRating {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f64,
    /// Unix timestamp (seconds) supplied by the client
    pub timestamp: i64,
}

impl NewRating {
    /// Checks the rating value against the accepted range
    pub fn validate(&self) -> AppResult<()> {
        if !self.rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(AppError::InvalidInput(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        Ok(())
    }
}

/// A stored rating joined with its movie's title and genre
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RatedMovie {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: f64,
    pub title: String,
    pub genre: String,
    pub timestamp: i64,
}

/// Mean of all ratings a movie received, rounded to one decimal
#[derive(Debug, Clone, Copy, PartialEq, sqlx::FromRow)]
pub struct MeanRating {
    pub movie_id: i64,
    pub mean_rating: f64,
}
