use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies which model/version produced a recommendation row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommenderIdentity {
    pub id: i64,
    pub name: String,
}

/// A persisted recommendation row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Recommendation {
    pub user_id: i64,
    pub movie_id: i64,
    /// Absent when the movie had no ratings at capture time
    pub mean_rating: Option<f64>,
    pub timestamp: String,
    pub recommender_id: i64,
    pub recommender_name: String,
    pub feedback: Option<String>,
}

/// A freshly generated recommendation returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedMovie {
    pub movie_id: i64,
    pub title: String,
    pub genre: String,
    pub rating: Option<f64>,
    pub timestamp: String,
}

/// A previously persisted recommendation joined with its movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecommendation {
    pub movie_id: i64,
    pub title: String,
    pub genre: String,
    pub rating: Option<f64>,
}

/// Feedback left by a user on one recommendation row
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackUpdate {
    pub user_id: i64,
    pub movie_id: i64,
    pub timestamp: String,
    pub feedback: String,
}

/// Formats a capture instant as fixed-width RFC 3339 so stored timestamps sort lexically
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Current time formatted for the `recommendations.timestamp` column
pub fn capture_timestamp() -> String {
    format_timestamp(Utc::now())
}
