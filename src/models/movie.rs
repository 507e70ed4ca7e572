use serde::{Deserialize, Serialize};

/// A catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub movie_id: i64,
    pub title: String,
    /// Pipe-separated genre list as shipped with the dataset (e.g. "Action|Sci-Fi")
    pub genre: String,
}
