//! External recommender abstraction
//!
//! A recommender receives a free-text summary of what the user liked plus a
//! closed list of candidate titles and answers with the titles it suggests.
//! Reply parsing stays inside each implementation so that format drift in a
//! provider never leaks past this trait.

use std::time::Duration;

use crate::models::RecommenderIdentity;

pub mod gemini;

pub use gemini::GeminiRecommender;

/// Input handed to a recommender
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationPrompt {
    /// Rendered preference summary (intro line plus `title: rating` lines)
    pub preferences: String,
    /// Titles the recommender may choose from
    pub candidates: Vec<String>,
    /// How many titles to ask for
    pub count: usize,
}

/// Strongly-typed recommender reply
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub titles: Vec<String>,
    pub explanation: String,
}

#[derive(thiserror::Error, Debug)]
pub enum RecommenderError {
    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Recommender returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Recommender timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed recommender reply: {0}")]
    MalformedReply(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Recommender: Send + Sync {
    /// Asks the external service for suggestions
    async fn recommend(
        &self,
        prompt: &RecommendationPrompt,
    ) -> Result<Suggestion, RecommenderError>;

    /// Identity stamped on every row produced from this recommender
    fn identity(&self) -> RecommenderIdentity;
}
