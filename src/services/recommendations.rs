use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::SqlitePool;

use crate::{
    db::{catalog, ratings, recommendations},
    models::{capture_timestamp, Recommendation, RecommendedMovie},
    services::{
        candidates::{resolve_titles, CandidateCache},
        prompt::render_preferences,
        recommender::{RecommendationPrompt, Recommender, RecommenderError},
    },
};

/// Upper bound on one external recommender call
pub const DEFAULT_RECOMMENDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures of a recommendation run
///
/// Every variant means no row of the batch was committed.
#[derive(thiserror::Error, Debug)]
pub enum RecommendError {
    #[error("user {0} does not exist")]
    UnknownUser(i64),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("recommender error: {0}")]
    Recommender(#[from] RecommenderError),
}

/// Outcome of one recommendation run
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationBatch {
    pub explanation: String,
    pub movies: Vec<RecommendedMovie>,
}

/// Produces and persists personalized recommendation batches
pub struct RecommendationService {
    db_pool: SqlitePool,
    recommender: Arc<dyn Recommender>,
    candidates: CandidateCache,
    timeout: Duration,
    count: usize,
}

impl RecommendationService {
    pub fn new(
        db_pool: SqlitePool,
        recommender: Arc<dyn Recommender>,
        timeout: Duration,
        count: usize,
    ) -> Self {
        Self {
            db_pool,
            recommender,
            candidates: CandidateCache::new(),
            timeout,
            count,
        }
    }

    /// Reloads the candidate set from the catalog, returning its size
    pub async fn refresh_candidates(&self) -> Result<usize, RecommendError> {
        Ok(self.candidates.refresh(&self.db_pool).await?.len())
    }

    /// Generates a recommendation batch for one user
    ///
    /// 1. Top-rated history is rendered into the preference text (an empty
    ///    history still produces a prompt)
    /// 2. The cached catalog is offered as the closed candidate set
    /// 3. The recommender is called under [`Self::timeout`]
    /// 4. Suggested titles are resolved against the catalog and paired with
    ///    their mean rating
    /// 5. All rows are written in one transaction, opened only after the
    ///    external call returned
    pub async fn generate(&self, user_id: i64) -> Result<RecommendationBatch, RecommendError> {
        let start = Instant::now();

        if !catalog::user_exists(&self.db_pool, user_id).await? {
            return Err(RecommendError::UnknownUser(user_id));
        }

        let history =
            ratings::top_rated_by_user(&self.db_pool, user_id, ratings::TOP_RATED_LIMIT).await?;
        let candidates = self.candidates.get_or_load(&self.db_pool).await?;

        tracing::info!(
            user_id,
            history = history.len(),
            candidates = candidates.len(),
            "Requesting recommendations"
        );

        let prompt = RecommendationPrompt {
            preferences: render_preferences(&history),
            candidates: candidates.iter().map(|m| m.title.clone()).collect(),
            count: self.count,
        };

        let suggestion = tokio::time::timeout(self.timeout, self.recommender.recommend(&prompt))
            .await
            .map_err(|_| RecommenderError::Timeout(self.timeout))??;

        let resolved = resolve_titles(&suggestion.titles, &candidates);
        let movie_ids: Vec<i64> = resolved.iter().map(|m| m.movie_id).collect();
        let means = ratings::mean_ratings(&self.db_pool, &movie_ids).await?;

        let identity = self.recommender.identity();
        let timestamp = capture_timestamp();

        let rows: Vec<Recommendation> = resolved
            .iter()
            .map(|movie| Recommendation {
                user_id,
                movie_id: movie.movie_id,
                mean_rating: means.get(&movie.movie_id).copied(),
                timestamp: timestamp.clone(),
                recommender_id: identity.id,
                recommender_name: identity.name.clone(),
                feedback: None,
            })
            .collect();

        recommendations::insert_batch(&self.db_pool, &identity, &rows).await?;

        tracing::info!(
            user_id,
            suggested = suggestion.titles.len(),
            resolved = rows.len(),
            processing_time_ms = start.elapsed().as_millis(),
            "Recommendations generated"
        );

        let movies = resolved
            .into_iter()
            .map(|movie| RecommendedMovie {
                rating: means.get(&movie.movie_id).copied(),
                movie_id: movie.movie_id,
                title: movie.title,
                genre: movie.genre,
                timestamp: timestamp.clone(),
            })
            .collect();

        Ok(RecommendationBatch {
            explanation: suggestion.explanation,
            movies,
        })
    }
}
