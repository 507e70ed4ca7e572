use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::{db::catalog, models::Movie};

/// In-process copy of the catalog offered to the recommender as its candidate set
///
/// Loaded on first use and replaced only through [`CandidateCache::refresh`].
/// An empty catalog is never cached, so a later import is picked up on the
/// next request.
#[derive(Clone, Default)]
pub struct CandidateCache {
    movies: Arc<RwLock<Option<Arc<Vec<Movie>>>>>,
}

impl CandidateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reloads the catalog from the store and replaces the cached copy
    pub async fn refresh(&self, pool: &SqlitePool) -> sqlx::Result<Arc<Vec<Movie>>> {
        let movies = Arc::new(catalog::list_all_movies(pool).await?);

        let mut cached = self.movies.write().await;
        *cached = (!movies.is_empty()).then(|| movies.clone());

        tracing::info!(candidates = movies.len(), "Candidate cache refreshed");

        Ok(movies)
    }

    /// Returns the cached catalog, loading it when nothing is cached yet
    pub async fn get_or_load(&self, pool: &SqlitePool) -> sqlx::Result<Arc<Vec<Movie>>> {
        let cached = self.movies.read().await.clone();
        if let Some(movies) = cached {
            return Ok(movies);
        }

        self.refresh(pool).await
    }
}

/// Maps suggested titles back to catalog entries
///
/// Matching is case-insensitive: an equal title wins, otherwise the shortest
/// catalog title containing the suggestion (lowest id on ties). Suggestions
/// that match nothing are dropped and each movie appears at most once, in
/// suggestion order.
pub fn resolve_titles(suggested: &[String], catalog: &[Movie]) -> Vec<Movie> {
    let lowered: Vec<String> = catalog.iter().map(|m| m.title.to_lowercase()).collect();
    let mut resolved: Vec<Movie> = Vec::new();

    for title in suggested {
        let needle = title.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }

        let exact = catalog
            .iter()
            .zip(&lowered)
            .filter(|(_, candidate)| **candidate == needle)
            .map(|(movie, _)| movie)
            .min_by_key(|movie| movie.movie_id);

        let matched = exact.or_else(|| {
            catalog
                .iter()
                .zip(&lowered)
                .filter(|(_, candidate)| candidate.contains(&needle))
                .map(|(movie, _)| movie)
                .min_by_key(|movie| (movie.title.len(), movie.movie_id))
        });

        match matched {
            Some(movie) if !resolved.iter().any(|r| r.movie_id == movie.movie_id) => {
                resolved.push(movie.clone());
            }
            Some(_) => {}
            None => tracing::debug!(title = %title, "Suggested title not in catalog"),
        }
    }

    resolved
}
