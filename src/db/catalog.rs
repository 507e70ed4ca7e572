//! Read-only access to the movie and user reference tables.

use sqlx::SqlitePool;

use crate::models::Movie;

/// Case-insensitive substring search over title or genre
///
/// Folding happens in Rust because SQLite's `lower()` only handles ASCII.
/// An empty catalog or a query with no hits yields an empty list.
pub async fn find_movies(pool: &SqlitePool, query: &str) -> sqlx::Result<Vec<Movie>> {
    let needle = query.to_lowercase();

    Ok(list_all_movies(pool)
        .await?
        .into_iter()
        .filter(|movie| {
            movie.title.to_lowercase().contains(&needle)
                || movie.genre.to_lowercase().contains(&needle)
        })
        .collect())
}

/// Returns the full catalog
pub async fn list_all_movies(pool: &SqlitePool) -> sqlx::Result<Vec<Movie>> {
    sqlx::query_as::<_, Movie>("SELECT movie_id, title, genre FROM movies ORDER BY movie_id")
        .fetch_all(pool)
        .await
}

pub async fn user_exists(pool: &SqlitePool, user_id: i64) -> sqlx::Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn movie_exists(pool: &SqlitePool, movie_id: i64) -> sqlx::Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM movies WHERE movie_id = ?")
        .bind(movie_id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}
