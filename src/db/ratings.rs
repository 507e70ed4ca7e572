//! The rating ledger: one inserted fact per (user, movie) pair.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    db::catalog,
    error::{AppError, AppResult},
    models::{MeanRating, NewRating, RatedMovie},
};

/// Number of top-rated movies used as the preference signal
pub const TOP_RATED_LIMIT: i64 = 10;

/// Inserts a rating after validating its value and the referenced user and movie
pub async fn record_rating(pool: &SqlitePool, rating: &NewRating) -> AppResult<()> {
    rating.validate()?;

    if !catalog::user_exists(pool, rating.user_id).await? {
        return Err(AppError::UnknownReference(format!(
            "user {} does not exist",
            rating.user_id
        )));
    }

    if !catalog::movie_exists(pool, rating.movie_id).await? {
        return Err(AppError::UnknownReference(format!(
            "movie {} does not exist",
            rating.movie_id
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO ratings (user_id, movie_id, rating, timestamp)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(rating.user_id)
    .bind(rating.movie_id)
    .bind(rating.rating)
    .bind(rating.timestamp)
    .execute(pool)
    .await?;

    tracing::info!(
        user_id = rating.user_id,
        movie_id = rating.movie_id,
        rating = rating.rating,
        "Rating recorded"
    );

    Ok(())
}

/// Returns the user's highest-rated movies, best first
///
/// Equal ratings keep insertion order.
pub async fn top_rated_by_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> sqlx::Result<Vec<RatedMovie>> {
    sqlx::query_as::<_, RatedMovie>(
        r#"
        SELECT r.user_id, r.movie_id, r.rating, m.title, m.genre, r.timestamp
        FROM ratings r
        JOIN movies m ON m.movie_id = r.movie_id
        WHERE r.user_id = ?
        ORDER BY r.rating DESC, r.rowid ASC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Mean rating per movie, rounded to one decimal
///
/// Movies without any rating are absent from the map.
pub async fn mean_ratings(
    pool: &SqlitePool,
    movie_ids: &[i64],
) -> sqlx::Result<HashMap<i64, f64>> {
    if movie_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT movie_id, ROUND(AVG(rating), 1) AS mean_rating FROM ratings WHERE movie_id IN (",
    );
    let mut ids = builder.separated(", ");
    for movie_id in movie_ids {
        ids.push_bind(*movie_id);
    }
    ids.push_unseparated(") GROUP BY movie_id");

    let rows = builder
        .build_query_as::<MeanRating>()
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.movie_id, row.mean_rating))
        .collect())
}
