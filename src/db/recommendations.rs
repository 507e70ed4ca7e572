//! Historical store of generated recommendations.

use sqlx::SqlitePool;

use crate::models::{
    capture_timestamp, FeedbackUpdate, Recommendation, RecommenderIdentity, StoredRecommendation,
};

/// Persists one recommendation batch in a single transaction
///
/// The recommender identity is registered inside the same transaction. Either
/// every row is committed or none is; dropping the transaction on an error
/// path rolls it back.
pub async fn insert_batch(
    pool: &SqlitePool,
    recommender: &RecommenderIdentity,
    rows: &[Recommendation],
) -> sqlx::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO recommenders (recommender_id, name, registered_at)
        VALUES (?, ?, ?)
        ON CONFLICT (recommender_id) DO UPDATE SET name = excluded.name
        "#,
    )
    .bind(recommender.id)
    .bind(&recommender.name)
    .bind(capture_timestamp())
    .execute(&mut *tx)
    .await?;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO recommendations
                (user_id, movie_id, mean_rating, timestamp, recommender_id, recommender_name, feedback)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.user_id)
        .bind(row.movie_id)
        .bind(row.mean_rating)
        .bind(&row.timestamp)
        .bind(row.recommender_id)
        .bind(&row.recommender_name)
        .bind(&row.feedback)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        rows = rows.len(),
        recommender = %recommender.name,
        "Recommendation batch committed"
    );

    Ok(())
}

/// Persisted recommendations for a user joined with the catalog, newest batch first
pub async fn recommended_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> sqlx::Result<Vec<StoredRecommendation>> {
    sqlx::query_as::<_, StoredRecommendation>(
        r#"
        SELECT m.movie_id, m.title, m.genre, rec.mean_rating AS rating
        FROM recommendations rec
        JOIN movies m ON m.movie_id = rec.movie_id
        WHERE rec.user_id = ?
        ORDER BY rec.timestamp DESC, rec.rowid ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Raw rows for a user, oldest first
pub async fn rows_for_user(pool: &SqlitePool, user_id: i64) -> sqlx::Result<Vec<Recommendation>> {
    sqlx::query_as::<_, Recommendation>(
        r#"
        SELECT user_id, movie_id, mean_rating, timestamp, recommender_id, recommender_name, feedback
        FROM recommendations
        WHERE user_id = ?
        ORDER BY timestamp ASC, rowid ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Sets the feedback of one recommendation row
///
/// Returns `false` when no row matches the key.
pub async fn set_feedback(pool: &SqlitePool, update: &FeedbackUpdate) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE recommendations
        SET feedback = ?
        WHERE user_id = ? AND movie_id = ? AND timestamp = ?
        "#,
    )
    .bind(&update.feedback)
    .bind(update.user_id)
    .bind(update.movie_id)
    .bind(&update.timestamp)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
