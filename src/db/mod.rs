pub mod catalog;
pub mod import;
pub mod ratings;
pub mod recommendations;
pub mod sqlite;

pub use sqlite::create_pool;

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    /// Fresh single-connection in-memory database with the schema applied
    pub async fn memory_pool() -> SqlitePool {
        super::create_pool("sqlite::memory:", 1).await.unwrap()
    }

    /// Users 1, 2 and 42 plus a three-movie catalog
    pub async fn seeded_pool() -> SqlitePool {
        let pool = memory_pool().await;

        for user_id in [1_i64, 2, 42] {
            sqlx::query(
                "INSERT INTO users (user_id, gender, age, occupation, zip_code) VALUES (?, 'F', 25, '4', '48067')",
            )
            .bind(user_id)
            .execute(&pool)
            .await
            .unwrap();
        }

        for (movie_id, title, genre) in [
            (1_i64, "Toy Story", "Animation"),
            (2, "Matrix", "Action"),
            (3, "Inception", "Sci-Fi"),
        ] {
            sqlx::query("INSERT INTO movies (movie_id, title, genre) VALUES (?, ?, ?)")
                .bind(movie_id)
                .bind(title)
                .bind(genre)
                .execute(&pool)
                .await
                .unwrap();
        }

        pool
    }

    pub async fn insert_rating(pool: &SqlitePool, user_id: i64, movie_id: i64, rating: f64) {
        sqlx::query("INSERT INTO ratings (user_id, movie_id, rating, timestamp) VALUES (?, ?, ?, 0)")
            .bind(user_id)
            .bind(movie_id)
            .bind(rating)
            .execute(pool)
            .await
            .unwrap();
    }
}
