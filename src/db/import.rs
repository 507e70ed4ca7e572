//! One-time import of the MovieLens-1M `.dat` files.
//!
//! Each file is `::`-separated and latin-1 encoded:
//!
//! - `users.dat`: `UserID::Gender::Age::Occupation::Zip-code`
//! - `movies.dat`: `MovieID::Title::Genres`
//! - `ratings.dat`: `UserID::MovieID::Rating::Timestamp`
//!
//! A table is only imported while it is empty, so restarting with the same
//! directory is a no-op.

use std::path::Path;

use anyhow::Context;
use sqlx::SqlitePool;

use crate::models::{Movie, User};

const FIELD_SEPARATOR: &str = "::";

/// Rows written per table
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: u64,
    pub movies: u64,
    pub ratings: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DatasetRating {
    user_id: i64,
    movie_id: i64,
    rating: f64,
    timestamp: i64,
}

fn parse_user(line: &str) -> Option<User> {
    let mut fields = line.split(FIELD_SEPARATOR);
    let user = User {
        user_id: fields.next()?.trim().parse().ok()?,
        gender: fields.next()?.trim().to_string(),
        age: fields.next()?.trim().parse().ok()?,
        occupation: fields.next()?.trim().to_string(),
        zip_code: fields.next()?.trim().to_string(),
    };
    fields.next().is_none().then_some(user)
}

fn parse_movie(line: &str) -> Option<Movie> {
    let mut fields = line.split(FIELD_SEPARATOR);
    let movie = Movie {
        movie_id: fields.next()?.trim().parse().ok()?,
        title: fields.next()?.trim().to_string(),
        genre: fields.next()?.trim().to_string(),
    };
    (fields.next().is_none() && !movie.title.is_empty()).then_some(movie)
}

fn parse_rating(line: &str) -> Option<DatasetRating> {
    let mut fields = line.split(FIELD_SEPARATOR);
    let rating = DatasetRating {
        user_id: fields.next()?.trim().parse().ok()?,
        movie_id: fields.next()?.trim().parse().ok()?,
        rating: fields.next()?.trim().parse().ok()?,
        timestamp: fields.next()?.trim().parse().ok()?,
    };
    fields.next().is_none().then_some(rating)
}

/// Reads a dataset file, decoding each byte as one latin-1 character
async fn read_dataset_file(path: &Path) -> anyhow::Result<Option<String>> {
    if !tokio::fs::try_exists(path).await? {
        tracing::warn!(path = %path.display(), "Dataset file not found, skipping");
        return Ok(None);
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Some(decode_latin1(&bytes)))
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

async fn table_is_empty(pool: &SqlitePool, table: &str) -> anyhow::Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count == 0)
}

fn non_blank_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents.lines().filter(|line| !line.trim().is_empty())
}

fn warn_skipped(path: &Path, skipped: usize) {
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "Skipped malformed dataset lines");
    }
}

async fn import_users(pool: &SqlitePool, path: &Path) -> anyhow::Result<u64> {
    let Some(contents) = read_dataset_file(path).await? else {
        return Ok(0);
    };

    let mut tx = pool.begin().await?;
    let (mut imported, mut skipped) = (0, 0);

    for line in non_blank_lines(&contents) {
        let Some(user) = parse_user(line) else {
            skipped += 1;
            continue;
        };

        imported += sqlx::query(
            "INSERT OR IGNORE INTO users (user_id, gender, age, occupation, zip_code) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.user_id)
        .bind(&user.gender)
        .bind(user.age)
        .bind(&user.occupation)
        .bind(&user.zip_code)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    warn_skipped(path, skipped);
    Ok(imported)
}

async fn import_movies(pool: &SqlitePool, path: &Path) -> anyhow::Result<u64> {
    let Some(contents) = read_dataset_file(path).await? else {
        return Ok(0);
    };

    let mut tx = pool.begin().await?;
    let (mut imported, mut skipped) = (0, 0);

    for line in non_blank_lines(&contents) {
        let Some(movie) = parse_movie(line) else {
            skipped += 1;
            continue;
        };

        imported += sqlx::query("INSERT OR IGNORE INTO movies (movie_id, title, genre) VALUES (?, ?, ?)")
            .bind(movie.movie_id)
            .bind(&movie.title)
            .bind(&movie.genre)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    tx.commit().await?;
    warn_skipped(path, skipped);
    Ok(imported)
}

async fn import_ratings(pool: &SqlitePool, path: &Path) -> anyhow::Result<u64> {
    let Some(contents) = read_dataset_file(path).await? else {
        return Ok(0);
    };

    let mut tx = pool.begin().await?;
    let (mut imported, mut skipped) = (0, 0);

    for line in non_blank_lines(&contents) {
        let Some(rating) = parse_rating(line) else {
            skipped += 1;
            continue;
        };

        // Dangling references are dropped rather than aborting the whole file.
        imported += sqlx::query(
            r#"
            INSERT OR IGNORE INTO ratings (user_id, movie_id, rating, timestamp)
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (SELECT 1 FROM users WHERE user_id = ?1)
              AND EXISTS (SELECT 1 FROM movies WHERE movie_id = ?2)
            "#,
        )
        .bind(rating.user_id)
        .bind(rating.movie_id)
        .bind(rating.rating)
        .bind(rating.timestamp)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    warn_skipped(path, skipped);
    Ok(imported)
}

/// Imports users, movies and ratings from a MovieLens directory
pub async fn import_movielens(pool: &SqlitePool, dir: &Path) -> anyhow::Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    if table_is_empty(pool, "users").await? {
        summary.users = import_users(pool, &dir.join("users.dat")).await?;
    }
    if table_is_empty(pool, "movies").await? {
        summary.movies = import_movies(pool, &dir.join("movies.dat")).await?;
    }
    if table_is_empty(pool, "ratings").await? {
        summary.ratings = import_ratings(pool, &dir.join("ratings.dat")).await?;
    }

    tracing::info!(
        dir = %dir.display(),
        users = summary.users,
        movies = summary.movies,
        ratings = summary.ratings,
        "MovieLens import finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{catalog, ratings, test_support::memory_pool};

    #[test]
    fn test_parse_user() {
        let user = parse_user("1::F::1::10::48067").unwrap();
        assert_eq!(user.user_id, 1);
        assert_eq!(user.gender, "F");
        assert_eq!(user.age, 1);
        assert_eq!(user.occupation, "10");
        assert_eq!(user.zip_code, "48067");
    }

    #[test]
    fn test_parse_movie_keeps_commas_in_title() {
        let movie = parse_movie("2571::Matrix, The (1999)::Action|Sci-Fi|Thriller").unwrap();
        assert_eq!(movie.movie_id, 2571);
        assert_eq!(movie.title, "Matrix, The (1999)");
        assert_eq!(movie.genre, "Action|Sci-Fi|Thriller");
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_user("1::F::one::10::48067").is_none());
        assert!(parse_movie("1::Toy Story (1995)").is_none());
        assert!(parse_rating("1::1193::5").is_none());
        assert!(parse_rating("1::1193::5::978300760::extra").is_none());
    }

    #[test]
    fn test_parse_rating() {
        let rating = parse_rating("1::1193::5::978300760").unwrap();
        assert_eq!(
            rating,
            DatasetRating {
                user_id: 1,
                movie_id: 1193,
                rating: 5.0,
                timestamp: 978_300_760,
            }
        );
    }

    #[tokio::test]
    async fn test_import_movielens_directory() {
        let dir = std::env::temp_dir().join(format!("movielens-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("users.dat"), "1::F::1::10::48067\n2::M::56::16::70072\n")
            .await
            .unwrap();
        // Latin-1 byte 0xE9 in the second title.
        let mut movies = b"1::Toy Story (1995)::Animation|Children's|Comedy\n".to_vec();
        movies.extend_from_slice(b"2::Am\xe9lie (2001)::Comedy|Romance\nbroken line\n");
        tokio::fs::write(dir.join("movies.dat"), movies).await.unwrap();
        tokio::fs::write(
            dir.join("ratings.dat"),
            "1::1::5::978300760\n2::1::3::978300761\n2::99::4::978300762\n",
        )
        .await
        .unwrap();

        let pool = memory_pool().await;
        let summary = import_movielens(&pool, &dir).await.unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                users: 2,
                movies: 2,
                ratings: 2,
            }
        );
        assert_eq!(catalog::find_movies(&pool, "toy").await.unwrap().len(), 1);
        let amelie = catalog::find_movies(&pool, "amélie").await.unwrap();
        assert_eq!(amelie.len(), 1);
        assert_eq!(amelie[0].title, "Amélie (2001)");
        let means = ratings::mean_ratings(&pool, &[1]).await.unwrap();
        assert_eq!(means.get(&1), Some(&4.0));

        let again = import_movielens(&pool, &dir).await.unwrap();
        assert_eq!(again, ImportSummary::default());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
