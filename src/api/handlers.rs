use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    db::{catalog, ratings, recommendations},
    error::{AppError, AppResult},
    middleware::request_id::{record_user_id, RequestId},
    models::{FeedbackUpdate, Movie, NewRating, RatedMovie, RecommendedMovie, StoredRecommendation},
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendedParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// A user ID sent as either a JSON string or a number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserIdField {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct UserIdRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<UserIdField>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RatingHistoryResponse {
    pub message: String,
    pub rating_history: Vec<RatedMovie>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub message: String,
    pub explanation: String,
    #[serde(rename = "movieInfo")]
    pub movie_info: Vec<RecommendedMovie>,
}

/// Parses a required integer user ID
fn parse_user_id(raw: Option<&str>) -> AppResult<i64> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(AppError::InvalidInput("userId is required".to_string()));
    }
    raw.parse()
        .map_err(|_| AppError::InvalidInput("userId must be an integer".to_string()))
}

impl UserIdRequest {
    fn user_id(&self) -> AppResult<i64> {
        match &self.user_id {
            Some(UserIdField::Number(id)) => Ok(*id),
            Some(UserIdField::Text(text)) => parse_user_id(Some(text.as_str())),
            None => parse_user_id(None),
        }
    }
}

// Handlers

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the LLM-based Movie Recommendation System"
    }))
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Searches the catalog by title or genre
pub async fn search_movies(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Movie>>> {
    let query = params.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::InvalidInput("query must not be empty".to_string()));
    }

    let movies = catalog::find_movies(&state.db_pool, query).await?;

    tracing::info!(
        request_id = %request_id,
        query = %query,
        results = movies.len(),
        "Movie search"
    );

    Ok(Json(movies))
}

/// Returns the user's top-rated movies
pub async fn rating_history(
    State(state): State<AppState>,
    payload: Result<Json<UserIdRequest>, JsonRejection>,
) -> AppResult<Json<RatingHistoryResponse>> {
    let Json(request) = payload?;
    let user_id = request.user_id()?;
    record_user_id(user_id);

    let history =
        ratings::top_rated_by_user(&state.db_pool, user_id, ratings::TOP_RATED_LIMIT).await?;

    let message = if history.is_empty() {
        "No rating history."
    } else {
        "Rating history loaded successfully."
    };

    Ok(Json(RatingHistoryResponse {
        message: message.to_string(),
        rating_history: history,
    }))
}

/// Records one rating
pub async fn create_rating(
    State(state): State<AppState>,
    payload: Result<Json<NewRating>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let Json(rating) = payload?;
    record_user_id(rating.user_id);
    ratings::record_rating(&state.db_pool, &rating).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Rating added successfully".to_string(),
        }),
    ))
}

/// Generates and persists a recommendation batch
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<UserIdRequest>, JsonRejection>,
) -> AppResult<Json<RecommendResponse>> {
    let Json(request) = payload?;
    let user_id = request.user_id()?;
    record_user_id(user_id);

    tracing::info!(request_id = %request_id, user_id, "Processing recommendation request");

    let batch = state.recommendations.generate(user_id).await?;

    let message = if batch.movies.is_empty() {
        "No recommended movies matched the catalog."
    } else {
        "Recommendations added successfully."
    };

    Ok(Json(RecommendResponse {
        message: message.to_string(),
        explanation: batch.explanation,
        movie_info: batch.movies,
    }))
}

/// Lists persisted recommendations for a user
pub async fn recommended(
    State(state): State<AppState>,
    Query(params): Query<RecommendedParams>,
) -> AppResult<Json<Vec<StoredRecommendation>>> {
    let user_id = parse_user_id(params.user_id.as_deref())?;
    record_user_id(user_id);
    let stored = recommendations::recommended_for_user(&state.db_pool, user_id).await?;
    Ok(Json(stored))
}

/// Attaches feedback to one persisted recommendation
pub async fn record_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackUpdate>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(update) = payload?;
    record_user_id(update.user_id);
    if update.feedback.trim().is_empty() {
        return Err(AppError::InvalidInput("feedback must not be empty".to_string()));
    }

    if !recommendations::set_feedback(&state.db_pool, &update).await? {
        return Err(AppError::InvalidInput(format!(
            "no recommendation of movie {} for user {} at {}",
            update.movie_id, update.user_id, update.timestamp
        )));
    }

    Ok(Json(MessageResponse {
        message: "Feedback recorded successfully".to_string(),
    }))
}
