mod movie;
mod rating;
mod recommendation;
mod user;

pub use movie::Movie;
pub use rating::{MeanRating, NewRating, RatedMovie, MAX_RATING, MIN_RATING};
pub use recommendation::{
    capture_timestamp, format_timestamp, FeedbackUpdate, Recommendation, RecommendedMovie,
    RecommenderIdentity, StoredRecommendation,
};
pub use user::User;
