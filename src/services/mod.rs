pub mod candidates;
pub mod prompt;
pub mod recommendations;
pub mod recommender;

pub use recommendations::{RecommendationBatch, RecommendationService};
