use std::time::Duration;

use serde::Deserialize;

use crate::{models::RecommenderIdentity, services::recommendations::DEFAULT_RECOMMENDER_TIMEOUT};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database URL; the file is created when missing
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Gemini API key
    pub gemini_api_key: String,

    /// Gemini API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Identity stamped on every recommendation row
    #[serde(default = "default_recommender_id")]
    pub recommender_id: i64,

    #[serde(default = "default_recommender_name")]
    pub recommender_name: String,

    /// Upper bound on one recommender call, in seconds
    #[serde(default = "default_recommender_timeout_secs")]
    pub recommender_timeout_secs: u64,

    /// Number of movies the recommender is asked for
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: usize,

    /// Comma-separated list of origins allowed by CORS
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,

    /// Directory holding MovieLens `.dat` files to import at startup
    #[serde(default)]
    pub movielens_dir: Option<String>,
}

fn default_database_url() -> String {
    "sqlite://movies.db".to_string()
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_recommender_id() -> i64 {
    2
}

fn default_recommender_name() -> String {
    "LLM-Gemini-Prompt-v1".to_string()
}

fn default_recommender_timeout_secs() -> u64 {
    DEFAULT_RECOMMENDER_TIMEOUT.as_secs()
}

fn default_recommendation_count() -> usize {
    10
}

fn default_cors_allowed_origins() -> String {
    "http://localhost:5173,http://127.0.0.1:5173".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn recommender_identity(&self) -> RecommenderIdentity {
        RecommenderIdentity {
            id: self.recommender_id,
            name: self.recommender_name.clone(),
        }
    }

    pub fn recommender_timeout(&self) -> Duration {
        Duration::from_secs(self.recommender_timeout_secs)
    }

    /// Allowed CORS origins, blanks removed
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter::<_, Config>(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn test_defaults_apply() {
        let config = from_pairs(&[("GEMINI_API_KEY", "key")]).unwrap();

        assert_eq!(config.database_url, "sqlite://movies.db");
        assert_eq!(config.port, 8000);
        assert_eq!(config.gemini_model, "gemini-1.5-pro");
        assert_eq!(config.recommender_timeout(), Duration::from_secs(30));
        assert_eq!(config.recommendation_count, 10);
        assert_eq!(
            config.recommender_identity(),
            RecommenderIdentity {
                id: 2,
                name: "LLM-Gemini-Prompt-v1".to_string(),
            }
        );
        assert!(config.movielens_dir.is_none());
    }

    #[test]
    fn test_api_key_is_required() {
        assert!(from_pairs(&[]).is_err());
    }

    #[test]
    fn test_cors_origins_are_split_and_trimmed() {
        let config = from_pairs(&[
            ("GEMINI_API_KEY", "key"),
            (
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:5173, https://movies.example.com ,",
            ),
        ])
        .unwrap();

        assert_eq!(
            config.cors_origins(),
            vec!["http://localhost:5173", "https://movies.example.com"]
        );
    }
}
