use serde::{Deserialize, Serialize};

/// A user profile imported from the dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub gender: String,
    pub age: i64,
    pub occupation: String,
    pub zip_code: String,
}
