//! Google Gemini recommender
//!
//! Calls the `generateContent` REST endpoint with a system instruction, the
//! candidate titles and the rendered preference text, asking for a JSON reply
//! of the form `{"items": ..., "explanation": ...}`.
//!
//! API Flow:
//! 1. POST /v1beta/models/{model}:generateContent → candidates[0].content.parts[0].text
//! 2. The text part is parsed by [`parse_reply`] into a [`Suggestion`]

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    models::RecommenderIdentity,
    services::recommender::{RecommendationPrompt, Recommender, RecommenderError, Suggestion},
};

const API_KEY_HEADER: &str = "x-goog-api-key";

const FORMAT_INSTRUCTIONS: &str = r#"Respond with a JSON object with exactly two fields: "items", a string listing the recommended movie titles exactly as they appear in the candidate list, one title per line; and "explanation", a short string explaining why these movies were chosen."#;

#[derive(Clone)]
pub struct GeminiRecommender {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    identity: RecommenderIdentity,
}

// ============================================================================
// generateContent wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// JSON object the model is instructed to produce
#[derive(Debug, Deserialize)]
struct RawReply {
    items: RawItems,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawItems {
    Delimited(String),
    List(Vec<String>),
}

impl GeminiRecommender {
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        identity: RecommenderIdentity,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
            identity,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_request(prompt: &RecommendationPrompt) -> GenerateContentRequest {
        let system = format!(
            "You are a movie recommendation assistant. Recommend {} movies the user is likely to enjoy, \
             chosen only from the candidate list, and briefly explain why.",
            prompt.count
        );
        let question = format!(
            "#Format: {}\n\n#Candidates:\n{}\n\n#Question: {}",
            FORMAT_INSTRUCTIONS,
            prompt.candidates.join("\n"),
            prompt.preferences
        );

        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: question }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        }
    }
}

/// Parses the model's text reply into a [`Suggestion`]
///
/// Accepts the JSON object bare or inside a Markdown code fence. `items` may be
/// a delimited string (newlines when present, commas otherwise) or an array.
pub fn parse_reply(text: &str) -> Result<Suggestion, RecommenderError> {
    let body = strip_code_fence(text);
    let raw: RawReply = serde_json::from_str(body)
        .map_err(|e| RecommenderError::MalformedReply(e.to_string()))?;

    let titles = match raw.items {
        RawItems::Delimited(items) if items.contains('\n') => {
            items.split('\n').filter_map(clean_title).collect()
        }
        RawItems::Delimited(items) => split_on_commas(&items)
            .iter()
            .map(String::as_str)
            .filter_map(clean_title)
            .collect(),
        RawItems::List(items) => items.iter().map(String::as_str).filter_map(clean_title).collect(),
    };

    Ok(Suggestion {
        titles,
        explanation: raw.explanation.trim().to_string(),
    })
}

/// Articles the catalog moves to the end of a title, as in "Matrix, The (1999)"
const TRAILING_ARTICLES: &[&str] = &[
    "The", "A", "An", "L'", "La", "Le", "Les", "Il", "El", "Das", "Der", "Die",
];

/// Splits a comma-delimited list, keeping trailing-article titles whole
fn split_on_commas(items: &str) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();

    for fragment in items.split(',') {
        match titles.last_mut() {
            Some(previous) if is_trailing_article(fragment) => {
                previous.push(',');
                previous.push_str(fragment);
            }
            _ => titles.push(fragment.to_string()),
        }
    }

    titles
}

/// True for fragments like "The" or "The (1999)"
fn is_trailing_article(fragment: &str) -> bool {
    let fragment = fragment.trim().trim_end_matches('"').trim_end();
    let head = match fragment.rfind('(') {
        Some(open) if fragment.ends_with(')') => fragment[..open].trim_end(),
        _ => fragment,
    };
    TRAILING_ARTICLES
        .iter()
        .any(|article| head.eq_ignore_ascii_case(article))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().trim_end_matches("```").trim()
}

/// Trims list markers, numbering and quotes from one suggested title
fn clean_title(raw: &str) -> Option<String> {
    let mut title = raw.trim().trim_start_matches(['-', '*', '•']).trim_start();

    let digits = title
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(title.len());
    if digits > 0 && title[digits..].starts_with(['.', ')']) {
        title = title[digits + 1..].trim_start();
    }

    let title = title.trim_matches('"').trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[async_trait::async_trait]
impl Recommender for GeminiRecommender {
    async fn recommend(
        &self,
        prompt: &RecommendationPrompt,
    ) -> Result<Suggestion, RecommenderError> {
        let request = Self::build_request(prompt);

        tracing::debug!(
            model = %self.model,
            candidates = prompt.candidates.len(),
            "Calling Gemini generateContent"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RecommenderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| RecommenderError::MalformedReply(e.to_string()))?;

        let text = reply
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .find_map(|part| part.text)
            .ok_or_else(|| RecommenderError::MalformedReply("reply had no text part".to_string()))?;

        let suggestion = parse_reply(&text)?;

        tracing::info!(
            model = %self.model,
            suggested = suggestion.titles.len(),
            "Gemini returned suggestions"
        );

        Ok(suggestion)
    }

    fn identity(&self) -> RecommenderIdentity {
        self.identity.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, http::StatusCode, Json, Router};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn prompt() -> RecommendationPrompt {
        RecommendationPrompt {
            preferences: "The movies this user rated highly are as follows.\nToy Story: 5.0".to_string(),
            candidates: vec!["Toy Story".to_string(), "Inception".to_string()],
            count: 10,
        }
    }

    fn identity() -> RecommenderIdentity {
        RecommenderIdentity {
            id: 2,
            name: "LLM-Gemini-Prompt-v1".to_string(),
        }
    }

    /// Serves `reply` with `status` for any request and records the last request body
    async fn spawn_fake_gemini(
        status: StatusCode,
        reply: Value,
    ) -> (String, Arc<Mutex<Option<(HeaderMap, Value)>>>) {
        let seen = Arc::new(Mutex::new(None));
        let recorder = seen.clone();

        let app = Router::new().fallback(move |headers: HeaderMap, Json(body): Json<Value>| {
            let recorder = recorder.clone();
            let reply = reply.clone();
            async move {
                *recorder.lock().await = Some((headers, body));
                (status, Json(reply))
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), seen)
    }

    fn gemini_body(text: &str) -> Value {
        json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": text }] } }
            ]
        })
    }

    #[test]
    fn test_parse_reply_newline_separated() {
        let suggestion = parse_reply(
            r#"{"items": "Matrix, The (1999)\nToy Story (1995)", "explanation": "Both are classics."}"#,
        )
        .unwrap();

        assert_eq!(
            suggestion.titles,
            vec!["Matrix, The (1999)", "Toy Story (1995)"]
        );
        assert_eq!(suggestion.explanation, "Both are classics.");
    }

    #[test]
    fn test_parse_reply_comma_separated() {
        let suggestion =
            parse_reply(r#"{"items": "Inception, Matrix ,Toy Story", "explanation": ""}"#).unwrap();
        assert_eq!(suggestion.titles, vec!["Inception", "Matrix", "Toy Story"]);
    }

    #[test]
    fn test_parse_reply_comma_separated_keeps_trailing_articles() {
        let suggestion = parse_reply(
            r#"{"items": "Matrix, The (1999), Toy Story (1995), Lion King, The, A Bug's Life", "explanation": ""}"#,
        )
        .unwrap();

        assert_eq!(
            suggestion.titles,
            vec![
                "Matrix, The (1999)",
                "Toy Story (1995)",
                "Lion King, The",
                "A Bug's Life"
            ]
        );
    }

    #[test]
    fn test_parse_reply_array_in_code_fence() {
        let text = "```json\n{\"items\": [\"1. Inception\", \"- \\\"Matrix\\\"\", \"\"], \"explanation\": \"x\"}\n```";
        let suggestion = parse_reply(text).unwrap();
        assert_eq!(suggestion.titles, vec!["Inception", "Matrix"]);
    }

    #[test]
    fn test_parse_reply_rejects_unstructured_text() {
        let result = parse_reply("I recommend Inception and The Matrix.");
        assert!(matches!(result, Err(RecommenderError::MalformedReply(_))));

        let missing_items = parse_reply(r#"{"explanation": "no items"}"#);
        assert!(matches!(missing_items, Err(RecommenderError::MalformedReply(_))));
    }

    #[test]
    fn test_clean_title_keeps_numeric_titles() {
        assert_eq!(clean_title("1984 (1984)").as_deref(), Some("1984 (1984)"));
        assert_eq!(
            clean_title("2001: A Space Odyssey (1968)").as_deref(),
            Some("2001: A Space Odyssey (1968)")
        );
        assert_eq!(clean_title("3) Heat (1995)").as_deref(), Some("Heat (1995)"));
        assert_eq!(clean_title("   "), None);
    }

    #[test]
    fn test_build_request_shape() {
        let request = serde_json::to_value(GeminiRecommender::build_request(&prompt())).unwrap();

        assert_eq!(
            request["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(request["systemInstruction"]["role"].is_null());
        assert_eq!(request["contents"][0]["role"], "user");

        let question = request["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(question.contains("#Candidates:\nToy Story\nInception"));
        assert!(question.ends_with("Toy Story: 5.0"));
    }

    #[tokio::test]
    async fn test_recommend_round_trip_against_fake_server() {
        let (url, seen) = spawn_fake_gemini(
            StatusCode::OK,
            gemini_body(r#"{"items": "Inception", "explanation": "Mind-bending."}"#),
        )
        .await;

        let recommender = GeminiRecommender::new(
            "secret".to_string(),
            url,
            "gemini-test".to_string(),
            identity(),
        );
        let suggestion = recommender.recommend(&prompt()).await.unwrap();

        assert_eq!(suggestion.titles, vec!["Inception"]);
        assert_eq!(suggestion.explanation, "Mind-bending.");

        let (headers, body) = seen.lock().await.take().unwrap();
        assert_eq!(headers[API_KEY_HEADER], "secret");
        assert_eq!(body["contents"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_recommend_surfaces_error_status() {
        let (url, _) = spawn_fake_gemini(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": { "message": "quota exceeded" } }),
        )
        .await;

        let recommender =
            GeminiRecommender::new("k".to_string(), url, "gemini-test".to_string(), identity());
        let result = recommender.recommend(&prompt()).await;

        assert!(matches!(
            result,
            Err(RecommenderError::Status { status: 429, .. })
        ));
    }

    #[tokio::test]
    async fn test_recommend_without_text_part_is_malformed() {
        let (url, _) = spawn_fake_gemini(StatusCode::OK, json!({ "candidates": [] })).await;

        let recommender =
            GeminiRecommender::new("k".to_string(), url, "gemini-test".to_string(), identity());
        let result = recommender.recommend(&prompt()).await;

        assert!(matches!(result, Err(RecommenderError::MalformedReply(_))));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let recommender = GeminiRecommender::new(
            "k".to_string(),
            "https://generativelanguage.googleapis.com/".to_string(),
            "gemini-1.5-pro".to_string(),
            identity(),
        );
        assert_eq!(
            recommender.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }
}
