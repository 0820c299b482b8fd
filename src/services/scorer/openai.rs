use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Candidate, Profile, RankedScore},
    services::scorer::{neutral_scores, RelevanceScorer},
};

const SYSTEM_PROMPT: &str = "You are a ranking model returning strict JSON only.";
const TEMPERATURE: f64 = 0.2;

/// Relevance scorer backed by an OpenAI-compatible chat-completions API
///
/// Issues one call per request carrying the profile summary and a compact
/// JSON line per candidate, bounded by a configured deadline. Every failure
/// mode (network, timeout, non-2xx, malformed body) degrades to neutral
/// scores; nothing propagates to the feed.
pub struct OpenAiScorer {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    deadline: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// The ranked list the model is asked to return
#[derive(Deserialize)]
struct RankedBody {
    #[serde(default)]
    ranked: Vec<RawRankedEntry>,
}

/// One untrusted entry; id and score are coerced during sanitization
#[derive(Deserialize)]
struct RawRankedEntry {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    score: serde_json::Value,
}

impl OpenAiScorer {
    pub fn new(api_key: String, api_url: String, model: String, deadline: Duration) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
            deadline,
        }
    }

    async fn rerank(&self, profile: &Profile, candidates: &[Candidate]) -> AppResult<Vec<RankedScore>> {
        let prompt = build_prompt(profile, candidates);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Scoring API returned status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response.json().await?;
        let text = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("")
            .trim()
            .to_string();

        parse_ranked(&text, candidates)
    }
}

#[async_trait::async_trait]
impl RelevanceScorer for OpenAiScorer {
    async fn score(&self, profile: &Profile, candidates: &[Candidate]) -> Vec<RankedScore> {
        if candidates.is_empty() {
            return Vec::new();
        }

        match tokio::time::timeout(self.deadline, self.rerank(profile, candidates)).await {
            Ok(Ok(scores)) => {
                tracing::info!(
                    candidates = candidates.len(),
                    scored = scores.len(),
                    model = %self.model,
                    "Relevance scoring completed"
                );
                scores
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Relevance scoring failed, using neutral scores");
                neutral_scores(candidates)
            }
            Err(_) => {
                tracing::warn!(
                    deadline_secs = self.deadline.as_secs(),
                    "Relevance scoring timed out, using neutral scores"
                );
                neutral_scores(candidates)
            }
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Builds the structured ranking prompt: profile summary plus one compact
/// JSON line per candidate.
fn build_prompt(profile: &Profile, candidates: &[Candidate]) -> String {
    let mut lines = vec![
        "You are a ranking model for book recommendations. Return strict JSON only.".to_string(),
        "User profile:".to_string(),
        format!("- Lang: {}", profile.language.as_deref().unwrap_or("")),
        format!("- Region: {}", profile.region.as_deref().unwrap_or("")),
        format!("- Favorite genres: {}", profile.genres.join(", ")),
        format!("- Favorite authors: {}", profile.favorite_authors.join(", ")),
        "Candidates (each line is one JSON):".to_string(),
    ];

    for c in candidates {
        lines.push(
            json!({
                "id": c.id,
                "title": c.title,
                "author": c.author,
                "genres": c.genres,
                "desc": c.description,
                "popularity": c.popularity,
                "recency": c.recency,
                "lang": c.language,
            })
            .to_string(),
        );
    }

    lines.push("Task:".to_string());
    lines.push(
        "Rank candidates from most to least relevant for this user. Consider language, genre \
         and author affinity, semantic fit of description, popularity and recency as tie-breakers."
            .to_string(),
    );
    lines.push(r#"Return JSON: {"ranked": [{"id": "<bookId>", "score": <0..1>}, ...]}"#.to_string());

    lines.join("\n")
}

/// Extracts and sanitizes the ranked list from the completion text
///
/// Keeps only entries whose id is in the candidate set, coerces missing or
/// invalid scores to 0.0, and truncates to the candidate count.
fn parse_ranked(text: &str, candidates: &[Candidate]) -> AppResult<Vec<RankedScore>> {
    let start = text
        .find('{')
        .ok_or_else(|| AppError::ExternalApi("No JSON object in completion".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| AppError::ExternalApi("Unterminated JSON object in completion".to_string()))?
        + 1;

    let body: RankedBody = serde_json::from_str(&text[start..end])
        .map_err(|e| AppError::ExternalApi(format!("Malformed ranked list: {}", e)))?;

    let allowed: HashSet<Uuid> = candidates.iter().map(|c| c.id).collect();

    Ok(body
        .ranked
        .into_iter()
        .filter_map(|entry| {
            let id: Uuid = entry.id.as_str()?.parse().ok()?;
            allowed.contains(&id).then(|| RankedScore {
                id,
                score: coerce_score(&entry.score),
            })
        })
        .take(candidates.len())
        .collect())
}

/// Numeric coercion for the untrusted score field: accepts numbers and
/// numeric strings, everything else becomes 0.0
fn coerce_score(value: &serde_json::Value) -> f64 {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0.0)
}
