// Gemini generateContent client for plan parsing

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{strip_code_fence, ParsedPlan, PlanError, PlanParser};
use crate::config::GeminiConfig;

#[derive(Debug, Clone)]
pub struct GeminiPlanParser {
    config: GeminiConfig,
    client: Client,
}

impl GeminiPlanParser {
    pub fn new(config: GeminiConfig) -> Result<Self, PlanError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Prompt asking for the plan as bare JSON
pub fn plan_prompt(text: &str) -> String {
    format!(
        r#"Parse the following project plan text into a structured format.

TEXT: {text}

Extract the following information:
1. Title of the project/task
2. Due date (convert any date format to YYYY-MM-DD)
3. Team members and their roles

Return the information in the following JSON format:
{{
    "title": "The project title",
    "due_date": "YYYY-MM-DD",
    "team_members": [
        {{ "name": "Name1", "role": "Role1" }},
        {{ "name": "Name2", "role": "Role2" }}
    ]
}}

Only return the JSON, no other text."#
    )
}

#[async_trait]
impl PlanParser for GeminiPlanParser {
    async fn parse(&self, text: &str) -> Result<ParsedPlan, PlanError> {
        if !self.config.has_api_key() {
            return Err(PlanError::MissingKey);
        }

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: plan_prompt(text),
                }],
            }],
        };

        tracing::debug!("Sending plan to Gemini (model: {})", self.config.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(PlanError::Status { status, body });
        }

        let body: GeminiResponse = response.json().await?;
        let reply = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(PlanError::EmptyResponse)?;

        let plan: ParsedPlan = serde_json::from_str(strip_code_fence(&reply))?;
        if plan.title.trim().is_empty() {
            return Err(PlanError::EmptyTitle);
        }
        Ok(plan)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}
