// HTTP client for the pm-agent server, used by the `pm` CLI

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::{
    AlertRequest, AlertResponse, BlockedStoriesResponse, CreateTaskRequest, DigestResponse,
    LogEntryRequest, LogEntryResponse, LogResponse, PlanRequest, PlanResponse, ReportList,
    RiskCheckInput, RiskCheckOutput, StatusUpdateRequest, StoriesResponse,
};
use crate::digest::DigestRequest;
use crate::project_log::LogFilter;
use crate::schedule::{MeetingRequest, MeetingResponse};
use crate::store::Task;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin typed wrapper over the REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

/// Pull the `detail` message out of an error body, falling back to the raw text
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(&self, response: reqwest::Response, path: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} failed ({}): {}", path, status, error_detail(&body));
        }
        response
            .json()
            .await
            .with_context(|| format!("Invalid response from {}", path))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("Failed to connect to server at {}", self.base_url))?;
        self.read(response, path).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to connect to server at {}", self.base_url))?;
        self.read(response, path).await
    }

    pub async fn health(&self) -> Result<Value> {
        self.get("/health").await
    }

    pub async fn plan(&self, plan_text: &str) -> Result<PlanResponse> {
        let request = PlanRequest {
            plan_text: plan_text.to_string(),
        };
        self.post("/api/plan", &request).await
    }

    pub async fn risk(&self, input: &RiskCheckInput) -> Result<RiskCheckOutput> {
        self.post("/api/risk", input).await
    }

    pub async fn lead_stories(&self, team_lead: &str) -> Result<StoriesResponse> {
        self.get(&format!("/api/risk/stories/{}", encode_segment(team_lead)))
            .await
    }

    pub async fn alerts(&self, send_notifications: bool, include_pending: bool) -> Result<AlertResponse> {
        let request = AlertRequest {
            send_notifications,
            include_pending,
        };
        self.post("/api/alerts", &request).await
    }

    pub async fn check_alerts(&self) -> Result<AlertResponse> {
        self.get("/api/alerts/check").await
    }

    pub async fn log(&self) -> Result<LogResponse> {
        self.get("/api/log").await
    }

    pub async fn filter_log(&self, filter: &LogFilter) -> Result<LogResponse> {
        self.post("/api/log/filter", filter).await
    }

    pub async fn add_log_entry(&self, entry: &str) -> Result<LogEntryResponse> {
        let request = LogEntryRequest {
            entry: entry.to_string(),
        };
        self.post("/api/log/entry", &request).await
    }

    pub async fn digest(&self, request: &DigestRequest) -> Result<DigestResponse> {
        self.post("/api/digest", request).await
    }

    pub async fn reports(&self) -> Result<Vec<String>> {
        let list: ReportList = self.get("/api/digest/reports").await?;
        Ok(list.reports)
    }

    pub async fn schedule(&self, request: &MeetingRequest) -> Result<MeetingResponse> {
        self.post("/api/schedule", request).await
    }

    pub async fn blocked(&self) -> Result<BlockedStoriesResponse> {
        self.get("/api/schedule/blocked").await
    }

    pub async fn tasks(&self) -> Result<Vec<Task>> {
        self.get("/api/tasks").await
    }

    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task> {
        self.post("/api/tasks", request).await
    }

    pub async fn update_status(&self, id: &str, status: &str) -> Result<Task> {
        let request = StatusUpdateRequest {
            status: status.to_string(),
        };
        self.post(&format!("/api/tasks/{}/status", encode_segment(id)), &request)
            .await
    }
}

/// Percent-encode a single path segment
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
