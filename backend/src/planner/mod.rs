//! Turning free-form plan text into a structured plan
//!
//! A [`PlanParser`] does the parsing (normally [`GeminiPlanParser`]).
//! [`parse_or_fallback`] never fails: when the parser errors, it builds a
//! plan from the text itself so plan creation still succeeds.

pub mod gemini;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiPlanParser;

/// Longest title kept by the fallback plan, in characters
pub const FALLBACK_TITLE_CHARS: usize = 30;

/// A plan member who gets one story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "Developer".to_string()
}

impl TeamMember {
    pub fn unassigned() -> Self {
        Self {
            name: "Unassigned".to_string(),
            role: default_role(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPlan {
    pub title: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub team_members: Vec<TeamMember>,
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("no plan parser API key configured")]
    MissingKey,
    #[error("plan parser request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("plan parser returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("plan parser returned no text")]
    EmptyResponse,
    #[error("plan parser returned malformed plan: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("plan parser returned an empty title")]
    EmptyTitle,
}

#[async_trait]
pub trait PlanParser: Send + Sync {
    async fn parse(&self, text: &str) -> Result<ParsedPlan, PlanError>;
}

/// Result of [`parse_or_fallback`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanParse {
    pub plan: ParsedPlan,
    pub used_fallback: bool,
}

fn fallback_due_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default()
}

/// Plan built from the raw text when parsing fails
pub fn fallback_plan(text: &str) -> ParsedPlan {
    let text = text.trim();
    let title = if text.chars().count() > FALLBACK_TITLE_CHARS {
        let head: String = text.chars().take(FALLBACK_TITLE_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    };

    ParsedPlan {
        title,
        due_date: fallback_due_date(),
        team_members: vec![TeamMember::unassigned()],
    }
}

/// Parse with `parser`, falling back to [`fallback_plan`] on any error
pub async fn parse_or_fallback(parser: &dyn PlanParser, text: &str) -> PlanParse {
    match parser.parse(text).await {
        Ok(mut plan) => {
            plan.team_members.retain(|m| !m.name.trim().is_empty());
            if plan.team_members.is_empty() {
                plan.team_members.push(TeamMember::unassigned());
            }
            tracing::info!("Successfully parsed plan: {}", plan.title);
            PlanParse {
                plan,
                used_fallback: false,
            }
        }
        Err(e) => {
            tracing::warn!("Error parsing plan, using fallback: {}", e);
            PlanParse {
                plan: fallback_plan(text),
                used_fallback: true,
            }
        }
    }
}

/// Strip a surrounding Markdown code fence (```json ... ```) if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FailingPlanParser, StaticPlanParser};

    #[test]
    fn test_fallback_truncates_long_titles() {
        let text = "Build the new onboarding flow for enterprise customers";
        let plan = fallback_plan(text);
        assert_eq!(plan.title, "Build the new onboarding flow ...");
        assert_eq!(plan.title.chars().count(), 33);
        assert_eq!(plan.due_date, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(plan.team_members, vec![TeamMember::unassigned()]);
    }

    #[test]
    fn test_fallback_keeps_short_titles() {
        assert_eq!(fallback_plan("Ship v2").title, "Ship v2");
        let exactly_30 = "a".repeat(30);
        assert_eq!(fallback_plan(&exactly_30).title, exactly_30);
    }

    #[test]
    fn test_fallback_counts_chars_not_bytes() {
        let text = "é".repeat(40);
        let plan = fallback_plan(&text);
        assert_eq!(plan.title, format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[tokio::test]
    async fn test_parse_or_fallback_on_error() {
        let result = parse_or_fallback(&FailingPlanParser, "Launch website").await;
        assert!(result.used_fallback);
        assert_eq!(result.plan.title, "Launch website");
    }

    #[tokio::test]
    async fn test_parse_or_fallback_fills_empty_team() {
        let parser = StaticPlanParser::new(ParsedPlan {
            title: "Launch".to_string(),
            due_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            team_members: vec![],
        });

        let result = parse_or_fallback(&parser, "Launch").await;
        assert!(!result.used_fallback);
        assert_eq!(result.plan.team_members, vec![TeamMember::unassigned()]);
    }
}
