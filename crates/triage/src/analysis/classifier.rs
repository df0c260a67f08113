//! Multi-stage issue classification.
//!
//! Each issue goes through, in order:
//! 1. category classification (JSON verdict, degrades to Question/0 on parse failure)
//! 2. response suggestion
//! 3. keyword label suggestions (no model call)
//! 4. reproducibility assessment for Bug and Usability
//! 5. duplicate detection when a non-empty knowledge base is available
//!
//! Failures of stages 1 and 2 to reach the model fail the whole issue. Stages
//! 4 and 5 always degrade to a default instead.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::categories::Category;
use super::labels::suggest_labels;
use super::prompts::{head_chars, truncate_body, PromptManager, DUPLICATE_CONTEXT_CHARS};
use super::result::{ClassificationResult, Reproducibility};
use crate::ai::{parse_ai_response, ModelClient};
use crate::errors::{TriageError, TriageResult};
use crate::github::{Issue, IssueSource};
use crate::knowledge::KnowledgeBase;

/// Maintainer comments included in the classification prompt.
const CLASSIFICATION_COMMENTS: usize = 20;

pub const PARSE_FAILURE_REASONING: &str = "Failed to parse AI response";
pub const REPRO_UNAVAILABLE_NOTE: &str = "Unable to assess reproducibility";
pub const REPRO_UNPARSEABLE_NOTE: &str = "Unable to parse assessment";

#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    confidence: f64,
    reasoning: String,
}

/// Models sometimes quote numbers; accept `85`, `85.0` and `"85"`.
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("confidence is not representable")),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("non-numeric confidence '{s}'"))),
        other => Err(de::Error::custom(format!("unexpected confidence {other}"))),
    }
}

#[derive(Debug, Deserialize)]
struct RawReproducibility {
    reproducibility: String,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDuplicate {
    is_duplicate: bool,
    #[serde(default)]
    duplicate_of: Vec<u64>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, PartialEq)]
struct DuplicateVerdict {
    is_duplicate: bool,
    /// Only set for a positive verdict.
    duplicate_of: Option<Vec<u64>>,
    reasoning: Option<String>,
}

/// Classifies issues using a language model.
pub struct Classifier {
    model: ModelClient,
    comments: Option<Arc<dyn IssueSource>>,
    prompts: PromptManager,
}

impl Classifier {
    /// Create a classifier. When `comments` is given, maintainer comments are
    /// fetched and included in the classification prompt.
    pub fn new(model: ModelClient, comments: Option<Arc<dyn IssueSource>>) -> TriageResult<Self> {
        Ok(Self {
            model,
            comments,
            prompts: PromptManager::new()?,
        })
    }

    /// Run all stages for one issue.
    pub async fn classify(
        &self,
        issue: &Issue,
        knowledge_base: Option<&KnowledgeBase>,
    ) -> TriageResult<ClassificationResult> {
        let knowledge_base = knowledge_base.filter(|kb| !kb.is_empty());
        let context = knowledge_base.map(KnowledgeBase::context_summary);
        let body = truncate_body(issue.body_text());

        tracing::info!(
            issue = issue.number,
            model = %self.model.model(),
            with_knowledge_base = context.is_some(),
            "Classifying issue"
        );

        let mut result = self.classify_category(issue, &body, context.as_deref()).await?;
        result.suggested_response = self.suggest_response(issue, &body, result.category).await?;
        result.suggested_labels = suggest_labels(issue, result.category);

        if result.category.needs_reproduction_check() {
            let (verdict, notes) = self.assess_reproducibility(issue, &body).await;
            result.reproducibility = Some(verdict);
            result.reproducibility_notes = notes;
        }

        if let Some(context) = context.as_deref() {
            if let Some(verdict) = self.detect_duplicates(issue, &body, context).await {
                result.is_duplicate = verdict.is_duplicate;
                result.duplicate_of = verdict.duplicate_of;
                result.duplicate_reasoning = verdict.reasoning;
            }
        }

        tracing::info!(
            issue = issue.number,
            category = %result.category,
            confidence = result.confidence(),
            needs_review = result.needs_manual_review(),
            duplicate = result.is_duplicate,
            "Issue classified"
        );
        Ok(result)
    }

    async fn classify_category(
        &self,
        issue: &Issue,
        body: &str,
        context: Option<&str>,
    ) -> TriageResult<ClassificationResult> {
        let comments = match &self.comments {
            Some(source) => {
                source
                    .fetch_maintainer_comments(issue.number, CLASSIFICATION_COMMENTS)
                    .await
            }
            None => String::new(),
        };

        let prompt = self.prompts.render(
            "classify",
            &json!({
                "categories": category_definitions(),
                "title": issue.title,
                "body": body,
                "author": issue.author.as_deref().unwrap_or("unknown"),
                "comments": comments,
                "knowledge_base": context.unwrap_or(""),
            }),
        )?;

        let reply = self.model.complete(&prompt).await?;
        Ok(parse_classification(issue, &reply))
    }

    async fn suggest_response(
        &self,
        issue: &Issue,
        body: &str,
        category: Category,
    ) -> TriageResult<String> {
        let prompt = self.prompts.render(
            "respond",
            &json!({
                "category": category.display_name(),
                "title": issue.title,
                "body": body,
                "guidance": category.response_guidance(),
            }),
        )?;
        let reply = self.model.complete(&prompt).await?;
        Ok(reply.trim().to_string())
    }

    async fn assess_reproducibility(
        &self,
        issue: &Issue,
        body: &str,
    ) -> (Reproducibility, Option<String>) {
        let reply = match self
            .render_and_complete("reproducibility", &json!({"title": issue.title, "body": body}))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(issue = issue.number, error = %e, "Reproducibility assessment failed");
                return (
                    Reproducibility::Unknown,
                    Some(REPRO_UNAVAILABLE_NOTE.to_string()),
                );
            }
        };
        parse_reproducibility(issue.number, &reply)
    }

    async fn detect_duplicates(
        &self,
        issue: &Issue,
        body: &str,
        context: &str,
    ) -> Option<DuplicateVerdict> {
        let data = json!({
            "title": issue.title,
            "body": body,
            "context": head_chars(context, DUPLICATE_CONTEXT_CHARS),
        });
        match self.render_and_complete("duplicates", &data).await {
            Ok(reply) => parse_duplicates(issue.number, &reply),
            Err(e) => {
                tracing::warn!(issue = issue.number, error = %e, "Duplicate detection failed");
                None
            }
        }
    }

    async fn render_and_complete(
        &self,
        template: &str,
        data: &serde_json::Value,
    ) -> TriageResult<String> {
        let prompt = self.prompts.render(template, data)?;
        self.model.complete(&prompt).await
    }
}

fn category_definitions() -> Vec<serde_json::Value> {
    Category::all()
        .iter()
        .map(|c| json!({"name": c.display_name(), "description": c.description()}))
        .collect()
}

/// Parse the category verdict, degrading to Question/0 on any problem.
fn parse_classification(issue: &Issue, reply: &str) -> ClassificationResult {
    let parsed = parse_ai_response::<RawClassification>(reply).and_then(|raw| {
        let category =
            Category::parse(&raw.category).ok_or_else(|| TriageError::AiResponseParse {
                reason: format!("unknown category '{}'", raw.category),
            })?;
        Ok((category, raw.confidence.round() as i64, raw.reasoning))
    });

    match parsed {
        Ok((category, confidence, reasoning)) => {
            ClassificationResult::new(issue, category, confidence, reasoning)
        }
        Err(e) => {
            tracing::warn!(
                issue = issue.number,
                error = %e,
                "Unparseable classification, flagging for manual review"
            );
            ClassificationResult::new(
                issue,
                Category::Question,
                0,
                PARSE_FAILURE_REASONING.to_string(),
            )
        }
    }
}

fn parse_reproducibility(number: u64, reply: &str) -> (Reproducibility, Option<String>) {
    let parsed = parse_ai_response::<RawReproducibility>(reply).and_then(|raw| {
        Reproducibility::parse(&raw.reproducibility)
            .map(|verdict| (verdict, raw.notes))
            .ok_or_else(|| TriageError::AiResponseParse {
                reason: format!("unknown reproducibility '{}'", raw.reproducibility),
            })
    });

    parsed.unwrap_or_else(|e| {
        tracing::warn!(issue = number, error = %e, "Unparseable reproducibility assessment");
        (
            Reproducibility::Unknown,
            Some(REPRO_UNPARSEABLE_NOTE.to_string()),
        )
    })
}

/// `None` when the reply cannot be parsed.
fn parse_duplicates(number: u64, reply: &str) -> Option<DuplicateVerdict> {
    match parse_ai_response::<RawDuplicate>(reply) {
        Ok(raw) => Some(DuplicateVerdict {
            is_duplicate: raw.is_duplicate,
            duplicate_of: raw.is_duplicate.then_some(raw.duplicate_of),
            reasoning: raw.reasoning,
        }),
        Err(e) => {
            tracing::warn!(issue = number, error = %e, "Unparseable duplicate verdict");
            None
        }
    }
}
