//! Prompt template management.

use handlebars::Handlebars;
use serde::Serialize;

use crate::errors::TriageResult;

/// Issue bodies longer than this are cut before prompting.
pub const MAX_BODY_CHARS: usize = 4000;

/// Characters of knowledge base context given to duplicate detection.
pub const DUPLICATE_CONTEXT_CHARS: usize = 2000;

const TRUNCATION_MARKER: &str = "... [truncated]";

/// Manages Handlebars prompt templates.
pub struct PromptManager {
    handlebars: Handlebars<'static>,
}

impl PromptManager {
    /// Create a new prompt manager with embedded templates.
    pub fn new() -> TriageResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars.register_template_string("classify", CLASSIFY_TEMPLATE)?;
        handlebars.register_template_string("respond", RESPOND_TEMPLATE)?;
        handlebars.register_template_string("reproducibility", REPRODUCIBILITY_TEMPLATE)?;
        handlebars.register_template_string("duplicates", DUPLICATES_TEMPLATE)?;
        handlebars.register_template_string("quick", QUICK_TEMPLATE)?;

        Ok(Self { handlebars })
    }

    /// Render a template with the given data.
    pub fn render<T: Serialize>(&self, template: &str, data: &T) -> TriageResult<String> {
        Ok(self.handlebars.render(template, data)?)
    }
}

/// Cut `body` to [`MAX_BODY_CHARS`] characters, marking the cut.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_BODY_CHARS).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    }
}

/// First `max` characters of `text`.
pub fn head_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

const CLASSIFY_TEMPLATE: &str = r#"You are a GitHub issue triage assistant. Classify the following issue into exactly one category:
{{#each categories}}- {{name}}: {{description}}
{{/each}}{{#if comments}}

ISSUE COMMENTS:
{{comments}}

Consider these comments when classifying the issue.
{{/if}}
{{#if knowledge_base}}

KNOWLEDGE BASE CONTEXT:
{{knowledge_base}}

Use this historical context to inform your classification.
{{/if}}

Issue Title: {{title}}
Issue Body: {{body}}
Author: {{author}}

Respond ONLY with valid JSON in this exact format:
{
  "category": "<Bug|Feature Request|Usability|Question>",
  "confidence": <0-100>,
  "reasoning": "<explanation>"
}
"#;

const RESPOND_TEMPLATE: &str = r"You are a helpful open source maintainer. Draft a short, friendly first response to this {{category}} issue.

Issue Title: {{title}}
Issue Body: {{body}}

Guidelines:
{{guidance}}
- Keep it under 150 words
- Do not promise timelines

Respond with the comment text only.
";

const REPRODUCIBILITY_TEMPLATE: &str = r#"Assess how easily the problem in this issue could be reproduced by a maintainer.

Issue Title: {{title}}
Issue Body: {{body}}

Consider whether steps, versions, environment details and logs are provided.

Respond ONLY with valid JSON in this exact format:
{
  "reproducibility": "<Easy|Moderate|Difficult|Unknown>",
  "notes": "<brief explanation>"
}
"#;

const DUPLICATES_TEMPLATE: &str = r#"Determine whether this new issue duplicates one of the previously triaged issues summarized below.

New Issue Title: {{title}}
New Issue Body: {{body}}

Previously triaged issues:
{{context}}

Respond ONLY with valid JSON in this exact format:
{
  "isDuplicate": <true|false>,
  "duplicateOf": [<issue_numbers>],
  "reasoning": "<explanation>"
}
"#;

const QUICK_TEMPLATE: &str = r"Categorize this GitHub issue as BUG, FEATURE, QUESTION, or USABILITY.

Title: {{title}}
Body: {{body}}

Answer on one line in the form CATEGORY: one-sentence reason
";
