//! LLM prompts for the feedback pipeline.
//!
//! Templates use `{placeholder}` markers filled by the `format_*` helpers.

use crate::types::ExtractedEntities;

/// System prompt shared by every stage.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are a senior product analyst. You read raw customer \
feedback and turn it into precise, evidence-based product insights. Never invent facts that \
are not supported by the feedback.";

/// Prompt for extracting structured insights from feedback text.
pub const EXTRACT_INSIGHTS_PROMPT: &str = r#"Analyze the customer feedback below and extract structured insights.

Return:
- themes: the main topics raised. Repeat a theme once per distinct mention, so frequent themes appear several times.
- sentiments: one entry per theme with a score between -1 (very negative) and 1 (very positive).
- pain_points: concrete problems users report.
- feature_requests: features or improvements users ask for.
- user_personas: the kinds of users who wrote the feedback, each described by attribute/value pairs (for example role, experience, usage frequency).
- key_metrics: any quantitative signals found in the feedback (ratings, NPS, counts, durations). The value is the number or text as written.

Use short lowercase labels for themes so the same topic is always spelled the same way.

Feedback:
{content}"#;

/// Prompt for the narrative synthesis.
pub const SYNTHESIZE_PROMPT: &str = r#"Synthesize the insights extracted from user feedback into a coherent, actionable summary.

## Context
- Feedback source: {source}
- Title: {title}

## Themes
{themes}

## Sentiment by theme
{sentiments}

## Pain points
{pain_points}

## Feature requests
{feature_requests}

## User personas
{user_personas}

## Feedback samples
{sample_feedback}

## Instructions
1. Write a summary of 2-3 paragraphs
2. Highlight the main trends
3. Identify the most important improvement opportunities
4. Call out unmet user needs

## Summary"#;

/// Prompt for turning a synthesis into user stories.
pub const GENERATE_STORIES_PROMPT: &str = r#"Write user stories for the product backlog based on the analysis below.

## Summary
{summary}

## Themes
{themes}

## Sentiment by theme
{sentiments}

## Pain points
{pain_points}

## Feature requests
{feature_requests}

## User personas
{user_personas}

## Instructions
Write between 3 and 7 user stories. Each story needs:
- a short title
- as_a / i_want / so_that in the classic "As a ..., I want ... so that ..." form
- a description explaining the problem and the expected outcome
- 2 to 5 testable acceptance criteria
- the themes it addresses, using the theme labels listed above"#;

/// Format the extraction prompt.
pub fn format_extract_prompt(content: &str) -> String {
    EXTRACT_INSIGHTS_PROMPT.replace("{content}", content)
}

/// Format the synthesis prompt.
pub fn format_synthesize_prompt(
    source: &str,
    title: &str,
    entities: &ExtractedEntities,
    samples: &[String],
) -> String {
    SYNTHESIZE_PROMPT
        .replace("{source}", source)
        .replace("{title}", title)
        .replace("{themes}", &bullet_list(&entities.themes))
        .replace("{sentiments}", &format_sentiments(entities))
        .replace("{pain_points}", &bullet_list(&entities.pain_points))
        .replace("{feature_requests}", &bullet_list(&entities.feature_requests))
        .replace("{user_personas}", &format_personas(entities))
        .replace("{sample_feedback}", &bullet_list(samples))
}

/// Format the story generation prompt.
pub fn format_generate_prompt(summary: &str, entities: &ExtractedEntities) -> String {
    GENERATE_STORIES_PROMPT
        .replace("{summary}", summary)
        .replace("{themes}", &bullet_list(&entities.themes))
        .replace("{sentiments}", &format_sentiments(entities))
        .replace("{pain_points}", &bullet_list(&entities.pain_points))
        .replace("{feature_requests}", &bullet_list(&entities.feature_requests))
        .replace("{user_personas}", &format_personas(entities))
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- none".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_sentiments(entities: &ExtractedEntities) -> String {
    let lines: Vec<String> = entities
        .sentiments
        .iter()
        .map(|(theme, score)| format!("{}: {:.2}", theme, score))
        .collect();
    bullet_list(&lines)
}

fn format_personas(entities: &ExtractedEntities) -> String {
    let lines: Vec<String> = entities
        .user_personas
        .iter()
        .map(|persona| {
            persona
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect();
    bullet_list(&lines)
}
