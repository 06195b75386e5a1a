// src/synth/mod.rs
//! Synthesis collaborator: turns a batch of source articles into one
//! structured article via a generative model.

pub mod gemini;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ingest::Article;

pub use gemini::GeminiSynthesizer;

/// Model output. Every field except `image_prompt` must be present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructuredArticle {
    pub title: String,
    pub lead: String,
    pub body_sections: Vec<String>,
    pub conclusion: String,
    pub suggested_tags: Vec<String>,
    pub cited_sources: Vec<String>,
    pub suggested_announcement: String,
    #[serde(default)]
    pub image_prompt: Option<String>,
}

impl StructuredArticle {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("synthesized article has an empty title");
        }
        if self.lead.trim().is_empty() {
            bail!("synthesized article has an empty lead");
        }
        if self.body_sections.iter().all(|s| s.trim().is_empty()) {
            bail!("synthesized article has no body");
        }
        if self.conclusion.trim().is_empty() {
            bail!("synthesized article has an empty conclusion");
        }
        Ok(())
    }
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, articles: &[Article]) -> Result<StructuredArticle>;
    fn name(&self) -> &'static str;
}

const PROMPT_HEADER: &str = r#"# ROLE
You are a news desk assistant. Write ONE neutral, factual synthesis based ONLY on the sources below. Do not speculate or add facts that are not in the sources.

# OUTPUT FORMAT
Answer with valid JSON only, no prose around it:
{
  "title": "...",
  "lead": "...",
  "body_sections": ["...", "..."],
  "conclusion": "...",
  "suggested_tags": ["...", "..."],
  "cited_sources": ["...", "..."],
  "suggested_announcement": "one sentence under 200 characters",
  "image_prompt": "..."
}

# SOURCE ARTICLES
---
"#;

/// Prompt for `articles`, numbered in order.
pub fn build_prompt(articles: &[Article]) -> String {
    let mut out = String::from(PROMPT_HEADER);
    for (i, a) in articles.iter().enumerate() {
        out.push_str(&format!(
            "### SOURCE {}: {}\n- Title: {}\n- Url: {}\n- Content: {}\n---\n",
            i + 1,
            a.source_name,
            a.title,
            a.url.as_deref().unwrap_or("-"),
            a.best_text()
        ));
    }
    out
}

/// Parse raw model text: tolerate markdown fences and chatter around the
/// JSON object, then check required content.
pub fn parse_structured(raw: &str) -> Result<StructuredArticle> {
    let cleaned = strip_code_fences(raw);
    let json = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => &cleaned[start..=end],
        _ => return Err(anyhow!("model output contains no JSON object")),
    };
    let article: StructuredArticle =
        serde_json::from_str(json).context("model output is not a structured article")?;
    article.validate()?;
    Ok(article)
}

fn strip_code_fences(raw: &str) -> String {
    raw.trim()
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{
        "title": "Chips in 2025",
        "lead": "Lead.",
        "body_sections": ["One.", "Two."],
        "conclusion": "End.",
        "suggested_tags": ["chips"],
        "cited_sources": ["Reuters"],
        "suggested_announcement": "Chips!"
    }"#;

    #[test]
    fn parses_fenced_output() {
        let raw = format!("Here you go:\n```json\n{GOOD}\n```");
        let a = parse_structured(&raw).unwrap();
        assert_eq!(a.title, "Chips in 2025");
        assert_eq!(a.body_sections.len(), 2);
        assert_eq!(a.image_prompt, None);
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let raw = r#"{"title": "x", "lead": "y"}"#;
        assert!(parse_structured(raw).is_err());
    }

    #[test]
    fn empty_body_is_an_error() {
        let raw = GOOD.replace(r#"["One.", "Two."]"#, r#"["  "]"#);
        let err = parse_structured(&raw).unwrap_err();
        assert!(format!("{err:#}").contains("no body"));
    }

    #[test]
    fn non_json_is_an_error() {
        assert!(parse_structured("I cannot help with that.").is_err());
    }

    #[test]
    fn prompt_numbers_sources_and_falls_back_to_description() {
        let a = Article {
            title: "T".into(),
            description: Some("desc".into()),
            body: None,
            url: Some("https://x.test/1".into()),
            source_name: "BBC".into(),
            published_at: None,
        };
        let p = build_prompt(&[a.clone(), a]);
        assert!(p.contains("### SOURCE 1: BBC"));
        assert!(p.contains("### SOURCE 2: BBC"));
        assert!(p.contains("- Content: desc"));
    }
}
