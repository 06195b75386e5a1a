// src/render.rs
//! Structured article → standalone HTML page. Pure, no I/O.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::dedup::fingerprint;
use crate::synth::StructuredArticle;

const MAX_SLUG_CHARS: usize = 80;
const FALLBACK_HASH_CHARS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub slug: String,
    pub html: String,
}

pub trait Renderer: Send + Sync {
    fn render(&self, article: &StructuredArticle) -> Result<RenderedDocument>;
}

/// Built-in page template.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    pub site_name: String,
    pub lang: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            site_name: "L'Horizon Libre".to_string(),
            lang: "en".to_string(),
        }
    }
}

impl HtmlRenderer {
    fn render_at(&self, a: &StructuredArticle, now: DateTime<Utc>) -> Result<RenderedDocument> {
        a.validate()?;
        let slug = article_slug(&a.title)?;

        let mut body = String::new();
        for section in a.body_sections.iter().filter(|s| !s.trim().is_empty()) {
            body.push_str(&format!("      <p>{}</p>\n", encode_text(section.trim())));
        }
        let tags = a
            .suggested_tags
            .iter()
            .map(|t| format!("<li>{}</li>", encode_text(t.trim())))
            .collect::<String>();
        let sources = a
            .cited_sources
            .iter()
            .map(|s| format!("<li>{}</li>", encode_text(s.trim())))
            .collect::<String>();
        let keywords = a.suggested_tags.join(", ");

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="{lang}">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="{desc}">
    <meta name="keywords" content="{keywords}">
    <title>{title} | {site}</title>
  </head>
  <body>
    <article>
      <h1>{title}</h1>
      <p class="lead"><strong>{lead}</strong></p>
{body}      <p class="conclusion">{conclusion}</p>
      <footer>
        <ul class="tags">{tags}</ul>
        <h2>Sources</h2>
        <ul class="sources">{sources}</ul>
        <p class="generated">Generated on <time datetime="{iso}">{date}</time>.</p>
      </footer>
    </article>
  </body>
</html>
"#,
            lang = encode_double_quoted_attribute(&self.lang),
            desc = encode_double_quoted_attribute(a.lead.trim()),
            keywords = encode_double_quoted_attribute(&keywords),
            title = encode_text(a.title.trim()),
            site = encode_text(&self.site_name),
            lead = encode_text(a.lead.trim()),
            body = body,
            conclusion = encode_text(a.conclusion.trim()),
            tags = tags,
            sources = sources,
            iso = now.to_rfc3339(),
            date = now.format("%Y-%m-%d"),
        );
        Ok(RenderedDocument { slug, html })
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, article: &StructuredArticle) -> Result<RenderedDocument> {
        self.render_at(article, Utc::now())
    }
}

/// `slugify`, or `article-<hash prefix>` for titles with no Latin letters
/// or digits (Cyrillic, CJK, ...). Stable for a given title.
fn article_slug(title: &str) -> Result<String> {
    let slug = slugify(title);
    if !slug.is_empty() {
        return Ok(slug);
    }
    let Ok(fp) = fingerprint(title) else {
        bail!("article title is empty; no slug possible");
    };
    Ok(format!("article-{}", &fp.as_str()[..FALLBACK_HASH_CHARS]))
}

/// URL/file-safe slug: lowercase ASCII, common accents folded, every other
/// run of characters collapsed into a single `-`.
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_dash = false;
    for ch in s.chars().flat_map(fold_accent) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if out.len() >= MAX_SLUG_CHARS {
            break;
        }
    }
    out.trim_end_matches('-').to_string()
}

fn fold_accent(c: char) -> Vec<char> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' | 'À' | 'Á' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' | 'Ò' | 'Ó' | 'Ô' | 'Ö' | 'Õ' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        'œ' | 'Œ' => return vec!['o', 'e'],
        'æ' | 'Æ' => return vec!['a', 'e'],
        'ß' => return vec!['s', 's'],
        other => other,
    };
    vec![folded]
}
