use anyhow::{Context, Result};
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("regex is valid"));

/// One structural unit of the source legal text (citation, recital, chapter,
/// section or article), as produced by the upstream HTML parser.
///
/// Every field tolerates absence in the JSON; nodes without an id or content
/// are skipped during ingestion rather than failing the corpus parse.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentNode {
    /// Stable identifier, e.g. `art_6` or `rec_47`
    #[serde(default)]
    pub id: String,
    /// Structural kind: `article`, `recital`, `chapter`, ...
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Human-readable label, e.g. `Article 6 — Lawfulness of processing`
    #[serde(default)]
    pub title: String,
    /// Normalized body text; empty for purely organizational nodes
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
}

/// Load the structured corpus from a JSON file.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<DocumentNode>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    let nodes = parse_corpus(&raw)
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))?;
    debug!("Loaded {} document nodes from {}", nodes.len(), path.display());
    Ok(nodes)
}

/// Parse a JSON array of document nodes, normalizing titles and content.
pub fn parse_corpus(raw: &str) -> Result<Vec<DocumentNode>> {
    let mut nodes: Vec<DocumentNode> = serde_json::from_str(raw)?;
    for node in &mut nodes {
        node.id = node.id.trim().to_string();
        node.kind = node.kind.trim().to_string();
        node.title = clean_text(&node.title);
        node.content = clean_text(&node.content);
    }
    Ok(nodes)
}

/// Collapse whitespace runs, straighten curly quotes and trim.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let collapsed = WHITESPACE_RE.replace_all(text, " ");
    collapsed
        .replace('\u{2019}', "'")
        .replace('\u{201c}', "\"")
        .replace('\u{201d}', "\"")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let text = "  Principles \u{2019}relating\u{2019}  to\n\nprocessing \u{201c}of\u{201d}   personal data ";
        let expected = "Principles 'relating' to processing \"of\" personal data";
        assert_eq!(clean_text(text), expected);
    }

    #[test]
    fn clean_text_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn parses_nodes_with_missing_fields() {
        let raw = r#"[
            {"id": "art_5", "type": "article", "title": "Article 5", "content": "Personal data shall be..."},
            {"id": "chp_2", "type": "chapter", "title": "Chapter 2"},
            {"title": "stray entry"}
        ]"#;
        let nodes = parse_corpus(raw).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].id, "art_5");
        assert_eq!(nodes[0].kind, "article");
        assert_eq!(nodes[1].content, "");
        assert_eq!(nodes[2].id, "");
        assert!(nodes[0].chapter.is_none());
    }

    #[test]
    fn parse_normalizes_text_fields() {
        let raw = r#"[{"id": " art_6 ", "type": "article", "title": "Article 6 —  Lawfulness", "content": "the’s  text"}]"#;
        let nodes = parse_corpus(raw).unwrap();
        assert_eq!(nodes[0].id, "art_6");
        assert_eq!(nodes[0].title, "Article 6 \u{2014} Lawfulness");
        assert_eq!(nodes[0].content, "the's text");
    }
}
