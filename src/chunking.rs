use crate::document::DocumentNode;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TITLE_WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("regex is valid"));
static TITLE_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-\u{2013}\u{2014}:]").expect("regex is valid"));

/// Metadata stored alongside every chunk in the vector index.
///
/// `node_id` and `title` are required by the citation display downstream and
/// are therefore plain fields, never optional.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMeta {
    /// Base node id, e.g. `art_6` (many chunks share one node)
    pub node_id: String,
    /// Structural kind of the source node
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable source title
    pub title: String,
    /// Lowercased, punctuation-stripped title for robust matching
    pub title_norm: String,
    /// Chapter tag, empty when the node has none
    pub chapter: String,
    /// Section tag, empty when the node has none
    pub section: String,
    /// Zero-based position of this chunk within its node
    pub chunk_index: usize,
}

/// A word-bounded slice of a node's content, the atomic unit stored and
/// retrieved.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Globally unique id: `<node_id>:<chunk_index>`
    pub id: String,
    pub text: String,
    pub meta: ChunkMeta,
}

/// Split `text` on whitespace and partition the words into consecutive runs
/// of at most `max_words`, each rejoined with single spaces. The final run
/// may be shorter; empty input produces no chunks.
///
/// Joining the chunks' words in order reproduces the input word sequence
/// exactly. `max_words` must be positive (enforced at startup).
pub fn chunk_by_words(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words)
        .map(|run| run.join(" "))
        .collect()
}

/// Lowercase a title, collapse whitespace and strip everything outside word
/// characters, whitespace, hyphens, en/em-dashes and colons.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let collapsed = TITLE_WHITESPACE_RE.replace_all(lowered.trim(), " ");
    TITLE_STRIP_RE.replace_all(&collapsed, "").into_owned()
}

/// Split a document node into chunk records carrying the node's metadata.
///
/// Nodes with empty content yield no chunks; the ingestion loop skips them
/// before calling this.
pub fn split_node(node: &DocumentNode, max_words: usize) -> Vec<Chunk> {
    chunk_by_words(&node.content, max_words)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            id: format!("{}:{}", node.id, index),
            text,
            meta: ChunkMeta {
                node_id: node.id.clone(),
                kind: node.kind.clone(),
                title: node.title.clone(),
                title_norm: normalize_title(&node.title),
                chapter: node.chapter.clone().unwrap_or_default(),
                section: node.section.clone().unwrap_or_default(),
                chunk_index: index,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_content_is_a_single_chunk() {
        let chunks = chunk_by_words("the quick brown fox", 300);
        assert_eq!(chunks, vec!["the quick brown fox".to_string()]);
    }

    #[test]
    fn empty_content_yields_no_chunks() {
        assert!(chunk_by_words("", 300).is_empty());
        assert!(chunk_by_words("   \n\t ", 300).is_empty());
    }

    #[test]
    fn splitting_is_lossless_and_order_preserving() {
        let text = words(301);
        let chunks = chunk_by_words(&text, 300);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 300);
        assert_eq!(chunks[1].split_whitespace().count(), 1);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn only_the_last_chunk_may_be_short() {
        let text = words(750);
        let chunks = chunk_by_words(&text, 300);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].split_whitespace().count(), 300);
        assert_eq!(chunks[1].split_whitespace().count(), 300);
        assert_eq!(chunks[2].split_whitespace().count(), 150);
    }

    #[test]
    fn rechunking_a_chunk_is_identity() {
        let chunk = words(300);
        assert_eq!(chunk_by_words(&chunk, 300), vec![chunk]);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("Article 6 \u{2014} Lawfulness of processing"),
            "article 6 \u{2014} lawfulness of processing"
        );
        assert_eq!(normalize_title("Article 5(1)(b): Purpose!"), "article 51b: purpose");
        assert_eq!(normalize_title("  Mixed   CASE  "), "mixed case");
    }

    #[test]
    fn split_node_builds_ids_and_metadata() {
        let node = DocumentNode {
            id: "art_6".to_string(),
            kind: "article".to_string(),
            title: "Article 6 \u{2014} Lawfulness of processing".to_string(),
            content: words(301),
            chapter: Some("Chapter II".to_string()),
            section: None,
        };
        let chunks = split_node(&node, 300);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "art_6:0");
        assert_eq!(chunks[1].id, "art_6:1");
        assert_eq!(chunks[1].meta.chunk_index, 1);
        assert_eq!(chunks[0].meta.node_id, "art_6");
        assert_eq!(chunks[0].meta.kind, "article");
        assert_eq!(chunks[0].meta.chapter, "Chapter II");
        assert_eq!(chunks[0].meta.section, "");
        assert_eq!(
            chunks[0].meta.title_norm,
            "article 6 \u{2014} lawfulness of processing"
        );
    }
}
