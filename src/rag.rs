use crate::chunking;
use crate::config::RagConfig;
use crate::context;
use crate::database::{EmbeddingRecord, RetrievedChunk, VectorIndex, COLLECTION_NAME};
use crate::document::DocumentNode;
use crate::ollama::{EmbeddingGateway, GenerativeService};
use anyhow::Result;
use log::{debug, info};
use regex::Regex;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::LazyLock;

/// Fixed answer when retrieval comes back empty; returned without calling
/// the generation service.
pub const NOT_FOUND_ANSWER: &str = "I couldn't find relevant passages in the indexed GDPR text.";

const ANSWER_RULES: &str = "You are a GDPR assistant. Answer ONLY from the provided context \
(GDPR text). If the answer is not clearly supported by the context, reply: 'I couldn't find \
that in the indexed GDPR text.' Do NOT guess. Always mention the relevant Article/Recital \
titles you used.";

const BOX_WIDTH: usize = 100;

static ARTICLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\barticle\s+(\d+)\b").expect("regex is valid"));

/// Return the canonical `art_<N>` node id when the query references
/// "Article N". Deliberately narrow: anything else falls through to
/// semantic search.
pub fn extract_article_id(query: &str) -> Option<String> {
    let captures = ARTICLE_RE.captures(query)?;
    let number: u64 = captures[1].parse().ok()?;
    Some(format!("art_{}", number))
}

/// RAG (Retrieval-Augmented Generation) engine: drives ingestion, hybrid
/// retrieval and constrained answer generation over injected capability
/// interfaces.
pub struct RagEngine<V, E, G> {
    index: V,
    embedder: E,
    generator: G,
    config: RagConfig,
}

impl<V, E, G> RagEngine<V, E, G>
where
    V: VectorIndex,
    E: EmbeddingGateway,
    G: GenerativeService,
{
    /// Create a new RAG engine
    pub fn new(index: V, embedder: E, generator: G, config: RagConfig) -> Self {
        RagEngine {
            index,
            embedder,
            generator,
            config,
        }
    }

    /// Chunk, embed and store every indexable node. Records are flushed to
    /// the store in `batch_size` writes, with a final partial flush at
    /// end-of-stream. An embedding failure aborts the whole run.
    ///
    /// Returns the number of chunks ingested.
    pub async fn ingest(&self, nodes: &[DocumentNode]) -> Result<usize> {
        let mut batch: Vec<EmbeddingRecord> = Vec::with_capacity(self.config.batch_size);
        let mut total = 0usize;

        for node in nodes {
            if node.id.is_empty() || node.content.is_empty() {
                debug!("Skipping node '{}' with empty id or content", node.title);
                continue;
            }

            for chunk in chunking::split_node(node, self.config.chunk_max_words) {
                let vector = self.embedder.embed(&chunk.text).await?;
                batch.push(EmbeddingRecord {
                    id: chunk.id,
                    text: chunk.text,
                    meta: chunk.meta,
                    vector,
                });
                total += 1;

                if batch.len() >= self.config.batch_size {
                    let flush =
                        std::mem::replace(&mut batch, Vec::with_capacity(self.config.batch_size));
                    self.index.upsert(flush).await?;
                }
            }
        }

        if !batch.is_empty() {
            self.index.upsert(batch).await?;
        }

        info!(
            "Ingested {} chunks into collection '{}'",
            total, COLLECTION_NAME
        );
        Ok(total)
    }

    /// Retrieve up to `limit` chunks for a question.
    ///
    /// When the question references a specific article, all of that article's
    /// chunks are fetched by exact node id and returned in sequence order;
    /// semantic search only runs when the exact path yields nothing (e.g. the
    /// article number does not exist in the corpus).
    pub async fn retrieve(
        &self,
        query: &str,
        filter: Option<&HashMap<String, String>>,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        if let Some(node_id) = extract_article_id(query) {
            debug!("Query references {}, trying the exact path", node_id);
            let node_filter = HashMap::from([("node_id".to_string(), node_id)]);
            let mut exact = self.index.get_by_metadata(&node_filter).await?;
            exact.sort_by_key(|chunk| chunk.meta.chunk_index);
            exact.truncate(limit);
            if !exact.is_empty() {
                return Ok(exact);
            }
        }

        let query_embedding = self.embedder.embed(query).await?;
        let mut ranked = self
            .index
            .query_nearest(query_embedding, filter, limit)
            .await?;
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Generate an answer for `query` constrained to the retrieved chunks.
    /// Empty retrieval short-circuits to the fixed not-found answer.
    pub async fn answer(&self, query: &str, chunks: &[RetrievedChunk]) -> Result<String> {
        if chunks.is_empty() {
            return Ok(NOT_FOUND_ANSWER.to_string());
        }

        let context_text = context::assemble(
            chunks.iter().map(|chunk| chunk.text.as_str()),
            self.config.max_context_chars,
        );
        let prompt = format!(
            "{}\n\nQuestion: {}\n\nContext:\n{}\n\nAnswer:",
            ANSWER_RULES, query, context_text
        );

        let answer = self.generator.generate(&prompt).await?;
        Ok(answer.trim().to_string())
    }

    /// Interactive question loop on stdin/stdout. Prints the matched source
    /// titles before each answer; `exit` or `quit` terminates.
    pub async fn run_query_loop(&self) -> Result<()> {
        println!("\nGDPR RAG (terminal)");
        println!("Type 'exit' to quit.");

        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut buffer = String::new();

        loop {
            print!("\nAsk a GDPR question: ");
            stdout.flush()?;

            buffer.clear();
            if stdin.read_line(&mut buffer)? == 0 {
                break; // stdin closed
            }

            let question = buffer.trim();
            if question.is_empty() {
                continue;
            }
            if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
                println!("Bye!");
                break;
            }

            debug!("Retrieving relevant context");
            let chunks = self.retrieve(question, None, self.config.top_k).await?;
            if chunks.is_empty() {
                print_boxed(NOT_FOUND_ANSWER);
                continue;
            }

            println!("\nMatched sources:");
            for chunk in chunks.iter().take(5) {
                println!(" - {}  [{}]", chunk.meta.title, chunk.meta.node_id);
            }

            println!("\nGenerating answer...");
            let answer = self.answer(question, &chunks).await?;
            print_boxed(&answer);
        }

        Ok(())
    }
}

/// Print text inside a full-width `=` box, wrapped at the box width.
fn print_boxed(text: &str) {
    let border = "=".repeat(BOX_WIDTH);
    println!("\n{}", border);
    let chars: Vec<char> = text.trim().chars().collect();
    for line in chars.chunks(BOX_WIDTH) {
        println!("{}", line.iter().collect::<String>());
    }
    println!("{}\n", border);
}
