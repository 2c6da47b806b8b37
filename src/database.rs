use crate::chunking::ChunkMeta;
use crate::config::RagConfig;
use crate::ollama::Embedding;
use anyhow::{Context, Result};
use qdrant_client::qdrant::UpsertPointsBuilder;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, ScrollPointsBuilder, Value,
    VectorParams,
};
use qdrant_client::Qdrant;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Single fixed collection for the corpus
pub const COLLECTION_NAME: &str = "gdpr";

const COLLECTION_VECTOR_SIZE: u64 = 768; // nomic-embed-text:v1.5 output dimension

/// Upper bound on chunks fetched per metadata filter; far above what any
/// single node produces.
const SCROLL_LIMIT: u32 = 1024;

/// The unit written to the vector index at ingest time.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    /// Chunk id, `<node_id>:<chunk_index>`
    pub id: String,
    pub text: String,
    pub meta: ChunkMeta,
    pub vector: Embedding,
}

/// The unit returned by retrieval; rank order is significant.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub text: String,
    pub meta: ChunkMeta,
}

/// Capability interface over the persistent vector store: batched upsert,
/// exact-metadata fetch and nearest-neighbor query.
#[allow(async_fn_in_trait)]
pub trait VectorIndex {
    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<()>;

    /// Exact match on metadata key/value pairs, similarity-free.
    async fn get_by_metadata(
        &self,
        filter: &HashMap<String, String>,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Nearest-neighbor search ranked by the store's similarity metric.
    async fn query_nearest(
        &self,
        vector: Embedding,
        filter: Option<&HashMap<String, String>>,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>>;
}

/// Qdrant-backed vector index
pub struct QdrantIndex {
    client: Qdrant,
}

impl QdrantIndex {
    /// Connect to Qdrant using the configured endpoint
    pub fn new(config: &RagConfig) -> Result<Self> {
        let config_builder = Qdrant::from_url(&config.qdrant_url);
        let config_builder = if let Some(api_key) = &config.qdrant_api_key {
            config_builder.api_key(api_key.clone())
        } else {
            config_builder
        };

        let client = config_builder.build()?;

        Ok(QdrantIndex { client })
    }

    /// Check if the corpus collection exists
    pub async fn collection_exists(&self) -> Result<bool> {
        match self.client.collection_info(COLLECTION_NAME).await {
            Ok(_) => Ok(true),
            Err(qdrant_client::QdrantError::ResponseError { status })
                if status.code() == tonic::Code::NotFound =>
            {
                Ok(false)
            }
            Err(e) => Err(anyhow::anyhow!(
                "Failed to check collection existence: {}",
                e
            )),
        }
    }

    /// Create the corpus collection with cosine distance
    pub async fn create_collection(&self) -> Result<()> {
        let create_collection = CreateCollectionBuilder::new(COLLECTION_NAME).vectors_config(
            VectorParams {
                size: COLLECTION_VECTOR_SIZE,
                distance: Distance::Cosine.into(),
                ..Default::default()
            },
        );

        self.client
            .create_collection(create_collection)
            .await
            .with_context(|| format!("Failed to create collection {}", COLLECTION_NAME))?;

        Ok(())
    }
}

impl VectorIndex for QdrantIndex {
    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<()> {
        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|record| {
                // Qdrant point ids must be integers or UUIDs; derive a stable
                // UUID from the chunk id so re-ingestion overwrites in place.
                let point_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, record.id.as_bytes()).to_string();

                let mut fields = serde_json::to_value(&record.meta)
                    .context("Failed to serialize chunk metadata")?;
                fields["text"] = json!(record.text);
                fields["chunk_id"] = json!(record.id);
                let payload: HashMap<String, Value> =
                    serde_json::from_value(fields).context("Failed to build point payload")?;

                Ok(PointStruct::new(point_id, record.vector.values, payload))
            })
            .collect::<Result<Vec<_>>>()?;

        let upsert_request = UpsertPointsBuilder::new(COLLECTION_NAME, points).build();

        self.client
            .upsert_points(upsert_request)
            .await
            .with_context(|| format!("Failed to upsert points in collection {}", COLLECTION_NAME))?;

        Ok(())
    }

    async fn get_by_metadata(
        &self,
        filter: &HashMap<String, String>,
    ) -> Result<Vec<RetrievedChunk>> {
        let scroll_request = ScrollPointsBuilder::new(COLLECTION_NAME)
            .filter(build_filter(filter))
            .limit(SCROLL_LIMIT)
            .with_payload(true);

        let scroll_response = self
            .client
            .scroll(scroll_request)
            .await
            .with_context(|| format!("Failed to fetch points from collection {}", COLLECTION_NAME))?;

        let chunks = scroll_response
            .result
            .into_iter()
            .filter_map(|point| chunk_from_payload(&point.payload))
            .collect();

        Ok(chunks)
    }

    async fn query_nearest(
        &self,
        vector: Embedding,
        filter: Option<&HashMap<String, String>>,
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        use qdrant_client::qdrant::{with_payload_selector, SearchPoints, WithPayloadSelector};

        let search_request = SearchPoints {
            collection_name: COLLECTION_NAME.to_string(),
            vector: vector.values,
            limit: limit as u64,
            filter: filter.map(build_filter),
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let search_response = self
            .client
            .search_points(search_request)
            .await
            .with_context(|| format!("Failed to search collection {}", COLLECTION_NAME))?;

        let chunks = search_response
            .result
            .into_iter()
            .filter_map(|scored_point| chunk_from_payload(&scored_point.payload))
            .collect();

        Ok(chunks)
    }
}

/// Build a Qdrant filter that requires every key/value pair to match exactly.
fn build_filter(filter: &HashMap<String, String>) -> Filter {
    Filter::must(
        filter
            .iter()
            .map(|(key, value)| Condition::matches(key.as_str(), value.clone())),
    )
}

/// Rebuild a retrieved chunk from a point payload; points with missing or
/// mistyped fields are dropped.
fn chunk_from_payload(payload: &HashMap<String, Value>) -> Option<RetrievedChunk> {
    let text = payload.get("text")?.as_str()?.to_string();
    let meta = ChunkMeta {
        node_id: payload.get("node_id")?.as_str()?.to_string(),
        kind: payload.get("type")?.as_str()?.to_string(),
        title: payload.get("title")?.as_str()?.to_string(),
        title_norm: payload.get("title_norm")?.as_str()?.to_string(),
        chapter: payload.get("chapter")?.as_str()?.to_string(),
        section: payload.get("section")?.as_str()?.to_string(),
        chunk_index: payload.get("chunk_index")?.as_integer()? as usize,
    };

    Some(RetrievedChunk { text, meta })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> HashMap<String, Value> {
        serde_json::from_value(json!({
            "text": "Processing shall be lawful only if...",
            "chunk_id": "art_6:0",
            "node_id": "art_6",
            "type": "article",
            "title": "Article 6 \u{2014} Lawfulness of processing",
            "title_norm": "article 6 \u{2014} lawfulness of processing",
            "chapter": "Chapter II",
            "section": "",
            "chunk_index": 0,
        }))
        .unwrap()
    }

    #[test]
    fn rebuilds_chunk_from_payload() {
        let chunk = chunk_from_payload(&sample_payload()).unwrap();
        assert_eq!(chunk.meta.node_id, "art_6");
        assert_eq!(chunk.meta.kind, "article");
        assert_eq!(chunk.meta.chunk_index, 0);
        assert!(chunk.text.starts_with("Processing"));
    }

    #[test]
    fn drops_payload_with_missing_fields() {
        let mut payload = sample_payload();
        payload.remove("node_id");
        assert!(chunk_from_payload(&payload).is_none());
    }

    #[test]
    fn metadata_serializes_with_payload_field_names() {
        let meta = ChunkMeta {
            node_id: "art_6".to_string(),
            kind: "article".to_string(),
            title: "Article 6".to_string(),
            title_norm: "article 6".to_string(),
            chapter: String::new(),
            section: String::new(),
            chunk_index: 1,
        };
        let fields = serde_json::to_value(&meta).unwrap();
        assert_eq!(fields["type"], json!("article"));
        assert_eq!(fields["node_id"], json!("art_6"));
        assert_eq!(fields["chunk_index"], json!(1));
    }

    #[test]
    fn point_ids_are_stable_across_runs() {
        let a = Uuid::new_v5(&Uuid::NAMESPACE_OID, "art_6:0".as_bytes());
        let b = Uuid::new_v5(&Uuid::NAMESPACE_OID, "art_6:0".as_bytes());
        let other = Uuid::new_v5(&Uuid::NAMESPACE_OID, "art_6:1".as_bytes());
        assert_eq!(a, b);
        assert_ne!(a, other);
    }
}
