//! Repository layer for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Equality filter over a domain/document's denormalized search attributes,
/// compiled to a JSONB containment check so no attribute name is ever
/// interpolated into SQL.
#[derive(Debug, Clone, Default)]
pub struct AttributeFilter {
    terms: serde_json::Map<String, serde_json::Value>,
}

impl AttributeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.terms.insert(key.into(), value);
        self
    }

    fn as_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.terms.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Domains
    // ============================================

    pub async fn create_domain(&self, input: CreateDomain) -> Result<DomainRow> {
        let topics_json = serde_json::to_value(&input.topics)?;
        let audience_json = serde_json::to_value(&input.target_audience)?;

        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            INSERT INTO domains (id, owner_id, title, description, slug, topics, quality_criteria, target_audience, workflow_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, owner_id, title, description, slug, status, topics, quality_criteria, target_audience, search_attributes, workflow_id, created_at, updated_at
            "#,
        )
        .bind(input.id)
        .bind(&input.owner_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.slug)
        .bind(&topics_json)
        .bind(&input.quality_criteria)
        .bind(&audience_json)
        .bind(input.workflow_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_domain(&self, id: Uuid) -> Result<Option<DomainRow>> {
        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            SELECT id, owner_id, title, description, slug, status, topics, quality_criteria, target_audience, search_attributes, workflow_id, created_at, updated_at
            FROM domains
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_domain_by_workflow(&self, workflow_id: Uuid) -> Result<Option<DomainRow>> {
        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            SELECT id, owner_id, title, description, slug, status, topics, quality_criteria, target_audience, search_attributes, workflow_id, created_at, updated_at
            FROM domains
            WHERE workflow_id = $1
            "#,
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Active-slug collision check: true if a domain with this slug exists
    /// in a non-terminal-rejected status (mirrors the partial unique index).
    pub async fn slug_is_active(&self, slug: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM domains
                WHERE slug = $1
                  AND status IN ('proposed', 'researching', 'analyzing', 'awaiting_owner', 'active')
            ) as exists
            "#,
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<bool, _>("exists"))
    }

    pub async fn update_domain(&self, id: Uuid, input: UpdateDomain) -> Result<Option<DomainRow>> {
        let row = sqlx::query_as::<_, DomainRow>(
            r#"
            UPDATE domains
            SET
                status = COALESCE($2, status),
                search_attributes = COALESCE($3, search_attributes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, owner_id, title, description, slug, status, topics, quality_criteria, target_audience, search_attributes, workflow_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.status)
        .bind(&input.search_attributes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_domains(
        &self,
        filter: AttributeFilter,
        pagination: Pagination,
    ) -> Result<Vec<DomainRow>> {
        let containment = filter.as_value();

        let rows = sqlx::query_as::<_, DomainRow>(
            r#"
            SELECT id, owner_id, title, description, slug, status, topics, quality_criteria, target_audience, search_attributes, workflow_id, created_at, updated_at
            FROM domains
            WHERE COALESCE(search_attributes, '{}'::jsonb) @> $1::jsonb
            ORDER BY created_at DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(&containment)
        .bind(pagination.offset)
        .bind(pagination.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Documents
    // ============================================

    pub async fn create_document(&self, input: CreateDocument) -> Result<DocumentRow> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (id, domain_id, contributor_id, file_ref, workflow_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, domain_id, contributor_id, file_ref, status, relevance_score, analysis, index_refs, workflow_id, created_at, updated_at
            "#,
        )
        .bind(input.id)
        .bind(input.domain_id)
        .bind(&input.contributor_id)
        .bind(&input.file_ref)
        .bind(input.workflow_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, domain_id, contributor_id, file_ref, status, relevance_score, analysis, index_refs, workflow_id, created_at, updated_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_document_by_workflow(&self, workflow_id: Uuid) -> Result<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, domain_id, contributor_id, file_ref, status, relevance_score, analysis, index_refs, workflow_id, created_at, updated_at
            FROM documents
            WHERE workflow_id = $1
            "#,
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn update_document(
        &self,
        id: Uuid,
        input: UpdateDocument,
    ) -> Result<Option<DocumentRow>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents
            SET
                status = COALESCE($2, status),
                relevance_score = COALESCE($3, relevance_score),
                analysis = COALESCE($4, analysis),
                index_refs = COALESCE($5, index_refs),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, domain_id, contributor_id, file_ref, status, relevance_score, analysis, index_refs, workflow_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.status)
        .bind(input.relevance_score)
        .bind(&input.analysis)
        .bind(&input.index_refs)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_documents_for_domain(
        &self,
        domain_id: Uuid,
        pagination: Pagination,
    ) -> Result<Vec<DocumentRow>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, domain_id, contributor_id, file_ref, status, relevance_score, analysis, index_refs, workflow_id, created_at, updated_at
            FROM documents
            WHERE domain_id = $1
            ORDER BY created_at DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(domain_id)
        .bind(pagination.offset)
        .bind(pagination.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Signal inbox
    // ============================================

    pub async fn append_signal(&self, input: CreateSignal) -> Result<SignalRow> {
        let row = sqlx::query_as::<_, SignalRow>(
            r#"
            INSERT INTO signals (id, user_id, workflow_id, signal_type, data, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, workflow_id, signal_type, data, "timestamp", read, read_at
            "#,
        )
        .bind(input.id)
        .bind(&input.user_id)
        .bind(input.workflow_id)
        .bind(&input.signal_type)
        .bind(&input.data)
        .bind(input.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_inbox(
        &self,
        user_id: &str,
        unread_only: bool,
        signal_type: Option<&str>,
        workflow_id: Option<Uuid>,
        pagination: Pagination,
    ) -> Result<Vec<SignalRow>> {
        let rows = sqlx::query_as::<_, SignalRow>(
            r#"
            SELECT id, user_id, workflow_id, signal_type, data, "timestamp", read, read_at
            FROM signals
            WHERE user_id = $1
              AND ($2 = FALSE OR read = FALSE)
              AND ($3::text IS NULL OR signal_type = $3)
              AND ($4::uuid IS NULL OR workflow_id = $4)
            ORDER BY "timestamp" DESC
            OFFSET $5
            LIMIT $6
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(signal_type)
        .bind(workflow_id)
        .bind(pagination.offset)
        .bind(pagination.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Scoped to `user_id` so a caller can never mark (or even observe the
    /// existence of) another principal's signal as read.
    pub async fn mark_signal_read(
        &self,
        id: Uuid,
        user_id: &str,
        read_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE signals
            SET read = TRUE, read_at = $3
            WHERE id = $1 AND user_id = $2 AND read = FALSE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(read_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_signals_read(
        &self,
        user_id: &str,
        workflow_id: Option<Uuid>,
        read_at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE signals
            SET read = TRUE, read_at = $3
            WHERE user_id = $1 AND read = FALSE AND ($2::uuid IS NULL OR workflow_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(workflow_id)
        .bind(read_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn unread_signal_count(&self, user_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM signals WHERE user_id = $1 AND read = FALSE")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
