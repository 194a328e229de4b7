//! Postgres sync store
//!
//! Real transactions back the atomicity the engine depends on: the
//! optimistic insert and its submission record commit together, and each
//! confirmation takes the submission row `FOR UPDATE` so duplicate
//! deliveries serialize and the second one observes `CONFIRMED`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redress_common::{
    AuditEntry, ConfirmationState, ContentAddress, GrievanceRow, GrievanceStatus, Sentiment,
    SubmissionHandle, SubmissionKind, SubmissionRecord,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use super::{
    Confirmation, GrievanceFilter, NewGrievance, PendingStatusUpdate, ResolutionStats, StoreError,
    SyncStore,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS grievances (
    id BIGSERIAL PRIMARY KEY,
    ledger_id BIGINT UNIQUE,
    submitter_row_id BIGINT NOT NULL,
    submitter_id TEXT NOT NULL,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    evidence_ref TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Not Processed',
    sentiment TEXT NOT NULL DEFAULT 'Neutral',
    resolved_by BIGINT,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
);
CREATE TABLE IF NOT EXISTS submissions (
    handle TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    row_id BIGINT NOT NULL REFERENCES grievances(id),
    expected_status TEXT NOT NULL,
    actor_row_id BIGINT,
    state TEXT NOT NULL DEFAULT 'PENDING',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    confirmed_at TIMESTAMPTZ
);
CREATE TABLE IF NOT EXISTS audit_log (
    id BIGSERIAL PRIMARY KEY,
    row_id BIGINT NOT NULL REFERENCES grievances(id),
    ledger_id BIGINT NOT NULL,
    from_status TEXT,
    to_status TEXT NOT NULL,
    handle TEXT NOT NULL,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS submissions_row_id_idx ON submissions (row_id);
CREATE INDEX IF NOT EXISTS audit_log_ledger_id_idx ON audit_log (ledger_id)
"#;

/// Postgres implementation of [`SyncStore`]
pub struct PgSyncStore {
    pool: PgPool,
}

impl PgSyncStore {
    /// Connect and bootstrap the schema
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!("connected to Postgres sync store");
        Ok(store)
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';') {
            if statement.trim().is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

fn parse_status(label: &str) -> Result<GrievanceStatus, StoreError> {
    GrievanceStatus::from_label(label)
        .ok_or_else(|| StoreError::Database(format!("unknown status label: {label}")))
}

fn parse_sentiment(label: &str) -> Result<Sentiment, StoreError> {
    Sentiment::from_label(label)
        .ok_or_else(|| StoreError::Database(format!("unknown sentiment label: {label}")))
}

fn grievance_from_row(row: &PgRow) -> Result<GrievanceRow, StoreError> {
    Ok(GrievanceRow {
        id: row.try_get("id")?,
        ledger_id: row
            .try_get::<Option<i64>, _>("ledger_id")?
            .map(|id| id as u64),
        submitter_row_id: row.try_get("submitter_row_id")?,
        submitter_id: row.try_get("submitter_id")?,
        title: row.try_get("title")?,
        category: row.try_get("category")?,
        evidence_ref: ContentAddress::new(row.try_get::<String, _>("evidence_ref")?),
        status: parse_status(&row.try_get::<String, _>("status")?)?,
        sentiment: parse_sentiment(&row.try_get::<String, _>("sentiment")?)?,
        resolved_by: row.try_get("resolved_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn submission_from_row(row: &PgRow) -> Result<SubmissionRecord, StoreError> {
    let kind: String = row.try_get("kind")?;
    let state: String = row.try_get("state")?;
    Ok(SubmissionRecord {
        handle: SubmissionHandle::new(row.try_get::<String, _>("handle")?),
        kind: SubmissionKind::from_label(&kind)
            .ok_or_else(|| StoreError::Database(format!("unknown submission kind: {kind}")))?,
        row_id: row.try_get("row_id")?,
        expected_status: parse_status(&row.try_get::<String, _>("expected_status")?)?,
        actor_row_id: row.try_get("actor_row_id")?,
        state: ConfirmationState::from_label(&state)
            .ok_or_else(|| StoreError::Database(format!("unknown submission state: {state}")))?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        confirmed_at: row.try_get::<Option<DateTime<Utc>>, _>("confirmed_at")?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditEntry, StoreError> {
    Ok(AuditEntry {
        id: row.try_get("id")?,
        row_id: row.try_get("row_id")?,
        ledger_id: row.try_get::<i64, _>("ledger_id")? as u64,
        from_status: row
            .try_get::<Option<String>, _>("from_status")?
            .as_deref()
            .map(parse_status)
            .transpose()?,
        to_status: parse_status(&row.try_get::<String, _>("to_status")?)?,
        handle: SubmissionHandle::new(row.try_get::<String, _>("handle")?),
        recorded_at: row.try_get::<DateTime<Utc>, _>("recorded_at")?,
    })
}

fn map_unique_violation(err: sqlx::Error, handle: &SubmissionHandle) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) => {
            StoreError::DuplicateHandle(handle.clone())
        }
        _ => err.into(),
    }
}

#[async_trait]
impl SyncStore for PgSyncStore {
    async fn insert_grievance(&self, new: NewGrievance) -> Result<GrievanceRow, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO grievances \
             (submitter_row_id, submitter_id, title, category, evidence_ref, status, sentiment, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) \
             RETURNING id",
        )
        .bind(new.submitter_row_id)
        .bind(&new.submitter_id)
        .bind(&new.title)
        .bind(&new.category)
        .bind(new.evidence_ref.as_str())
        .bind(GrievanceStatus::NotProcessed.label())
        .bind(new.sentiment.label())
        .bind(new.submitted_at)
        .fetch_one(&mut *tx)
        .await?;
        let row_id: i64 = inserted.try_get("id")?;

        sqlx::query(
            "INSERT INTO submissions (handle, kind, row_id, expected_status, state) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(new.handle.as_str())
        .bind(SubmissionKind::Create.label())
        .bind(row_id)
        .bind(GrievanceStatus::NotProcessed.label())
        .bind(ConfirmationState::Pending.label())
        .execute(&mut *tx)
        .await
        .map_err(|err| map_unique_violation(err, &new.handle))?;

        tx.commit().await?;

        Ok(GrievanceRow {
            id: row_id,
            ledger_id: None,
            submitter_row_id: new.submitter_row_id,
            submitter_id: new.submitter_id,
            title: new.title,
            category: new.category,
            evidence_ref: new.evidence_ref,
            status: GrievanceStatus::NotProcessed,
            sentiment: new.sentiment,
            resolved_by: None,
            created_at: new.submitted_at,
            updated_at: new.submitted_at,
        })
    }

    async fn record_pending(&self, pending: PendingStatusUpdate) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO submissions (handle, kind, row_id, expected_status, actor_row_id, state) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(pending.handle.as_str())
        .bind(SubmissionKind::StatusUpdate.label())
        .bind(pending.row_id)
        .bind(pending.expected_status.label())
        .bind(pending.actor_row_id)
        .bind(ConfirmationState::Pending.label())
        .execute(&self.pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db)
                if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation) =>
            {
                StoreError::RowNotFound(pending.row_id)
            }
            _ => map_unique_violation(err, &pending.handle),
        })?;
        Ok(())
    }

    async fn resolve(
        &self,
        handle: &SubmissionHandle,
    ) -> Result<Option<SubmissionRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM submissions WHERE handle = $1")
            .bind(handle.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(submission_from_row).transpose()
    }

    async fn confirm_creation(
        &self,
        handle: &SubmissionHandle,
        ledger_id: u64,
        created_at: i64,
    ) -> Result<Confirmation, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(submission) =
            sqlx::query("SELECT kind, row_id, state FROM submissions WHERE handle = $1 FOR UPDATE")
                .bind(handle.as_str())
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(Confirmation::UnknownHandle);
        };
        if submission.try_get::<String, _>("state")? == ConfirmationState::Confirmed.label() {
            return Ok(Confirmation::AlreadyConfirmed);
        }
        if submission.try_get::<String, _>("kind")? != SubmissionKind::Create.label() {
            return Ok(Confirmation::UnknownHandle);
        }
        let row_id: i64 = submission.try_get("row_id")?;

        sqlx::query(
            "UPDATE grievances SET ledger_id = $1, created_at = $2, updated_at = $2 \
             WHERE id = $3 AND ledger_id IS NULL",
        )
        .bind(ledger_id as i64)
        .bind(created_at)
        .bind(row_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT * FROM grievances WHERE id = $1")
            .bind(row_id)
            .fetch_one(&mut *tx)
            .await?;
        let row = grievance_from_row(&row)?;

        sqlx::query(
            "INSERT INTO audit_log (row_id, ledger_id, from_status, to_status, handle) \
             VALUES ($1, $2, NULL, $3, $4)",
        )
        .bind(row_id)
        .bind(ledger_id as i64)
        .bind(row.status.label())
        .bind(handle.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE submissions SET state = $1, confirmed_at = now() WHERE handle = $2",
        )
        .bind(ConfirmationState::Confirmed.label())
        .bind(handle.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Confirmation::Applied(row))
    }

    async fn confirm_status(
        &self,
        handle: &SubmissionHandle,
        ledger_id: u64,
        status: GrievanceStatus,
        updated_at: i64,
    ) -> Result<Confirmation, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(submission) =
            sqlx::query("SELECT kind, row_id, state FROM submissions WHERE handle = $1 FOR UPDATE")
                .bind(handle.as_str())
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(Confirmation::UnknownHandle);
        };
        if submission.try_get::<String, _>("state")? == ConfirmationState::Confirmed.label() {
            return Ok(Confirmation::AlreadyConfirmed);
        }
        if submission.try_get::<String, _>("kind")? != SubmissionKind::StatusUpdate.label() {
            return Ok(Confirmation::UnknownHandle);
        }
        let row_id: i64 = submission.try_get("row_id")?;

        let current = sqlx::query("SELECT * FROM grievances WHERE id = $1 FOR UPDATE")
            .bind(row_id)
            .fetch_one(&mut *tx)
            .await?;
        let current = grievance_from_row(&current)?;
        if current.ledger_id.is_none() {
            // Status event racing ahead of its record's creation event:
            // leave the submission pending and skip
            return Ok(Confirmation::UnknownHandle);
        }

        sqlx::query("UPDATE grievances SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.label())
            .bind(updated_at)
            .bind(row_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO audit_log (row_id, ledger_id, from_status, to_status, handle) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row_id)
        .bind(ledger_id as i64)
        .bind(current.status.label())
        .bind(status.label())
        .bind(handle.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE submissions SET state = $1, confirmed_at = now() WHERE handle = $2",
        )
        .bind(ConfirmationState::Confirmed.label())
        .bind(handle.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut row = current;
        row.status = status;
        row.updated_at = updated_at;
        Ok(Confirmation::Applied(row))
    }

    async fn set_resolver(&self, row_id: i64, admin_row_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE grievances SET resolved_by = $1 WHERE id = $2")
            .bind(admin_row_id)
            .bind(row_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound(row_id));
        }
        Ok(())
    }

    async fn get(&self, row_id: i64) -> Result<Option<GrievanceRow>, StoreError> {
        let row = sqlx::query("SELECT * FROM grievances WHERE id = $1")
            .bind(row_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(grievance_from_row).transpose()
    }

    async fn get_by_ledger_id(&self, ledger_id: u64) -> Result<Option<GrievanceRow>, StoreError> {
        let row = sqlx::query("SELECT * FROM grievances WHERE ledger_id = $1")
            .bind(ledger_id as i64)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(grievance_from_row).transpose()
    }

    async fn list(&self, filter: GrievanceFilter) -> Result<Vec<GrievanceRow>, StoreError> {
        let mut sql = String::from("SELECT * FROM grievances");
        let mut clauses = Vec::new();
        if filter.submitter_row_id.is_some() {
            clauses.push(format!("submitter_row_id = ${}", clauses.len() + 1));
        }
        if filter.status.is_some() {
            clauses.push(format!("status = ${}", clauses.len() + 1));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id DESC");

        let mut query = sqlx::query(&sql);
        if let Some(submitter) = filter.submitter_row_id {
            query = query.bind(submitter);
        }
        if let Some(status) = filter.status {
            query = query.bind(status.label());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(grievance_from_row).collect()
    }

    async fn audit_trail(&self, ledger_id: u64) -> Result<Vec<SubmissionRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT s.* FROM submissions s \
             JOIN grievances g ON s.row_id = g.id \
             WHERE g.ledger_id = $1 \
             ORDER BY s.created_at ASC",
        )
        .bind(ledger_id as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(submission_from_row).collect()
    }

    async fn audit_entries(&self, ledger_id: u64) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM audit_log WHERE ledger_id = $1 ORDER BY id ASC",
        )
        .bind(ledger_id as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn resolution_stats(&self, admin_row_id: i64) -> Result<ResolutionStats, StoreError> {
        let row = sqlx::query(
            "SELECT \
               COUNT(*) FILTER (WHERE status = 'Resolved') AS resolved, \
               COUNT(*) FILTER (WHERE status = 'Rejected') AS rejected, \
               COUNT(*) FILTER (WHERE sentiment = 'Positive') AS positive, \
               COUNT(*) FILTER (WHERE sentiment = 'Negative') AS negative, \
               COUNT(*) FILTER (WHERE sentiment = 'Neutral') AS neutral \
             FROM grievances WHERE resolved_by = $1",
        )
        .bind(admin_row_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ResolutionStats {
            resolved: row.try_get::<i64, _>("resolved")? as u64,
            rejected: row.try_get::<i64, _>("rejected")? as u64,
            positive: row.try_get::<i64, _>("positive")? as u64,
            negative: row.try_get::<i64, _>("negative")? as u64,
            neutral: row.try_get::<i64, _>("neutral")? as u64,
        })
    }
}
