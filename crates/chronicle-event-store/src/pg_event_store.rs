//! `PostgreSQL` implementation of the `EventStore` trait.
//!
//! Appends run in one transaction per call. The stream's row in
//! `aggregates` is locked with `SELECT ... FOR UPDATE` for the duration of
//! the version check and insert, which serializes concurrent writers of the
//! same stream without blocking writers of other streams.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use chronicle_core::error::DomainError;
use chronicle_core::event::{EventData, Metadata};
use chronicle_core::store::{EventStore, NewEvent, StoredEvent};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Unique constraint over `(aggregate_type, aggregate_id, aggregate_version)`.
const STREAM_VERSION_CONSTRAINT: &str = "events_stream_version_key";

const SELECT_EVENTS: &str = "SELECT position, event_id, aggregate_type, aggregate_id, event_type, \
     event_data, event_version, aggregate_version, metadata, occurred_at FROM events";

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a migration fails.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), DomainError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Infrastructure(format!("migration failed: {e}")))
    }

    /// Ensures the stream's summary row exists and locks it, returning the
    /// committed version.
    async fn lock_stream(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO aggregates (aggregate_type, aggregate_id, version)
            VALUES ($1, $2, 0)
            ON CONFLICT (aggregate_type, aggregate_id) DO NOTHING
            ",
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .execute(&mut **tx)
        .await?;

        sqlx::query_scalar(
            r"
            SELECT version
            FROM aggregates
            WHERE aggregate_type = $1 AND aggregate_id = $2
            FOR UPDATE
            ",
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Inserts `events` after `current_version` and moves the summary row to
    /// the new version, which is returned.
    async fn append(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_type: &str,
        aggregate_id: &str,
        events: &[NewEvent],
        current_version: i64,
    ) -> Result<i64, sqlx::Error> {
        let mut next_version = current_version;
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO events (event_id, aggregate_type, aggregate_id, event_type, event_data, \
             event_version, aggregate_version, metadata, occurred_at) ",
        );
        qb.push_values(events, |mut b, event| {
            next_version += 1;
            b.push_bind(event.event_id)
                .push_bind(aggregate_type)
                .push_bind(aggregate_id)
                .push_bind(&event.event_type)
                .push_bind(Json(&event.event_data))
                .push_bind(event.event_version)
                .push_bind(next_version)
                .push_bind(Json(&event.metadata))
                .push_bind(event.occurred_at);
        });
        qb.build().execute(&mut **tx).await?;

        sqlx::query(
            r"
            UPDATE aggregates
            SET version = $3, updated_at = NOW()
            WHERE aggregate_type = $1 AND aggregate_id = $2
            ",
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .bind(next_version)
        .execute(&mut **tx)
        .await?;

        Ok(next_version)
    }

    async fn fetch(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        rows.iter()
            .map(decode_row)
            .collect::<Result<_, _>>()
            .map_err(infrastructure)
    }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

fn is_stream_version_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.constraint() == Some(STREAM_VERSION_CONSTRAINT)
    )
}

fn conflict(aggregate_type: &str, aggregate_id: &str, expected: i64, actual: i64) -> DomainError {
    DomainError::ConcurrencyConflict {
        aggregate_type: aggregate_type.to_owned(),
        aggregate_id: aggregate_id.to_owned(),
        expected,
        actual,
    }
}

fn decode_row(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    let event_data: Json<EventData> = row.try_get("event_data")?;
    let metadata: Json<Metadata> = row.try_get("metadata")?;
    Ok(StoredEvent {
        position: row.try_get("position")?,
        event_id: row.try_get("event_id")?,
        aggregate_type: row.try_get("aggregate_type")?,
        aggregate_id: row.try_get("aggregate_id")?,
        event_type: row.try_get("event_type")?,
        event_data: event_data.0,
        event_version: row.try_get("event_version")?,
        aggregate_version: row.try_get("aggregate_version")?,
        metadata: metadata.0,
        occurred_at: row.try_get("occurred_at")?,
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self, events), fields(events_len = events.len()))]
    async fn save_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        events: &[NewEvent],
        expected_version: i64,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let current_version = Self::lock_stream(&mut tx, aggregate_type, aggregate_id)
            .await
            .map_err(infrastructure)?;
        if current_version != expected_version {
            tx.rollback().await.map_err(infrastructure)?;
            warn!(current_version, "rejected append with stale expected version");
            return Err(conflict(
                aggregate_type,
                aggregate_id,
                expected_version,
                current_version,
            ));
        }

        let new_version =
            match Self::append(&mut tx, aggregate_type, aggregate_id, events, current_version)
                .await
            {
                Ok(version) => version,
                Err(err) if is_stream_version_violation(&err) => {
                    tx.rollback().await.map_err(infrastructure)?;
                    let actual = self.current_version(aggregate_type, aggregate_id).await?;
                    warn!(actual, "stream version taken by a concurrent writer");
                    return Err(conflict(aggregate_type, aggregate_id, expected_version, actual));
                }
                Err(err) => return Err(infrastructure(err)),
            };

        tx.commit().await.map_err(infrastructure)?;
        debug!(new_version, "events appended");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_events(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_EVENTS);
        qb.push(" WHERE aggregate_type = ")
            .push_bind(aggregate_type)
            .push(" AND aggregate_id = ")
            .push_bind(aggregate_id)
            .push(" ORDER BY aggregate_version ASC");
        self.fetch(qb).await
    }

    #[instrument(skip(self))]
    async fn get_all_events(
        &self,
        from_event_id: Option<Uuid>,
        limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_EVENTS);
        if let Some(from) = from_event_id {
            // An unknown cursor makes the subquery NULL, which matches nothing.
            qb.push(" WHERE position > (SELECT position FROM events WHERE event_id = ")
                .push_bind(from)
                .push(")");
        }
        qb.push(" ORDER BY position ASC LIMIT ").push_bind(i64::from(limit));
        self.fetch(qb).await
    }

    #[instrument(skip(self))]
    async fn get_events_by_type(
        &self,
        event_type: &str,
        limit: u32,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_EVENTS);
        qb.push(" WHERE event_type = ")
            .push_bind(event_type)
            .push(" ORDER BY position ASC LIMIT ")
            .push_bind(i64::from(limit));
        self.fetch(qb).await
    }

    #[instrument(skip(self))]
    async fn current_version(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<i64, DomainError> {
        let version: Option<i64> = sqlx::query_scalar(
            r"
            SELECT version
            FROM aggregates
            WHERE aggregate_type = $1 AND aggregate_id = $2
            ",
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(version.unwrap_or(0))
    }
}
