//! Store Implementation

use crate::StoreError;
use chrono::{DateTime, Utc};
use readings::{Location, LocationKind, Sample, SourceKind};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use task_runner::{SerialLane, TaskRunner};
use tracing::{debug, info};

/// A store mutation, dispatched by the single writer lane.
#[derive(Debug)]
pub enum CacheWriteRequest {
    /// Atomically replace all samples of one source with a new set
    ReplaceSamples {
        source: SourceKind,
        samples: Vec<Sample>,
    },
    /// Append samples, keeping prior history
    AppendSamples {
        source: SourceKind,
        samples: Vec<Sample>,
    },
    /// Full-table replace of the location snapshot
    ReplaceLocation { location: Location },
}

/// Handle to the persisted sample/location tables.
///
/// Cloning is cheap; all clones share the pool and the writer lane.
#[derive(Clone)]
pub struct SampleStore {
    pool: SqlitePool,
    writer: SerialLane,
}

impl SampleStore {
    /// Open (creating if missing) a store at the given path.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        info!("Opened sample store at {}", path.display());
        Self::init(pool).await
    }

    /// Open an in-memory store. Used by tests and demo runs.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StoreError::Database)?;
        // One connection, kept alive: a memory database dies with it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS samples (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                celsius REAL,
                reference TEXT,
                time TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_samples_source_seq ON samples (source, seq)")
            .execute(&pool)
            .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS locations (
                location_code TEXT,
                localized_name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                is_gps_available INTEGER NOT NULL,
                location_type TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            writer: TaskRunner::serial_lane(),
        })
    }

    /// Replace all samples of a source with a new set. Returns the number
    /// of records inserted.
    pub async fn replace_source(
        &self,
        source: SourceKind,
        samples: Vec<Sample>,
    ) -> Result<usize, StoreError> {
        self.write(CacheWriteRequest::ReplaceSamples { source, samples })
            .await
    }

    /// Append samples for a source, keeping prior history.
    pub async fn append_samples(
        &self,
        source: SourceKind,
        samples: Vec<Sample>,
    ) -> Result<usize, StoreError> {
        self.write(CacheWriteRequest::AppendSamples { source, samples })
            .await
    }

    /// Replace the location snapshot with a single home row.
    pub async fn replace_home_location(&self, location: Location) -> Result<(), StoreError> {
        self.write(CacheWriteRequest::ReplaceLocation { location })
            .await
            .map(|_| ())
    }

    /// Funnel a mutation onto the writer lane. Requests are committed in
    /// the order they are accepted (FIFO).
    pub async fn write(&self, request: CacheWriteRequest) -> Result<usize, StoreError> {
        let pool = self.pool.clone();
        let handle = self
            .writer
            .submit(async move { apply(&pool, request).await })
            .await
            .map_err(|e| StoreError::WriterLane(e.to_string()))?;
        handle
            .join()
            .await
            .map_err(|e| StoreError::WriterLane(e.to_string()))?
    }

    /// Latest samples of a source, most recent insertion first.
    pub async fn query_latest(
        &self,
        source: SourceKind,
        limit: usize,
    ) -> Result<Vec<Sample>, StoreError> {
        let rows = sqlx::query(
            "SELECT seq, celsius, reference, time FROM samples
             WHERE source = ?1 ORDER BY seq DESC LIMIT ?2",
        )
        .bind(source.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let time_raw: String = row.get("time");
                let time = parse_stored_time(&time_raw)?;
                Ok(Sample {
                    seq: row.get("seq"),
                    source,
                    time,
                    celsius: row.get("celsius"),
                    reference: row.get("reference"),
                })
            })
            .collect()
    }

    /// Number of stored samples for a source.
    pub async fn sample_count(&self, source: SourceKind) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM samples WHERE source = ?1")
            .bind(source.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// The persisted home location, if one exists.
    pub async fn home_location(&self) -> Result<Option<Location>, StoreError> {
        let row = sqlx::query(
            "SELECT location_code, localized_name, latitude, longitude, is_gps_available
             FROM locations WHERE location_type = 'home' LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Location {
            code: row.get("location_code"),
            display_name: row.get("localized_name"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            is_from_live_gps: row.get::<i64, _>("is_gps_available") != 0,
            kind: LocationKind::Home,
        }))
    }
}

/// Execute one write request inside a transaction. Runs on the writer
/// lane only.
async fn apply(pool: &SqlitePool, request: CacheWriteRequest) -> Result<usize, StoreError> {
    match request {
        CacheWriteRequest::ReplaceSamples { source, samples } => {
            let mut tx = pool.begin().await?;
            sqlx::query("DELETE FROM samples WHERE source = ?1")
                .bind(source.as_str())
                .execute(&mut *tx)
                .await?;
            let count = insert_samples(&mut tx, source, &samples).await?;
            tx.commit().await?;
            debug!("Replaced {} with {} samples", source, count);
            Ok(count)
        }
        CacheWriteRequest::AppendSamples { source, samples } => {
            let mut tx = pool.begin().await?;
            let count = insert_samples(&mut tx, source, &samples).await?;
            tx.commit().await?;
            debug!("Appended {} samples to {}", count, source);
            Ok(count)
        }
        CacheWriteRequest::ReplaceLocation { location } => {
            let mut tx = pool.begin().await?;
            sqlx::query("DELETE FROM locations").execute(&mut *tx).await?;
            sqlx::query(
                "INSERT INTO locations
                 (location_code, localized_name, latitude, longitude, is_gps_available, location_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'home')",
            )
            .bind(&location.code)
            .bind(&location.display_name)
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(location.is_from_live_gps as i64)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            debug!("Replaced home location with {}", location.display_name);
            Ok(1)
        }
    }
}

async fn insert_samples(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    source: SourceKind,
    samples: &[Sample],
) -> Result<usize, StoreError> {
    for sample in samples {
        sqlx::query(
            "INSERT INTO samples (source, celsius, reference, time) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(source.as_str())
        .bind(sample.celsius)
        .bind(&sample.reference)
        .bind(sample.time.to_rfc3339())
        .execute(&mut **tx)
        .await?;
    }
    Ok(samples.len())
}

fn parse_stored_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad stored time {:?}: {}", raw, e)))
}
