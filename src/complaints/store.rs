//! Read-only boundary to the portal's complaint record store.
//!
//! The portal owns the `complaints` table; the classifier only consumes the
//! labeled slice of it (rows with a non-empty description and urgency) plus a
//! total row count for the retraining cadence check.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;
use tracing::warn;

use super::{Category, LabeledExample, Urgency};

/// Errors returned when querying the complaint record store.
#[derive(Debug, Error)]
pub enum ComplaintStoreError {
    #[error("Complaint database not found at {0}")]
    MissingDatabase(PathBuf),
    #[error("Complaint query failed: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Source of historical complaints used as real training data.
pub trait ComplaintStore {
    /// Every complaint carrying both a non-empty description and a parseable
    /// urgency label, in storage order.
    fn labeled_examples(&self) -> Result<Vec<LabeledExample>, ComplaintStoreError>;

    /// Total number of complaints on record, labeled or not.
    fn total_count(&self) -> Result<usize, ComplaintStoreError>;
}

impl<T: ComplaintStore> ComplaintStore for Arc<T> {
    fn labeled_examples(&self) -> Result<Vec<LabeledExample>, ComplaintStoreError> {
        self.as_ref().labeled_examples()
    }

    fn total_count(&self) -> Result<usize, ComplaintStoreError> {
        self.as_ref().total_count()
    }
}

/// SQLite-backed store reading the portal's `complaints` table.
pub struct SqliteComplaintStore {
    connection: Connection,
}

impl SqliteComplaintStore {
    /// Open an existing complaint database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ComplaintStoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ComplaintStoreError::MissingDatabase(path.to_path_buf()));
        }
        let connection = Connection::open(path)?;
        Ok(Self { connection })
    }

    /// Wrap an already-open connection, used by tests.
    pub fn from_connection(connection: Connection) -> Self {
        Self { connection }
    }
}

impl ComplaintStore for SqliteComplaintStore {
    fn labeled_examples(&self) -> Result<Vec<LabeledExample>, ComplaintStoreError> {
        let mut stmt = self.connection.prepare_cached(
            "SELECT description, category, urgency
             FROM complaints
             WHERE description IS NOT NULL AND description != ''
               AND urgency IS NOT NULL AND urgency != ''",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut examples = Vec::new();
        for row in rows {
            let (description, category, urgency) = row?;
            let urgency = match Urgency::from_str(&urgency) {
                Ok(urgency) => urgency,
                Err(err) => {
                    warn!("Skipping complaint with unusable label: {err}");
                    continue;
                }
            };
            examples.push(LabeledExample::new(
                description,
                Category::parse_lossy(&category),
                urgency,
            ));
        }
        Ok(examples)
    }

    fn total_count(&self) -> Result<usize, ComplaintStoreError> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM complaints", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

/// In-memory store for tests and the demo binary.
#[derive(Default)]
pub struct MemoryComplaintStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    labeled: Vec<LabeledExample>,
    unlabeled_count: usize,
}

impl MemoryComplaintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a labeled complaint.
    pub fn push(&self, example: LabeledExample) {
        self.lock().labeled.push(example);
    }

    /// Record complaints with no urgency label yet; they only affect counts.
    pub fn push_unlabeled(&self, count: usize) {
        self.lock().unlabeled_count += count;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ComplaintStore for MemoryComplaintStore {
    fn labeled_examples(&self) -> Result<Vec<LabeledExample>, ComplaintStoreError> {
        Ok(self.lock().labeled.clone())
    }

    fn total_count(&self) -> Result<usize, ComplaintStoreError> {
        let state = self.lock();
        Ok(state.labeled.len() + state.unlabeled_count)
    }
}
