//! Persistence for radius lookup job records.
//!
//! One record per job id. A record is created once in the `in_progress`
//! state and overwritten once with its `complete` form; nothing else is
//! allowed. Creation fails if a record for the id already exists, so two
//! writers can never race on the same job.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use proximity_lookup_models::{JobStatus, RadiusLookupJob};
use thiserror::Error;
use tokio::io::AsyncWriteExt as _;
use uuid::Uuid;

/// Errors from job record persistence.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// A record for this id already exists.
    #[error("Radius lookup {0} already exists")]
    Conflict(Uuid),

    /// No record exists for this id.
    #[error("Radius lookup {0} not found")]
    NotFound(Uuid),

    /// A new record must start out in progress.
    #[error("Radius lookup {id} must be created in_progress, got {status}")]
    NotInitial {
        /// Job id.
        id: Uuid,
        /// Status of the rejected record.
        status: JobStatus,
    },

    /// The stored record cannot move to the requested status.
    #[error("Radius lookup {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Job id.
        id: Uuid,
        /// Status currently stored.
        from: JobStatus,
        /// Status of the rejected record.
        to: JobStatus,
    },

    /// Reading or writing the record failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The record could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JobStoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Storage for radius lookup job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Writes a new `in_progress` record.
    ///
    /// # Errors
    ///
    /// * [`JobStoreError::Conflict`] if a record with this id exists
    /// * [`JobStoreError::NotInitial`] if `job` is not `in_progress`
    /// * [`JobStoreError::Io`] or [`JobStoreError::Json`] if the write fails
    async fn create(&self, job: &RadiusLookupJob) -> Result<(), JobStoreError>;

    /// Replaces an `in_progress` record with its `complete` form.
    ///
    /// # Errors
    ///
    /// * [`JobStoreError::NotFound`] if no record with this id exists
    /// * [`JobStoreError::InvalidTransition`] unless the stored record is
    ///   `in_progress` and `job` is `complete`
    /// * [`JobStoreError::Io`] or [`JobStoreError::Json`] if the write fails
    async fn finalize(&self, job: &RadiusLookupJob) -> Result<(), JobStoreError>;

    /// Reads the current record for `id`.
    ///
    /// # Errors
    ///
    /// * [`JobStoreError::NotFound`] if no record with this id exists
    /// * [`JobStoreError::Io`] or [`JobStoreError::Json`] if the read fails
    async fn read(&self, id: Uuid) -> Result<RadiusLookupJob, JobStoreError>;
}

fn check_initial(job: &RadiusLookupJob) -> Result<(), JobStoreError> {
    if job.status == JobStatus::InProgress {
        Ok(())
    } else {
        Err(JobStoreError::NotInitial {
            id: job.guid,
            status: job.status,
        })
    }
}

fn check_finalize(current: &RadiusLookupJob, next: &RadiusLookupJob) -> Result<(), JobStoreError> {
    if current.status == JobStatus::InProgress && next.status == JobStatus::Complete {
        Ok(())
    } else {
        Err(JobStoreError::InvalidTransition {
            id: next.guid,
            from: current.status,
            to: next.status,
        })
    }
}

/// Stores each job as `<dir>/<job id>.json`.
///
/// Every write goes to a hidden temporary file in the same directory first.
/// Creation hard-links the temporary file into place, which fails if the
/// target exists; finalization renames over the existing record. Readers
/// therefore only ever see complete JSON documents.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    /// Opens the store, creating `dir` if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`JobStoreError::Io`] if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, JobStoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| JobStoreError::io(&dir, e))?;
        log::debug!("Radius lookup records stored in {}", dir.display());
        Ok(Self { dir })
    }

    /// The directory holding the records.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `id`.
    #[must_use]
    pub fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn write_temp(&self, job: &RadiusLookupJob) -> Result<PathBuf, JobStoreError> {
        let bytes = serde_json::to_vec(job)?;
        let path = self
            .dir
            .join(format!(".{}.{}.tmp", job.guid, Uuid::new_v4().simple()));

        let written = async {
            let mut file = tokio::fs::File::create(&path).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            remove_temp(&path).await;
            return Err(JobStoreError::io(&path, e));
        }

        Ok(path)
    }
}

async fn remove_temp(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            log::warn!("Failed to remove temporary file {}: {e}", path.display());
        }
        _ => {}
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn create(&self, job: &RadiusLookupJob) -> Result<(), JobStoreError> {
        check_initial(job)?;

        let path = self.record_path(job.guid);
        let tmp = self.write_temp(job).await?;
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        remove_temp(&tmp).await;

        match linked {
            Ok(()) => {
                log::debug!("Created {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(JobStoreError::Conflict(job.guid)),
            Err(e) => Err(JobStoreError::io(&path, e)),
        }
    }

    async fn finalize(&self, job: &RadiusLookupJob) -> Result<(), JobStoreError> {
        let current = self.read(job.guid).await?;
        check_finalize(&current, job)?;

        let path = self.record_path(job.guid);
        let tmp = self.write_temp(job).await?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            remove_temp(&tmp).await;
            return Err(JobStoreError::io(&path, e));
        }

        log::debug!("Finalized {}", path.display());
        Ok(())
    }

    async fn read(&self, id: Uuid) -> Result<RadiusLookupJob, JobStoreError> {
        let path = self.record_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(JobStoreError::NotFound(id)),
            Err(e) => return Err(JobStoreError::io(&path, e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Keeps job records in memory. Records are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<BTreeMap<Uuid, RadiusLookupJob>>,
}

impl MemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &RadiusLookupJob) -> Result<(), JobStoreError> {
        check_initial(job)?;

        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.entry(job.guid) {
            Entry::Occupied(_) => Err(JobStoreError::Conflict(job.guid)),
            Entry::Vacant(entry) => {
                entry.insert(job.clone());
                Ok(())
            }
        }
    }

    async fn finalize(&self, job: &RadiusLookupJob) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        let current = jobs
            .get_mut(&job.guid)
            .ok_or(JobStoreError::NotFound(job.guid))?;
        check_finalize(current, job)?;
        *current = job.clone();
        Ok(())
    }

    async fn read(&self, id: Uuid) -> Result<RadiusLookupJob, JobStoreError> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(JobStoreError::NotFound(id))
    }
}
