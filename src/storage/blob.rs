use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

pub type BlobReader = BufReader<File>;

const MAX_NAME_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found")]
    NotFound,
    #[error("invalid blob name")]
    InvalidName,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Byte storage addressed by storage-internal names.
///
/// Blobs are written to a temp file and renamed into place on commit, so a
/// blob is never visible under its final name until it is complete.
#[derive(Clone)]
pub struct BlobStorage {
    base_path: PathBuf,
}

impl BlobStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("files"),
        }
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.base_path.join("objects").join(&name[0..2]).join(name)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    /// Opens a writer for a new blob. Nothing is visible under `name` until
    /// [`BlobWriter::commit`] succeeds.
    pub async fn create(&self, name: &str) -> Result<BlobWriter, StorageError> {
        validate_name(name)?;

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = File::create(&temp_path).await?;

        Ok(BlobWriter {
            file,
            temp_path,
            final_path: self.blob_path(name),
            written: 0,
        })
    }

    pub async fn open(&self, name: &str) -> Result<(BlobReader, i64), StorageError> {
        validate_name(name)?;
        let path = self.blob_path(name);
        let file = File::open(&path).await.map_err(StorageError::from_io)?;

        let metadata = file.metadata().await?;
        let size = metadata.len() as i64;

        Ok((BufReader::new(file), size))
    }

    pub async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        validate_name(name)?;
        let path = self.blob_path(name);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

pub struct BlobWriter {
    file: File,
    temp_path: PathBuf,
    final_path: PathBuf,
    written: i64,
}

impl BlobWriter {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as i64;
        Ok(())
    }

    /// Flushes, syncs and moves the blob to its final location.
    /// Returns the number of bytes written.
    pub async fn commit(mut self) -> Result<i64, StorageError> {
        let result = self.finish().await;
        if result.is_err() {
            remove_temp(&self.temp_path).await;
        }
        result
    }

    async fn finish(&mut self) -> Result<i64, StorageError> {
        self.file.flush().await?;
        self.file.sync_all().await?;

        if let Some(parent) = self.final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&self.temp_path, &self.final_path).await?;
        Ok(self.written)
    }

    /// Discards everything written so far.
    pub async fn abort(self) {
        let BlobWriter {
            file, temp_path, ..
        } = self;
        drop(file);
        remove_temp(&temp_path).await;
    }
}

async fn remove_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::error!("Failed to remove temp blob {}: {e}", path.display());
        }
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.len() < 2 || name.len() > MAX_NAME_LEN {
        return Err(StorageError::InvalidName);
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StorageError::InvalidName);
    }

    Ok(())
}
