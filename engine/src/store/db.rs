//! RocksDB-backed generic key/value layer underneath the Artifact Store
//! and Review Registry. Uses bincode for compact binary serialization,
//! mirroring this codebase's existing state-store idiom.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use super::schema::ALL_CFS;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("lock poisoned")]
    LockPoisoned,

    #[error("column family not found: {0}")]
    ColumnFamilyNotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Shared handle to the underlying database.
pub type SharedDb = Arc<PipelineDb>;

/// Thin RocksDB wrapper providing typed put/get/delete/prefix-scan across
/// column families. The Artifact Store and Review Registry each hold a
/// clone of the same `SharedDb` and operate on their own column families
/// — spec.md treats them as distinct components sharing one durable
/// substrate, not one component doing both jobs.
pub struct PipelineDb {
    db: RwLock<DB>,
    path: PathBuf,
}

impl PipelineDb {
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;
        Ok(Self {
            db: RwLock::new(db),
            path,
        })
    }

    pub fn shared(self) -> SharedDb {
        Arc::new(self)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn put<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> StoreResult<()> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;
        let bytes = bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> StoreResult<Option<T>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;
        match db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn delete(&self, cf_name: &str, key: &str) -> StoreResult<()> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;
        db.delete_cf(&cf, key.as_bytes())?;
        Ok(())
    }

    pub fn list_keys(&self, cf_name: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        let mut keys = Vec::new();
        for result in db.prefix_iterator_cf(&cf, prefix.as_bytes()) {
            let (key, _) = result?;
            if let Ok(key_str) = String::from_utf8(key.to_vec()) {
                if key_str.starts_with(prefix) {
                    keys.push(key_str);
                } else {
                    break;
                }
            }
        }
        Ok(keys)
    }

    /// Like `list_keys` but also returns the raw value bytes, for callers
    /// that want to decode inline without a second round trip.
    pub fn list_entries<T: DeserializeOwned>(
        &self,
        cf_name: &str,
        prefix: &str,
    ) -> StoreResult<Vec<(String, T)>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        let mut out = Vec::new();
        for result in db.prefix_iterator_cf(&cf, prefix.as_bytes()) {
            let (key, value) = result?;
            let Ok(key_str) = String::from_utf8(key.to_vec()) else {
                continue;
            };
            if !key_str.starts_with(prefix) {
                break;
            }
            let decoded: T = bincode::deserialize(&value)
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;
            out.push((key_str, decoded));
        }
        Ok(out)
    }
}
