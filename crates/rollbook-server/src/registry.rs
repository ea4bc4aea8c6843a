//! The share registry: code → published snapshot.
//!
//! Each published snapshot lives in one JSON file named after its code.
//! Codes come from a validated alphabet (uppercase letters and digits
//! only), so a code can never name a path outside the storage directory.
//!
//! Mutating operations go through [`ShareStore::update`], which serializes
//! read-modify-write cycles per code behind an async lock — two concurrent
//! message sends to the same code land as two appends instead of the last
//! writer clobbering the first.  Publishing never takes a lock: every
//! publish writes a fresh code, and a superseded code keeps serving the
//! snapshot frozen at the moment it was replaced.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use rollbook_shared::code::ShareCode;
use rollbook_shared::snapshot::ClassSnapshot;

use crate::error::ServerError;

pub struct ShareStore {
    base_path: PathBuf,
    ttl: Option<Duration>,
    locks: Mutex<HashMap<ShareCode, Arc<Mutex<()>>>>,
}

impl ShareStore {
    pub async fn new(base_path: PathBuf, ttl: Option<Duration>) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::Storage(format!(
                "Failed to create share directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), ttl = ?ttl, "Share store initialized");

        Ok(Self {
            base_path,
            ttl,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Store a snapshot under a fresh random code and return the code.
    ///
    /// Any code previously issued for the same class is left untouched: it
    /// keeps resolving to the snapshot it was given, until the expiry
    /// policy (if any) reaps it.
    pub async fn publish(&self, mut snapshot: ClassSnapshot) -> Result<ShareCode, ServerError> {
        snapshot.validate()?;

        // Collisions are rare (32^6 codes) but cheap to re-roll.
        let code = loop {
            let candidate = ShareCode::generate();
            if !self.entry_path(&candidate).exists() {
                break candidate;
            }
        };

        // Embed the code and the publish instant so the stored document is
        // self-describing.
        snapshot.class.share_code = Some(code.clone());
        snapshot.shared_at = Some(Utc::now());

        self.write(&code, &snapshot).await?;

        info!(code = %code, class = %snapshot.class.id, "snapshot published");
        Ok(code)
    }

    /// Fetch the snapshot stored under a code.
    ///
    /// Expired entries are deleted on access and reported as [`ServerError::Expired`].
    pub async fn fetch(&self, code: &ShareCode) -> Result<ClassSnapshot, ServerError> {
        let snapshot = self.read(code).await?;

        if self.is_expired(&snapshot) {
            self.remove(code).await?;
            debug!(code = %code, "expired entry removed on access");
            return Err(ServerError::Expired);
        }

        Ok(snapshot)
    }

    /// Run a read-modify-write cycle against one entry, serialized per code.
    pub async fn update<F>(&self, code: &ShareCode, mutate: F) -> Result<(), ServerError>
    where
        F: FnOnce(&mut ClassSnapshot) -> Result<(), ServerError>,
    {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(code.clone()).or_default().clone()
        };
        let _guard = lock.lock().await;

        let mut snapshot = self.fetch(code).await?;
        mutate(&mut snapshot)?;
        self.write(code, &snapshot).await
    }

    /// Delete every entry past the TTL.  Returns how many were removed.
    pub async fn sweep_expired(&self) -> Result<usize, ServerError> {
        if self.ttl.is_none() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to list shares: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to read directory entry: {}", e)))?
        {
            let name = entry.file_name();
            let Some(code) = name
                .to_str()
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|c| ShareCode::parse(c).ok())
            else {
                continue;
            };

            match self.read(&code).await {
                Ok(snapshot) if self.is_expired(&snapshot) => {
                    self.remove(&code).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(code = %code, error = %e, "skipping unreadable entry in sweep"),
            }
        }

        if removed > 0 {
            info!(removed, "expired shares swept");
        }
        Ok(removed)
    }

    fn is_expired(&self, snapshot: &ClassSnapshot) -> bool {
        match (self.ttl, snapshot.shared_at) {
            (Some(ttl), Some(shared_at)) => {
                let age = Utc::now() - shared_at;
                age.to_std().map(|age| age > ttl).unwrap_or(false)
            }
            _ => false,
        }
    }

    async fn read(&self, code: &ShareCode) -> Result<ClassSnapshot, ServerError> {
        let path = self.entry_path(code);
        if !path.exists() {
            return Err(ServerError::NotFound("Code not found".to_string()));
        }

        let json = fs::read_to_string(&path)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to read entry {}: {}", code, e)))?;

        ClassSnapshot::from_json(&json)
            .map_err(|e| ServerError::Storage(format!("Corrupt entry {}: {}", code, e)))
    }

    async fn write(&self, code: &ShareCode, snapshot: &ClassSnapshot) -> Result<(), ServerError> {
        let json = snapshot
            .to_json()
            .map_err(|e| ServerError::Internal(format!("Serialization failed: {}", e)))?;

        fs::write(self.entry_path(code), json)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to write entry {}: {}", code, e)))?;

        debug!(code = %code, "entry written");
        Ok(())
    }

    async fn remove(&self, code: &ShareCode) -> Result<(), ServerError> {
        fs::remove_file(self.entry_path(code))
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to delete entry {}: {}", code, e)))
    }

    fn entry_path(&self, code: &ShareCode) -> PathBuf {
        // Codes are uppercase alphanumerics by construction, safe as file
        // names.
        self.base_path.join(format!("{}.json", code.as_str()))
    }
}
