//! Auditor key registry.
//!
//! Each auditor has exactly one active Ed25519 public key. Rotation replaces
//! it immediately and bumps the key version; there is no window in which the
//! previous key is still accepted. Private keys are handed back once and never
//! stored.

use crate::error::{EngineError, EngineResult};
use crate::types::{CreateAuditorResponse, DeleteResponse, RotateKeyResponse};
use chrono::Utc;
use securematch_crypto::{AuditorKeyPair, parse_public_key};
use securematch_storage::{AuditorRecord, AuditorStore, StorageError};
use tracing::info;
use uuid::Uuid;

pub struct AuditorRegistry {
    auditors: AuditorStore,
}

impl AuditorRegistry {
    pub fn new(auditors: AuditorStore) -> Self {
        Self { auditors }
    }

    pub fn create(&self, name: &str) -> EngineResult<CreateAuditorResponse> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidInput("auditor name must not be empty".into()));
        }

        let keypair = AuditorKeyPair::generate();
        let record = AuditorRecord {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            public_key: keypair.public_key_hex(),
            key_version: 1,
            created_at: Utc::now().timestamp_millis(),
            rotated_at: None,
        };
        self.auditors.insert(&record)?;

        info!(auditor_id = %record.id, "auditor created");
        Ok(CreateAuditorResponse {
            auditor_id: record.id,
            public_key: record.public_key,
            private_key: keypair.private_key_hex().to_string(),
            key_version: record.key_version,
        })
    }

    pub fn get(&self, auditor_id: &str) -> EngineResult<AuditorRecord> {
        self.auditors
            .get(auditor_id)?
            .ok_or_else(|| EngineError::AuditorNotFound(auditor_id.to_string()))
    }

    pub fn list(&self) -> EngineResult<Vec<AuditorRecord>> {
        Ok(self.auditors.list()?)
    }

    /// Installs `new_public_key`, or a freshly generated key when `None`.
    ///
    /// The update only applies if the version read here is still current;
    /// a concurrent rotation that committed first yields
    /// [`EngineError::RotationConflict`].
    pub fn rotate(
        &self,
        auditor_id: &str,
        new_public_key: Option<&str>,
    ) -> EngineResult<RotateKeyResponse> {
        let (public_key, private_key) = match new_public_key {
            Some(supplied) => {
                let key = parse_public_key(supplied).map_err(|e| {
                    EngineError::InvalidInput(format!("new public key rejected: {e}"))
                })?;
                (hex::encode(key.as_bytes()), None)
            }
            None => {
                let keypair = AuditorKeyPair::generate();
                (
                    keypair.public_key_hex(),
                    Some(keypair.private_key_hex().to_string()),
                )
            }
        };

        let current = self.get(auditor_id)?;
        let new_version = self
            .auditors
            .rotate_public_key(
                auditor_id,
                current.key_version,
                &public_key,
                Utc::now().timestamp_millis(),
            )
            .map_err(|e| match e {
                StorageError::VersionConflict { .. } => {
                    EngineError::RotationConflict(auditor_id.to_string())
                }
                StorageError::NotFound(_) => EngineError::AuditorNotFound(auditor_id.to_string()),
                other => other.into(),
            })?;

        info!(
            auditor_id,
            previous_version = current.key_version,
            key_version = new_version,
            generated = private_key.is_some(),
            "auditor key rotated"
        );
        Ok(RotateKeyResponse {
            auditor_id: auditor_id.to_string(),
            new_public_key: public_key,
            new_private_key: private_key,
            new_key_version: new_version,
        })
    }

    /// Removes the auditor. Its audit log rows stay in place.
    pub fn delete(&self, auditor_id: &str) -> EngineResult<DeleteResponse> {
        if !self.auditors.delete(auditor_id)? {
            return Err(EngineError::AuditorNotFound(auditor_id.to_string()));
        }
        info!(auditor_id, "auditor deleted");
        Ok(DeleteResponse { deleted: true })
    }
}
