// BSD 3-Clause License
//
// Copyright (c) 2025, BlackPortal ○
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this
//    list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice,
//    this list of conditions and the following disclaimer in the documentation
//    and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived from
//    this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
// FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
// DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
// CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
// OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The artifact bundle and its durable storage.
//!
//! A bundle is the model together with the exact feature pipeline it was
//! trained with. The four members are produced, written and read as one unit.
//!
//! [`DirectoryStore`] keeps one bundle per directory:
//!
//! ```text
//! <dir>/manifest.json   run id, timestamp, column order, member checksums
//! <dir>/model.json      {run_id, payload: RandomForest}
//! <dir>/scaler.json     {run_id, payload: FeatureScaler}
//! <dir>/encoder.json    {run_id, payload: FeatureEncoder}
//! ```
//!
//! Every file is replaced through a temp file and an atomic rename, and the
//! manifest is replaced last. An interrupted save therefore leaves member
//! files whose checksums disagree with the manifest, which `load` rejects.
//!
//! Only file contents are synced; the directory is not fsynced after the
//! renames. A crash mid-save can therefore leave the previous bundle
//! unloadable too, and the next `ensure_ready` retrains instead of loading.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::classical::RandomForest;
use crate::encoders::FeatureEncoder;
use crate::errors::{ArtifactCorruptError, StoreError};
use crate::scalers::FeatureScaler;

const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_FORMAT: u32 = 1;
const MODEL: &str = "model";
const SCALER: &str = "scaler";
const ENCODER: &str = "encoder";

/// The feature layout a trained model expects, fixed at training time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnOrder(Vec<String>);

impl ColumnOrder {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        ColumnOrder(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Hex SHA-256 over the ordered names.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        for name in &self.0 {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

/// Model, encoder, scaler and column order from a single training run.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBundle {
    run_id: String,
    trained_at: DateTime<Utc>,
    column_order: ColumnOrder,
    encoder: FeatureEncoder,
    scaler: FeatureScaler,
    model: RandomForest,
}

impl ArtifactBundle {
    /// Assembles a bundle for a fresh training run.
    pub fn new(
        column_order: ColumnOrder,
        encoder: FeatureEncoder,
        scaler: FeatureScaler,
        model: RandomForest,
    ) -> Result<Self, ArtifactCorruptError> {
        let run_id = Uuid::new_v4().to_string();
        Self::assemble(run_id, Utc::now(), column_order, encoder, scaler, model)
    }

    fn assemble(
        run_id: String,
        trained_at: DateTime<Utc>,
        column_order: ColumnOrder,
        encoder: FeatureEncoder,
        scaler: FeatureScaler,
        model: RandomForest,
    ) -> Result<Self, ArtifactCorruptError> {
        let bundle = ArtifactBundle { run_id, trained_at, column_order, encoder, scaler, model };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Checks that the members agree on the column layout.
    pub fn validate(&self) -> Result<(), ArtifactCorruptError> {
        let order = &self.column_order;
        if order.is_empty() {
            return Err(ArtifactCorruptError::ColumnMismatch {
                member: "column_order",
                detail: "column order is empty".to_string(),
            });
        }

        if let Some(missing) = order.names().iter().find(|n| self.scaler.params(n).is_none()) {
            return Err(ArtifactCorruptError::ColumnMismatch {
                member: SCALER,
                detail: format!("no parameters for column '{}'", missing),
            });
        }
        if let Some(extra) = self.scaler.columns().find(|c| !order.contains(c)) {
            return Err(ArtifactCorruptError::ColumnMismatch {
                member: SCALER,
                detail: format!("unexpected column '{}'", extra),
            });
        }

        if let Some(extra) = self.encoder.columns().find(|c| !order.contains(c)) {
            return Err(ArtifactCorruptError::ColumnMismatch {
                member: ENCODER,
                detail: format!("unexpected column '{}'", extra),
            });
        }

        if !self.model.is_fitted() {
            return Err(ArtifactCorruptError::ColumnMismatch {
                member: MODEL,
                detail: "model has no trees".to_string(),
            });
        }
        if self.model.n_features() != order.len()
            || self.model.feature_importances().len() != order.len()
        {
            return Err(ArtifactCorruptError::ColumnMismatch {
                member: MODEL,
                detail: format!(
                    "model expects {} features, column order has {}",
                    self.model.n_features(),
                    order.len()
                ),
            });
        }
        Ok(())
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn column_order(&self) -> &ColumnOrder {
        &self.column_order
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn model(&self) -> &RandomForest {
        &self.model
    }
}

/// Durable storage for a single artifact bundle.
pub trait ArtifactStore: Send + Sync {
    fn exists(&self) -> bool;

    /// Replaces the stored bundle as one unit.
    fn save(&self, bundle: &ArtifactBundle) -> Result<(), StoreError>;

    /// Reads the stored bundle, rejecting partial or mixed members with
    /// [`StoreError::Corrupt`].
    fn load(&self) -> Result<ArtifactBundle, StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format: u32,
    run_id: String,
    trained_at: DateTime<Utc>,
    column_order: ColumnOrder,
    column_signature: String,
    members: BTreeMap<String, MemberEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MemberEntry {
    file: String,
    sha256: String,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    run_id: &'a str,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    run_id: String,
    payload: T,
}

/// File-system [`ArtifactStore`] rooted at one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        DirectoryStore { dir: dir.as_ref().to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_atomic(&self, file: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.dir.join(file)).map_err(|e| e.error)?;
        Ok(())
    }

    fn write_member<T: Serialize>(
        &self,
        member: &'static str,
        run_id: &str,
        payload: &T,
    ) -> Result<MemberEntry, StoreError> {
        let bytes = serde_json::to_vec(&EnvelopeRef { run_id, payload })?;
        let file = format!("{}.json", member);
        self.write_atomic(&file, &bytes)?;
        debug!("Wrote artifact member {} ({} bytes)", file, bytes.len());
        Ok(MemberEntry { file, sha256: sha256_hex(&bytes) })
    }

    fn read_member<T: DeserializeOwned>(
        &self,
        manifest: &Manifest,
        member: &'static str,
    ) -> Result<T, StoreError> {
        let entry = manifest.members.get(member).ok_or(ArtifactCorruptError::MissingMember(member))?;
        let bytes = match fs::read(self.dir.join(&entry.file)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArtifactCorruptError::MissingMember(member).into());
            }
            Err(e) => return Err(e.into()),
        };
        if sha256_hex(&bytes) != entry.sha256 {
            return Err(ArtifactCorruptError::ChecksumMismatch { member }.into());
        }
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|e| ArtifactCorruptError::Malformed { member, reason: e.to_string() })?;
        if envelope.run_id != manifest.run_id {
            return Err(ArtifactCorruptError::RunMismatch {
                member,
                expected: manifest.run_id.clone(),
                found: envelope.run_id,
            }
            .into());
        }
        Ok(envelope.payload)
    }
}

impl ArtifactStore for DirectoryStore {
    fn exists(&self) -> bool {
        self.dir.join(MANIFEST_FILE).is_file()
    }

    fn save(&self, bundle: &ArtifactBundle) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let run_id = bundle.run_id();

        let mut members = BTreeMap::new();
        members.insert(MODEL.to_string(), self.write_member(MODEL, run_id, bundle.model())?);
        members.insert(SCALER.to_string(), self.write_member(SCALER, run_id, bundle.scaler())?);
        members.insert(ENCODER.to_string(), self.write_member(ENCODER, run_id, bundle.encoder())?);

        let manifest = Manifest {
            format: MANIFEST_FORMAT,
            run_id: run_id.to_string(),
            trained_at: bundle.trained_at(),
            column_order: bundle.column_order().clone(),
            column_signature: bundle.column_order().signature(),
            members,
        };
        self.write_atomic(MANIFEST_FILE, &serde_json::to_vec_pretty(&manifest)?)?;

        info!("Saved artifact bundle {} to {:?}", run_id, self.dir);
        Ok(())
    }

    fn load(&self) -> Result<ArtifactBundle, StoreError> {
        let manifest_bytes = match fs::read(self.dir.join(MANIFEST_FILE)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.dir.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes).map_err(|e| {
            ArtifactCorruptError::Malformed { member: "manifest", reason: e.to_string() }
        })?;
        if manifest.format != MANIFEST_FORMAT {
            return Err(ArtifactCorruptError::Malformed {
                member: "manifest",
                reason: format!("unsupported format {}", manifest.format),
            }
            .into());
        }
        if manifest.column_order.signature() != manifest.column_signature {
            return Err(ArtifactCorruptError::ColumnMismatch {
                member: "manifest",
                detail: "column signature does not match the column order".to_string(),
            }
            .into());
        }

        let model: RandomForest = self.read_member(&manifest, MODEL)?;
        let scaler: FeatureScaler = self.read_member(&manifest, SCALER)?;
        let encoder: FeatureEncoder = self.read_member(&manifest, ENCODER)?;

        let bundle = ArtifactBundle::assemble(
            manifest.run_id,
            manifest.trained_at,
            manifest.column_order,
            encoder,
            scaler,
            model,
        )?;
        info!("Loaded artifact bundle {} from {:?}", bundle.run_id(), self.dir);
        Ok(bundle)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
