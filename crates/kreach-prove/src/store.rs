//! On-disk proof records.
//!
//! One directory per claim id under the store root, holding a single
//! `proof.json` with the whole [`Proof`]. Every save writes a sibling temp
//! file and renames it over the record, so a checkpoint is atomic and a
//! crash mid-write never yields a torn record. Records are destroyed only
//! by [`ProofStore::remove`]; nothing expires implicitly, and no decision
//! is ever based on file mtimes.

use crate::error::{ProveError, ProveResult};
use crate::proof::Proof;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ProofStore {
    root: PathBuf,
}

impl ProofStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(id).join("proof.json")
    }

    /// Atomically persist a proof: write-new-then-rename.
    pub fn save(&self, proof: &Proof) -> ProveResult<()> {
        let record = self.record_path(&proof.id);
        let dir = record
            .parent()
            .expect("record path always has a parent directory");
        fs::create_dir_all(dir)?;
        let tmp = dir.join("proof.json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(proof)?)?;
        fs::rename(&tmp, &record)?;
        debug!(claim = %proof.id, path = %record.display(), "proof checkpointed");
        Ok(())
    }

    pub fn load(&self, id: &str) -> ProveResult<Proof> {
        let record = self.record_path(id);
        if !record.is_file() {
            return Err(ProveError::UnknownProof(id.to_string()));
        }
        let bytes = fs::read(&record)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.record_path(id).is_file()
    }

    /// Delete a claim's record. The only way a persisted proof goes away.
    pub fn remove(&self, id: &str) -> ProveResult<()> {
        if !self.contains(id) {
            return Err(ProveError::UnknownProof(id.to_string()));
        }
        fs::remove_dir_all(self.root.join(id))?;
        Ok(())
    }

    /// Claim ids with a readable record, sorted.
    pub fn list(&self) -> ProveResult<Vec<String>> {
        let mut ids = Vec::new();
        if !self.root.is_dir() {
            return Ok(ids);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(id) = name.to_str() else { continue };
            if self.contains(id) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
