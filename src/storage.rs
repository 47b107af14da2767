//! Local denial-reason log.
//!
//! The backend stores no reason when an owner denies a viewing request, so the
//! reason lives only in this file. It is read and written wholesale and is lost
//! if the file is deleted or the owner switches machines.

use crate::models::{DenialReason, RequestId};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct DenialLog {
    path: PathBuf,
}

impl DenialLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored reasons. A missing or corrupt file reads as empty.
    pub async fn load(&self) -> Vec<DenialReason> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read denial log");
                return Vec::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Discarding unreadable denial log");
            Vec::new()
        })
    }

    async fn save(&self, reasons: &[DenialReason]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create denial log directory")?;
            }
        }
        let json = serde_json::to_string_pretty(reasons)?;
        tokio::fs::write(&self.path, json)
            .await
            .context("Failed to write denial log")?;
        Ok(())
    }

    /// Store the reason for `request_id`, replacing any earlier one
    pub async fn record(&self, request_id: RequestId, reason: &str) -> Result<DenialReason> {
        let entry = DenialReason {
            request_id,
            reason: reason.trim().to_string(),
            denied_at: Utc::now(),
        };

        let mut reasons = self.load().await;
        reasons.retain(|r| r.request_id != request_id);
        reasons.push(entry.clone());
        self.save(&reasons).await?;

        debug!(request_id, "Recorded denial reason");
        Ok(entry)
    }

    pub async fn get(&self, request_id: RequestId) -> Option<DenialReason> {
        self.load()
            .await
            .into_iter()
            .find(|r| r.request_id == request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = DenialLog::new(dir.path().join("none.json"));
        assert!(log.load().await.is_empty());
        assert!(log.get(1).await.is_none());
    }

    #[tokio::test]
    async fn record_is_keyed_by_request() {
        let dir = tempfile::tempdir().unwrap();
        let log = DenialLog::new(dir.path().join("sub").join("reasons.json"));

        log.record(1, "  Already rented ").await.unwrap();
        log.record(2, "Owner unavailable").await.unwrap();
        log.record(1, "Under renovation").await.unwrap();

        let all = log.load().await;
        assert_eq!(all.len(), 2);
        assert_eq!(log.get(1).await.unwrap().reason, "Under renovation");
        assert_eq!(log.get(2).await.unwrap().reason, "Owner unavailable");
    }

    #[tokio::test]
    async fn corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reasons.json");
        std::fs::write(&path, "not json").unwrap();
        let log = DenialLog::new(&path);
        assert!(log.load().await.is_empty());

        log.record(3, "Double booked").await.unwrap();
        assert_eq!(log.load().await.len(), 1);
    }
}
