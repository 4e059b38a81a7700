//! Lead capture storage
//!
//! Append-only list of captured leads behind the `LeadStore` trait:
//! - `InMemoryLeadStore` - default, lost on restart
//! - `JsonlLeadStore` - one JSON object per line in a local file

use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use lead_agent_agent::CapturedLead;
use lead_agent_config::CaptureConfig;

use crate::ServerError;

/// Append-only lead store
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn append(&self, lead: &CapturedLead) -> Result<(), ServerError>;

    /// All captured leads, oldest first
    async fn list(&self) -> Result<Vec<CapturedLead>, ServerError>;

    fn is_durable(&self) -> bool;
}

#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: RwLock<Vec<CapturedLead>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn append(&self, lead: &CapturedLead) -> Result<(), ServerError> {
        self.leads.write().push(lead.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CapturedLead>, ServerError> {
        Ok(self.leads.read().clone())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

/// JSON-lines file store
pub struct JsonlLeadStore {
    path: PathBuf,
    // serializes appends so lines never interleave
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlLeadStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LeadStore for JsonlLeadStore {
    async fn append(&self, lead: &CapturedLead) -> Result<(), ServerError> {
        let mut line = serde_json::to_string(lead)
            .map_err(|e| ServerError::Persistence(format!("Failed to encode lead: {}", e)))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServerError::Persistence(e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                ServerError::Persistence(format!("Failed to open {}: {}", self.path.display(), e))
            })?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| ServerError::Persistence(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| ServerError::Persistence(e.to_string()))?;

        tracing::debug!(path = %self.path.display(), "Lead appended");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CapturedLead>, ServerError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ServerError::Persistence(e.to_string())),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    ServerError::Persistence(format!("Corrupt lead record {}: {}", i + 1, e))
                })
            })
            .collect()
    }

    fn is_durable(&self) -> bool {
        true
    }
}

/// Build the store selected by the capture settings
pub fn create_lead_store(config: &CaptureConfig) -> Arc<dyn LeadStore> {
    match config.path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) => {
            tracing::info!(path = %path, "Capturing leads to JSON-lines file");
            Arc::new(JsonlLeadStore::new(path))
        }
        None => {
            tracing::info!("Capture path not set, keeping leads in memory");
            Arc::new(InMemoryLeadStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_agent_agent::{ContactDetails, SessionState};
    use lead_agent_config::PromptsConfig;

    fn captured(name: &str) -> CapturedLead {
        let mut session = SessionState::new("Hello!");
        session.push_user_message("We need an AI chatbot").unwrap();
        session
            .capture(
                &ContactDetails {
                    name: name.to_string(),
                    email: format!("{}@example-corp.com", name.to_lowercase()),
                    phone: None,
                },
                &PromptsConfig::default(),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryLeadStore::new();
        assert!(store.list().await.unwrap().is_empty());

        store.append(&captured("Ana")).await.unwrap();
        store.append(&captured("Ben")).await.unwrap();

        let leads = store.list().await.unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].lead.name.as_deref(), Some("Ana"));
        assert!(!store.is_durable());
    }

    #[tokio::test]
    async fn test_jsonl_store_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads").join("captured.jsonl");
        let store = JsonlLeadStore::new(&path);

        assert!(store.list().await.unwrap().is_empty());

        store.append(&captured("Ana")).await.unwrap();
        store.append(&captured("Ben")).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let leads = store.list().await.unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[1].lead.name.as_deref(), Some("Ben"));
        assert_eq!(leads[1].transcript.len(), 3);
    }

    #[tokio::test]
    async fn test_jsonl_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captured.jsonl");

        JsonlLeadStore::new(&path).append(&captured("Ana")).await.unwrap();
        let reopened = JsonlLeadStore::new(&path);
        assert_eq!(reopened.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_jsonl_store_reports_corrupt_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captured.jsonl");
        std::fs::write(&path, "{not json}\n").unwrap();

        let result = JsonlLeadStore::new(&path).list().await;
        assert!(matches!(result, Err(ServerError::Persistence(_))));
    }

    #[test]
    fn test_create_lead_store() {
        let memory = create_lead_store(&CaptureConfig { path: None });
        assert!(!memory.is_durable());

        let blank = create_lead_store(&CaptureConfig {
            path: Some("  ".to_string()),
        });
        assert!(!blank.is_durable());

        let file = create_lead_store(&CaptureConfig {
            path: Some("/tmp/leads.jsonl".to_string()),
        });
        assert!(file.is_durable());
    }
}
