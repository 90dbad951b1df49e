// ABOUTME: Unit model seam: status, opened ports, and consumer data bags.
// ABOUTME: LocalUnitModel persists them as JSON files under the state directory.

use crate::error::ModelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Key-value data published to one consumer.
pub type RelationData = BTreeMap<String, String>;

/// Workload status shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum UnitStatus {
    Maintenance(String),
    Active,
    Blocked(String),
    Waiting(String),
}

impl UnitStatus {
    pub fn maintenance(message: impl Into<String>) -> Self {
        UnitStatus::Maintenance(message.into())
    }
}

/// What the hosting framework provides to lifecycle hooks.
#[async_trait]
pub trait UnitModel: Send + Sync {
    async fn set_status(&self, status: UnitStatus) -> Result<(), ModelError>;

    async fn open_port(&self, port: u16) -> Result<(), ModelError>;

    /// Identifiers of every consumer currently related to this unit.
    async fn relations(&self) -> Result<Vec<String>, ModelError>;

    /// Merge `data` into the consumer's data bag.
    async fn update_relation(&self, id: &str, data: &RelationData) -> Result<(), ModelError>;
}

/// File-backed unit model.
///
/// Layout under the state directory:
/// - `status.json`: last status
/// - `ports.json`: opened TCP ports
/// - `relations/<id>.json`: one data bag per consumer
#[derive(Debug, Clone)]
pub struct LocalUnitModel {
    root: PathBuf,
}

impl LocalUnitModel {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn status_path(&self) -> PathBuf {
        self.root.join("status.json")
    }

    fn ports_path(&self) -> PathBuf {
        self.root.join("ports.json")
    }

    fn relations_dir(&self) -> PathBuf {
        self.root.join("relations")
    }

    /// Ids name a file directly under `relations/`; separators and `..` are rejected.
    fn relation_path(&self, id: &str) -> Result<PathBuf, ModelError> {
        let invalid = id.is_empty()
            || id.contains(['/', '\\', '\0'])
            || id.contains("..");
        if invalid {
            return Err(ModelError::InvalidRelationId { id: id.to_string() });
        }
        Ok(self.relations_dir().join(format!("{id}.json")))
    }

    /// Register a consumer with an empty data bag, keeping any existing data.
    pub async fn join_relation(&self, id: &str) -> Result<(), ModelError> {
        let path = self.relation_path(id)?;
        if !path.exists() {
            write_json(&path, &RelationData::new()).await?;
            tracing::info!(relation = id, "Consumer joined");
        }
        Ok(())
    }

    pub async fn relation_data(&self, id: &str) -> Result<RelationData, ModelError> {
        Ok(read_json(&self.relation_path(id)?).await?.unwrap_or_default())
    }

    pub async fn status(&self) -> Result<Option<UnitStatus>, ModelError> {
        read_json(&self.status_path()).await
    }

    pub async fn opened_ports(&self) -> Result<BTreeSet<u16>, ModelError> {
        Ok(read_json(&self.ports_path()).await?.unwrap_or_default())
    }
}

#[async_trait]
impl UnitModel for LocalUnitModel {
    async fn set_status(&self, status: UnitStatus) -> Result<(), ModelError> {
        tracing::info!(?status, "Unit status");
        write_json(&self.status_path(), &status).await
    }

    async fn open_port(&self, port: u16) -> Result<(), ModelError> {
        let mut ports = self.opened_ports().await?;
        if ports.insert(port) {
            write_json(&self.ports_path(), &ports).await?;
            tracing::info!(port, "Opened port");
        }
        Ok(())
    }

    async fn relations(&self) -> Result<Vec<String>, ModelError> {
        let dir = self.relations_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ModelError::Io { path: dir, source: e }),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ModelError::Io {
            path: dir.clone(),
            source: e,
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn update_relation(&self, id: &str, data: &RelationData) -> Result<(), ModelError> {
        let path = self.relation_path(id)?;
        let mut bag = read_json(&path).await?.unwrap_or_else(RelationData::new);
        bag.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
        write_json(&path, &bag).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ModelError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ModelError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ModelError::Json {
            path: path.to_path_buf(),
            source: e,
        })
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ModelError> {
    let io_error = |e| ModelError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    let content = serde_json::to_string_pretty(value).map_err(|e| ModelError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    tokio::fs::write(path, content).await.map_err(io_error)
}
