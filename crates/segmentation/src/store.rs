//! Audience persistence: the saved record a filter tree is attached to.
//!
//! The store keeps each audience as an opaque JSON document, the way a
//! document database would, and decodes (and so re-validates) on read.
//! Concurrent saves of the same audience resolve last-write-wins.

use audience_core::{AudienceError, AudienceResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::tree::ConditionTree;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub filters: ConditionTree,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audience {
    pub fn new(name: impl Into<String>, filters: ConditionTree) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            filters,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Persistence collaborator for audiences.
pub trait AudienceStore: Send + Sync {
    /// Insert or overwrite. Returns the audience as stored.
    fn save(&self, audience: Audience) -> AudienceResult<Audience>;
    fn get(&self, id: Uuid) -> AudienceResult<Audience>;
    /// All audiences, most recently updated first.
    fn list(&self) -> Vec<Audience>;
    fn delete(&self, id: Uuid) -> AudienceResult<()>;
}

/// Thread-safe in-memory store backed by DashMap.
pub struct InMemoryAudienceStore {
    documents: DashMap<Uuid, serde_json::Value>,
}

impl InMemoryAudienceStore {
    pub fn new() -> Self {
        info!("Audience store initialized (in-memory)");
        Self {
            documents: DashMap::new(),
        }
    }

    /// Store a raw document as received from elsewhere, without decoding it.
    pub fn insert_document(&self, id: Uuid, document: serde_json::Value) {
        self.documents.insert(id, document);
    }

    fn decode(id: Uuid, document: &serde_json::Value) -> AudienceResult<Audience> {
        serde_json::from_value(document.clone()).map_err(|e| {
            warn!(audience_id = %id, error = %e, "Rejected stored audience document");
            AudienceError::from(e)
        })
    }
}

impl Default for InMemoryAudienceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AudienceStore for InMemoryAudienceStore {
    fn save(&self, mut audience: Audience) -> AudienceResult<Audience> {
        if audience.name.trim().is_empty() {
            return Err(AudienceError::Validation("audience name is empty".into()));
        }
        if let Some(existing) = self.documents.get(&audience.id) {
            if let Ok(previous) = Self::decode(audience.id, existing.value()) {
                audience.created_at = previous.created_at;
            }
        }
        audience.updated_at = Utc::now();
        let document = serde_json::to_value(&audience)?;
        self.documents.insert(audience.id, document);
        info!(
            audience_id = %audience.id,
            name = %audience.name,
            nodes = audience.filters.node_count(),
            "Audience saved"
        );
        Ok(audience)
    }

    fn get(&self, id: Uuid) -> AudienceResult<Audience> {
        let document = self
            .documents
            .get(&id)
            .ok_or_else(|| AudienceError::NotFound(format!("audience {id}")))?;
        Self::decode(id, document.value())
    }

    fn list(&self) -> Vec<Audience> {
        let mut audiences: Vec<Audience> = self
            .documents
            .iter()
            .filter_map(|entry| Self::decode(*entry.key(), entry.value()).ok())
            .collect();
        audiences.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        audiences
    }

    fn delete(&self, id: Uuid) -> AudienceResult<()> {
        self.documents
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AudienceError::NotFound(format!("audience {id}")))
    }
}
