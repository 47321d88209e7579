use crate::domain::value_objects::{EntityKind, RecordPayload, RemoteId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// リモートエラーの分類。リコンシリエータのリトライ方針は
/// この区別に依存する（timeout/5xx は transient、4xx は permanent）。
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    Transient,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == RemoteErrorKind::Transient
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RemoteErrorKind::Transient => write!(f, "transient: {}", self.message),
            RemoteErrorKind::Permanent => write!(f, "permanent: {}", self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// プラットフォームのエンティティストア。実装はこのクレートの外
/// （埋め込み側のAPIクライアント）が提供する。
#[async_trait]
pub trait RemoteEntityStore: Send + Sync {
    async fn create(
        &self,
        entity: EntityKind,
        payload: &RecordPayload,
    ) -> Result<RemoteId, RemoteError>;

    async fn update(
        &self,
        entity: EntityKind,
        remote_id: &RemoteId,
        payload: &RecordPayload,
    ) -> Result<RemoteId, RemoteError>;

    async fn delete(&self, entity: EntityKind, remote_id: &RemoteId) -> Result<(), RemoteError>;

    async fn list(
        &self,
        entity: EntityKind,
        owner: &UserId,
    ) -> Result<Vec<RecordPayload>, RemoteError>;
}
