// src/publish/mod.rs
//! Publish target collaborator.

pub mod github;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::render::RenderedDocument;

pub use github::GitHubPublisher;

/// Where a published article lives. `identifier` is target-specific
/// (e.g. a pull request number).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicationHandle {
    pub url: String,
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one rendered document. Success means the artifact exists.
    async fn publish(&self, title: &str, doc: &RenderedDocument) -> Result<PublicationHandle>;
}
