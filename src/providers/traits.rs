//! Provider traits for capability-specific implementations.
//!
//! Providers implement capability-specific traits rather than a single
//! "god trait": every variant exposes [`TextProvider`], and only the
//! artifact-backed variant additionally exposes [`ModelLifecycle`]. The
//! manager dispatches download-lifecycle calls on the *presence* of a
//! `ModelLifecycle` handle on the installed provider record — never on
//! runtime type identity, which breaks under test doubles and indirect
//! construction.
//!
//! # Variant set
//!
//! The variants are a closed set: foundation (OS-native model), local
//! model (downloaded open weights), unsupported (no-op). There is no
//! open-ended plugin registration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::catalog::ModelDescriptor;

/// Shared surface of every inference provider variant.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider name for logging/debugging and the manager's
    /// `provider_name()` surface.
    fn name(&self) -> &str;

    /// Whether this provider can serve on the current device.
    ///
    /// Probed by the manager before committing to a provider. The
    /// unsupported variant always reports true so the manager never
    /// stalls without an active provider.
    async fn is_available(&self) -> bool;

    /// Prepare the provider for generation (load weights, warm up the
    /// platform session). Idempotent.
    async fn initialize(&self) -> Result<()>;

    /// Generate a completion for the given system and user prompts.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;

    /// Human-readable provider state for diagnostics.
    fn status(&self) -> String;

    /// Release runtime resources. Does not touch on-disk artifacts.
    async fn cleanup(&self);
}

/// Download-lifecycle surface of artifact-backed providers.
///
/// Only the local-model provider implements this; the manager stores the
/// handle as `Option<Arc<dyn ModelLifecycle>>` on the installed record.
#[async_trait]
pub trait ModelLifecycle: Send + Sync {
    /// Whether the canonical artifact is fully present on disk.
    async fn is_downloaded(&self) -> bool;

    /// Download the model artifact described by the held descriptor.
    ///
    /// Safely re-entrant: a call made while a transfer is already in
    /// flight waits for that transfer and returns its result rather than
    /// starting a second one.
    async fn download(&self) -> DownloadResult;

    /// Request cancellation of an in-flight transfer. Synchronous; no-op
    /// when nothing is downloading. Guarantees no partial artifact
    /// remains reachable at the canonical path.
    fn cancel_download(&self);

    /// Remove a fully downloaded artifact. No-op when nothing is
    /// downloaded.
    async fn delete(&self) -> Result<()>;

    /// On-disk byte size of the canonical artifact, or 0 if absent.
    async fn size_on_disk(&self) -> u64;

    /// The descriptor used to select and validate the artifact.
    fn descriptor(&self) -> ModelDescriptor;
}

/// Outcome of a download request.
///
/// Download failures are reported through this value, never thrown: the
/// retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    /// Whether the artifact is now fully present on disk.
    pub success: bool,

    /// Failure description when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadResult {
    /// Successful download.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Failed download with a description.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// State of the local model artifact.
///
/// `Cancelling` and `Deleting` are transient states observed only while
/// the respective operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// No artifact on disk.
    NotDownloaded,
    /// Transfer in flight.
    Downloading,
    /// Cancel requested, transfer winding down.
    Cancelling,
    /// Artifact being removed.
    Deleting,
    /// Artifact fully present at the canonical path.
    Downloaded,
}

impl DownloadState {
    /// State name for logging and provider status strings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotDownloaded => "not_downloaded",
            Self::Downloading => "downloading",
            Self::Cancelling => "cancelling",
            Self::Deleting => "deleting",
            Self::Downloaded => "downloaded",
        }
    }
}
