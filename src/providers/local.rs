//! Local-model provider: downloaded open weights run by an injected engine.
//!
//! Owns the on-disk artifact lifecycle (download, cancel, delete, size)
//! described by its [`ModelDescriptor`], and delegates generation to an
//! [`InferenceEngine`] once the artifact is present. Engine loading is
//! lazy with a gate so weights are loaded at most once, mirroring the
//! load-at-most-once discipline of the rest of the crate.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::download;
use super::traits::{DownloadResult, DownloadState, ModelLifecycle, TextProvider};
use crate::catalog::ModelDescriptor;
use crate::{MuninnError, Result, telemetry};

/// Engine that runs inference over a downloaded artifact.
///
/// The concrete engine (llama.cpp binding, ONNX session, …) is supplied
/// by the embedding application; this crate only manages its lifecycle.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Load model weights from the artifact path. Called at most once
    /// between `unload`s.
    async fn load(&self, artifact: &Path, descriptor: &ModelDescriptor) -> Result<()>;

    /// Run a completion. Only called after a successful `load`.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;

    /// Release loaded weights. Idempotent.
    async fn unload(&self);
}

/// An in-flight artifact transfer.
struct Inflight {
    token: CancellationToken,
    done: watch::Receiver<Option<DownloadResult>>,
}

/// Download bookkeeping shared with the detached transfer task.
///
/// Lock order is always `inflight` then `state`.
struct TransferState {
    state: StdMutex<DownloadState>,
    inflight: StdMutex<Option<Inflight>>,
}

impl TransferState {
    /// Publish the transfer's final state, clear the slot, and wake
    /// joined callers. State and slot move together under the
    /// `inflight` lock, so `cancel_download` can never observe the
    /// slot occupied after the final state is in place.
    fn finish(
        &self,
        state: DownloadState,
        result: DownloadResult,
        tx: &watch::Sender<Option<DownloadResult>>,
    ) {
        {
            let mut slot = self.inflight.lock().expect("inflight lock poisoned");
            *self.state.lock().expect("download state lock poisoned") = state;
            *slot = None;
        }
        let _ = tx.send(Some(result));
    }
}

/// Provider backed by a locally downloaded open-weight model.
pub struct LocalModelProvider {
    name: String,
    descriptor: ModelDescriptor,
    artifact_path: PathBuf,
    client: reqwest::Client,
    engine: Arc<dyn InferenceEngine>,
    transfer: Arc<TransferState>,
    loaded: AtomicBool,
    load_gate: Mutex<()>,
}

impl LocalModelProvider {
    /// Create a provider for the given descriptor with artifacts stored
    /// under `model_dir`.
    pub fn new(
        descriptor: ModelDescriptor,
        model_dir: impl Into<PathBuf>,
        client: reqwest::Client,
        engine: Arc<dyn InferenceEngine>,
    ) -> Self {
        let artifact_path = model_dir.into().join(&descriptor.file_name);
        let initial = if artifact_path.is_file() {
            DownloadState::Downloaded
        } else {
            DownloadState::NotDownloaded
        };

        Self {
            name: format!("local-{}", descriptor.name),
            descriptor,
            artifact_path,
            client,
            engine,
            transfer: Arc::new(TransferState {
                state: StdMutex::new(initial),
                inflight: StdMutex::new(None),
            }),
            loaded: AtomicBool::new(false),
            load_gate: Mutex::new(()),
        }
    }

    /// Canonical path of the model artifact.
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    fn state(&self) -> DownloadState {
        *self.transfer.state.lock().expect("download state lock poisoned")
    }

    fn set_state(&self, state: DownloadState) {
        *self.transfer.state.lock().expect("download state lock poisoned") = state;
    }

    /// Load the engine if the artifact is present and weights are not
    /// yet loaded. Gated so concurrent callers load at most once.
    async fn ensure_loaded(&self) -> Result<()> {
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }

        let _gate = self.load_gate.lock().await;
        if self.loaded.load(Ordering::SeqCst) {
            return Ok(());
        }

        if !self.is_downloaded().await {
            return Err(MuninnError::ModelNotDownloaded);
        }

        self.engine.load(&self.artifact_path, &self.descriptor).await?;
        self.loaded.store(true, Ordering::SeqCst);
        info!(provider = %self.name, "engine loaded");
        Ok(())
    }

    /// Start the transfer on a detached task. The task owns the slot's
    /// lifetime: a caller dropping its `download()` future (timeout,
    /// `select!`) must not strand the state in `Downloading`.
    fn spawn_transfer(&self, token: CancellationToken, tx: watch::Sender<Option<DownloadResult>>) {
        let transfer = Arc::clone(&self.transfer);
        let client = self.client.clone();
        let descriptor = self.descriptor.clone();
        let dest = self.artifact_path.clone();
        let provider = self.name.clone();

        tokio::spawn(async move {
            let outcome = download::fetch_artifact(
                &client,
                &descriptor.url,
                &dest,
                descriptor.artifact_size_bytes,
                &descriptor.name,
                &token,
            )
            .await;

            let (state, result, status) = match outcome {
                Ok(()) => {
                    info!(provider = %provider, "artifact downloaded");
                    (DownloadState::Downloaded, DownloadResult::ok(), "ok")
                }
                Err(MuninnError::DownloadCancelled) => {
                    info!(provider = %provider, "download cancelled");
                    (
                        DownloadState::NotDownloaded,
                        DownloadResult::failed("download cancelled"),
                        "cancelled",
                    )
                }
                Err(e) => {
                    warn!(provider = %provider, error = %e, "download failed");
                    (
                        DownloadState::NotDownloaded,
                        DownloadResult::failed(e.to_string()),
                        "error",
                    )
                }
            };

            metrics::counter!(telemetry::DOWNLOADS_TOTAL,
                "model" => descriptor.name.clone(),
                "status" => status,
            )
            .increment(1);

            transfer.finish(state, result, &tx);
        });
    }
}

#[async_trait]
impl TextProvider for LocalModelProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        // Always installable; the artifact may still need downloading.
        true
    }

    async fn initialize(&self) -> Result<()> {
        match self.ensure_loaded().await {
            Ok(()) => Ok(()),
            // Not an error: the provider is installed and waiting for
            // the caller to download the artifact.
            Err(MuninnError::ModelNotDownloaded) => {
                debug!(provider = %self.name, "initialize deferred: artifact not downloaded");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        match self.state() {
            DownloadState::Downloading | DownloadState::Cancelling => {
                Err(MuninnError::DownloadInProgress)
            }
            _ => {
                self.ensure_loaded().await?;
                self.engine.generate(system, user).await
            }
        }
    }

    fn status(&self) -> String {
        if self.loaded.load(Ordering::SeqCst) {
            "ready".to_string()
        } else {
            self.state().name().to_string()
        }
    }

    async fn cleanup(&self) {
        self.cancel_download();
        if self.loaded.swap(false, Ordering::SeqCst) {
            self.engine.unload().await;
        }
        debug!(provider = %self.name, "provider cleaned up");
    }
}

#[async_trait]
impl ModelLifecycle for LocalModelProvider {
    async fn is_downloaded(&self) -> bool {
        tokio::fs::try_exists(&self.artifact_path).await.unwrap_or(false)
            && self.state() == DownloadState::Downloaded
    }

    async fn download(&self) -> DownloadResult {
        if self.is_downloaded().await {
            return DownloadResult::ok();
        }

        // Either start a transfer or join the in-flight one; all callers
        // await the same published result.
        let mut rx = {
            let mut slot = self.transfer.inflight.lock().expect("inflight lock poisoned");
            // A transfer may have completed between the fast path and the
            // lock; don't start a redundant one.
            if self.state() == DownloadState::Downloaded {
                return DownloadResult::ok();
            }
            match &*slot {
                Some(inflight) => {
                    debug!(provider = %self.name, "joining in-flight download");
                    inflight.done.clone()
                }
                None => {
                    let token = CancellationToken::new();
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(Inflight {
                        token: token.clone(),
                        done: rx.clone(),
                    });
                    self.set_state(DownloadState::Downloading);
                    self.spawn_transfer(token, tx);
                    rx
                }
            }
        };

        if rx.changed().await.is_err() {
            return DownloadResult::failed("download ended without a result");
        }
        rx.borrow()
            .clone()
            .unwrap_or_else(|| DownloadResult::failed("download ended without a result"))
    }

    fn cancel_download(&self) {
        let slot = self.transfer.inflight.lock().expect("inflight lock poisoned");
        if let Some(inflight) = &*slot {
            self.set_state(DownloadState::Cancelling);
            inflight.token.cancel();
            debug!(provider = %self.name, "download cancellation requested");
        }
    }

    async fn delete(&self) -> Result<()> {
        // Deleting during an active transfer reduces to a cancel; the
        // transfer's own cleanup removes the temp file.
        if self
            .transfer
            .inflight
            .lock()
            .expect("inflight lock poisoned")
            .is_some()
        {
            self.cancel_download();
            return Ok(());
        }

        if self.loaded.swap(false, Ordering::SeqCst) {
            self.engine.unload().await;
        }

        let prev = self.state();
        self.set_state(DownloadState::Deleting);
        match tokio::fs::remove_file(&self.artifact_path).await {
            Ok(()) => info!(provider = %self.name, "artifact deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                self.set_state(prev);
                return Err(e.into());
            }
        }
        self.set_state(DownloadState::NotDownloaded);
        Ok(())
    }

    async fn size_on_disk(&self) -> u64 {
        tokio::fs::metadata(&self.artifact_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0)
    }

    fn descriptor(&self) -> ModelDescriptor {
        self.descriptor.clone()
    }
}
