//! Provider resolution policy and the stable backend-agnostic API.
//!
//! [`ProviderManager`] owns the single active provider: it classifies the
//! device once per resolution cycle, applies the fallback decision table,
//! commits exactly one provider variant, and delegates generation and
//! download-lifecycle calls to it. `resolve()` and `cleanup()` run under
//! one mutual-exclusion gate so they can never interleave and leave a
//! dangling handle.
//!
//! # Decision table
//!
//! | Tier | Selection |
//! |---|---|
//! | Foundation, backend available | foundation provider |
//! | Foundation, backend unavailable | local-model provider via catalog |
//! | Standard | local-model provider via catalog |
//! | Unsupported | unsupported provider, status `Unsupported` |

mod builder;

pub use builder::{Muninn, ProviderManagerBuilder};

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::catalog::{ModelCatalog, ModelDescriptor};
use crate::device::{CapabilityTier, DeviceClassification, DeviceClassifier};
use crate::providers::{
    DownloadResult, FoundationBackend, FoundationProvider, InferenceEngine, LocalModelProvider,
    ModelLifecycle, TextProvider, UnsupportedProvider,
};
use crate::{MuninnError, Result, telemetry};

/// Sentinel returned by `provider_name()` before resolution.
pub const NO_PROVIDER: &str = "none";

/// Manager lifecycle state.
///
/// Monotonic within a resolution cycle
/// (`Uninitialized → Resolving → {Ready | Unsupported | Error}`);
/// reset to `Uninitialized` only by `cleanup()`/`reset()` or a failed
/// classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// No resolution has run (or the last one was torn down).
    Uninitialized,
    /// Resolution in flight.
    Resolving,
    /// A generation-capable provider is installed.
    Ready,
    /// The no-op provider is installed; generation will be rejected.
    Unsupported,
    /// The active provider failed to initialize.
    Error,
}

impl ProviderStatus {
    /// Status name for logging and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Resolving => "resolving",
            Self::Ready => "ready",
            Self::Unsupported => "unsupported",
            Self::Error => "error",
        }
    }
}

/// The committed provider plus its capability tag.
///
/// `lifecycle` is present only for artifact-backed providers; the manager
/// dispatches download calls on its presence, never on type identity.
struct Installed {
    provider: Arc<dyn TextProvider>,
    lifecycle: Option<Arc<dyn ModelLifecycle>>,
}

/// Resolves and owns the device's inference provider.
///
/// Construct via [`Muninn::builder()`]. One instance per application
/// root; all methods take `&self` and the manager is `Send + Sync`.
pub struct ProviderManager {
    classifier: Arc<dyn DeviceClassifier>,
    catalog: Arc<dyn ModelCatalog>,
    foundation: Option<Arc<dyn FoundationBackend>>,
    engine: Arc<dyn InferenceEngine>,
    model_dir: PathBuf,
    client: reqwest::Client,

    status: RwLock<ProviderStatus>,
    classification: RwLock<Option<DeviceClassification>>,
    active: RwLock<Option<Installed>>,
    /// Serializes `resolve()` and `cleanup()`. Held across the classifier
    /// await so two near-simultaneous `resolve()` calls cannot both
    /// observe `Uninitialized` and invoke the classifier twice.
    lifecycle_gate: Mutex<()>,
}

impl std::fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderManager")
            .field("model_dir", &self.model_dir)
            .finish_non_exhaustive()
    }
}

impl ProviderManager {
    pub(crate) fn new(
        classifier: Arc<dyn DeviceClassifier>,
        catalog: Arc<dyn ModelCatalog>,
        foundation: Option<Arc<dyn FoundationBackend>>,
        engine: Arc<dyn InferenceEngine>,
        model_dir: PathBuf,
        client: reqwest::Client,
    ) -> Self {
        Self {
            classifier,
            catalog,
            foundation,
            engine,
            model_dir,
            client,
            status: RwLock::new(ProviderStatus::Uninitialized),
            classification: RwLock::new(None),
            active: RwLock::new(None),
            lifecycle_gate: Mutex::new(()),
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Classify the device and commit exactly one provider.
    ///
    /// Idempotent: any call while the manager is not `Uninitialized` is a
    /// no-op that does not re-invoke the classifier, including under
    /// concurrent overlapping calls. A classifier failure restores
    /// `Uninitialized` so a later call can retry.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Result<()> {
        let _gate = self.lifecycle_gate.lock().await;
        if self.status() != ProviderStatus::Uninitialized {
            debug!(status = self.status().name(), "already resolved; skipping");
            return Ok(());
        }
        self.set_status(ProviderStatus::Resolving);

        let classification = match self.classifier.classify().await {
            Ok(c) => c,
            Err(e) => {
                self.set_status(ProviderStatus::Uninitialized);
                metrics::counter!(telemetry::RESOLUTIONS_TOTAL,
                    "provider" => NO_PROVIDER,
                    "tier" => "unknown",
                    "status" => "error",
                )
                .increment(1);
                return Err(match e {
                    MuninnError::ClassificationFailed(_) => e,
                    other => MuninnError::ClassificationFailed(other.to_string()),
                });
            }
        };
        info!(
            tier = classification.tier.name(),
            device = %classification.device_model,
            ram_gb = classification.ram_gb,
            "device classified"
        );
        self.set_classification(Some(classification.clone()));

        let installed = match classification.tier {
            CapabilityTier::Foundation => match &self.foundation {
                Some(backend) => {
                    let provider = FoundationProvider::new(Arc::clone(backend));
                    if provider.is_available().await {
                        Installed {
                            provider: Arc::new(provider),
                            lifecycle: None,
                        }
                    } else {
                        info!("foundation model unavailable; falling back to local model");
                        self.local_provider(&classification)
                    }
                }
                None => {
                    info!("no foundation backend configured; falling back to local model");
                    self.local_provider(&classification)
                }
            },
            CapabilityTier::Standard => self.local_provider(&classification),
            CapabilityTier::Unsupported => Installed {
                provider: Arc::new(UnsupportedProvider::new(classification.device_model.clone())),
                lifecycle: None,
            },
        };

        let name = installed.provider.name().to_string();
        self.install(installed).await;

        let status = if classification.tier == CapabilityTier::Unsupported {
            ProviderStatus::Unsupported
        } else {
            ProviderStatus::Ready
        };
        self.set_status(status);

        metrics::counter!(telemetry::RESOLUTIONS_TOTAL,
            "provider" => name.clone(),
            "tier" => classification.tier.name(),
            "status" => "ok",
        )
        .increment(1);
        info!(provider = %name, status = status.name(), "provider installed");
        Ok(())
    }

    /// Resolve if needed, then initialize the active provider.
    ///
    /// A provider initialization failure sets status `Error` and
    /// propagates the error.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        self.resolve().await?;
        let provider = self.active_provider().ok_or(MuninnError::NotInitialized)?;
        if let Err(e) = provider.initialize().await {
            self.set_status(ProviderStatus::Error);
            return Err(e);
        }
        Ok(())
    }

    /// Tear down the active provider and return to `Uninitialized`.
    ///
    /// Clears the provider handle and the stored classification. Runs
    /// under the same gate as `resolve()`.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) {
        let _gate = self.lifecycle_gate.lock().await;
        let old = self
            .active
            .write()
            .expect("active provider lock poisoned")
            .take();
        if let Some(old) = old {
            old.provider.cleanup().await;
        }
        self.set_classification(None);
        self.set_status(ProviderStatus::Uninitialized);
        info!("manager reset");
    }

    /// Alias for [`cleanup`](Self::cleanup).
    pub async fn reset(&self) {
        self.cleanup().await;
    }

    // ========================================================================
    // Generation
    // ========================================================================

    /// Generate a completion via the active provider.
    ///
    /// Fails with `NotInitialized` when no provider is installed.
    /// Provider errors propagate unmodified.
    #[instrument(skip(self, system, user))]
    pub async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let provider = self.active_provider().ok_or(MuninnError::NotInitialized)?;
        let start = Instant::now();
        let result = provider.generate(system, user).await;

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::GENERATE_REQUESTS_TOTAL,
            "provider" => provider.name().to_owned(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::GENERATE_DURATION_SECONDS,
            "provider" => provider.name().to_owned(),
        )
        .record(start.elapsed().as_secs_f64());

        result
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Current manager lifecycle state.
    pub fn status(&self) -> ProviderStatus {
        *self.status.read().expect("status lock poisoned")
    }

    /// Name of the active provider, or [`NO_PROVIDER`] before resolution.
    pub fn provider_name(&self) -> String {
        self.active
            .read()
            .expect("active provider lock poisoned")
            .as_ref()
            .map(|i| i.provider.name().to_string())
            .unwrap_or_else(|| NO_PROVIDER.to_string())
    }

    /// Diagnostic state string of the active provider, if any.
    pub fn provider_status(&self) -> Option<String> {
        self.active
            .read()
            .expect("active provider lock poisoned")
            .as_ref()
            .map(|i| i.provider.status())
    }

    /// Classification from the current resolution cycle.
    ///
    /// `None` until the classifier has succeeded; does not change until
    /// the next full `resolve()` following a `cleanup()`.
    pub fn classification(&self) -> Option<DeviceClassification> {
        self.classification
            .read()
            .expect("classification lock poisoned")
            .clone()
    }

    // ========================================================================
    // Download lifecycle delegation
    // Benign defaults for providers without the capability: these calls
    // mean "not applicable" there, not failure.
    // ========================================================================

    /// Whether the active provider's model artifact is fully on disk.
    /// `false` for providers without a download lifecycle.
    pub async fn is_model_downloaded(&self) -> bool {
        match self.lifecycle() {
            Some(lifecycle) => lifecycle.is_downloaded().await,
            None => false,
        }
    }

    /// Download the active provider's model artifact.
    #[instrument(skip(self))]
    pub async fn download_model(&self) -> DownloadResult {
        let (lifecycle, name) = {
            let active = self.active.read().expect("active provider lock poisoned");
            match active.as_ref() {
                Some(installed) => (
                    installed.lifecycle.clone(),
                    installed.provider.name().to_string(),
                ),
                None => {
                    return DownloadResult::failed(
                        "no provider installed; call resolve() first",
                    );
                }
            }
        };
        match lifecycle {
            Some(lifecycle) => lifecycle.download().await,
            None => DownloadResult::failed(format!("{name} does not require downloading")),
        }
    }

    /// Cancel an in-flight artifact download. No-op when nothing is
    /// downloading or the provider has no download lifecycle.
    pub fn cancel_download(&self) {
        if let Some(lifecycle) = self.lifecycle() {
            lifecycle.cancel_download();
        }
    }

    /// Delete the downloaded artifact. No-op for providers without a
    /// download lifecycle or when nothing is downloaded.
    pub async fn delete_model(&self) -> Result<()> {
        match self.lifecycle() {
            Some(lifecycle) => lifecycle.delete().await,
            None => Ok(()),
        }
    }

    /// On-disk byte size of the artifact; `0` when absent or not
    /// applicable.
    pub async fn model_size(&self) -> u64 {
        match self.lifecycle() {
            Some(lifecycle) => lifecycle.size_on_disk().await,
            None => 0,
        }
    }

    /// Descriptor of the active provider's model; `None` when not
    /// applicable.
    pub fn model_config(&self) -> Option<ModelDescriptor> {
        self.lifecycle().map(|lifecycle| lifecycle.descriptor())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn local_provider(&self, classification: &DeviceClassification) -> Installed {
        let descriptor = self.catalog.select_for_device(classification);
        debug!(model = %descriptor.name, "catalog selected model");
        let provider = Arc::new(LocalModelProvider::new(
            descriptor,
            self.model_dir.clone(),
            self.client.clone(),
            Arc::clone(&self.engine),
        ));
        Installed {
            provider: Arc::clone(&provider) as Arc<dyn TextProvider>,
            lifecycle: Some(provider),
        }
    }

    /// Commit a provider, tearing down any prior handle first.
    async fn install(&self, installed: Installed) {
        let old = self
            .active
            .write()
            .expect("active provider lock poisoned")
            .replace(installed);
        if let Some(old) = old {
            old.provider.cleanup().await;
        }
    }

    fn active_provider(&self) -> Option<Arc<dyn TextProvider>> {
        self.active
            .read()
            .expect("active provider lock poisoned")
            .as_ref()
            .map(|i| Arc::clone(&i.provider))
    }

    fn lifecycle(&self) -> Option<Arc<dyn ModelLifecycle>> {
        self.active
            .read()
            .expect("active provider lock poisoned")
            .as_ref()
            .and_then(|i| i.lifecycle.clone())
    }

    fn set_status(&self, status: ProviderStatus) {
        *self.status.write().expect("status lock poisoned") = status;
    }

    fn set_classification(&self, classification: Option<DeviceClassification>) {
        *self
            .classification
            .write()
            .expect("classification lock poisoned") = classification;
    }
}
