//! Integration tests for provider resolution and lifecycle.
//!
//! Exercises the decision table, resolve idempotency, delegation to the
//! active provider, and the benign defaults for providers without a
//! download lifecycle — all through mock seams.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use muninn::{
    CapabilityTier, DeviceClassification, DeviceClassifier, FOUNDATION_PROVIDER,
    FoundationBackend, InferenceEngine, ModelDescriptor, Muninn, MuninnError, NO_PROVIDER,
    PresetCatalog, ProviderManager, ProviderStatus, Result, UNSUPPORTED_PROVIDER,
};

// ============================================================================
// Mock seams
// ============================================================================

/// Classifier that counts invocations and can fail the first N calls.
struct CountingClassifier {
    calls: AtomicUsize,
    fail_first: usize,
    classification: DeviceClassification,
}

impl CountingClassifier {
    fn new(classification: DeviceClassification) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            classification,
        }
    }

    fn failing_first(classification: DeviceClassification, fail_first: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_first,
            classification,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceClassifier for CountingClassifier {
    async fn classify(&self) -> Result<DeviceClassification> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(MuninnError::ClassificationFailed(
                "hardware probe unavailable".to_string(),
            ));
        }
        Ok(self.classification.clone())
    }
}

struct StubFoundation {
    available: bool,
}

#[async_trait]
impl FoundationBackend for StubFoundation {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        Ok(format!("foundation:{system}:{user}"))
    }
}

struct EchoEngine;

#[async_trait]
impl InferenceEngine for EchoEngine {
    async fn load(&self, _artifact: &Path, _descriptor: &ModelDescriptor) -> Result<()> {
        Ok(())
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        Ok(format!("local:{system}:{user}"))
    }

    async fn unload(&self) {}
}

// ============================================================================
// Helpers
// ============================================================================

fn descriptor(name: &str) -> ModelDescriptor {
    ModelDescriptor {
        tier: CapabilityTier::Standard,
        name: name.to_string(),
        file_name: format!("{name}.gguf"),
        url: format!("https://models.example/{name}.gguf"),
        artifact_size_bytes: 0,
        quantization: None,
        context_window: None,
    }
}

/// Build a manager over mock seams. The `TempDir` guard keeps the model
/// directory alive for the duration of the test.
fn manager(
    classifier: Arc<CountingClassifier>,
    foundation_available: Option<bool>,
) -> (ProviderManager, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = Muninn::builder()
        .classifier(classifier)
        .catalog(Arc::new(PresetCatalog::new(descriptor("fallback-model"))))
        .engine(Arc::new(EchoEngine))
        .model_dir(dir.path());
    if let Some(available) = foundation_available {
        builder = builder.foundation_backend(Arc::new(StubFoundation { available }));
    }
    (builder.build().unwrap(), dir)
}

// ============================================================================
// Resolution idempotency
// ============================================================================

#[tokio::test]
async fn resolve_twice_invokes_classifier_once() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::standard(
        "Pixel 8", "arm64", 8,
    )));
    let (manager, _dir) = manager(Arc::clone(&classifier), None);

    manager.resolve().await.unwrap();
    manager.resolve().await.unwrap();

    assert_eq!(classifier.calls(), 1);
}

#[tokio::test]
async fn concurrent_resolves_invoke_classifier_once() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::standard(
        "Pixel 8", "arm64", 8,
    )));
    let (manager, _dir) = manager(Arc::clone(&classifier), None);
    let manager = Arc::new(manager);

    let a = {
        let m = Arc::clone(&manager);
        tokio::spawn(async move { m.resolve().await })
    };
    let b = {
        let m = Arc::clone(&manager);
        tokio::spawn(async move { m.resolve().await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(classifier.calls(), 1);
    assert_eq!(manager.status(), ProviderStatus::Ready);
}

// ============================================================================
// Decision table
// ============================================================================

#[tokio::test]
async fn foundation_tier_with_available_backend_installs_foundation() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::foundation(
        "iPhone 16", "arm64", 8,
    )));
    let (manager, _dir) = manager(classifier, Some(true));

    manager.resolve().await.unwrap();

    assert_eq!(manager.status(), ProviderStatus::Ready);
    assert_eq!(manager.provider_name(), FOUNDATION_PROVIDER);
    assert_eq!(
        manager.classification().unwrap().tier,
        CapabilityTier::Foundation
    );
}

#[tokio::test]
async fn foundation_tier_with_unavailable_backend_falls_back_to_local() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::foundation(
        "iPhone 12", "arm64", 4,
    )));
    let (manager, _dir) = manager(classifier, Some(false));

    manager.resolve().await.unwrap();

    assert_eq!(manager.status(), ProviderStatus::Ready);
    assert_ne!(manager.provider_name(), FOUNDATION_PROVIDER);
    assert_eq!(manager.provider_name(), "local-fallback-model");
    assert_eq!(manager.model_config().unwrap().name, "fallback-model");
}

#[tokio::test]
async fn foundation_tier_without_backend_falls_back_to_local() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::foundation(
        "iPhone 16", "arm64", 8,
    )));
    let (manager, _dir) = manager(classifier, None);

    manager.resolve().await.unwrap();

    assert_eq!(manager.provider_name(), "local-fallback-model");
    assert_eq!(manager.status(), ProviderStatus::Ready);
}

#[tokio::test]
async fn standard_tier_installs_local_model_provider() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::standard(
        "Pixel 8", "arm64", 8,
    )));
    let (manager, _dir) = manager(classifier, Some(true));

    manager.resolve().await.unwrap();

    assert_eq!(manager.provider_name(), "local-fallback-model");
    assert_eq!(manager.status(), ProviderStatus::Ready);
}

#[tokio::test]
async fn unsupported_tier_installs_unsupported_provider() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::unsupported(
        "old-tablet",
    )));
    let (manager, _dir) = manager(classifier, Some(true));

    manager.resolve().await.unwrap();

    assert_eq!(manager.status(), ProviderStatus::Unsupported);
    assert_eq!(manager.provider_name(), UNSUPPORTED_PROVIDER);

    let err = manager.generate("sys", "user").await.unwrap_err();
    assert!(matches!(err, MuninnError::UnsupportedDevice { .. }));
    assert!(err.to_string().contains("not supported on this device"));
}

// ============================================================================
// Generation delegation
// ============================================================================

#[tokio::test]
async fn generate_before_resolve_rejects_with_not_initialized() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::standard(
        "Pixel 8", "arm64", 8,
    )));
    let (manager, _dir) = manager(classifier, None);

    let err = manager.generate("sys", "user").await.unwrap_err();
    assert!(matches!(err, MuninnError::NotInitialized));
}

#[tokio::test]
async fn initialize_resolves_then_initializes_provider() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::foundation(
        "iPhone 16", "arm64", 8,
    )));
    let (manager, _dir) = manager(Arc::clone(&classifier), Some(true));

    manager.initialize().await.unwrap();

    assert_eq!(classifier.calls(), 1);
    assert_eq!(manager.provider_status().as_deref(), Some("ready"));

    let out = manager.generate("sys", "hello").await.unwrap();
    assert_eq!(out, "foundation:sys:hello");
}

// ============================================================================
// Cleanup / reset
// ============================================================================

#[tokio::test]
async fn cleanup_resets_status_name_and_classification() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::standard(
        "Pixel 8", "arm64", 8,
    )));
    let (manager, _dir) = manager(Arc::clone(&classifier), None);

    manager.resolve().await.unwrap();
    assert_eq!(manager.status(), ProviderStatus::Ready);

    manager.cleanup().await;

    assert_eq!(manager.status(), ProviderStatus::Uninitialized);
    assert_eq!(manager.provider_name(), NO_PROVIDER);
    assert!(manager.classification().is_none());
    assert!(manager.provider_status().is_none());

    // A fresh cycle re-invokes the classifier.
    manager.resolve().await.unwrap();
    assert_eq!(classifier.calls(), 2);
}

#[tokio::test]
async fn reset_is_an_alias_for_cleanup() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::standard(
        "Pixel 8", "arm64", 8,
    )));
    let (manager, _dir) = manager(classifier, None);

    manager.resolve().await.unwrap();
    manager.reset().await;

    assert_eq!(manager.status(), ProviderStatus::Uninitialized);
    assert_eq!(manager.provider_name(), NO_PROVIDER);
}

// ============================================================================
// Classifier failure
// ============================================================================

#[tokio::test]
async fn classifier_failure_leaves_manager_retryable() {
    let classifier = Arc::new(CountingClassifier::failing_first(
        DeviceClassification::standard("Pixel 8", "arm64", 8),
        1,
    ));
    let (manager, _dir) = manager(Arc::clone(&classifier), None);

    let err = manager.resolve().await.unwrap_err();
    assert!(matches!(err, MuninnError::ClassificationFailed(_)));
    assert_eq!(manager.status(), ProviderStatus::Uninitialized);
    assert!(manager.classification().is_none());
    assert_eq!(manager.provider_name(), NO_PROVIDER);

    // Retry succeeds and installs a provider.
    manager.resolve().await.unwrap();
    assert_eq!(manager.status(), ProviderStatus::Ready);
    assert_eq!(classifier.calls(), 2);
}

// ============================================================================
// Download lifecycle on providers without the capability
// ============================================================================

#[tokio::test]
async fn foundation_provider_returns_download_defaults() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::foundation(
        "iPhone 16", "arm64", 8,
    )));
    let (manager, _dir) = manager(classifier, Some(true));
    manager.resolve().await.unwrap();

    assert!(!manager.is_model_downloaded().await);
    assert_eq!(manager.model_size().await, 0);
    assert!(manager.model_config().is_none());

    let result = manager.download_model().await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("does not require"));

    // Benign no-ops, never errors.
    manager.cancel_download();
    manager.delete_model().await.unwrap();
}

#[tokio::test]
async fn unsupported_provider_returns_download_defaults() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::unsupported(
        "old-tablet",
    )));
    let (manager, _dir) = manager(classifier, None);
    manager.resolve().await.unwrap();

    assert!(!manager.is_model_downloaded().await);
    assert_eq!(manager.model_size().await, 0);
    assert!(manager.model_config().is_none());

    let result = manager.download_model().await;
    assert!(!result.success);
    assert!(
        result
            .error
            .unwrap()
            .contains("unsupported does not require downloading")
    );
}

#[tokio::test]
async fn download_model_before_resolve_reports_no_provider() {
    let classifier = Arc::new(CountingClassifier::new(DeviceClassification::standard(
        "Pixel 8", "arm64", 8,
    )));
    let (manager, _dir) = manager(classifier, None);

    let result = manager.download_model().await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("no provider installed"));

    // cancel with nothing resolved (let alone in flight) must not raise
    manager.cancel_download();
}
