//! Builder for configuring manager instances

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::ProviderManager;
use crate::catalog::ModelCatalog;
use crate::device::DeviceClassifier;
use crate::providers::{FoundationBackend, InferenceEngine};
use crate::{MuninnError, Result};

/// Main entry point for creating manager instances.
pub struct Muninn;

impl Muninn {
    /// Create a new builder for configuring the provider manager.
    pub fn builder() -> ProviderManagerBuilder {
        ProviderManagerBuilder::new()
    }
}

/// Builder for configuring manager instances.
///
/// Classifier, catalog, and inference engine are required; the
/// foundation backend is optional (without one, foundation-tier devices
/// fall back to the local-model path).
pub struct ProviderManagerBuilder {
    classifier: Option<Arc<dyn DeviceClassifier>>,
    catalog: Option<Arc<dyn ModelCatalog>>,
    foundation: Option<Arc<dyn FoundationBackend>>,
    engine: Option<Arc<dyn InferenceEngine>>,
    model_dir: Option<PathBuf>,
    connect_timeout_secs: Option<u64>,
}

impl ProviderManagerBuilder {
    pub fn new() -> Self {
        Self {
            classifier: None,
            catalog: None,
            foundation: None,
            engine: None,
            model_dir: None,
            connect_timeout_secs: None,
        }
    }

    /// Set the device-capability classifier.
    pub fn classifier(mut self, classifier: Arc<dyn DeviceClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Set the tier-to-model catalog.
    pub fn catalog(mut self, catalog: Arc<dyn ModelCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Set the platform foundation-model binding.
    pub fn foundation_backend(mut self, backend: Arc<dyn FoundationBackend>) -> Self {
        self.foundation = Some(backend);
        self
    }

    /// Set the local inference engine.
    pub fn engine(mut self, engine: Arc<dyn InferenceEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Override the model artifact directory.
    ///
    /// Defaults to `$MUNINN_MODEL_DIR`, then the platform cache dir
    /// under `muninn/models`.
    pub fn model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    /// Set the HTTP connect timeout for artifact transfers, in seconds.
    ///
    /// A total request timeout would abort large transfers mid-stream,
    /// so only the connect phase is bounded.
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    /// Build the manager, validating that all required seams are set.
    pub fn build(self) -> Result<ProviderManager> {
        let classifier = self
            .classifier
            .ok_or_else(|| MuninnError::Configuration("no device classifier configured".into()))?;
        let catalog = self
            .catalog
            .ok_or_else(|| MuninnError::Configuration("no model catalog configured".into()))?;
        let engine = self
            .engine
            .ok_or_else(|| MuninnError::Configuration("no inference engine configured".into()))?;

        let model_dir = self.model_dir.unwrap_or_else(default_model_dir);

        let mut client = reqwest::Client::builder();
        if let Some(secs) = self.connect_timeout_secs {
            client = client.connect_timeout(Duration::from_secs(secs));
        }
        let client = client
            .build()
            .map_err(|e| MuninnError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(ProviderManager::new(
            classifier,
            catalog,
            self.foundation,
            engine,
            model_dir,
            client,
        ))
    }
}

impl Default for ProviderManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_model_dir() -> PathBuf {
    std::env::var("MUNINN_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("muninn")
                .join("models")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_dir_falls_under_muninn() {
        // Only meaningful when the env override is unset.
        if std::env::var("MUNINN_MODEL_DIR").is_err() {
            let dir = default_model_dir();
            assert!(dir.to_string_lossy().contains("muninn"));
        }
    }

    #[test]
    fn build_without_classifier_fails() {
        let err = Muninn::builder().build().unwrap_err();
        assert!(matches!(err, MuninnError::Configuration(_)));
        assert!(err.to_string().contains("classifier"));
    }
}
