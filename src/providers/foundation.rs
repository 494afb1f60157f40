//! Foundation provider: the OS-native, platform-bundled generative model.
//!
//! The platform binding (Apple Foundation Models, AICore, …) is injected
//! as a [`FoundationBackend`] trait object; this provider adds the
//! lifecycle discipline around it. No download surface — the model ships
//! with the OS.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::traits::TextProvider;
use crate::Result;

/// Stable name of the foundation provider.
pub const FOUNDATION_PROVIDER: &str = "foundation";

/// Binding to the platform's bundled generative model.
#[async_trait]
pub trait FoundationBackend: Send + Sync {
    /// Whether the platform model is present and usable on this device.
    async fn is_available(&self) -> bool;

    /// Run a completion on the platform model.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// Provider backed by the OS-native foundation model.
pub struct FoundationProvider {
    backend: Arc<dyn FoundationBackend>,
    initialized: AtomicBool,
}

impl FoundationProvider {
    /// Create a foundation provider over the given platform binding.
    pub fn new(backend: Arc<dyn FoundationBackend>) -> Self {
        Self {
            backend,
            initialized: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TextProvider for FoundationProvider {
    fn name(&self) -> &str {
        FOUNDATION_PROVIDER
    }

    async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }

    async fn initialize(&self) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        debug!(provider = FOUNDATION_PROVIDER, "provider initialized");
        Ok(())
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        self.backend.generate(system, user).await
    }

    fn status(&self) -> String {
        if self.initialized.load(Ordering::SeqCst) {
            "ready".to_string()
        } else {
            "uninitialized".to_string()
        }
    }

    async fn cleanup(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        debug!(provider = FOUNDATION_PROVIDER, "provider cleaned up");
    }
}
