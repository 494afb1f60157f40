//! No-op provider for devices below the minimum capability tier.
//!
//! Always installable — `is_available()` returns true — so the manager
//! never stalls without an active provider; every generation attempt
//! fails with a descriptive error instead.

use async_trait::async_trait;

use super::traits::TextProvider;
use crate::{MuninnError, Result};

/// Stable name of the unsupported provider.
pub const UNSUPPORTED_PROVIDER: &str = "unsupported";

/// Provider installed on devices that cannot run local inference.
pub struct UnsupportedProvider {
    device_model: String,
}

impl UnsupportedProvider {
    /// Create an unsupported provider for the given device model string.
    pub fn new(device_model: impl Into<String>) -> Self {
        Self {
            device_model: device_model.into(),
        }
    }
}

#[async_trait]
impl TextProvider for UnsupportedProvider {
    fn name(&self) -> &str {
        UNSUPPORTED_PROVIDER
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
        Err(MuninnError::UnsupportedDevice {
            device: self.device_model.clone(),
        })
    }

    fn status(&self) -> String {
        "unsupported".to_string()
    }

    async fn cleanup(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_installable() {
        let provider = UnsupportedProvider::new("old-tablet");
        assert!(provider.is_available().await);
        assert!(provider.initialize().await.is_ok());
        assert_eq!(provider.name(), "unsupported");
    }

    #[tokio::test]
    async fn generate_rejects_with_device_model() {
        let provider = UnsupportedProvider::new("old-tablet");
        let err = provider.generate("sys", "user").await.unwrap_err();
        match err {
            MuninnError::UnsupportedDevice { device } => assert_eq!(device, "old-tablet"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
