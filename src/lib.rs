//! Muninn - On-device inference provider resolution and lifecycle management
//!
//! This crate decides, per device, which local text-generation backend to
//! use among three mutually exclusive variants (OS-native foundation
//! model, downloaded open-weight model, unsupported no-op), manages that
//! backend's full lifecycle, and exposes one stable, backend-agnostic
//! interface to callers.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use muninn::{
//!     CapabilityTier, DeviceClassification, FixedClassifier, ModelDescriptor, Muninn,
//!     PresetCatalog,
//! };
//! # use std::path::Path;
//! # use async_trait::async_trait;
//! # struct MyEngine;
//! # #[async_trait]
//! # impl muninn::InferenceEngine for MyEngine {
//! #     async fn load(&self, _: &Path, _: &ModelDescriptor) -> muninn::Result<()> { Ok(()) }
//! #     async fn generate(&self, _: &str, _: &str) -> muninn::Result<String> { Ok(String::new()) }
//! #     async fn unload(&self) {}
//! # }
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let catalog = PresetCatalog::new(ModelDescriptor {
//!         tier: CapabilityTier::Standard,
//!         name: "gemma-2b-it-q4".into(),
//!         file_name: "gemma-2b-it-q4.gguf".into(),
//!         url: "https://models.example/gemma-2b-it-q4.gguf".into(),
//!         artifact_size_bytes: 0,
//!         quantization: None,
//!         context_window: Some(4096),
//!     });
//!
//!     let manager = Muninn::builder()
//!         .classifier(Arc::new(FixedClassifier::new(
//!             DeviceClassification::standard("Pixel 8", "arm64", 8),
//!         )))
//!         .catalog(Arc::new(catalog))
//!         .engine(Arc::new(MyEngine))
//!         .build()?;
//!
//!     manager.initialize().await?;
//!     if !manager.is_model_downloaded().await {
//!         let result = manager.download_model().await;
//!         assert!(result.success, "{:?}", result.error);
//!     }
//!
//!     let reply = manager
//!         .generate("You are a nutrition assistant.", "Summarise today's intake.")
//!         .await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod device;
pub mod error;
pub mod manager;
pub mod providers;
pub mod telemetry;

// Re-export main types at crate root
pub use error::{MuninnError, Result};
pub use manager::{Muninn, NO_PROVIDER, ProviderManager, ProviderManagerBuilder, ProviderStatus};

// Re-export external-seam types
pub use catalog::{ModelCatalog, ModelDescriptor, PresetCatalog};
pub use device::{CapabilityTier, DeviceClassification, DeviceClassifier, FixedClassifier};

// Re-export provider surface
pub use providers::{
    DownloadResult, DownloadState, FOUNDATION_PROVIDER, FoundationBackend, FoundationProvider,
    InferenceEngine, LocalModelProvider, ModelLifecycle, TextProvider, UNSUPPORTED_PROVIDER,
    UnsupportedProvider,
};
